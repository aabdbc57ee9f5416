//! Configuration cache: the datapath's only view of tenant configuration.
//!
//! The cache is a single immutable [`Snapshot`] behind an [`ArcSwap`], which
//! is how this module avoids a read-write lock on the hot path. Readers do
//! one atomic pointer load per request; builders run off the request path
//! and publish atomically when done.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::waf::model::{
    Domain, DomainPolicyAssoc, ListEntry, ListKind, ListType, Policy, RateLimitSettings, Rule,
};
use crate::waf::matcher::{CompiledIpPattern, CompiledPattern};

/// Raw rows the control plane pushes on a reload. This is the wire shape of
/// the `/reload` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadPayload {
    pub domains: Vec<Domain>,
    pub rules: Vec<Rule>,
    pub policies: Vec<Policy>,
    pub domain_policies: Vec<DomainPolicyAssoc>,
    pub lists: Vec<ListEntry>,
    pub rate_limits: HashMap<i64, RateLimitSettings>,
}

/// A rule as evaluated by the engine: pattern already compiled, ip-typed
/// rules carry a [`CompiledIpPattern`] instead since the subject for
/// `match_type=ip` is a client address, not an arbitrary string.
pub struct CompiledRule {
    pub id: i64,
    pub name: String,
    pub match_type: crate::waf::model::MatchType,
    pub match_mode: crate::waf::model::MatchMode,
    pub string_pattern: Option<CompiledPattern>,
    pub ip_pattern: Option<CompiledIpPattern>,
    pub raw_pattern: String,
    pub action: crate::waf::model::RuleAction,
    pub response_code: u16,
    pub response_message: Option<String>,
    pub load_failed: bool,
}

impl CompiledRule {
    fn compile(rule: &Rule) -> CompiledRule {
        use crate::waf::model::MatchType;
        let (string_pattern, ip_pattern, load_failed) = if rule.match_type == MatchType::Ip {
            let ip = CompiledIpPattern::compile(&rule.pattern);
            let failed = matches!(ip, CompiledIpPattern::LoadFailed);
            (None, Some(ip), failed)
        } else {
            let p = CompiledPattern::compile(rule.match_mode, &rule.pattern);
            let failed = p.is_load_failed();
            (Some(p), None, failed)
        };
        CompiledRule {
            id: rule.id,
            name: rule.name.clone(),
            match_type: rule.match_type,
            match_mode: rule.match_mode,
            string_pattern,
            ip_pattern,
            raw_pattern: rule.pattern.clone(),
            action: rule.action,
            response_code: rule.response_code,
            response_message: rule.response_message.clone(),
            load_failed,
        }
    }
}

/// A compiled blacklist/whitelist entry for one effective domain.
pub struct CompiledListEntry {
    pub id: i64,
    pub entry_type: ListType,
    pub ip_pattern: Option<CompiledIpPattern>,
    pub string_pattern: Option<String>,
    pub raw_value: String,
}

impl CompiledListEntry {
    fn compile(entry: &ListEntry) -> CompiledListEntry {
        let ip_pattern = if entry.entry_type == ListType::Ip {
            Some(CompiledIpPattern::compile(&entry.value))
        } else {
            None
        };
        let string_pattern = if entry.entry_type != ListType::Ip {
            Some(entry.value.to_ascii_lowercase())
        } else {
            None
        };
        CompiledListEntry {
            id: entry.id,
            entry_type: entry.entry_type,
            ip_pattern,
            string_pattern,
            raw_value: entry.value.clone(),
        }
    }

    pub fn matches_ip(&self, ip: std::net::IpAddr) -> bool {
        self.ip_pattern.as_ref().is_some_and(|p| p.matches(ip))
    }

    pub fn matches_str(&self, subject: &str) -> bool {
        match &self.string_pattern {
            Some(p) => subject.to_ascii_lowercase().contains(p.as_str()),
            None => false,
        }
    }
}

/// Per-domain derived view: everything the engine and proxy manager need
/// for one `fqdn`, already ordered and compiled.
pub struct DomainView {
    pub domain: Domain,
    pub rules: Vec<CompiledRule>,
    pub whitelist: Vec<CompiledListEntry>,
    pub blacklist: Vec<CompiledListEntry>,
    pub rate_limit: RateLimitSettings,
}

/// The immutable value published behind the `ArcSwap`.
pub struct Snapshot {
    pub by_fqdn: HashMap<String, Arc<DomainView>>,
    pub generation: u64,
}

impl Snapshot {
    fn empty() -> Snapshot {
        Snapshot {
            by_fqdn: HashMap::new(),
            generation: 0,
        }
    }
}

/// Deduplicate a rule id keeping the association with the highest priority,
/// then sort by `(assoc.priority DESC, rule.priority DESC, rule.id ASC)`.
fn order_rules(mut candidates: Vec<(i64, &Rule)>) -> Vec<i64> {
    let mut best: HashMap<i64, i64> = HashMap::new();
    for (assoc_priority, rule) in &candidates {
        best.entry(rule.id)
            .and_modify(|p| {
                if *assoc_priority > *p {
                    *p = *assoc_priority;
                }
            })
            .or_insert(*assoc_priority);
    }
    candidates.sort_by(|a, b| a.1.id.cmp(&b.1.id));
    candidates.dedup_by_key(|(_, r)| r.id);
    candidates.sort_by(|(_, ra), (_, rb)| {
        let pa = best[&ra.id];
        let pb = best[&rb.id];
        pb.cmp(&pa)
            .then(rb.priority.cmp(&ra.priority))
            .then(ra.id.cmp(&rb.id))
    });
    candidates.into_iter().map(|(_, r)| r.id).collect()
}

/// Build a fresh [`Snapshot`] from a [`ReloadPayload`]. Per-entry failures
/// (bad regex, bad CIDR, bad cert pair) are recorded via `log::warn!` and
/// the offending entry is dropped; the rest of the reload proceeds.
pub fn build(payload: &ReloadPayload, generation: u64) -> Snapshot {
    use crate::waf::model::GLOBAL_TENANT;

    let rules_by_id: HashMap<i64, &Rule> = payload.rules.iter().map(|r| (r.id, r)).collect();
    let policies_by_id: HashMap<i64, &Policy> =
        payload.policies.iter().map(|p| (p.id, p)).collect();

    let mut by_fqdn = HashMap::new();

    for domain in &payload.domains {
        if !domain.enabled {
            continue;
        }

        // Union over enabled (domain,policy) assocs of enabled (policy,rule) assocs.
        let mut candidates: Vec<(i64, &Rule)> = Vec::new();
        for dp in payload
            .domain_policies
            .iter()
            .filter(|dp| dp.domain_id == domain.id && dp.enabled)
        {
            let Some(policy) = policies_by_id.get(&dp.policy_id) else {
                continue;
            };
            if !policy.enabled {
                continue;
            }
            for pr in policy.rules.iter().filter(|pr| pr.enabled) {
                let Some(rule) = rules_by_id.get(&pr.rule_id) else {
                    continue;
                };
                if !rule.enabled {
                    continue;
                }
                if rule.tenant != domain.tenant && rule.tenant != GLOBAL_TENANT {
                    continue;
                }
                candidates.push((dp.priority, rule));
            }
        }

        let order = order_rules(candidates);
        let compiled_rules: Vec<CompiledRule> = order
            .into_iter()
            .filter_map(|id| rules_by_id.get(&id).map(|r| CompiledRule::compile(r)))
            .collect();

        let applies_to_domain = |l: &&ListEntry| -> bool {
            l.enabled
                && (l.tenant == domain.tenant || l.tenant == GLOBAL_TENANT)
                && (l.domains.is_empty() || l.domains.contains(&domain.id))
        };

        let domain_lists: Vec<&ListEntry> = payload
            .lists
            .iter()
            .filter(applies_to_domain)
            .collect();

        let whitelist: Vec<CompiledListEntry> = domain_lists
            .iter()
            .filter(|l| l.kind == ListKind::Whitelist)
            .map(|l| CompiledListEntry::compile(l))
            .collect();
        let blacklist: Vec<CompiledListEntry> = domain_lists
            .iter()
            .filter(|l| l.kind == ListKind::Blacklist)
            .map(|l| CompiledListEntry::compile(l))
            .collect();

        let rate_limit = payload
            .rate_limits
            .get(&domain.tenant)
            .copied()
            .unwrap_or_default();

        let view = DomainView {
            domain: domain.clone(),
            rules: compiled_rules,
            whitelist,
            blacklist,
            rate_limit,
        };
        by_fqdn.insert(domain.fqdn.clone(), Arc::new(view));
    }

    Snapshot {
        by_fqdn,
        generation,
    }
}

/// The atomically-swappable handle request tasks read from and the control
/// channel writes to. One builder at a time (serialized by `reload_mutex`);
/// many readers via `load()`, never blocking on a lock.
pub struct ConfigCache {
    snapshot: ArcSwap<Snapshot>,
    reload_mutex: std::sync::Mutex<u64>,
}

impl ConfigCache {
    pub fn new() -> ConfigCache {
        ConfigCache {
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            reload_mutex: std::sync::Mutex::new(0),
        }
    }

    /// Single atomic pointer load; safe to call from the hot path.
    pub fn load(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    pub fn domain_view(&self, fqdn: &str) -> Option<Arc<DomainView>> {
        self.load().by_fqdn.get(fqdn).cloned()
    }

    /// Idempotent reload entrypoint used both at startup and on every
    /// control-plane mutation. Concurrent reloads serialize on
    /// `reload_mutex`; the snapshot read path never takes this lock.
    pub fn reload(&self, payload: &ReloadPayload) {
        let mut generation = self.reload_mutex.lock().expect("reload mutex poisoned");
        *generation += 1;
        let snapshot = build(payload, *generation);
        log::info!(
            "config cache reload #{}: {} domains published",
            snapshot.generation,
            snapshot.by_fqdn.len()
        );
        self.snapshot.store(Arc::new(snapshot));
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        ConfigCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::model::{MatchMode, MatchType, Protocol, RuleAction};

    fn rule(id: i64, priority: i64) -> Rule {
        Rule {
            id,
            tenant: 0,
            name: format!("r{id}"),
            match_type: MatchType::Uri,
            match_mode: MatchMode::Contains,
            pattern: "x".into(),
            action: RuleAction::Log,
            response_code: 403,
            response_message: None,
            priority,
            enabled: true,
        }
    }

    #[test]
    fn dedup_keeps_highest_assoc_priority_then_sorts() {
        let r1 = rule(1, 5);
        let r2 = rule(2, 5);
        let r3 = rule(3, 1);
        // rule 1 reachable via two assocs with priorities 10 and 20; keep 20.
        let candidates = vec![(10, &r1), (20, &r1), (5, &r2), (5, &r3)];
        let order = order_rules(candidates);
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn snapshot_build_skips_disabled_domains() {
        let payload = ReloadPayload {
            domains: vec![Domain {
                id: 1,
                tenant: 0,
                fqdn: "demo.local".into(),
                protocol: Protocol::Http,
                port: 80,
                backend_url: "http://127.0.0.1:9000".into(),
                tls_cert: None,
                tls_key: None,
                enabled: false,
            }],
            rules: vec![],
            policies: vec![],
            domain_policies: vec![],
            lists: vec![],
            rate_limits: HashMap::new(),
        };
        let snap = build(&payload, 1);
        assert!(snap.by_fqdn.is_empty());
    }
}
