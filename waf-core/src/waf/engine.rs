//! WAF evaluation pipeline: whitelist → blacklist → rate limit → rules.
//! Ordering is strict and the first terminal verdict wins.

use std::net::IpAddr;

use crate::waf::cache::DomainView;
use crate::waf::matcher::CompiledPattern;
use crate::waf::model::{MatchMode, MatchType, RuleAction, Verdict};
use crate::waf::ratelimit::{RateLimitOutcome, RateLimiter};

/// Everything the engine needs about one admitted request. Headers are a
/// flat list of `(name, value)` pairs so multi-valued headers are
/// represented faithfully.
pub struct RequestFacts<'a> {
    pub client_ip: IpAddr,
    pub uri_path: &'a str,
    pub headers: &'a [(String, String)],
    pub user_agent: &'a str,
    /// Body bytes, already truncated/dropped at the 1 MiB cap by the
    /// caller; `None` means the cap was exceeded and body rules fail open.
    pub body: Option<&'a [u8]>,
}

/// A rule or pseudo-rule (blacklist, rate-limit) that terminated evaluation,
/// used to build both the synthesized block response and the attack log
/// row. Blacklist/rate-limit use the pseudo-id `0`.
pub struct MatchedRule {
    pub rule_id: i64,
    pub rule_name: String,
    pub matched_field: String,
    pub matched_value: String,
}

pub struct EngineResult {
    pub verdict: Verdict,
    pub matched: Option<MatchedRule>,
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    let mut values = Vec::new();
    for (k, v) in headers {
        if k.eq_ignore_ascii_case(name) {
            values.push(v.as_str());
        }
    }
    if values.is_empty() {
        None
    } else {
        Some(values.join(";"))
    }
}

/// Compute the match subject and test it for a string-typed rule pattern.
/// Returns `(matched, subject)`.
fn evaluate_string_rule(
    pattern: &CompiledPattern,
    match_type: MatchType,
    match_mode: MatchMode,
    raw_pattern: &str,
    req: &RequestFacts,
) -> (bool, String) {
    match match_type {
        MatchType::Uri => (pattern.matches(req.uri_path), req.uri_path.to_string()),
        MatchType::UserAgent => (pattern.matches(req.user_agent), req.user_agent.to_string()),
        MatchType::Header => {
            if let Some((name, expected)) = raw_pattern.split_once(':') {
                let subject = header_value(req.headers, name.trim()).unwrap_or_default();
                let expected_pattern = CompiledPattern::compile(match_mode, expected.trim());
                (expected_pattern.matches(&subject), subject)
            } else {
                // colon absent: pattern names a header; test its own values.
                let subject = header_value(req.headers, raw_pattern).unwrap_or_default();
                (pattern.matches(&subject), subject)
            }
        }
        MatchType::Body => match req.body {
            Some(bytes) => {
                let subject = String::from_utf8_lossy(bytes).to_string();
                (pattern.matches(&subject), subject)
            }
            None => (false, String::new()),
        },
        MatchType::Ip => unreachable!("ip rules are dispatched via ip_pattern"),
    }
}

pub struct WafEngine {
    pub rate_limiter: RateLimiter,
}

impl WafEngine {
    pub fn new(rate_limiter: RateLimiter) -> WafEngine {
        WafEngine { rate_limiter }
    }

    /// Run the full pipeline for one request against `view`. `rate_limit_enabled`,
    /// `blacklist_enabled`, and `whitelist_enabled` mirror the
    /// `waf.enable_*` configuration switches.
    pub async fn evaluate(
        &self,
        view: &DomainView,
        req: &RequestFacts<'_>,
        whitelist_enabled: bool,
        blacklist_enabled: bool,
        rate_limit_enabled: bool,
    ) -> EngineResult {
        // Phase 1: whitelist — terminal allow, highest precedence.
        if whitelist_enabled {
            for entry in &view.whitelist {
                if self.list_entry_matches(entry, req) {
                    return EngineResult {
                        verdict: Verdict::Allow,
                        matched: None,
                    };
                }
            }
        }

        // Phase 2: blacklist — terminal block, pseudo-id 0.
        if blacklist_enabled {
            for entry in &view.blacklist {
                if self.list_entry_matches(entry, req) {
                    return EngineResult {
                        verdict: Verdict::Block {
                            response_code: 403,
                            message: "request blocked by blacklist".to_string(),
                            rule_name: "blacklist".to_string(),
                        },
                        matched: Some(MatchedRule {
                            rule_id: 0,
                            rule_name: "blacklist".to_string(),
                            matched_field: format!("{:?}", entry.entry_type).to_ascii_lowercase(),
                            matched_value: entry.raw_value.clone(),
                        }),
                    };
                }
            }
        }

        // Phase 3: rate limit — terminal block, pseudo-id 0.
        if rate_limit_enabled {
            let outcome = self
                .rate_limiter
                .check(view.domain.tenant, req.client_ip, view.rate_limit)
                .await;
            if outcome == RateLimitOutcome::Limited {
                return EngineResult {
                    verdict: Verdict::Block {
                        response_code: 429,
                        message: "rate limit exceeded".to_string(),
                        rule_name: "rate-limit".to_string(),
                    },
                    matched: Some(MatchedRule {
                        rule_id: 0,
                        rule_name: "rate-limit".to_string(),
                        matched_field: "ip".to_string(),
                        matched_value: req.client_ip.to_string(),
                    }),
                };
            }
        }

        // Phase 4: rules, in the deterministic order built by the cache.
        let mut logged_any = false;
        for rule in &view.rules {
            if rule.load_failed {
                continue;
            }
            let (matched, subject) = if rule.match_type == MatchType::Ip {
                let p = rule.ip_pattern.as_ref().expect("ip rule has ip_pattern");
                (p.matches(req.client_ip), req.client_ip.to_string())
            } else {
                let p = rule
                    .string_pattern
                    .as_ref()
                    .expect("non-ip rule has string_pattern");
                evaluate_string_rule(p, rule.match_type, rule.match_mode, &rule.raw_pattern, req)
            };

            if !matched {
                continue;
            }

            let matched_rule = MatchedRule {
                rule_id: rule.id,
                rule_name: rule.name.clone(),
                matched_field: format!("{:?}", rule.match_type).to_ascii_lowercase(),
                matched_value: subject,
            };

            match rule.action {
                RuleAction::Block => {
                    return EngineResult {
                        verdict: Verdict::Block {
                            response_code: if rule.response_code == 0 {
                                403
                            } else {
                                rule.response_code
                            },
                            message: rule
                                .response_message
                                .clone()
                                .unwrap_or_else(|| "request blocked".to_string()),
                            rule_name: rule.name.clone(),
                        },
                        matched: Some(matched_rule),
                    };
                }
                RuleAction::Allow => {
                    return EngineResult {
                        verdict: Verdict::Allow,
                        matched: Some(matched_rule),
                    };
                }
                RuleAction::Log => {
                    logged_any = true;
                    // non-terminal: continue to next rule, but remember we
                    // have a match record worth emitting if nothing else fires.
                    let _ = &matched_rule;
                }
            }
        }

        EngineResult {
            verdict: if logged_any {
                Verdict::Logged
            } else {
                Verdict::Allow
            },
            matched: None,
        }
    }

    fn list_entry_matches(
        &self,
        entry: &crate::waf::cache::CompiledListEntry,
        req: &RequestFacts,
    ) -> bool {
        use crate::waf::model::ListType;
        match entry.entry_type {
            ListType::Ip => entry.matches_ip(req.client_ip),
            ListType::Uri => entry.matches_str(req.uri_path),
            ListType::UserAgent => entry.matches_str(req.user_agent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::cache::{build, ReloadPayload};
    use crate::waf::model::*;
    use std::collections::HashMap;

    fn base_domain() -> Domain {
        Domain {
            id: 1,
            tenant: 1,
            fqdn: "demo.local".into(),
            protocol: Protocol::Http,
            port: 80,
            backend_url: "http://127.0.0.1:9000".into(),
            tls_cert: None,
            tls_key: None,
            enabled: true,
        }
    }

    fn sqli_rule() -> Rule {
        Rule {
            id: 10,
            tenant: 1,
            name: "block-sqli".into(),
            match_type: MatchType::Uri,
            match_mode: MatchMode::Contains,
            pattern: "' OR '1'='1".into(),
            action: RuleAction::Block,
            response_code: 403,
            response_message: None,
            priority: 10,
            enabled: true,
        }
    }

    fn view_with(rules: Vec<Rule>, lists: Vec<ListEntry>) -> crate::waf::cache::DomainView {
        let domain = base_domain();
        let policy = Policy {
            id: 1,
            tenant: 1,
            name: "default".into(),
            enabled: true,
            rules: rules
                .iter()
                .map(|r| PolicyRuleAssoc {
                    rule_id: r.id,
                    priority: r.priority,
                    enabled: true,
                })
                .collect(),
        };
        let payload = ReloadPayload {
            domains: vec![domain.clone()],
            rules,
            policies: vec![policy],
            domain_policies: vec![DomainPolicyAssoc {
                domain_id: domain.id,
                policy_id: 1,
                priority: 1,
                enabled: true,
            }],
            lists,
            rate_limits: HashMap::new(),
        };
        let snap = build(&payload, 1);
        let arc = snap.by_fqdn.get("demo.local").unwrap().clone();
        std::sync::Arc::try_unwrap(arc).unwrap_or_else(|_| panic!("unexpected second owner"))
    }

    #[tokio::test]
    async fn s1_sqli_rule_blocks_with_403() {
        let view = view_with(vec![sqli_rule()], vec![]);
        let engine = WafEngine::new(RateLimiter::new("redis://127.0.0.1:1"));
        let req = RequestFacts {
            client_ip: "203.0.113.1".parse().unwrap(),
            uri_path: "/?id=1' OR '1'='1",
            headers: &[],
            user_agent: "curl/8",
            body: None,
        };
        let result = engine
            .evaluate(&view, &req, true, true, false)
            .await;
        match result.verdict {
            Verdict::Block { response_code, .. } => assert_eq!(response_code, 403),
            _ => panic!("expected block"),
        }
        assert_eq!(result.matched.unwrap().matched_field, "uri");
    }

    #[tokio::test]
    async fn s2_whitelist_overrides_blacklist() {
        let whitelist_entry = ListEntry {
            id: 1,
            tenant: 1,
            kind: ListKind::Whitelist,
            entry_type: ListType::Ip,
            value: "10.0.0.5".into(),
            enabled: true,
            comment: None,
            domains: vec![],
        };
        let blacklist_entry = ListEntry {
            id: 2,
            tenant: 1,
            kind: ListKind::Blacklist,
            entry_type: ListType::Ip,
            value: "10.0.0.0/24".into(),
            enabled: true,
            comment: None,
            domains: vec![],
        };
        let view = view_with(vec![], vec![whitelist_entry, blacklist_entry]);
        let engine = WafEngine::new(RateLimiter::new("redis://127.0.0.1:1"));
        let req = RequestFacts {
            client_ip: "10.0.0.5".parse().unwrap(),
            uri_path: "/",
            headers: &[],
            user_agent: "curl/8",
            body: None,
        };
        let result = engine.evaluate(&view, &req, true, true, false).await;
        assert_eq!(result.verdict, Verdict::Allow);
    }

    #[test]
    fn header_subject_joins_multi_values_with_semicolon() {
        let headers = vec![
            ("X-Tag".to_string(), "a".to_string()),
            ("X-Tag".to_string(), "b".to_string()),
        ];
        assert_eq!(header_value(&headers, "X-Tag"), Some("a;b".to_string()));
    }

    #[test]
    fn named_header_rule_honors_contains_match_mode() {
        let headers = vec![("X-Forwarded-For".to_string(), "10.0.0.1, 203.0.113.9".to_string())];
        let req = RequestFacts {
            client_ip: "203.0.113.9".parse().unwrap(),
            uri_path: "/",
            headers: &headers,
            user_agent: "curl/8",
            body: None,
        };
        // Pattern is irrelevant here: the colon branch recompiles against
        // `expected` using the rule's match_mode, not the caller-supplied
        // compiled pattern.
        let placeholder = CompiledPattern::Exact("unused".to_string());
        let (matched, subject) = evaluate_string_rule(
            &placeholder,
            MatchType::Header,
            MatchMode::Contains,
            "X-Forwarded-For: 203.0.113.9",
            &req,
        );
        assert!(matched, "contains match mode should match a substring of the header value");
        assert_eq!(subject, "10.0.0.1, 203.0.113.9");

        let (exact_matched, _) = evaluate_string_rule(
            &placeholder,
            MatchType::Header,
            MatchMode::Exact,
            "X-Forwarded-For: 203.0.113.9",
            &req,
        );
        assert!(!exact_matched, "exact match mode should not match a substring");
    }
}
