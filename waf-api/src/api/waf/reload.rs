//! # Reload Push
//!
//! After every mutating WAF-config request, the handler calls [`push_reload`]
//! to rebuild the full configuration tree from SQLite and hand it to the
//! datapath over the same channel `waf_core::service::registry::client()`
//! listens on: a Redis stream entry on `updates_stream` with an `action`
//! field and, for reloads, a `payload` field carrying the JSON-encoded
//! [`ReloadPayload`].
//!
//! The push is fire-and-forget from the handler's point of view: a Redis
//! hiccup here means the datapath keeps serving its last-known-good
//! snapshot, not that the write to SQLite is rolled back. This mirrors the
//! datapath's own fail-open posture on its Redis-backed rate limiter.

use std::collections::HashMap;

use redis::Commands;

use crate::api::waf::model::{
    Domain, DomainPolicyAssoc, ListEntry, ListKind, ListType, MatchMode, MatchType, Policy,
    PolicyRuleAssoc, RateLimitSettings, ReloadPayload, Rule, RuleAction,
};
use crate::module::database::{Database, DatabaseResult};

pub fn build_reload_payload(db: &Database) -> DatabaseResult<ReloadPayload> {
    let domains = db.query(
        "SELECT id, tenant, fqdn, protocol, port, backend_url, tls_cert, tls_key, enabled FROM domains",
        [],
        |row| {
            Ok(Domain {
                id: row.get(0)?,
                tenant: row.get(1)?,
                fqdn: row.get(2)?,
                protocol: row.get::<_, String>(3)?.into(),
                port: row.get::<_, i64>(4)? as u16,
                backend_url: row.get(5)?,
                tls_cert: row.get(6)?,
                tls_key: row.get(7)?,
                enabled: row.get::<_, i64>(8)? != 0,
            })
        },
    )?;

    let rules = db.query(
        "SELECT id, tenant, name, match_type, match_mode, pattern, action, response_code, response_message, priority, enabled FROM rules",
        [],
        |row| {
            Ok(Rule {
                id: row.get(0)?,
                tenant: row.get(1)?,
                name: row.get(2)?,
                match_type: MatchType::from(row.get::<_, String>(3)?),
                match_mode: MatchMode::from(row.get::<_, String>(4)?),
                pattern: row.get(5)?,
                action: RuleAction::from(row.get::<_, String>(6)?),
                response_code: row.get::<_, i64>(7)? as u16,
                response_message: row.get(8)?,
                priority: row.get(9)?,
                enabled: row.get::<_, i64>(10)? != 0,
            })
        },
    )?;

    let policy_rows = db.query(
        "SELECT id, tenant, name, enabled FROM policies",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? != 0,
            ))
        },
    )?;

    let mut policies = Vec::with_capacity(policy_rows.len());
    for (id, tenant, name, enabled) in policy_rows {
        let assocs = db.query(
            "SELECT rule_id, priority, enabled FROM policy_rules WHERE policy_id = ?1",
            [id],
            |row| {
                Ok(PolicyRuleAssoc {
                    rule_id: row.get(0)?,
                    priority: row.get(1)?,
                    enabled: row.get::<_, i64>(2)? != 0,
                })
            },
        )?;
        policies.push(Policy {
            id,
            tenant,
            name,
            enabled,
            rules: assocs,
        });
    }

    let domain_policies = db.query(
        "SELECT domain_id, policy_id, priority, enabled FROM domain_policies",
        [],
        |row| {
            Ok(DomainPolicyAssoc {
                domain_id: row.get(0)?,
                policy_id: row.get(1)?,
                priority: row.get(2)?,
                enabled: row.get::<_, i64>(3)? != 0,
            })
        },
    )?;

    let list_rows = db.query(
        "SELECT id, tenant, kind, entry_type, value, enabled, comment FROM list_entries",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)? != 0,
                row.get::<_, Option<String>>(6)?,
            ))
        },
    )?;

    let mut lists = Vec::with_capacity(list_rows.len());
    for (id, tenant, kind, entry_type, value, enabled, comment) in list_rows {
        let domains = db.query(
            "SELECT domain_id FROM list_entry_domains WHERE entry_id = ?1",
            [id],
            |row| row.get::<_, i64>(0),
        )?;
        lists.push(ListEntry {
            id,
            tenant,
            kind: ListKind::from(kind),
            entry_type: ListType::from(entry_type),
            value,
            enabled,
            comment,
            domains,
        });
    }

    let rate_limit_rows = db.query(
        "SELECT tenant, window_secs, max_requests FROM rate_limits",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, i64>(2)? as u64,
            ))
        },
    )?;
    let mut rate_limits: HashMap<i64, RateLimitSettings> = HashMap::new();
    for (tenant, window_secs, max_requests) in rate_limit_rows {
        rate_limits.insert(
            tenant,
            RateLimitSettings {
                window_secs,
                max_requests,
            },
        );
    }

    Ok(ReloadPayload {
        domains,
        rules,
        policies,
        domain_policies,
        lists,
        rate_limits,
    })
}

/// Rebuild the configuration tree and push it to the datapath. Logs and
/// swallows any Redis error rather than surfacing it to the HTTP caller: the
/// write to SQLite already succeeded, and the datapath will pick up the
/// change on the next reload regardless of source (a restart, or an operator
/// re-triggering the push).
pub fn push_reload(db: &Database) {
    let payload = match build_reload_payload(db) {
        Ok(payload) => payload,
        Err(e) => {
            log::error!("failed to build reload payload: {}", e);
            return;
        }
    };

    let json = match serde_json::to_string(&payload) {
        Ok(json) => json,
        Err(e) => {
            log::error!("failed to serialize reload payload: {}", e);
            return;
        }
    };

    let client = match redis::Client::open(crate::config::redis_url()) {
        Ok(client) => client,
        Err(e) => {
            log::error!("reload push: failed to open redis client: {}", e);
            return;
        }
    };

    let mut con = match client.get_connection() {
        Ok(con) => con,
        Err(e) => {
            log::error!("reload push: failed to connect to redis: {}", e);
            return;
        }
    };

    let result: redis::RedisResult<String> = con.xadd(
        "updates_stream",
        "*",
        &[("action", "reload"), ("payload", json.as_str())],
    );

    if let Err(e) = result {
        log::error!("reload push: XADD failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::waf::schema::ensure_tables;
    use crate::module::database::Database;

    /// `build_reload_payload` must reflect a freshly inserted domain/rule/
    /// policy chain, including the `policy_rules` association row, without
    /// requiring a Redis connection (unlike `push_reload`, which this test
    /// deliberately does not exercise).
    #[test]
    fn build_reload_payload_reflects_inserted_rows() {
        let db = Database::new().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO domains (tenant, fqdn, protocol, port, backend_url, enabled) \
             VALUES (9001, 'reload-test.example', 'https', 443, 'http://127.0.0.1:8080', 1)",
            [],
        )
        .expect("insert domain");
        let domain_id: i64 = db
            .query_one("SELECT id FROM domains WHERE fqdn = 'reload-test.example'", [], |row| row.get(0))
            .expect("select domain id")
            .expect("domain row missing");

        db.execute(
            "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, priority, enabled) \
             VALUES (9001, 'reload-test-rule', 'uri', 'contains', '/admin', 'block', 403, 10, 1)",
            [],
        )
        .expect("insert rule");
        let rule_id: i64 = db
            .query_one("SELECT id FROM rules WHERE name = 'reload-test-rule'", [], |row| row.get(0))
            .expect("select rule id")
            .expect("rule row missing");

        db.execute(
            "INSERT INTO policies (tenant, name, enabled) VALUES (9001, 'reload-test-policy', 1)",
            [],
        )
        .expect("insert policy");
        let policy_id: i64 = db
            .query_one("SELECT id FROM policies WHERE name = 'reload-test-policy'", [], |row| row.get(0))
            .expect("select policy id")
            .expect("policy row missing");

        db.execute(
            "INSERT INTO policy_rules (policy_id, rule_id, priority, enabled) VALUES (?1, ?2, 0, 1)",
            rusqlite::params![policy_id, rule_id],
        )
        .expect("insert policy_rule assoc");

        let payload = build_reload_payload(&db).expect("failed to build reload payload");

        let domain = payload
            .domains
            .iter()
            .find(|d| d.id == domain_id)
            .expect("inserted domain missing from payload");
        assert_eq!(domain.fqdn, "reload-test.example");
        assert_eq!(domain.protocol.as_str(), "https");

        let policy = payload
            .policies
            .iter()
            .find(|p| p.id == policy_id)
            .expect("inserted policy missing from payload");
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].rule_id, rule_id);

        // Clean up so repeated test runs don't accumulate rows.
        db.execute("DELETE FROM policy_rules WHERE policy_id = ?1", [policy_id]).ok();
        db.execute("DELETE FROM policies WHERE id = ?1", [policy_id]).ok();
        db.execute("DELETE FROM rules WHERE id = ?1", [rule_id]).ok();
        db.execute("DELETE FROM domains WHERE id = ?1", [domain_id]).ok();
    }
}
