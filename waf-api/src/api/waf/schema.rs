//! Table definitions for the WAF configuration tree. Mirrors the way
//! `api::users::init_database` lays out its schema: plain `CREATE TABLE IF
//! NOT EXISTS` statements run once at startup, no migration framework.

use crate::module::database::{Database, DatabaseResult};

pub fn ensure_tables(db: &Database) -> DatabaseResult<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS domains (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant INTEGER NOT NULL DEFAULT 0,
            fqdn TEXT NOT NULL UNIQUE,
            protocol TEXT NOT NULL CHECK(protocol IN ('http', 'https')),
            port INTEGER NOT NULL,
            backend_url TEXT NOT NULL,
            tls_cert TEXT,
            tls_key TEXT,
            enabled INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            match_type TEXT NOT NULL CHECK(match_type IN ('uri', 'ip', 'header', 'body', 'user_agent')),
            match_mode TEXT NOT NULL CHECK(match_mode IN ('exact', 'contains', 'regex')),
            pattern TEXT NOT NULL,
            action TEXT NOT NULL CHECK(action IN ('block', 'allow', 'log')),
            response_code INTEGER NOT NULL DEFAULT 403,
            response_message TEXT,
            priority INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            UNIQUE(tenant, name)
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS policies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant INTEGER NOT NULL DEFAULT 0,
            name TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS policy_rules (
            policy_id INTEGER NOT NULL REFERENCES policies(id),
            rule_id INTEGER NOT NULL REFERENCES rules(id),
            priority INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (policy_id, rule_id)
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS domain_policies (
            domain_id INTEGER NOT NULL REFERENCES domains(id),
            policy_id INTEGER NOT NULL REFERENCES policies(id),
            priority INTEGER NOT NULL DEFAULT 0,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (domain_id, policy_id)
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS list_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant INTEGER NOT NULL DEFAULT 0,
            kind TEXT NOT NULL CHECK(kind IN ('blacklist', 'whitelist')),
            entry_type TEXT NOT NULL CHECK(entry_type IN ('ip', 'uri', 'user_agent')),
            value TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            comment TEXT
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS list_entry_domains (
            entry_id INTEGER NOT NULL REFERENCES list_entries(id),
            domain_id INTEGER NOT NULL REFERENCES domains(id),
            PRIMARY KEY (entry_id, domain_id)
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS rate_limits (
            tenant INTEGER PRIMARY KEY,
            window_secs INTEGER NOT NULL DEFAULT 60,
            max_requests INTEGER NOT NULL DEFAULT 100
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::database::Database;

    #[test]
    fn ensure_tables_is_idempotent() {
        let db = Database::new().expect("failed to connect to database");
        ensure_tables(&db).expect("first ensure_tables call failed");
        ensure_tables(&db).expect("second ensure_tables call should be a no-op, not an error");
    }
}
