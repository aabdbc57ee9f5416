//! Domain model for the WAF configuration tree.
//!
//! These types are the datapath's own representation, derived from rows the
//! control plane persists. The datapath never talks to SQLite directly: it
//! only ever sees the snapshot built by [`crate::waf::cache::ConfigCache`]
//! from a [`ReloadPayload`](crate::waf::cache::ReloadPayload) pushed over the
//! reload channel.

use serde::{Deserialize, Serialize};

/// Tenant id `0` is the global/system scope; its rows apply to every tenant.
pub const GLOBAL_TENANT: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "https")]
    Https,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Uri,
    Ip,
    Header,
    Body,
    UserAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Contains,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Allow,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Ip,
    Uri,
    UserAgent,
}

/// Which list a [`ListEntry`] belongs to. Persisted as separate tables
/// (`domain_blacklist`/`domain_whitelist`) in the control plane but folded
/// into a single wire type here since the matching logic is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Blacklist,
    Whitelist,
}

/// The verdict the engine reaches for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block {
        response_code: u16,
        message: String,
        rule_name: String,
    },
    /// non-terminal: a `log` rule matched but evaluation continues.
    Logged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: i64,
    pub tenant: i64,
    pub fqdn: String,
    pub protocol: Protocol,
    pub port: u16,
    pub backend_url: String,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub enabled: bool,
}

impl Domain {
    pub fn is_https(&self) -> bool {
        matches!(self.protocol, Protocol::Https)
    }

    /// A domain advertising HTTPS must carry a valid cert/key pair; this is
    /// checked again at snapshot build time (see `cache::build`) so a bad
    /// pair never crashes the reload, it is just dropped from the TLS table.
    pub fn has_cert_pair(&self) -> bool {
        self.tls_cert.as_deref().is_some_and(|c| !c.is_empty())
            && self.tls_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub tenant: i64,
    pub name: String,
    pub match_type: MatchType,
    pub match_mode: MatchMode,
    pub pattern: String,
    pub action: RuleAction,
    pub response_code: u16,
    pub response_message: Option<String>,
    pub priority: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleAssoc {
    pub rule_id: i64,
    pub priority: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: i64,
    pub tenant: i64,
    pub name: String,
    pub enabled: bool,
    pub rules: Vec<PolicyRuleAssoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainPolicyAssoc {
    pub domain_id: i64,
    pub policy_id: i64,
    pub priority: i64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: i64,
    pub tenant: i64,
    pub kind: ListKind,
    pub entry_type: ListType,
    pub value: String,
    pub enabled: bool,
    pub comment: Option<String>,
    /// Domains this entry is scoped to; empty means tenant-global.
    pub domains: Vec<i64>,
}

/// Row shape the attack logger writes; mirrors the `attack_log` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackLogRecord {
    pub request_id: String,
    pub ts: String,
    pub tenant: i64,
    pub domain: String,
    pub client_ip: String,
    pub method: String,
    pub uri: String,
    pub headers_snapshot: String,
    pub body_snapshot: String,
    pub user_agent: String,
    pub matched_rule_id: Option<i64>,
    pub matched_field: String,
    pub matched_value: String,
    pub action: String,
    pub response_code: u16,
}

/// Per-tenant rate-limit settings, defaulting to 60s / 100 requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub max_requests: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            window_secs: 60,
            max_requests: 100,
        }
    }
}
