//! # WAF Configuration Data Models
//!
//! Wire types for the control plane's view of the WAF configuration tree:
//! domains, rules, policies, and block/allow lists. These mirror the
//! datapath's own types in `waf-core::waf::model` field-for-field, since
//! both sides serialize/deserialize the same JSON when a reload payload is
//! pushed over the Redis stream — a renamed field here would silently break
//! that contract without either crate failing to compile.

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

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        match value.as_str() {
            "https" => Protocol::Https,
            _ => Protocol::Http,
        }
    }
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

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Uri => "uri",
            MatchType::Ip => "ip",
            MatchType::Header => "header",
            MatchType::Body => "body",
            MatchType::UserAgent => "user_agent",
        }
    }
}

impl From<String> for MatchType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ip" => MatchType::Ip,
            "header" => MatchType::Header,
            "body" => MatchType::Body,
            "user_agent" => MatchType::UserAgent,
            _ => MatchType::Uri,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Contains,
    Regex,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Contains => "contains",
            MatchMode::Regex => "regex",
        }
    }
}

impl From<String> for MatchMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "contains" => MatchMode::Contains,
            "regex" => MatchMode::Regex,
            _ => MatchMode::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
    Allow,
    Log,
}

impl RuleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Allow => "allow",
            RuleAction::Log => "log",
        }
    }
}

impl From<String> for RuleAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "allow" => RuleAction::Allow,
            "log" => RuleAction::Log,
            _ => RuleAction::Block,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    Ip,
    Uri,
    UserAgent,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Ip => "ip",
            ListType::Uri => "uri",
            ListType::UserAgent => "user_agent",
        }
    }
}

impl From<String> for ListType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "uri" => ListType::Uri,
            "user_agent" => ListType::UserAgent,
            _ => ListType::Ip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Blacklist,
    Whitelist,
}

impl ListKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Blacklist => "blacklist",
            ListKind::Whitelist => "whitelist",
        }
    }
}

impl From<String> for ListKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "whitelist" => ListKind::Whitelist,
            _ => ListKind::Blacklist,
        }
    }
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

/// Row shape the control plane reads back from the shared `attack_log`
/// table, written by the datapath's own attack logger.
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

/// The wire shape pushed over the reload channel; field-for-field identical
/// to `waf_core::waf::cache::ReloadPayload` so the JSON the datapath
/// deserializes is exactly what this crate serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadPayload {
    pub domains: Vec<Domain>,
    pub rules: Vec<Rule>,
    pub policies: Vec<Policy>,
    pub domain_policies: Vec<DomainPolicyAssoc>,
    pub lists: Vec<ListEntry>,
    pub rate_limits: std::collections::HashMap<i64, RateLimitSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_type_round_trips_through_string() {
        for mt in [MatchType::Uri, MatchType::Ip, MatchType::Header, MatchType::Body, MatchType::UserAgent] {
            assert_eq!(MatchType::from(mt.as_str().to_string()).as_str(), mt.as_str());
        }
    }

    #[test]
    fn unrecognized_match_type_defaults_to_uri() {
        assert_eq!(MatchType::from("bogus".to_string()).as_str(), "uri");
    }

    #[test]
    fn rule_action_round_trips_through_string() {
        for action in [RuleAction::Block, RuleAction::Allow, RuleAction::Log] {
            assert_eq!(RuleAction::from(action.as_str().to_string()).as_str(), action.as_str());
        }
    }

    #[test]
    fn list_kind_round_trips_and_defaults_to_blacklist() {
        assert_eq!(ListKind::from("whitelist".to_string()).as_str(), "whitelist");
        assert_eq!(ListKind::from("blacklist".to_string()).as_str(), "blacklist");
        assert_eq!(ListKind::from("garbage".to_string()).as_str(), "blacklist");
    }

    #[test]
    fn protocol_defaults_to_http_for_unknown_values() {
        assert_eq!(Protocol::from("garbage".to_string()).as_str(), "http");
        assert_eq!(Protocol::from("https".to_string()).as_str(), "https");
    }

    #[test]
    fn reload_payload_serializes_with_expected_field_names() {
        let payload = ReloadPayload {
            domains: vec![],
            rules: vec![],
            policies: vec![],
            domain_policies: vec![],
            lists: vec![],
            rate_limits: std::collections::HashMap::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        for field in ["domains", "rules", "policies", "domain_policies", "lists", "rate_limits"] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
    }
}
