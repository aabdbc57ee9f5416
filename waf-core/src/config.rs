//! # Configuration Module for the WAF Datapath
//!
//! This module defines the datapath's own runtime configuration: listener
//! ports, rate-limit defaults, and the `waf.enable_*` feature switches. It
//! uses the `mini-config` crate for storage and retrieval, the same way the
//! rest of this workspace keeps process-local settings, and layers
//! environment overrides on top of built-in defaults.
//!
//! Tenant/domain/rule/policy/list configuration is *not* stored here — that
//! lives in the [`crate::waf::cache::ConfigCache`] snapshot, rebuilt from
//! control-plane reload payloads.

use mini_config::Configure;

/// Configuration keys for the WAF datapath, stored via `mini-config`.
#[derive(Debug, Clone, Configure)]
pub enum WafSettings {
    /// Plaintext HTTP listener port (default 8081).
    HttpPort,
    /// TLS listener port (default 8443).
    HttpsPort,
    /// Default rate-limit window, in seconds (default 60).
    RateLimitWindowSecs,
    /// Default rate-limit request ceiling per window (default 100).
    RateLimitMaxRequests,
    /// Whether the rate-limit phase runs at all.
    EnableRateLimit,
    /// Whether the blacklist phase runs at all.
    EnableBlacklist,
    /// Whether the whitelist phase runs at all.
    EnableWhitelist,
    /// Redis connection string backing the rate limiter's counters.
    RedisUrl,
    /// Path to the SQLite file the attack logger writes to, shared with the
    /// control plane's read side.
    AttackLogDbPath,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => default,
    }
}

/// Initialize WAF datapath configuration with defaults, overridden by
/// environment variables: `WAF_HTTP_PORT`, `WAF_HTTPS_PORT`,
/// `WAF_RATE_LIMIT_WINDOW`, `WAF_MAX_REQUESTS`, `WAF_ENABLE_RATE_LIMIT`,
/// `WAF_ENABLE_BLACKLIST`, `WAF_ENABLE_WHITELIST`, `WAF_REDIS_URL`,
/// `WAF_ATTACK_LOG_DB`.
pub fn init() {
    WafSettings::HttpPort.set(env_or("WAF_HTTP_PORT", "8081"));
    WafSettings::HttpsPort.set(env_or("WAF_HTTPS_PORT", "8443"));
    WafSettings::RateLimitWindowSecs.set(env_or("WAF_RATE_LIMIT_WINDOW", "60"));
    WafSettings::RateLimitMaxRequests.set(env_or("WAF_MAX_REQUESTS", "100"));
    WafSettings::RedisUrl.set(env_or("WAF_REDIS_URL", "redis://127.0.0.1:6379"));
    WafSettings::AttackLogDbPath.set(env_or("WAF_ATTACK_LOG_DB", "/tmp/gwrs/data/core"));
    WafSettings::EnableRateLimit.xset::<bool>(env_flag("WAF_ENABLE_RATE_LIMIT", true));
    WafSettings::EnableBlacklist.xset::<bool>(env_flag("WAF_ENABLE_BLACKLIST", true));
    WafSettings::EnableWhitelist.xset::<bool>(env_flag("WAF_ENABLE_WHITELIST", true));
}

pub fn http_bind_addr() -> String {
    let port = WafSettings::HttpPort.get::<String>().unwrap_or_else(|| "8081".to_string());
    format!("0.0.0.0:{}", port)
}

pub fn https_bind_addr() -> String {
    let port = WafSettings::HttpsPort.get::<String>().unwrap_or_else(|| "8443".to_string());
    format!("0.0.0.0:{}", port)
}

pub fn redis_url() -> String {
    WafSettings::RedisUrl
        .get::<String>()
        .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
}

pub fn enable_rate_limit() -> bool {
    WafSettings::EnableRateLimit.xget::<bool>().unwrap_or(true)
}

pub fn enable_blacklist() -> bool {
    WafSettings::EnableBlacklist.xget::<bool>().unwrap_or(true)
}

pub fn enable_whitelist() -> bool {
    WafSettings::EnableWhitelist.xget::<bool>().unwrap_or(true)
}

pub fn attack_log_db_path() -> String {
    WafSettings::AttackLogDbPath
        .get::<String>()
        .unwrap_or_else(|| "/tmp/gwrs/data/core".to_string())
}
