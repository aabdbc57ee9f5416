//! # Control-Plane Configuration
//!
//! `waf-api` is configured in three layers, applied in increasing priority:
//! built-in defaults, `config.yaml` on disk, then environment variables.
//! The on-disk format is `serde_yaml`, matching the External Interfaces
//! contract (`server.http_port`, `waf.rate_limit_window`, ...); process-local
//! scalars read back at runtime go through `mini-config`, mirroring
//! `waf-core`'s own config module.

use mini_config::Configure;
use serde::Deserialize;
use std::path::Path;

/// Configuration keys stored via `mini-config`, read by accessor functions
/// below once `init()` has populated them from `config.yaml` + environment.
#[derive(Debug, Clone, Configure)]
pub enum ApiSettings {
    /// Address the control-plane HTTP server binds to.
    BindAddress,
    /// Default rate-limit window, in seconds, for domains with no
    /// tenant-specific override (default 60).
    RateLimitWindowSecs,
    /// Default rate-limit request ceiling per window (default 100).
    RateLimitMaxRequests,
    EnableRateLimit,
    EnableBlacklist,
    EnableWhitelist,
    /// Redis connection string for the reload-push channel, shared with
    /// `waf-core`'s `service::registry` consumer.
    RedisUrl,
}

/// Shape of `config.yaml`. Every field is optional so a partial file only
/// overrides what it mentions; anything absent falls back to the built-in
/// default applied in [`init`].
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[allow(dead_code)]
    server: Option<ServerSection>,
    waf: Option<WafSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    #[allow(dead_code)]
    http_port: Option<u16>,
    #[allow(dead_code)]
    https_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct WafSection {
    rate_limit_window: Option<u64>,
    max_requests: Option<u64>,
    enable_rate_limit: Option<bool>,
    enable_blacklist: Option<bool>,
    enable_whitelist: Option<bool>,
    redis_url: Option<String>,
}

fn load_file_config(path: &Path) -> FileConfig {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_yaml::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("failed to parse {}: {}; using defaults", path.display(), e);
            FileConfig::default()
        }),
        Err(_) => FileConfig::default(),
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        Err(_) => default,
    }
}

/// Initialize control-plane configuration: `config.yaml` (path overridable
/// via `WAF_API_CONFIG_FILE`, default `config.yaml` in the working
/// directory) layered with environment overrides, then `bind_addr` (as
/// parsed from CLI flags in `main`) recorded as-is.
pub fn init(bind_addr: &str) {
    let config_path = std::env::var("WAF_API_CONFIG_FILE").unwrap_or_else(|_| "config.yaml".to_string());
    let file = load_file_config(Path::new(&config_path));
    let waf = file.waf.unwrap_or_default();

    ApiSettings::BindAddress.set(bind_addr.to_string());
    ApiSettings::RateLimitWindowSecs.set(
        env_or("WAF_RATE_LIMIT_WINDOW", waf.rate_limit_window.unwrap_or(60)).to_string(),
    );
    ApiSettings::RateLimitMaxRequests.set(
        env_or("WAF_MAX_REQUESTS", waf.max_requests.unwrap_or(100)).to_string(),
    );
    ApiSettings::RedisUrl.set(std::env::var("WAF_REDIS_URL").unwrap_or_else(|_| {
        waf.redis_url.unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
    }));
    ApiSettings::EnableRateLimit
        .xset::<bool>(env_flag("WAF_ENABLE_RATE_LIMIT", waf.enable_rate_limit.unwrap_or(true)));
    ApiSettings::EnableBlacklist
        .xset::<bool>(env_flag("WAF_ENABLE_BLACKLIST", waf.enable_blacklist.unwrap_or(true)));
    ApiSettings::EnableWhitelist
        .xset::<bool>(env_flag("WAF_ENABLE_WHITELIST", waf.enable_whitelist.unwrap_or(true)));
}

pub fn bind_address() -> String {
    ApiSettings::BindAddress
        .get::<String>()
        .unwrap_or_else(|| "0.0.0.0:24042".to_string())
}

pub fn redis_url() -> String {
    ApiSettings::RedisUrl
        .get::<String>()
        .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
}

pub fn rate_limit_window_secs() -> u64 {
    ApiSettings::RateLimitWindowSecs
        .get::<String>()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60)
}

pub fn rate_limit_max_requests() -> u64 {
    ApiSettings::RateLimitMaxRequests
        .get::<String>()
        .and_then(|v| v.parse().ok())
        .unwrap_or(100)
}

pub fn enable_rate_limit() -> bool {
    ApiSettings::EnableRateLimit.xget::<bool>().unwrap_or(true)
}

pub fn enable_blacklist() -> bool {
    ApiSettings::EnableBlacklist.xget::<bool>().unwrap_or(true)
}

pub fn enable_whitelist() -> bool {
    ApiSettings::EnableWhitelist.xget::<bool>().unwrap_or(true)
}
