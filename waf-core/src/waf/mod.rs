//! # WAF Module
//!
//! The WAF module is the request-inspection datapath core: a configuration
//! cache, a pattern matcher, a rate limiter, an evaluation engine, a proxy
//! manager, and an attack logger, wired together by `app::waf_gateway` and
//! `app::waf_proxy`.
//!
//! ## Module Structure
//!
//! * `model`: shared domain types (Tenant/Domain/Rule/Policy/List/...)
//! * `matcher`: pure pattern/CIDR matching primitives
//! * `cache`: the atomically-swappable configuration snapshot and reload
//! * `ratelimit`: the fixed-window Redis-backed rate limiter
//! * `engine`: the ordered evaluation pipeline
//! * `clientip`: client IP extraction
//! * `proxy_manager`: upstream peer selection and forwarded-header rewrite
//! * `attacklog`: bounded-queue async attack log persistence

pub mod attacklog;
pub mod cache;
pub mod clientip;
pub mod engine;
pub mod matcher;
pub mod model;
pub mod proxy_manager;
pub mod ratelimit;

use std::sync::{Arc, OnceLock};

/// Process-wide handle to the config cache. A single cache instance is
/// shared by both listeners (HTTP/HTTPS) and the reload channel, with one
/// idempotent reload API used by both the startup path and mutation paths.
static CACHE: OnceLock<cache::ConfigCache> = OnceLock::new();

pub fn global_cache() -> &'static cache::ConfigCache {
    CACHE.get_or_init(cache::ConfigCache::new)
}

static ENGINE: OnceLock<Arc<engine::WafEngine>> = OnceLock::new();
static LOGGER: OnceLock<Arc<attacklog::AttackLogger>> = OnceLock::new();

/// Build the process-wide engine and attack logger. The attack logger spawns
/// its writer pool with `tokio::spawn`, so this must run on the `#[tokio::main]`
/// runtime (from `main`) rather than from a bare `std::thread`, which is why
/// listener startup (`system::server::init`, run from plain OS threads)
/// retrieves these through the getters below instead of constructing them.
pub fn init_runtime_state() {
    ENGINE.get_or_init(|| {
        Arc::new(engine::WafEngine::new(ratelimit::RateLimiter::new(
            &crate::config::redis_url(),
        )))
    });
    LOGGER.get_or_init(|| {
        let db_path = std::path::PathBuf::from(crate::config::attack_log_db_path());
        let sink: Arc<dyn attacklog::AttackLogSink> = match attacklog::SqliteSink::open(&db_path) {
            Some(sink) => Arc::new(sink),
            None => {
                log::warn!("falling back to stderr attack log sink");
                Arc::new(attacklog::StderrSink)
            }
        };
        Arc::new(attacklog::AttackLogger::spawn(sink))
    });
}

pub fn global_engine() -> Arc<engine::WafEngine> {
    ENGINE
        .get()
        .expect("waf::init_runtime_state must run before global_engine")
        .clone()
}

pub fn global_logger() -> Arc<attacklog::AttackLogger> {
    LOGGER
        .get()
        .expect("waf::init_runtime_state must run before global_logger")
        .clone()
}
