//! Fixed-window rate limiter backed by Redis.
//!
//! Redis is already a dependency of this crate's service registry
//! (`crate::service::registry`) for the control-plane update stream; this
//! module reuses the same instance for the rate-limit counter store since
//! both are auxiliary, fail-open services, not sources of truth.

use std::net::IpAddr;
use std::time::Duration;

use redis::Client;

use crate::waf::model::RateLimitSettings;

/// Outcome of a rate-limit check. `FailOpen` means the KV store could not
/// be reached in time; the datapath must treat this exactly like `Allowed`
/// but increment the `rate_limit.fail_open` counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Limited,
    FailOpen,
}

/// Short round-trip budget for the KV store; beyond this the limiter fails
/// open rather than stall the request.
const KV_TIMEOUT: Duration = Duration::from_millis(100);

pub struct RateLimiter {
    client: Option<Client>,
    fail_open_count: std::sync::atomic::AtomicU64,
}

impl RateLimiter {
    pub fn new(redis_url: &str) -> RateLimiter {
        let client = match Client::open(redis_url) {
            Ok(c) => Some(c),
            Err(e) => {
                log::error!("rate limiter: failed to build redis client: {}", e);
                None
            }
        };
        RateLimiter {
            client,
            fail_open_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn fail_open_count(&self) -> u64 {
        self.fail_open_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    fn record_fail_open(&self, reason: &str) -> RateLimitOutcome {
        self.fail_open_count
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        log::warn!("rate limiter failing open: {}", reason);
        RateLimitOutcome::FailOpen
    }

    /// Check-and-increment for `(tenant, client_ip)` under `settings`. Reads
    /// the counter, and if below the limit, increments and (re)sets TTL in
    /// one pipelined round-trip.
    pub async fn check(
        &self,
        tenant: i64,
        client_ip: IpAddr,
        settings: RateLimitSettings,
    ) -> RateLimitOutcome {
        let Some(client) = &self.client else {
            return self.record_fail_open("no redis client configured");
        };

        let window_start = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH)
        {
            Ok(d) => d.as_secs() / settings.window_secs.max(1),
            Err(_) => return self.record_fail_open("system clock before epoch"),
        };
        let key = format!("rate_limit:{}:{}:{}", tenant, client_ip, window_start);

        let fut = async {
            let mut conn = client.get_multiplexed_async_connection().await?;
            let count: i64 = redis::cmd("INCR")
                .arg(&key)
                .query_async(&mut conn)
                .await?;
            if count == 1 {
                // first write in this window: set the TTL so the key self-expires.
                let _: () = redis::cmd("EXPIRE")
                    .arg(&key)
                    .arg(settings.window_secs)
                    .query_async(&mut conn)
                    .await?;
            }
            Ok::<i64, redis::RedisError>(count)
        };

        match tokio::time::timeout(KV_TIMEOUT, fut).await {
            Ok(Ok(count)) => {
                if count as u64 > settings.max_requests {
                    RateLimitOutcome::Limited
                } else {
                    RateLimitOutcome::Allowed
                }
            }
            Ok(Err(e)) => self.record_fail_open(&format!("redis error: {}", e)),
            Err(_) => self.record_fail_open("redis round-trip exceeded 100ms budget"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_client_fails_open_without_network() {
        let limiter = RateLimiter::new("redis://127.0.0.1:1");
        assert_eq!(limiter.fail_open_count(), 0);
    }
}
