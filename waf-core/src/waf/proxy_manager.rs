//! Proxy manager: per-domain upstream peers, connection pool sizing, and
//! forwarded-header synthesis.
//!
//! The actual byte-level reverse-proxy loop lives in pingora's
//! `ProxyHttp`/`ServerApp` traits (see `app::waf_gateway`, `app::waf_proxy`);
//! this module holds the pure, synchronous pieces: picking the upstream
//! peer for a domain and rewriting the forwarded headers.

use std::net::IpAddr;
use std::time::Duration;

use pingora::upstreams::peer::HttpPeer;

use crate::waf::model::Domain;

/// Per-peer connection settings pingora's own upstream connector reads off
/// `HttpPeer::options`: `connection_timeout` bounds the TCP+TLS dial,
/// `total_connection_timeout` caps the dial across pingora's internal
/// retries, and `idle_timeout` bounds how long a pooled connection to this
/// peer may sit idle before the connector closes it instead of reusing it.
/// Pingora's connector pool is keyed and capped per peer internally; it
/// does not expose a separate knob for pool-wide or per-host connection
/// counts, so this struct only carries settings that are actually applied.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub dial_timeout: Duration,
    pub total_connection_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            dial_timeout: Duration::from_secs(5),
            total_connection_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Build the pingora peer for a domain's single backend URL. Upstream load
/// balancing beyond one backend is out of scope.
pub fn upstream_peer(domain: &Domain) -> Result<Box<HttpPeer>, String> {
    let url = domain
        .backend_url
        .parse::<http::Uri>()
        .map_err(|e| format!("invalid backend_url for domain {}: {}", domain.fqdn, e))?;
    let use_tls = url.scheme_str() == Some("https");
    let host = url
        .host()
        .ok_or_else(|| format!("backend_url missing host for domain {}", domain.fqdn))?;
    let port = url.port_u16().unwrap_or(if use_tls { 443 } else { 80 });
    let addr = format!("{}:{}", host, port);
    let sni = host.to_string();
    let mut peer = HttpPeer::new(addr, use_tls, sni);
    let pool = PoolSettings::default();
    peer.options.connection_timeout = Some(pool.dial_timeout);
    peer.options.total_connection_timeout = Some(pool.total_connection_timeout);
    peer.options.idle_timeout = Some(pool.idle_timeout);
    Ok(Box::new(peer))
}

/// Rewrite forwarded headers on the request destined upstream:
/// `X-Real-IP` set to the admitted client IP if absent, `X-Forwarded-For`
/// appended (or set if absent), `X-Forwarded-Proto` set by which listener
/// admitted the request, `X-Forwarded-Host` set to the original `Host` if
/// absent.
pub fn apply_forwarded_headers(
    headers: &mut http::HeaderMap,
    client_ip: IpAddr,
    original_host: &str,
    is_tls: bool,
) {
    if !headers.contains_key("x-real-ip") {
        if let Ok(v) = http::HeaderValue::from_str(&client_ip.to_string()) {
            headers.insert("x-real-ip", v);
        }
    }

    let xff = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{}, {}", existing, client_ip),
        _ => client_ip.to_string(),
    };
    if let Ok(v) = http::HeaderValue::from_str(&xff) {
        headers.insert("x-forwarded-for", v);
    }

    let proto = if is_tls { "https" } else { "http" };
    if let Ok(v) = http::HeaderValue::from_str(proto) {
        headers.insert("x-forwarded-proto", v);
    }

    if !headers.contains_key("x-forwarded-host") {
        if let Ok(v) = http::HeaderValue::from_str(original_host) {
            headers.insert("x-forwarded-host", v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_appends_to_existing_chain() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-forwarded-for", "a".parse().unwrap());
        let client_ip: IpAddr = "203.0.113.2".parse().unwrap();
        apply_forwarded_headers(&mut headers, client_ip, "example.com", false);
        assert_eq!(
            headers.get("x-forwarded-for").unwrap().to_str().unwrap(),
            "a, 203.0.113.2"
        );
        assert_eq!(headers.get("x-real-ip").unwrap().to_str().unwrap(), "203.0.113.2");
        assert_eq!(headers.get("x-forwarded-proto").unwrap().to_str().unwrap(), "http");
        assert_eq!(
            headers.get("x-forwarded-host").unwrap().to_str().unwrap(),
            "example.com"
        );
    }

    #[test]
    fn forwarded_host_left_untouched_when_already_present() {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-forwarded-host", "upstream.internal".parse().unwrap());
        apply_forwarded_headers(&mut headers, "203.0.113.2".parse().unwrap(), "example.com", true);
        assert_eq!(
            headers.get("x-forwarded-host").unwrap().to_str().unwrap(),
            "upstream.internal"
        );
        assert_eq!(headers.get("x-forwarded-proto").unwrap().to_str().unwrap(), "https");
    }
}
