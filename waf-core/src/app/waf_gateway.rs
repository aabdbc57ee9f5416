//! # WAF Gateway Application
//!
//! HTTP-level `ProxyHttp` implementation driving the evaluation pipeline.
//! It resolves the `Host` header to a [`DomainView`] from the shared
//! [`ConfigCache`](crate::waf::cache::ConfigCache), runs the WAF engine's
//! phases, and either synthesizes a block response or forwards upstream
//! via the proxy manager.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use pingora::prelude::HttpPeer;
use pingora::proxy::{ProxyHttp, Session};
use serde_json::json;

use crate::waf::attacklog::AttackLogger;
use crate::waf::cache::{ConfigCache, DomainView};
use crate::waf::engine::{EngineResult, RequestFacts, WafEngine};
use crate::waf::model::{AttackLogRecord, Verdict};
use crate::waf::proxy_manager;

/// Paths under this prefix bypass the engine entirely and are not served by
/// this process — the control plane owns them.
const MANAGEMENT_PREFIX: &str = "/api/";

pub struct RuntimeFlags {
    pub whitelist_enabled: bool,
    pub blacklist_enabled: bool,
    pub rate_limit_enabled: bool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        RuntimeFlags {
            whitelist_enabled: true,
            blacklist_enabled: true,
            rate_limit_enabled: true,
        }
    }
}

pub struct WafGatewayApp {
    pub cache: &'static ConfigCache,
    pub engine: Arc<WafEngine>,
    pub logger: Arc<AttackLogger>,
    pub flags: RuntimeFlags,
    pub is_tls: bool,
}

/// Request body bytes are capped at 1 MiB; over the cap the body is dropped
/// and body-typed rules fail open (see `crate::waf::attacklog::BODY_CAP_BYTES`).
const BODY_CAP_BYTES: usize = crate::waf::attacklog::BODY_CAP_BYTES;

pub struct Ctx {
    request_id: String,
    client_ip: IpAddr,
    domain_view: Option<Arc<DomainView>>,
    host: String,
    result: Option<EngineResult>,
    body: Option<Vec<u8>>,
}

impl WafGatewayApp {
    pub fn new(cache: &'static ConfigCache, engine: Arc<WafEngine>, logger: Arc<AttackLogger>, is_tls: bool) -> Self {
        WafGatewayApp {
            cache,
            engine,
            logger,
            flags: RuntimeFlags::default(),
            is_tls,
        }
    }

    fn new_request_id() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        format!("req-{:x}", nanos)
    }

    async fn write_block_response(
        &self,
        session: &mut Session,
        code: u16,
        message: &str,
        rule_name: &str,
        request_id: &str,
    ) -> pingora::Result<()> {
        let body = json!({
            "code": code,
            "message": message,
            "rule": rule_name,
            "request_id": request_id,
        })
        .to_string();

        let mut header = pingora::http::ResponseHeader::build(code, None)?;
        header.insert_header("content-type", "application/json")?;
        header.insert_header("content-length", body.len().to_string())?;
        session.write_response_header(Box::new(header), false).await?;
        session
            .write_response_body(Some(bytes::Bytes::from(body)), true)
            .await?;
        Ok(())
    }

    async fn write_fixed_response(&self, session: &mut Session, code: u16, message: &str) -> pingora::Result<()> {
        let mut header = pingora::http::ResponseHeader::build(code, None)?;
        header.insert_header("content-type", "text/plain")?;
        header.insert_header("content-length", message.len().to_string())?;
        session.write_response_header(Box::new(header), false).await?;
        session
            .write_response_body(Some(bytes::Bytes::from(message.to_string())), true)
            .await?;
        Ok(())
    }

    /// Buffer the request body up to `BODY_CAP_BYTES` before dispatch, so
    /// `body`-typed rules can be evaluated prior to forwarding upstream.
    /// Pingora still replays whatever is read here to the upstream request.
    /// Over the cap the body is dropped entirely and `None` is returned, so
    /// the caller treats it as empty per the fail-open body inspection rule.
    async fn buffer_request_body(&self, session: &mut Session) -> pingora::Result<Option<Vec<u8>>> {
        let mut buf: Vec<u8> = Vec::new();
        let mut over_cap = false;
        loop {
            match session.read_request_body().await? {
                Some(chunk) => {
                    if !over_cap {
                        if buf.len() + chunk.len() > BODY_CAP_BYTES {
                            over_cap = true;
                            buf.clear();
                        } else {
                            buf.extend_from_slice(&chunk);
                        }
                    }
                }
                None => break,
            }
        }
        Ok(if over_cap { None } else { Some(buf) })
    }
}

#[async_trait]
impl ProxyHttp for WafGatewayApp {
    type CTX = Ctx;

    fn new_ctx(&self) -> Self::CTX {
        Ctx {
            request_id: Self::new_request_id(),
            client_ip: "0.0.0.0".parse().unwrap(),
            domain_view: None,
            host: String::new(),
            result: None,
            body: None,
        }
    }

    /// Request admission plus the full evaluation pipeline. Returning
    /// `Ok(true)` tells pingora a response was already written and
    /// `upstream_peer` should not be called.
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> pingora::Result<bool> {
        ctx.client_ip = session
            .client_addr()
            .and_then(|addr| addr.as_inet())
            .map(|inet| inet.ip())
            .unwrap_or_else(|| "0.0.0.0".parse().unwrap());

        let req = session.req_header();
        let method = req.method.to_string();
        let uri = req.uri.to_string();
        let path = req.uri.path().to_string();

        let host = req
            .headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .split(':')
            .next()
            .unwrap_or("")
            .to_string();
        ctx.host = host.clone();

        if path.starts_with(MANAGEMENT_PREFIX) {
            // handled by the control plane; this process never answers it.
            self.write_fixed_response(session, 404, "not found").await?;
            return Ok(true);
        }

        let Some(view) = self.cache.domain_view(&host) else {
            self.write_fixed_response(session, 404, "domain not found").await?;
            return Ok(true);
        };
        if !view.domain.enabled {
            self.write_fixed_response(session, 403, "domain disabled").await?;
            return Ok(true);
        }

        let headers: Vec<(String, String)> = req
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let user_agent = req
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        // Only pay the cost of buffering the body when at least one
        // enabled rule on this domain actually inspects it.
        let needs_body = view
            .rules
            .iter()
            .any(|r| !r.load_failed && r.match_type == crate::waf::model::MatchType::Body);
        let body = if needs_body {
            self.buffer_request_body(session).await?
        } else {
            None
        };
        ctx.body = body;

        let facts = RequestFacts {
            client_ip: ctx.client_ip,
            uri_path: &path,
            headers: &headers,
            user_agent: &user_agent,
            body: ctx.body.as_deref(),
        };

        let result = self
            .engine
            .evaluate(
                &view,
                &facts,
                self.flags.whitelist_enabled,
                self.flags.blacklist_enabled,
                self.flags.rate_limit_enabled,
            )
            .await;

        let short_circuit = matches!(result.verdict, Verdict::Block { .. });

        if let Verdict::Block {
            response_code,
            ref message,
            ref rule_name,
        } = result.verdict
        {
            self.write_block_response(session, response_code, message, rule_name, &ctx.request_id)
                .await?;
        }

        if let Some(matched) = &result.matched {
            let record = AttackLogRecord {
                request_id: ctx.request_id.clone(),
                ts: chrono::Utc::now().to_rfc3339(),
                tenant: view.domain.tenant,
                domain: view.domain.fqdn.clone(),
                client_ip: ctx.client_ip.to_string(),
                method,
                uri,
                headers_snapshot: serde_json::to_string(&headers).unwrap_or_default(),
                body_snapshot: ctx
                    .body
                    .as_deref()
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default(),
                user_agent: user_agent.clone(),
                matched_rule_id: if matched.rule_id == 0 { None } else { Some(matched.rule_id) },
                matched_field: matched.matched_field.clone(),
                matched_value: matched.matched_value.clone(),
                action: match result.verdict {
                    Verdict::Block { .. } => "block".to_string(),
                    Verdict::Allow => "allow".to_string(),
                    Verdict::Logged => "log".to_string(),
                },
                response_code: match result.verdict {
                    Verdict::Block { response_code, .. } => response_code,
                    _ => 200,
                },
            };
            self.logger.enqueue(record);
        }

        ctx.domain_view = Some(view);
        ctx.result = Some(result);
        Ok(short_circuit)
    }

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<Box<HttpPeer>> {
        let view = ctx
            .domain_view
            .as_ref()
            .expect("request_filter always resolves a domain before forwarding");
        proxy_manager::upstream_peer(&view.domain)
            .map_err(|e| pingora::Error::explain(pingora::ErrorType::InternalError, e))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream_request: &mut pingora::http::RequestHeader,
        ctx: &mut Self::CTX,
    ) -> pingora::Result<()> {
        let view = ctx
            .domain_view
            .as_ref()
            .expect("request_filter always resolves a domain before forwarding");
        upstream_request.insert_header("host", view.domain.fqdn.clone())?;
        proxy_manager::apply_forwarded_headers(
            upstream_request.headers_mut(),
            ctx.client_ip,
            &ctx.host,
            self.is_tls,
        );
        Ok(())
    }

    async fn logging(&self, session: &mut Session, e: Option<&pingora::Error>, _ctx: &mut Self::CTX) {
        let code = session.response_written().map_or(0, |r| r.status.as_u16());
        if let Some(e) = e {
            log::warn!("upstream error for {}: {}", session.req_header().uri, e);
        }
        log::debug!("response code: {}", code);
    }

    async fn fail_to_connect(
        &self,
        _session: &mut Session,
        _peer: &HttpPeer,
        ctx: &mut Self::CTX,
        e: pingora::BError,
    ) -> pingora::BError {
        log::error!("upstream dial failed for {}: {}", ctx.host, e);
        e
    }
}
