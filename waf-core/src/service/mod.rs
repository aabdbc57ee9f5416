//! # Service Module
//!
//! Builds the pingora `Service` instances the server bootstraps, and hosts
//! the registry client that listens for control-plane update notifications
//! over Redis pub/sub.
//!
//! ## Module Structure
//!
//! * `registry`: subscribes to the control-plane's Redis update stream and
//!   triggers a config cache reload when notified.
//!
//! The HTTP/HTTPS listening services themselves are built directly in
//! [`crate::system::server`] via `pingora::proxy::http_proxy_service`,
//! wrapping [`crate::app::waf_gateway::WafGatewayApp`].

pub mod registry;
