//! # Server Management Module
//!
//! This module provides the initialization and management functionality for the
//! WAF datapath's network servers: one plaintext HTTP listener and one
//! SNI-driven HTTPS listener, both running the same [`WafGatewayApp`]
//! evaluation pipeline, plus the Redis-backed control channel that carries
//! reload signals from the control plane.
//!
//! ## Server Architecture
//!
//! Both listeners run in their own pingora `Server` instance, each in its
//! own thread, so a crash or graceful shutdown of one does not affect the
//! other. Pingora drains in-flight connections on SIGINT/SIGTERM before
//! exiting, matching the bounded-drain shutdown contract.

use crate::app::waf_gateway::WafGatewayApp;
use crate::app::waf_tls::SniCertResolver;
use crate::config;
use pingora::listeners::tls::TlsSettings;
use pingora::prelude::Opt;
use pingora::server::{RunArgs, Server};
use std::thread;

/// Initialize and run both WAF listeners.
///
/// This function launches two server instances in separate threads:
/// 1. The plaintext HTTP listener, bound to `config::http_bind_addr()`.
/// 2. The TLS listener, bound to `config::https_bind_addr()`, selecting a
///    certificate per request via SNI against the config cache.
///
/// Both threads share the same process-wide [`ConfigCache`](crate::waf::cache::ConfigCache),
/// [`WafEngine`], and [`AttackLogger`], so a reload observed by one listener
/// is visible to the other on its very next request.
///
/// All servers run concurrently and this function blocks until both server
/// threads complete (typically on process shutdown).
pub fn init() {
    let cache = crate::waf::global_cache();
    let engine = crate::waf::global_engine();
    let logger = crate::waf::global_logger();

    let mut server_threads = Vec::new();

    // Plaintext HTTP listener.
    {
        let engine = engine.clone();
        let logger = logger.clone();
        let handle = thread::spawn(move || {
            let opt = Some(Opt::default());
            let mut my_server = Server::new(opt).expect("Failed to create server");
            my_server.bootstrap();

            let addr = config::http_bind_addr();
            log::info!("HTTP listener binding to {}", addr);

            let app = WafGatewayApp::new(cache, engine, logger, false);
            let mut service = pingora::proxy::http_proxy_service(&my_server.configuration, app);
            service.add_tcp(&addr);

            my_server.add_service(service);
            my_server.run(RunArgs::default());
        });
        server_threads.push(handle);
    }

    // TLS listener with dynamic, SNI-driven certificate selection.
    {
        let engine = engine.clone();
        let logger = logger.clone();
        let handle = thread::spawn(move || {
            let opt = Some(Opt::default());
            let mut my_server = Server::new(opt).expect("Failed to create server");
            my_server.bootstrap();

            let addr = config::https_bind_addr();
            log::info!("HTTPS listener binding to {}", addr);

            let app = WafGatewayApp::new(cache, engine, logger, true);
            let mut service = pingora::proxy::http_proxy_service(&my_server.configuration, app);

            let resolver = SniCertResolver::new(cache);
            let mut tls_settings = TlsSettings::with_callbacks(Box::new(resolver))
                .expect("failed to build TLS settings with SNI callback");
            // Reject anything below TLS 1.2 at the handshake layer.
            tls_settings
                .set_min_proto_version(Some(pingora::tls::ssl::SslVersion::TLS1_2))
                .expect("failed to set minimum TLS protocol version");
            service.add_tls_with_settings(&addr, None, tls_settings);

            my_server.add_service(service);
            my_server.run(RunArgs::default());
        });
        server_threads.push(handle);
    }

    // Wait for both listener threads (typically until shutdown).
    for handle in server_threads {
        log::debug!("Waiting for server thread to finish...");
        if let Err(e) = handle.join() {
            log::error!("Server thread failed: {:?}", e);
        }
    }
}
