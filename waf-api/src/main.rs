//! # WAF Control-Plane API
//!
//! This binary is the control plane for the WAF: a RESTful API service for
//! managing domains, rules, policies, and block/allow lists, backed by
//! SQLite and pushed to the datapath (`waf-core`) over a Redis reload
//! channel.
//!
//! ## Architecture
//!
//! - **Actix Web**: HTTP server framework for handling REST requests
//! - **SQLite Database**: persistent storage for users and WAF configuration
//! - **Redis Streams**: reload-notification channel consumed by `waf-core`
//! - **CORS Support**: configurable cross-origin request security
//! - **JWT Authentication**: role-based access control (admin, staff, user)
//!
//! ## API Endpoints
//!
//! - `/api/v1/users` - user management and authentication
//! - `/api/v1/domains` - virtual host configuration
//! - `/api/v1/rules` - WAF match rules
//! - `/api/v1/policies` - rule groupings attached to domains
//! - `/api/v1/blacklist` / `/api/v1/whitelist` - IP/URI/UA lists
//! - `/api/v1/logs` - read-only attack log query
//!
//! ## Configuration
//!
//! Loaded from `config.yaml` in the working directory, layered with
//! environment variable overrides; see [`config::init`].
//!
//! ## Network
//!
//! By default, the service listens on port 24042 on all network interfaces
//! (0.0.0.0). This can be configured through `--ip`/`--port` flags.

mod api;
mod config;
mod module;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware, App, HttpServer};
use tracing_subscriber::EnvFilter;

/// Sets up the request-tracing side of the dual logging setup: a daily
/// rolling file under `logs/` carrying `tracing` spans for the actix-web
/// surface, independent of the `env_logger`/`log` facade used for ordinary
/// application logging. The returned guard must stay alive for the life of
/// the process or buffered writes are lost on exit.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "waf-api.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    guard
}

/// Main entry point for the WAF control-plane API server.
///
/// This function initializes the application by:
/// 1. Parsing `--ip`/`--port` from the command line
/// 2. Loading layered configuration (`config.yaml` + environment) via [`config::init`]
/// 3. Configuring CORS and JWT-aware logging middleware
/// 4. Mounting all API routes and starting the HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("RUST_LOG", "warn");
    env_logger::init();
    let _tracing_guard = init_tracing();

    // Parse command line arguments using clap
    let matches = clap::Command::new("waf-api")
        .version("0.0.1-pre")
        .about("RESTful control-plane API for the WAF")
        .arg(
            clap::Arg::new("ip")
                .long("ip")
                .help("IP address to bind the server to")
                .value_name("IP")
                .default_value("0.0.0.0"),
        )
        .arg(
            clap::Arg::new("port")
                .long("port")
                .help("Port number to bind the server to")
                .value_name("PORT")
                .default_value("24042")
                .value_parser(clap::value_parser!(u16)),
        )
        .get_matches();

    let ip = matches.get_one::<String>("ip").unwrap();
    let port = matches.get_one::<u16>("port").unwrap();
    let bind_address = format!("{}:{}", ip, port);

    config::init(&bind_address);

    log::info!("Starting API server on {}...", bind_address);

    // Configure and start actix-web server
    HttpServer::new(move || {
        // Configure CORS with permissive settings for development.
        // In production, this should be restricted to specific origins.
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .configure(api::configure)
    })
    .bind(&bind_address)?
    .workers(2)
    .run()
    .await?;

    Ok(())
}
