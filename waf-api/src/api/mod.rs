//! # API Module
//!
//! This module contains the RESTful API endpoints and handlers for the WAF
//! control plane. It organizes the API into logical modules for different
//! functionality domains.
//!
//! ## Module Structure
//!
//! - `users`: user management, authentication, and authorization
//! - `waf`: domain/rule/policy/list configuration CRUD, pushing reloads to the datapath
//! - `logs`: read-only attack-log query
//!
//! ## API Configuration
//!
//! All API endpoints are mounted under the `/api/v1` prefix and follow RESTful conventions.
//! Authentication is applied per-scope through JWT middleware, with specific role
//! requirements enforced at the individual endpoint level.

pub mod logs;
pub mod users;
pub mod waf;

use actix_web::web;
use users::init_database;

/// Configure and mount all API routes for the application.
///
/// This function is called during application startup to register all API routes
/// and middleware with the Actix Web service configuration. It initializes the
/// users and WAF-configuration schemas and mounts all API endpoints under the
/// `/api/v1` prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    if let Err(e) = init_database() {
        eprintln!("Error initializing users database: {}", e);
    }
    if let Err(e) = waf::init_database() {
        eprintln!("Error initializing WAF configuration database: {}", e);
    }

    cfg.service(
        web::scope("/api/v1")
            .configure(users::configure)
            .configure(waf::configure)
            .service(
                web::scope("/logs")
                    .wrap(users::helper::JwtAuth::new())
                    .configure(logs::configure),
            ),
    );
}
