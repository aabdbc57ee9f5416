//! # WAF Configuration API
//!
//! CRUD endpoints for the WAF's own configuration tree: domains, rules,
//! policies (and their rule/domain associations), and block/allow lists.
//! Every mutating endpoint here ends by calling
//! [`reload::push_reload`], which rebuilds the full configuration tree from
//! SQLite and republishes it to the datapath over the Redis reload channel.
//!
//! All routes require a valid JWT; staff and admin roles may both manage
//! configuration, scoped to their own tenant unless they hold the admin
//! role (which sees and can target every tenant).

pub mod domains;
pub mod lists;
pub mod model;
pub mod policies;
pub mod reload;
pub mod rules;
pub mod schema;

use actix_web::web;

use crate::api::users::helper::{JwtAuth, RoleAuth};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/domains")
            .wrap(JwtAuth::new())
            .wrap(RoleAuth::staff())
            .configure(domains::configure),
    )
    .service(
        web::scope("/rules")
            .wrap(JwtAuth::new())
            .wrap(RoleAuth::staff())
            .configure(rules::configure),
    )
    .service(
        web::scope("/policies")
            .wrap(JwtAuth::new())
            .wrap(RoleAuth::staff())
            .configure(policies::configure),
    )
    .service(
        web::scope("/blacklist")
            .wrap(JwtAuth::new())
            .wrap(RoleAuth::staff())
            .configure(lists::configure_blacklist),
    )
    .service(
        web::scope("/whitelist")
            .wrap(JwtAuth::new())
            .wrap(RoleAuth::staff())
            .configure(lists::configure_whitelist),
    );
}

/// Initialize the WAF configuration schema. Called once at startup
/// alongside `api::users::init_database`. Seeds a default global-tenant
/// (`0`) rate-limit row from `config.yaml`/env if one doesn't already
/// exist, so a fresh deployment has sane limiter defaults from first boot.
pub fn init_database() -> Result<(), crate::module::database::DatabaseError> {
    let db = crate::module::database::get_connection()?;
    schema::ensure_tables(&db)?;

    let existing: Option<i64> = db.query_one(
        "SELECT tenant FROM rate_limits WHERE tenant = 0",
        [],
        |row| row.get(0),
    )?;
    if existing.is_none() {
        db.execute(
            "INSERT INTO rate_limits (tenant, window_secs, max_requests) VALUES (0, ?1, ?2)",
            rusqlite::params![
                crate::config::rate_limit_window_secs() as i64,
                crate::config::rate_limit_max_requests() as i64,
            ],
        )?;
    }

    Ok(())
}
