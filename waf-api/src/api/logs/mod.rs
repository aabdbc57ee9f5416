//! # Attack Log Query API
//!
//! Read-only access to the `attack_log` table the datapath's
//! `waf_core::waf::attacklog::SqliteSink` writes to. The control plane never
//! writes to this table, only reads it — both sides share the same SQLite
//! file (`/tmp/gwrs/data/core` by default), so a row written by the
//! datapath a moment ago is visible here without any extra plumbing.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::users::helper::{is_admin, ClaimsFromRequest};
use crate::api::waf::model::AttackLogRecord;
use crate::module::database::get_connection;

const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub domain: Option<String>,
    pub client_ip: Option<String>,
    pub action: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttackLogRecord> {
    Ok(AttackLogRecord {
        request_id: row.get(0)?,
        ts: row.get(1)?,
        tenant: row.get(2)?,
        domain: row.get(3)?,
        client_ip: row.get(4)?,
        method: row.get(5)?,
        uri: row.get(6)?,
        headers_snapshot: row.get(7)?,
        body_snapshot: row.get(8)?,
        user_agent: row.get(9)?,
        matched_rule_id: row.get(10)?,
        matched_field: row.get(11)?,
        matched_value: row.get(12)?,
        action: row.get(13)?,
        response_code: row.get::<_, i64>(14)? as u16,
    })
}

#[get("")]
pub async fn query(req: HttpRequest, params: web::Query<LogQuery>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };

    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };

    let mut sql = String::from(
        "SELECT request_id, ts, tenant, domain, client_ip, method, uri, headers_snapshot, body_snapshot, user_agent, matched_rule_id, matched_field, matched_value, action, response_code FROM attack_log WHERE 1 = 1",
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if !is_admin(&claims.role) {
        sql.push_str(" AND tenant = ?");
        args.push(Box::new(claims.tenant));
    }
    if let Some(domain) = &params.domain {
        sql.push_str(" AND domain = ?");
        args.push(Box::new(domain.clone()));
    }
    if let Some(client_ip) = &params.client_ip {
        sql.push_str(" AND client_ip = ?");
        args.push(Box::new(client_ip.clone()));
    }
    if let Some(action) = &params.action {
        sql.push_str(" AND action = ?");
        args.push(Box::new(action.clone()));
    }
    if let Some(since) = &params.since {
        sql.push_str(" AND ts >= ?");
        args.push(Box::new(since.clone()));
    }
    if let Some(until) = &params.until {
        sql.push_str(" AND ts <= ?");
        args.push(Box::new(until.clone()));
    }

    sql.push_str(" ORDER BY ts DESC LIMIT ? OFFSET ?");
    let limit = params.limit.unwrap_or(100).clamp(1, MAX_LIMIT);
    args.push(Box::new(limit));
    args.push(Box::new(params.offset.unwrap_or(0).max(0)));

    let params_ref: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();

    match db.query(&sql, params_ref.as_slice(), row_to_record) {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(query);
}
