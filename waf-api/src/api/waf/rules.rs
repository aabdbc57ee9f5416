//! Rule CRUD. A rule is a standalone pattern/action pair; it only takes
//! effect once attached to a policy via [`crate::api::waf::policies`], which
//! is also where its per-policy priority override lives.

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::users::helper::{is_admin, ClaimsFromRequest};
use crate::api::waf::model::{MatchMode, MatchType, Rule, RuleAction};
use crate::api::waf::reload::push_reload;
use crate::module::database::{get_connection, Database, DatabaseResult};

const SELECT_RULE: &str = "SELECT id, tenant, name, match_type, match_mode, pattern, action, response_code, response_message, priority, enabled FROM rules";

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rule> {
    Ok(Rule {
        id: row.get(0)?,
        tenant: row.get(1)?,
        name: row.get(2)?,
        match_type: MatchType::from(row.get::<_, String>(3)?),
        match_mode: MatchMode::from(row.get::<_, String>(4)?),
        pattern: row.get(5)?,
        action: RuleAction::from(row.get::<_, String>(6)?),
        response_code: row.get::<_, i64>(7)? as u16,
        response_message: row.get(8)?,
        priority: row.get(9)?,
        enabled: row.get::<_, i64>(10)? != 0,
    })
}

fn list_rules(db: &Database, tenant: Option<i64>) -> DatabaseResult<Vec<Rule>> {
    match tenant {
        Some(t) => db.query(&format!("{SELECT_RULE} WHERE tenant = ?1"), [t], row_to_rule),
        None => db.query(SELECT_RULE, [], row_to_rule),
    }
}

#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub name: String,
    pub match_type: String,
    pub match_mode: String,
    pub pattern: String,
    pub action: String,
    pub response_code: Option<u16>,
    pub response_message: Option<String>,
    pub priority: Option<i64>,
    pub enabled: Option<bool>,
    pub tenant: Option<i64>,
}

#[get("")]
pub async fn list(req: HttpRequest) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let tenant = if is_admin(&claims.role) { None } else { Some(claims.tenant) };
    match list_rules(&db, tenant) {
        Ok(rules) => HttpResponse::Ok().json(rules),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[get("/{id}")]
pub async fn get_one(req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    match db.query_one(&format!("{SELECT_RULE} WHERE id = ?1"), [path.into_inner()], row_to_rule) {
        Ok(Some(rule)) => {
            if !is_admin(&claims.role) && rule.tenant != claims.tenant {
                return HttpResponse::NotFound().finish();
            }
            HttpResponse::Ok().json(rule)
        }
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[post("")]
pub async fn create(req: HttpRequest, body: web::Json<RuleRequest>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let tenant = if is_admin(&claims.role) { body.tenant.unwrap_or(0) } else { claims.tenant };
    let match_type = MatchType::from(body.match_type.clone());
    let match_mode = MatchMode::from(body.match_mode.clone());
    let action = RuleAction::from(body.action.clone());

    let result = db.execute(
        "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, response_message, priority, enabled)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            tenant,
            body.name,
            match_type.as_str(),
            match_mode.as_str(),
            body.pattern,
            action.as_str(),
            body.response_code.unwrap_or(403) as i64,
            body.response_message,
            body.priority.unwrap_or(0),
            body.enabled.unwrap_or(true) as i64,
        ],
    );

    match result {
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Created().json(serde_json::json!({"status": "created"}))
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[put("/{id}")]
pub async fn update(req: HttpRequest, path: web::Path<i64>, body: web::Json<RuleRequest>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let id = path.into_inner();

    if !is_admin(&claims.role) {
        match db.query_one("SELECT tenant FROM rules WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let match_type = MatchType::from(body.match_type.clone());
    let match_mode = MatchMode::from(body.match_mode.clone());
    let action = RuleAction::from(body.action.clone());

    let result = db.execute(
        "UPDATE rules SET name = ?1, match_type = ?2, match_mode = ?3, pattern = ?4, action = ?5, response_code = ?6, response_message = ?7, priority = ?8, enabled = ?9 WHERE id = ?10",
        rusqlite::params![
            body.name,
            match_type.as_str(),
            match_mode.as_str(),
            body.pattern,
            action.as_str(),
            body.response_code.unwrap_or(403) as i64,
            body.response_message,
            body.priority.unwrap_or(0),
            body.enabled.unwrap_or(true) as i64,
            id,
        ],
    );

    match result {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "updated"}))
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[delete("/{id}")]
pub async fn remove(req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let id = path.into_inner();

    if !is_admin(&claims.role) {
        match db.query_one("SELECT tenant FROM rules WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let _ = db.execute("DELETE FROM policy_rules WHERE rule_id = ?1", [id]);
    match db.execute("DELETE FROM rules WHERE id = ?1", [id]) {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "deleted"}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list).service(get_one).service(create).service(update).service(remove);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::waf::schema::ensure_tables;

    #[test]
    fn list_rules_scopes_by_tenant() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, priority, enabled) \
             VALUES (9004, 'rule-scope-test', 'ip', 'exact', '10.0.0.1', 'block', 403, 0, 1)",
            [],
        )
        .expect("insert rule");
        let id: i64 = db
            .query_one("SELECT id FROM rules WHERE name = 'rule-scope-test'", [], |row| row.get(0))
            .expect("select rule id")
            .expect("rule row missing");

        let scoped = list_rules(&db, Some(9004)).expect("scoped list failed");
        let found = scoped.iter().find(|r| r.id == id).expect("rule missing from scoped list");
        assert_eq!(found.match_type.as_str(), "ip");
        assert_eq!(found.action.as_str(), "block");

        let other_tenant = list_rules(&db, Some(9005)).expect("other-tenant list failed");
        assert!(!other_tenant.iter().any(|r| r.id == id));

        db.execute("DELETE FROM rules WHERE id = ?1", [id]).ok();
    }

    #[test]
    fn duplicate_name_within_tenant_is_rejected() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        let insert = "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, priority, enabled) \
             VALUES (9006, 'rule-unique-test', 'ip', 'exact', '10.0.0.1', 'block', 403, 0, 1)";
        db.execute(insert, []).expect("first insert should succeed");
        let dup = db.execute(insert, []);
        assert!(dup.is_err(), "duplicate (tenant, name) should violate the unique constraint");

        let other_tenant = db.execute(
            "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, priority, enabled) \
             VALUES (9007, 'rule-unique-test', 'ip', 'exact', '10.0.0.1', 'block', 403, 0, 1)",
            [],
        );
        assert!(other_tenant.is_ok(), "same name under a different tenant should be allowed");

        db.execute("DELETE FROM rules WHERE name = 'rule-unique-test'", []).ok();
    }
}
