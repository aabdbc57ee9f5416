//! Policy CRUD, plus the `policy_rules` association endpoints. A policy is
//! an ordered bundle of rules; domains attach to policies (not directly to
//! rules) via `domain_policies`, which is how one rule set can be shared
//! across many domains.

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::users::helper::{is_admin, ClaimsFromRequest};
use crate::api::waf::model::{Policy, PolicyRuleAssoc};
use crate::api::waf::reload::push_reload;
use crate::module::database::{get_connection, Database, DatabaseResult};

fn load_policy(db: &Database, id: i64) -> DatabaseResult<Option<Policy>> {
    let base = db.query_one(
        "SELECT id, tenant, name, enabled FROM policies WHERE id = ?1",
        [id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)? != 0,
            ))
        },
    )?;
    let Some((id, tenant, name, enabled)) = base else {
        return Ok(None);
    };
    let rules = db.query(
        "SELECT rule_id, priority, enabled FROM policy_rules WHERE policy_id = ?1",
        [id],
        |row| {
            Ok(PolicyRuleAssoc {
                rule_id: row.get(0)?,
                priority: row.get(1)?,
                enabled: row.get::<_, i64>(2)? != 0,
            })
        },
    )?;
    Ok(Some(Policy { id, tenant, name, enabled, rules }))
}

fn list_policies(db: &Database, tenant: Option<i64>) -> DatabaseResult<Vec<Policy>> {
    let ids: Vec<i64> = match tenant {
        Some(t) => db.query("SELECT id FROM policies WHERE tenant = ?1", [t], |row| row.get(0))?,
        None => db.query("SELECT id FROM policies", [], |row| row.get(0))?,
    };
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(policy) = load_policy(db, id)? {
            out.push(policy);
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
pub struct PolicyRequest {
    pub name: String,
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
    match list_policies(&db, tenant) {
        Ok(policies) => HttpResponse::Ok().json(policies),
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
    match load_policy(&db, path.into_inner()) {
        Ok(Some(policy)) => {
            if !is_admin(&claims.role) && policy.tenant != claims.tenant {
                return HttpResponse::NotFound().finish();
            }
            HttpResponse::Ok().json(policy)
        }
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[post("")]
pub async fn create(req: HttpRequest, body: web::Json<PolicyRequest>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let tenant = if is_admin(&claims.role) { body.tenant.unwrap_or(0) } else { claims.tenant };

    let result = db.execute(
        "INSERT INTO policies (tenant, name, enabled) VALUES (?1, ?2, ?3)",
        rusqlite::params![tenant, body.name, body.enabled.unwrap_or(true) as i64],
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
pub async fn update(req: HttpRequest, path: web::Path<i64>, body: web::Json<PolicyRequest>) -> impl Responder {
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
        match db.query_one("SELECT tenant FROM policies WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    match db.execute(
        "UPDATE policies SET name = ?1, enabled = ?2 WHERE id = ?3",
        rusqlite::params![body.name, body.enabled.unwrap_or(true) as i64, id],
    ) {
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
        match db.query_one("SELECT tenant FROM policies WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let _ = db.execute("DELETE FROM policy_rules WHERE policy_id = ?1", [id]);
    let _ = db.execute("DELETE FROM domain_policies WHERE policy_id = ?1", [id]);
    match db.execute("DELETE FROM policies WHERE id = ?1", [id]) {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "deleted"}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[derive(Debug, Deserialize)]
pub struct PolicyRuleRequest {
    pub rule_id: i64,
    pub priority: i64,
    pub enabled: Option<bool>,
}

/// Attach (or re-prioritize) a rule within a policy.
#[put("/{id}/rules")]
pub async fn attach_rule(req: HttpRequest, path: web::Path<i64>, body: web::Json<PolicyRuleRequest>) -> impl Responder {
    if req.get_claims().is_none() {
        return HttpResponse::Unauthorized().finish();
    }
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let policy_id = path.into_inner();

    let result = db.execute(
        "INSERT INTO policy_rules (policy_id, rule_id, priority, enabled) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(policy_id, rule_id) DO UPDATE SET priority = excluded.priority, enabled = excluded.enabled",
        rusqlite::params![policy_id, body.rule_id, body.priority, body.enabled.unwrap_or(true) as i64],
    );

    match result {
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "attached"}))
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[delete("/{id}/rules/{rule_id}")]
pub async fn detach_rule(req: HttpRequest, path: web::Path<(i64, i64)>) -> impl Responder {
    if req.get_claims().is_none() {
        return HttpResponse::Unauthorized().finish();
    }
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let (policy_id, rule_id) = path.into_inner();
    match db.execute(
        "DELETE FROM policy_rules WHERE policy_id = ?1 AND rule_id = ?2",
        [policy_id, rule_id],
    ) {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "detached"}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list)
        .service(get_one)
        .service(create)
        .service(update)
        .service(remove)
        .service(attach_rule)
        .service(detach_rule);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::waf::schema::ensure_tables;

    #[test]
    fn load_policy_includes_attached_rules() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO rules (tenant, name, match_type, match_mode, pattern, action, response_code, priority, enabled) \
             VALUES (9006, 'policy-assoc-rule', 'uri', 'exact', '/x', 'log', 200, 0, 1)",
            [],
        )
        .expect("insert rule");
        let rule_id: i64 = db
            .query_one("SELECT id FROM rules WHERE name = 'policy-assoc-rule'", [], |row| row.get(0))
            .expect("select rule id")
            .expect("rule row missing");

        db.execute(
            "INSERT INTO policies (tenant, name, enabled) VALUES (9006, 'policy-assoc-test', 1)",
            [],
        )
        .expect("insert policy");
        let policy_id: i64 = db
            .query_one("SELECT id FROM policies WHERE name = 'policy-assoc-test'", [], |row| row.get(0))
            .expect("select policy id")
            .expect("policy row missing");

        db.execute(
            "INSERT INTO policy_rules (policy_id, rule_id, priority, enabled) VALUES (?1, ?2, 5, 1)",
            rusqlite::params![policy_id, rule_id],
        )
        .expect("insert assoc");

        let policy = load_policy(&db, policy_id).expect("load_policy failed").expect("policy missing");
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].rule_id, rule_id);
        assert_eq!(policy.rules[0].priority, 5);

        assert!(load_policy(&db, -1).expect("load_policy should not error on miss").is_none());

        db.execute("DELETE FROM policy_rules WHERE policy_id = ?1", [policy_id]).ok();
        db.execute("DELETE FROM policies WHERE id = ?1", [policy_id]).ok();
        db.execute("DELETE FROM rules WHERE id = ?1", [rule_id]).ok();
    }
}
