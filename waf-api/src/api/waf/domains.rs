//! Domain CRUD. A domain binds one FQDN to one backend and carries its own
//! protocol/port/TLS material; it is the row the datapath's SNI resolver and
//! host-header lookup both key off of.

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::users::helper::{is_admin, ClaimsFromRequest};
use crate::api::waf::model::{Domain, Protocol};
use crate::api::waf::reload::push_reload;
use crate::module::database::{get_connection, Database, DatabaseResult};

fn row_to_domain(row: &rusqlite::Row<'_>) -> rusqlite::Result<Domain> {
    Ok(Domain {
        id: row.get(0)?,
        tenant: row.get(1)?,
        fqdn: row.get(2)?,
        protocol: row.get::<_, String>(3)?.into(),
        port: row.get::<_, i64>(4)? as u16,
        backend_url: row.get(5)?,
        tls_cert: row.get(6)?,
        tls_key: row.get(7)?,
        enabled: row.get::<_, i64>(8)? != 0,
    })
}

const SELECT_DOMAIN: &str =
    "SELECT id, tenant, fqdn, protocol, port, backend_url, tls_cert, tls_key, enabled FROM domains";

fn list_domains(db: &Database, tenant: Option<i64>) -> DatabaseResult<Vec<Domain>> {
    match tenant {
        Some(t) => db.query(
            &format!("{SELECT_DOMAIN} WHERE tenant = ?1"),
            [t],
            row_to_domain,
        ),
        None => db.query(SELECT_DOMAIN, [], row_to_domain),
    }
}

/// `https` domains must carry both halves of their TLS material; the
/// datapath's SNI resolver has nothing to hand back otherwise.
fn https_requires_cert_and_key(protocol: &Protocol, tls_cert: &Option<String>, tls_key: &Option<String>) -> bool {
    *protocol != Protocol::Https
        || (tls_cert.as_deref().is_some_and(|v| !v.is_empty()) && tls_key.as_deref().is_some_and(|v| !v.is_empty()))
}

#[derive(Debug, Deserialize)]
pub struct DomainRequest {
    pub fqdn: String,
    pub protocol: String,
    pub port: u16,
    pub backend_url: String,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub enabled: Option<bool>,
    /// Only honored for admins; staff/user requests are pinned to their own
    /// tenant regardless of what is sent here.
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
    match list_domains(&db, tenant) {
        Ok(domains) => HttpResponse::Ok().json(domains),
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
    match db.query_one(&format!("{SELECT_DOMAIN} WHERE id = ?1"), [path.into_inner()], row_to_domain) {
        Ok(Some(domain)) => {
            if !is_admin(&claims.role) && domain.tenant != claims.tenant {
                return HttpResponse::NotFound().finish();
            }
            HttpResponse::Ok().json(domain)
        }
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[post("")]
pub async fn create(req: HttpRequest, body: web::Json<DomainRequest>) -> impl Responder {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let protocol = Protocol::from(body.protocol.clone());
    let tenant = if is_admin(&claims.role) { body.tenant.unwrap_or(0) } else { claims.tenant };

    if !https_requires_cert_and_key(&protocol, &body.tls_cert, &body.tls_key) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "https domains require both tls_cert and tls_key"}));
    }

    let result = db.execute(
        "INSERT INTO domains (tenant, fqdn, protocol, port, backend_url, tls_cert, tls_key, enabled) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            tenant,
            body.fqdn,
            protocol.as_str(),
            body.port as i64,
            body.backend_url,
            body.tls_cert,
            body.tls_key,
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
pub async fn update(req: HttpRequest, path: web::Path<i64>, body: web::Json<DomainRequest>) -> impl Responder {
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
        match db.query_one("SELECT tenant FROM domains WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            Ok(Some(_)) => return HttpResponse::NotFound().finish(),
            Ok(None) => return HttpResponse::NotFound().finish(),
            Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
        }
    }

    let protocol = Protocol::from(body.protocol.clone());

    if !https_requires_cert_and_key(&protocol, &body.tls_cert, &body.tls_key) {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "https domains require both tls_cert and tls_key"}));
    }

    let result = db.execute(
        "UPDATE domains SET fqdn = ?1, protocol = ?2, port = ?3, backend_url = ?4, tls_cert = ?5, tls_key = ?6, enabled = ?7 WHERE id = ?8",
        rusqlite::params![
            body.fqdn,
            protocol.as_str(),
            body.port as i64,
            body.backend_url,
            body.tls_cert,
            body.tls_key,
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
        match db.query_one("SELECT tenant FROM domains WHERE id = ?1", [id], |row| row.get::<_, i64>(0)) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let _ = db.execute("DELETE FROM domain_policies WHERE domain_id = ?1", [id]);
    let _ = db.execute("DELETE FROM list_entry_domains WHERE domain_id = ?1", [id]);
    match db.execute("DELETE FROM domains WHERE id = ?1", [id]) {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "deleted"}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[derive(Debug, Deserialize)]
pub struct DomainPolicyRequest {
    pub policy_id: i64,
    pub priority: i64,
    pub enabled: Option<bool>,
}

/// Attach a policy to a domain, replacing any existing association between
/// the two (upsert via delete-then-insert, matching the simple idiom the
/// policy-rule association endpoint below uses).
#[put("/{id}/policies")]
pub async fn attach_policy(req: HttpRequest, path: web::Path<i64>, body: web::Json<DomainPolicyRequest>) -> impl Responder {
    if req.get_claims().is_none() {
        return HttpResponse::Unauthorized().finish();
    }
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let domain_id = path.into_inner();

    let result = db.execute(
        "INSERT INTO domain_policies (domain_id, policy_id, priority, enabled) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(domain_id, policy_id) DO UPDATE SET priority = excluded.priority, enabled = excluded.enabled",
        rusqlite::params![domain_id, body.policy_id, body.priority, body.enabled.unwrap_or(true) as i64],
    );

    match result {
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "attached"}))
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[delete("/{id}/policies/{policy_id}")]
pub async fn detach_policy(req: HttpRequest, path: web::Path<(i64, i64)>) -> impl Responder {
    if req.get_claims().is_none() {
        return HttpResponse::Unauthorized().finish();
    }
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let (domain_id, policy_id) = path.into_inner();
    match db.execute(
        "DELETE FROM domain_policies WHERE domain_id = ?1 AND policy_id = ?2",
        [domain_id, policy_id],
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
        .service(attach_policy)
        .service(detach_policy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::waf::schema::ensure_tables;

    #[test]
    fn list_domains_scopes_by_tenant() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO domains (tenant, fqdn, protocol, port, backend_url, enabled) \
             VALUES (9002, 'tenant-scope-test.example', 'http', 80, 'http://127.0.0.1:9000', 1)",
            [],
        )
        .expect("insert domain");
        let id: i64 = db
            .query_one(
                "SELECT id FROM domains WHERE fqdn = 'tenant-scope-test.example'",
                [],
                |row| row.get(0),
            )
            .expect("select domain id")
            .expect("domain row missing");

        let scoped = list_domains(&db, Some(9002)).expect("scoped list failed");
        assert!(scoped.iter().any(|d| d.id == id));

        let other_tenant = list_domains(&db, Some(9003)).expect("other-tenant list failed");
        assert!(!other_tenant.iter().any(|d| d.id == id));

        db.execute("DELETE FROM domains WHERE id = ?1", [id]).ok();
    }

    #[test]
    fn https_requires_cert_and_key_rejects_missing_material() {
        assert!(!https_requires_cert_and_key(&Protocol::Https, &None, &None));
        assert!(!https_requires_cert_and_key(
            &Protocol::Https,
            &Some("cert".to_string()),
            &None
        ));
        assert!(!https_requires_cert_and_key(
            &Protocol::Https,
            &Some(String::new()),
            &Some("key".to_string())
        ));
        assert!(https_requires_cert_and_key(
            &Protocol::Https,
            &Some("cert".to_string()),
            &Some("key".to_string())
        ));
        assert!(https_requires_cert_and_key(&Protocol::Http, &None, &None));
    }
}
