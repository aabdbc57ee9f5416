//! Block/allow list CRUD. Both kinds share one table (`list_entries`,
//! discriminated by `kind`) since matching is identical either way; only the
//! engine's evaluation order treats them differently (whitelist first,
//! blacklist second, both terminal). Mounted twice under `/blacklist` and
//! `/whitelist` with the kind fixed by the route.

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;

use crate::api::users::helper::{is_admin, ClaimsFromRequest};
use crate::api::waf::model::{ListEntry, ListKind, ListType};
use crate::api::waf::reload::push_reload;
use crate::module::database::{get_connection, Database, DatabaseResult};

fn load_entry(db: &Database, id: i64) -> DatabaseResult<Option<ListEntry>> {
    let base = db.query_one(
        "SELECT id, tenant, kind, entry_type, value, enabled, comment FROM list_entries WHERE id = ?1",
        [id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)? != 0,
                row.get::<_, Option<String>>(6)?,
            ))
        },
    )?;
    let Some((id, tenant, kind, entry_type, value, enabled, comment)) = base else {
        return Ok(None);
    };
    let domains = db.query(
        "SELECT domain_id FROM list_entry_domains WHERE entry_id = ?1",
        [id],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(Some(ListEntry {
        id,
        tenant,
        kind: ListKind::from(kind),
        entry_type: ListType::from(entry_type),
        value,
        enabled,
        comment,
        domains,
    }))
}

fn list_entries(db: &Database, kind: ListKind, tenant: Option<i64>) -> DatabaseResult<Vec<ListEntry>> {
    let ids: Vec<i64> = match tenant {
        Some(t) => db.query(
            "SELECT id FROM list_entries WHERE kind = ?1 AND tenant = ?2",
            rusqlite::params![kind.as_str(), t],
            |row| row.get(0),
        )?,
        None => db.query(
            "SELECT id FROM list_entries WHERE kind = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?,
    };
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(entry) = load_entry(db, id)? {
            out.push(entry);
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
pub struct ListEntryRequest {
    pub entry_type: String,
    pub value: String,
    pub enabled: Option<bool>,
    pub comment: Option<String>,
    pub domains: Option<Vec<i64>>,
    pub tenant: Option<i64>,
}

fn set_entry_domains(db: &Database, entry_id: i64, domains: &[i64]) -> DatabaseResult<()> {
    db.execute("DELETE FROM list_entry_domains WHERE entry_id = ?1", [entry_id])?;
    for domain_id in domains {
        db.execute(
            "INSERT INTO list_entry_domains (entry_id, domain_id) VALUES (?1, ?2)",
            rusqlite::params![entry_id, domain_id],
        )?;
    }
    Ok(())
}

async fn list_impl(req: HttpRequest, kind: ListKind) -> HttpResponse {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let tenant = if is_admin(&claims.role) { None } else { Some(claims.tenant) };
    match list_entries(&db, kind, tenant) {
        Ok(entries) => HttpResponse::Ok().json(entries),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

async fn create_impl(req: HttpRequest, body: web::Json<ListEntryRequest>, kind: ListKind) -> HttpResponse {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };
    let tenant = if is_admin(&claims.role) { body.tenant.unwrap_or(0) } else { claims.tenant };
    let entry_type = ListType::from(body.entry_type.clone());

    let result = db.execute(
        "INSERT INTO list_entries (tenant, kind, entry_type, value, enabled, comment) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            tenant,
            kind.as_str(),
            entry_type.as_str(),
            body.value,
            body.enabled.unwrap_or(true) as i64,
            body.comment,
        ],
    );

    let entry_id = match result {
        Ok(_) => db.query_one("SELECT last_insert_rowid()", [], |row| row.get::<_, i64>(0)),
        Err(e) => return HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    };

    match entry_id {
        Ok(Some(id)) => {
            if let Some(domains) = &body.domains {
                if let Err(e) = set_entry_domains(&db, id, domains) {
                    return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()}));
                }
            }
            push_reload(&db);
            HttpResponse::Created().json(serde_json::json!({"status": "created", "id": id}))
        }
        _ => HttpResponse::InternalServerError().json(serde_json::json!({"error": "failed to read inserted id"})),
    }
}

async fn update_impl(req: HttpRequest, id: i64, body: web::Json<ListEntryRequest>, kind: ListKind) -> HttpResponse {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };

    if !is_admin(&claims.role) {
        match db.query_one(
            "SELECT tenant FROM list_entries WHERE id = ?1 AND kind = ?2",
            rusqlite::params![id, kind.as_str()],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let entry_type = ListType::from(body.entry_type.clone());
    let result = db.execute(
        "UPDATE list_entries SET entry_type = ?1, value = ?2, enabled = ?3, comment = ?4 WHERE id = ?5 AND kind = ?6",
        rusqlite::params![
            entry_type.as_str(),
            body.value,
            body.enabled.unwrap_or(true) as i64,
            body.comment,
            id,
            kind.as_str(),
        ],
    );

    match result {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            if let Some(domains) = &body.domains {
                if let Err(e) = set_entry_domains(&db, id, domains) {
                    return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()}));
                }
            }
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "updated"}))
        }
        Err(e) => HttpResponse::BadRequest().json(serde_json::json!({"error": e.to_string()})),
    }
}

async fn remove_impl(req: HttpRequest, id: i64, kind: ListKind) -> HttpResponse {
    let claims = match req.get_claims() {
        Some(c) => c,
        None => return HttpResponse::Unauthorized().finish(),
    };
    let db = match get_connection() {
        Ok(db) => db,
        Err(e) => return HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    };

    if !is_admin(&claims.role) {
        match db.query_one(
            "SELECT tenant FROM list_entries WHERE id = ?1 AND kind = ?2",
            rusqlite::params![id, kind.as_str()],
            |row| row.get::<_, i64>(0),
        ) {
            Ok(Some(tenant)) if tenant == claims.tenant => {}
            _ => return HttpResponse::NotFound().finish(),
        }
    }

    let _ = db.execute("DELETE FROM list_entry_domains WHERE entry_id = ?1", [id]);
    match db.execute("DELETE FROM list_entries WHERE id = ?1 AND kind = ?2", rusqlite::params![id, kind.as_str()]) {
        Ok(0) => HttpResponse::NotFound().finish(),
        Ok(_) => {
            push_reload(&db);
            HttpResponse::Ok().json(serde_json::json!({"status": "deleted"}))
        }
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({"error": e.to_string()})),
    }
}

#[get("")]
pub async fn list_blacklist(req: HttpRequest) -> impl Responder {
    list_impl(req, ListKind::Blacklist).await
}

#[post("")]
pub async fn create_blacklist(req: HttpRequest, body: web::Json<ListEntryRequest>) -> impl Responder {
    create_impl(req, body, ListKind::Blacklist).await
}

#[put("/{id}")]
pub async fn update_blacklist(req: HttpRequest, path: web::Path<i64>, body: web::Json<ListEntryRequest>) -> impl Responder {
    update_impl(req, path.into_inner(), body, ListKind::Blacklist).await
}

#[delete("/{id}")]
pub async fn delete_blacklist(req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    remove_impl(req, path.into_inner(), ListKind::Blacklist).await
}

#[get("")]
pub async fn list_whitelist(req: HttpRequest) -> impl Responder {
    list_impl(req, ListKind::Whitelist).await
}

#[post("")]
pub async fn create_whitelist(req: HttpRequest, body: web::Json<ListEntryRequest>) -> impl Responder {
    create_impl(req, body, ListKind::Whitelist).await
}

#[put("/{id}")]
pub async fn update_whitelist(req: HttpRequest, path: web::Path<i64>, body: web::Json<ListEntryRequest>) -> impl Responder {
    update_impl(req, path.into_inner(), body, ListKind::Whitelist).await
}

#[delete("/{id}")]
pub async fn delete_whitelist(req: HttpRequest, path: web::Path<i64>) -> impl Responder {
    remove_impl(req, path.into_inner(), ListKind::Whitelist).await
}

pub fn configure_blacklist(cfg: &mut web::ServiceConfig) {
    cfg.service(list_blacklist)
        .service(create_blacklist)
        .service(update_blacklist)
        .service(delete_blacklist);
}

pub fn configure_whitelist(cfg: &mut web::ServiceConfig) {
    cfg.service(list_whitelist)
        .service(create_whitelist)
        .service(update_whitelist)
        .service(delete_whitelist);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::waf::schema::ensure_tables;

    #[test]
    fn blacklist_and_whitelist_entries_stay_in_their_own_kind() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO list_entries (tenant, kind, entry_type, value, enabled, comment) \
             VALUES (9007, 'blacklist', 'ip', '203.0.113.5', 1, NULL)",
            [],
        )
        .expect("insert blacklist entry");
        db.execute(
            "INSERT INTO list_entries (tenant, kind, entry_type, value, enabled, comment) \
             VALUES (9007, 'whitelist', 'ip', '203.0.113.6', 1, NULL)",
            [],
        )
        .expect("insert whitelist entry");

        let blacklisted = list_entries(&db, ListKind::Blacklist, Some(9007)).expect("list blacklist failed");
        let whitelisted = list_entries(&db, ListKind::Whitelist, Some(9007)).expect("list whitelist failed");

        assert!(blacklisted.iter().any(|e| e.value == "203.0.113.5"));
        assert!(!blacklisted.iter().any(|e| e.value == "203.0.113.6"));
        assert!(whitelisted.iter().any(|e| e.value == "203.0.113.6"));
        assert!(!whitelisted.iter().any(|e| e.value == "203.0.113.5"));

        db.execute("DELETE FROM list_entries WHERE tenant = 9007", []).ok();
    }

    #[test]
    fn set_entry_domains_replaces_prior_associations() {
        let db = get_connection().expect("failed to connect to database");
        ensure_tables(&db).expect("failed to ensure schema");

        db.execute(
            "INSERT INTO domains (tenant, fqdn, protocol, port, backend_url, enabled) \
             VALUES (9008, 'list-domain-assoc.example', 'http', 80, 'http://127.0.0.1:9001', 1)",
            [],
        )
        .expect("insert domain");
        let domain_id: i64 = db
            .query_one(
                "SELECT id FROM domains WHERE fqdn = 'list-domain-assoc.example'",
                [],
                |row| row.get(0),
            )
            .expect("select domain id")
            .expect("domain row missing");

        db.execute(
            "INSERT INTO list_entries (tenant, kind, entry_type, value, enabled, comment) \
             VALUES (9008, 'blacklist', 'uri', '/blocked', 1, NULL)",
            [],
        )
        .expect("insert entry");
        let entry_id: i64 = db
            .query_one("SELECT id FROM list_entries WHERE value = '/blocked'", [], |row| row.get(0))
            .expect("select entry id")
            .expect("entry row missing");

        set_entry_domains(&db, entry_id, &[domain_id]).expect("set_entry_domains failed");
        let entry = load_entry(&db, entry_id).expect("load_entry failed").expect("entry missing");
        assert_eq!(entry.domains, vec![domain_id]);

        set_entry_domains(&db, entry_id, &[]).expect("clearing domains failed");
        let entry = load_entry(&db, entry_id).expect("load_entry failed").expect("entry missing");
        assert!(entry.domains.is_empty());

        db.execute("DELETE FROM list_entries WHERE id = ?1", [entry_id]).ok();
        db.execute("DELETE FROM domains WHERE id = ?1", [domain_id]).ok();
    }
}
