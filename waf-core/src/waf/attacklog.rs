//! Attack logger: async persistence of match records via a bounded queue
//! and a small writer pool. On overflow the oldest queued record is
//! dropped (never the newest, and never back-pressure the caller) — the
//! same bounded-queue, drop-oldest discipline as the log writer pool in
//! `system::writer`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::waf::model::AttackLogRecord;

/// A sink the writer pool persists records into. `waf-core` has no direct
/// SQLite access (that belongs to the control plane); the default sink logs
/// to stderr, while a production deployment supplies a sink that forwards
/// rows to the control plane for storage in its queryable attack log table.
pub trait AttackLogSink: Send + Sync + 'static {
    fn persist(&self, record: &AttackLogRecord);
}

pub struct StderrSink;
impl AttackLogSink for StderrSink {
    fn persist(&self, record: &AttackLogRecord) {
        log::info!(
            "attack-log request_id={} domain={} rule={} action={} code={}",
            record.request_id,
            record.domain,
            record.matched_rule_id.map(|i| i.to_string()).unwrap_or_else(|| "blacklist/rate-limit".into()),
            record.action,
            record.response_code
        );
    }
}

/// Persists attack log rows into the control plane's shared SQLite file so
/// they're queryable from `waf-api`. The table is created on first use with
/// the same column layout the control plane's attack log query module reads.
pub struct SqliteSink {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the shared database file at the given path and
    /// ensures the `attack_log` table exists. Returns `None` if the file or
    /// directory cannot be prepared, so the caller can fall back to
    /// `StderrSink` instead of failing datapath startup over a logging sink.
    pub fn open(path: &std::path::Path) -> Option<SqliteSink> {
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::error!("attack log sqlite sink: failed to create {}: {}", dir.display(), e);
                return None;
            }
        }
        let conn = match rusqlite::Connection::open(path) {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("attack log sqlite sink: failed to open {}: {}", path.display(), e);
                return None;
            }
        };
        let create = conn.execute(
            "CREATE TABLE IF NOT EXISTS attack_log (
                request_id TEXT PRIMARY KEY,
                ts TEXT NOT NULL,
                tenant INTEGER NOT NULL,
                domain TEXT NOT NULL,
                client_ip TEXT NOT NULL,
                method TEXT NOT NULL,
                uri TEXT NOT NULL,
                headers_snapshot TEXT NOT NULL,
                body_snapshot TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                matched_rule_id INTEGER,
                matched_field TEXT NOT NULL,
                matched_value TEXT NOT NULL,
                action TEXT NOT NULL,
                response_code INTEGER NOT NULL
            )",
            [],
        );
        if let Err(e) = create {
            log::error!("attack log sqlite sink: failed to create table: {}", e);
            return None;
        }
        Some(SqliteSink {
            conn: std::sync::Mutex::new(conn),
        })
    }
}

impl AttackLogSink for SqliteSink {
    fn persist(&self, record: &AttackLogRecord) {
        let Ok(conn) = self.conn.lock() else {
            log::error!("attack log sqlite sink: mutex poisoned, dropping record {}", record.request_id);
            return;
        };
        let result = conn.execute(
            "INSERT OR REPLACE INTO attack_log (
                request_id, ts, tenant, domain, client_ip, method, uri,
                headers_snapshot, body_snapshot, user_agent,
                matched_rule_id, matched_field, matched_value, action, response_code
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            rusqlite::params![
                record.request_id,
                record.ts,
                record.tenant,
                record.domain,
                record.client_ip,
                record.method,
                record.uri,
                record.headers_snapshot,
                record.body_snapshot,
                record.user_agent,
                record.matched_rule_id,
                record.matched_field,
                record.matched_value,
                record.action,
                record.response_code,
            ],
        );
        if let Err(e) = result {
            log::error!("attack log sqlite sink: insert failed for {}: {}", record.request_id, e);
        }
    }
}

const QUEUE_CAPACITY: usize = 4096;
const WRITER_POOL_SIZE: usize = 4;

/// Maximum body size captured in an attack log row; mirrors the body
/// inspection cap used by the engine.
pub const BODY_CAP_BYTES: usize = 1024 * 1024;

/// Bounded drop-oldest queue shared between producers and the writer pool.
struct Queue {
    records: Mutex<VecDeque<AttackLogRecord>>,
    notify: Notify,
}

pub struct AttackLogger {
    queue: Arc<Queue>,
    dropped: Arc<AtomicU64>,
}

impl AttackLogger {
    /// Spawn the writer pool and return a handle producers can enqueue
    /// into. The queue is a bounded `VecDeque`: `enqueue` never blocks the
    /// caller, and on overflow it pops the oldest queued record before
    /// pushing the new one, so the incoming record is always accepted and
    /// the drop always lands on whatever has waited longest.
    pub fn spawn(sink: Arc<dyn AttackLogSink>) -> AttackLogger {
        let queue = Arc::new(Queue {
            records: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)),
            notify: Notify::new(),
        });
        let dropped = Arc::new(AtomicU64::new(0));

        for _worker_id in 0..WRITER_POOL_SIZE {
            let queue = queue.clone();
            let sink = sink.clone();
            tokio::spawn(async move {
                loop {
                    let record = {
                        let mut guard = queue.records.lock().expect("attack log queue poisoned");
                        guard.pop_front()
                    };
                    match record {
                        Some(record) => sink.persist(&record),
                        None => queue.notify.notified().await,
                    }
                }
            });
        }

        AttackLogger { queue, dropped }
    }

    /// Non-blocking enqueue. On a full queue the oldest queued record is
    /// dropped to make room and the drop counter increments; the caller
    /// (request task) never waits.
    pub fn enqueue(&self, record: AttackLogRecord) {
        {
            let mut guard = self.queue.records.lock().expect("attack log queue poisoned");
            if guard.len() >= QUEUE_CAPACITY {
                guard.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "attack log queue full, dropping oldest record (total dropped: {})",
                    self.dropped.load(Ordering::Relaxed)
                );
            }
            guard.push_back(record);
        }
        self.queue.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Truncate a captured body to the inspection cap; bodies over the cap
    /// are recorded as empty rather than partially captured, matching the
    /// engine's fail-open contract for oversized bodies.
    pub fn cap_body(body: &[u8]) -> &[u8] {
        if body.len() > BODY_CAP_BYTES {
            &[]
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct CountingSink {
        count: StdMutex<u64>,
    }
    impl AttackLogSink for CountingSink {
        fn persist(&self, _record: &AttackLogRecord) {
            *self.count.lock().unwrap() += 1;
        }
    }

    fn sample_record(id: &str) -> AttackLogRecord {
        AttackLogRecord {
            request_id: id.to_string(),
            ts: "2026-07-27T00:00:00Z".to_string(),
            tenant: 1,
            domain: "demo.local".to_string(),
            client_ip: "203.0.113.1".to_string(),
            method: "GET".to_string(),
            uri: "/".to_string(),
            headers_snapshot: "{}".to_string(),
            body_snapshot: String::new(),
            user_agent: "curl/8".to_string(),
            matched_rule_id: Some(10),
            matched_field: "uri".to_string(),
            matched_value: "/".to_string(),
            action: "block".to_string(),
            response_code: 403,
        }
    }

    #[tokio::test]
    async fn enqueued_records_reach_the_sink() {
        let sink = Arc::new(CountingSink {
            count: StdMutex::new(0),
        });
        let logger = AttackLogger::spawn(sink.clone());
        logger.enqueue(sample_record("r1"));
        logger.enqueue(sample_record("r2"));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(*sink.count.lock().unwrap(), 2);
        assert_eq!(logger.dropped_count(), 0);
    }

    #[test]
    fn body_over_cap_is_recorded_as_empty() {
        let big = vec![0u8; BODY_CAP_BYTES + 1];
        assert_eq!(AttackLogger::cap_body(&big), &[] as &[u8]);
        let small = vec![1u8; 10];
        assert_eq!(AttackLogger::cap_body(&small), &small[..]);
    }
}
