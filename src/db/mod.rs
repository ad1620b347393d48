pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use crate::error::StoreError;
use crate::memory::bytes_to_embedding;

static SQLITE_VEC_INIT: Once = Once::new();

/// How long SQLite waits on a lock discovered after connect.
const BUSY_TIMEOUT_MS: u32 = 5_000;
/// Connect retries before giving up with [`StoreError::StorageLocked`].
const MAX_CONNECT_ATTEMPTS: u32 = 10;
/// Base backoff unit between connect attempts.
const BASE_DELAY_MS: u64 = 50;

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Open a short-lived connection to the database at `path`.
///
/// Connections are never retained across awaits or cached in a process-global
/// handle; other processes open the same file concurrently. The connect itself
/// retries with randomized backoff `BASE_DELAY * (1 + rand) * min(attempt+1, 5)`
/// when another process holds the file lock. Contention discovered after
/// connect is absorbed by `busy_timeout`.
pub fn connect(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    load_sqlite_vec();

    for attempt in 0..MAX_CONNECT_ATTEMPTS {
        match Connection::open(path) {
            Ok(conn) => {
                conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                return Ok(conn);
            }
            Err(e) if is_locked(&e) => {
                if attempt + 1 == MAX_CONNECT_ATTEMPTS {
                    break;
                }
                let delay = lock_backoff(attempt);
                tracing::debug!(attempt, ?delay, "database locked on connect, backing off");
                std::thread::sleep(delay);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to open database at {}", path.display())
                });
            }
        }
    }

    Err(StoreError::StorageLocked {
        attempts: MAX_CONNECT_ATTEMPTS,
    }
    .into())
}

/// Open the database and bring the schema up: create tables, repair truncated
/// embeddings. Idempotent; every entry point runs it.
pub fn open(path: impl AsRef<Path>, dimensions: usize) -> Result<Connection> {
    let conn = connect(path)?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::repair_truncated_embeddings(&conn, dimensions)
        .context("failed to repair truncated embeddings")?;
    Ok(conn)
}

fn is_locked(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode;
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => true,
        _ => {
            let msg = err.to_string().to_lowercase();
            msg.contains("locked") || msg.contains("locking")
        }
    }
}

fn lock_backoff(attempt: u32) -> Duration {
    let jitter = 1.0 + rand::random::<f64>();
    let steps = (attempt + 1).min(5) as f64;
    Duration::from_millis((BASE_DELAY_MS as f64 * jitter * steps) as u64)
}

/// Result of a full database health check.
pub struct HealthReport {
    pub schema_version: u32,
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub sqlite_vec_version: String,
    pub memory_count: i64,
    pub pending_count: i64,
    pub malformed_embedding_count: i64,
    pub task_count: i64,
    pub retrieval_count: i64,
}

/// Run a comprehensive health check on the database.
pub fn check_database_health(conn: &Connection, dimensions: usize) -> Result<HealthReport> {
    let schema_version =
        migrations::get_schema_version(conn).context("failed to read schema version")?;

    let integrity_details: String = conn
        .pragma_query_value(None, "integrity_check", |row| row.get(0))
        .context("failed to run integrity check")?;
    let integrity_ok = integrity_details == "ok";

    let sqlite_vec_version: String = conn
        .query_row("SELECT vec_version()", [], |row| row.get(0))
        .context("failed to get sqlite-vec version")?;

    let memory_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
        .unwrap_or(0);

    let pending_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM memories WHERE embedding IS NULL OR length(embedding) = 0",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Read every non-pending blob back through the strict decoder; a row
    // that fails as SchemaMismatch is excluded from retrieval and needs
    // re-inserting or contradicting.
    let malformed_embedding_count = {
        let mut stmt = conn.prepare(
            "SELECT embedding FROM memories \
             WHERE embedding IS NOT NULL AND length(embedding) > 0",
        )?;
        let blobs = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read embedding blobs")?;
        blobs
            .iter()
            .filter(|blob| {
                matches!(
                    bytes_to_embedding(blob, dimensions),
                    Err(StoreError::SchemaMismatch { .. })
                )
            })
            .count() as i64
    };

    let task_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
        .unwrap_or(0);

    let retrieval_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM memory_retrievals", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(HealthReport {
        schema_version,
        integrity_ok,
        integrity_details,
        sqlite_vec_version,
        memory_count,
        pending_count,
        malformed_embedding_count,
        task_count,
        retrieval_count,
    })
}

/// Open an in-memory database for testing.
#[cfg(test)]
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_then_caps() {
        for attempt in 0..10 {
            let d = lock_backoff(attempt);
            let steps = (attempt + 1).min(5) as u64;
            // jitter is in [1, 2)
            assert!(d >= Duration::from_millis(BASE_DELAY_MS * steps));
            assert!(d < Duration::from_millis(BASE_DELAY_MS * steps * 2));
        }
    }

    #[test]
    fn open_creates_schema_and_sets_pragmas() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("subdir").join("memory.db");

        let conn = open(&db_path, 8).unwrap();
        assert!(db_path.exists());

        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn health_check_counts_malformed_blobs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let db_path = tmp.path().join("memory.db");
        let conn = open(&db_path, 8).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, embedding, category, weight, created_at) \
             VALUES ('ok', 'x', ?1, 'insight', 1.0, 0)",
            [vec![0u8; 32]],
        )
        .unwrap();
        // longer than declared: repair leaves it, doctor flags it
        conn.execute(
            "INSERT INTO memories (id, content, embedding, category, weight, created_at) \
             VALUES ('wide', 'y', ?1, 'insight', 1.0, 0)",
            [vec![0u8; 64]],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memories (id, content, category, weight, created_at) \
             VALUES ('pending', 'z', 'insight', 1.0, 0)",
            [],
        )
        .unwrap();

        let report = check_database_health(&conn, 8).unwrap();
        assert!(report.integrity_ok);
        assert_eq!(report.memory_count, 3);
        assert_eq!(report.pending_count, 1);
        assert_eq!(report.malformed_embedding_count, 1);
        assert!(!report.sqlite_vec_version.is_empty());
    }
}
