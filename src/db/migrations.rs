//! Open-time schema repairs.
//!
//! Tracks the schema version in `meta` and repairs legacy embedding blobs that
//! are shorter than the declared width (an old writer truncated them). Repaired
//! memories go back to "pending" and are re-embedded by the next
//! `embed_pending` pass.

use rusqlite::Connection;

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Null out embedding blobs shorter than `dimensions * 4` bytes.
///
/// Returns the number of repaired rows. Idempotent, runs on every open.
/// Blobs that are *longer* than declared are left alone: retrieval skips
/// them by width, and `doctor` flags them as schema mismatches.
pub fn repair_truncated_embeddings(
    conn: &Connection,
    dimensions: usize,
) -> rusqlite::Result<usize> {
    let expected = (dimensions * 4) as i64;
    let repaired = conn.execute(
        "UPDATE memories SET embedding = NULL \
         WHERE embedding IS NOT NULL AND length(embedding) < ?1",
        [expected],
    )?;

    if repaired > 0 {
        tracing::info!(repaired, "cleared truncated embeddings; rows are pending re-embed");
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        crate::db::schema::init_schema(&conn).unwrap();
        conn
    }

    fn insert_with_blob(conn: &Connection, id: &str, blob: Option<Vec<u8>>) {
        conn.execute(
            "INSERT INTO memories (id, content, embedding, category, weight, created_at) \
             VALUES (?1, 'content', ?2, 'insight', 1.0, 0)",
            rusqlite::params![id, blob],
        )
        .unwrap();
    }

    #[test]
    fn schema_version_starts_at_current() {
        let conn = test_db();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn repair_clears_short_blobs_only() {
        let conn = test_db();
        // 8 dims -> 32 bytes expected
        insert_with_blob(&conn, "short", Some(vec![0u8; 16]));
        insert_with_blob(&conn, "exact", Some(vec![0u8; 32]));
        insert_with_blob(&conn, "long", Some(vec![0u8; 64]));
        insert_with_blob(&conn, "pending", None);

        let repaired = repair_truncated_embeddings(&conn, 8).unwrap();
        assert_eq!(repaired, 1);

        let short_blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM memories WHERE id = 'short'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(short_blob.is_none());

        let exact_blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM memories WHERE id = 'exact'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exact_blob.unwrap().len(), 32);

        let long_blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT embedding FROM memories WHERE id = 'long'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(long_blob.unwrap().len(), 64);
    }

    #[test]
    fn repair_is_idempotent() {
        let conn = test_db();
        insert_with_blob(&conn, "short", Some(vec![0u8; 4]));

        assert_eq!(repair_truncated_embeddings(&conn, 8).unwrap(), 1);
        assert_eq!(repair_truncated_embeddings(&conn, 8).unwrap(), 0);
    }
}
