//! SQL DDL for all memelord tables.
//!
//! Defines the `memories`, `tasks`, `memory_retrievals`, and `meta` tables.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization, so every open
//! path (server, hooks, CLI) can run it unconditionally.

use rusqlite::Connection;

/// All schema DDL statements for memelord's core tables.
const SCHEMA_SQL: &str = r#"
-- Stored memories with optional float32 embedding blobs
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    embedding BLOB,
    category TEXT NOT NULL CHECK(category IN ('correction','insight','user','consolidated','discovery')),
    weight REAL NOT NULL DEFAULT 1.0 CHECK(weight >= 0.1 AND weight <= 5.0),
    initial_cost INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    last_retrieved INTEGER,
    retrieval_count INTEGER NOT NULL DEFAULT 0 CHECK(retrieval_count >= 0),
    source_task TEXT
);

CREATE INDEX IF NOT EXISTS idx_memories_category ON memories(category);
CREATE INDEX IF NOT EXISTS idx_memories_weight ON memories(weight);

-- One row per bounded piece of agent work
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    description TEXT NOT NULL,
    embedding BLOB,
    tokens_used INTEGER NOT NULL DEFAULT 0,
    tool_calls INTEGER NOT NULL DEFAULT 0,
    errors INTEGER NOT NULL DEFAULT 0,
    user_corrections INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    task_score REAL,
    started_at INTEGER NOT NULL,
    finished_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_tasks_session ON tasks(session_id);
CREATE INDEX IF NOT EXISTS idx_tasks_finished ON tasks(finished_at);

-- Which memory was surfaced for which task, and how it was rated
CREATE TABLE IF NOT EXISTS memory_retrievals (
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    task_id TEXT NOT NULL REFERENCES tasks(id),
    similarity REAL NOT NULL,
    self_report INTEGER,
    credit REAL,
    PRIMARY KEY (memory_id, task_id)
);

CREATE INDEX IF NOT EXISTS idx_retrievals_task ON memory_retrievals(task_id);

-- Key/value store: running baseline, schema version
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"memories".to_string()));
        assert!(tables.contains(&"tasks".to_string()));
        assert!(tables.contains(&"memory_retrievals".to_string()));
        assert!(tables.contains(&"meta".to_string()));

        // sqlite-vec must be loaded for retrieval SQL
        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn category_constraint_rejects_unknown() {
        crate::db::load_sqlite_vec();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO memories (id, content, category, weight, created_at) \
             VALUES ('m1', 'x', 'rumor', 1.0, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn retrieval_pk_ignores_duplicates() {
        crate::db::load_sqlite_vec();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO memories (id, content, category, weight, created_at) \
             VALUES ('m1', 'x', 'insight', 1.0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tasks (id, session_id, description, started_at) \
             VALUES ('t1', 's1', 'task', 0)",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT OR IGNORE INTO memory_retrievals (memory_id, task_id, similarity) \
             VALUES ('m1', 't1', 0.9)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO memory_retrievals (memory_id, task_id, similarity) \
             VALUES ('m1', 't1', 0.5)",
            [],
        )
        .unwrap();

        let (count, similarity): (i64, f64) = conn
            .query_row(
                "SELECT COUNT(*), MAX(similarity) FROM memory_retrievals",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        // first insert wins
        assert!((similarity - 0.9).abs() < 1e-9);
    }
}
