//! Weight lifecycle — time decay, pruning, penalties, and deletion.
//!
//! Decay and purge are bulk UPDATE/DELETE statements; per-memory deletion
//! cascades to retrieval rows through the foreign key.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::error::StoreError;
use crate::memory::types::DecayOutcome;
use crate::scoring::{WEIGHT_MAX, WEIGHT_MIN};

/// Weight below which a repeatedly-tried memory is dropped by `decay`.
const DECAY_DELETE_FLOOR: f64 = 0.15;
/// A memory must have been retrieved more than this many times before decay
/// may delete it; low-weight memories that were never tried stay alive at
/// the floor.
const DECAY_DELETE_MIN_RETRIEVALS: i64 = 5;

/// Multiply every weight by `decay_rate`, then delete memories that have
/// sunk below the floor despite repeated retrieval.
pub fn apply_decay(conn: &Connection, decay_rate: f64) -> Result<DecayOutcome> {
    let decayed = conn.execute(
        "UPDATE memories SET weight = MAX(weight * ?1, ?2)",
        params![decay_rate, WEIGHT_MIN],
    )?;

    let deleted = conn.execute(
        "DELETE FROM memories WHERE weight < ?1 AND retrieval_count > ?2",
        params![DECAY_DELETE_FLOOR, DECAY_DELETE_MIN_RETRIEVALS],
    )?;

    if deleted > 0 {
        tracing::info!(deleted, "decay pruned exhausted memories");
    }

    Ok(DecayOutcome { decayed, deleted })
}

/// Delete every memory below `threshold`, regardless of retrieval history.
pub fn purge(conn: &Connection, threshold: f64) -> Result<usize> {
    if threshold.is_nan() {
        return Err(StoreError::InvalidArgument("purge threshold is NaN".into()).into());
    }
    let deleted = conn.execute("DELETE FROM memories WHERE weight < ?1", params![threshold])?;
    Ok(deleted)
}

/// Delete one memory (and, via cascade, its retrieval rows). Returns whether
/// a row existed.
pub fn delete_memory(conn: &Connection, memory_id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;
    Ok(rows > 0)
}

/// Multiply one memory's weight by `factor`, clamped to the weight bounds.
/// Returns whether the memory existed.
pub fn penalize(conn: &Connection, memory_id: &str, factor: f64) -> Result<bool> {
    if factor.is_nan() {
        return Err(StoreError::InvalidArgument("penalty factor is NaN".into()).into());
    }
    let rows = conn.execute(
        "UPDATE memories SET weight = MIN(MAX(weight * ?1, ?2), ?3) WHERE id = ?4",
        params![factor, WEIGHT_MIN, WEIGHT_MAX, memory_id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    fn insert(conn: &Connection, id: &str, weight: f64, retrieval_count: i64) {
        conn.execute(
            "INSERT INTO memories (id, content, category, weight, created_at, retrieval_count) \
             VALUES (?1, 'content', 'insight', ?2, 0, ?3)",
            params![id, weight, retrieval_count],
        )
        .unwrap();
    }

    fn weight_of(conn: &Connection, id: &str) -> Option<f64> {
        conn.query_row(
            "SELECT weight FROM memories WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )
        .ok()
    }

    #[test]
    fn decay_multiplies_all_weights() {
        let conn = test_db();
        insert(&conn, "a", 2.0, 0);
        insert(&conn, "b", 1.0, 0);

        let outcome = apply_decay(&conn, 0.5).unwrap();
        assert_eq!(outcome.decayed, 2);
        assert_eq!(outcome.deleted, 0);
        assert!((weight_of(&conn, "a").unwrap() - 1.0).abs() < 1e-9);
        assert!((weight_of(&conn, "b").unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn decay_floors_at_weight_min() {
        let conn = test_db();
        insert(&conn, "a", 0.11, 0);

        apply_decay(&conn, 0.5).unwrap();
        assert!((weight_of(&conn, "a").unwrap() - WEIGHT_MIN).abs() < 1e-9);
    }

    #[test]
    fn decay_never_deletes_untried_memories() {
        let conn = test_db();
        insert(&conn, "untried", 0.1, 5); // at the guard, not past it
        insert(&conn, "tried", 0.1, 6);

        let outcome = apply_decay(&conn, 0.995).unwrap();
        assert_eq!(outcome.deleted, 1);
        assert!(weight_of(&conn, "untried").is_some());
        assert!(weight_of(&conn, "tried").is_none());
    }

    #[test]
    fn purge_ignores_retrieval_count() {
        let conn = test_db();
        insert(&conn, "weak_untried", 0.2, 0);
        insert(&conn, "weak_tried", 0.2, 100);
        insert(&conn, "strong", 3.0, 0);

        let deleted = purge(&conn, 0.5).unwrap();
        assert_eq!(deleted, 2);
        assert!(weight_of(&conn, "strong").is_some());
    }

    #[test]
    fn purge_rejects_nan_threshold() {
        let conn = test_db();
        let err = purge(&conn, f64::NAN).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn delete_cascades_retrieval_rows() {
        let conn = test_db();
        insert(&conn, "m1", 1.0, 0);
        conn.execute(
            "INSERT INTO tasks (id, session_id, description, started_at) \
             VALUES ('t1', 's', 'task', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO memory_retrievals (memory_id, task_id, similarity) \
             VALUES ('m1', 't1', 0.8)",
            [],
        )
        .unwrap();

        assert!(delete_memory(&conn, "m1").unwrap());
        let retrievals: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_retrievals", [], |r| r.get(0))
            .unwrap();
        assert_eq!(retrievals, 0);

        // soft not-found
        assert!(!delete_memory(&conn, "m1").unwrap());
    }

    #[test]
    fn penalize_floors_and_caps() {
        let conn = test_db();
        insert(&conn, "m1", 0.2, 0);
        assert!(penalize(&conn, "m1", 0.1).unwrap());
        assert!((weight_of(&conn, "m1").unwrap() - WEIGHT_MIN).abs() < 1e-9);

        insert(&conn, "m2", 4.0, 0);
        assert!(penalize(&conn, "m2", 10.0).unwrap());
        assert!((weight_of(&conn, "m2").unwrap() - WEIGHT_MAX).abs() < 1e-9);

        assert!(!penalize(&conn, "ghost", 0.5).unwrap());
    }
}
