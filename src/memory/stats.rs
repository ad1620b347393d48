use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::memory::types::{Category, RetrievedMemory, StoreStats};

/// How many memories `stats` surfaces in its leaderboard.
const STATS_TOP_LIMIT: usize = 10;

/// Pure weight ranking — no embedding involved. `score` in the result is the
/// stored weight.
pub fn top_by_weight(conn: &Connection, limit: usize) -> Result<Vec<RetrievedMemory>> {
    let mut stmt = conn.prepare(
        "SELECT id, content, category, weight FROM memories \
         ORDER BY weight DESC, rowid ASC LIMIT ?1",
    )?;

    let rows: Vec<(String, String, String, f64)> = stmt
        .query_map([limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<Vec<_>, _>>()
        .context("top-by-weight query failed")?;

    rows.into_iter()
        .map(|(id, content, category, weight)| {
            let category: Category = category.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(RetrievedMemory {
                id,
                content,
                category,
                weight,
                score: weight,
            })
        })
        .collect()
}

/// Aggregate store statistics.
pub fn store_stats(conn: &Connection) -> Result<StoreStats> {
    let total_memories: i64 = conn.query_row("SELECT COUNT(*) FROM memories", [], |r| r.get(0))?;

    let task_count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |r| r.get(0))?;

    let avg_task_score: Option<f64> = conn.query_row(
        "SELECT AVG(task_score) FROM tasks WHERE finished_at IS NOT NULL",
        [],
        |r| r.get(0),
    )?;

    let top_memories = top_by_weight(conn, STATS_TOP_LIMIT)?;

    Ok(StoreStats {
        total_memories: total_memories as u64,
        task_count: task_count as u64,
        avg_task_score: avg_task_score.unwrap_or(0.0),
        top_memories,
    })
}
