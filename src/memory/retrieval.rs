//! Ranked retrieval over the memories table.
//!
//! Ranking happens in SQL so the engine scans the row set once:
//! `(1 - cosine_distance) * decay_rate ^ days_since_last_use`, where the
//! recency anchor falls back to `created_at` for never-retrieved memories.
//! A linear scan is deliberate; the store holds at most a few thousand rows.

use anyhow::{Context, Result};
use rusqlite::{named_params, Connection};

use crate::memory::types::{Category, RetrievedMemory};

struct RankedRow {
    id: String,
    content: String,
    category: String,
    weight: f64,
    similarity: f64,
}

/// Top-`limit` memories for a query vector, ranked by similarity times
/// recency decay. Memories without a usable embedding are excluded: NULL,
/// empty, or a blob whose width does not match `dimensions` (a leftover from
/// an older configuration would otherwise abort the whole statement, since
/// `vec_f32` infers vector width from blob length). Ties break on storage
/// row order.
///
/// `vector_func` is the SQL constructor that types both sides of the distance
/// call (`vec_f32` for float32 blobs).
pub fn ranked(
    conn: &Connection,
    query: &[u8],
    now: i64,
    decay_rate: f64,
    limit: usize,
    dimensions: usize,
    vector_func: &str,
) -> Result<Vec<RetrievedMemory>> {
    let sql = format!(
        "SELECT id, content, category, weight, \
                1.0 - vec_distance_cosine({vf}(embedding), {vf}(:query)) AS similarity \
         FROM memories \
         WHERE embedding IS NOT NULL AND length(embedding) = :width \
         ORDER BY (1.0 - vec_distance_cosine({vf}(embedding), {vf}(:query))) \
                  * pow(:rate, (:now - COALESCE(last_retrieved, created_at)) / 86400.0) DESC, \
                  rowid ASC \
         LIMIT :limit",
        vf = vector_func,
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<RankedRow> = stmt
        .query_map(
            named_params! {
                ":query": query,
                ":width": (dimensions * 4) as i64,
                ":rate": decay_rate,
                ":now": now,
                ":limit": limit as i64,
            },
            |row| {
                Ok(RankedRow {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    category: row.get(2)?,
                    weight: row.get(3)?,
                    similarity: row.get(4)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()
        .context("ranked retrieval query failed")?;

    rows.into_iter()
        .map(|row| {
            let category: Category = row
                .category
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            Ok(RetrievedMemory {
                id: row.id,
                content: row.content,
                category,
                weight: row.weight,
                score: row.similarity,
            })
        })
        .collect()
}

/// Insert the task row a retrieval batch belongs to.
pub fn insert_task(
    conn: &Connection,
    task_id: &str,
    session_id: &str,
    description: &str,
    embedding: &[u8],
    started_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (id, session_id, description, embedding, started_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![task_id, session_id, description, embedding, started_at],
    )?;
    Ok(())
}

/// Record that `memories` were surfaced for `task_id`: one idempotent
/// retrieval row per memory, plus recency/count bumps on the memory itself.
pub fn record_retrievals(
    conn: &Connection,
    task_id: &str,
    memories: &[RetrievedMemory],
    now: i64,
) -> Result<()> {
    let mut insert = conn.prepare(
        "INSERT OR IGNORE INTO memory_retrievals (memory_id, task_id, similarity) \
         VALUES (?1, ?2, ?3)",
    )?;
    let mut touch = conn.prepare(
        "UPDATE memories SET last_retrieved = ?1, retrieval_count = retrieval_count + 1 \
         WHERE id = ?2",
    )?;

    for memory in memories {
        insert.execute(rusqlite::params![memory.id, task_id, memory.score])?;
        touch.execute(rusqlite::params![now, memory.id])?;
    }
    Ok(())
}
