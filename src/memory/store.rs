//! The stateful memory store.
//!
//! [`MemoryStore`] owns the session id, the id of the task this process last
//! started, and an in-memory copy of the running baseline. Every public
//! operation acquires a short-lived connection, does its reads and writes in
//! one transaction, and drops the connection — other processes open the same
//! file concurrently, so no handle is ever retained. Embedding always happens
//! while no connection is open; holding the file lock across model inference
//! would serialize every process behind one inference call.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::db;
use crate::embedding::Embedder;
use crate::error::StoreError;
use crate::memory::types::{
    Category, ContradictOutcome, CorrectionReport, DecayOutcome, RetrievedMemory, SelfReport,
    StartedTask, StoreStats,
};
use crate::memory::{embedding_to_bytes, lifecycle, retrieval, stats};
use crate::scoring::{self, Baseline, TaskOutcome, UserInputSource};

/// `meta` key holding the serialized running baseline.
const BASELINE_KEY: &str = "baseline";

pub struct MemoryStore {
    config: StoreConfig,
    embedder: Arc<dyn Embedder>,
    clock: Arc<dyn Clock>,
    baseline: Baseline,
    current_task_id: Option<String>,
    ready: bool,
}

impl MemoryStore {
    /// Open a store against `config.db_path`, creating the schema if missing,
    /// repairing truncated embeddings, and loading the baseline cache.
    pub fn open(config: StoreConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::open_with_clock(config, embedder, Arc::new(SystemClock))
    }

    /// Like [`MemoryStore::open`] with an explicit time source.
    pub fn open_with_clock(
        config: StoreConfig,
        embedder: Arc<dyn Embedder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut store = Self {
            config,
            embedder,
            clock,
            baseline: Baseline::default(),
            current_task_id: None,
            ready: false,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Idempotent: create schema, run the embedding repair, reload the
    /// baseline from `meta`.
    fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;
        let conn = db::open(&self.config.db_path, self.config.dimensions)?;
        self.baseline = load_baseline(&conn)?;
        drop(conn);
        self.ready = true;
        tracing::debug!(
            db = %self.config.db_path.display(),
            baseline_count = self.baseline.count,
            "memory store ready"
        );
        Ok(())
    }

    fn ensure_ready(&mut self) -> Result<()> {
        if !self.ready {
            self.initialize()?;
        }
        Ok(())
    }

    /// Fresh short-lived connection. Schema is guaranteed by `initialize`.
    fn connection(&self) -> Result<Connection> {
        db::connect(&self.config.db_path)
    }

    /// Embed `text`, checking the result against the declared dimensionality.
    /// Must be called with no connection open.
    fn embed_checked(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .embedder
            .embed(text)
            .map_err(|e| StoreError::EmbedFailure(e.to_string()))?;
        if vector.len() != self.config.dimensions {
            return Err(StoreError::EmbedDimensionMismatch {
                expected: self.config.dimensions,
                got: vector.len(),
            }
            .into());
        }
        Ok(vector)
    }

    fn vector_func(&self) -> &'static str {
        // validate() restricts the type to vector32
        self.config
            .vector_type
            .sql_func()
            .expect("validated vector type has a SQL constructor")
    }

    /// The task id of the last `start_task` in this process, if it has not
    /// ended yet.
    pub fn current_task_id(&self) -> Option<&str> {
        self.current_task_id.as_deref()
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    // ── Task lifecycle ───────────────────────────────────────────────────────

    /// Begin a task: record it, surface the `top_k` most relevant memories,
    /// and mark them retrieved. The `score` on each returned memory is its
    /// similarity to the description, not its stored weight — weight measures
    /// historical usefulness and governs the `top_by_weight` surface instead.
    pub fn start_task(&mut self, description: &str) -> Result<StartedTask> {
        self.ensure_ready()?;

        // Embedding happens before any connection exists. A dimension
        // mismatch fails here, before a task row is written.
        let query = self.embed_checked(description)?;

        let task_id = Uuid::now_v7().to_string();
        let now = self.clock.now();
        let query_bytes = embedding_to_bytes(&query);

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        retrieval::insert_task(
            &tx,
            &task_id,
            &self.config.session_id,
            description,
            &query_bytes,
            now,
        )?;
        let memories = retrieval::ranked(
            &tx,
            &query_bytes,
            now,
            self.config.decay_rate,
            self.config.top_k,
            self.config.dimensions,
            self.vector_func(),
        )?;
        retrieval::record_retrievals(&tx, &task_id, &memories, now)?;
        tx.commit()?;
        drop(conn);

        tracing::debug!(task_id = %task_id, retrieved = memories.len(), "task started");
        self.current_task_id = Some(task_id.clone());

        // Hook-stored pending rows get their vectors now, after retrieval:
        // they become searchable from the next task onward.
        self.embed_pending()?;

        Ok(StartedTask { task_id, memories })
    }

    /// Finish a task: score it against the baseline, advance the baseline,
    /// and apply per-memory credit for every self-reported rating. Returns
    /// the task score.
    pub fn end_task(
        &mut self,
        task_id: &str,
        outcome: &TaskOutcome,
        self_reports: &[SelfReport],
    ) -> Result<f64> {
        self.ensure_ready()?;

        for report in self_reports {
            if report.rating > 3 {
                return Err(StoreError::InvalidArgument(format!(
                    "self-report rating {} out of range 0-3",
                    report.rating
                ))
                .into());
            }
        }

        let score = scoring::task_score(&self.baseline, outcome);
        let next_baseline = self.baseline.observe(
            outcome.tokens_used as f64,
            outcome.errors as f64,
            outcome.user_corrections as f64,
        );
        let now = self.clock.now();

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE tasks SET tokens_used = ?1, tool_calls = ?2, errors = ?3, \
             user_corrections = ?4, completed = ?5, task_score = ?6, finished_at = ?7 \
             WHERE id = ?8",
            params![
                outcome.tokens_used,
                outcome.tool_calls,
                outcome.errors,
                outcome.user_corrections,
                outcome.completed,
                score,
                now,
                task_id,
            ],
        )?;
        if updated == 0 {
            tracing::debug!(task_id, "end_task for unknown task id");
        }

        save_baseline(&tx, &next_baseline)?;

        // Credit is split across the memories that actually helped; zero
        // ratings get zero credit without diluting the others.
        let rated = self_reports.iter().filter(|r| r.rating > 0).count();
        for report in self_reports {
            let credit = scoring::credit(score, report.rating, rated);
            let current: Option<f64> = tx
                .query_row(
                    "SELECT weight FROM memories WHERE id = ?1",
                    params![report.memory_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(weight) = current {
                let next = scoring::ema_weight(weight, credit, self.config.learning_rate);
                tx.execute(
                    "UPDATE memories SET weight = ?1 WHERE id = ?2",
                    params![next, report.memory_id],
                )?;
            }
            tx.execute(
                "UPDATE memory_retrievals SET self_report = ?1, credit = ?2 \
                 WHERE memory_id = ?3 AND task_id = ?4",
                params![report.rating, credit, report.memory_id, task_id],
            )?;
        }

        tx.commit()?;
        drop(conn);

        self.baseline = next_baseline;
        if self.current_task_id.as_deref() == Some(task_id) {
            self.current_task_id = None;
        }

        tracing::debug!(task_id, score, rated, "task ended");
        Ok(score)
    }

    // ── Memory ingestion ─────────────────────────────────────────────────────

    /// Store a correction learned from a failed-then-fixed approach. Embeds
    /// synchronously; the initial weight scales with the tokens the mistake
    /// cost, relative to the average finished task.
    pub fn report_correction(&mut self, report: &CorrectionReport) -> Result<String> {
        self.ensure_ready()?;

        let content = report.content();
        let vector = self.embed_checked(&content)?;
        let tokens_wasted = report.tokens_wasted.unwrap_or(0);
        let now = self.clock.now();
        let id = Uuid::now_v7().to_string();
        let blob = embedding_to_bytes(&vector);

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let avg_tokens: Option<f64> = tx.query_row(
            "SELECT AVG(tokens_used) FROM tasks WHERE finished_at IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        let weight = scoring::correction_weight(
            tokens_wasted,
            avg_tokens.unwrap_or(scoring::DEFAULT_AVG_TOKENS),
        );
        tx.execute(
            "INSERT INTO memories (id, content, embedding, category, weight, initial_cost, created_at, source_task) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                content,
                blob,
                Category::Correction.as_str(),
                weight,
                tokens_wasted,
                now,
                self.current_task_id,
            ],
        )?;
        tx.commit()?;

        Ok(id)
    }

    /// Store something the user said, denied, or corrected. The source label
    /// selects the initial weight.
    pub fn report_user_input(&mut self, lesson: &str, source: &str) -> Result<String> {
        self.ensure_ready()?;

        let vector = self.embed_checked(lesson)?;
        let weight = scoring::user_weight(UserInputSource::parse(source));
        self.insert_with_embedding(lesson, Category::User, weight, Some(&vector), 0)
    }

    /// Hot-path insert used by hook collaborators: no embedding happens, the
    /// row is stored pending and becomes searchable after `embed_pending`.
    pub fn insert_raw_memory(
        &mut self,
        content: &str,
        category: Category,
        weight: f64,
    ) -> Result<String> {
        self.ensure_ready()?;

        if weight.is_nan() {
            return Err(StoreError::InvalidArgument("memory weight is NaN".into()).into());
        }
        self.insert_with_embedding(content, category, weight, None, 0)
    }

    fn insert_with_embedding(
        &mut self,
        content: &str,
        category: Category,
        weight: f64,
        vector: Option<&[f32]>,
        initial_cost: i64,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let now = self.clock.now();
        let blob = vector.map(embedding_to_bytes);

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO memories (id, content, embedding, category, weight, initial_cost, created_at, source_task) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                content,
                blob,
                category.as_str(),
                scoring::clamp_weight(weight),
                initial_cost,
                now,
                self.current_task_id,
            ],
        )?;
        Ok(id)
    }

    /// Embed every pending memory (NULL or empty-blob embedding) and write
    /// the vectors back in one short transaction. Returns how many were
    /// embedded. Safe to race across processes: the second writer's UPDATE
    /// is idempotent and wins.
    pub fn embed_pending(&mut self) -> Result<usize> {
        self.ensure_ready()?;

        let pending: Vec<(String, String)> = {
            let conn = self.connection()?;
            let mut stmt = conn.prepare(
                "SELECT id, content FROM memories \
                 WHERE embedding IS NULL OR length(embedding) = 0",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to list pending memories")?;
            rows
        };

        if pending.is_empty() {
            return Ok(0);
        }

        // Inference runs with no connection held.
        let mut embedded = Vec::with_capacity(pending.len());
        for (id, content) in pending {
            let vector = self.embed_checked(&content)?;
            embedded.push((id, embedding_to_bytes(&vector)));
        }

        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for (id, blob) in &embedded {
            tx.execute(
                "UPDATE memories SET embedding = ?1 WHERE id = ?2",
                params![blob, id],
            )?;
        }
        tx.commit()?;

        tracing::debug!(count = embedded.len(), "embedded pending memories");
        Ok(embedded.len())
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Delete a memory that turned out to be wrong, optionally replacing it
    /// with a correction (stored at weight 2.0). Missing ids are a soft
    /// `deleted: false`, not an error.
    pub fn contradict_memory(
        &mut self,
        memory_id: &str,
        correction: Option<&str>,
    ) -> Result<ContradictOutcome> {
        self.ensure_ready()?;

        let deleted = {
            let conn = self.connection()?;
            lifecycle::delete_memory(&conn, memory_id)?
        };
        if !deleted {
            return Ok(ContradictOutcome {
                deleted: false,
                correction_id: None,
            });
        }

        let correction_id = match correction {
            Some(text) => {
                let vector = self.embed_checked(text)?;
                Some(self.insert_with_embedding(
                    text,
                    Category::Correction,
                    2.0,
                    Some(&vector),
                    0,
                )?)
            }
            None => None,
        };

        Ok(ContradictOutcome {
            deleted: true,
            correction_id,
        })
    }

    /// Multiply one memory's weight by `factor` (floored at the weight
    /// minimum). Returns whether the memory existed.
    pub fn penalize_memory(&mut self, memory_id: &str, factor: f64) -> Result<bool> {
        self.ensure_ready()?;
        let conn = self.connection()?;
        lifecycle::penalize(&conn, memory_id, factor)
    }

    /// Apply daily time decay to every weight, then prune memories that sank
    /// below the floor despite being retrieved more than five times.
    pub fn decay(&mut self) -> Result<DecayOutcome> {
        self.ensure_ready()?;
        let conn = self.connection()?;
        lifecycle::apply_decay(&conn, self.config.decay_rate)
    }

    /// Delete every memory below `threshold`, with no retrieval-count guard.
    pub fn purge(&mut self, threshold: f64) -> Result<usize> {
        self.ensure_ready()?;
        let conn = self.connection()?;
        lifecycle::purge(&conn, threshold)
    }

    // ── Read surfaces ────────────────────────────────────────────────────────

    /// The `n` heaviest memories. `score` in the result is the stored weight.
    pub fn top_by_weight(&mut self, n: usize) -> Result<Vec<RetrievedMemory>> {
        self.ensure_ready()?;
        let conn = self.connection()?;
        stats::top_by_weight(&conn, n)
    }

    pub fn stats(&mut self) -> Result<StoreStats> {
        self.ensure_ready()?;
        let conn = self.connection()?;
        stats::store_stats(&conn)
    }

    /// Drop cached state. The next operation re-initializes; there is no
    /// persistent connection to close.
    pub fn close(&mut self) {
        self.ready = false;
        self.current_task_id = None;
        self.baseline = Baseline::default();
    }
}

fn load_baseline(conn: &Connection) -> Result<Baseline> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![BASELINE_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(json) => serde_json::from_str(&json).context("failed to parse stored baseline"),
        None => Ok(Baseline::default()),
    }
}

fn save_baseline(conn: &Connection, baseline: &Baseline) -> Result<()> {
    let json = serde_json::to_string(baseline)?;
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![BASELINE_KEY, json],
    )?;
    Ok(())
}
