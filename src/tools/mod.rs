pub mod contradict;
pub mod end_task;
pub mod report;
pub mod start_task;
pub mod status;

use contradict::ContradictParams;
use end_task::EndTaskParams;
use report::ReportParams;
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use start_task::StartTaskParams;
use status::StatusParams;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::memory::store::MemoryStore;
use crate::memory::types::{Category, CorrectionReport, SelfReport};
use crate::scoring::TaskOutcome;

/// The memelord MCP tool handler. Holds the store behind a mutex and exposes
/// the tool surface via the `#[tool_router]` macro. Every handler is a thin
/// mapping onto one store call; the store itself stays synchronous, so DB
/// work runs under `spawn_blocking`.
#[derive(Clone)]
pub struct MemelordTools {
    tool_router: ToolRouter<Self>,
    store: Arc<Mutex<MemoryStore>>,
}

impl MemelordTools {
    pub fn new(store: Arc<Mutex<MemoryStore>>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store,
        }
    }

    /// Run a closure against the locked store on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut MemoryStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let mut store = store
                .lock()
                .map_err(|e| anyhow::anyhow!("store lock poisoned: {e}"))?;
            f(&mut store)
        })
        .await
        .map_err(|e| format!("store task failed: {e}"))?
        .map_err(|e| format!("{e:#}"))
    }
}

#[tool_router]
impl MemelordTools {
    /// Begin a task and retrieve the most relevant memories for it.
    #[tool(
        description = "Start a task: records it and returns the stored memories most relevant to the description, ranked by similarity and recency."
    )]
    async fn memory_start_task(
        &self,
        Parameters(params): Parameters<StartTaskParams>,
    ) -> Result<String, String> {
        if params.description.is_empty() {
            return Err("description must not be empty".into());
        }

        tracing::info!(
            description_len = params.description.len(),
            "memory_start_task called"
        );

        let started = self
            .with_store(move |store| store.start_task(&params.description))
            .await?;

        tracing::info!(task_id = %started.task_id, retrieved = started.memories.len(), "task started");
        serde_json::to_string(&started).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Store a new memory: a correction, user input, or insight.
    #[tool(
        description = "Report something worth remembering. Types: correction (failed-then-fixed approach, needs what_failed/what_worked), user_input (something the user said, with a source label), insight (general observation)."
    )]
    async fn memory_report(
        &self,
        Parameters(params): Parameters<ReportParams>,
    ) -> Result<String, String> {
        if params.lesson.is_empty() {
            return Err("lesson must not be empty".into());
        }

        tracing::info!(r#type = %params.r#type, "memory_report called");

        let id = match params.r#type.as_str() {
            "correction" => {
                let what_failed = params
                    .what_failed
                    .ok_or("correction reports need what_failed")?;
                let what_worked = params
                    .what_worked
                    .ok_or("correction reports need what_worked")?;
                let report = CorrectionReport {
                    lesson: params.lesson,
                    what_failed,
                    what_worked,
                    tokens_wasted: params.tokens_wasted,
                    tools_wasted: params.tools_wasted,
                };
                self.with_store(move |store| store.report_correction(&report))
                    .await?
            }
            "user_input" => {
                let source = params.source.unwrap_or_else(|| "user_input".into());
                let lesson = params.lesson;
                self.with_store(move |store| store.report_user_input(&lesson, &source))
                    .await?
            }
            "insight" => {
                let lesson = params.lesson;
                self.with_store(move |store| {
                    store.insert_raw_memory(&lesson, Category::Insight, 1.0)
                })
                .await?
            }
            other => return Err(format!("unknown report type: {other}")),
        };

        serde_json::to_string(&serde_json::json!({ "id": id }))
            .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Finish a task: score it and credit the memories that helped.
    #[tool(
        description = "End a task with its outcome counters and optional per-memory ratings (0-3). Updates memory weights and runs an opportunistic decay pass."
    )]
    async fn memory_end_task(
        &self,
        Parameters(params): Parameters<EndTaskParams>,
    ) -> Result<String, String> {
        tracing::info!(task_id = %params.task_id, "memory_end_task called");

        let outcome = TaskOutcome {
            tokens_used: params.tokens_used,
            tool_calls: params.tool_calls,
            errors: params.errors,
            user_corrections: params.user_corrections,
            completed: params.completed,
        };
        let reports: Vec<SelfReport> = params
            .self_report
            .unwrap_or_default()
            .into_iter()
            .map(|r| SelfReport {
                memory_id: r.memory_id,
                rating: r.rating,
            })
            .collect();
        let task_id = params.task_id;

        let score = self
            .with_store(move |store| {
                let score = store.end_task(&task_id, &outcome, &reports)?;
                // opportunistic maintenance; a failure here must not fail the call
                if let Err(e) = store.decay() {
                    tracing::warn!(error = %e, "opportunistic decay failed");
                }
                Ok(score)
            })
            .await?;

        serde_json::to_string(&serde_json::json!({ "task_score": score }))
            .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Delete a memory that turned out to be wrong.
    #[tool(
        description = "Delete a wrong memory, optionally replacing it with corrected information stored as a fresh correction."
    )]
    async fn memory_contradict(
        &self,
        Parameters(params): Parameters<ContradictParams>,
    ) -> Result<String, String> {
        tracing::info!(memory_id = %params.memory_id, "memory_contradict called");

        let outcome = self
            .with_store(move |store| {
                store.contradict_memory(&params.memory_id, params.correction.as_deref())
            })
            .await?;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Get store statistics.
    #[tool(
        description = "Memory store statistics: totals, average task score, and the highest-weighted memories."
    )]
    async fn memory_status(
        &self,
        Parameters(_params): Parameters<StatusParams>,
    ) -> Result<String, String> {
        let stats = self.with_store(|store| store.stats()).await?;
        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for MemelordTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "memelord is a per-project memory layer. Call memory_start_task when \
                 beginning work to retrieve relevant memories, memory_report to store \
                 lessons, and memory_end_task with ratings so useful memories gain \
                 weight."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
