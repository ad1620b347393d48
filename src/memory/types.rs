//! Core memory type definitions.
//!
//! Defines [`Category`] (the closed set of memory categories), the surface
//! structs returned by store operations, and the input structs they accept.

use serde::{Deserialize, Serialize};

/// The five memory categories. Each gets a different initial weight at insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A lesson learned from a failed-then-fixed approach.
    Correction,
    /// A general observation worth keeping.
    Insight,
    /// Something the user said, denied, or corrected.
    User,
    /// A merge of several related memories.
    Consolidated,
    /// Auto-detected by hooks from transcripts.
    Discovery,
}

impl Category {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correction => "correction",
            Self::Insight => "insight",
            Self::User => "user",
            Self::Consolidated => "consolidated",
            Self::Discovery => "discovery",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correction" => Ok(Self::Correction),
            "insight" => Ok(Self::Insight),
            "user" => Ok(Self::User),
            "consolidated" => Ok(Self::Consolidated),
            "discovery" => Ok(Self::Discovery),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// A memory as returned to callers.
///
/// `score` depends on the operation: similarity for `start_task`, stored
/// weight for `top_by_weight` and `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedMemory {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub weight: f64,
    pub score: f64,
}

/// Result of `start_task`: the new task id plus the memories surfaced for it.
#[derive(Debug, Serialize)]
pub struct StartedTask {
    pub task_id: String,
    pub memories: Vec<RetrievedMemory>,
}

/// Inputs to `report_correction`.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionReport {
    pub lesson: String,
    pub what_failed: String,
    pub what_worked: String,
    pub tokens_wasted: Option<i64>,
    pub tools_wasted: Option<i64>,
}

impl CorrectionReport {
    /// The stored content template.
    pub fn content(&self) -> String {
        format!(
            "{}\n\nFailed approach: {}\nWorking approach: {}",
            self.lesson, self.what_failed, self.what_worked
        )
    }
}

/// One memory rating handed to `end_task`.
#[derive(Debug, Clone, Deserialize)]
pub struct SelfReport {
    pub memory_id: String,
    /// 0 (useless) to 3 (decisive).
    pub rating: u8,
}

/// Result of `contradict_memory`.
#[derive(Debug, Serialize)]
pub struct ContradictOutcome {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_id: Option<String>,
}

/// Result of `decay`.
#[derive(Debug, Serialize)]
pub struct DecayOutcome {
    /// Rows whose weight was multiplied by the decay rate.
    pub decayed: usize,
    /// Rows deleted for falling below the floor after repeated retrieval.
    pub deleted: usize,
}

/// Result of `stats`.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_memories: u64,
    pub task_count: u64,
    pub avg_task_score: f64,
    pub top_memories: Vec<RetrievedMemory>,
}
