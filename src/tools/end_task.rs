//! MCP `memory_end_task` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One memory rating inside `memory_end_task`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SelfReportParam {
    /// Id of a memory retrieved for this task.
    #[schemars(description = "Id of a memory retrieved for this task")]
    pub memory_id: String,

    /// How much the memory helped: 0 (useless) to 3 (decisive).
    #[schemars(description = "How much the memory helped: 0 (useless) to 3 (decisive)")]
    pub rating: u8,
}

/// Parameters for the `memory_end_task` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EndTaskParams {
    /// Id returned by `memory_start_task`.
    #[schemars(description = "Id returned by memory_start_task")]
    pub task_id: String,

    /// Total tokens the task consumed.
    #[schemars(description = "Total tokens the task consumed")]
    pub tokens_used: i64,

    /// Tool calls the task made.
    #[schemars(description = "Tool calls the task made")]
    pub tool_calls: i64,

    /// Errors hit during the task.
    #[schemars(description = "Errors hit during the task")]
    pub errors: i64,

    /// Times the user had to correct course.
    #[schemars(description = "Times the user had to correct course")]
    pub user_corrections: i64,

    /// Whether the task finished successfully.
    #[schemars(description = "Whether the task finished successfully")]
    pub completed: bool,

    /// Ratings for the memories retrieved at task start.
    #[schemars(description = "Ratings for the memories retrieved at task start")]
    pub self_report: Option<Vec<SelfReportParam>>,
}
