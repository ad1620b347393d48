//! MCP `memory_start_task` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_start_task` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StartTaskParams {
    /// Natural language description of the task about to begin.
    #[schemars(description = "Natural language description of the task about to begin")]
    pub description: String,
}
