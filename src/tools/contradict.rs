//! MCP `memory_contradict` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_contradict` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ContradictParams {
    /// Id of the memory that turned out to be wrong.
    #[schemars(description = "Id of the memory that turned out to be wrong")]
    pub memory_id: String,

    /// Replacement text stored as a fresh correction, if any.
    #[schemars(description = "Replacement text stored as a fresh correction, if any")]
    pub correction: Option<String>,
}
