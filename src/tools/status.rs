//! MCP `memory_status` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_status` MCP tool. Takes no arguments.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct StatusParams {}
