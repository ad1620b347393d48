//! MCP `memory_report` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `memory_report` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReportParams {
    /// Report type: `"correction"`, `"user_input"`, or `"insight"`.
    #[schemars(
        description = "Report type: 'correction' (failed-then-fixed approach), 'user_input' (something the user said), 'insight' (general observation)"
    )]
    pub r#type: String,

    /// The lesson worth remembering.
    #[schemars(description = "The lesson worth remembering")]
    pub lesson: String,

    /// For corrections: the approach that failed.
    #[schemars(description = "For corrections: the approach that failed")]
    pub what_failed: Option<String>,

    /// For corrections: the approach that worked.
    #[schemars(description = "For corrections: the approach that worked")]
    pub what_worked: Option<String>,

    /// Tokens wasted before the fix was found.
    #[schemars(description = "Tokens wasted before the fix was found")]
    pub tokens_wasted: Option<i64>,

    /// Tool calls wasted before the fix was found.
    #[schemars(description = "Tool calls wasted before the fix was found")]
    pub tools_wasted: Option<i64>,

    /// For user input: origin label (`user_denial`, `user_correction`, `user_input`).
    #[schemars(
        description = "For user input: origin label ('user_denial', 'user_correction', 'user_input')"
    )]
    pub source: Option<String>,
}
