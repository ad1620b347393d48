//! Per-session state files under `<data_dir>/sessions/`.
//!
//! The SessionStart hook writes `<session_id>.json` with the memories it
//! injected; the PostToolUse hook appends failure records to
//! `<session_id>.failures.jsonl`. The SessionEnd hook drains both (reads then
//! deletes) to close the feedback loop.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// State written at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub cwd: String,
    /// Unix seconds.
    pub started_at: i64,
    /// Memory ids surfaced into the session's context at start.
    pub injected_memory_ids: Vec<String>,
}

/// One tool failure observed mid-session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Unix seconds.
    pub timestamp: i64,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub error_summary: String,
}

/// Everything drained from a finished session.
#[derive(Debug)]
pub struct DrainedSession {
    pub state: SessionState,
    pub failures: Vec<FailureRecord>,
}

pub fn session_file(sessions_dir: &Path, session_id: &str) -> PathBuf {
    sessions_dir.join(format!("{session_id}.json"))
}

pub fn failures_file(sessions_dir: &Path, session_id: &str) -> PathBuf {
    sessions_dir.join(format!("{session_id}.failures.jsonl"))
}

/// Write (or overwrite) the session state file.
pub fn write_session(sessions_dir: &Path, state: &SessionState) -> Result<()> {
    std::fs::create_dir_all(sessions_dir).with_context(|| {
        format!("failed to create sessions dir {}", sessions_dir.display())
    })?;
    let path = session_file(sessions_dir, &state.session_id);
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write session file {}", path.display()))?;
    Ok(())
}

/// Append one failure record to the session's jsonl file.
pub fn append_failure(
    sessions_dir: &Path,
    session_id: &str,
    record: &FailureRecord,
) -> Result<()> {
    std::fs::create_dir_all(sessions_dir).with_context(|| {
        format!("failed to create sessions dir {}", sessions_dir.display())
    })?;
    let path = failures_file(sessions_dir, session_id);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open failures file {}", path.display()))?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Read and delete both session files. Returns `None` when no session state
/// exists (nothing to drain). Unparseable failure lines are skipped with a
/// warning rather than losing the whole drain.
pub fn drain_session(sessions_dir: &Path, session_id: &str) -> Result<Option<DrainedSession>> {
    let state_path = session_file(sessions_dir, session_id);
    if !state_path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(&state_path)
        .with_context(|| format!("failed to read session file {}", state_path.display()))?;
    let state: SessionState =
        serde_json::from_str(&raw).context("failed to parse session state")?;

    let failures_path = failures_file(sessions_dir, session_id);
    let failures = if failures_path.exists() {
        let raw = std::fs::read_to_string(&failures_path)?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<FailureRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed failure record");
                    None
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    std::fs::remove_file(&state_path)?;
    if failures_path.exists() {
        std::fs::remove_file(&failures_path)?;
    }

    Ok(Some(DrainedSession { state, failures }))
}
