//! Per-project persistent memory for coding agents.
//!
//! memelord stores short textual memories (lessons, corrections, user
//! preferences, discoveries) in one SQLite file per project, retrieves the
//! most relevant ones when a task starts, and continuously revises each
//! memory's usefulness from task outcomes:
//!
//! | Category | Source | Initial weight |
//! |----------|--------|----------------|
//! | **Correction** | A failed-then-fixed approach | 1.0 + tokens wasted / avg task |
//! | **User** | Something the user said, denied, or corrected | 2.0 – 2.5 by source |
//! | **Insight** | A general observation | 1.0 |
//! | **Consolidated** | A merge of related memories | 1.0 |
//! | **Discovery** | Auto-detected by hooks | caller-set |
//!
//! # Architecture
//!
//! - **Storage**: one SQLite file per project with
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for cosine distance
//!   over float32 embedding blobs. Retrieval is a linear scan ranked by
//!   `(1 - distance) * decay_rate ^ days_since_use` — the store holds at most
//!   a few thousand rows, so no ANN index is needed.
//! - **Learning**: each finished task is scored against a running baseline
//!   (Welford mean/variance over tokens, errors, and user corrections); the
//!   score is split as credit across the memories the agent rated useful and
//!   folded into their weights by an exponential moving average. Periodic
//!   decay prunes memories that stopped earning their keep.
//! - **Concurrency**: hooks, the MCP server, and CLI commands open the same
//!   file from separate processes. Every operation uses a short-lived
//!   connection with a busy timeout; connects retry with randomized backoff.
//!   Embedding always runs outside the connection.
//! - **Embeddings**: injected via the [`embedding::Embedder`] trait; the
//!   store never computes vectors itself.
//!
//! # Modules
//!
//! - [`config`] — TOML/env configuration and the store's construction options
//! - [`db`] — connection discipline, schema, repairs, and health checks
//! - [`scoring`] — the pure scoring algebra (baseline, credit, EMA, decay)
//! - [`memory`] — the stateful store: retrieval, lifecycle, and statistics
//! - [`embedding`] — embedder trait and the built-in hashed provider
//! - [`session`] — per-session state files written by hook collaborators

pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod scoring;
pub mod server;
pub mod session;
pub mod tools;
