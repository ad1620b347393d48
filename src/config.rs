use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::StoreError;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemelordConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub learning: LearningConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub dimensions: usize,
    pub vector_type: VectorType,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub decay_rate: f64,
}

impl Default for MemelordConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".into(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: ".memelord".into(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            dimensions: 384,
            vector_type: VectorType::Vector32,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            decay_rate: 0.995,
        }
    }
}

/// SQL vector constructor used to type embedding blobs in retrieval queries.
///
/// Only `vector32` matches the 4-byte float32 element width the rest of the
/// store assumes; the other settings exist for config compatibility and are
/// refused at store construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorType {
    Vector32,
    Vector64,
    Vector8,
    Vector1,
}

impl VectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector32 => "vector32",
            Self::Vector64 => "vector64",
            Self::Vector8 => "vector8",
            Self::Vector1 => "vector1",
        }
    }

    /// The sqlite-vec constructor function for this element type, if one exists.
    pub fn sql_func(&self) -> Option<&'static str> {
        match self {
            Self::Vector32 => Some("vec_f32"),
            Self::Vector8 => Some("vec_int8"),
            Self::Vector1 => Some("vec_bit"),
            Self::Vector64 => None,
        }
    }
}

impl std::fmt::Display for VectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector32" => Ok(Self::Vector32),
            "vector64" => Ok(Self::Vector64),
            "vector8" => Ok(Self::Vector8),
            "vector1" => Ok(Self::Vector1),
            _ => Err(format!("unknown vector type: {s}")),
        }
    }
}

/// Construction-time configuration for a [`crate::memory::store::MemoryStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file path.
    pub db_path: PathBuf,
    /// Opaque session identifier stored with every task this process starts.
    pub session_id: String,
    /// SQL vector constructor; only `vector32` is accepted.
    pub vector_type: VectorType,
    /// Declared embedding vector length.
    pub dimensions: usize,
    /// Retrieval fan-out per `start_task`.
    pub top_k: usize,
    /// EMA learning rate for weight updates.
    pub learning_rate: f64,
    /// Daily decay base, used both for ranking recency and `decay()`.
    pub decay_rate: f64,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            session_id: session_id.into(),
            vector_type: VectorType::Vector32,
            dimensions: 384,
            top_k: 5,
            learning_rate: 0.1,
            decay_rate: 0.995,
        }
    }

    /// Check the configuration before any database work happens.
    pub fn validate(&self) -> Result<()> {
        if self.vector_type != VectorType::Vector32 {
            return Err(StoreError::InvalidArgument(format!(
                "vector type {} uses a different element width than the store's \
                 float32 column; only vector32 is supported",
                self.vector_type
            ))
            .into());
        }
        if self.top_k < 1 {
            return Err(StoreError::InvalidArgument("top_k must be >= 1".into()).into());
        }
        if self.dimensions == 0 {
            return Err(StoreError::InvalidArgument("dimensions must be > 0".into()).into());
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(
                StoreError::InvalidArgument("learning_rate must be in (0, 1]".into()).into(),
            );
        }
        if !(self.decay_rate > 0.0 && self.decay_rate < 1.0) {
            return Err(StoreError::InvalidArgument("decay_rate must be in (0, 1)".into()).into());
        }
        Ok(())
    }
}

impl MemelordConfig {
    /// Load config from `<data_dir>/config.toml` (if present) then apply env
    /// var overrides.
    pub fn load() -> Result<Self> {
        let dir = data_dir();
        Self::load_from(dir.join("config.toml"))
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MemelordConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MEMELORD_DIR, MEMELORD_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMELORD_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("MEMELORD_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// The resolved data directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Path of the per-project database file.
    pub fn db_path(&self) -> PathBuf {
        self.resolved_data_dir().join("memory.db")
    }

    /// Directory holding per-session state files.
    pub fn sessions_dir(&self) -> PathBuf {
        self.resolved_data_dir().join("sessions")
    }

    /// Build a [`StoreConfig`] for the given session.
    pub fn store_config(&self, session_id: impl Into<String>) -> StoreConfig {
        StoreConfig {
            db_path: self.db_path(),
            session_id: session_id.into(),
            vector_type: self.retrieval.vector_type,
            dimensions: self.retrieval.dimensions,
            top_k: self.retrieval.top_k,
            learning_rate: self.learning.learning_rate,
            decay_rate: self.learning.decay_rate,
        }
    }
}

/// Resolve the data directory root: `MEMELORD_DIR` if set, else `.memelord`
/// under the current directory.
pub fn data_dir() -> PathBuf {
    match std::env::var("MEMELORD_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from(".memelord"),
    }
}
