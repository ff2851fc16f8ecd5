//! Global configuration types for GabGab.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls where
//! recordings are stored, which embedding model is used and search defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::recording::RECORDINGS_TABLE;

/// Top-level configuration.
///
/// Loaded from `~/.gabgab/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// LanceDB directory. Defaults to `{data_dir}/lancedb` when unset.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

fn default_table_name() -> String {
    RECORDINGS_TABLE.to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            table_name: default_table_name(),
            embedder: EmbedderConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Which embedding implementation to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local ONNX sentence-embedding model.
    #[default]
    Fastembed,
    /// Deterministic feature-hashing embedder; no model download.
    Hashing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Where downloaded model files are cached.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            model: default_model(),
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

/// Vector distance used for nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    L2,
    Cosine,
    Dot,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::L2 => write!(f, "l2"),
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Dot => write!(f, "dot"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            "dot" => Ok(DistanceMetric::Dot),
            other => Err(format!("invalid distance metric: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default)]
    pub distance: DistanceMetric,
}

fn default_limit() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            distance: DistanceMetric::default(),
        }
    }
}
