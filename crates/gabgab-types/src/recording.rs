//! Recording types for GabGab.
//!
//! A `Recording` is one stored voice clip: optional audio bytes, the
//! transcript, a 384-dimensional embedding derived from that transcript,
//! and descriptive metadata. Recordings are created once by insertion and
//! afterwards only change through bulk conditional updates.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::column::ColumnValue;

/// Output dimension of the sentence-embedding models (all-MiniLM-L6-v2,
/// bge-small-en-v1.5).
pub const EMBEDDING_DIMENSION: usize = 384;

/// Name of the table holding recordings.
pub const RECORDINGS_TABLE: &str = "recordings";

/// Columns of the base schema, in schema order.
pub const BASE_COLUMNS: [&str; 9] = [
    "id",
    "timestamp",
    "audio_bytes",
    "transcript",
    "embedding",
    "model",
    "duration_ms",
    "speaker",
    "metadata",
];

/// Columns that conditional updates may not assign.
///
/// `embedding` is always derived from `transcript`, so neither can change
/// independently; `id` and `audio_bytes` have no update literal form.
pub const PROTECTED_COLUMNS: [&str; 4] = ["id", "transcript", "embedding", "audio_bytes"];

/// A stored voice recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recording {
    pub id: String,
    /// Creation time, microsecond precision.
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_bytes: Option<Vec<u8>>,
    pub transcript: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// Synthesis or generation model that produced the audio (e.g. "kokoro-82m").
    pub model: String,
    pub duration_ms: i32,
    pub speaker: Option<String>,
    /// Serialized JSON object, as stored.
    pub metadata: Option<String>,
    /// Values of columns added by schema evolution, keyed by column name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, ColumnValue>,
}

impl Recording {
    /// Deserialize the stored metadata string back into a JSON object.
    pub fn metadata_map(&self) -> Result<Option<Map<String, Value>>, serde_json::Error> {
        self.metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }

    /// Look up a column value by name.
    ///
    /// Returns `None` for columns this recording does not know about.
    /// The embedding column has no scalar value and is never returned.
    pub fn value_of(&self, column: &str) -> Option<ColumnValue> {
        let value = match column {
            "id" => ColumnValue::Text(self.id.clone()),
            "timestamp" => ColumnValue::Timestamp(self.timestamp),
            "audio_bytes" => self.audio_bytes.clone().map_or(ColumnValue::Null, ColumnValue::Bytes),
            "transcript" => ColumnValue::Text(self.transcript.clone()),
            "model" => ColumnValue::Text(self.model.clone()),
            "duration_ms" => ColumnValue::Int(i64::from(self.duration_ms)),
            "speaker" => self.speaker.clone().into(),
            "metadata" => self.metadata.clone().into(),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }
}

/// Input for inserting a recording. The embedding is never supplied by the
/// caller; it is computed from `transcript` at insertion time.
#[derive(Debug, Clone, Default)]
pub struct NewRecording {
    pub id: String,
    pub transcript: String,
    pub model: String,
    pub duration_ms: i32,
    pub audio_bytes: Option<Vec<u8>>,
    pub speaker: Option<String>,
    /// Defaults to the insertion time.
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<Map<String, Value>>,
    /// Values for evolved columns; omitted columns are stored as null.
    pub extra: BTreeMap<String, ColumnValue>,
}

impl NewRecording {
    pub fn new(
        id: impl Into<String>,
        transcript: impl Into<String>,
        model: impl Into<String>,
        duration_ms: i32,
    ) -> Self {
        Self {
            id: id.into(),
            transcript: transcript.into(),
            model: model.into(),
            duration_ms,
            ..Default::default()
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_audio(mut self, audio_bytes: Vec<u8>) -> Self {
        self.audio_bytes = Some(audio_bytes);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.extra.insert(column.into(), value.into());
        self
    }

    /// Materialize the stored row from this input and its embedding.
    ///
    /// Empty metadata objects are stored as null, same as absent ones.
    pub fn into_recording(
        self,
        embedding: Vec<f32>,
        now: DateTime<Utc>,
    ) -> Result<Recording, serde_json::Error> {
        let metadata = match self.metadata {
            Some(map) if !map.is_empty() => Some(serde_json::to_string(&map)?),
            _ => None,
        };

        Ok(Recording {
            id: self.id,
            timestamp: self.timestamp.unwrap_or(now).trunc_subsecs(6),
            audio_bytes: self.audio_bytes,
            transcript: self.transcript,
            embedding,
            model: self.model,
            duration_ms: self.duration_ms,
            speaker: self.speaker,
            metadata,
            extra: self.extra,
        })
    }
}

/// How a speaker filter interacts with the nearest-neighbor search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Fetch the top `limit` neighbors, then drop non-matching rows.
    /// May return fewer than `limit` results.
    #[default]
    PostFilter,
    /// Push the filter into the search so up to `limit` matching rows return.
    PreFilter,
}

/// Options for a semantic search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Exact, case-sensitive speaker match.
    pub speaker: Option<String>,
    pub filter_mode: FilterMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            speaker: None,
            filter_mode: FilterMode::PostFilter,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_filter_mode(mut self, filter_mode: FilterMode) -> Self {
        self.filter_mode = filter_mode;
        self
    }
}

/// A search result: the matched recording with its position and distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based position in the returned list, most similar first.
    pub rank: usize,
    /// Distance reported by the store (smaller is more similar).
    pub distance: f32,
    pub recording: Recording,
}

/// Outcome of creating the recordings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Created,
    Existing,
}

/// Read-only statistics about the recordings table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub row_count: u64,
    pub version: u64,
    pub field_count: usize,
    pub columns: Vec<String>,
    pub recordings_by_model: BTreeMap<String, u64>,
}
