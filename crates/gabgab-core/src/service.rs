//! Recording service: the facade over the recording store and the embedder.
//!
//! `RecordingService` owns one `RecordingStore` and one `Embedder`, both
//! injected. It derives every embedding from the transcript, validates rows
//! and update assignments against the live schema, and applies the speaker
//! filter of a semantic search.
//!
//! This service lives in `gabgab-core` and depends only on `gabgab-types`
//! and the port traits -- never on concrete infra implementations.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use gabgab_types::column::{is_column_name, ColumnInfo, ColumnValue, ExtraColumn};
use gabgab_types::error::StoreError;
use gabgab_types::predicate::Predicate;
use gabgab_types::recording::{
    FilterMode, NewRecording, Recording, SearchHit, SearchOptions, TableStats, TableStatus,
    BASE_COLUMNS, EMBEDDING_DIMENSION, PROTECTED_COLUMNS,
};

use crate::embedding::Embedder;
use crate::store::RecordingStore;

/// Facade over a recordings table and the embedding function.
pub struct RecordingService<S, E> {
    store: S,
    embedder: E,
}

impl<S: RecordingStore, E: Embedder> RecordingService<S, E> {
    /// Wire the facade.
    ///
    /// Fails with `Initialization` if the embedder does not produce
    /// 384-dimensional vectors.
    pub fn new(store: S, embedder: E) -> Result<Self, StoreError> {
        if embedder.dimension() != EMBEDDING_DIMENSION {
            return Err(StoreError::Initialization(format!(
                "embedder '{}' produces {}-dimensional vectors, expected {EMBEDDING_DIMENSION}",
                embedder.model_name(),
                embedder.dimension()
            )));
        }
        Ok(Self { store, embedder })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Ensure the recordings table exists.
    ///
    /// An existing table is returned untouched; no migration is attempted.
    pub async fn create_table(&self) -> Result<TableStatus, StoreError> {
        if self.store.table_exists().await? {
            debug!(table = self.store.table_name(), "Table already exists");
            return Ok(TableStatus::Existing);
        }

        self.store.create_table().await?;
        info!(table = self.store.table_name(), "Created recordings table");
        Ok(TableStatus::Created)
    }

    /// Destroy the recordings table and recreate it empty.
    pub async fn reset_table(&self) -> Result<(), StoreError> {
        self.store.recreate_table().await?;
        warn!(
            table = self.store.table_name(),
            "Recreated recordings table, previous rows discarded"
        );
        Ok(())
    }

    /// Insert one recording, embedding its transcript.
    pub async fn insert_recording(&self, recording: NewRecording) -> Result<Recording, StoreError> {
        let mut rows = self.insert_recordings(vec![recording]).await?;
        rows.pop()
            .ok_or_else(|| StoreError::Storage("insert produced no row".to_string()))
    }

    /// Insert a batch of recordings as one append.
    ///
    /// All or nothing: every record is validated and embedded before any
    /// row is written, so a single bad record aborts the whole batch.
    pub async fn insert_recordings(
        &self,
        batch: Vec<NewRecording>,
    ) -> Result<Vec<Recording>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        for new in &batch {
            validate_new_recording(new)?;
        }

        if batch.iter().any(|r| !r.extra.is_empty()) {
            let columns = self.store.columns().await?;
            for new in &batch {
                validate_extra_values(new, &columns)?;
            }
        }

        let transcripts: Vec<String> = batch.iter().map(|r| r.transcript.clone()).collect();
        let embeddings = self.embed_checked(&transcripts).await?;

        let now = Utc::now();
        let rows = batch
            .into_iter()
            .zip(embeddings)
            .map(|(new, embedding)| {
                new.into_recording(embedding, now).map_err(|e| {
                    StoreError::SchemaMismatch(format!("metadata is not serializable: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.store.append(&rows).await?;

        debug!(
            table = self.store.table_name(),
            count = rows.len(),
            "Inserted recordings"
        );
        Ok(rows)
    }

    /// Find recordings whose transcripts are semantically closest to `query`.
    ///
    /// With `FilterMode::PostFilter` the top `limit` neighbors are fetched
    /// first and the speaker filter is applied afterwards, so fewer than
    /// `limit` hits may come back even when more matching rows exist.
    pub async fn semantic_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StoreError> {
        if options.limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embed_one(query).await?;
        let speaker_filter = options
            .speaker
            .as_deref()
            .filter(|speaker| !speaker.is_empty())
            .map(|speaker| Predicate::eq("speaker", speaker));

        let pushed_filter = match options.filter_mode {
            FilterMode::PreFilter => speaker_filter.as_ref(),
            FilterMode::PostFilter => None,
        };

        let neighbors = self
            .store
            .nearest(&query_embedding, options.limit, pushed_filter)
            .await?;
        let fetched = neighbors.len();

        let hits: Vec<SearchHit> = neighbors
            .into_iter()
            .filter(|(recording, _)| match (&speaker_filter, options.filter_mode) {
                (Some(filter), FilterMode::PostFilter) => filter.matches(recording),
                _ => true,
            })
            .enumerate()
            .map(|(i, (recording, distance))| SearchHit {
                rank: i + 1,
                distance,
                recording,
            })
            .collect();

        debug!(
            limit = options.limit,
            fetched,
            returned = hits.len(),
            "Semantic search complete"
        );
        Ok(hits)
    }

    /// Append nullable columns in place, keeping every existing row.
    ///
    /// Returns the table version after the change.
    pub async fn evolve_schema(&self, columns: &[ExtraColumn]) -> Result<u64, StoreError> {
        if columns.is_empty() {
            return Err(StoreError::SchemaMismatch("no columns to add".to_string()));
        }

        let existing = self.store.columns().await?;
        let mut seen = HashSet::new();
        for column in columns {
            if !is_column_name(&column.name) {
                return Err(StoreError::SchemaMismatch(format!(
                    "invalid column name: '{}'",
                    column.name
                )));
            }
            if existing.iter().any(|c| c.name == column.name) || !seen.insert(column.name.as_str()) {
                return Err(StoreError::SchemaMismatch(format!(
                    "column '{}' already exists",
                    column.name
                )));
            }
        }

        self.store.add_columns(columns).await?;
        let version = self.store.version().await?;

        info!(
            table = self.store.table_name(),
            added = columns.len(),
            version,
            "Schema evolved"
        );
        Ok(version)
    }

    /// Assign `values` on every row matching `predicate`.
    ///
    /// Returns the number of rows updated. Zero matches is not an error and
    /// leaves the table unchanged.
    pub async fn conditional_update(
        &self,
        predicate: &Predicate,
        values: &[(String, ColumnValue)],
    ) -> Result<u64, StoreError> {
        if values.is_empty() {
            return Err(StoreError::InvalidPredicate("no values to assign".to_string()));
        }
        predicate.to_sql()?;

        let columns = self.store.columns().await?;
        for name in predicate.columns() {
            find_column(&columns, name)?;
        }

        let mut assigned = HashSet::new();
        for (name, value) in values {
            if !assigned.insert(name.as_str()) {
                return Err(StoreError::InvalidPredicate(format!(
                    "column '{name}' assigned more than once"
                )));
            }
            validate_assignment(&columns, name, value)?;
        }

        let updated = self.store.update_where(predicate, values).await?;

        info!(
            table = self.store.table_name(),
            predicate = %predicate,
            updated,
            "Conditional update applied"
        );
        Ok(updated)
    }

    pub async fn count_rows(&self) -> Result<u64, StoreError> {
        self.store.count_rows(None).await
    }

    pub async fn version(&self) -> Result<u64, StoreError> {
        self.store.version().await
    }

    pub async fn schema_field_count(&self) -> Result<usize, StoreError> {
        Ok(self.store.columns().await?.len())
    }

    /// Number of recordings per generation model.
    pub async fn count_by_model(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let mut counts = BTreeMap::new();
        for model in self.store.column_values("model").await? {
            *counts.entry(model.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub async fn stats(&self) -> Result<TableStats, StoreError> {
        let columns = self.store.columns().await?;
        Ok(TableStats {
            row_count: self.store.count_rows(None).await?,
            version: self.store.version().await?,
            field_count: columns.len(),
            columns: columns.into_iter().map(|c| c.name).collect(),
            recordings_by_model: self.count_by_model().await?,
        })
    }

    /// Roll the table back to the contents of `version`.
    ///
    /// The restore is itself a write, so the returned latest version is
    /// newer than any before it.
    pub async fn restore_version(&self, version: u64) -> Result<u64, StoreError> {
        self.store.restore(version).await?;
        let latest = self.store.version().await?;
        info!(
            table = self.store.table_name(),
            restored = version,
            latest,
            "Restored table version"
        );
        Ok(latest)
    }

    /// Release the table handle and the embedding model.
    pub fn close(self) {
        debug!(table = self.store.table_name(), "Closing recording service");
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self.embed_checked(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| StoreError::Embedding("embedder returned no vector".to_string()))
    }

    /// Embed and enforce one 384-length vector per input.
    async fn embed_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        if let Some(i) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(StoreError::Embedding(format!("text at position {i} is empty")));
        }

        let vectors = self.embedder.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(StoreError::Embedding(format!(
                "expected {} vectors, embedder returned {}",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != EMBEDDING_DIMENSION) {
            return Err(StoreError::Embedding(format!(
                "expected {EMBEDDING_DIMENSION}-dimensional vector, got {}",
                bad.len()
            )));
        }
        Ok(vectors)
    }
}

fn validate_new_recording(new: &NewRecording) -> Result<(), StoreError> {
    if new.id.trim().is_empty() {
        return Err(StoreError::SchemaMismatch("id is required".to_string()));
    }
    if new.model.trim().is_empty() {
        return Err(StoreError::SchemaMismatch(format!(
            "model is required (recording '{}')",
            new.id
        )));
    }
    if new.duration_ms < 0 {
        return Err(StoreError::SchemaMismatch(format!(
            "duration_ms must be non-negative, got {} (recording '{}')",
            new.duration_ms, new.id
        )));
    }
    if new.transcript.trim().is_empty() {
        return Err(StoreError::Embedding(format!(
            "transcript is empty (recording '{}')",
            new.id
        )));
    }
    Ok(())
}

fn validate_extra_values(new: &NewRecording, columns: &[ColumnInfo]) -> Result<(), StoreError> {
    for (name, value) in &new.extra {
        if BASE_COLUMNS.contains(&name.as_str()) {
            return Err(StoreError::SchemaMismatch(format!(
                "'{name}' is a base column and cannot be set as an extra value"
            )));
        }
        let column = find_column(columns, name)?;
        let fits = column.column_type.is_some_and(|ty| value.fits(ty));
        if !fits {
            return Err(StoreError::SchemaMismatch(format!(
                "value of type {} does not fit column '{name}' (recording '{}')",
                value.type_name(),
                new.id
            )));
        }
    }
    Ok(())
}

fn validate_assignment(
    columns: &[ColumnInfo],
    name: &str,
    value: &ColumnValue,
) -> Result<(), StoreError> {
    if PROTECTED_COLUMNS.contains(&name) {
        return Err(StoreError::InvalidPredicate(format!(
            "column '{name}' cannot be updated"
        )));
    }

    let column = find_column(columns, name)?;
    let Some(column_type) = column.column_type else {
        return Err(StoreError::SchemaMismatch(format!(
            "column '{name}' cannot be assigned a scalar value"
        )));
    };
    if value.is_null() && !column.nullable {
        return Err(StoreError::SchemaMismatch(format!(
            "column '{name}' is not nullable"
        )));
    }
    if !value.fits(column_type) {
        return Err(StoreError::SchemaMismatch(format!(
            "value of type {} does not fit {column_type} column '{name}'",
            value.type_name()
        )));
    }
    if let (&ColumnValue::Int(i), "duration_ms") = (value, name) {
        if i32::try_from(i).is_err() {
            return Err(StoreError::SchemaMismatch(format!(
                "duration_ms value {i} is out of range"
            )));
        }
    }
    value.sql_literal()?;
    Ok(())
}

fn find_column<'a>(columns: &'a [ColumnInfo], name: &str) -> Result<&'a ColumnInfo, StoreError> {
    columns
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| StoreError::SchemaMismatch(format!("unknown column '{name}'")))
}
