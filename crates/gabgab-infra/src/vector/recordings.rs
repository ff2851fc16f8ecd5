//! LanceDB-backed recordings table.
//!
//! Implements `RecordingStore` from `gabgab-core`. Rows are converted to
//! Arrow record batches built against the table's live schema, so columns
//! added by schema evolution are written (or nulled) alongside the base
//! fields and read back into `Recording::extra`.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BinaryArray, BooleanArray, FixedSizeListArray, Float32Array, Float64Array,
    Int32Array, Int64Array, RecordBatch, RecordBatchIterator, StringArray,
    TimestampMicrosecondArray, new_null_array,
};
use arrow_schema::{DataType, Field, SchemaRef};
use chrono::DateTime;
use futures_util::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::table::NewColumnTransform;

use gabgab_core::store::RecordingStore;
use gabgab_types::column::{ColumnInfo, ColumnValue, ExtraColumn};
use gabgab_types::config::DistanceMetric;
use gabgab_types::error::StoreError;
use gabgab_types::predicate::Predicate;
use gabgab_types::recording::{Recording, BASE_COLUMNS};

use super::lance::LanceVectorStore;
use super::schema::{column_infos, extra_columns_schema, recordings_schema};

/// Column added by LanceDB to vector search results.
const DISTANCE_COLUMN: &str = "_distance";

/// A single recordings table inside a LanceDB database.
pub struct LanceRecordingStore {
    store: LanceVectorStore,
    table_name: String,
    distance: DistanceMetric,
}

impl LanceRecordingStore {
    pub fn new(store: LanceVectorStore, table_name: impl Into<String>, distance: DistanceMetric) -> Self {
        Self {
            store,
            table_name: table_name.into(),
            distance,
        }
    }

    fn distance_type(&self) -> lancedb::DistanceType {
        match self.distance {
            DistanceMetric::L2 => lancedb::DistanceType::L2,
            DistanceMetric::Cosine => lancedb::DistanceType::Cosine,
            DistanceMetric::Dot => lancedb::DistanceType::Dot,
        }
    }

    /// Open the latest version of the table.
    async fn table(&self) -> Result<lancedb::Table, StoreError> {
        self.store
            .open_table(&self.table_name)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open table: {e}")))?
            .ok_or_else(|| StoreError::TableNotFound(self.table_name.clone()))
    }
}

impl RecordingStore for LanceRecordingStore {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn table_exists(&self) -> Result<bool, StoreError> {
        self.store
            .table_exists(&self.table_name)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to list tables: {e}")))
    }

    async fn create_table(&self) -> Result<(), StoreError> {
        self.store
            .create_table(&self.table_name, Arc::new(recordings_schema()))
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create table: {e}")))?;
        Ok(())
    }

    async fn recreate_table(&self) -> Result<(), StoreError> {
        self.store
            .drop_table(&self.table_name)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to drop table: {e}")))?;
        self.create_table().await
    }

    async fn append(&self, rows: &[Recording]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let table = self.table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read schema: {e}")))?;

        let batch = build_record_batch(schema.clone(), rows)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to add recordings: {e}")))?;

        Ok(())
    }

    async fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<(Recording, f32)>, StoreError> {
        let table = self.table().await?;

        let mut search = table
            .vector_search(query)
            .map_err(|e| StoreError::Storage(format!("Vector search setup failed: {e}")))?
            .column("embedding")
            .distance_type(self.distance_type())
            .limit(limit);
        if let Some(filter) = filter {
            search = search.only_if(filter.to_sql()?);
        }

        let batches: Vec<RecordBatch> = search
            .execute()
            .await
            .map_err(|e| StoreError::Storage(format!("Vector search failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to collect results: {e}")))?;

        let mut hits = Vec::new();
        for batch in &batches {
            let distances = batch
                .column_by_name(DISTANCE_COLUMN)
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            for (i, recording) in record_batch_to_recordings(batch)?.into_iter().enumerate() {
                hits.push((recording, distances.map_or(0.0, |d| d.value(i))));
            }
        }

        // Stable: ties keep the order LanceDB returned them in.
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(hits)
    }

    async fn scan(&self, filter: Option<&Predicate>) -> Result<Vec<Recording>, StoreError> {
        let table = self.table().await?;

        let mut query = table.query();
        if let Some(filter) = filter {
            query = query.only_if(filter.to_sql()?);
        }

        let batches: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| StoreError::Storage(format!("Scan failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to collect rows: {e}")))?;

        let mut recordings = Vec::new();
        for batch in &batches {
            recordings.extend(record_batch_to_recordings(batch)?);
        }
        Ok(recordings)
    }

    async fn column_values(&self, column: &str) -> Result<Vec<ColumnValue>, StoreError> {
        let table = self.table().await?;

        let batches: Vec<RecordBatch> = table
            .query()
            .select(Select::columns(&[column]))
            .execute()
            .await
            .map_err(|e| StoreError::Storage(format!("Projection of '{column}' failed: {e}")))?
            .try_collect()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to collect rows: {e}")))?;

        let mut values = Vec::new();
        for batch in &batches {
            let array = batch.column_by_name(column).ok_or_else(|| {
                StoreError::SchemaMismatch(format!("column '{column}' not in table"))
            })?;
            values.extend((0..batch.num_rows()).map(|i| cell_value(array, i)));
        }
        Ok(values)
    }

    async fn columns(&self) -> Result<Vec<ColumnInfo>, StoreError> {
        let schema = self
            .table()
            .await?
            .schema()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read schema: {e}")))?;
        Ok(column_infos(&schema))
    }

    async fn add_columns(&self, columns: &[ExtraColumn]) -> Result<(), StoreError> {
        let table = self.table().await?;
        let transform = NewColumnTransform::AllNulls(Arc::new(extra_columns_schema(columns)));

        table
            .add_columns(transform, None)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to add columns: {e}")))?;

        Ok(())
    }

    async fn update_where(
        &self,
        predicate: &Predicate,
        values: &[(String, ColumnValue)],
    ) -> Result<u64, StoreError> {
        let condition = predicate.to_sql()?;
        let table = self.table().await?;

        let matching = table
            .count_rows(Some(condition.clone()))
            .await
            .map_err(|e| StoreError::InvalidPredicate(format!("{condition}: {e}")))?
            as u64;
        if matching == 0 {
            return Ok(0);
        }

        let mut update = table.update().only_if(condition);
        for (name, value) in values {
            update = update.column(name.as_str(), value.sql_literal()?);
        }
        update
            .execute()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to update rows: {e}")))?;

        Ok(matching)
    }

    async fn count_rows(&self, filter: Option<&Predicate>) -> Result<u64, StoreError> {
        let condition = filter.map(Predicate::to_sql).transpose()?;
        let count = self
            .table()
            .await?
            .count_rows(condition)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }

    async fn version(&self) -> Result<u64, StoreError> {
        self.table()
            .await?
            .version()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to read version: {e}")))
    }

    async fn restore(&self, version: u64) -> Result<(), StoreError> {
        let table = self.table().await?;
        table
            .checkout(version)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to check out version {version}: {e}")))?;
        table
            .restore()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to restore version {version}: {e}")))
    }
}

/// Build one record batch holding `rows`, laid out as `schema`.
fn build_record_batch(schema: SchemaRef, rows: &[Recording]) -> Result<RecordBatch, StoreError> {
    for row in rows {
        if let Some(unknown) = row.extra.keys().find(|k| schema.field_with_name(k).is_err()) {
            return Err(StoreError::SchemaMismatch(format!(
                "unknown column '{unknown}' (recording '{}')",
                row.id
            )));
        }
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| build_column(field, rows))
        .collect::<Result<Vec<_>, _>>()?;

    RecordBatch::try_new(schema, columns)
        .map_err(|e| StoreError::SchemaMismatch(format!("Failed to build record batch: {e}")))
}

fn build_column(field: &Field, rows: &[Recording]) -> Result<ArrayRef, StoreError> {
    let array: ArrayRef = match field.name().as_str() {
        "id" => Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.id.as_str()))),
        "timestamp" => Arc::new(TimestampMicrosecondArray::from(
            rows.iter()
                .map(|r| r.timestamp.timestamp_micros())
                .collect::<Vec<_>>(),
        )),
        "audio_bytes" => Arc::new(BinaryArray::from(
            rows.iter()
                .map(|r| r.audio_bytes.as_deref())
                .collect::<Vec<_>>(),
        )),
        "transcript" => Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.transcript.as_str()),
        )),
        "embedding" => embedding_array(field, rows)?,
        "model" => Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.model.as_str()))),
        "duration_ms" => Arc::new(Int32Array::from(
            rows.iter().map(|r| r.duration_ms).collect::<Vec<_>>(),
        )),
        "speaker" => Arc::new(StringArray::from(
            rows.iter().map(|r| r.speaker.as_deref()).collect::<Vec<_>>(),
        )),
        "metadata" => Arc::new(StringArray::from(
            rows.iter().map(|r| r.metadata.as_deref()).collect::<Vec<_>>(),
        )),
        name => extra_column_array(name, field.data_type(), rows)?,
    };
    Ok(array)
}

fn embedding_array(field: &Field, rows: &[Recording]) -> Result<ArrayRef, StoreError> {
    let DataType::FixedSizeList(item, size) = field.data_type() else {
        return Err(StoreError::SchemaMismatch(format!(
            "embedding column has unexpected type {}",
            field.data_type()
        )));
    };

    let mut values = Vec::with_capacity(rows.len() * *size as usize);
    for row in rows {
        if row.embedding.len() != *size as usize {
            return Err(StoreError::Embedding(format!(
                "expected {size}-dimensional vector, got {} (recording '{}')",
                row.embedding.len(),
                row.id
            )));
        }
        values.extend_from_slice(&row.embedding);
    }

    let array = FixedSizeListArray::try_new(item.clone(), *size, Arc::new(Float32Array::from(values)), None)
        .map_err(|e| StoreError::Embedding(format!("Failed to build embedding column: {e}")))?;
    Ok(Arc::new(array))
}

/// Values of an evolved column. Rows without a value store null.
fn extra_column_array(
    name: &str,
    data_type: &DataType,
    rows: &[Recording],
) -> Result<ArrayRef, StoreError> {
    let array: ArrayRef = match data_type {
        DataType::Utf8 => Arc::new(StringArray::from(extra_values(name, rows, |v| match v {
            ColumnValue::Text(s) => Some(s.clone()),
            _ => None,
        })?)),
        DataType::Int64 => Arc::new(Int64Array::from(extra_values(name, rows, |v| match v {
            ColumnValue::Int(i) => Some(*i),
            _ => None,
        })?)),
        DataType::Float64 => Arc::new(Float64Array::from(extra_values(name, rows, |v| match v {
            ColumnValue::Float(f) => Some(*f),
            ColumnValue::Int(i) => Some(*i as f64),
            _ => None,
        })?)),
        DataType::Boolean => Arc::new(BooleanArray::from(extra_values(name, rows, |v| match v {
            ColumnValue::Bool(b) => Some(*b),
            _ => None,
        })?)),
        other => {
            extra_values(name, rows, |_| None::<()>)?;
            new_null_array(other, rows.len())
        }
    };
    Ok(array)
}

/// Collect one column's values, converting each present non-null value
/// with `convert`. A value that does not convert is a type mismatch.
fn extra_values<T>(
    name: &str,
    rows: &[Recording],
    convert: impl Fn(&ColumnValue) -> Option<T>,
) -> Result<Vec<Option<T>>, StoreError> {
    rows.iter()
        .map(|row| match row.extra.get(name) {
            None | Some(ColumnValue::Null) => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| {
                StoreError::SchemaMismatch(format!(
                    "value of type {} does not fit column '{name}' (recording '{}')",
                    value.type_name(),
                    row.id
                ))
            }),
        })
        .collect()
}

fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a T, StoreError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| {
            StoreError::SchemaMismatch(format!("column '{name}' is missing or has an unexpected type"))
        })
}

fn optional_string(column: &StringArray, i: usize) -> Option<String> {
    (!column.is_null(i)).then(|| column.value(i).to_string())
}

/// Read a scalar cell of an evolved column.
fn cell_value(array: &ArrayRef, i: usize) -> ColumnValue {
    if array.is_null(i) {
        return ColumnValue::Null;
    }
    let any = array.as_ref().as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        ColumnValue::Text(a.value(i).to_string())
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        ColumnValue::Int(a.value(i))
    } else if let Some(a) = any.downcast_ref::<Int32Array>() {
        ColumnValue::Int(i64::from(a.value(i)))
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        ColumnValue::Float(a.value(i))
    } else if let Some(a) = any.downcast_ref::<Float32Array>() {
        ColumnValue::Float(f64::from(a.value(i)))
    } else if let Some(a) = any.downcast_ref::<BooleanArray>() {
        ColumnValue::Bool(a.value(i))
    } else {
        ColumnValue::Null
    }
}

/// Parse Arrow rows back into recordings.
///
/// Base columns are read by name; every other non-internal column becomes
/// an entry of `Recording::extra`.
fn record_batch_to_recordings(batch: &RecordBatch) -> Result<Vec<Recording>, StoreError> {
    let num_rows = batch.num_rows();
    if num_rows == 0 {
        return Ok(vec![]);
    }

    let id_col = typed_column::<StringArray>(batch, "id")?;
    let timestamp_col = typed_column::<TimestampMicrosecondArray>(batch, "timestamp")?;
    let audio_col = typed_column::<BinaryArray>(batch, "audio_bytes")?;
    let transcript_col = typed_column::<StringArray>(batch, "transcript")?;
    let model_col = typed_column::<StringArray>(batch, "model")?;
    let duration_col = typed_column::<Int32Array>(batch, "duration_ms")?;
    let speaker_col = typed_column::<StringArray>(batch, "speaker")?;
    let metadata_col = typed_column::<StringArray>(batch, "metadata")?;
    let embedding_col = batch
        .column_by_name("embedding")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());

    let schema = batch.schema();
    let extra_cols: Vec<(&str, &ArrayRef)> = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(f, _)| !BASE_COLUMNS.contains(&f.name().as_str()) && !f.name().starts_with('_'))
        .map(|(f, c)| (f.name().as_str(), c))
        .collect();

    let mut recordings = Vec::with_capacity(num_rows);
    for i in 0..num_rows {
        let micros = timestamp_col.value(i);
        let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            StoreError::SchemaMismatch(format!("timestamp {micros} is out of range"))
        })?;

        let embedding = embedding_col
            .map(|col| {
                col.value(i)
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|v| v.values().to_vec())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        let extra: BTreeMap<String, ColumnValue> = extra_cols
            .iter()
            .map(|(name, col)| (name.to_string(), cell_value(col, i)))
            .collect();

        recordings.push(Recording {
            id: id_col.value(i).to_string(),
            timestamp,
            audio_bytes: (!audio_col.is_null(i)).then(|| audio_col.value(i).to_vec()),
            transcript: transcript_col.value(i).to_string(),
            embedding,
            model: model_col.value(i).to_string(),
            duration_ms: duration_col.value(i),
            speaker: optional_string(speaker_col, i),
            metadata: optional_string(metadata_col, i),
            extra,
        });
    }

    Ok(recordings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gabgab_core::embedding::HashingEmbedder;
    use gabgab_core::service::RecordingService;
    use gabgab_types::column::ColumnType;
    use gabgab_types::recording::{FilterMode, NewRecording, SearchOptions, TableStatus};
    use serde_json::{json, Map};

    type Service = RecordingService<LanceRecordingStore, HashingEmbedder>;

    async fn open_service(dir: &tempfile::TempDir) -> Service {
        let store = LanceVectorStore::new(dir.path().join("lancedb"))
            .await
            .expect("Failed to create vector store");
        let recordings = LanceRecordingStore::new(store, "recordings", DistanceMetric::L2);
        RecordingService::new(recordings, HashingEmbedder::new()).unwrap()
    }

    async fn ready_service(dir: &tempfile::TempDir) -> Service {
        let service = open_service(dir).await;
        assert_eq!(service.create_table().await.unwrap(), TableStatus::Created);
        service
    }

    fn rec(id: &str, transcript: &str, speaker: &str) -> NewRecording {
        NewRecording::new(id, transcript, "kokoro-82m", 2500).with_speaker(speaker)
    }

    #[tokio::test]
    async fn test_operations_before_create_report_table_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_service(&dir).await;

        let err = service.count_rows().await.unwrap_err();
        assert!(matches!(err, StoreError::TableNotFound(ref t) if t == "recordings"));

        let err = service
            .semantic_search("hello", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TableNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_table_twice_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recording(rec("gabgab-001", "turn on the lights", "user"))
            .await
            .unwrap();

        assert_eq!(service.create_table().await.unwrap(), TableStatus::Existing);
        assert_eq!(service.count_rows().await.unwrap(), 1);
        assert_eq!(service.schema_field_count().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_reset_table_empties_it() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recording(rec("gabgab-001", "turn on the lights", "user"))
            .await
            .unwrap();

        service.reset_table().await.unwrap();
        assert_eq!(service.count_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_and_read_back_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;

        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("mic"));
        let timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

        let stored = service
            .insert_recording(
                rec("gabgab-001", "Generate a daily briefing", "user")
                    .with_audio(vec![0x52, 0x49, 0x46, 0x46])
                    .with_timestamp(timestamp)
                    .with_metadata(metadata.clone()),
            )
            .await
            .unwrap();

        let rows = service.store().scan(None).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row, &stored);
        assert_eq!(row.timestamp.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(row.audio_bytes.as_deref(), Some(&[0x52, 0x49, 0x46, 0x46][..]));
        assert_eq!(row.metadata_map().unwrap(), Some(metadata));
        assert_eq!(row.embedding.len(), 384);
    }

    #[tokio::test]
    async fn test_exact_self_match_has_zero_distance() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        let transcript = "Remind me about the dentist appointment at 3 PM";
        service
            .insert_recordings(vec![
                rec("gabgab-002", transcript, "user"),
                rec("gabgab-003", "The weather forecast shows rain", "system"),
            ])
            .await
            .unwrap();

        let hits = service
            .semantic_search(transcript, &SearchOptions::default().with_limit(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].recording.id, "gabgab-002");
        assert!(hits[0].distance.abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_post_filter_and_pre_filter() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recordings(vec![
                rec("sys-near", "system status report", "system"),
                rec("user-1", "system status report one", "user"),
                rec("user-2", "system status report two", "user"),
                rec("user-3", "system status report three", "user"),
                rec("user-4", "system status report four", "user"),
                rec("user-5", "system status report five", "user"),
                rec("sys-far", "xylophone quartz", "system"),
            ])
            .await
            .unwrap();

        let post = SearchOptions::default().with_limit(5).with_speaker("system");
        let hits = service
            .semantic_search("system status report", &post)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].recording.id, "sys-near");

        let pre = post.with_filter_mode(FilterMode::PreFilter);
        let hits = service
            .semantic_search("system status report", &pre)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.recording.speaker.as_deref() == Some("system")));
    }

    #[tokio::test]
    async fn test_empty_speaker_filter_matches_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recording(rec("gabgab-001", "turn on the lights", "user"))
            .await
            .unwrap();

        for mode in [FilterMode::PostFilter, FilterMode::PreFilter] {
            let options = SearchOptions::default().with_speaker("").with_filter_mode(mode);
            let hits = service.semantic_search("lights", &options).await.unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].recording.id, "gabgab-001");
        }
    }

    #[tokio::test]
    async fn test_evolve_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recordings(vec![
                rec("gabgab-001", "turn on the lights", "user"),
                rec("gabgab-002", "weather forecast", "system"),
            ])
            .await
            .unwrap();
        let before = service.version().await.unwrap();

        let version = service
            .evolve_schema(&[
                ExtraColumn::new("quality_score", ColumnType::Float),
                ExtraColumn::new("processing_time_ms", ColumnType::Int),
            ])
            .await
            .unwrap();
        assert!(version > before);
        assert_eq!(service.schema_field_count().await.unwrap(), 11);
        assert_eq!(service.count_rows().await.unwrap(), 2);

        let rows = service.store().scan(None).await.unwrap();
        assert!(rows.iter().all(|r| r.extra.get("quality_score") == Some(&ColumnValue::Null)));

        let updated = service
            .conditional_update(
                &Predicate::is_null("quality_score"),
                &[
                    ("quality_score".to_string(), ColumnValue::Float(3.8)),
                    ("processing_time_ms".to_string(), ColumnValue::Int(120)),
                ],
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let rows = service.store().scan(None).await.unwrap();
        assert!(rows.iter().all(|r| r.extra.get("quality_score") == Some(&ColumnValue::Float(3.8))));
        assert!(rows.iter().all(|r| r.extra.get("processing_time_ms") == Some(&ColumnValue::Int(120))));

        // New rows may carry values for the evolved columns.
        let stored = service
            .insert_recording(rec("gabgab-003", "play jazz music", "user").with_extra("quality_score", 4.5))
            .await
            .unwrap();
        let rows = service
            .store()
            .scan(Some(&Predicate::eq("id", "gabgab-003")))
            .await
            .unwrap();
        assert_eq!(rows[0].extra.get("quality_score"), stored.extra.get("quality_score"));
        assert_eq!(rows[0].extra.get("processing_time_ms"), Some(&ColumnValue::Null));
    }

    #[tokio::test]
    async fn test_update_with_no_matches_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recording(rec("gabgab-001", "turn on the lights", "user"))
            .await
            .unwrap();
        let version = service.version().await.unwrap();

        let updated = service
            .conditional_update(
                &Predicate::eq("speaker", "nobody"),
                &[("speaker".to_string(), ColumnValue::from("someone"))],
            )
            .await
            .unwrap();
        assert_eq!(updated, 0);
        assert_eq!(service.version().await.unwrap(), version);
    }

    #[tokio::test]
    async fn test_count_by_model_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recordings(vec![
                NewRecording::new("gabgab-003", "The weather forecast shows rain", "lfm2.5", 4200),
                NewRecording::new("gabgab-004", "Schedule a team meeting", "kokoro-82m", 3100),
            ])
            .await
            .unwrap();

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.row_count, 2);
        assert_eq!(stats.field_count, 9);
        assert_eq!(stats.recordings_by_model.get("lfm2.5"), Some(&1));
        assert_eq!(stats.recordings_by_model.get("kokoro-82m"), Some(&1));
    }

    #[tokio::test]
    async fn test_column_values_reads_one_column() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recordings(vec![
                NewRecording::new("gabgab-003", "The weather forecast shows rain", "lfm2.5", 4200),
                NewRecording::new("gabgab-004", "Schedule a team meeting", "kokoro-82m", 3100),
            ])
            .await
            .unwrap();

        let mut models = service.store().column_values("model").await.unwrap();
        models.sort_by_key(|v| v.to_string());
        assert_eq!(
            models,
            vec![ColumnValue::from("kokoro-82m"), ColumnValue::from("lfm2.5")]
        );

        let durations = service.store().column_values("duration_ms").await.unwrap();
        assert_eq!(durations.len(), 2);
        assert!(durations.contains(&ColumnValue::Int(4200)));
    }

    #[tokio::test]
    async fn test_evolve_rejects_reserved_column_names() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;

        let err = service
            .evolve_schema(&[ExtraColumn::new("_note", ColumnType::Text)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch(_)));
        assert_eq!(service.schema_field_count().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_restore_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let service = ready_service(&dir).await;
        service
            .insert_recording(rec("gabgab-001", "turn on the lights", "user"))
            .await
            .unwrap();
        let one_row = service.version().await.unwrap();
        service
            .insert_recording(rec("gabgab-002", "play jazz music", "user"))
            .await
            .unwrap();

        let latest = service.restore_version(one_row).await.unwrap();
        assert!(latest > one_row);
        assert_eq!(service.count_rows().await.unwrap(), 1);
    }

    #[test]
    fn test_record_batch_rejects_unknown_extra_column() {
        let row = NewRecording::new("gabgab-001", "hello", "kokoro-82m", 10)
            .with_extra("nope", 1_i64)
            .into_recording(vec![0.0; 384], Utc::now())
            .unwrap();
        let err = build_record_batch(Arc::new(recordings_schema()), &[row]).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch(_)));
    }

    #[test]
    fn test_record_batch_roundtrip_without_distance() {
        let row = NewRecording::new("gabgab-001", "hello", "kokoro-82m", 10)
            .with_speaker("user")
            .into_recording(vec![0.5; 384], Utc::now())
            .unwrap();
        let batch = build_record_batch(Arc::new(recordings_schema()), std::slice::from_ref(&row)).unwrap();
        let parsed = record_batch_to_recordings(&batch).unwrap();
        assert_eq!(parsed, vec![row]);
    }
}
