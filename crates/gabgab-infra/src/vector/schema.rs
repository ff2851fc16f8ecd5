//! Arrow schema for the LanceDB recordings table.
//!
//! The base schema has nine fields; schema evolution appends nullable
//! scalar fields after them. Arrow versions MUST match lancedb's
//! transitive dependency (57.3 for lancedb 0.26).

use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, TimeUnit};

use gabgab_types::column::{ColumnInfo, ColumnType, ExtraColumn};
use gabgab_types::recording::EMBEDDING_DIMENSION;

/// Schema of a freshly created recordings table.
pub fn recordings_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        Field::new("audio_bytes", DataType::Binary, true),
        Field::new("transcript", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                EMBEDDING_DIMENSION as i32,
            ),
            false,
        ),
        Field::new("model", DataType::Utf8, false),
        Field::new("duration_ms", DataType::Int32, false),
        Field::new("speaker", DataType::Utf8, true),
        Field::new("metadata", DataType::Utf8, true),
    ])
}

/// Arrow type used to store an evolved column.
pub fn data_type_for(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Text => DataType::Utf8,
        ColumnType::Int => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
    }
}

/// Scalar column type of an Arrow type, if it can take a literal value.
pub fn column_type_of(data_type: &DataType) -> Option<ColumnType> {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 => Some(ColumnType::Text),
        DataType::Int32 | DataType::Int64 => Some(ColumnType::Int),
        DataType::Float32 | DataType::Float64 => Some(ColumnType::Float),
        DataType::Boolean => Some(ColumnType::Bool),
        _ => None,
    }
}

/// Nullable fields for columns added by schema evolution.
pub fn extra_columns_schema(columns: &[ExtraColumn]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|c| Field::new(&c.name, data_type_for(c.column_type), true))
            .collect::<Vec<_>>(),
    )
}

pub fn column_infos(schema: &Schema) -> Vec<ColumnInfo> {
    schema
        .fields()
        .iter()
        .map(|f| ColumnInfo {
            name: f.name().clone(),
            column_type: column_type_of(f.data_type()),
            nullable: f.is_nullable(),
        })
        .collect()
}
