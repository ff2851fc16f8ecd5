//! Recording store trait.
//!
//! The storage collaborator behind the facade: persistence, vector search,
//! versioning and update predicates for a single recordings table.
//! Implementations (LanceDB) live in gabgab-infra.

use gabgab_types::column::{ColumnInfo, ColumnValue, ExtraColumn};
use gabgab_types::error::StoreError;
use gabgab_types::predicate::Predicate;
use gabgab_types::recording::Recording;

/// Trait for a vector-indexed recordings table.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Every method except `table_exists`, `create_table` and `recreate_table`
/// fails with [`StoreError::TableNotFound`] when the table is absent.
pub trait RecordingStore: Send + Sync {
    /// Name of the table this store operates on.
    fn table_name(&self) -> &str;

    fn table_exists(&self) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Create the table, empty, with the base recording schema.
    fn create_table(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Destroy any existing table and create it again, empty.
    fn recreate_table(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Append rows in a single write. Rows are written against the table's
    /// current schema; evolved columns missing from a row are stored as null.
    fn append(
        &self,
        rows: &[Recording],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Nearest neighbors of `query` on the embedding column, closest first,
    /// with the store-reported distance. `filter` restricts the candidates
    /// before the top `limit` are chosen.
    fn nearest(
        &self,
        query: &[f32],
        limit: usize,
        filter: Option<&Predicate>,
    ) -> impl std::future::Future<Output = Result<Vec<(Recording, f32)>, StoreError>> + Send;

    /// All rows matching `filter` (or all rows), in storage order.
    fn scan(
        &self,
        filter: Option<&Predicate>,
    ) -> impl std::future::Future<Output = Result<Vec<Recording>, StoreError>> + Send;

    /// Values of a single column for every row, in storage order. Only that
    /// column is read.
    fn column_values(
        &self,
        column: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ColumnValue>, StoreError>> + Send;

    /// Columns of the live table schema, in schema order.
    fn columns(&self) -> impl std::future::Future<Output = Result<Vec<ColumnInfo>, StoreError>> + Send;

    /// Append nullable columns in place. Existing rows read back as null.
    fn add_columns(
        &self,
        columns: &[ExtraColumn],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Assign `values` on every row matching `predicate`.
    /// Returns the number of rows updated (possibly zero).
    fn update_where(
        &self,
        predicate: &Predicate,
        values: &[(String, ColumnValue)],
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    fn count_rows(
        &self,
        filter: Option<&Predicate>,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Current table version. Every write produces a new version.
    fn version(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Make the contents of `version` the latest version of the table.
    fn restore(&self, version: u64) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
