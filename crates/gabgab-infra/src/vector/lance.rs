//! LanceDB connection wrapper for table lifecycle operations.
//!
//! `LanceVectorStore` wraps a `lancedb::Connection` rooted at a filesystem
//! path and offers open/create/drop helpers using Arrow schemas. Recording
//! semantics live in [`super::recordings`].

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::Schema;

/// LanceDB connection rooted at a single directory.
pub struct LanceVectorStore {
    db: lancedb::Connection,
}

impl LanceVectorStore {
    /// Open or create a LanceDB database at the given path.
    ///
    /// Creates the directory if it does not exist.
    pub async fn new(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        std::fs::create_dir_all(&base_path).map_err(|e| lancedb::Error::CreateDir {
            path: base_path.display().to_string(),
            source: e,
        })?;

        let uri = base_path
            .to_str()
            .ok_or_else(|| lancedb::Error::InvalidInput {
                message: format!("Path contains invalid UTF-8: {}", base_path.display()),
            })?;

        let db = lancedb::connect(uri).execute().await?;
        tracing::debug!(path = %base_path.display(), "Opened LanceDB connection");

        Ok(Self { db })
    }

    /// Open a table, or `None` if it does not exist.
    pub async fn open_table(&self, table_name: &str) -> Result<Option<lancedb::Table>, lancedb::Error> {
        match self.db.open_table(table_name).execute().await {
            Ok(table) => Ok(Some(table)),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create an empty table with the given schema.
    pub async fn create_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, lancedb::Error> {
        self.db.create_empty_table(table_name, schema).execute().await
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, lancedb::Error> {
        Ok(self.table_names().await?.iter().any(|n| n == table_name))
    }

    /// Drop a table from the database.
    ///
    /// Returns Ok(()) even if the table does not exist (idempotent).
    pub async fn drop_table(&self, table_name: &str) -> Result<(), lancedb::Error> {
        match self.db.drop_table(table_name, &[]).await {
            Ok(()) => Ok(()),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn table_names(&self) -> Result<Vec<String>, lancedb::Error> {
        self.db.table_names().execute().await
    }
}
