use thiserror::Error;

/// Errors surfaced by the recording store and its collaborators.
///
/// Every error is returned to the direct caller; nothing is retried.
/// A conditional update that matches zero rows is not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage path inaccessible or embedding function unavailable.
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The embedding function rejected the text or produced a bad vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// A row or column does not conform to the table schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_not_found_display() {
        let err = StoreError::TableNotFound("recordings".to_string());
        assert_eq!(err.to_string(), "table 'recordings' not found");
    }

    #[test]
    fn test_embedding_error_display() {
        let err = StoreError::Embedding("text is empty".to_string());
        assert_eq!(err.to_string(), "embedding failed: text is empty");
    }

    #[test]
    fn test_schema_mismatch_display() {
        let err = StoreError::SchemaMismatch("column 'foo' already exists".to_string());
        assert!(err.to_string().contains("foo"));
    }
}
