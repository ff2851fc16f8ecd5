//! Infrastructure layer for GabGab.
//!
//! Contains the LanceDB implementation of `RecordingStore`, the fastembed
//! embedder, config file loading and data directory resolution, plus
//! [`open_recording_service`] which wires them into a ready facade.

pub mod config;
pub mod filesystem;
pub mod vector;

use std::path::Path;

use gabgab_core::embedding::{BoxEmbedder, HashingEmbedder};
use gabgab_core::service::RecordingService;
use gabgab_types::config::{EmbedderKind, GlobalConfig};
use gabgab_types::error::StoreError;

use crate::config::{default_model_cache_dir, resolve_storage_path};
use crate::vector::embedder::FastEmbedder;
use crate::vector::lance::LanceVectorStore;
use crate::vector::recordings::LanceRecordingStore;

/// The facade as wired in production: LanceDB storage with a configured embedder.
pub type GabGabService = RecordingService<LanceRecordingStore, BoxEmbedder>;

/// Connect to the configured database and load the configured embedder.
///
/// Does not create the recordings table; call `create_table` for that.
pub async fn open_recording_service(
    config: &GlobalConfig,
    data_dir: &Path,
) -> Result<GabGabService, StoreError> {
    let storage_path = resolve_storage_path(config, data_dir);
    let vector_store = LanceVectorStore::new(storage_path.clone())
        .await
        .map_err(|e| {
            StoreError::Initialization(format!(
                "failed to open database at {}: {e}",
                storage_path.display()
            ))
        })?;

    let store = LanceRecordingStore::new(
        vector_store,
        config.table_name.clone(),
        config.search.distance,
    );

    let embedder = match config.embedder.kind {
        EmbedderKind::Fastembed => BoxEmbedder::new(FastEmbedder::new(
            &config.embedder,
            default_model_cache_dir(data_dir),
        )?),
        EmbedderKind::Hashing => BoxEmbedder::new(HashingEmbedder::new()),
    };

    tracing::debug!(
        storage = %storage_path.display(),
        table = %config.table_name,
        embedder = ?embedder,
        "Recording service ready"
    );

    RecordingService::new(store, embedder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gabgab_core::embedding::Embedder;
    use gabgab_types::recording::{NewRecording, SearchOptions};

    fn hashing_config() -> GlobalConfig {
        let mut config = GlobalConfig::default();
        config.embedder.kind = EmbedderKind::Hashing;
        config
    }

    #[tokio::test]
    async fn test_open_service_with_hashing_embedder() {
        let tmp = tempfile::tempdir().unwrap();
        let service = open_recording_service(&hashing_config(), tmp.path())
            .await
            .unwrap();

        assert!(tmp.path().join("lancedb").is_dir());
        assert_eq!(service.embedder().dimension(), 384);

        service.create_table().await.unwrap();
        service
            .insert_recording(NewRecording::new(
                "gabgab-001",
                "Turn on the living room lights",
                "kokoro-82m",
                2500,
            ))
            .await
            .unwrap();

        let hits = service
            .semantic_search("living room lights", &SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(hits[0].recording.id, "gabgab-001");
        service.close();
    }

    #[tokio::test]
    async fn test_reopen_sees_persisted_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let config = hashing_config();

        let service = open_recording_service(&config, tmp.path()).await.unwrap();
        service.create_table().await.unwrap();
        service
            .insert_recording(NewRecording::new("gabgab-001", "hello", "lfm2.5", 900))
            .await
            .unwrap();
        service.close();

        let reopened = open_recording_service(&config, tmp.path()).await.unwrap();
        assert_eq!(reopened.count_rows().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_model_fails_initialization() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = GlobalConfig::default();
        config.embedder.model = "not-a-model".to_string();

        let result = open_recording_service(&config, tmp.path()).await;
        assert!(matches!(result, Err(StoreError::Initialization(_))));
    }
}
