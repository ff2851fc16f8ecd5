//! Global configuration loader for GabGab.
//!
//! Reads `config.toml` from the data directory (`~/.gabgab/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use gabgab_types::config::GlobalConfig;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Directory of the LanceDB database.
///
/// Relative `storage_path` values are resolved against the data directory.
pub fn resolve_storage_path(config: &GlobalConfig, data_dir: &Path) -> PathBuf {
    match &config.storage_path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => data_dir.join(path),
        None => data_dir.join("lancedb"),
    }
}

/// Where downloaded embedding models are cached unless configured.
pub fn default_model_cache_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("models")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gabgab_types::config::{DistanceMetric, EmbedderKind};
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
table_name = "voice_clips"

[embedder]
kind = "hashing"

[search]
default_limit = 10
distance = "cosine"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.table_name, "voice_clips");
        assert_eq!(config.embedder.kind, EmbedderKind::Hashing);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.search.distance, DistanceMetric::Cosine);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config, GlobalConfig::default());
    }

    #[test]
    fn resolve_storage_path_variants() {
        let data_dir = PathBuf::from("/home/user/.gabgab");
        let mut config = GlobalConfig::default();
        assert_eq!(
            resolve_storage_path(&config, &data_dir),
            PathBuf::from("/home/user/.gabgab/lancedb")
        );

        config.storage_path = Some(PathBuf::from("db"));
        assert_eq!(
            resolve_storage_path(&config, &data_dir),
            PathBuf::from("/home/user/.gabgab/db")
        );

        config.storage_path = Some(PathBuf::from("/var/lib/gabgab"));
        assert_eq!(
            resolve_storage_path(&config, &data_dir),
            PathBuf::from("/var/lib/gabgab")
        );
    }
}
