//! Application state wiring the recording service for CLI commands.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use gabgab_infra::config::load_global_config;
use gabgab_infra::filesystem::resolve_data_dir;
use gabgab_infra::{open_recording_service, GabGabService};
use gabgab_types::config::{EmbedderKind, GlobalConfig};

/// Shared state for one CLI invocation.
pub struct AppState {
    pub service: GabGabService,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load `config.toml` and open the service.
    ///
    /// Shows a spinner while the embedding model loads unless `quiet`.
    pub async fn init(data_dir: Option<PathBuf>, quiet: bool) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;

        let spinner = (!quiet && config.embedder.kind == EmbedderKind::Fastembed).then(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                spinner.set_style(style);
            }
            spinner.set_message(format!("Loading embedding model {}...", config.embedder.model));
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });

        let service = open_recording_service(&config, &data_dir).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        Ok(Self {
            service: service?,
            config,
            data_dir,
        })
    }

    pub fn close(self) {
        self.service.close();
    }
}
