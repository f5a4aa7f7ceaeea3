//! Global configuration loaded from `~/.config/mdq/config.toml`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::fetcher::DEFAULT_FETCHER;
use crate::postprocess::{TrimOptions, DEFAULT_TRANSCODER};
use crate::queue::DEFAULT_MAX_CONCURRENT;
use crate::resolver::DEFAULT_RECENCY_WINDOW;

/// Global configuration. A default file is written on first run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdqConfig {
    /// Maximum number of downloads running at once.
    pub max_concurrent_downloads: usize,
    /// External fetcher binary (path or name resolved via `PATH`).
    pub fetcher_path: String,
    /// External transcoder binary used for post-processing.
    pub transcoder_path: String,
    /// Directory downloads land in; `None` = current directory at submit time.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Seconds within which a freshly modified file in the destination
    /// directory is attributed to a just-completed job.
    pub resolver_recency_secs: u64,
    /// Whether to run the silence trim after each successful download.
    pub trim_silence: bool,
    /// Optional trim tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub trim: Option<TrimOptions>,
}

impl Default for MdqConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT,
            fetcher_path: DEFAULT_FETCHER.to_string(),
            transcoder_path: DEFAULT_TRANSCODER.to_string(),
            download_dir: None,
            resolver_recency_secs: DEFAULT_RECENCY_WINDOW.as_secs(),
            trim_silence: true,
            trim: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MdqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MdqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MdqConfig = toml::from_str(&data)?;
    Ok(cfg)
}
