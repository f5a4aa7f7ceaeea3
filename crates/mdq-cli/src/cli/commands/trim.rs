//! `mdq trim <path>` – run the silence trim pass on an existing file.

use anyhow::Result;
use std::path::Path;

use mdq_core::config::MdqConfig;
use mdq_core::postprocess;

pub async fn run_trim(cfg: &MdqConfig, path: &Path) -> Result<()> {
    let opts = cfg.trim.clone().unwrap_or_default();
    postprocess::trim_silence(path, &cfg.transcoder_path, &opts).await?;
    println!("Trimmed silence: {}", path.display());
    Ok(())
}
