//! CLI for the mdq download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mdq_core::config;
use mdq_core::job::AudioFormat;
use std::path::PathBuf;

use commands::{run_get, run_trim};

/// Top-level CLI for the mdq music download manager.
#[derive(Debug, Parser)]
#[command(name = "mdq")]
#[command(about = "mdq: concurrent music download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs, streaming progress until all finish.
    Get {
        /// Source URLs, handed to the external fetcher as-is.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Audio format: best, opus, m4a, or flac.
        #[arg(long, default_value = "best")]
        format: String,

        /// Run up to N downloads concurrently (default from config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Destination directory (default: config download_dir, else the
        /// current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Trim leading/trailing silence from an existing audio file.
    Trim {
        /// Path to the audio file (replaced in place on success).
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                format,
                jobs,
                out,
            } => {
                let format = AudioFormat::from_str(&format)
                    .ok_or_else(|| anyhow::anyhow!("unknown format: {format}"))?;
                run_get(&cfg, &urls, format, jobs, out).await?;
            }
            CliCommand::Trim { path } => run_trim(&cfg, &path).await?,
        }

        Ok(())
    }
}
