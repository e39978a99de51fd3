//! lexvec
//!
//! Embedding generation for Arabic/English legal text chunks.
//!
//! # Usage
//!
//! ```bash
//! lexvec import chunks.jsonl
//! lexvec generate [--mode pending|all] [--model ID] [--batch-size N]
//! lexvec status
//! lexvec audit [--sample N]
//! lexvec models
//! lexvec clear-vectors --yes
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/lexvec/config.toml)
//! 3. Environment variables (LEXVEC_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use lexvec_cli::{
    handle_audit, handle_clear_vectors, handle_generate, handle_import, init_logging,
    list_models, load_settings, show_status, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Models = cli.command {
        list_models();
        return Ok(());
    }

    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Generate {
            mode,
            model,
            batch_size,
            json,
        } => {
            handle_generate(&settings, mode.into(), model.as_deref(), batch_size, json).await?;
        }
        Commands::Status { json } => {
            show_status(&settings, json)?;
        }
        Commands::Audit { sample, json } => {
            let report = handle_audit(&settings, sample, json)?;
            if !report.is_clean() {
                anyhow::bail!("Audit flagged {} vectors", report.findings.len());
            }
        }
        Commands::Models => list_models(),
        Commands::Import { path } => {
            handle_import(&settings, &path)?;
        }
        Commands::ClearVectors { yes } => {
            handle_clear_vectors(&settings, yes)?;
        }
    }

    Ok(())
}
