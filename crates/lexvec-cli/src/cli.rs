//! CLI argument parsing for lexvec.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lexvec_types::GenerationMode;

/// Embedding generation for Arabic/English legal text chunks
#[derive(Parser, Debug)]
#[command(name = "lexvec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/lexvec/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which chunks a run selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Only chunks without a vector
    Pending,
    /// Every chunk, overwriting existing vectors
    All,
}

impl From<ModeArg> for GenerationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Pending => GenerationMode::Pending,
            ModeArg::All => GenerationMode::All,
        }
    }
}

/// lexvec commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate embeddings for stored chunks
    Generate {
        /// Run mode
        #[arg(short, long, value_enum, default_value = "pending")]
        mode: ModeArg,

        /// Model identifier (see `lexvec models`); defaults to the configured model
        #[arg(long)]
        model: Option<String>,

        /// Chunks per persisted batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show embedding completion for the store
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check stored vectors for dimension, degeneracy and codec problems
    Audit {
        /// Audit a random sample of this many vectors (0 = all)
        #[arg(short, long)]
        sample: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the registered embedding models
    Models,

    /// Import chunks from a newline-delimited JSON file
    Import {
        /// File with one chunk object per line
        path: PathBuf,
    },

    /// Remove every stored vector and the established dimension
    ClearVectors {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}
