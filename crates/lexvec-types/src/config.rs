//! Configuration loading for lexvec.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/lexvec/config.toml.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LexvecError;
use crate::model::ModelId;

/// Batch generation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Chunks per persisted batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Texts per forward pass inside the encoder.
    /// Efficiency only; never changes output values.
    #[serde(default = "default_encode_batch_width")]
    pub encode_batch_width: usize,

    /// Consecutive failed batch commits tolerated before the run is aborted
    /// as a storage outage.
    #[serde(default = "default_max_consecutive_persist_failures")]
    pub max_consecutive_persist_failures: usize,
}

fn default_batch_size() -> usize {
    64
}

fn default_encode_batch_width() -> usize {
    32
}

fn default_max_consecutive_persist_failures() -> usize {
    3
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            encode_batch_width: default_encode_batch_width(),
            max_consecutive_persist_failures: default_max_consecutive_persist_failures(),
        }
    }
}

impl GenerationConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.encode_batch_width == 0 {
            return Err("encode_batch_width must be > 0".to_string());
        }
        if self.max_consecutive_persist_failures == 0 {
            return Err("max_consecutive_persist_failures must be > 0".to_string());
        }
        Ok(())
    }
}

/// Quality audit settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Number of vectors to sample (0 = audit every vector)
    #[serde(default)]
    pub sample_size: usize,
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Directory where downloaded model files are cached
    #[serde(default = "default_model_cache_dir")]
    pub model_cache_dir: String,

    /// Model used when the CLI does not name one
    #[serde(default)]
    pub default_model: ModelId,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Batch generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Quality audit settings
    #[serde(default)]
    pub audit: AuditSettings,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "lexvec")
}

fn default_db_path() -> String {
    project_dirs()
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_model_cache_dir() -> String {
    project_dirs()
        .map(|p| p.cache_dir().join("models"))
        .unwrap_or_else(|| PathBuf::from("./.cache/models"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            model_cache_dir: default_model_cache_dir(),
            default_model: ModelId::default(),
            log_level: default_log_level(),
            generation: GenerationConfig::default(),
            audit: AuditSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/lexvec/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (LEXVEC_*, nested keys joined with `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, LexvecError> {
        let config_dir = project_dirs()
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default("model_cache_dir", default_model_cache_dir())
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default("default_model", ModelId::default().as_str())
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default("generation.batch_size", default_batch_size() as i64)
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default(
                "generation.encode_batch_width",
                default_encode_batch_width() as i64,
            )
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default(
                "generation.max_consecutive_persist_failures",
                default_max_consecutive_persist_failures() as i64,
            )
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .set_default("audit.sample_size", 0i64)
            .map_err(|e| LexvecError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: LEXVEC_DB_PATH, LEXVEC_GENERATION__BATCH_SIZE, etc.
        builder = builder.add_source(
            Environment::with_prefix("LEXVEC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| LexvecError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| LexvecError::Config(e.to_string()))?;

        settings.generation.validate().map_err(LexvecError::Config)?;
        Ok(settings)
    }

    /// Expand ~ in db_path to the user's home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    /// Expand ~ in model_cache_dir to the user's home directory
    pub fn expanded_model_cache_dir(&self) -> PathBuf {
        expand_home(&self.model_cache_dir)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
