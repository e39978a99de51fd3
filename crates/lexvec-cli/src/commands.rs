//! Command implementations.
//!
//! Handles:
//! - Settings resolution and logging setup
//! - Generation runs on a blocking thread with signal-driven cancellation
//! - Status, audit, model listing, chunk import and vector clearing

use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lexvec_embeddings::{CandleLoader, Encoder, ModelCache};
use lexvec_indexing::{
    AuditReport, AuditScope, BatchOrchestrator, OrchestratorConfig, QualityChecker, RunCheckpoint,
    RunReport, RunRequest, RunStatus,
};
use lexvec_storage::{Storage, StoreStatus};
use lexvec_types::{resolve, Chunk, GenerationMode, ModelId, Settings};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the configured store, creating parent directories if needed.
pub fn open_storage(settings: &Settings) -> Result<Arc<Storage>> {
    let db_path = settings.expanded_db_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let storage = Storage::open(&db_path)
        .with_context(|| format!("Failed to open storage at {:?}", db_path))?;
    Ok(Arc::new(storage))
}

/// Run a generation pass with the production Candle loader.
///
/// The model identifier is resolved before the store is opened or any model
/// file is touched. Ctrl+C or SIGTERM stops the run after the batch in
/// flight has been committed.
pub async fn handle_generate(
    settings: &Settings,
    mode: GenerationMode,
    model: Option<&str>,
    batch_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let model_id = match model {
        Some(name) => resolve(name)?.id,
        None => settings.default_model,
    };
    let request = RunRequest::new(mode, model_id)
        .with_batch_size(batch_size.unwrap_or(settings.generation.batch_size));

    let storage = open_storage(settings)?;
    let loader = CandleLoader::new(ModelCache::new(settings.expanded_model_cache_dir()));
    let encoder = Encoder::with_batch_width(loader, settings.generation.encode_batch_width);
    let config = OrchestratorConfig::from(&settings.generation);

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let run_cancel = cancel.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut orchestrator = BatchOrchestrator::new(storage, encoder, config);
        orchestrator.run(&request, &run_cancel)
    })
    .await
    .context("Generation task panicked")?;
    signal_task.abort();

    let report = result.context("Generation run failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    report.into_result()?;
    Ok(())
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping after the current batch...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping after the current batch...");
        }
    }
    cancel.cancel();
}

/// Print a run report for humans.
pub fn print_report(report: &RunReport) {
    println!("Run: {} with {} ({})", report.mode, report.model, report.status.label());
    println!("  Selected:   {}", report.selected);
    println!("  Processed:  {}", report.processed);
    println!("  Failed:     {}", report.failed);
    println!(
        "  Batches:    {} ok, {} failed, {} planned",
        report.batches_succeeded, report.batches_failed, report.batches_total
    );
    println!(
        "  Elapsed:    {} ms ({:.1} vectors/s)",
        report.elapsed_ms, report.throughput_per_sec
    );
    match &report.status {
        RunStatus::Completed => {}
        RunStatus::Cancelled { batches_completed } => {
            println!("  Cancelled after {} batches", batches_completed);
        }
        RunStatus::Failed(failure) => {
            println!("  Failure:    {:?}", failure);
        }
    }
    for failure in &report.failures {
        println!("  - {} [{:?}] {}", failure.chunk_id, failure.kind, failure.reason);
    }
}

/// Show completion counts and the last run.
pub fn show_status(settings: &Settings, json: bool) -> Result<()> {
    let storage = open_storage(settings)?;
    let status = storage.status().context("Failed to read store status")?;
    let last_run = RunCheckpoint::load(storage.as_ref())?;

    if json {
        let out = serde_json::json!({ "store": status, "last_run": last_run });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_status(&status, last_run.as_ref());
    }
    Ok(())
}

fn print_status(status: &StoreStatus, last_run: Option<&RunCheckpoint>) {
    println!("Chunks:         {}", status.total_chunks);
    println!("With vector:    {}", status.with_vector);
    println!("Without vector: {}", status.without_vector);
    println!("Completion:     {:.1}%", status.completion_pct);
    match &status.established {
        Some(dim) => println!("Dimension:      {} (established by {})", dim.dimension, dim.model),
        None => println!("Dimension:      not established"),
    }
    if let Some(run) = last_run {
        println!(
            "Last run:       {} with {} at {}: {} ({} processed, {} failed)",
            run.mode,
            run.model,
            run.finished_at.to_rfc3339(),
            run.status.label(),
            run.processed,
            run.failed
        );
    }
}

/// Audit stored vectors and print the findings.
pub fn handle_audit(settings: &Settings, sample: Option<usize>, json: bool) -> Result<AuditReport> {
    let storage = open_storage(settings)?;
    let scope = AuditScope::from_sample_size(sample.unwrap_or(settings.audit.sample_size));
    let report = QualityChecker::new(storage).audit(scope)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Checked {} of {} vectors{}",
            report.checked,
            report.total_vectors,
            report
                .established_dimension
                .map(|d| format!(" (dimension {})", d))
                .unwrap_or_default()
        );
        println!("  Dimension mismatches: {}", report.dimension_mismatches);
        println!("  Zero vectors:         {}", report.zero_vectors);
        println!("  Non-finite values:    {}", report.non_finite);
        println!("  Round-trip failures:  {}", report.round_trip_failures);
        for finding in &report.findings {
            println!("  - {}: {:?}", finding.chunk_id, finding.issues);
        }
    }
    Ok(report)
}

/// List registered models.
pub fn list_models() {
    println!("{:<22} {:>5} {:>8}  {:<13} REPOSITORY", "ID", "DIM", "MAX_SEQ", "LANGUAGE");
    for id in ModelId::ALL {
        let d = id.descriptor();
        println!(
            "{:<22} {:>5} {:>8}  {:<13} {}",
            d.id.as_str(),
            d.dimension,
            d.max_sequence_length,
            d.specialization.to_string(),
            d.repo_id
        );
    }
}

/// One line of an import file
#[derive(Debug, Deserialize)]
struct ImportRecord {
    #[serde(default)]
    chunk_id: Option<String>,
    document_id: String,
    #[serde(default)]
    content: Option<String>,
}

/// Counts from an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub created: usize,
    pub existing: usize,
}

/// Import newline-delimited JSON chunk records. Lines without a `chunk_id`
/// get a fresh ULID. Blank lines are skipped.
pub fn import_chunks<R: BufRead>(storage: &Storage, reader: R) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ImportRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid chunk record on line {}", index + 1))?;

        let chunk_id = record
            .chunk_id
            .unwrap_or_else(|| ulid::Ulid::new().to_string());
        let mut chunk = Chunk::without_content(chunk_id, record.document_id);
        chunk.content = record.content;

        summary.read += 1;
        if storage
            .put_chunk(&chunk)
            .with_context(|| format!("Failed to store chunk from line {}", index + 1))?
        {
            summary.created += 1;
        } else {
            summary.existing += 1;
        }
    }
    info!(
        read = summary.read,
        created = summary.created,
        existing = summary.existing,
        "Import complete"
    );
    Ok(summary)
}

/// Import chunks from a file.
pub fn handle_import(settings: &Settings, path: &Path) -> Result<ImportSummary> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let storage = open_storage(settings)?;
    let summary = import_chunks(&storage, std::io::BufReader::new(file))?;
    println!(
        "Imported {} chunks ({} new, {} already present)",
        summary.read, summary.created, summary.existing
    );
    Ok(summary)
}

/// Remove every vector. Requires explicit confirmation.
pub fn handle_clear_vectors(settings: &Settings, yes: bool) -> Result<usize> {
    if !yes {
        anyhow::bail!("Refusing to delete all vectors without --yes");
    }
    let storage = open_storage(settings)?;
    let removed = storage.clear_vectors()?;
    println!("Removed {} vectors; every chunk is pending again", removed);
    Ok(removed)
}
