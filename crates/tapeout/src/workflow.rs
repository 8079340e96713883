//! Entry points used by transports (the CLI, or anything else driving the
//! pipeline)
//!
//! - [`discover_and_extract`]: latest completed run and its metrics
//! - [`generate_pending_draft`]: extraction, analysis and a new pending draft
//! - [`confirm_pending`]: publish the active draft and record the result
//!
//! "Nothing there" results are outcome variants, not errors. Errors are
//! reserved for store and collaborator failures, and a failed collaborator
//! never leaves a partially updated store behind.

use crate::collab::{AnalysisReport, Analyzer, CollaboratorError, Publisher};
use crate::report::render_readiness_report;
use crate::scout::{extract_metrics_detailed, find_latest_completed_run, ExtractionReport, RunCandidate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tapeout_db::{DbError, DraftDb};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Analysis failed: {0}")]
    Analysis(#[source] CollaboratorError),

    #[error("Publish failed: {0}")]
    Publish(#[source] CollaboratorError),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Cannot write metrics snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// The selected run and what was extracted from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedRun {
    pub run: RunCandidate,
    pub extraction: ExtractionReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Extracted(Box<ExtractedRun>),
    NoCompletedRun,
}

/// A freshly saved pending draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftSummary {
    pub post_id: i64,
    /// Pending drafts of the same design that this one cancelled.
    pub superseded: u64,
    pub extracted: ExtractedRun,
    pub analysis: AnalysisReport,
    /// Readiness report for display.
    pub report: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftOutcome {
    Drafted(Box<DraftSummary>),
    NoCompletedRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmOutcome {
    Published {
        post_id: i64,
        design_name: String,
        external_id: String,
        /// False when the draft was superseded while the publisher ran. The
        /// external publish still happened; the newer draft stays pending.
        recorded: bool,
    },
    NothingToConfirm,
}

/// Snapshot file contents: the metrics plus where and when they came from.
#[derive(Debug, Serialize)]
struct MetricsSnapshot<'a> {
    #[serde(flatten)]
    metrics: &'a crate::scout::MetricsRecord,
    run_path: &'a Path,
    extracted_at: DateTime<Utc>,
}

/// Find the latest completed run under `designs_root` and extract its
/// metrics. When `snapshot_path` is set, a fresh snapshot file is written.
pub async fn discover_and_extract(
    designs_root: &Path,
    snapshot_path: Option<&Path>,
) -> Result<ExtractOutcome> {
    let (outcome, snapshot) =
        locate_and_extract(designs_root.to_path_buf(), snapshot_path.map(Path::to_path_buf)).await?;
    snapshot?;
    Ok(outcome)
}

/// Extract the latest run, analyze it and save the result as the pending
/// draft of its design.
///
/// Analysis failure returns `Err` before anything is written to the store.
pub async fn generate_pending_draft(
    db: &DraftDb,
    analyzer: &dyn Analyzer,
    designs_root: &Path,
    snapshot_path: Option<&Path>,
) -> Result<DraftOutcome> {
    let (outcome, snapshot) =
        locate_and_extract(designs_root.to_path_buf(), snapshot_path.map(Path::to_path_buf)).await?;
    let extracted = match outcome {
        ExtractOutcome::Extracted(extracted) => *extracted,
        ExtractOutcome::NoCompletedRun => return Ok(DraftOutcome::NoCompletedRun),
    };
    // The draft does not depend on the snapshot.
    if let Err(err) = snapshot {
        warn!(error = %err, "Metrics snapshot not written");
    }

    let metrics = &extracted.extraction.metrics;
    let analysis = analyzer.analyze(metrics).await.map_err(|err| {
        error!(design = %metrics.design_name, error = %err, "Analysis failed");
        WorkflowError::Analysis(err)
    })?;

    let design_dir = extracted
        .run
        .path
        .parent()
        .and_then(Path::parent)
        .unwrap_or(extracted.run.path.as_path());
    db.upsert_design(
        &metrics.design_name,
        &design_dir.to_string_lossy(),
        &extracted.run.run_id,
    )
    .await?;

    let saved = db
        .save_pending(&metrics.design_name, &analysis.post_text, &analysis.readiness_score)
        .await?;

    let report = render_readiness_report(metrics, &analysis);
    Ok(DraftOutcome::Drafted(Box::new(DraftSummary {
        post_id: saved.post_id,
        superseded: saved.superseded,
        extracted,
        analysis,
        report,
    })))
}

/// Publish the active draft and record the publisher's identifier.
///
/// Reading the draft and recording the result are separate store calls; a
/// draft saved in between is left pending (see [`ConfirmOutcome`]).
pub async fn confirm_pending(db: &DraftDb, publisher: &dyn Publisher) -> Result<ConfirmOutcome> {
    let Some(draft) = db.get_latest_pending().await? else {
        info!("No pending draft to confirm");
        return Ok(ConfirmOutcome::NothingToConfirm);
    };

    let external_id = publisher.publish(&draft.content).await.map_err(|err| {
        error!(post_id = draft.id, design = %draft.design_name, error = %err, "Publish failed");
        WorkflowError::Publish(err)
    })?;

    let recorded = db.mark_published(draft.id, &external_id).await?;
    if !recorded {
        warn!(
            post_id = draft.id,
            external_id = %external_id,
            "Draft was superseded during publish; result not recorded"
        );
    }

    Ok(ConfirmOutcome::Published {
        post_id: draft.id,
        design_name: draft.design_name,
        external_id,
        recorded,
    })
}

/// Locate, extract and optionally snapshot on the blocking pool. The snapshot
/// result is returned separately so callers decide whether it is fatal.
async fn locate_and_extract(
    designs_root: PathBuf,
    snapshot_path: Option<PathBuf>,
) -> Result<(ExtractOutcome, Result<()>)> {
    tokio::task::spawn_blocking(move || {
        let Some(run) = find_latest_completed_run(&designs_root) else {
            return (ExtractOutcome::NoCompletedRun, Ok(()));
        };
        let extraction = extract_metrics_detailed(&run.path);
        let extracted = ExtractedRun { run, extraction };
        let snapshot = match &snapshot_path {
            Some(path) => write_snapshot(path, &extracted),
            None => Ok(()),
        };
        (ExtractOutcome::Extracted(Box::new(extracted)), snapshot)
    })
    .await
    .map_err(|e| WorkflowError::Task(e.to_string()))
}

/// Write the snapshot to a sibling temp file, then rename it into place so
/// readers never see a half-written file.
fn write_snapshot(path: &Path, extracted: &ExtractedRun) -> Result<()> {
    let snapshot_err = |source: io::Error| WorkflowError::Snapshot {
        path: path.to_path_buf(),
        source,
    };

    let snapshot = MetricsSnapshot {
        metrics: &extracted.extraction.metrics,
        run_path: &extracted.run.path,
        extracted_at: Utc::now(),
    };
    let body = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| snapshot_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(snapshot_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(snapshot_err)?;
    fs::rename(&tmp, path).map_err(snapshot_err)?;

    info!(path = %path.display(), "Metrics snapshot written");
    Ok(())
}
