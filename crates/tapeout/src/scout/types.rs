//! Types produced by run discovery and metric extraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One run directory found under `<design>/runs/`.
///
/// Recomputed on every discovery, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunCandidate {
    /// Absolute (or root-relative, as given) path of the run directory
    pub path: PathBuf,
    /// Name of the design directory owning the run
    pub design_name: String,
    /// Run directory name (e.g. `RUN_2024.05.01_10.00.00`)
    pub run_id: String,
    /// Modification time of the run directory itself
    pub modified: DateTime<Utc>,
    /// Whether a completion artifact exists under `results/`
    pub completed: bool,
}

/// Inventory line for one design directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignSummary {
    pub name: String,
    pub path: PathBuf,
    pub run_count: usize,
    pub completed_runs: usize,
    pub latest_completed: Option<RunCandidate>,
}

impl DesignSummary {
    pub fn has_layout(&self) -> bool {
        self.completed_runs > 0
    }
}

/// Physical-design metrics of one run.
///
/// Unresolved fields keep their zero default. A record is never patched after
/// it is written out; every extraction builds a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(default)]
    pub area_mm2: f64,
    #[serde(default)]
    pub power_mw: f64,
    #[serde(default)]
    pub slack_ns: f64,
    #[serde(default)]
    pub drc_violations: u64,
    #[serde(default)]
    pub design_name: String,
}

/// A metric the extractor looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    AreaMm2,
    PowerMw,
    SlackNs,
    DrcViolations,
}

impl MetricField {
    pub const ALL: [MetricField; 4] = [
        Self::AreaMm2,
        Self::PowerMw,
        Self::SlackNs,
        Self::DrcViolations,
    ];

    /// Field name as it appears in the serialized record.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::AreaMm2 => "area_mm2",
            MetricField::PowerMw => "power_mw",
            MetricField::SlackNs => "slack_ns",
            MetricField::DrcViolations => "drc_violations",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            MetricField::AreaMm2 => 0,
            MetricField::PowerMw => 1,
            MetricField::SlackNs => 2,
            MetricField::DrcViolations => 3,
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full result of an extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub metrics: MetricsRecord,
    /// Fields no report matched; they hold defaults in `metrics`.
    pub unresolved: Vec<MetricField>,
    /// Report files matching the extension allow-list.
    pub candidate_files: usize,
    /// Files actually read before every field resolved.
    pub files_scanned: usize,
    /// Files that could not be read.
    pub files_skipped: usize,
}

impl ExtractionReport {
    /// True when at least one field fell back to its default.
    pub fn is_partial(&self) -> bool {
        !self.unresolved.is_empty()
    }
}
