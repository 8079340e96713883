//! Scout - run discovery and metric extraction
//!
//! Scout walks a designs root laid out as `<design>/runs/<run>/...`, picks the
//! newest run that produced a layout, and pulls physical-design metrics out of
//! the reports that run left behind. Everything here is blocking filesystem
//! I/O; async callers go through [`crate::workflow`], which moves it onto the
//! blocking pool.

pub mod extractor;
pub mod locator;
pub mod patterns;
pub mod types;

pub use extractor::{extract_metrics, extract_metrics_detailed, REPORT_EXTENSIONS};
pub use locator::{
    design_name_for_run, discover_runs, find_latest_completed_run, is_run_complete, list_designs,
    COMPLETION_EXTENSION,
};
pub use patterns::{MetricRule, METRIC_RULES};
pub use types::{DesignSummary, ExtractionReport, MetricField, MetricsRecord, RunCandidate};
