//! Tapeout Herald - core library
//!
//! Finds the newest chip-design run that produced a layout, extracts its
//! physical metrics, turns an external analysis into a pending announcement
//! draft, and publishes that draft once confirmed.

pub mod collab;
pub mod config;
pub mod report;
pub mod scout;
pub mod workflow;

pub use collab::{AnalysisReport, Analyzer, CollaboratorError, CommandAnalyzer, CommandPublisher, CommandSpec, Publisher};
pub use config::{ConfigError, TapeoutConfig};
pub use scout::{extract_metrics, find_latest_completed_run, MetricsRecord, RunCandidate};
pub use workflow::{
    confirm_pending, discover_and_extract, generate_pending_draft, ConfirmOutcome, DraftOutcome,
    DraftSummary, ExtractOutcome, ExtractedRun, WorkflowError,
};
