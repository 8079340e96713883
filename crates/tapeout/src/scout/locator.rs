//! Run discovery over a designs root
//!
//! Expected layout:
//!
//! ```text
//! <designs_root>/
//! └── <design>/
//!     └── runs/
//!         └── <run>/
//!             └── results/**/<design>.gds   # completion artifact
//! ```
//!
//! A run is complete when any file under its `results/` subtree ends in
//! [`COMPLETION_EXTENSION`]. The subtree is walked again on every call; run
//! counts are in the tens, so no completion cache is kept.
//!
//! Directory listings are sorted by name, which makes tie-breaking between
//! runs with identical modification times deterministic: the first run in
//! (design name, run name) order wins.

use super::types::{DesignSummary, RunCandidate};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Subdirectory of a design holding its runs.
pub const RUNS_DIR: &str = "runs";
/// Subdirectory of a run holding its final outputs.
pub const RESULTS_DIR: &str = "results";
/// File suffix marking a finished run.
pub const COMPLETION_EXTENSION: &str = ".gds";

/// Design name used when a run path has no grandparent directory.
pub const UNKNOWN_DESIGN: &str = "Unknown";

/// Newest completed run under `designs_root`, or `None` when the root is
/// missing, holds no designs, or no run has a completion artifact.
pub fn find_latest_completed_run(designs_root: &Path) -> Option<RunCandidate> {
    let mut latest: Option<RunCandidate> = None;
    for run in discover_runs(designs_root) {
        if !run.completed {
            continue;
        }
        // Strict comparison: on equal timestamps the earlier listing wins.
        let newer = latest
            .as_ref()
            .map_or(true, |current| run.modified > current.modified);
        if newer {
            latest = Some(run);
        }
    }

    match &latest {
        Some(run) => info!(
            run = %run.path.display(),
            design = %run.design_name,
            "Latest completed run selected"
        ),
        None => info!(root = %designs_root.display(), "No completed runs found"),
    }
    latest
}

/// Every run of every design, in (design name, run name) order.
pub fn discover_runs(designs_root: &Path) -> Vec<RunCandidate> {
    if !designs_root.is_dir() {
        warn!(root = %designs_root.display(), "Designs directory not found");
        return Vec::new();
    }

    let mut runs = Vec::new();
    for (design_name, design_path) in sorted_subdirs(designs_root) {
        runs.extend(design_runs(&design_name, &design_path));
    }
    debug!(root = %designs_root.display(), runs = runs.len(), "Run discovery finished");
    runs
}

/// Inventory of the design folders under `designs_root`.
///
/// Returns `None` when the root does not exist.
pub fn list_designs(designs_root: &Path) -> Option<Vec<DesignSummary>> {
    if !designs_root.is_dir() {
        return None;
    }

    let summaries = sorted_subdirs(designs_root)
        .into_iter()
        .map(|(name, path)| {
            let runs = design_runs(&name, &path);
            let completed_runs = runs.iter().filter(|r| r.completed).count();
            let latest_completed = runs
                .iter()
                .filter(|r| r.completed)
                .fold(None::<&RunCandidate>, |best, run| match best {
                    Some(b) if run.modified <= b.modified => Some(b),
                    _ => Some(run),
                })
                .cloned();
            DesignSummary {
                name,
                path,
                run_count: runs.len(),
                completed_runs,
                latest_completed,
            }
        })
        .collect();
    Some(summaries)
}

/// Whether `run_dir/results` contains a completion artifact at any depth.
pub fn is_run_complete(run_dir: &Path) -> bool {
    let results = run_dir.join(RESULTS_DIR);
    if !results.is_dir() {
        return false;
    }

    WalkDir::new(&results)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry under results");
                None
            }
        })
        .any(|entry| {
            is_file_entry(&entry)
                && entry
                    .file_name()
                    .to_string_lossy()
                    .ends_with(COMPLETION_EXTENSION)
        })
}

/// Regular files and symlinks that resolve to one. The walk itself does not
/// follow links.
pub(crate) fn is_file_entry(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// Design name for a run directory: the name of its grandparent
/// (`<design>/runs/<run>`).
pub fn design_name_for_run(run_dir: &Path) -> String {
    run_dir
        .parent()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNKNOWN_DESIGN.to_string())
}

fn design_runs(design_name: &str, design_path: &Path) -> Vec<RunCandidate> {
    let runs_dir = design_path.join(RUNS_DIR);
    if !runs_dir.is_dir() {
        return Vec::new();
    }

    sorted_subdirs(&runs_dir)
        .into_iter()
        .filter_map(|(run_id, run_path)| {
            let modified = match fs::metadata(&run_path).and_then(|m| m.modified()) {
                Ok(time) => time,
                Err(err) => {
                    warn!(run = %run_path.display(), error = %err, "Cannot stat run directory");
                    return None;
                }
            };
            Some(RunCandidate {
                completed: is_run_complete(&run_path),
                design_name: design_name.to_string(),
                run_id,
                modified: to_utc(modified),
                path: run_path,
            })
        })
        .collect()
}

/// Child directories of `dir` as (name, path), sorted by name.
fn sorted_subdirs(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "Cannot list directory");
            return Vec::new();
        }
    };

    let mut dirs: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some((name, path))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    dirs
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
