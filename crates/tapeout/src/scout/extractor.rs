//! Metric extraction from a run's report files
//!
//! Reports are read newest-first: later flow stages overwrite earlier ones,
//! so the newest file that mentions a metric is authoritative for it. The
//! scan stops as soon as every field has been resolved.

use super::locator::{design_name_for_run, is_file_entry};
use super::patterns::{RuleMiss, METRIC_RULES};
use super::types::{ExtractionReport, MetricField, MetricsRecord};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions of files that may carry metrics.
pub const REPORT_EXTENSIONS: &[&str] = &["rpt", "log", "json"];

/// Metrics of the run at `run_path`. Never fails; unresolved fields keep
/// their defaults.
pub fn extract_metrics(run_path: &Path) -> MetricsRecord {
    extract_metrics_detailed(run_path).metrics
}

/// Like [`extract_metrics`], with scan statistics and the unresolved fields.
pub fn extract_metrics_detailed(run_path: &Path) -> ExtractionReport {
    let mut metrics = MetricsRecord {
        design_name: design_name_for_run(run_path),
        ..MetricsRecord::default()
    };
    let mut resolved = [false; 4];

    let files = collect_report_files(run_path);
    let candidate_files = files.len();
    let mut files_scanned = 0;
    let mut files_skipped = 0;

    for path in &files {
        if resolved.iter().all(|done| *done) {
            break;
        }

        let text = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Skipping unreadable report");
                files_skipped += 1;
                continue;
            }
        };
        files_scanned += 1;

        for rule in METRIC_RULES.iter() {
            let slot = rule.field.index();
            if resolved[slot] {
                continue;
            }
            match rule.apply(&text, &mut metrics) {
                Ok(()) => {
                    debug!(field = %rule.field, file = %path.display(), "Metric resolved");
                    resolved[slot] = true;
                }
                Err(RuleMiss::NoMatch) => {}
                Err(RuleMiss::Unparseable(raw)) => {
                    warn!(
                        field = %rule.field,
                        file = %path.display(),
                        value = %raw,
                        "Matched metric is not a number"
                    );
                }
            }
        }
    }

    let unresolved: Vec<MetricField> = MetricField::ALL
        .into_iter()
        .filter(|field| !resolved[field.index()])
        .collect();
    if !unresolved.is_empty() {
        let names: Vec<&str> = unresolved.iter().map(MetricField::as_str).collect();
        info!(
            run = %run_path.display(),
            unresolved = %names.join(","),
            "Some metrics were not found; defaults kept"
        );
    }

    ExtractionReport {
        metrics,
        unresolved,
        candidate_files,
        files_scanned,
        files_skipped,
    }
}

/// Report files under `run_path`, newest first. Equal times are ordered by
/// path so repeated scans agree.
fn collect_report_files(run_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<(SystemTime, PathBuf)> = WalkDir::new(run_path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| is_file_entry(entry) && has_report_extension(entry.path()))
        .map(|entry| {
            // Follows links, so a linked report sorts by its target's time.
            let modified = fs::metadata(entry.path())
                .ok()
                .and_then(|m| m.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.into_path())
        })
        .collect();

    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    files.into_iter().map(|(_, path)| path).collect()
}

fn has_report_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| REPORT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    fn run_dir(tmp: &TempDir) -> PathBuf {
        let run = tmp.path().join("spm").join("runs").join("RUN_1");
        fs::create_dir_all(run.join("reports")).unwrap();
        run
    }

    fn write_report(run: &Path, name: &str, body: &str, mtime: i64) -> PathBuf {
        let path = run.join("reports").join(name);
        fs::write(&path, body).unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
        path
    }

    const FULL_REPORT: &str = "\
Chip area for module '\\spm': 0.0421
Total Power = 1.25e-3 W
worst slack 2.37
violation count 0
";

    #[test]
    fn extracts_all_fields() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "final.rpt", FULL_REPORT, 1_000);

        let report = extract_metrics_detailed(&run);
        assert!(!report.is_partial());
        let m = report.metrics;
        assert_eq!(m.design_name, "spm");
        assert_eq!(m.area_mm2, 0.0421);
        assert!((m.power_mw - 1.25).abs() < 1e-12);
        assert_eq!(m.slack_ns, 2.37);
        assert_eq!(m.drc_violations, 0);
    }

    #[test]
    fn missing_fields_keep_defaults() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "flow.log", "nothing of interest here\n", 1_000);

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.unresolved, MetricField::ALL.to_vec());
        assert_eq!(report.metrics.area_mm2, 0.0);
        assert_eq!(report.metrics.power_mw, 0.0);
        assert_eq!(report.metrics.slack_ns, 0.0);
        assert_eq!(report.metrics.drc_violations, 0);
    }

    #[test]
    fn empty_run_directory_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.candidate_files, 0);
        assert_eq!(report.metrics.design_name, "spm");
        assert!(report.is_partial());
    }

    #[test]
    fn extraction_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "a.rpt", "worst slack -0.12\n", 1_000);
        write_report(&run, "b.log", "violation count 4\n", 2_000);

        assert_eq!(extract_metrics(&run), extract_metrics(&run));
    }

    #[test]
    fn newest_report_wins() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "early.rpt", "worst slack -1.5\n", 1_000);
        write_report(&run, "late.rpt", "worst slack 0.8\n", 2_000);

        assert_eq!(extract_metrics(&run).slack_ns, 0.8);
    }

    #[test]
    fn other_extensions_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "notes.txt", "violation count 99\n", 2_000);
        write_report(&run, "drc.rpt", "violation count 3\n", 1_000);

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.candidate_files, 1);
        assert_eq!(report.metrics.drc_violations, 3);
    }

    #[test]
    fn stops_once_everything_resolved() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "final.rpt", FULL_REPORT, 3_000);
        write_report(&run, "older.log", "worst slack -9.0\n", 2_000);
        write_report(&run, "oldest.json", "{}", 1_000);

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.candidate_files, 3);
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.metrics.slack_ns, 2.37);
    }

    #[test]
    fn fields_resolve_across_files() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "synth.rpt", "Chip area for module 'spm': 12.5\n", 1_000);
        write_report(&run, "power.rpt", "Total Power = 0.002 W\n", 2_000);

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.metrics.area_mm2, 12.5);
        assert!((report.metrics.power_mw - 2.0).abs() < 1e-12);
        assert_eq!(
            report.unresolved,
            vec![MetricField::SlackNs, MetricField::DrcViolations]
        );
    }

    #[test]
    fn unparseable_capture_leaves_field_for_older_files() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        write_report(&run, "new.rpt", "worst slack --\n", 2_000);
        write_report(&run, "old.rpt", "worst slack 1.1\n", 1_000);

        assert_eq!(extract_metrics(&run).slack_ns, 1.1);
    }

    #[test]
    fn invalid_utf8_is_read_lossily() {
        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        let path = run.join("reports").join("drc.log");
        let mut bytes = vec![0xff, 0xfe, b'\n'];
        bytes.extend_from_slice(b"violation count 7\n");
        fs::write(&path, bytes).unwrap();

        assert_eq!(extract_metrics(&run).drc_violations, 7);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_report_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        let locked = write_report(&run, "locked.rpt", "worst slack 5.0\n", 2_000);
        write_report(&run, "open.rpt", "worst slack 1.0\n", 1_000);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores permission bits; only assert the skip when it applies.
        if fs::read(&locked).is_err() {
            let report = extract_metrics_detailed(&run);
            assert_eq!(report.files_skipped, 1);
            assert_eq!(report.metrics.slack_ns, 1.0);
        }

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn linked_report_is_read() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let run = run_dir(&tmp);
        let target = tmp.path().join("shared_drc.rpt");
        fs::write(&target, "violation count 7\n").unwrap();
        symlink(&target, run.join("reports").join("drc.rpt")).unwrap();

        let report = extract_metrics_detailed(&run);
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.metrics.drc_violations, 7);
    }
}
