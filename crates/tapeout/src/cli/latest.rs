//! `tapeout latest` - metrics of the newest completed run

use super::context::CliContext;
use super::output::{format_time, print_json, print_json_status};
use anyhow::Result;
use std::path::PathBuf;
use tapeout::report::render_metrics;
use tapeout::workflow::{discover_and_extract, ExtractOutcome};

#[derive(Debug)]
pub struct LatestArgs {
    pub root: Option<PathBuf>,
    pub json: bool,
}

pub async fn run(ctx: &CliContext, args: LatestArgs) -> Result<()> {
    let root = ctx.designs_root(args.root.as_deref())?;
    let snapshot_path = ctx.config.metrics_snapshot_path();

    let extracted = match discover_and_extract(&root, Some(snapshot_path.as_path())).await? {
        ExtractOutcome::Extracted(extracted) => extracted,
        ExtractOutcome::NoCompletedRun => {
            if args.json {
                return print_json_status("no_completed_run");
            }
            println!("No completed runs found under {}", root.display());
            if !root.is_dir() {
                println!("(the directory does not exist)");
            }
            return Ok(());
        }
    };

    if args.json {
        return print_json(&serde_json::json!({
            "status": "extracted",
            "run": extracted.run,
            "metrics": extracted.extraction.metrics,
            "unresolved": extracted.extraction.unresolved,
            "files_scanned": extracted.extraction.files_scanned,
            "files_skipped": extracted.extraction.files_skipped,
            "snapshot_path": snapshot_path,
        }));
    }

    let run = &extracted.run;
    let extraction = &extracted.extraction;
    println!("Design: {}", run.design_name);
    println!("Run:    {} ({})", run.run_id, format_time(run.modified));
    println!("Path:   {}", run.path.display());
    println!();
    print!("{}", render_metrics(&extraction.metrics));
    if extraction.is_partial() {
        let names: Vec<&str> = extraction.unresolved.iter().map(|f| f.as_str()).collect();
        println!();
        println!("Not found in reports (defaulted): {}", names.join(", "));
    }
    println!();
    println!("Snapshot written to {}", snapshot_path.display());
    Ok(())
}
