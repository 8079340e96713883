//! `tapeout check` - analyze the newest completed run and save a draft

use super::context::CliContext;
use super::output::{print_json, print_json_status};
use anyhow::Result;
use std::path::PathBuf;
use tapeout::workflow::{generate_pending_draft, DraftOutcome};

#[derive(Debug)]
pub struct CheckArgs {
    pub root: Option<PathBuf>,
    pub json: bool,
}

pub async fn run(ctx: &CliContext, args: CheckArgs) -> Result<()> {
    let root = ctx.designs_root(args.root.as_deref())?;
    let analyzer = ctx.analyzer()?;
    let snapshot_path = ctx.config.metrics_snapshot_path();
    let db = ctx.open_db().await?;

    let outcome = generate_pending_draft(&db, &analyzer, &root, Some(snapshot_path.as_path())).await;
    db.close().await;

    let summary = match outcome? {
        DraftOutcome::Drafted(summary) => summary,
        DraftOutcome::NoCompletedRun => {
            if args.json {
                return print_json_status("no_completed_run");
            }
            println!("No completed runs found under {}", root.display());
            return Ok(());
        }
    };

    if args.json {
        return print_json(&serde_json::json!({
            "status": "drafted",
            "post_id": summary.post_id,
            "superseded": summary.superseded,
            "design_name": summary.extracted.extraction.metrics.design_name,
            "run": summary.extracted.run,
            "metrics": summary.extracted.extraction.metrics,
            "unresolved": summary.extracted.extraction.unresolved,
            "analysis": summary.analysis,
        }));
    }

    println!("{}", summary.report);
    if summary.superseded > 0 {
        println!();
        println!(
            "(replaced {} earlier pending draft{} for {})",
            summary.superseded,
            if summary.superseded == 1 { "" } else { "s" },
            summary.extracted.extraction.metrics.design_name
        );
    }
    Ok(())
}
