//! `tapeout designs` - inventory of design folders

use super::context::CliContext;
use super::output::{format_time, print_json, print_table};
use anyhow::Result;
use comfy_table::Color;
use std::collections::HashMap;
use std::path::PathBuf;
use tapeout::scout::list_designs;
use tapeout_db::DesignRecord;

#[derive(Debug)]
pub struct DesignsArgs {
    pub root: Option<PathBuf>,
    pub json: bool,
}

pub async fn run(ctx: &CliContext, args: DesignsArgs) -> Result<()> {
    let root = ctx.designs_root(args.root.as_deref())?;

    let scan_root = root.clone();
    let Some(designs) = tokio::task::spawn_blocking(move || list_designs(&scan_root)).await? else {
        if args.json {
            return print_json(&serde_json::json!({
                "status": "not_found",
                "designs_root": root,
            }));
        }
        println!("Designs directory not found: {}", root.display());
        return Ok(());
    };

    // Tracked designs, if a database exists yet.
    let tracked: HashMap<String, DesignRecord> = match ctx.open_existing_db().await? {
        Some(db) => {
            let records = db.list_designs().await?;
            db.close().await;
            records.into_iter().map(|r| (r.name.clone(), r)).collect()
        }
        None => HashMap::new(),
    };

    if args.json {
        let entries: Vec<serde_json::Value> = designs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "name": d.name,
                    "path": d.path,
                    "run_count": d.run_count,
                    "completed_runs": d.completed_runs,
                    "has_layout": d.has_layout(),
                    "latest_completed": d.latest_completed,
                    "tracked": tracked.get(&d.name),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "status": "ok",
            "designs_root": root,
            "designs": entries,
        }));
    }

    if designs.is_empty() {
        println!("No design folders under {}", root.display());
        return Ok(());
    }

    let rows = designs
        .iter()
        .map(|d| {
            let layout = if d.has_layout() {
                ("yes".to_string(), Some(Color::Green))
            } else {
                ("no".to_string(), Some(Color::DarkGrey))
            };
            let latest = d
                .latest_completed
                .as_ref()
                .map(|run| format!("{} ({})", run.run_id, format_time(run.modified)))
                .unwrap_or_else(|| "-".to_string());
            let last_checked = tracked
                .get(&d.name)
                .map(|r| format_time(r.last_updated))
                .unwrap_or_else(|| "-".to_string());
            vec![
                (d.name.clone(), None),
                (d.run_count.to_string(), None),
                layout,
                (latest, None),
                (last_checked, None),
            ]
        })
        .collect();

    print_table(&["Design", "Runs", "Layout", "Latest completed", "Last checked"], rows);
    println!();
    println!("Use 'tapeout check' to analyze the newest completed run.");
    Ok(())
}
