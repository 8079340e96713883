//! `tapeout config` - resolved configuration

use super::context::CliContext;
use super::output::print_json;
use anyhow::Result;
use tapeout::collab::CommandSpec;
use tapeout::config::{logs_dir, tapeout_home};
use tapeout_logging::log_file_path;

#[derive(Debug)]
pub struct ConfigArgs {
    pub json: bool,
}

pub fn run(ctx: &CliContext, args: ConfigArgs) -> Result<()> {
    let config = &ctx.config;
    let analyzer = config.analyzer_spec().ok();
    let publisher = config.publisher_spec().ok();

    if args.json {
        return print_json(&serde_json::json!({
            "home": tapeout_home(),
            "config_path": ctx.config_path,
            "config_exists": ctx.config_path.exists(),
            "designs_root": config.designs_root,
            "database_path": ctx.database_path(),
            "metrics_snapshot_path": config.metrics_snapshot_path(),
            "log_file": log_file_path(&logs_dir(), "tapeout"),
            "analyzer": analyzer,
            "publisher": publisher,
        }));
    }

    let exists = if ctx.config_path.exists() { "" } else { " (not found, using defaults)" };
    println!("Home:             {}", tapeout_home().display());
    println!("Config file:      {}{}", ctx.config_path.display(), exists);
    println!(
        "Designs root:     {}",
        config
            .designs_root
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("Database:         {}", ctx.database_path().display());
    println!("Metrics snapshot: {}", config.metrics_snapshot_path().display());
    println!("Log file:         {}", log_file_path(&logs_dir(), "tapeout").display());
    println!("Analyzer:         {}", describe(analyzer.as_ref()));
    println!("Publisher:        {}", describe(publisher.as_ref()));
    Ok(())
}

fn describe(spec: Option<&CommandSpec>) -> String {
    match spec {
        Some(spec) => {
            let mut line = spec.program.clone();
            for arg in &spec.args {
                line.push(' ');
                line.push_str(arg);
            }
            if let Some(secs) = spec.timeout_secs {
                line.push_str(&format!(" (timeout {}s)", secs));
            }
            line
        }
        None => "(not configured)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_spec() {
        let spec = CommandSpec::new("post")
            .with_args(["--dry-run"])
            .with_timeout_secs(60);
        assert_eq!(describe(Some(&spec)), "post --dry-run (timeout 60s)");
        assert_eq!(describe(None), "(not configured)");
    }
}
