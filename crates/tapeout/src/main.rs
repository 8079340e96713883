//! Tapeout Herald CLI
//!
//! Usage:
//!   tapeout latest --root ~/designs     # metrics of the newest completed run
//!   tapeout check                       # analyze it and save a pending draft
//!   tapeout pending                     # show the pending draft
//!   tapeout confirm                     # publish it

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tapeout_logging::{init_logging, LogConfig};
use tracing::debug;

mod cli;

use cli::context::CliContext;

#[derive(Parser, Debug)]
#[command(
    name = "tapeout",
    version,
    about = "Announce finished chip-design runs: extract metrics, draft, confirm, publish"
)]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.tapeout/config.toml)
    #[arg(long, global = true, env = "TAPEOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Database file (default: ~/.tapeout/tapeout.sqlite3)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract metrics from the newest completed run
    Latest {
        /// Designs directory (overrides designs_root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List design folders and their runs
    Designs {
        /// Designs directory (overrides designs_root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Analyze the newest completed run and save a pending draft
    Check {
        /// Designs directory (overrides designs_root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the pending draft
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish the pending draft
    Confirm {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List drafts and published posts, newest first
    Posts {
        /// Only posts for this design
        #[arg(long)]
        design: Option<String>,

        /// Only posts in this state (pending, cancelled, published)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of posts
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn wants_json(&self) -> bool {
        match self {
            Commands::Latest { json, .. }
            | Commands::Designs { json, .. }
            | Commands::Check { json, .. }
            | Commands::Pending { json }
            | Commands::Confirm { json }
            | Commands::Posts { json, .. }
            | Commands::Config { json } => *json,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.command.wants_json();

    if let Err(err) = init_logging(LogConfig {
        app_name: "tapeout",
        log_dir: tapeout::config::logs_dir(),
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: failed to start async runtime: {}", err);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let ctx = CliContext::load(cli.config, cli.db)?;
    debug!(config = %ctx.config_path.display(), "Configuration loaded");

    match cli.command {
        Commands::Latest { root, json } => {
            cli::latest::run(&ctx, cli::latest::LatestArgs { root, json }).await
        }
        Commands::Designs { root, json } => {
            cli::designs::run(&ctx, cli::designs::DesignsArgs { root, json }).await
        }
        Commands::Check { root, json } => {
            cli::check::run(&ctx, cli::check::CheckArgs { root, json }).await
        }
        Commands::Pending { json } => {
            cli::drafts::pending(&ctx, cli::drafts::PendingArgs { json }).await
        }
        Commands::Confirm { json } => {
            cli::drafts::confirm(&ctx, cli::drafts::ConfirmArgs { json }).await
        }
        Commands::Posts {
            design,
            status,
            limit,
            json,
        } => {
            cli::drafts::posts(
                &ctx,
                cli::drafts::PostsArgs {
                    design,
                    status,
                    limit,
                    json,
                },
            )
            .await
        }
        Commands::Config { json } => cli::config::run(&ctx, cli::config::ConfigArgs { json }),
    }
}
