mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::phase::PhaseSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aisop",
    about = "AI-SOP phase tracking: agent sessions, approval-gated phase transitions, decisions and PB&J checkpoints",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .ai-sop/ or .git/)
    #[arg(long, global = true, env = "AISOP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track agent sessions through the phase graph
    Phase {
        /// Use the development-cycle phase graph instead of the configured one.
        /// Applies to this invocation only and is not stored with sessions:
        /// pass it on every command, or set `graph: development` in
        /// .ai-sop/config.yaml
        #[arg(long = "dev-cycle", global = true)]
        dev_cycle: bool,

        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Phase {
            subcommand: PhaseSubcommand::Dashboard { .. },
            ..
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Phase {
            dev_cycle,
            subcommand,
        } => cmd::phase::run(&root, subcommand, dev_cycle, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
