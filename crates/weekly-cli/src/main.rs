mod cmd;
mod output;
mod root;
mod wiring;

use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

/// About a thousand years of weeks.
const MAX_WEEKS_AGO: i64 = 52_000;

#[derive(Parser)]
#[command(
    name = "weekly",
    about = "Weekly team status reports: generate, archive, and browse by week",
    version,
    propagate_version = true
)]
struct Cli {
    /// Team root (default: auto-detect from .weekly/)
    #[arg(long, global = true, env = "WEEKLY_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Evaluate as if it were this instant (RFC 3339)
    #[arg(long, global = true, env = "WEEKLY_NOW", hide = true)]
    now: Option<DateTime<FixedOffset>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a team in the current directory
    Init {
        /// Team display name (default: directory name)
        #[arg(long)]
        team: Option<String>,
        /// Store namespace (default: derived from the team name)
        #[arg(long)]
        site_key: Option<String>,
    },

    /// Print the week key for this week or an earlier one
    Week {
        /// Number of weeks back from the current week
        #[arg(long, default_value = "0", value_parser = clap::value_parser!(u32).range(..=MAX_WEEKS_AGO))]
        ago: u32,
    },

    /// Show the report for the current week or a given week
    Show {
        /// Week key (YYYY-MM-DD, a Monday)
        #[arg(long)]
        week: Option<String>,
    },

    /// Generate and store this week's report
    Generate,

    /// List weeks with a report
    Archive {
        /// List every stored week instead of the recent archive
        #[arg(long)]
        all: bool,
    },

    /// Write a stored report as a static snapshot file
    Export {
        /// Week key (default: current week)
        #[arg(long)]
        week: Option<String>,
    },

    /// Validate the team configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Generate => tracing::Level::INFO,
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
    let now = cli.now;

    let result = match cli.command {
        Commands::Init { team, site_key } => {
            cmd::init::run(&root, team.as_deref(), site_key.as_deref())
        }
        Commands::Week { ago } => cmd::week::run(&root, ago, now, cli.json),
        Commands::Show { week } => cmd::show::run(&root, week.as_deref(), now, cli.json),
        Commands::Generate => cmd::generate::run(&root, now, cli.json),
        Commands::Archive { all } => cmd::archive::run(&root, all, now, cli.json),
        Commands::Export { week } => cmd::export::run(&root, week.as_deref(), now, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
