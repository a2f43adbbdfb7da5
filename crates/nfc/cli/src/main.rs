use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nfc_sdk::Scope;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

mod commands;
mod config;
mod signal;

use commands::{list_command, watch_command};

#[derive(Parser)]
#[command(version, about = "Watch PC/SC contactless readers for card presentations")]
struct Cli {
    /// Optional TOML file with controller settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resource manager scope, overrides the config file
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Open a session with every card presented until interrupted
    Watch {
        /// Only watch readers whose name contains this text
        #[arg(short, long, conflicts_with = "all")]
        reader: Option<String>,

        /// Watch every reader instead of the first one
        #[arg(short, long)]
        all: bool,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ScopeArg {
    User,
    System,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::User => Self::User,
            ScopeArg::System => Self::System,
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(scope) = cli.scope {
        config = config.with_scope(scope.into());
    }

    match cli.command {
        Commands::List => list_command(config)?,
        Commands::Watch { reader, all } => watch_command(config, reader, all).await?,
    }

    Ok(())
}

fn setup_logging(verbose: bool) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose, &directives))
        .with_ansi(true)
        .init();
}

/// `RUST_LOG` style directives on top of a default level picked by `verbose`
fn log_filter(verbose: bool, directives: &str) -> EnvFilter {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives)
}
