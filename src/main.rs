use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use sectorsip::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for sectorsip::AppCommand {
    fn from(cmd: Commands) -> sectorsip::AppCommand {
        match cmd {
            Commands::Invest {
                budget,
                sectors,
                top_picks,
            } => sectorsip::AppCommand::Invest {
                budget,
                sectors,
                top_picks,
            },
            Commands::Summary => sectorsip::AppCommand::Summary,
            Commands::Sectors => sectorsip::AppCommand::Sectors,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run one investment cycle
    Invest {
        /// Amount to invest this cycle, overriding the configured budget
        #[arg(short, long)]
        budget: Option<f64>,

        /// Sector to invest in, may be repeated. Overrides the configured sectors
        #[arg(short, long = "sector")]
        sectors: Vec<String>,

        /// Buy the top picks even when sectors are configured
        #[arg(short, long, conflicts_with = "sectors")]
        top_picks: bool,
    },
    /// Display holdings valued at current prices
    Summary,
    /// List the sector taxonomy in use
    Sectors,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => sectorsip::cli::setup::setup_at_path(path),
            None => sectorsip::cli::setup::setup(),
        },
        Some(cmd) => sectorsip::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
