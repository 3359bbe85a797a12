use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memgraph::Config;
use memgraph_cli::commands::{ChatCommand, ConfigCommand, ReplayCommand};
use memgraph_cli::error::CliResult;
use memgraph_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "memgraph")]
#[command(about = "MemGraph - tiered conversational memory, driven from the terminal")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Interactive chat over stdin")]
    Chat(ChatCommand),

    #[clap(about = "Replay a transcript file turn by turn")]
    Replay(ReplayCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,memgraph=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    match &cli.command {
        Command::Config(cmd) => cmd.execute(cli.config.as_deref(), format).await,
        Command::Chat(cmd) => {
            let config = Config::load(cli.config.as_deref())?;
            cmd.execute(config, format).await
        }
        Command::Replay(cmd) => {
            let config = Config::load(cli.config.as_deref())?;
            cmd.execute(config, format).await
        }
    }
}
