//! Subsplit operator CLI.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use subsplit_config::{load_config, resolve_config_path};
use subsplit_scheduler::RedisJobQueue;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "subsplit")]
#[command(about = "Inspect and operate the subsplit job queue", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./config.json)
    #[arg(long, global = true, env = "SUBSPLIT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        path: Option<PathBuf>,
    },
    /// Show queue lengths
    Status,
    /// Print the contents of a queue list
    List {
        #[arg(value_enum)]
        list: QueueList,
    },
    /// Move in-flight jobs back onto the intake list
    Replay {
        /// Replay every in-flight job
        #[arg(long, conflicts_with = "payload")]
        all: bool,
        /// Exact payload to replay
        payload: Option<String>,
    },
    /// Push a file's contents as a job
    Enqueue {
        /// File holding the push event
        file: PathBuf,
    },
    /// Show the split a push reference maps to
    Classify {
        /// Reference such as refs/heads/main
        reference: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum QueueList {
    Incoming,
    Processing,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Validate { path } => {
            let path = resolve_config_path(path.or(cli.config))?;
            commands::validate(&path, &mut out)?;
        }
        Commands::Classify { reference } => {
            commands::classify(&reference, &mut out)?;
        }
        Commands::Status => {
            let queue = open_queue(cli.config)?;
            commands::queue::status(&queue, &mut out).await?;
        }
        Commands::List { list } => {
            let queue = open_queue(cli.config)?;
            match list {
                QueueList::Incoming => commands::queue::list_incoming(&queue, &mut out).await?,
                QueueList::Processing => commands::queue::list_processing(&queue, &mut out).await?,
            }
        }
        Commands::Replay { all, payload } => {
            let queue = open_queue(cli.config)?;
            commands::queue::replay(&queue, all, payload.as_deref(), &mut out).await?;
        }
        Commands::Enqueue { file } => {
            let queue = open_queue(cli.config)?;
            commands::queue::enqueue(&queue, &file, &mut out).await?;
        }
    }

    Ok(())
}

fn open_queue(config: Option<PathBuf>) -> anyhow::Result<RedisJobQueue> {
    let path = resolve_config_path(config)?;
    let config =
        load_config(&path).with_context(|| format!("unable to load {}", path.display()))?;
    Ok(RedisJobQueue::from_config(&config.redis)?)
}
