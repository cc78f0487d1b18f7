//! Subsplit server: webhook intake plus the split worker.

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use subsplit_api::services::SlackNotifier;
use subsplit_api::{AppState, routes};
use subsplit_config::{load_config, resolve_config_path};
use subsplit_core::notifier::{NoopNotifier, Notifier};
use subsplit_executor::ShellSplitExecutor;
use subsplit_scheduler::{RedisJobQueue, Worker, WorkerSettings};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "subsplit-server")]
#[command(about = "Publish monorepo subtree splits on push", long_about = None)]
struct Args {
    /// Path to the JSON configuration (defaults to ./config.json)
    #[arg(env = "SUBSPLIT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config_path = resolve_config_path(args.config)?;
    let config = load_config(&config_path)
        .with_context(|| format!("unable to load {}", config_path.display()))?;

    let queue = Arc::new(RedisJobQueue::from_config(&config.redis)?);
    info!(prefix = %queue.keys().prefix(), host = %config.redis.host, "Using Redis queue");

    let executor = Arc::new(
        ShellSplitExecutor::new(config.split.tool.clone()).with_parallelism(config.split.parallelism),
    );

    let notifier: Arc<dyn Notifier> = match SlackNotifier::from_config(&config)? {
        Some(slack) => Arc::new(slack),
        None => {
            info!("Notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    // Intake server
    let state = AppState::new(queue.clone()).with_webhook_secret(config.http.secret.clone());
    let app = routes::router(state, &config.http.route).layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to bind {}", addr))?;
    info!(
        "Starting HTTP server on port {} with route {}",
        config.http.port, config.http.route
    );
    let mut server = tokio::spawn(async move { axum::serve(listener, app).await });

    let worker = Worker::new(
        queue,
        executor,
        notifier,
        WorkerSettings::from_config(&config),
    );

    tokio::select! {
        _ = worker.run_until(shutdown_signal()) => {
            server.abort();
            Ok(())
        }
        served = &mut server => {
            let err = match served {
                Ok(Ok(())) => anyhow::anyhow!("HTTP server stopped"),
                Ok(Err(e)) => anyhow::Error::new(e).context("HTTP server failed"),
                Err(e) => anyhow::Error::new(e).context("HTTP server task failed"),
            };
            error!(error = %err, "Intake unavailable, exiting");
            Err(err)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SUBSPLIT_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
