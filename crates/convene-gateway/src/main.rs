use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use convene_core::config::ConveneConfig;
use convene_core::SystemClock;
use convene_notify::{Notification, QueueNotifier};
use convene_scheduler::SchedulerEngine;
use convene_sessions::{SessionCoordinator, SqliteRepository};
use tokio::sync::mpsc;
use tracing::{info, warn};

mod app;
mod http;

/// Capacity of the outbound notification queue.
const NOTIFY_QUEUE_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "convene-gateway")]
#[command(about = "Interview scheduling coordination engine")]
struct Cli {
    /// Path to convene.toml (falls back to CONVENE_CONFIG, then ~/.convene/convene.toml)
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "convene_gateway=info,convene_scheduler=info,convene_sessions=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > CONVENE_CONFIG env > ~/.convene/convene.toml
    let config_path = cli.config.or_else(|| std::env::var("CONVENE_CONFIG").ok());
    let config = ConveneConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        ConveneConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let repo = Arc::new(SqliteRepository::new(db)?);
    info!("database migrations complete");

    // Notification channel: coordinator + jobs → delivery task
    let (notifier, notify_rx) = QueueNotifier::channel(NOTIFY_QUEUE_CAPACITY);
    tokio::spawn(deliver(notify_rx));

    let coordinator = Arc::new(SessionCoordinator::new(
        repo,
        Arc::new(notifier),
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    let engine = SchedulerEngine::new(Arc::clone(&coordinator), &config.jobs)?;
    let engine_handle = engine.start();

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, coordinator));
    let router = app::build_router(state);

    info!("Convene gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine_handle.stop().await;
    info!("Convene gateway stopped");
    Ok(())
}

/// Drain queued notifications. Real transports (SMTP, chat) plug in here;
/// until then every message is logged with its recipients.
async fn deliver(mut rx: mpsc::Receiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        info!(
            kind = notification.kind(),
            session_id = %notification.session_id(),
            recipients = ?notification.recipients(),
            "{}",
            notification.summary()
        );
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
