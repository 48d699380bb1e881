//! TutorHub API server - main entry point
//!
//! REST + SSE service connecting parents of autistic children with tutors.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tutorhub_api::{bootstrap, build_router, mail, scheduling, AppState};
use tutorhub_common::api::{load_jwt_secret, TokenService};
use tutorhub_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use tutorhub_common::db::init_database;
use tutorhub_common::events::EventBus;

/// Command-line arguments for tutorhub-api
#[derive(Parser, Debug)]
#[command(name = "tutorhub-api")]
#[command(about = "TutorHub tutoring marketplace API")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "TUTORHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "TUTORHUB_PORT")]
    port: Option<u16>,

    /// Root folder holding the database and uploaded media
    #[arg(short, long, env = "TUTORHUB_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so the log level can come from it;
    // load() warnings emitted here are lost, errors are still reported.
    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tutorhub_api={0},tutorhub_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting TutorHub API (git: {}, built: {}, profile: {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(args.root_folder, config.root_folder.clone()).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path(&config.database_path);
    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let secret = if config.jwt.secret.is_empty() {
        load_jwt_secret(&db).await.context("Failed to load JWT secret")?
    } else {
        config.jwt.secret.clone()
    };
    let tokens = TokenService::new(secret, config.jwt.expiry_minutes).context("Invalid JWT configuration")?;

    bootstrap::ensure_manager_account(&db, &config.bootstrap)
        .await
        .context("Failed to provision manager account")?;

    let (mail_queue, mail_receiver) =
        mail::MailQueue::new(&config.message_queue.queue_name, config.message_queue.capacity);
    mail::spawn_worker(mail_receiver, mail::sender_from_config(&config.smtp));

    let event_bus = EventBus::new(100);
    scheduling::spawn_generator(
        db.clone(),
        event_bus.clone(),
        config.schedule.generation_interval_minutes,
    );

    let port = args.port.unwrap_or(config.port);
    let state = AppState::new(
        db,
        config,
        tokens,
        event_bus,
        mail_queue,
        initializer.media_path(),
    );
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
