use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio::signal;
use tracing::{info, warn};

use crate::config::{self, AppConfig};
use crate::database::DatabaseManager;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "board-api")]
#[command(about = "Board API - auth, storage passthrough, AI proxies and a WebSocket shell")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP and WebSocket server (default)")]
    Serve {
        #[arg(long, env = "PORT", help = "Port to listen on")]
        port: Option<u16>,

        #[arg(long, help = "Apply pending database migrations before serving")]
        migrate: bool,

        #[arg(long, hide = true, help = "Shut down once stdin reaches end of file")]
        exit_on_stdin_close: bool,
    },

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::config().clone();
    info!("Starting Board API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        migrate: false,
        exit_on_stdin_close: false,
    }) {
        Commands::Serve {
            port,
            migrate,
            exit_on_stdin_close,
        } => serve(config, port, migrate, exit_on_stdin_close).await,
        Commands::Migrate => {
            let db = DatabaseManager::connect_lazy(&config.database)?;
            db.migrate().await.context("migration failed")?;
            info!("Migrations applied");
            db.close().await;
            Ok(())
        }
    }
}

async fn serve(
    mut config: AppConfig,
    port: Option<u16>,
    migrate: bool,
    exit_on_stdin_close: bool,
) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    let bind_addr = format!("0.0.0.0:{}", config.server.port);

    let state = AppState::from_config(config)
        .await
        .context("failed to build application state")?;
    if migrate {
        state.db.migrate().await.context("migration failed")?;
        info!("Migrations applied");
    }
    if state.config.aws.user_pool_id.is_empty() {
        warn!("AWS_USER_POOL_ID is not set; Cognito tokens cannot be verified");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Board API listening on http://{}", bind_addr);

    let db = state.db.clone();
    axum::serve(listener, crate::app(state))
        .with_graceful_shutdown(shutdown_signal(exit_on_stdin_close))
        .await
        .context("server error")?;

    db.close().await;
    Ok(())
}

/// Resolves once `input` is exhausted or fails
async fn input_closed<R: tokio::io::AsyncRead + Unpin>(mut input: R) {
    let mut buf = [0u8; 256];
    loop {
        match input.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Resolves on Ctrl+C, SIGTERM, or stdin EOF when `watch_stdin` is set
async fn shutdown_signal(watch_stdin: bool) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let stdin_closed = async {
        if watch_stdin {
            input_closed(tokio::io::stdin()).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
        _ = stdin_closed => info!("Stdin closed, shutting down..."),
    }
}
