//! `/ws` gateway: host telemetry, the command log and a per-connection shell.

pub mod protocol;
pub mod shell;

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use axum_extra::extract::CookieJar;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::middleware::{authenticate, AuthUser};
use crate::state::AppState;
use protocol::{parse_command, ClientCommand, ClientEvent, ServerEvent};

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /ws - Authenticate, then upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &headers, &jar, query.token.as_deref()).await?;
    Ok(ws.on_upgrade(move |socket| session(socket, state, user)))
}

/// Fetch the command log and fan it out to every connected socket
pub async fn publish_stored_commands(state: &AppState) {
    match state.dynamo.stored_commands().await {
        // No receivers just means nobody is connected
        Ok(commands) => {
            let _ = state.command_events.send(commands);
        }
        Err(e) => warn!("Could not load stored commands: {}", e),
    }
}

/// One connected client
struct Session {
    state: AppState,
    tx: mpsc::UnboundedSender<ServerEvent>,
    cwd: PathBuf,
    running: JoinSet<()>,
}

impl Session {
    fn emit(&self, event: ServerEvent) {
        // The writer only goes away once the socket is closed
        let _ = self.tx.send(event);
    }

    async fn emit_system_info(&self) {
        let info = self.state.system.info(&self.cwd).await;
        self.emit(ServerEvent::SystemInfo(info));
    }

    async fn handle(&mut self, raw: &str) {
        match parse_command(raw) {
            None => {}
            Some(ClientCommand::Cd(target)) => match shell::resolve_dir(&self.cwd, &target) {
                Ok(dir) => {
                    debug!("cd {} -> {}", target, dir.display());
                    self.cwd = dir;
                    self.emit_system_info().await;
                }
                Err(message) => self.emit(ServerEvent::Error(message)),
            },
            Some(ClientCommand::Shell(command)) => self.run(command).await,
        }
    }

    async fn run(&mut self, command: String) {
        if let Err(e) = self.state.dynamo.store_command(&command).await {
            warn!("Command not logged: {}", e);
        }

        let child = match shell::spawn(&command, &self.cwd) {
            Ok(child) => child,
            Err(e) => {
                self.emit(ServerEvent::Error(format!("Failed to execute command: {}", e)));
                return;
            }
        };

        info!("Running `{}` in {}", command, self.cwd.display());
        let tx = self.tx.clone();
        let state = self.state.clone();
        self.running.spawn(async move {
            if let Err(e) = shell::stream(child, &tx).await {
                let _ = tx.send(ServerEvent::Error(format!("Command failed: {}", e)));
            }
            publish_stored_commands(&state).await;
        });
    }
}

async fn session(socket: WebSocket, state: AppState, user: AuthUser) {
    info!("WebSocket connected: {}", user.username);
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_text() {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to encode {:?}: {}", event, e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session {
        cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        tx,
        running: JoinSet::new(),
        state,
    };
    let mut command_events = session.state.command_events.subscribe();

    session.emit_system_info().await;
    match session.state.dynamo.stored_commands().await {
        Ok(commands) => session.emit(ServerEvent::StoredCommands(commands)),
        Err(e) => session.emit(ServerEvent::Error(format!("Failed to load stored commands: {}", e))),
    }

    let period = Duration::from_secs(session.state.config.server.stats_interval_secs.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => session.emit(ServerEvent::SystemStats(session.state.system.stats())),
            event = command_events.recv() => match event {
                Ok(commands) => session.emit(ServerEvent::StoredCommands(commands)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Skipped {} storedCommands snapshots", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(_) = session.running.join_next(), if !session.running.is_empty() => {}
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match ClientEvent::parse(&text) {
                    Ok(ClientEvent::Command(raw)) => session.handle(&raw).await,
                    Err(e) => debug!("Ignoring frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket read failed: {}", e);
                    break;
                }
            },
        }
    }

    // Aborting the command tasks drops their children, which kills them
    session.running.shutdown().await;
    drop(session);
    let _ = writer.await;
    info!("WebSocket disconnected: {}", user.username);
}
