//! JSON event frames exchanged over `/ws`: `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::services::system::{SystemInfo, SystemStats};
use crate::services::StoredCommand;

/// Events pushed to the client
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    SystemInfo(SystemInfo),
    SystemStats(SystemStats),
    StoredCommands(Vec<StoredCommand>),
    Output(String),
    Error(String),
}

impl ServerEvent {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events accepted from the client
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Command(String),
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What a `command` event asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Change this connection's directory. Empty means home.
    Cd(String),
    Shell(String),
}

/// `None` for blank input
pub fn parse_command(raw: &str) -> Option<ClientCommand> {
    let command = raw.trim();
    if command.is_empty() {
        return None;
    }
    if command == "cd" {
        return Some(ClientCommand::Cd(String::new()));
    }
    match command.strip_prefix("cd ") {
        Some(target) => Some(ClientCommand::Cd(target.trim().to_string())),
        None => Some(ClientCommand::Shell(command.to_string())),
    }
}
