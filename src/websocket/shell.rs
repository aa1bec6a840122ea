//! Shell commands run on behalf of a WebSocket connection.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use super::protocol::ServerEvent;

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").filter(|h| !h.is_empty()).map(PathBuf::from)
}

/// Resolve a `cd` target against the connection's directory. Empty and `~` mean home.
pub fn resolve_dir(cwd: &Path, target: &str) -> Result<PathBuf, String> {
    let candidate = match target {
        "" | "~" => home_dir().ok_or_else(|| "HOME is not set".to_string())?,
        t if t.starts_with("~/") => home_dir()
            .ok_or_else(|| "HOME is not set".to_string())?
            .join(&t[2..]),
        t => cwd.join(t),
    };

    match candidate.canonicalize() {
        Ok(dir) if dir.is_dir() => Ok(dir),
        Ok(_) => Err(format!("Not a directory: {}", target)),
        Err(_) => Err(format!("Directory not found: {}", target)),
    }
}

/// `sh -c <command>` in `cwd`. The child dies with its handle.
pub fn spawn(command: &str, cwd: &Path) -> std::io::Result<Child> {
    Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, tx: &UnboundedSender<ServerEvent>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(ServerEvent::Output(format!("{}\n", line))).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading command output: {}", e);
                break;
            }
        }
    }
}

/// Stream stdout and stderr as `output` events until the process exits
pub async fn stream(mut child: Child, tx: &UnboundedSender<ServerEvent>) -> std::io::Result<ExitStatus> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let out = async {
        if let Some(stdout) = stdout {
            forward_lines(stdout, tx).await;
        }
    };
    let err = async {
        if let Some(stderr) = stderr {
            forward_lines(stderr, tx).await;
        }
    };
    tokio::join!(out, err);

    let status = child.wait().await?;
    if !status.success() {
        warn!("Command exited with {}", status);
    }
    Ok(status)
}
