use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// `board-api serve` on `port`. Stdin is a pipe owned by the returned child,
/// so the server stops once the test binary exits and the pipe closes.
pub fn server_command(port: u16) -> Command {
    // Cargo builds the binary before integration tests run
    let mut command = Command::new(env!("CARGO_BIN_EXE_board-api"));
    command
        .args(["serve", "--exit-on-stdin-close"])
        .env("PORT", port.to_string())
        .env("RUST_LOG", "board_api=warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    command
}

pub struct TestServer {
    pub base_url: String,
    child: Mutex<Child>,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = server_command(port)
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self {
            base_url,
            child: Mutex::new(child),
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);

        while Instant::now() < deadline {
            let exited = self.child.lock().ok().and_then(|mut c| c.try_wait().ok().flatten());
            if let Some(status) = exited {
                anyhow::bail!("server exited early with {}", status);
            }
            if let Ok(resp) = client.get(&url).send().await {
                // 503 only means the database is unreachable
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}
