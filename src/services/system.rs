use std::net::{IpAddr, UdpSocket};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use sysinfo::System;
use tokio::sync::OnceCell;
use tracing::debug;

const PUBLIC_IP_URL: &str = "https://checkip.amazonaws.com";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub operating_system: String,
    pub total_memory: String,
    pub free_memory: String,
    pub cpu_count: usize,
    #[serde(rename = "privateIP")]
    pub private_ip: String,
    #[serde(rename = "publicIP")]
    pub public_ip: String,
    pub host: String,
    pub user: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoadAverage {
    #[serde(rename = "1m")]
    pub one: String,
    #[serde(rename = "5m")]
    pub five: String,
    #[serde(rename = "15m")]
    pub fifteen: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub cpu_usage: String,
    pub memory_usage: String,
    pub load_avg: LoadAverage,
}

pub fn format_gb(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / 1e9)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Host telemetry pushed over the WebSocket
pub struct SystemMonitor {
    sys: Mutex<System>,
    http: reqwest::Client,
    public_ip: OnceCell<String>,
}

impl SystemMonitor {
    pub fn new(http: reqwest::Client) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();
        Self {
            sys: Mutex::new(sys),
            http,
            public_ip: OnceCell::new(),
        }
    }

    /// Monitor that reports `ip` instead of looking it up
    #[cfg(test)]
    pub fn with_public_ip(http: reqwest::Client, ip: &str) -> Self {
        let mut monitor = Self::new(http);
        monitor.public_ip = OnceCell::new_with(Some(ip.to_string()));
        monitor
    }

    pub async fn info(&self, path: &Path) -> SystemInfo {
        let (total, free, cpu_count) = {
            let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
            sys.refresh_memory();
            (sys.total_memory(), sys.free_memory(), sys.cpus().len())
        };

        SystemInfo {
            operating_system: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            total_memory: format_gb(total),
            free_memory: format_gb(free),
            cpu_count,
            private_ip: private_ip().map(|ip| ip.to_string()).unwrap_or_else(|| UNKNOWN.to_string()),
            public_ip: self.public_ip().await,
            host: System::host_name().unwrap_or_else(|| UNKNOWN.to_string()),
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| UNKNOWN.to_string()),
            path: path.display().to_string(),
        }
    }

    /// CPU usage is measured since the previous call
    pub fn stats(&self) -> SystemStats {
        let mut sys = self.sys.lock().unwrap_or_else(|e| e.into_inner());
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let total = sys.total_memory();
        let used = total.saturating_sub(sys.free_memory());
        let memory_pct = if total == 0 { 0.0 } else { used as f64 / total as f64 * 100.0 };
        let load = System::load_average();

        SystemStats {
            cpu_usage: format_percent(sys.global_cpu_usage() as f64),
            memory_usage: format_percent(memory_pct),
            load_avg: LoadAverage {
                one: format!("{:.2}", load.one),
                five: format!("{:.2}", load.five),
                fifteen: format!("{:.2}", load.fifteen),
            },
        }
    }

    /// Looked up once. A failed lookup reports `Unknown` and is retried next time.
    async fn public_ip(&self) -> String {
        let lookup = self
            .public_ip
            .get_or_try_init(|| async {
                let response = self
                    .http
                    .get(PUBLIC_IP_URL)
                    .timeout(Duration::from_secs(3))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, reqwest::Error>(response.text().await?.trim().to_string())
            })
            .await;

        match lookup {
            Ok(ip) => ip.clone(),
            Err(e) => {
                debug!("Public IP lookup failed: {}", e);
                UNKNOWN.to_string()
            }
        }
    }
}

/// Address of the interface used for outbound traffic. No packets are sent.
fn private_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified()).then_some(ip)
}
