//! Rep server: receives pose landmarks (or images) over TCP, counts reps and
//! replies with per-frame form feedback.
//!
//! Usage: rep_server [config.toml]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use rep_tracker::config::Config;
use rep_tracker::server::Server;

const CONFIG_PATH: &str = "rep_server.toml";

/// stderr plus `<log_dir>/rep_server_<timestamp>.log`. `RUST_LOG` overrides
/// the default `info` level.
fn init_logging(log_dir: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir))?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = Path::new(log_dir).join(format!("rep_server_{}.log", ts));
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let log_path = init_logging(&config.server.log_dir)?;
    info!(version = env!("CARGO_PKG_VERSION"), config = %config_path, "rep server starting");
    info!(log = %log_path.display(), "logging to file");

    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "listening");
    info!("no pose estimator configured; image frames will be rejected");

    Server::new(config).run(listener).await
}
