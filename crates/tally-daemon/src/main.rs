//! tallyd: polls the publisher dashboard and serves the Tally API.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `TALLY_*` environment variables, opens the SQLite store, starts the poll
//! scheduler, and serves the JSON API over HTTP.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `TALLY_PUBLISHER__CSRF_TOKEN`.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```text
//! cargo run -p tally-daemon --bin tallyd -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use rand_core::OsRng;
use tally_core::poll::Poller;
use tally_daemon::{DaemonConfig, scheduler};
use tally_source::PublisherClient;
use tally_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Tally publisher dashboard poller")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Run the startup cycle once, print its report as JSON, and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    println!("{}", hash_password(&read_password()?)?);
    return Ok(());
  }

  let cfg = DaemonConfig::load(&cli.config, tally_daemon::environment())
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  let auth = cfg.auth()?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cfg.publisher.csrf_token.is_empty() {
    tracing::warn!("no publisher session configured; polls will report it as expired");
  }
  let client =
    PublisherClient::new(cfg.publisher.clone()).context("invalid publisher settings")?;

  let poller = Arc::new(Poller::new(store.clone(), client, store, cfg.poll_config()));

  if cli.once {
    let report = poller.on_process_start().await.context("startup poll failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  let scheduler = tokio::spawn(scheduler::run(poller.clone(), cfg.poll_interval()));

  let app = tally_daemon::app(poller, auth);
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  scheduler.abort();
  Ok(())
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Prompt for a password on stderr and read one line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{BufRead, Write};
  eprint!("Password: ");
  std::io::stderr().flush().ok();
  let line = std::io::stdin()
    .lock()
    .lines()
    .next()
    .transpose()?
    .unwrap_or_default();
  Ok(line.trim_end_matches('\r').to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
