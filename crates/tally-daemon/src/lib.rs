//! The `tallyd` daemon around [`tally_api`].
//!
//! Owns configuration, optional Basic auth for the HTTP surface, and the
//! poll scheduler. The binary in `main.rs` wires these to a SQLite store
//! and the publisher client.

pub mod auth;
pub mod error;
pub mod scheduler;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{Router, middleware};
use serde::Deserialize;
use tally_core::{
  notify::NotificationSurface,
  poll::{PollConfig, Poller},
  source::DataSource,
  store::SnapshotStore,
};
use tally_source::PublisherConfig;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `TALLY_*`
/// environment variables.
#[derive(Deserialize, Clone)]
pub struct DaemonConfig {
  #[serde(default = "default_host")]
  pub host:                  String,
  #[serde(default = "default_port")]
  pub port:                  u16,
  #[serde(default = "default_store_path")]
  pub store_path:            PathBuf,
  #[serde(default = "default_poll_interval_minutes")]
  pub poll_interval_minutes: u64,
  #[serde(default = "default_review_page_size")]
  pub review_page_size:      u32,
  #[serde(default)]
  pub publisher:             PublisherConfig,
  #[serde(default)]
  pub auth_username:         Option<String>,
  #[serde(default)]
  pub auth_password_hash:    Option<String>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 7878 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/tally/tally.db") }

fn default_poll_interval_minutes() -> u64 { 3 }

fn default_review_page_size() -> u32 { 100 }

/// The `TALLY_*` environment layer. Nested keys use a double underscore,
/// e.g. `TALLY_PUBLISHER__CSRF_TOKEN`.
pub fn environment() -> config::Environment {
  config::Environment::with_prefix("TALLY")
    .prefix_separator("_")
    .separator("__")
}

impl DaemonConfig {
  /// Layer `env` over the config file at `path`, which may be absent.
  pub fn load(path: &Path, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  /// Time between scheduled polls; never less than a minute.
  pub fn poll_interval(&self) -> Duration {
    Duration::from_secs(self.poll_interval_minutes.max(1) * 60)
  }

  /// Orchestrator settings. Click targets live on the configured dashboard.
  pub fn poll_config(&self) -> PollConfig {
    let base = self.publisher.base_url.trim_end_matches('/');
    PollConfig {
      review_page_size: self.review_page_size,
      sales_url:        format!("{base}/sales"),
      reviews_url:      format!("{base}/reviews"),
      login_url:        format!("{base}/sales"),
    }
  }

  /// Basic-auth credentials, if configured. Username and hash must be given
  /// together; empty values count as absent.
  pub fn auth(&self) -> Result<Option<AuthConfig>, Error> {
    let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    match (present(&self.auth_username), present(&self.auth_password_hash)) {
      (Some(username), Some(password_hash)) => {
        Ok(Some(AuthConfig { username, password_hash }))
      }
      (None, None) => Ok(None),
      _ => Err(Error::Config(
        "auth_username and auth_password_hash must be set together".into(),
      )),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The daemon's HTTP surface: the API under `/api`, behind Basic auth when
/// `auth` is set, with request tracing.
pub fn app<S, D, N>(poller: Arc<Poller<S, D, N>>, auth: Option<AuthConfig>) -> Router
where
  S: SnapshotStore + 'static,
  D: DataSource + 'static,
  N: NotificationSurface + 'static,
{
  let api = tally_api::api_router(poller);
  let api = match auth {
    Some(auth) => {
      api.layer(middleware::from_fn_with_state(Arc::new(auth), require_auth))
    }
    None => api,
  };
  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
