//! Error types for `tally-core`.

use thiserror::Error;

use crate::source::FetchError;

#[derive(Debug, Error)]
pub enum Error {
  /// The publisher rejected our credentials. A session-expired alert has
  /// already been raised by the time this is returned.
  #[error("publisher session expired")]
  SessionExpired,

  #[error("network error: {0}")]
  Network(String),

  #[error("malformed response: {0}")]
  Malformed(String),

  #[error("unknown notification id: {0:?}")]
  UnknownNotification(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("notification surface error: {0}")]
  Surface(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl From<FetchError> for Error {
  fn from(e: FetchError) -> Self {
    match e {
      FetchError::Auth => Self::SessionExpired,
      FetchError::Network(msg) => Self::Network(msg),
      FetchError::Malformed(msg) => Self::Malformed(msg),
    }
  }
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn surface(
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Surface(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
