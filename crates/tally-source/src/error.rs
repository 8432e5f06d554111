//! Error type for `tally-source`.
//!
//! Fetch failures are reported as [`tally_core::source::FetchError`]; this
//! type only covers building the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("invalid publisher base URL {0:?}")]
  BaseUrl(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
