//! The `DataSource` trait: where polls get their data.

use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;

use crate::record::{DailySales, ReviewRecord, SaleRecord};

/// Why a fetch produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The publisher rejected the session (missing token, 401, 403).
  #[error("authentication rejected by publisher")]
  Auth,

  /// Transport or service failure; worth retrying next cycle.
  #[error("network failure: {0}")]
  Network(String),

  /// The response did not have the expected shape.
  #[error("malformed response: {0}")]
  Malformed(String),
}

/// The publisher dashboard, as seen by the poller.
pub trait DataSource: Send + Sync {
  /// Sales report for the period starting at `period_start` (first day of a
  /// month).
  fn fetch_sales(
    &self,
    period_start: NaiveDate,
  ) -> impl Future<Output = Result<Vec<SaleRecord>, FetchError>> + Send + '_;

  /// One page of the review list, newest first as the dashboard returns it.
  fn fetch_reviews(
    &self,
    page: u32,
    page_size: u32,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, FetchError>> + Send + '_;

  /// Per-day statistics for `[start, end)`.
  fn fetch_daily(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<DailySales, FetchError>> + Send + '_;
}
