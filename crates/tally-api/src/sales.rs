//! Handlers for `/sales` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sales` | Last fetched report; `[]` before the first fetch |
//! | `POST` | `/sales/refresh` | Fetch now; errors are returned, not swallowed |
//! | `GET`  | `/sales/summary` | Optional `?today=YYYY-MM-DD` |
//! | `GET`  | `/sales/daily` | `null` unless the cache covers this month |
//! | `POST` | `/sales/daily/refresh` | Fetch this month's daily statistics |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tally_core::{
  notify::NotificationSurface,
  record::{DailySales, SaleRecord},
  source::DataSource,
  store::SnapshotStore,
  summary::SalesSummary,
};

use crate::{Shared, error::ApiError};

/// `GET /sales`
pub async fn cached<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Vec<SaleRecord>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.cached_sales().await?))
}

/// `POST /sales/refresh`
pub async fn refresh<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Vec<SaleRecord>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.request_fresh_sales().await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct SummaryParams {
  /// Day the projection is computed for. Defaults to today (UTC).
  pub today: Option<NaiveDate>,
}

/// `GET /sales/summary[?today=YYYY-MM-DD]`
pub async fn summary<S, D, N>(
  State(poller): Shared<S, D, N>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<SalesSummary>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  let today = params.today.unwrap_or_else(|| Utc::now().date_naive());
  Ok(Json(poller.summary(today).await?))
}

/// `GET /sales/daily`
pub async fn cached_daily<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Option<DailySales>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.cached_daily().await?))
}

/// `POST /sales/daily/refresh`
pub async fn refresh_daily<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<DailySales>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.request_daily_sales().await?))
}
