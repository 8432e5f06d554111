//! Handlers for `/reviews` endpoints.

use axum::{Json, extract::State};
use tally_core::{
  notify::NotificationSurface, record::ReviewRecord, source::DataSource,
  store::SnapshotStore,
};

use crate::{Shared, error::ApiError};

/// `GET /reviews`: the last fetched page.
pub async fn cached<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Vec<ReviewRecord>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.cached_reviews().await?))
}

/// `POST /reviews/refresh`
pub async fn refresh<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Vec<ReviewRecord>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.request_fresh_reviews().await?))
}
