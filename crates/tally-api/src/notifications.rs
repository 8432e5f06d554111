//! Handlers for `/notifications` and `/unread` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notifications` | Outstanding, oldest first |
//! | `POST` | `/notifications/:id/click` | Returns `{"url": ...}` to open |
//! | `POST` | `/notifications/:id/close` | `?by_user=false` for a system close |
//! | `GET`  | `/unread` | Counters plus badge text |
//! | `POST` | `/unread/acknowledge` | Resets both counters |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tally_core::{
  notify::{Notification, NotificationSurface},
  source::DataSource,
  store::SnapshotStore,
};

use crate::{Shared, error::ApiError};

/// `GET /notifications`
pub async fn list<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<Vec<Notification>>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Ok(Json(poller.notifications().await?))
}

// ─── Click / close ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickResponse {
  pub url: String,
}

/// `POST /notifications/:id/click`
pub async fn click<S, D, N>(
  State(poller): Shared<S, D, N>,
  Path(id): Path<String>,
) -> Result<Json<ClickResponse>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  let url = poller.on_notification_clicked(&id).await?;
  Ok(Json(ClickResponse { url }))
}

#[derive(Debug, Deserialize)]
pub struct CloseParams {
  #[serde(default = "default_by_user")]
  pub by_user: bool,
}

fn default_by_user() -> bool { true }

/// `POST /notifications/:id/close`
pub async fn close<S, D, N>(
  State(poller): Shared<S, D, N>,
  Path(id): Path<String>,
  Query(params): Query<CloseParams>,
) -> Result<StatusCode, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  poller.on_notification_closed(&id, params.by_user).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Unread ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadResponse {
  pub sales:   u64,
  pub reviews: u64,
  pub total:   u64,
  /// Empty when nothing is unread.
  pub badge:   String,
}

/// `GET /unread`
pub async fn unread<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<Json<UnreadResponse>, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  let counters = poller.unread().await?;
  Ok(Json(UnreadResponse {
    sales:   counters.sales,
    reviews: counters.reviews,
    total:   counters.total(),
    badge:   counters.badge_text(),
  }))
}

/// `POST /unread/acknowledge`
pub async fn acknowledge<S, D, N>(
  State(poller): Shared<S, D, N>,
) -> Result<StatusCode, ApiError>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  poller.acknowledge_unread().await?;
  Ok(StatusCode::NO_CONTENT)
}
