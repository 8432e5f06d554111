//! Handler for `POST /poll`: run one cycle now, as the timer would.

use axum::{Json, extract::State};
use tally_core::{
  notify::NotificationSurface, poll::TickReport, source::DataSource,
  store::SnapshotStore,
};

use crate::Shared;

/// `POST /poll`. Never fails; per-track failures are in the report.
pub async fn tick<S, D, N>(State(poller): Shared<S, D, N>) -> Json<TickReport>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  Json(poller.on_poll_tick().await)
}
