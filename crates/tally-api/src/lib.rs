//! JSON REST API for Tally: the UI-surface entry points over HTTP.
//!
//! Exposes an axum [`Router`] backed by a shared [`Poller`]. Auth, TLS, and
//! transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(poller.clone()))
//! ```

pub mod error;
pub mod notifications;
pub mod poll;
pub mod reviews;
pub mod sales;

use std::sync::Arc;

use axum::{
  Router,
  extract::State,
  routing::{get, post},
};
use tally_core::{
  notify::NotificationSurface, poll::Poller, source::DataSource,
  store::SnapshotStore,
};

pub use error::ApiError;

/// Handler state: the poller every route drives.
pub type Shared<S, D, N> = State<Arc<Poller<S, D, N>>>;

/// Build a fully-materialised API router for `poller`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D, N>(poller: Arc<Poller<S, D, N>>) -> Router<()>
where
  S: SnapshotStore + 'static,
  D: DataSource + 'static,
  N: NotificationSurface + 'static,
{
  Router::new()
    // Sales
    .route("/sales", get(sales::cached::<S, D, N>))
    .route("/sales/refresh", post(sales::refresh::<S, D, N>))
    .route("/sales/summary", get(sales::summary::<S, D, N>))
    .route("/sales/daily", get(sales::cached_daily::<S, D, N>))
    .route("/sales/daily/refresh", post(sales::refresh_daily::<S, D, N>))
    // Reviews
    .route("/reviews", get(reviews::cached::<S, D, N>))
    .route("/reviews/refresh", post(reviews::refresh::<S, D, N>))
    // Notifications and unread counters
    .route("/notifications", get(notifications::list::<S, D, N>))
    .route("/notifications/{id}/click", post(notifications::click::<S, D, N>))
    .route("/notifications/{id}/close", post(notifications::close::<S, D, N>))
    .route("/unread", get(notifications::unread::<S, D, N>))
    .route("/unread/acknowledge", post(notifications::acknowledge::<S, D, N>))
    // Manual cycle
    .route("/poll", post(poll::tick::<S, D, N>))
    .with_state(poller)
}
