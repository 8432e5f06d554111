//! The `SnapshotStore` trait and the fixed set of keys Tally persists.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Values are opaque JSON; typed access lives in [`crate::state`].

use std::future::Future;

use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::snapshot::Track;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Every key Tally reads or writes. The string form is the persisted key.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum StoreKey {
  /// [`crate::snapshot::BaselineSnapshot`] for the sales track.
  SalesBaseline,
  /// Newest sale timestamp already notified.
  SaleWatermark,
  /// Newest review creation time already notified.
  ReviewWatermark,
  UnreadSales,
  UnreadReviews,
  /// Set once the sales track has been seeded without notifications.
  SalesSeeded,
  ReviewsSeeded,
  /// When the first install-time seeding ran.
  InstalledAt,
  /// Last fetched payloads, served to the UI surface.
  CachedSales,
  CachedReviews,
  CachedDaily,
}

impl StoreKey {
  pub fn watermark(track: Track) -> Self {
    match track {
      Track::Sales => Self::SaleWatermark,
      Track::Reviews => Self::ReviewWatermark,
    }
  }

  pub fn unread(track: Track) -> Self {
    match track {
      Track::Sales => Self::UnreadSales,
      Track::Reviews => Self::UnreadReviews,
    }
  }

  pub fn seeded(track: Track) -> Self {
    match track {
      Track::Sales => Self::SalesSeeded,
      Track::Reviews => Self::ReviewsSeeded,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable key/value state that survives process restarts.
///
/// No method may be served from a cache populated at startup: every read
/// reflects the latest persisted value, since several polls can be in flight
/// at once.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read one key. `None` if it was never written.
  fn get(
    &self,
    key: StoreKey,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_;

  /// Write several keys atomically.
  fn set(
    &self,
    entries: Vec<(StoreKey, Value)>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomic read-modify-write of one key: `f` receives the currently
  /// persisted value and returns its replacement. Returns the value `f` saw.
  ///
  /// Concurrent updates of the same key are serialised; none is lost.
  fn update<F>(
    &self,
    key: StoreKey,
    f: F,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + '_
  where
    F: FnOnce(Option<Value>) -> Value + Send + 'static;
}
