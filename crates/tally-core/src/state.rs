//! Typed access to a [`SnapshotStore`].
//!
//! Watermarks and counters are only ever changed through
//! [`SnapshotStore::update`], so concurrent polls apply their changes against
//! the latest persisted value instead of one read earlier.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
  Error, Result,
  snapshot::{Track, UnreadCounters},
  store::{SnapshotStore, StoreKey},
};

/// Read and decode one key. A value that no longer decodes is an error,
/// never silently replaced.
pub async fn read<S, T>(store: &S, key: StoreKey) -> Result<Option<T>>
where
  S: SnapshotStore,
  T: DeserializeOwned,
{
  let raw = store.get(key).await.map_err(Error::store)?;
  raw.map(serde_json::from_value).transpose().map_err(Error::from)
}

/// Encode a value for [`SnapshotStore::set`].
pub fn entry<T: Serialize>(key: StoreKey, value: &T) -> Result<(StoreKey, Value)> {
  Ok((key, serde_json::to_value(value)?))
}

pub async fn write<S: SnapshotStore>(
  store: &S,
  entries: Vec<(StoreKey, Value)>,
) -> Result<()> {
  store.set(entries).await.map_err(Error::store)
}

pub async fn watermark<S: SnapshotStore>(
  store: &S,
  track: Track,
) -> Result<Option<DateTime<Utc>>> {
  read(store, StoreKey::watermark(track)).await
}

/// Move a watermark forward to `candidate`; never backward.
///
/// Returns the watermark as it was immediately before this call. The caller
/// that observes `previous < candidate` is the one that moved it.
pub async fn advance_watermark<S: SnapshotStore>(
  store: &S,
  track: Track,
  candidate: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
  let previous = store
    .update(StoreKey::watermark(track), move |current| {
      let current = current
        .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok());
      let next = current.map_or(candidate, |c| c.max(candidate));
      Value::String(next.to_rfc3339())
    })
    .await
    .map_err(Error::store)?;
  Ok(previous.and_then(|v| serde_json::from_value(v).ok()))
}

/// Add `delta` to a track's unread counter. Returns the new total.
pub async fn add_unread<S: SnapshotStore>(
  store: &S,
  track: Track,
  delta: u64,
) -> Result<u64> {
  let previous = store
    .update(StoreKey::unread(track), move |current| {
      let current = current.and_then(|v| v.as_u64()).unwrap_or(0);
      Value::from(current.saturating_add(delta))
    })
    .await
    .map_err(Error::store)?;
  let previous = previous.and_then(|v| v.as_u64()).unwrap_or(0);
  Ok(previous.saturating_add(delta))
}

pub async fn unread<S: SnapshotStore>(store: &S) -> Result<UnreadCounters> {
  Ok(UnreadCounters {
    sales:   read(store, StoreKey::UnreadSales).await?.unwrap_or(0),
    reviews: read(store, StoreKey::UnreadReviews).await?.unwrap_or(0),
  })
}

pub async fn reset_unread<S: SnapshotStore>(store: &S) -> Result<()> {
  write(
    store,
    vec![
      (StoreKey::UnreadSales, Value::from(0u64)),
      (StoreKey::UnreadReviews, Value::from(0u64)),
    ],
  )
  .await
}

pub async fn is_seeded<S: SnapshotStore>(store: &S, track: Track) -> Result<bool> {
  Ok(read(store, StoreKey::seeded(track)).await?.unwrap_or(false))
}
