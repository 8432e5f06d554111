//! In-memory fakes for orchestrator tests.
//!
//! Every store and source operation yields to the scheduler once, so
//! concurrently driven cycles interleave at each suspension point the way
//! they would against real I/O.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::Mutex,
};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::{
  notify::{Notification, NotificationSurface},
  poll::{PollConfig, Poller},
  record::{DailySales, ReviewRecord, SaleRecord},
  source::{DataSource, FetchError},
  store::{SnapshotStore, StoreKey},
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

/// A fixed instant plus `offset_secs`.
pub fn t(offset_secs: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(offset_secs)
}

pub fn sale(item: &str, price_cents: i64, units: u64, last: i64) -> SaleRecord {
  SaleRecord {
    item_id: item.into(),
    name: format!("Asset {item}"),
    price_cents,
    units_sold: units,
    refunds: 0,
    gross_cents: price_cents * units as i64,
    revenue_cents: price_cents * units as i64 * 7 / 10,
    first_sale_at: Some(t(0)),
    last_sale_at: Some(t(last)),
  }
}

pub fn review(id: &str, at: i64) -> ReviewRecord {
  ReviewRecord {
    review_id:  id.into(),
    item_id:    "1".into(),
    item_name:  "Asset 1".into(),
    rating:     4,
    subject:    format!("Review {id}"),
    body:       "Does what it says.".into(),
    created_at: t(at),
  }
}

pub type TestPoller = Poller<MemoryStore, FakeSource, MemorySurface>;

pub fn poller() -> TestPoller {
  Poller::new(
    MemoryStore::default(),
    FakeSource::default(),
    MemorySurface::default(),
    PollConfig::default(),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<StoreKey, Value>>,
}

impl MemoryStore {
  pub fn raw(&self, key: StoreKey) -> Option<Value> {
    self.values.lock().unwrap().get(&key).cloned()
  }
}

impl SnapshotStore for MemoryStore {
  type Error = Infallible;

  fn get(
    &self,
    key: StoreKey,
  ) -> impl Future<Output = Result<Option<Value>, Infallible>> + Send + '_ {
    async move {
      tokio::task::yield_now().await;
      Ok(self.raw(key))
    }
  }

  fn set(
    &self,
    entries: Vec<(StoreKey, Value)>,
  ) -> impl Future<Output = Result<(), Infallible>> + Send + '_ {
    async move {
      tokio::task::yield_now().await;
      self.values.lock().unwrap().extend(entries);
      Ok(())
    }
  }

  fn update<F>(
    &self,
    key: StoreKey,
    f: F,
  ) -> impl Future<Output = Result<Option<Value>, Infallible>> + Send + '_
  where
    F: FnOnce(Option<Value>) -> Value + Send + 'static,
  {
    async move {
      tokio::task::yield_now().await;
      let mut values = self.values.lock().unwrap();
      let previous = values.get(&key).cloned();
      values.insert(key, f(previous.clone()));
      Ok(previous)
    }
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Serves whatever was last loaded into it, or a scripted failure.
#[derive(Default)]
pub struct FakeSource {
  sales:         Mutex<Vec<SaleRecord>>,
  reviews:       Mutex<Vec<ReviewRecord>>,
  daily:         Mutex<DailySales>,
  failure:       Mutex<Option<FetchError>>,
  pub requested: Mutex<Vec<String>>,
}

impl FakeSource {
  pub fn load_sales(&self, rows: Vec<SaleRecord>) { *self.sales.lock().unwrap() = rows; }

  pub fn load_reviews(&self, rows: Vec<ReviewRecord>) {
    *self.reviews.lock().unwrap() = rows;
  }

  pub fn load_daily(&self, daily: DailySales) { *self.daily.lock().unwrap() = daily; }

  /// Fail every fetch with `e` until [`FakeSource::recover`].
  pub fn fail(&self, e: FetchError) { *self.failure.lock().unwrap() = Some(e); }

  pub fn recover(&self) { *self.failure.lock().unwrap() = None; }

  fn serve<T: Clone>(&self, call: String, data: &Mutex<T>) -> Result<T, FetchError> {
    self.requested.lock().unwrap().push(call);
    match self.failure.lock().unwrap().clone() {
      Some(e) => Err(e),
      None => Ok(data.lock().unwrap().clone()),
    }
  }
}

impl DataSource for FakeSource {
  fn fetch_sales(
    &self,
    period_start: NaiveDate,
  ) -> impl Future<Output = Result<Vec<SaleRecord>, FetchError>> + Send + '_ {
    async move {
      tokio::task::yield_now().await;
      self.serve(format!("sales {period_start}"), &self.sales)
    }
  }

  fn fetch_reviews(
    &self,
    page: u32,
    page_size: u32,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, FetchError>> + Send + '_ {
    async move {
      tokio::task::yield_now().await;
      self.serve(format!("reviews {page}/{page_size}"), &self.reviews)
    }
  }

  fn fetch_daily(
    &self,
    start: NaiveDate,
    end: NaiveDate,
  ) -> impl Future<Output = Result<DailySales, FetchError>> + Send + '_ {
    async move {
      tokio::task::yield_now().await;
      self.serve(format!("daily {start}..{end}"), &self.daily)
    }
  }
}

// ─── Surface ─────────────────────────────────────────────────────────────────

/// Keeps outstanding notifications plus a log of everything ever raised.
#[derive(Default)]
pub struct MemorySurface {
  outstanding: Mutex<Vec<Notification>>,
  history:     Mutex<Vec<Notification>>,
}

impl MemorySurface {
  pub fn history(&self) -> Vec<Notification> { self.history.lock().unwrap().clone() }

  pub fn shown(&self) -> Vec<Notification> { self.outstanding.lock().unwrap().clone() }
}

impl NotificationSurface for MemorySurface {
  type Error = Infallible;

  fn raise(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Infallible>> + Send + '_ {
    async move {
      self.history.lock().unwrap().push(notification.clone());
      let mut outstanding = self.outstanding.lock().unwrap();
      outstanding.retain(|n| n.id != notification.id);
      outstanding.push(notification);
      Ok(())
    }
  }

  fn clear<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Infallible>> + Send + 'a {
    async move {
      let mut outstanding = self.outstanding.lock().unwrap();
      let before = outstanding.len();
      outstanding.retain(|n| n.id != id);
      Ok(outstanding.len() != before)
    }
  }

  fn outstanding(
    &self,
  ) -> impl Future<Output = Result<Vec<Notification>, Infallible>> + Send + '_ {
    async move { Ok(self.shown()) }
  }
}
