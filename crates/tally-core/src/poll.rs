//! The poll orchestrator: every entry point a timer or UI surface can call.
//!
//! # Cycle
//!
//! Each trigger runs the sales and reviews tracks independently:
//!
//! ```text
//! fetch ──► auth failure ──► raise session-expired alert, stop
//!   │
//!   ├─────► network / malformed ──► stop (baseline untouched)
//!   │
//!   ▼
//! clear session alert, cache payload
//!   │
//!   ├─► track never seeded ──► store baseline + watermark, no alerts
//!   ▼
//! detect ──► claim watermark ──► store baseline ──► dispatch (if claimed)
//! ```
//!
//! Claiming the watermark is an atomic read-modify-write. Only the cycle that
//! actually moves it forward dispatches, so two overlapping polls that see
//! the same new data raise one batch between them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  detect::{detect_reviews, detect_sales, newest_review},
  dispatch::Dispatcher,
  notify::{Notification, NotificationKind, NotificationSurface},
  record::{DailySales, ReviewRecord, SaleRecord},
  snapshot::{BaselineSnapshot, Track, UnreadCounters, newest_sale},
  source::{DataSource, FetchError},
  state,
  store::{SnapshotStore, StoreKey},
  summary::{self, SalesSummary},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
  /// Reviews requested per poll (first page only).
  pub review_page_size: u32,
  /// Opened when a sale notification is clicked.
  pub sales_url:        String,
  /// Opened when a review notification is clicked.
  pub reviews_url:      String,
  /// Opened when the session-expired alert is clicked.
  pub login_url:        String,
}

impl Default for PollConfig {
  fn default() -> Self {
    Self {
      review_page_size: 100,
      sales_url:        "https://publisher.unity.com/sales".into(),
      reviews_url:      "https://publisher.unity.com/reviews".into(),
      login_url:        "https://publisher.unity.com/sales".into(),
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// How one track of one cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TrackOutcome {
  /// Baseline and watermark established; nothing raised.
  Seeded,
  /// New data found and this many events dispatched.
  Notified(usize),
  Unchanged,
  SessionExpired,
  NetworkFailure(String),
  Malformed(String),
  /// Store or surface failure.
  Failed(String),
}

impl TrackOutcome {
  fn from_cycle(track: Track, result: Result<TrackOutcome>) -> Self {
    match result {
      Ok(outcome) => outcome,
      Err(Error::SessionExpired) => {
        warn!(%track, "publisher session expired");
        Self::SessionExpired
      }
      Err(Error::Network(msg)) => {
        warn!(%track, error = %msg, "poll failed; retrying next interval");
        Self::NetworkFailure(msg)
      }
      Err(Error::Malformed(msg)) => {
        warn!(%track, error = %msg, "malformed response; cycle skipped");
        Self::Malformed(msg)
      }
      Err(e) => {
        error!(%track, error = %e, "poll cycle failed");
        Self::Failed(e.to_string())
      }
    }
  }
}

/// Result of a scheduled or startup cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
  pub sales:   TrackOutcome,
  pub reviews: TrackOutcome,
}

// ─── Poller ──────────────────────────────────────────────────────────────────

/// Ties a data source, a snapshot store and a notification surface together.
///
/// Holds no state of its own; everything lives in the store, so any number
/// of cycles may run concurrently on one `Poller`.
pub struct Poller<S, D, N> {
  store:   S,
  source:  D,
  surface: N,
  config:  PollConfig,
}

impl<S, D, N> Poller<S, D, N>
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  pub fn new(store: S, source: D, surface: N, config: PollConfig) -> Self {
    Self { store, source, surface, config }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn source(&self) -> &D { &self.source }

  pub fn surface(&self) -> &N { &self.surface }

  pub fn config(&self) -> &PollConfig { &self.config }

  fn dispatcher(&self) -> Dispatcher<'_, S, N> {
    Dispatcher::new(&self.store, &self.surface)
  }

  // ── Timer entry points ──────────────────────────────────────────────────

  /// One scheduled cycle over both tracks. Never fails; failures are logged
  /// and reported per track, and the next tick retries.
  pub async fn on_poll_tick(&self) -> TickReport {
    let (sales, reviews) =
      tokio::join!(self.sales_cycle(false), self.reviews_cycle(false));
    let report = TickReport {
      sales:   TrackOutcome::from_cycle(Track::Sales, sales.map(|(_, o)| o)),
      reviews: TrackOutcome::from_cycle(Track::Reviews, reviews.map(|(_, o)| o)),
    };
    debug!(?report, "poll tick finished");
    report
  }

  /// Called once when the process starts. A store that was never installed
  /// is seeded; otherwise this is an ordinary tick.
  pub async fn on_process_start(&self) -> Result<TickReport> {
    let installed: Option<DateTime<Utc>> =
      state::read(&self.store, StoreKey::InstalledAt).await?;
    match installed {
      None => self.on_install().await,
      Some(at) => {
        info!(installed_at = %at, "resuming");
        Ok(self.on_poll_tick().await)
      }
    }
  }

  /// First-run seeding: one fetch per track establishes the baseline and
  /// watermark without raising anything. A track whose fetch fails here is
  /// seeded lazily by its next successful cycle.
  pub async fn on_install(&self) -> Result<TickReport> {
    let now = Utc::now();
    state::write(&self.store, vec![state::entry(StoreKey::InstalledAt, &now)?])
      .await?;
    info!("installing: seeding baselines");
    let (sales, reviews) =
      tokio::join!(self.sales_cycle(true), self.reviews_cycle(true));
    Ok(TickReport {
      sales:   TrackOutcome::from_cycle(Track::Sales, sales.map(|(_, o)| o)),
      reviews: TrackOutcome::from_cycle(Track::Reviews, reviews.map(|(_, o)| o)),
    })
  }

  // ── Manual triggers ─────────────────────────────────────────────────────

  /// Fetch sales now, running detection as a scheduled tick would. Unlike a
  /// tick, failures are returned to the caller.
  pub async fn request_fresh_sales(&self) -> Result<Vec<SaleRecord>> {
    let (rows, outcome) = self.sales_cycle(false).await?;
    debug!(?outcome, "manual sales refresh");
    Ok(rows)
  }

  pub async fn request_fresh_reviews(&self) -> Result<Vec<ReviewRecord>> {
    let (rows, outcome) = self.reviews_cycle(false).await?;
    debug!(?outcome, "manual reviews refresh");
    Ok(rows)
  }

  /// Fetch per-day statistics for the current month.
  pub async fn request_daily_sales(&self) -> Result<DailySales> {
    let (start, end) = summary::month_bounds(Utc::now().date_naive());
    let daily = self.guard(self.source.fetch_daily(start, end).await).await?;
    state::write(&self.store, vec![state::entry(StoreKey::CachedDaily, &daily)?])
      .await?;
    Ok(daily)
  }

  // ── Cached reads ────────────────────────────────────────────────────────

  pub async fn cached_sales(&self) -> Result<Vec<SaleRecord>> {
    Ok(state::read(&self.store, StoreKey::CachedSales).await?.unwrap_or_default())
  }

  pub async fn cached_reviews(&self) -> Result<Vec<ReviewRecord>> {
    Ok(
      state::read(&self.store, StoreKey::CachedReviews)
        .await?
        .unwrap_or_default(),
    )
  }

  /// The cached daily statistics, if they cover the current month.
  pub async fn cached_daily(&self) -> Result<Option<DailySales>> {
    let daily: Option<DailySales> =
      state::read(&self.store, StoreKey::CachedDaily).await?;
    let today = Utc::now().date_naive();
    Ok(daily.filter(|d| summary::daily_covers_month(d, today)))
  }

  /// Month-to-date summary over the cached sales report.
  pub async fn summary(&self, today: NaiveDate) -> Result<SalesSummary> {
    Ok(summary::summarize(&self.cached_sales().await?, today))
  }

  pub async fn unread(&self) -> Result<UnreadCounters> { state::unread(&self.store).await }

  pub async fn notifications(&self) -> Result<Vec<Notification>> {
    self.surface.outstanding().await.map_err(Error::surface)
  }

  // ── Acknowledgment ──────────────────────────────────────────────────────

  /// The user looked at the data: reset both counters and clear outstanding
  /// sale and review notifications.
  pub async fn acknowledge_unread(&self) -> Result<()> {
    self.dispatcher().acknowledge().await?;
    info!("unread counters acknowledged");
    Ok(())
  }

  /// Handle a click on a notification. Returns the page to open.
  pub async fn on_notification_clicked(&self, id: &str) -> Result<String> {
    let kind = NotificationKind::from_id(id)
      .ok_or_else(|| Error::UnknownNotification(id.to_owned()))?;
    self.surface.clear(id).await.map_err(Error::surface)?;
    if kind.counts_as_unread() {
      self.acknowledge_unread().await?;
    }
    Ok(self.url_for(kind).to_owned())
  }

  /// Handle a notification being closed. Only a close by the user counts as
  /// acknowledgment; expiry or replacement by the system does not.
  pub async fn on_notification_closed(&self, id: &str, by_user: bool) -> Result<()> {
    let kind = NotificationKind::from_id(id)
      .ok_or_else(|| Error::UnknownNotification(id.to_owned()))?;
    self.surface.clear(id).await.map_err(Error::surface)?;
    if by_user && kind.counts_as_unread() {
      self.acknowledge_unread().await?;
    }
    Ok(())
  }

  fn url_for(&self, kind: NotificationKind) -> &str {
    match kind {
      NotificationKind::Sale => &self.config.sales_url,
      NotificationKind::Review => &self.config.reviews_url,
      NotificationKind::SessionExpired => &self.config.login_url,
    }
  }

  // ── Tracks ──────────────────────────────────────────────────────────────

  /// Route a fetch result through the session-expired alert lifecycle.
  async fn guard<T>(&self, fetched: std::result::Result<T, FetchError>) -> Result<T> {
    let dispatcher = self.dispatcher();
    match fetched {
      Ok(value) => {
        if dispatcher.clear_session_expired().await? {
          info!("publisher session restored");
        }
        Ok(value)
      }
      Err(FetchError::Auth) => {
        dispatcher.notify_session_expired(Utc::now()).await?;
        Err(Error::SessionExpired)
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn sales_cycle(&self, seed: bool) -> Result<(Vec<SaleRecord>, TrackOutcome)> {
    let now = Utc::now();
    let period = summary::period_start(now.date_naive());
    let rows = self.guard(self.source.fetch_sales(period).await).await?;
    state::write(&self.store, vec![state::entry(StoreKey::CachedSales, &rows)?])
      .await?;

    if seed || !state::is_seeded(&self.store, Track::Sales).await? {
      self.seed_sales(&rows).await?;
      return Ok((rows, TrackOutcome::Seeded));
    }

    let baseline: BaselineSnapshot = state::read(&self.store, StoreKey::SalesBaseline)
      .await?
      .unwrap_or_default();
    let watermark = state::watermark(&self.store, Track::Sales).await?;
    let delta = detect_sales(&rows, &baseline, watermark);

    let claimed = match (delta.events.is_empty(), delta.newest) {
      (false, Some(newest)) => {
        let previous =
          state::advance_watermark(&self.store, Track::Sales, newest).await?;
        previous < Some(newest)
      }
      _ => false,
    };
    state::write(
      &self.store,
      vec![state::entry(StoreKey::SalesBaseline, &delta.snapshot)?],
    )
    .await?;

    if !claimed {
      debug!(rows = rows.len(), "no new sales");
      return Ok((rows, TrackOutcome::Unchanged));
    }
    self.dispatcher().notify_sales(&delta.events, now).await?;
    info!(events = delta.events.len(), "new sales");
    let outcome = TrackOutcome::Notified(delta.events.len());
    Ok((rows, outcome))
  }

  async fn seed_sales(&self, rows: &[SaleRecord]) -> Result<()> {
    if let Some(newest) = newest_sale(rows) {
      state::advance_watermark(&self.store, Track::Sales, newest).await?;
    }
    let baseline = BaselineSnapshot::from_records(rows);
    state::write(
      &self.store,
      vec![
        state::entry(StoreKey::SalesBaseline, &baseline)?,
        state::entry(StoreKey::SalesSeeded, &true)?,
      ],
    )
    .await?;
    info!(lines = baseline.len(), "sales baseline seeded");
    Ok(())
  }

  async fn reviews_cycle(
    &self,
    seed: bool,
  ) -> Result<(Vec<ReviewRecord>, TrackOutcome)> {
    let now = Utc::now();
    let fetched = self.source.fetch_reviews(1, self.config.review_page_size).await;
    let rows = self.guard(fetched).await?;
    state::write(&self.store, vec![state::entry(StoreKey::CachedReviews, &rows)?])
      .await?;

    if seed || !state::is_seeded(&self.store, Track::Reviews).await? {
      if let Some(newest) = newest_review(&rows) {
        state::advance_watermark(&self.store, Track::Reviews, newest).await?;
      }
      state::write(
        &self.store,
        vec![state::entry(StoreKey::ReviewsSeeded, &true)?],
      )
      .await?;
      info!(reviews = rows.len(), "review watermark seeded");
      return Ok((rows, TrackOutcome::Seeded));
    }

    let watermark = state::watermark(&self.store, Track::Reviews).await?;
    let delta = detect_reviews(&rows, watermark);
    let Some(newest) = delta.events.last().map(|e| e.review.created_at) else {
      debug!(reviews = rows.len(), "no new reviews");
      return Ok((rows, TrackOutcome::Unchanged));
    };

    // A concurrent cycle may have claimed part of this range already; only
    // what lies beyond the watermark it left is ours.
    let previous =
      state::advance_watermark(&self.store, Track::Reviews, newest).await?;
    let events: Vec<_> = delta
      .events
      .into_iter()
      .filter(|e| Some(e.review.created_at) > previous)
      .collect();
    if events.is_empty() {
      return Ok((rows, TrackOutcome::Unchanged));
    }

    self.dispatcher().notify_reviews(&events, now).await?;
    info!(events = events.len(), "new reviews");
    Ok((rows, TrackOutcome::Notified(events.len())))
  }
}
