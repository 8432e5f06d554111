//! Notification dispatch: change events → alerts + unread counters.
//!
//! # Sales batching
//!
//! | Events | Notifications |
//! |--------|---------------|
//! | one, quantity 1 | one: `name — 1 × $price` |
//! | one, quantity n | one: `name — n × $price` |
//! | several | one summary listing up to [`MAX_LISTED_SALES`] lines |
//!
//! A single event is never split into one alert per unit.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
  Error, Result,
  detect::{ReviewEvent, SaleEvent},
  notify::{Notification, NotificationKind, NotificationSurface},
  record::format_cents,
  snapshot::Track,
  state,
  store::SnapshotStore,
};

/// Lines listed in a multi-item sales summary before truncating.
pub const MAX_LISTED_SALES: usize = 5;

/// Review bodies longer than this many characters are cut.
pub const MAX_REVIEW_BODY_CHARS: usize = 2000;

// ─── Rendering ───────────────────────────────────────────────────────────────

fn sale_line(e: &SaleEvent) -> String {
  format!("{} — {} × {}", e.name, e.quantity, format_cents(e.price_cents))
}

/// Render one poll's sales events as a single notification.
pub fn render_sales(events: &[SaleEvent], now: DateTime<Utc>) -> Option<Notification> {
  match events {
    [] => None,
    [single] => Some(Notification::new(
      NotificationKind::Sale,
      "New sale!",
      sale_line(single),
      now,
    )),
    many => {
      let total: u64 = many.iter().map(|e| e.quantity).sum();
      let title = format!("{} new sales • {total} assets sold", many.len());
      let mut lines: Vec<String> =
        many.iter().take(MAX_LISTED_SALES).map(sale_line).collect();
      if many.len() > MAX_LISTED_SALES {
        lines.push(format!("…and {} more", many.len() - MAX_LISTED_SALES));
      }
      Some(Notification::new(NotificationKind::Sale, title, lines.join("\n"), now))
    }
  }
}

/// `rating` filled stars, clamped to 0–5. A dash stands in for zero.
pub fn star_glyphs(rating: i64) -> String {
  match rating.clamp(0, 5) {
    0 => "–".to_owned(),
    n => "★".repeat(n as usize),
  }
}

/// Cut `body` to `max` characters, marking the cut with an ellipsis.
pub fn truncate_body(body: &str, max: usize) -> String {
  match body.char_indices().nth(max) {
    Some((cut, _)) => format!("{}…", &body[..cut]),
    None => body.to_owned(),
  }
}

pub fn render_review(event: &ReviewEvent, now: DateTime<Utc>) -> Notification {
  let r = &event.review;
  Notification::new(
    NotificationKind::Review,
    format!("{}  {}", star_glyphs(r.rating), r.subject),
    truncate_body(&r.body, MAX_REVIEW_BODY_CHARS),
    now,
  )
}

pub fn render_session_expired(now: DateTime<Utc>) -> Notification {
  Notification::new(
    NotificationKind::SessionExpired,
    "Publisher session expired",
    "Click to log in again.",
    now,
  )
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Raises notifications on a surface and keeps the unread counters in step.
pub struct Dispatcher<'a, S, N> {
  store:   &'a S,
  surface: &'a N,
}

impl<'a, S, N> Dispatcher<'a, S, N>
where
  S: SnapshotStore,
  N: NotificationSurface,
{
  pub fn new(store: &'a S, surface: &'a N) -> Self { Self { store, surface } }

  async fn raise(&self, notification: Notification) -> Result<()> {
    info!(
      id = %notification.id,
      kind = %notification.kind,
      title = %notification.title,
      "raising notification"
    );
    self.surface.raise(notification).await.map_err(Error::surface)
  }

  /// Notify a batch of sales events. Unread sales grow by the total quantity.
  pub async fn notify_sales(
    &self,
    events: &[SaleEvent],
    now: DateTime<Utc>,
  ) -> Result<Vec<Notification>> {
    let Some(notification) = render_sales(events, now) else {
      return Ok(Vec::new());
    };
    self.raise(notification.clone()).await?;
    let quantity = events.iter().map(|e| e.quantity).sum();
    state::add_unread(self.store, Track::Sales, quantity).await?;
    Ok(vec![notification])
  }

  /// One notification per review, in the order given. Unread reviews grow by
  /// one per review.
  pub async fn notify_reviews(
    &self,
    events: &[ReviewEvent],
    now: DateTime<Utc>,
  ) -> Result<Vec<Notification>> {
    let mut raised = Vec::with_capacity(events.len());
    for event in events {
      let notification = render_review(event, now);
      self.raise(notification.clone()).await?;
      state::add_unread(self.store, Track::Reviews, 1).await?;
      raised.push(notification);
    }
    Ok(raised)
  }

  /// Raise the session-expired alert unless one is already outstanding.
  /// Returns whether a new alert was raised.
  pub async fn notify_session_expired(&self, now: DateTime<Utc>) -> Result<bool> {
    let outstanding = self.surface.outstanding().await.map_err(Error::surface)?;
    if outstanding
      .iter()
      .any(|n| n.kind == NotificationKind::SessionExpired)
    {
      return Ok(false);
    }
    self.raise(render_session_expired(now)).await?;
    Ok(true)
  }

  /// Withdraw an outstanding session-expired alert after a successful fetch.
  pub async fn clear_session_expired(&self) -> Result<bool> {
    self
      .surface
      .clear(NotificationKind::SessionExpired.prefix())
      .await
      .map_err(Error::surface)
  }

  /// Reset both unread counters and clear every outstanding sale and review
  /// notification. Watermarks are untouched.
  pub async fn acknowledge(&self) -> Result<()> {
    state::reset_unread(self.store).await?;
    let outstanding = self.surface.outstanding().await.map_err(Error::surface)?;
    for n in outstanding.iter().filter(|n| n.kind.counts_as_unread()) {
      self.surface.clear(&n.id).await.map_err(Error::surface)?;
    }
    Ok(())
  }
}
