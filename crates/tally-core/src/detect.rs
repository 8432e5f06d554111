//! Delta detection: previous state + fresh poll → notification-worthy events.
//!
//! Both detectors are pure. They never touch the store; the orchestrator
//! reads their inputs and persists their outputs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  record::{ReviewRecord, SaleKey, SaleRecord},
  snapshot::{BaselineSnapshot, newest_sale},
};

// ─── Sales ───────────────────────────────────────────────────────────────────

/// Units sold on one sales line since the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleEvent {
  pub key:         SaleKey,
  pub name:        String,
  pub price_cents: i64,
  /// New cumulative count for the line.
  pub units_sold:  u64,
  /// Units added since the baseline; always positive.
  pub quantity:    u64,
}

/// Result of comparing a sales report against the stored baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesDelta {
  pub events:    Vec<SaleEvent>,
  /// The baseline to persist for the next comparison. Always the current
  /// report, whether or not events fired.
  pub snapshot:  BaselineSnapshot,
  /// Newest `last_sale_at` in the report.
  pub newest:    Option<DateTime<Utc>>,
  /// The watermark after this poll. Only moves when events fired.
  pub watermark: Option<DateTime<Utc>>,
}

/// Compare `current` against `baseline`.
///
/// Nothing is reported unless the report contains a sale newer than
/// `watermark`. Counters that went down (refund corrections) count as zero.
/// Events are ordered by first appearance in `current`.
pub fn detect_sales(
  current: &[SaleRecord],
  baseline: &BaselineSnapshot,
  watermark: Option<DateTime<Utc>>,
) -> SalesDelta {
  let snapshot = BaselineSnapshot::from_records(current);
  let newest = newest_sale(current);

  if newest <= watermark {
    return SalesDelta { events: Vec::new(), snapshot, newest, watermark };
  }

  let mut seen = HashSet::new();
  let events: Vec<SaleEvent> = current
    .iter()
    .map(SaleRecord::key)
    .filter(|key| seen.insert(key.clone()))
    .filter_map(|key| {
      let now = snapshot.get(&key)?;
      let before = baseline.get(&key).map_or(0, |b| b.units_sold);
      let quantity = now.units_sold.saturating_sub(before);
      (quantity > 0).then(|| SaleEvent {
        name: now.name.clone(),
        price_cents: now.price_cents,
        units_sold: now.units_sold,
        quantity,
        key,
      })
    })
    .collect();

  let watermark = if events.is_empty() { watermark } else { newest.max(watermark) };
  SalesDelta { events, snapshot, newest, watermark }
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// A review newer than the review watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEvent {
  pub review: ReviewRecord,
}

/// Result of filtering a review page against the review watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewsDelta {
  /// New reviews, oldest first.
  pub events:    Vec<ReviewEvent>,
  pub watermark: Option<DateTime<Utc>>,
}

/// Select reviews created after `watermark`, oldest first.
///
/// Reviews are identified by `review_id`; a review repeated across the page
/// is reported once. Ties on `created_at` are broken by id so the order is
/// stable.
pub fn detect_reviews(
  current: &[ReviewRecord],
  watermark: Option<DateTime<Utc>>,
) -> ReviewsDelta {
  let mut seen = HashSet::new();
  let mut fresh: Vec<&ReviewRecord> = current
    .iter()
    .filter(|r| Some(r.created_at) > watermark)
    .filter(|r| seen.insert(r.review_id.clone()))
    .collect();
  fresh.sort_by(|a, b| {
    a.created_at
      .cmp(&b.created_at)
      .then_with(|| a.review_id.cmp(&b.review_id))
  });

  let newest = fresh.last().map(|r| r.created_at);
  ReviewsDelta {
    watermark: newest.max(watermark),
    events:    fresh
      .into_iter()
      .map(|r| ReviewEvent { review: r.clone() })
      .collect(),
  }
}

/// Newest `created_at` across a review page.
pub fn newest_review(rows: &[ReviewRecord]) -> Option<DateTime<Utc>> {
  rows.iter().map(|r| r.created_at).max()
}
