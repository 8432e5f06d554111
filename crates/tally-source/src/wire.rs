//! Dashboard response shapes and their conversion into core records.
//!
//! The dashboard is loose with types: money arrives as strings or numbers,
//! counters sometimes as strings, timestamps in more than one format. Every
//! field is therefore read as a raw [`Value`] and interpreted here.
//!
//! Sales and review pages are all-or-nothing. A row missing its identity or
//! carrying an unreadable counter makes the whole response malformed, since a
//! partial page would otherwise replace the stored baseline.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tally_core::{
  record::{
    DailySales, DailyStats, ReviewRecord, SaleRecord, cents_from_f64, parse_cents,
  },
  source::FetchError,
};
use tracing::warn;

// ─── Field interpretation ────────────────────────────────────────────────────

fn text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn cents(v: &Value) -> Option<i64> {
  match v {
    Value::String(s) => parse_cents(s),
    Value::Number(n) => n.as_f64().map(cents_from_f64),
    _ => None,
  }
}

fn count(v: &Value) -> Option<u64> {
  match v {
    Value::Number(n) => n
      .as_u64()
      .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// Like [`count`], but an absent field reads as zero.
fn optional_count(v: &Value) -> Option<u64> {
  if v.is_null() { Some(0) } else { count(v) }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC), or a bare date (midnight UTC).
pub fn timestamp(v: &Value) -> Option<DateTime<Utc>> {
  let s = v.as_str()?.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(naive.and_utc());
    }
  }
  let date = NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()?;
  Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn malformed(what: &str, e: serde_json::Error) -> FetchError {
  FetchError::Malformed(format!("{what}: {e}"))
}

fn bad_row(what: &str, index: usize, why: &str) -> FetchError {
  warn!(index, why, "rejecting {what} response");
  FetchError::Malformed(format!("{what} row {index}: {why}"))
}

// ─── Sales ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireSale {
  #[serde(default, alias = "packageId")]
  package_id: Value,
  #[serde(default, alias = "package_name")]
  name:       Value,
  #[serde(default)]
  price:      Value,
  #[serde(default)]
  sales:      Value,
  #[serde(default)]
  refunds:    Value,
  #[serde(default)]
  gross:      Value,
  #[serde(default)]
  revenue:    Value,
  #[serde(default)]
  first:      Value,
  #[serde(default)]
  last:       Value,
}

impl WireSale {
  fn into_record(self) -> Result<SaleRecord, &'static str> {
    let item_id = text(&self.package_id).ok_or("missing package id")?;
    let price_cents = cents(&self.price).ok_or("missing or invalid price")?;
    let units_sold = count(&self.sales).ok_or("missing or invalid sales count")?;
    let refunds = optional_count(&self.refunds).ok_or("invalid refund count")?;
    Ok(SaleRecord {
      name: text(&self.name).unwrap_or_else(|| item_id.clone()),
      price_cents,
      units_sold,
      refunds,
      gross_cents: cents(&self.gross).unwrap_or(0),
      revenue_cents: cents(&self.revenue).unwrap_or(0),
      first_sale_at: timestamp(&self.first),
      last_sale_at: timestamp(&self.last),
      item_id,
    })
  }
}

/// Decode the monthly sales report: a JSON array of rows.
pub fn decode_sales(body: &str) -> Result<Vec<SaleRecord>, FetchError> {
  let rows: Vec<WireSale> =
    serde_json::from_str(body).map_err(|e| malformed("sales report", e))?;
  rows
    .into_iter()
    .enumerate()
    .map(|(i, row)| row.into_record().map_err(|why| bad_row("sales", i, why)))
    .collect()
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireReviewPage {
  #[serde(default)]
  results: Option<Vec<WireReview>>,
}

#[derive(Debug, Deserialize)]
struct WireReview {
  #[serde(default, alias = "reviewId", alias = "review_id")]
  id:           Value,
  #[serde(default, alias = "package_id")]
  #[serde(rename = "packageId")]
  package_id:   Value,
  #[serde(default, alias = "package_name")]
  #[serde(rename = "packageName")]
  package_name: Value,
  #[serde(default)]
  rating:       Value,
  #[serde(default)]
  subject:      Value,
  #[serde(default)]
  body:         Value,
  #[serde(default, alias = "created_time", alias = "createdAt")]
  #[serde(rename = "createdTime")]
  created_time: Value,
}

impl WireReview {
  fn into_record(self) -> Result<ReviewRecord, &'static str> {
    let review_id = text(&self.id).ok_or("missing review id")?;
    let created_at =
      timestamp(&self.created_time).ok_or("missing or invalid creation time")?;
    let rating = match &self.rating {
      Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
    .unwrap_or(0);
    Ok(ReviewRecord {
      review_id,
      item_id: text(&self.package_id).unwrap_or_default(),
      item_name: text(&self.package_name).unwrap_or_default(),
      rating,
      subject: text(&self.subject).unwrap_or_else(|| "No Subject".into()),
      body: self.body.as_str().unwrap_or_default().to_owned(),
      created_at,
    })
  }
}

/// Decode one review list page: `{"results": [...]}`. A page without a
/// `results` array holds no reviews.
pub fn decode_reviews(body: &str) -> Result<Vec<ReviewRecord>, FetchError> {
  let page: WireReviewPage =
    serde_json::from_str(body).map_err(|e| malformed("review list", e))?;
  page
    .results
    .unwrap_or_default()
    .into_iter()
    .enumerate()
    .map(|(i, row)| row.into_record().map_err(|why| bad_row("review", i, why)))
    .collect()
}

// ─── Daily ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireDaily {
  gross:         Value,
  sales:         Value,
  refunds:       Value,
  chargebacks:   Value,
  downloads:     Value,
  page_views:    Value,
  quick_looks:   Value,
  wishlisted:    Value,
  carted:        Value,
  free_obtained: Value,
  count_ratings: Value,
}

impl From<WireDaily> for DailyStats {
  fn from(w: WireDaily) -> Self {
    Self {
      gross_cents:   cents(&w.gross).unwrap_or(0),
      sales:         count(&w.sales).unwrap_or(0),
      refunds:       count(&w.refunds).unwrap_or(0),
      chargebacks:   count(&w.chargebacks).unwrap_or(0),
      downloads:     count(&w.downloads).unwrap_or(0),
      page_views:    count(&w.page_views).unwrap_or(0),
      quick_looks:   count(&w.quick_looks).unwrap_or(0),
      wishlisted:    count(&w.wishlisted).unwrap_or(0),
      carted:        count(&w.carted).unwrap_or(0),
      free_obtained: count(&w.free_obtained).unwrap_or(0),
      count_ratings: count(&w.count_ratings).unwrap_or(0),
    }
  }
}

/// Decode the daily dashboard: an object keyed by date (optionally with a
/// time suffix).
pub fn decode_daily(body: &str) -> Result<DailySales, FetchError> {
  let days: std::collections::BTreeMap<String, WireDaily> =
    serde_json::from_str(body).map_err(|e| malformed("daily statistics", e))?;
  Ok(
    days
      .into_iter()
      .filter_map(|(key, stats)| {
        let date = key
          .get(..10)
          .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        if date.is_none() {
          warn!(key = %key, "skipping daily entry with unparseable date");
        }
        Some((date?, stats.into()))
      })
      .collect(),
  )
}
