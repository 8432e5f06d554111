//! Records returned by the publisher dashboard: the raw material of every
//! poll.
//!
//! Money is carried as integer cents throughout. The dashboard reports
//! amounts as decimal strings; conversion happens once, at decode time.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ─── Sales ───────────────────────────────────────────────────────────────────

/// One line of the monthly sales report: cumulative counters for a catalog
/// item sold at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
  /// Stable identifier of the catalog entry.
  pub item_id:       String,
  pub name:          String,
  pub price_cents:   i64,
  /// Cumulative units sold this period at this price.
  pub units_sold:    u64,
  pub refunds:       u64,
  /// Cumulative gross revenue this period.
  pub gross_cents:   i64,
  /// Cumulative net revenue (after the store's cut).
  pub revenue_cents: i64,
  pub first_sale_at: Option<DateTime<Utc>>,
  pub last_sale_at:  Option<DateTime<Utc>>,
}

impl SaleRecord {
  /// The identity used for snapshot comparison.
  pub fn key(&self) -> SaleKey {
    SaleKey {
      item_id:     self.item_id.clone(),
      price_cents: self.price_cents,
    }
  }
}

/// Identity of a tracked sales line: `(item_id, price_cents)`.
///
/// A price change starts a new line. Sales made at the old price keep their
/// own counter and are never conflated with the new one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SaleKey {
  pub item_id:     String,
  pub price_cents: i64,
}

impl fmt::Display for SaleKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}|{}", self.item_id, self.price_cents)
  }
}

impl FromStr for SaleKey {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (item_id, price) = s
      .rsplit_once('|')
      .ok_or_else(|| format!("sale key without price: {s:?}"))?;
    let price_cents = price
      .parse()
      .map_err(|_| format!("sale key with invalid price: {s:?}"))?;
    Ok(Self { item_id: item_id.to_owned(), price_cents })
  }
}

// Serialised as `"<item_id>|<price_cents>"` so snapshots can be stored as
// plain JSON objects.
impl Serialize for SaleKey {
  fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for SaleKey {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
  }
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// A customer review of one catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
  pub review_id:  String,
  pub item_id:    String,
  pub item_name:  String,
  /// Star rating as reported; nominally 0–5 but not trusted.
  pub rating:     i64,
  pub subject:    String,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

// ─── Daily statistics ────────────────────────────────────────────────────────

/// Per-day dashboard metrics, used for the monthly chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
  pub gross_cents:   i64,
  pub sales:         u64,
  pub refunds:       u64,
  pub chargebacks:   u64,
  pub downloads:     u64,
  pub page_views:    u64,
  pub quick_looks:   u64,
  pub wishlisted:    u64,
  pub carted:        u64,
  pub free_obtained: u64,
  pub count_ratings: u64,
}

/// Daily statistics keyed by calendar day.
pub type DailySales = BTreeMap<NaiveDate, DailyStats>;

// ─── Money ───────────────────────────────────────────────────────────────────

/// Parse a dashboard money string (`"15.00"`, `"$1,204.5"`, `"7"`) into
/// cents. Everything except digits, `.` and a leading `-` is ignored.
///
/// Returns `None` when no digits are present. Fractions beyond two places
/// are truncated.
pub fn parse_cents(raw: &str) -> Option<i64> {
  let negative = raw.trim_start().starts_with('-');
  let cleaned: String = raw
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.')
    .collect();
  let (whole, frac) = cleaned.split_once('.').unwrap_or((&cleaned, ""));
  if whole.is_empty() && frac.is_empty() {
    return None;
  }
  let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
  let frac: String = frac.chars().chain("00".chars()).take(2).collect();
  let frac: i64 = frac.parse().ok()?;
  let cents = whole.checked_mul(100)?.checked_add(frac)?;
  Some(if negative { -cents } else { cents })
}

/// Convert a float amount in major units to cents, rounding to the nearest
/// cent.
pub fn cents_from_f64(amount: f64) -> i64 { (amount * 100.0).round() as i64 }

/// Format cents as `$12.34`.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
