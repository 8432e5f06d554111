//! Month-to-date sales summary and the calendar helpers polls use.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{DailySales, SaleRecord, format_cents};

/// Share of gross revenue the publisher keeps.
pub const NET_SHARE_PERCENT: i64 = 70;

// ─── Calendar ────────────────────────────────────────────────────────────────

/// First day of the month containing `today`: the sales report period.
pub fn period_start(today: NaiveDate) -> NaiveDate {
  today.with_day(1).unwrap_or(today)
}

/// `[first day of month, first day of next month)` around `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
  let start = period_start(today);
  let end = start.checked_add_months(Months::new(1)).unwrap_or(start);
  (start, end)
}

pub fn days_in_month(today: NaiveDate) -> u32 {
  let (start, end) = month_bounds(today);
  (end - start).num_days() as u32
}

/// Whether a cached daily payload covers the month of `today`. A payload left
/// over from an earlier month is not reported.
pub fn daily_covers_month(daily: &DailySales, today: NaiveDate) -> bool {
  let (start, end) = month_bounds(today);
  daily.range(start..end).next().is_some()
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// One sales line as displayed in the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
  pub item_id:       String,
  pub name:          String,
  pub price_cents:   i64,
  pub gross_cents:   i64,
  pub revenue_cents: i64,
  /// Units sold minus refunds; negative when refunds exceed sales.
  pub net_units:     i64,
  pub first_sale_at: Option<DateTime<Utc>>,
  pub last_sale_at:  Option<DateTime<Utc>>,
}

/// Month-to-date totals with a naive month-end projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
  pub period_start:          NaiveDate,
  /// Most recently sold first.
  pub rows:                  Vec<SummaryRow>,
  pub gross_cents:           i64,
  pub revenue_cents:         i64,
  /// Gross per elapsed day times days in the month, to whole dollars.
  pub projected_gross_cents: i64,
  /// [`NET_SHARE_PERCENT`] of the projected gross, to whole dollars.
  pub projected_net_cents:   i64,
}

impl SalesSummary {
  /// Multi-line label for a badge tooltip.
  pub fn tooltip(&self) -> String {
    format!(
      "Sales:\nGross: {}\nNet: {}\n\nExpected:\nGross: {}\nNet: {}",
      format_cents(self.gross_cents),
      format_cents(self.revenue_cents),
      format_cents(self.projected_gross_cents),
      format_cents(self.projected_net_cents),
    )
  }
}

fn round_to_dollar(cents: f64) -> i64 { ((cents / 100.0).round() as i64) * 100 }

pub fn summarize(rows: &[SaleRecord], today: NaiveDate) -> SalesSummary {
  let mut summary_rows: Vec<SummaryRow> = rows
    .iter()
    .map(|r| SummaryRow {
      item_id:       r.item_id.clone(),
      name:          r.name.clone(),
      price_cents:   r.price_cents,
      gross_cents:   r.gross_cents,
      revenue_cents: r.revenue_cents,
      net_units:     r.units_sold as i64 - r.refunds as i64,
      first_sale_at: r.first_sale_at,
      last_sale_at:  r.last_sale_at,
    })
    .collect();
  summary_rows.sort_by(|a, b| b.last_sale_at.cmp(&a.last_sale_at));

  let gross_cents: i64 = rows.iter().map(|r| r.gross_cents).sum();
  let revenue_cents: i64 = rows.iter().map(|r| r.revenue_cents).sum();

  let elapsed = f64::from(today.day());
  let projected = gross_cents as f64 / elapsed * f64::from(days_in_month(today));

  SalesSummary {
    period_start: period_start(today),
    rows: summary_rows,
    gross_cents,
    revenue_cents,
    projected_gross_cents: round_to_dollar(projected),
    projected_net_cents: round_to_dollar(
      projected * NET_SHARE_PERCENT as f64 / 100.0,
    ),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::record::DailyStats;

  fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn row(item: &str, gross: i64, units: u64, refunds: u64, last_day: u32) -> SaleRecord {
    SaleRecord {
      item_id:       item.into(),
      name:          item.into(),
      price_cents:   1000,
      units_sold:    units,
      refunds,
      gross_cents:   gross,
      revenue_cents: gross * 7 / 10,
      first_sale_at: None,
      last_sale_at:  Some(Utc.with_ymd_and_hms(2025, 4, last_day, 0, 0, 0).unwrap()),
    }
  }

  #[test]
  fn calendar_helpers() {
    assert_eq!(period_start(day(2025, 4, 17)), day(2025, 4, 1));
    assert_eq!(days_in_month(day(2024, 2, 10)), 29);
    assert_eq!(days_in_month(day(2025, 12, 31)), 31);
    assert_eq!(month_bounds(day(2025, 12, 5)).1, day(2026, 1, 1));
  }

  #[test]
  fn totals_and_projection() {
    // 10 days into a 30-day month with $100 gross → $300 projected.
    let rows = [row("a", 6000, 6, 1, 3), row("b", 4000, 4, 0, 9)];
    let s = summarize(&rows, day(2025, 4, 10));
    assert_eq!(s.gross_cents, 10_000);
    assert_eq!(s.revenue_cents, 7000);
    assert_eq!(s.projected_gross_cents, 30_000);
    assert_eq!(s.projected_net_cents, 21_000);
    assert_eq!(s.period_start, day(2025, 4, 1));
  }

  #[test]
  fn rows_are_newest_first_with_net_units() {
    let rows = [row("a", 100, 2, 3, 3), row("b", 100, 5, 1, 9)];
    let s = summarize(&rows, day(2025, 4, 10));
    assert_eq!(s.rows[0].item_id, "b");
    assert_eq!(s.rows[0].net_units, 4);
    assert_eq!(s.rows[1].net_units, -1);
  }

  #[test]
  fn projection_rounds_to_whole_dollars() {
    // $10.01 on day 3 of a 30-day month → $100.10 → $100.
    let s = summarize(&[row("a", 1001, 1, 0, 1)], day(2025, 4, 3));
    assert_eq!(s.projected_gross_cents, 10_000);
    assert_eq!(s.projected_net_cents, 7000);
  }

  #[test]
  fn stale_daily_payload_does_not_cover_month() {
    let mut daily = DailySales::new();
    daily.insert(day(2025, 3, 30), DailyStats::default());
    assert!(!daily_covers_month(&daily, day(2025, 4, 2)));
    daily.insert(day(2025, 4, 1), DailyStats::default());
    assert!(daily_covers_month(&daily, day(2025, 4, 2)));
  }
}
