//! Persisted comparison state: the sales baseline and the unread counters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::record::{SaleKey, SaleRecord};

// ─── Tracks ──────────────────────────────────────────────────────────────────

/// The two independent polling tracks.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Track {
  Sales,
  Reviews,
}

// ─── Baseline ────────────────────────────────────────────────────────────────

/// Last-observed state of one sales line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
  pub name:        String,
  pub price_cents: i64,
  pub units_sold:  u64,
  pub gross_cents: i64,
}

impl From<&SaleRecord> for BaselineEntry {
  fn from(r: &SaleRecord) -> Self {
    Self {
      name:        r.name.clone(),
      price_cents: r.price_cents,
      units_sold:  r.units_sold,
      gross_cents: r.gross_cents,
    }
  }
}

/// The subtraction reference for sales delta computation.
///
/// Built wholesale from each successful poll; keys absent from the latest
/// poll (delisted items) simply disappear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineSnapshot {
  pub entries: BTreeMap<SaleKey, BaselineEntry>,
}

impl BaselineSnapshot {
  /// Build a snapshot from a sales report. When a key appears more than once
  /// the later row wins.
  pub fn from_records(rows: &[SaleRecord]) -> Self {
    Self {
      entries: rows.iter().map(|r| (r.key(), r.into())).collect(),
    }
  }

  pub fn get(&self, key: &SaleKey) -> Option<&BaselineEntry> {
    self.entries.get(key)
  }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// The newest `last_sale_at` across a sales report, if any row carries one.
pub fn newest_sale(rows: &[SaleRecord]) -> Option<DateTime<Utc>> {
  rows.iter().filter_map(|r| r.last_sale_at).max()
}

// ─── Unread counters ─────────────────────────────────────────────────────────

/// Unacknowledged change events, counted independently per track.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct UnreadCounters {
  pub sales:   u64,
  pub reviews: u64,
}

impl UnreadCounters {
  pub fn total(&self) -> u64 { self.sales.saturating_add(self.reviews) }

  /// Badge label: the total as a decimal string, empty when nothing is
  /// unread.
  pub fn badge_text(&self) -> String {
    match self.total() {
      0 => String::new(),
      n => n.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(item: &str, price: i64, units: u64) -> SaleRecord {
    SaleRecord {
      item_id:       item.into(),
      name:          format!("Item {item}"),
      price_cents:   price,
      units_sold:    units,
      refunds:       0,
      gross_cents:   price * units as i64,
      revenue_cents: 0,
      first_sale_at: None,
      last_sale_at:  None,
    }
  }

  #[test]
  fn price_change_creates_separate_lines() {
    let snap = BaselineSnapshot::from_records(&[row("a", 1000, 3), row("a", 1500, 1)]);
    assert_eq!(snap.len(), 2);
    let old = SaleKey { item_id: "a".into(), price_cents: 1000 };
    assert_eq!(snap.get(&old).unwrap().units_sold, 3);
  }

  #[test]
  fn snapshot_serialises_as_object_keyed_by_sale_key() {
    let snap = BaselineSnapshot::from_records(&[row("42", 500, 2)]);
    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["42|500"]["units_sold"], 2);
    let back: BaselineSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, snap);
  }

  #[test]
  fn badge_text_is_empty_at_zero() {
    assert_eq!(UnreadCounters::default().badge_text(), "");
    let c = UnreadCounters { sales: 3, reviews: 2 };
    assert_eq!(c.badge_text(), "5");
  }
}
