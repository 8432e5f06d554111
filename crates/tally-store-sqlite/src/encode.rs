//! Conversions between domain types and the plain-text SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, keys and kinds as their
//! snake_case names.

use chrono::{DateTime, Utc};
use tally_core::notify::{Notification, NotificationKind};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NotificationKind ────────────────────────────────────────────────────────

pub fn decode_kind(s: &str) -> Result<NotificationKind> {
  s.parse()
    .map_err(|_| Error::Unrecognised(format!("notification kind {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `notifications` row.
pub struct RawNotification {
  pub notification_id: String,
  pub kind:            String,
  pub title:           String,
  pub body:            String,
  pub icon:            String,
  pub raised_at:       String,
}

impl RawNotification {
  pub const COLUMNS: &'static str = "notification_id, kind, title, body, icon, raised_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      notification_id: row.get(0)?,
      kind:            row.get(1)?,
      title:           row.get(2)?,
      body:            row.get(3)?,
      icon:            row.get(4)?,
      raised_at:       row.get(5)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:        self.notification_id,
      kind:      decode_kind(&self.kind)?,
      title:     self.title,
      body:      self.body,
      icon:      self.icon,
      raised_at: decode_dt(&self.raised_at)?,
    })
  }
}
