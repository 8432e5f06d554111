//! User-facing alerts and the `NotificationSurface` trait that displays them.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// What a notification is about. Encoded as the prefix of its id, so the kind
/// of any id handed back by the surface can be recovered.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  Sale,
  Review,
  SessionExpired,
}

impl NotificationKind {
  /// Id prefix for this kind.
  pub fn prefix(self) -> &'static str {
    match self {
      Self::Sale => "tally-sale",
      Self::Review => "tally-review",
      Self::SessionExpired => "tally-session-expired",
    }
  }

  pub fn icon(self) -> &'static str {
    match self {
      Self::Sale => "icons/sale.png",
      Self::Review => "icons/review.png",
      Self::SessionExpired => "icons/session-expired.png",
    }
  }

  /// Recover the kind from a notification id.
  pub fn from_id(id: &str) -> Option<Self> {
    [Self::SessionExpired, Self::Review, Self::Sale]
      .into_iter()
      .find(|k| {
        id.strip_prefix(k.prefix())
          .is_some_and(|rest| rest.is_empty() || rest.starts_with('-'))
      })
  }

  /// Whether acknowledging this notification resets the unread counters.
  pub fn counts_as_unread(self) -> bool {
    matches!(self, Self::Sale | Self::Review)
  }

  /// A fresh id, unique across polls and process restarts.
  ///
  /// The session-expired alert is the exception: it always uses the bare
  /// prefix so a second alert replaces rather than stacks on the first.
  pub fn new_id(self) -> String {
    match self {
      Self::SessionExpired => self.prefix().to_owned(),
      _ => format!("{}-{}", self.prefix(), Uuid::new_v4()),
    }
  }
}

// ─── Notification ────────────────────────────────────────────────────────────

/// One alert as handed to the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:        String,
  pub kind:      NotificationKind,
  pub title:     String,
  pub body:      String,
  pub icon:      String,
  pub raised_at: DateTime<Utc>,
}

impl Notification {
  pub fn new(
    kind: NotificationKind,
    title: impl Into<String>,
    body: impl Into<String>,
    raised_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: kind.new_id(),
      kind,
      title: title.into(),
      body: body.into(),
      icon: kind.icon().to_owned(),
      raised_at,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Wherever alerts end up: a desktop notifier, a persistent inbox, a log.
pub trait NotificationSurface: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Display a notification. Raising an id that is already outstanding
  /// replaces it.
  fn raise(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove a notification. Returns `false` if it was not outstanding.
  fn clear<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// All notifications raised and not yet cleared, oldest first.
  fn outstanding(
    &self,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;
}
