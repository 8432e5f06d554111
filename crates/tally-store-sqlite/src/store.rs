//! [`SqliteStore`]: the SQLite implementation of [`SnapshotStore`] and
//! [`NotificationSurface`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;
use tracing::debug;

use tally_core::{
  notify::{Notification, NotificationSurface},
  store::{SnapshotStore, StoreKey},
};

use crate::{
  Error, Result,
  encode::{RawNotification, encode_dt},
  schema::SCHEMA,
};

const SELECT_VALUE: &str = "SELECT value_json FROM kv WHERE key = ?1";

const UPSERT_VALUE: &str = "INSERT INTO kv (key, value_json, updated_at) VALUES (?1, ?2, ?3)
   ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
                                  updated_at = excluded.updated_at";

// ─── Store ───────────────────────────────────────────────────────────────────

/// Tally state backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every key that has been written, in key order.
  pub async fn keys(&self) -> Result<Vec<StoreKey>> {
    let raw: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await?;

    raw
      .into_iter()
      .map(|k| {
        k.parse()
          .map_err(|_| Error::Unrecognised(format!("store key {k:?}")))
      })
      .collect()
  }
}

fn decode_value(raw: Option<String>) -> Result<Option<Value>> {
  raw
    .map(|s| serde_json::from_str(&s))
    .transpose()
    .map_err(Error::from)
}

// ─── SnapshotStore impl ──────────────────────────────────────────────────────

impl SnapshotStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: StoreKey) -> Result<Option<Value>> {
    let key_str = key.as_ref().to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(SELECT_VALUE, rusqlite::params![key_str], |r| r.get(0))
            .optional()?,
        )
      })
      .await?;

    decode_value(raw)
  }

  async fn set(&self, entries: Vec<(StoreKey, Value)>) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    let rows: Vec<(String, String)> = entries
      .into_iter()
      .map(|(k, v)| (k.as_ref().to_owned(), v.to_string()))
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(UPSERT_VALUE)?;
          for (key, value) in &rows {
            stmt.execute(rusqlite::params![key, value, at_str])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update<F>(&self, key: StoreKey, f: F) -> Result<Option<Value>>
  where
    F: FnOnce(Option<Value>) -> Value + Send + 'static,
  {
    let key_str = key.as_ref().to_owned();
    let at_str = encode_dt(Utc::now());

    // The read, the closure and the write share one IMMEDIATE transaction,
    // so a second process on the same file cannot interleave.
    let previous: Option<Value> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raw: Option<String> = tx
          .query_row(SELECT_VALUE, rusqlite::params![key_str], |r| r.get(0))
          .optional()?;
        let previous = raw.and_then(|s| serde_json::from_str::<Value>(&s).ok());
        let next = f(previous.clone()).to_string();
        tx.execute(UPSERT_VALUE, rusqlite::params![key_str, next, at_str])?;
        tx.commit()?;
        Ok(previous)
      })
      .await?;

    debug!(%key, "updated");
    Ok(previous)
  }
}

// ─── NotificationSurface impl ────────────────────────────────────────────────

impl NotificationSurface for SqliteStore {
  type Error = Error;

  async fn raise(&self, notification: Notification) -> Result<()> {
    let kind_str = notification.kind.as_ref().to_owned();
    let at_str = encode_dt(notification.raised_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO notifications (
             notification_id, kind, title, body, icon, raised_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            notification.id,
            kind_str,
            notification.title,
            notification.body,
            notification.icon,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear<'a>(&'a self, id: &'a str) -> Result<bool> {
    let id_str = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM notifications WHERE notification_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn outstanding(&self) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM notifications ORDER BY rowid",
          RawNotification::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }
}
