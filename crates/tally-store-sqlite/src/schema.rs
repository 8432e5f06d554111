//! SQL schema for the Tally SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per StoreKey. Values are JSON; the poller never keeps an
-- in-memory copy, so every read comes from here.
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    updated_at  TEXT NOT NULL    -- ISO 8601 UTC
);

-- Outstanding notifications. Raising an existing id replaces the row;
-- clearing deletes it.
CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    kind            TEXT NOT NULL,   -- 'sale' | 'review' | 'session_expired'
    title           TEXT NOT NULL,
    body            TEXT NOT NULL,
    icon            TEXT NOT NULL,
    raised_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS notifications_raised_idx ON notifications(raised_at);

PRAGMA user_version = 1;
";
