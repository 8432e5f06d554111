//! Core types, traits, and the change-detection state machine for Tally.
//!
//! No HTTP or database code lives here. The publisher client, the SQLite
//! store and the REST surface are separate crates that plug in through the
//! traits defined here.

pub mod detect;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod poll;
pub mod record;
pub mod snapshot;
pub mod source;
pub mod state;
pub mod store;
pub mod summary;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
