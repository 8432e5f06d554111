//! HTTP client for the publisher dashboard, implementing
//! [`tally_core::source::DataSource`].

mod client;
mod wire;

pub mod error;

pub use client::{PublisherClient, PublisherConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
