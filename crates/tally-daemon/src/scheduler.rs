//! The poll timer.
//!
//! Runs the startup cycle once, then a scheduled cycle every interval. The
//! first scheduled cycle fires one full interval after startup; a cycle that
//! overruns delays the next rather than bunching them up.

use std::{sync::Arc, time::Duration};

use tally_core::{
  notify::NotificationSurface, poll::Poller, source::DataSource,
  store::SnapshotStore,
};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Drive `poller` forever. Spawn this on the runtime; abort the task to stop.
pub async fn run<S, D, N>(poller: Arc<Poller<S, D, N>>, every: Duration)
where
  S: SnapshotStore,
  D: DataSource,
  N: NotificationSurface,
{
  match poller.on_process_start().await {
    Ok(report) => info!(?report, "startup poll finished"),
    Err(e) => error!(error = %e, "startup poll failed"),
  }

  let mut interval = time::interval_at(Instant::now() + every, every);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
  info!(every_secs = every.as_secs(), "poll scheduler running");

  loop {
    interval.tick().await;
    let report = poller.on_poll_tick().await;
    debug!(?report, "scheduled poll finished");
  }
}
