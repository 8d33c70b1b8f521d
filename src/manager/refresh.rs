//! Periodic rebuild task.

use super::Inner;
use crate::prelude::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

impl Inner {
    /// Rebuilds every `interval` until `token` is cancelled. A failed rebuild keeps the
    /// previous snapshot published and is retried at the next tick.
    pub(super) async fn run_refresh(&self, token: CancellationToken, interval: Duration) {
        info!(
            "Starting cache refresh task; interval_secs={}",
            interval.as_secs()
        );
        loop {
            if sleep_or_cancel(&token, interval).await {
                debug!("Cancellation signal received; stopping refresh");
                return;
            }
            match self.rebuild().await {
                Ok(()) => debug!("Scheduled rebuild published"),
                Err(e) => warn!("Scheduled rebuild failed; error={}", e),
            }
        }
    }
}

/// Sleeps for `dur`, returning `true` if cancelled first.
async fn sleep_or_cancel(token: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => true,
        () = sleep(dur) => false,
    }
}
