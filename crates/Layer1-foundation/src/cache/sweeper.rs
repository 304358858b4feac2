//! Background sweep of expired cache entries
//!
//! Keys that are never queried again would otherwise stay in the map forever.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ResultCache;

/// Handle to the periodic sweep task
///
/// The task runs until [`stop`](Self::stop) is called or the token it was
/// spawned with is cancelled.
pub struct CacheSweeper {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl CacheSweeper {
    /// Spawn a sweeper with its own cancellation token
    pub fn spawn(cache: Arc<ResultCache>, interval: Duration) -> Self {
        Self::spawn_with_token(cache, interval, CancellationToken::new())
    }

    /// Spawn a sweeper that also stops when `parent` is cancelled
    pub fn spawn_with_token(
        cache: Arc<ResultCache>,
        interval: Duration,
        parent: CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            // first tick one full interval from now
            let mut timer = interval_at(Instant::now() + interval, interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Cache sweeper started (interval {:?})", interval);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {
                        let removed = cache.sweep();
                        debug!("Cache sweep tick: {} removed, {} remaining", removed, cache.len());
                    }
                }
            }

            info!("Cache sweeper stopped");
        });

        Self { cancel, handle }
    }

    /// Request shutdown and wait for the task to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
