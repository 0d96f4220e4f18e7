use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::policy::SessionPolicy;
use crate::store::SessionStore;

/// Shortest period the reaper will tick at
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic eviction of idle sessions.
///
/// Sole source of implicit deletions. History of a reaped session is
/// dropped without notifying anyone.
pub struct Reaper<C> {
    store: Arc<SessionStore<C>>,
    policy: SessionPolicy,
}

impl<C> Reaper<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(store: Arc<SessionStore<C>>, policy: SessionPolicy) -> Self {
        Self { store, policy }
    }

    /// Run a single sweep against `now`, returning the eviction count
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.store.sweep_stale(self.policy.max_idle, now).await;
        if evicted > 0 {
            info!(
                "Reaper evicted {} idle session(s), {} remain",
                evicted,
                self.store.len().await
            );
        } else {
            debug!("Reaper found no idle sessions");
        }
        evicted
    }

    /// Start sweeping every `sweep_interval` until `shutdown` is cancelled.
    /// The first sweep runs one full interval after the call.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut period = self.policy.sweep_interval;
            if period < MIN_SWEEP_INTERVAL {
                warn!("Sweep interval {:?} is too short, using {:?}", period, MIN_SWEEP_INTERVAL);
                period = MIN_SWEEP_INTERVAL;
            }
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                "Reaper started (every {:?}, idle limit {:?})",
                period, self.policy.max_idle
            );

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once(Utc::now()).await;
                    }
                }
            }

            info!("Reaper stopped");
        })
    }
}
