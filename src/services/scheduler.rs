use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::services::booking::{BookingEngine, ExpirySweep};
use crate::utils::clock::SharedClock;

/// Periodically expires place orders whose flight departs within the lookahead window.
#[derive(Clone)]
pub struct ExpirationScheduler {
    engine: BookingEngine,
    clock: SharedClock,
    interval: Duration,
    lookahead: chrono::Duration,
}

impl ExpirationScheduler {
    pub fn new(
        engine: BookingEngine,
        clock: SharedClock,
        interval: Duration,
        lookahead: chrono::Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            interval,
            lookahead,
        }
    }

    /// One pass at the clock's current instant.
    pub async fn sweep(&self) -> AppResult<ExpirySweep> {
        let now = self.clock.now();
        let sweep = self.engine.expire_due_place_orders(now, self.lookahead).await?;
        if sweep.expired > 0 || sweep.failed > 0 {
            tracing::info!(
                expired = sweep.expired,
                failed = sweep.failed,
                "Place order expiry sweep finished"
            );
        } else {
            tracing::debug!("Place order expiry sweep found nothing due");
        }
        Ok(sweep)
    }

    /// Runs until `cancel` fires. The first sweep happens immediately.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                lookahead_hours = self.lookahead.num_hours(),
                "Expiration scheduler starting"
            );
            let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if let Err(err) = self.sweep().await {
                    tracing::error!(error = %err, "Place order expiry sweep failed");
                }
            }

            tracing::info!("Expiration scheduler stopped");
        })
    }
}
