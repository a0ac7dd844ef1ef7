use crate::dispatcher::{Dispatcher, Outcome};
use crate::policy::RateLimitOptions;
use actix_web::rt::task::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Counts for one pass over the overflow queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Items in the snapshot taken at the start of the cycle.
    pub batch: usize,
    pub delivered: usize,
    /// Still rate limited (or failed and requeued), back on the queue for the next cycle.
    pub deferred: usize,
    /// Admitted but the delivery channel failed.
    pub failed: usize,
    /// Discarded because their type no longer has a policy.
    pub dropped: usize,
    /// Put back untouched because shutdown was requested mid-cycle.
    pub abandoned: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.batch == 0
    }
}

/// Retry everything that was queued when the cycle started.
///
/// Each item goes through [Dispatcher::send] again; items that are still rate limited flow back
/// onto the queue and are left for the next cycle. A failure for one item never stops the rest
/// of the batch. If `token` is cancelled the remaining items are restored to the front of the
/// queue and the cycle ends before another delivery is started.
pub async fn run_cycle(dispatcher: &Dispatcher, token: &CancellationToken) -> CycleReport {
    let batch = dispatcher.queue().drain_snapshot();
    let mut report = CycleReport {
        batch: batch.len(),
        ..Default::default()
    };

    let mut items = batch.into_iter();
    while let Some(notification) = items.next() {
        if token.is_cancelled() {
            let rest: Vec<_> = std::iter::once(notification).chain(items).collect();
            report.abandoned = rest.len();
            dispatcher.queue().restore(rest);
            break;
        }
        match dispatcher.send(notification).await {
            Ok(Outcome::Delivered) => report.delivered += 1,
            Ok(Outcome::Deferred | Outcome::Requeued) => report.deferred += 1,
            Ok(Outcome::Dropped) => report.failed += 1,
            Err(e) => {
                log::error!("Dropping queued notification: {e}");
                report.dropped += 1;
            }
        }
    }
    report
}

/// Background task that periodically drains a dispatcher's overflow queue.
pub struct DrainLoop {
    dispatcher: Dispatcher,
    interval: Duration,
    token: CancellationToken,
}

impl DrainLoop {
    pub fn new(dispatcher: Dispatcher, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "Drain interval must be non-zero");
        Self {
            dispatcher,
            interval,
            token: CancellationToken::new(),
        }
    }

    pub fn from_options(dispatcher: Dispatcher, options: &RateLimitOptions) -> Self {
        Self::new(dispatcher, options.drain_interval)
    }

    /// Use an externally owned token, e.g. one shared with the rest of the application.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Spawn the loop onto the actix runtime.
    pub fn spawn(self) -> DrainHandle {
        let token = self.token.clone();
        let handle = actix_web::rt::spawn(self.run());
        DrainHandle { token, handle }
    }

    /// Wait one interval, drain, repeat; returns once the token is cancelled.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = actix_web::rt::time::sleep(self.interval) => {}
            }

            let report = run_cycle(&self.dispatcher, &self.token).await;
            if report.is_empty() {
                log::debug!("Overflow queue empty");
            } else {
                log::info!(
                    "Drained {} queued notifications: {} delivered, {} deferred, {} failed, {} dropped",
                    report.batch,
                    report.delivered,
                    report.deferred,
                    report.failed,
                    report.dropped
                );
            }
            if report.abandoned > 0 {
                log::warn!(
                    "Shutdown during drain, {} notifications left queued",
                    report.abandoned
                );
            }
        }
        log::debug!("Drain loop stopped");
    }
}

pub struct DrainHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DrainHandle {
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop the loop and wait for it to finish.
    ///
    /// A delivery already in flight is allowed to complete, no new one is started.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            log::error!("Drain loop terminated abnormally: {e}");
        }
    }
}
