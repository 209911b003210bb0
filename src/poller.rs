//! # Poller Module
//!
//! Periodic workflow status synchronization.
//!
//! Each tick spawns one status request tagged with a sequence number.
//! Requests may overlap on a slow network; the most recently *issued* request
//! wins, so a completion older than the last applied one is discarded.
//! Stopping the poller cancels the timer and every request still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::StatusSource;
use crate::notify::Notifier;
use crate::view::SharedView;

/// Default poll cadence in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// What happened to one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Response folded into the view
    Applied,
    /// Response arrived after a newer one and was dropped
    Superseded,
    /// Request failed; the view was left untouched
    Failed,
    /// The poller stopped before the response arrived
    Cancelled,
}

struct PollContext {
    source: Arc<dyn StatusSource>,
    view: SharedView,
    notifier: Notifier,
    seq: AtomicU64,
}

impl PollContext {
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn poll_once(&self, seq: u64, token: CancellationToken) -> PollOutcome {
        let result = tokio::select! {
            _ = token.cancelled() => {
                debug!(seq, "Status poll cancelled in flight");
                return PollOutcome::Cancelled;
            }
            result = self.source.fetch_status() => result,
        };

        match result {
            Ok(response) => {
                let mut view = self.view.write().await;
                if token.is_cancelled() {
                    return PollOutcome::Cancelled;
                }
                if seq <= view.last_applied_seq {
                    view.discarded_polls += 1;
                    debug!(seq, applied = view.last_applied_seq, "Discarding superseded status poll");
                    return PollOutcome::Superseded;
                }
                debug!(seq, nodes = response.nodes.len(), "Applying status poll");
                view.apply(seq, response);
                drop(view);

                self.notifier.info("Refreshing agent workflow status");
                PollOutcome::Applied
            }
            Err(e) => {
                if token.is_cancelled() {
                    return PollOutcome::Cancelled;
                }
                warn!(seq, error = %e, "Status poll failed");
                self.view.write().await.failed_polls += 1;
                self.notifier.error("Failed to refresh workflow status.");
                PollOutcome::Failed
            }
        }
    }
}

/// Polls a [`StatusSource`] on a fixed cadence into shared view state.
pub struct StatusPoller {
    ctx: Arc<PollContext>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(
        source: Arc<dyn StatusSource>,
        view: SharedView,
        notifier: Notifier,
        interval: Duration,
    ) -> Self {
        Self {
            ctx: Arc::new(PollContext {
                source,
                view,
                notifier,
                seq: AtomicU64::new(0),
            }),
            interval,
        }
    }

    /// Poll once right now, outside the cadence.
    pub async fn refresh_now(&self) -> PollOutcome {
        let seq = self.ctx.next_seq();
        self.ctx.poll_once(seq, CancellationToken::new()).await
    }

    /// Start ticking. The first tick fires one interval from now.
    pub fn start(self) -> PollerHandle {
        let token = CancellationToken::new();
        info!(interval_ms = self.interval.as_millis() as u64, "Starting status poller");

        let task = tokio::spawn(run(self.ctx, self.interval, token.clone()));

        PollerHandle {
            token,
            task: Some(task),
        }
    }
}

async fn run(ctx: Arc<PollContext>, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let seq = ctx.next_seq();
                let ctx = ctx.clone();
                let child = token.child_token();
                debug!(seq, in_flight = in_flight.len(), "Poll tick");
                in_flight.spawn(async move { ctx.poll_once(seq, child).await });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(error = %e, "Status poll task panicked");
                    }
                }
            }
        }
    }

    in_flight.shutdown().await;
    info!("Status poller stopped");
}

/// Owns a running poller. Dropping the handle stops it.
pub struct PollerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop ticking, cancel in-flight requests and wait for the task to end.
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Status poller task ended abnormally");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
