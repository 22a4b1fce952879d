//! Notification queue dispatcher
//!
//! One tick: snapshot the queue, cut it into batches, send every entry of a
//! batch concurrently, wait for the batch to settle, then remove entries by
//! value. Batches run one after another.
//!
//! In [`DeliveryMode::AtMostOnce`] every entry of a settled batch is removed
//! whether or not its send succeeded, so a failed send is lost. That is the
//! behavior of the deployed system and stays the default.
//! [`DeliveryMode::AtLeastOnce`] only removes what was delivered.
//!
//! Removal is by value and capped per value, so it works on the queue as it
//! is at removal time, not on the snapshot. For each distinct address in a
//! batch of `n` entries:
//! - at-most-once removes up to `n` occurrences;
//! - at-least-once removes up to the number of successful sends.
//!
//! An address queued twice in one batch is therefore fully removed in
//! at-most-once mode even if one of its sends failed. A copy enqueued while
//! the batch is in flight survives only if the cap is already used up by the
//! snapshot's copies: in a batch `[a]` a fresh `a` stays queued, in a batch
//! `[a, b]` the cap of two sweeps it away unsent.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::AuthError;
use crate::notify::NotificationSender;
use crate::queue::NotificationQueue;

/// Default number of entries sent concurrently
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Which entries a settled batch removes from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryMode {
    /// Remove every dispatched entry, failed or not.
    #[default]
    AtMostOnce,
    /// Remove only delivered entries; failures wait for the next tick.
    AtLeastOnce,
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "at-most-once" | "at_most_once" => Ok(Self::AtMostOnce),
            "at-least-once" | "at_least_once" => Ok(Self::AtLeastOnce),
            other => Err(format!("unknown delivery mode: {}", other)),
        }
    }
}

/// Counters for one completed tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries in the snapshot
    pub queued: usize,
    pub batches: usize,
    pub sent: usize,
    pub failed: usize,
    /// Failures the provider will never accept (a subset of `failed`)
    pub rejected: usize,
    /// Entries actually removed from the queue
    pub removed: usize,
}

/// What one call to [`QueueDispatcher::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was queued.
    Empty,
    /// A previous tick was still running.
    Skipped,
    Completed(TickReport),
    /// The tick could not run (queue unreadable); retried next tick.
    Failed(String),
}

/// Drains the notification queue in fixed-size batches.
///
/// Only one tick runs at a time; see [`TickOutcome::Skipped`].
pub struct QueueDispatcher {
    queue: NotificationQueue,
    sender: Arc<dyn NotificationSender>,
    batch_size: usize,
    mode: DeliveryMode,
    running: Mutex<()>,
}

impl QueueDispatcher {
    /// Create a dispatcher with the default batch size and delivery mode
    ///
    /// # Arguments
    /// * `queue` - Queue to drain
    /// * `sender` - Delivers one notification per queue entry
    pub fn new(queue: NotificationQueue, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            queue,
            sender,
            batch_size: DEFAULT_BATCH_SIZE,
            mode: DeliveryMode::default(),
            running: Mutex::new(()),
        }
    }

    /// A batch size of zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Choose how settled batches are removed from the queue.
    #[must_use]
    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of entries sent concurrently per batch
    ///
    /// # Returns
    /// The configured size, never zero
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Run one dispatch pass. Never returns an error: every failure ends up
    /// in the logs and in the outcome.
    #[instrument(skip(self), fields(mode = ?self.mode, batch_size = self.batch_size))]
    pub async fn tick(&self) -> TickOutcome {
        // Ticks never overlap; a late tick is dropped rather than queued
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous dispatch still running, skipping tick");
            return TickOutcome::Skipped;
        };

        let snapshot = match self.queue.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Failed to read notification queue");
                return TickOutcome::Failed(e.to_string());
            }
        };

        if snapshot.is_empty() {
            debug!("Notification queue empty");
            return TickOutcome::Empty;
        }

        let mut report = TickReport {
            queued: snapshot.len(),
            ..TickReport::default()
        };

        for batch in snapshot.chunks(self.batch_size) {
            report.batches += 1;
            self.dispatch_batch(batch, &mut report).await;
        }

        info!(
            queued = report.queued,
            batches = report.batches,
            sent = report.sent,
            failed = report.failed,
            rejected = report.rejected,
            removed = report.removed,
            "Dispatch tick complete"
        );

        TickOutcome::Completed(report)
    }

    async fn dispatch_batch(&self, batch: &[String], report: &mut TickReport) {
        let results = join_all(batch.iter().map(|address| async move {
            let result = self.sender.send(address).await;
            (address.as_str(), result)
        }))
        .await;

        // Distinct addresses in first-seen order, with delivered counts
        let mut delivered: Vec<(&str, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for (address, result) in results {
            let slot = *index.entry(address).or_insert_with(|| {
                delivered.push((address, 0));
                delivered.len() - 1
            });

            match result {
                Ok(()) => {
                    report.sent += 1;
                    delivered[slot].1 += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    let transient = e.is_transient();
                    let failure = AuthError::from(e);
                    let cause = failure.detail().unwrap_or_default();
                    if transient {
                        warn!(to = %address, cause, "Notification dispatch failed");
                    } else {
                        report.rejected += 1;
                        // In at-least-once mode this entry is retried every tick
                        error!(
                            to = %address,
                            cause,
                            mode = ?self.mode,
                            "Notification permanently rejected"
                        );
                    }
                }
            }
        }

        for (address, ok_count) in delivered {
            let count = match self.mode {
                DeliveryMode::AtMostOnce => batch.len(),
                DeliveryMode::AtLeastOnce => ok_count,
            };
            if count == 0 {
                continue;
            }

            match self.queue.remove(address, count).await {
                Ok(removed) => report.removed += removed,
                Err(e) => error!(to = %address, error = %e, "Failed to remove dispatched entry"),
            }
        }
    }
}
