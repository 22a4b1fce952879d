//! Periodic trigger for the queue dispatcher
//!
//! The scheduler owns no timing policy of its own. A [`Ticker`] decides when
//! the next run happens; production uses [`IntervalTicker`], tests drive a
//! [`ManualTicker`] through its [`ManualTrigger`].
//!
//! Every tick is spawned as its own task so a slow dispatch never delays the
//! next trigger. The dispatcher's own guard turns an overlapping run into a
//! skipped tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::{QueueDispatcher, TickOutcome};

/// Default dispatch period in seconds
pub const DEFAULT_DISPATCH_INTERVAL: u64 = 10;

/// Source of dispatch triggers.
#[async_trait]
pub trait Ticker: Send + 'static {
    /// Wait for the next tick. Returns false once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Fixed-period ticker. The first tick fires one period after creation.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Create a ticker with a fixed period
    ///
    /// # Arguments
    /// * `period` - Time between ticks; must be non-zero
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks once per [`ManualTrigger::fire`]; stops when every trigger is dropped.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct ManualTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTrigger {
    /// Request one tick. Returns false if the ticker is gone.
    pub fn fire(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Create a connected trigger/ticker pair.
pub fn manual() -> (ManualTrigger, ManualTicker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ManualTrigger { tx }, ManualTicker { rx })
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Drives a [`QueueDispatcher`] from a [`Ticker`].
///
/// Each tick runs in its own task so a slow tick never delays the next
/// trigger. Overlapping ticks are resolved by the dispatcher, which skips a
/// tick while another one is still running.
pub struct Scheduler;

impl Scheduler {
    /// Run `dispatcher` on every tick of `ticker` until `cancel` fires or the
    /// ticker stops. Ticks still in flight are awaited before the task ends.
    pub fn spawn<T: Ticker>(
        dispatcher: Arc<QueueDispatcher>,
        mut ticker: T,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            info!("Dispatch scheduler started");

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    more = ticker.tick() => {
                        if !more {
                            break;
                        }
                        // Reap finished ticks so the set stays small
                        while in_flight.try_join_next().is_some() {}

                        let dispatcher = Arc::clone(&dispatcher);
                        in_flight.spawn(async move {
                            if let TickOutcome::Skipped = dispatcher.tick().await {
                                debug!("Tick skipped");
                            }
                        });
                    }
                }
            }

            while in_flight.join_next().await.is_some() {}
            info!("Dispatch scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use crate::notify::NotificationSender;
    use crate::queue::{NotificationQueue, DEFAULT_QUEUE_KEY};
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSender {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSender for CountingSender {
        async fn send(&self, _address: &str) -> Result<(), SendError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup() -> (NotificationQueue, Arc<CountingSender>, Arc<QueueDispatcher>) {
        let queue = NotificationQueue::new(Arc::new(MemoryStore::new()), DEFAULT_QUEUE_KEY);
        let sender = Arc::new(CountingSender::default());
        let dispatcher = Arc::new(QueueDispatcher::new(queue.clone(), sender.clone()));
        (queue, sender, dispatcher)
    }

    async fn wait_until_empty(queue: &NotificationQueue) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !queue.is_empty().await.unwrap() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue was not drained");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_first_tick_is_delayed() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(10));
        let start = Instant::now();

        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(10));

        assert!(ticker.tick().await);
        assert!(start.elapsed() >= Duration::from_secs(20));
        assert_eq!(ticker.period(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_manual_ticker_stops_when_trigger_dropped() {
        let (trigger, mut ticker) = manual();
        assert!(trigger.fire());
        drop(trigger);

        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
    }

    #[tokio::test]
    async fn test_fire_drains_queue() {
        let (queue, sender, dispatcher) = setup();
        let (trigger, ticker) = manual();
        let cancel = CancellationToken::new();
        let handle = Scheduler::spawn(dispatcher, ticker, cancel.clone());

        // Nothing happens before the first trigger
        queue.enqueue("b@x.com").await.unwrap();
        queue.enqueue("c@x.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.len().await.unwrap(), 2);

        trigger.fire();
        wait_until_empty(&queue).await;
        assert_eq!(sender.sent.load(Ordering::SeqCst), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_one_tick_sends_every_batch() {
        let (queue, sender, dispatcher) = setup();
        for i in 0..23 {
            queue.enqueue(&format!("user{i}@x.com")).await.unwrap();
        }

        let (trigger, ticker) = manual();
        let handle = Scheduler::spawn(dispatcher, ticker, CancellationToken::new());

        trigger.fire();
        wait_until_empty(&queue).await;
        assert_eq!(sender.sent.load(Ordering::SeqCst), 23);

        // Scheduler ends once the trigger goes away
        drop(trigger);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_stops_scheduler() {
        let (queue, sender, dispatcher) = setup();
        let (trigger, ticker) = manual();
        let cancel = CancellationToken::new();
        let handle = Scheduler::spawn(dispatcher, ticker, cancel.clone());

        cancel.cancel();
        handle.await.unwrap();

        queue.enqueue("late@x.com").await.unwrap();
        assert!(!trigger.fire());
        assert_eq!(sender.sent.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len().await.unwrap(), 1);
    }
}
