//! Property-based tests for session-core
//!
//! Covers token round-trips and dispatcher batch accounting using proptest.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use session_core::error::SendError;
use session_core::{
    DeliveryMode, MemoryStore, NotificationQueue, NotificationSender, QueueDispatcher,
    TickOutcome, TokenIssuer,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Fails for every address in `failing`.
struct SelectiveSender {
    failing: HashSet<String>,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSender for SelectiveSender {
    async fn send(&self, address: &str) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(address.to_string());
        if self.failing.contains(address) {
            return Err(SendError::Rejected("mailbox unavailable".into()));
        }
        Ok(())
    }
}

fn addresses(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("user{i}@example.com")).collect()
}

// ============================================================
// Session Tokens
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn issued_tokens_verify_to_their_claims(
        id in "[a-f0-9]{8}",
        local in "[a-z]{1,20}",
        ttl in 1u64..1_000_000,
    ) {
        let issuer = TokenIssuer::new("property-secret", ttl);
        let address = format!("{}@example.com", local);

        let token = issuer.issue(&id, &address).unwrap();
        let claims = issuer.verify(&token).unwrap();

        prop_assert_eq!(claims.sub, id);
        prop_assert_eq!(claims.address, address);
        prop_assert_eq!(claims.exp - claims.iat, ttl);
    }

    #[test]
    fn tokens_from_other_secrets_are_rejected(
        secret_a in "[a-z]{8,32}",
        secret_b in "[a-z]{8,32}",
    ) {
        prop_assume!(secret_a != secret_b);
        let token = TokenIssuer::new(secret_a, 60).issue("id", "a@example.com").unwrap();

        prop_assert!(TokenIssuer::new(secret_b, 60).verify(&token).is_err());
    }

    #[test]
    fn arbitrary_strings_are_not_tokens(garbage in "[A-Za-z0-9._-]{0,80}") {
        let issuer = TokenIssuer::new("property-secret", 60);
        prop_assert!(issuer.verify(&garbage).is_err());
    }
}

// ============================================================
// Dispatcher Batching
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_tick_sends_everything_in_ceil_batches(n in 1usize..60, batch_size in 1usize..15) {
        let report = runtime().block_on(async {
            let queue = NotificationQueue::new(Arc::new(MemoryStore::new()), "q");
            for address in addresses(n) {
                queue.enqueue(&address).await.unwrap();
            }
            let sender = Arc::new(SelectiveSender {
                failing: HashSet::new(),
                sent: Mutex::new(Vec::new()),
            });
            let dispatcher = QueueDispatcher::new(queue.clone(), sender).with_batch_size(batch_size);

            let outcome = dispatcher.tick().await;
            assert!(queue.is_empty().await.unwrap());
            outcome
        });

        let TickOutcome::Completed(report) = report else {
            panic!("tick should complete");
        };
        prop_assert_eq!(report.batches, n.div_ceil(batch_size));
        prop_assert_eq!(report.sent, n);
        prop_assert_eq!(report.removed, n);
    }

    #[test]
    fn at_least_once_keeps_exactly_the_failures(
        failures in proptest::collection::vec(any::<bool>(), 1..40),
        batch_size in 1usize..12,
    ) {
        let all = addresses(failures.len());
        let failing: HashSet<String> = all
            .iter()
            .zip(&failures)
            .filter(|(_, failed)| **failed)
            .map(|(address, _)| address.clone())
            .collect();

        let remaining = runtime().block_on(async {
            let queue = NotificationQueue::new(Arc::new(MemoryStore::new()), "q");
            for address in &all {
                queue.enqueue(address).await.unwrap();
            }
            let sender = Arc::new(SelectiveSender {
                failing: failing.clone(),
                sent: Mutex::new(Vec::new()),
            });
            let dispatcher = QueueDispatcher::new(queue.clone(), sender)
                .with_batch_size(batch_size)
                .with_delivery_mode(DeliveryMode::AtLeastOnce);

            dispatcher.tick().await;
            queue.snapshot().await.unwrap()
        });

        prop_assert_eq!(remaining.into_iter().collect::<HashSet<_>>(), failing);
    }

    #[test]
    fn at_most_once_always_empties_the_queue(
        failures in proptest::collection::vec(any::<bool>(), 1..40),
        batch_size in 1usize..12,
    ) {
        let all = addresses(failures.len());
        let failing: HashSet<String> = all
            .iter()
            .zip(&failures)
            .filter(|(_, failed)| **failed)
            .map(|(address, _)| address.clone())
            .collect();

        let (len, attempted) = runtime().block_on(async {
            let queue = NotificationQueue::new(Arc::new(MemoryStore::new()), "q");
            for address in &all {
                queue.enqueue(address).await.unwrap();
            }
            let sender = Arc::new(SelectiveSender {
                failing,
                sent: Mutex::new(Vec::new()),
            });
            let dispatcher = QueueDispatcher::new(queue.clone(), sender.clone())
                .with_batch_size(batch_size);

            dispatcher.tick().await;
            let attempted = sender.sent.lock().unwrap().len();
            (queue.len().await.unwrap(), attempted)
        });

        prop_assert_eq!(len, 0);
        prop_assert_eq!(attempted, all.len());
    }
}
