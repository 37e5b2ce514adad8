//! Bounded record queue between producers and the batching writer.
//!
//! Multi-producer/single-consumer with an intentional load-shedding policy:
//! inserting into a full queue never blocks the producer, the record is
//! simply dropped and counted. Freshness is preferred over completeness.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

/// Build a record queue with the given fixed capacity.
///
/// Returns a cloneable producer handle and the single consumer handle.
pub fn record_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let dropped = Arc::new(AtomicU64::new(0));

    let sender = QueueSender {
        tx,
        dropped: dropped.clone(),
    };
    let receiver = QueueReceiver { rx, dropped };

    (sender, receiver)
}

/// Producer-side handle. Clone one per producer task.
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

impl QueueSender {
    /// Insert a record without blocking.
    ///
    /// Returns `false` and discards the record when the queue is at capacity
    /// or the consumer has gone away. Rejected records are counted, not
    /// treated as errors.
    pub fn try_enqueue(&self, record: String) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Total records rejected so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer-side handle, owned exclusively by the writer task.
pub struct QueueReceiver {
    rx: mpsc::Receiver<String>,
    dropped: Arc<AtomicU64>,
}

impl QueueReceiver {
    /// Drain up to `max_items` records.
    ///
    /// Waits at most `max_wait` for the first record to appear, then takes
    /// whatever is immediately available, returning early once the queue
    /// empties. The bounded wait keeps the writer responsive to shutdown.
    pub async fn drain_batch(&mut self, max_items: usize, max_wait: Duration) -> Vec<String> {
        let mut records = Vec::new();
        if max_items == 0 {
            return records;
        }

        match timeout(max_wait, self.rx.recv()).await {
            Ok(Some(first)) => records.push(first),
            // Closed or idle for the full wait.
            Ok(None) | Err(_) => return records,
        }

        while records.len() < max_items {
            match self.rx.try_recv() {
                Ok(record) => records.push(record),
                Err(_) => break,
            }
        }

        records
    }

    /// Total records rejected at the producer side so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_enqueue_and_drain_preserves_order() {
        let (sender, mut receiver) = record_queue(16);

        for i in 0..5 {
            assert!(sender.try_enqueue(format!("record-{}", i)));
        }

        let drained = receiver.drain_batch(10, Duration::from_millis(50)).await;
        assert_eq!(
            drained,
            vec!["record-0", "record-1", "record-2", "record-3", "record-4"]
        );
    }

    #[tokio::test]
    async fn test_full_queue_sheds_load() {
        let (sender, receiver) = record_queue(5);

        let mut accepted = 0;
        for i in 0..20 {
            if sender.try_enqueue(format!("record-{}", i)) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(sender.dropped(), 15);
        assert_eq!(receiver.dropped(), 15);
    }

    #[tokio::test]
    async fn test_try_enqueue_never_blocks() {
        let (sender, _receiver) = record_queue(1);
        assert!(sender.try_enqueue("a".to_string()));

        let start = Instant::now();
        assert!(!sender.try_enqueue("b".to_string()));
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_drain_respects_max_items() {
        let (sender, mut receiver) = record_queue(16);
        for i in 0..10 {
            sender.try_enqueue(format!("record-{}", i));
        }

        let drained = receiver.drain_batch(4, Duration::from_millis(50)).await;
        assert_eq!(drained.len(), 4);

        let rest = receiver.drain_batch(100, Duration::from_millis(50)).await;
        assert_eq!(rest.len(), 6);
        assert_eq!(rest[0], "record-4");
    }

    #[tokio::test]
    async fn test_drain_bounded_idle_wait() {
        let (_sender, mut receiver) = record_queue(16);

        let start = Instant::now();
        let drained = receiver.drain_batch(10, Duration::from_millis(50)).await;

        assert!(drained.is_empty());
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(45));
        assert!(waited < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_drain_returns_early_when_queue_empties() {
        let (sender, mut receiver) = record_queue(16);
        sender.try_enqueue("only".to_string());

        let start = Instant::now();
        let drained = receiver.drain_batch(100, Duration::from_secs(5)).await;

        assert_eq!(drained.len(), 1);
        // Returned as soon as the queue emptied, not after max_wait.
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_drain_after_senders_dropped() {
        let (sender, mut receiver) = record_queue(16);
        sender.try_enqueue("last".to_string());
        drop(sender);

        let drained = receiver.drain_batch(10, Duration::from_millis(50)).await;
        assert_eq!(drained, vec!["last"]);

        let empty = receiver.drain_batch(10, Duration::from_millis(50)).await;
        assert!(empty.is_empty());
    }
}
