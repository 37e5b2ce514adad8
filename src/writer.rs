//! Batching writer: drains the record queue and flushes batches to a sink.
//!
//! The writer loops Running -> Draining -> Flushing -> Running until it is
//! closed. A flush fires when either trigger holds: the batch has reached the
//! configured size, or at least the flush interval has passed since the last
//! flush and the batch is non-empty. The size trigger bounds memory under
//! bursts; the time trigger bounds staleness under low traffic.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::queue::QueueReceiver;
use crate::sink::Sink;

/// Default upper bound on time-to-durable-storage for a buffered record.
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Default bounded wait for the first record of a drain, so the writer
/// re-checks shutdown promptly instead of parking on an empty queue.
const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(100);

/// Tuning knobs for the batching writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum records per flush.
    pub batch_size: usize,

    /// Flush a non-empty batch at least this often.
    pub flush_interval: Duration,

    /// Bounded idle wait per drain attempt.
    pub idle_wait: Duration,
}

impl WriterConfig {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            idle_wait: DEFAULT_IDLE_WAIT,
        }
    }
}

/// Totals accumulated over a writer's lifetime, reported at shutdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterStats {
    /// Records written and flushed durably.
    pub records_flushed: u64,

    /// Successful flush operations.
    pub batches_flushed: u64,

    /// Records lost to sink write failures.
    pub records_failed: u64,

    /// Records still batched when the writer closed, discarded unflushed.
    pub records_discarded_at_close: u64,
}

/// The single consumer of the record queue.
///
/// Owns the sink for its whole lifetime and releases it on close. Closing is
/// cooperative: the writer finishes the iteration in progress, discards
/// whatever is still batched or queued, and stops.
pub struct BatchWriter<S: Sink> {
    queue: QueueReceiver,
    sink: S,
    config: WriterConfig,
    batch: Vec<String>,
    last_flush: Instant,
    stats: WriterStats,
    closed: bool,
}

impl<S: Sink> BatchWriter<S> {
    pub fn new(queue: QueueReceiver, sink: S, config: WriterConfig) -> Self {
        let batch = Vec::with_capacity(config.batch_size);
        Self {
            queue,
            sink,
            config,
            batch,
            last_flush: Instant::now(),
            stats: WriterStats::default(),
            closed: false,
        }
    }

    /// Drive the writer until `shutdown` is cancelled, then close.
    ///
    /// Consumes the writer; the sink handle is released when this returns.
    pub async fn run(mut self, shutdown: CancellationToken) -> WriterStats {
        while !shutdown.is_cancelled() {
            let room = self.config.batch_size.saturating_sub(self.batch.len());
            let mut drained = self.queue.drain_batch(room, self.config.idle_wait).await;
            self.batch.append(&mut drained);

            let size_trigger = self.batch.len() >= self.config.batch_size;
            let time_trigger =
                !self.batch.is_empty() && self.last_flush.elapsed() >= self.config.flush_interval;

            if size_trigger || time_trigger {
                debug!(
                    batch_size = self.batch.len(),
                    size_trigger, time_trigger, "Flushing batch"
                );
                self.flush().await;
            }
        }

        self.close().await;
        self.stats
    }

    /// Write the accumulated batch as one contiguous append and force a
    /// durability flush. On failure the batch is reported and discarded;
    /// the writer never requeues or retries.
    async fn flush(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        self.batch = Vec::with_capacity(self.config.batch_size);

        let mut bytes = Vec::with_capacity(batch.iter().map(|r| r.len() + 1).sum());
        for record in &batch {
            bytes.extend_from_slice(record.as_bytes());
            bytes.push(b'\n');
        }

        match self.write_durably(&bytes).await {
            Ok(()) => {
                self.stats.records_flushed += batch.len() as u64;
                self.stats.batches_flushed += 1;
            }
            Err(e) => {
                // Goes to stderr via the tracing subscriber; the pipeline
                // stays up and the records are gone.
                error!(
                    error = %e,
                    lost_records = batch.len(),
                    "Sink write failed, discarding batch"
                );
                self.stats.records_failed += batch.len() as u64;
            }
        }

        self.last_flush = Instant::now();
    }

    async fn write_durably(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.sink.append(bytes).await?;
        self.sink.flush().await
    }

    /// Close the writer. Residual batched records are discarded, not
    /// flushed; shutdown does not guarantee delivery of in-flight records.
    /// Calling close on an already-closed writer is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if !self.batch.is_empty() {
            self.stats.records_discarded_at_close += self.batch.len() as u64;
            info!(
                discarded = self.batch.len(),
                "Writer closed with unflushed records"
            );
            self.batch.clear();
        }
    }

    /// Totals so far.
    pub fn stats(&self) -> WriterStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{record_queue, QueueSender};
    use crate::sink::MemorySink;
    use tokio::time::timeout;

    fn test_config(batch_size: usize, flush_interval: Duration) -> WriterConfig {
        WriterConfig {
            batch_size,
            flush_interval,
            idle_wait: Duration::from_millis(10),
        }
    }

    fn spawn_writer(
        capacity: usize,
        config: WriterConfig,
    ) -> (
        QueueSender,
        MemorySink,
        CancellationToken,
        tokio::task::JoinHandle<WriterStats>,
    ) {
        let (sender, receiver) = record_queue(capacity);
        let sink = MemorySink::new();
        let token = CancellationToken::new();

        let writer = BatchWriter::new(receiver, sink.clone(), config);
        let handle = tokio::spawn(writer.run(token.clone()));

        (sender, sink, token, handle)
    }

    #[tokio::test]
    async fn test_no_flush_exceeds_batch_size() {
        let (sender, sink, token, handle) =
            spawn_writer(64, test_config(10, Duration::from_secs(60)));

        for i in 0..25 {
            assert!(sender.try_enqueue(format!("record-{}", i)));
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        let stats = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        let appends = sink.appends();
        assert!(!appends.is_empty());
        for chunk in &appends {
            let lines = chunk.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count();
            assert!(lines <= 10, "flush contained {} records", lines);
        }

        // Two full batches of 10 flush on the size trigger; the residue of 5
        // waits on the time trigger and is discarded at close.
        assert_eq!(stats.batches_flushed, 2);
        assert_eq!(stats.records_flushed, 20);
        assert_eq!(stats.records_discarded_at_close, 5);
    }

    #[tokio::test]
    async fn test_time_trigger_flushes_partial_batch() {
        let (sender, sink, token, handle) =
            spawn_writer(64, test_config(100, Duration::from_millis(50)));

        sender.try_enqueue("a".to_string());
        sender.try_enqueue("b".to_string());
        sender.try_enqueue("c".to_string());

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(sink.contents(), b"a\nb\nc\n");
        assert!(sink.flushes() >= 1);

        token.cancel();
        let stats = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(stats.records_flushed, 3);
    }

    #[tokio::test]
    async fn test_round_trip_bytes_and_order() {
        let (sender, sink, token, handle) =
            spawn_writer(64, test_config(3, Duration::from_millis(50)));

        let records = vec![
            r#"{"level":"INFO","message":"first"}"#,
            r#"{"level":"WARNING","message":"second"}"#,
            r#"{"level":"ERROR","message":"third"}"#,
        ];
        for record in &records {
            sender.try_enqueue(record.to_string());
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        let expected: Vec<u8> = records
            .iter()
            .flat_map(|r| r.bytes().chain(std::iter::once(b'\n')))
            .collect();
        assert_eq!(sink.contents(), expected);
    }

    #[tokio::test]
    async fn test_write_failure_discards_batch_and_continues() {
        let (sender, sink, token, handle) =
            spawn_writer(64, test_config(2, Duration::from_secs(60)));

        sink.fail_next_append();
        sender.try_enqueue("lost-1".to_string());
        sender.try_enqueue("lost-2".to_string());

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Writer survived the failure; the next batch goes through.
        sender.try_enqueue("kept-1".to_string());
        sender.try_enqueue("kept-2".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;

        token.cancel();
        let stats = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        assert_eq!(sink.contents(), b"kept-1\nkept-2\n");
        assert_eq!(stats.records_failed, 2);
        assert_eq!(stats.records_flushed, 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_sender, receiver) = record_queue(8);
        let mut writer = BatchWriter::new(
            receiver,
            MemorySink::new(),
            test_config(10, Duration::from_secs(1)),
        );

        writer.close().await;
        writer.close().await;

        assert_eq!(writer.stats().records_discarded_at_close, 0);
    }

    #[tokio::test]
    async fn test_close_does_not_drain_queue() {
        let (sender, sink, token, handle) =
            spawn_writer(64, test_config(10, Duration::from_secs(60)));

        // Cancel before the writer has a chance to see these records.
        token.cancel();
        for i in 0..5 {
            sender.try_enqueue(format!("queued-{}", i));
        }

        let stats = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

        // Close never turns into a final drain-and-flush; anything still
        // queued or batched is lost.
        assert_eq!(stats.records_flushed, 0);
        assert!(sink.contents().is_empty());
    }
}
