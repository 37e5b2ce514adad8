//! Lifecycle controller: wires producers, the queue, the writer and the
//! sinks together, and sequences a cooperative shutdown.
//!
//! Control flow: N producers -> rate limiter gate -> serialize record ->
//! queue -> writer -> batch -> file sink. The console echo, when enabled,
//! happens on the producer path and bypasses the batching writer.
//!
//! Shutdown: SIGINT or SIGTERM cancels a shared token; producers observe it
//! at the top of their loop and exit, then the controller closes the writer.
//! The queue is not drained first, so records still in flight are lost —
//! the generator trades completeness for prompt shutdown.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::queue::{record_queue, QueueSender};
use crate::rate::RateLimiter;
use crate::record::RecordGenerator;
use crate::sink::{ConsoleSink, FileSink};
use crate::writer::{BatchWriter, WriterConfig, WriterStats};

/// Logical source name stamped on every generated record.
const LOGGER_NAME: &str = "logsmith";

/// Totals reported when the pipeline stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineReport {
    /// Records admitted by the rate limiter and generated.
    pub records_generated: u64,

    /// Records rejected by the full queue.
    pub records_dropped: u64,

    /// Records flushed durably to the file sink.
    pub records_flushed: u64,

    /// Successful flushes.
    pub batches_flushed: u64,
}

/// Errors that prevent the pipeline from starting.
#[derive(Debug)]
pub enum PipelineError {
    /// The file sink could not be opened.
    Sink(io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Sink(e) => write!(f, "Failed to open file sink: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Sink(e) => Some(e),
        }
    }
}

/// Run the pipeline until an external termination signal arrives.
///
/// Installs handlers for SIGINT and SIGTERM; both cancel the same shutdown
/// token.
pub async fn run(config: Config) -> Result<PipelineReport, PipelineError> {
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        info!("Termination signal received, shutting down");
        signal_token.cancel();
    });

    run_with_shutdown(config, shutdown).await
}

/// Run the pipeline until `shutdown` is cancelled.
///
/// Split out from [`run`] so tests can drive the lifecycle without process
/// signals.
pub async fn run_with_shutdown(
    config: Config,
    shutdown: CancellationToken,
) -> Result<PipelineReport, PipelineError> {
    let generator = Arc::new(RecordGenerator::new(LOGGER_NAME));
    let limiter = Arc::new(RateLimiter::new(config.logs_per_second));
    let generated = Arc::new(AtomicU64::new(0));
    let console = config.enable_stdout.then_some(ConsoleSink);

    // The queue and writer only exist when the file sink is enabled; the
    // console echo never goes through them.
    let (queue_sender, writer_handle, writer_shutdown) = if config.enable_file {
        let (sender, receiver) = record_queue(config.queue_capacity);
        let sink = FileSink::open(&config.file_path)
            .await
            .map_err(PipelineError::Sink)?;

        let writer = BatchWriter::new(receiver, sink, WriterConfig::new(config.batch_size));
        let writer_shutdown = CancellationToken::new();
        let handle = tokio::spawn(writer.run(writer_shutdown.clone()));

        (Some(sender), Some(handle), Some(writer_shutdown))
    } else {
        (None, None, None)
    };

    info!(
        workers = config.workers,
        rate = config.logs_per_second,
        batch_size = config.batch_size,
        queue_capacity = config.queue_capacity,
        file = config.enable_file,
        stdout = config.enable_stdout,
        "Pipeline started"
    );

    let mut producers: Vec<JoinHandle<()>> = Vec::with_capacity(config.workers);
    for worker_id in 0..config.workers {
        producers.push(tokio::spawn(producer_loop(
            worker_id,
            generator.clone(),
            limiter.clone(),
            queue_sender.clone(),
            console,
            generated.clone(),
            shutdown.clone(),
        )));
    }

    // Producers exit first; only then is the writer told to close, so every
    // record a producer managed to enqueue had a chance to be drained.
    for handle in producers {
        if let Err(e) = handle.await {
            warn!(error = %e, "Producer task panicked");
        }
    }

    let writer_stats = match (writer_handle, writer_shutdown) {
        (Some(handle), Some(token)) => {
            token.cancel();
            match handle.await {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(error = %e, "Writer task panicked");
                    WriterStats::default()
                }
            }
        }
        _ => WriterStats::default(),
    };

    let report = PipelineReport {
        records_generated: generated.load(Ordering::Relaxed),
        records_dropped: queue_sender.as_ref().map(|s| s.dropped()).unwrap_or(0),
        records_flushed: writer_stats.records_flushed,
        batches_flushed: writer_stats.batches_flushed,
    };

    info!(
        generated = report.records_generated,
        dropped = report.records_dropped,
        flushed = report.records_flushed,
        batches = report.batches_flushed,
        "Pipeline stopped"
    );

    Ok(report)
}

/// One producer task: gate on the rate limiter, generate a record, echo it
/// to the console if enabled, and offer it to the queue.
///
/// Cancellation is checked at the top of each iteration and while waiting
/// on the limiter; an emission already past the gate completes in full.
async fn producer_loop(
    worker_id: usize,
    generator: Arc<RecordGenerator>,
    limiter: Arc<RateLimiter>,
    queue: Option<QueueSender>,
    console: Option<ConsoleSink>,
    generated: Arc<AtomicU64>,
    shutdown: CancellationToken,
) {
    debug!(worker_id, "Producer started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = limiter.admit() => {}
        }

        let line = generator.generate_line();
        generated.fetch_add(1, Ordering::Relaxed);

        if let Some(console) = &console {
            if let Err(e) = console.write_line(&line) {
                // Diagnostic echo only; the durable path is unaffected.
                error!(error = %e, "Console write failed");
            }
        }

        if let Some(queue) = &queue {
            // A false return is load shedding, already counted by the queue.
            let _ = queue.try_enqueue(line);
        }
    }

    debug!(worker_id, "Producer stopped");
}

/// Resolve when the process receives SIGINT or SIGTERM.
async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                // Fall back to ctrl-c alone.
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
