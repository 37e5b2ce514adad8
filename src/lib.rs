//! Logsmith
//!
//! Synthetic log traffic generator: rate-limited concurrent producers feed a
//! bounded queue, a dedicated writer batches records under a size-or-time
//! policy and flushes them durably to a file, with an optional unbuffered
//! console echo. Built to stress-test and seed downstream log pipelines.
//!
//! - **config**: environment-based pipeline configuration
//! - **record**: synthetic JSON record generation
//! - **rate**: shared-cadence rate limiter for producers
//! - **queue**: bounded record queue with load shedding
//! - **writer**: batching writer with dual-trigger flushing
//! - **sink**: durable file sink and console echo
//! - **pipeline**: lifecycle controller and shutdown sequencing
//!
//! # Example
//!
//! ```no_run
//! use logsmith::config::Config;
//! use logsmith::pipeline;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!     let report = pipeline::run(config).await.expect("Pipeline failed");
//!     println!(
//!         "generated {} records, flushed {}",
//!         report.records_generated, report.records_flushed
//!     );
//! }
//! ```

// Module declarations
pub mod config;
pub mod pipeline;
pub mod queue;
pub mod rate;
pub mod record;
pub mod sink;
pub mod writer;

// Re-export commonly used types at crate root for convenience
pub use config::{Config, ConfigError};
pub use pipeline::{PipelineError, PipelineReport};
pub use queue::{record_queue, QueueReceiver, QueueSender};
pub use rate::RateLimiter;
pub use record::{LogRecord, RecordGenerator, Severity};
pub use sink::{ConsoleSink, FileSink, MemorySink, Sink};
pub use writer::{BatchWriter, WriterConfig, WriterStats};
