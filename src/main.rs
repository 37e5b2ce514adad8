//! Logsmith - synthetic log traffic generator
//!
//! Generates structured JSON log records at a controlled rate from multiple
//! concurrent producers and persists them durably through a batching writer,
//! with an optional unbuffered console echo.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `LOG_FILE_PATH`: destination for file output (default: /var/log/app.log)
//! - `BATCH_SIZE`: records per flush (default: 1000)
//! - `WORKERS`: producer task count (default: 4)
//! - `ENABLE_STDOUT`: echo records to stdout (default: false)
//! - `ENABLE_FILE`: write records to the log file (default: true)
//! - `LOGS_PER_SECOND`: target aggregate emission rate (default: 10)
//! - `QUEUE_CAPACITY`: bounded queue capacity (default: 100000)
//! - `RUST_LOG`: diagnostic logging level filter (default: info)

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use logsmith::config::Config;
use logsmith::pipeline;

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr; stdout is reserved for the console echo sink.
    init_tracing();

    info!("Starting logsmith...");

    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                file_path = %config.file_path.display(),
                batch_size = config.batch_size,
                workers = config.workers,
                enable_stdout = config.enable_stdout,
                enable_file = config.enable_file,
                logs_per_second = config.logs_per_second,
                queue_capacity = config.queue_capacity,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    match pipeline::run(config).await {
        Ok(report) => {
            info!(
                generated = report.records_generated,
                dropped = report.records_dropped,
                flushed = report.records_flushed,
                "Logsmith stopped"
            );
            eprintln!("Log generator stopped.");
        }
        Err(e) => {
            error!(error = %e, "Pipeline failed to start");
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}
