//! Configuration module for the log generator pipeline.
//!
//! All settings come from environment variables, resolved once at startup
//! and immutable afterwards. Validation failures are fatal and happen before
//! any producer or writer task starts.

use std::env;
use std::path::PathBuf;

/// Default destination for file output.
const DEFAULT_LOG_FILE_PATH: &str = "/var/log/app.log";

/// Default records per flush.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default producer task count.
const DEFAULT_WORKERS: usize = 4;

/// Default target emission rate in records per second.
const DEFAULT_LOGS_PER_SECOND: f64 = 10.0;

/// Default bounded queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 100_000;

/// Upper bound on batch size to keep a single flush allocation sane.
const MAX_BATCH_SIZE: usize = 100_000;

/// Upper bound on producer count.
const MAX_WORKERS: usize = 256;

/// Pipeline configuration.
///
/// Environment surface:
/// - `LOG_FILE_PATH`: destination for file output (default: /var/log/app.log)
/// - `BATCH_SIZE`: records per flush (default: 1000)
/// - `WORKERS`: producer task count (default: 4)
/// - `ENABLE_STDOUT`: echo records to stdout (default: false)
/// - `ENABLE_FILE`: write records to the log file (default: true)
/// - `LOGS_PER_SECOND`: target aggregate emission rate (default: 10)
/// - `QUEUE_CAPACITY`: bounded queue capacity (default: 100000)
#[derive(Debug, Clone)]
pub struct Config {
    /// Destination path for file output.
    pub file_path: PathBuf,

    /// Number of records to accumulate before the writer flushes.
    pub batch_size: usize,

    /// Number of concurrent producer tasks.
    pub workers: usize,

    /// Echo each record to stdout at emission time.
    pub enable_stdout: bool,

    /// Persist records to the log file through the batching writer.
    pub enable_file: bool,

    /// Target aggregate emission rate, records per second.
    pub logs_per_second: f64,

    /// Capacity of the bounded record queue.
    pub queue_capacity: usize,
}

/// Error type for configuration loading failures.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub env_var: Option<String>,
}

impl ConfigError {
    fn for_var(env_var: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            env_var: Some(env_var.to_string()),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.env_var {
            Some(var) => write!(f, "Configuration error for {}: {}", var, self.message),
            None => write!(f, "Configuration error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any numeric variable fails to parse or falls
    /// outside its allowed range, if the rate is not strictly positive, or
    /// if both outputs are disabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file_path = env::var("LOG_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE_PATH));

        let batch_size = parse_count("BATCH_SIZE", DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE)?;
        let workers = parse_count("WORKERS", DEFAULT_WORKERS, MAX_WORKERS)?;
        let queue_capacity = parse_count("QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY, usize::MAX)?;

        let enable_stdout = parse_bool("ENABLE_STDOUT", false)?;
        let enable_file = parse_bool("ENABLE_FILE", true)?;

        let logs_per_second = parse_rate("LOGS_PER_SECOND", DEFAULT_LOGS_PER_SECOND)?;

        let config = Self {
            file_path,
            batch_size,
            workers,
            enable_stdout,
            enable_file,
            logs_per_second,
            queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enable_file && !self.enable_stdout {
            return Err(ConfigError {
                message: "at least one output must be enabled (ENABLE_FILE or ENABLE_STDOUT)"
                    .to_string(),
                env_var: None,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    /// Default configuration, as if no environment variables were set.
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_LOG_FILE_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            enable_stdout: false,
            enable_file: true,
            logs_per_second: DEFAULT_LOGS_PER_SECOND,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Parse a positive integer variable with an upper bound.
fn parse_count(env_var: &str, default: usize, max: usize) -> Result<usize, ConfigError> {
    match env::var(env_var) {
        Ok(value) => {
            let count: usize = value.parse().map_err(|_| {
                ConfigError::for_var(env_var, format!("'{}' is not a valid number", value))
            })?;

            if count == 0 {
                return Err(ConfigError::for_var(env_var, "must be greater than 0"));
            }
            if count > max {
                return Err(ConfigError::for_var(
                    env_var,
                    format!("{} exceeds maximum allowed ({})", count, max),
                ));
            }

            Ok(count)
        }
        Err(_) => Ok(default),
    }
}

/// Parse a boolean variable. Accepts true/false/1/0, case-insensitive.
fn parse_bool(env_var: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(env_var) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::for_var(
                env_var,
                format!("'{}' is not a valid boolean", value),
            )),
        },
        Err(_) => Ok(default),
    }
}

/// Parse the target rate. Must be strictly positive and finite; the rate
/// limiter divides by it.
fn parse_rate(env_var: &str, default: f64) -> Result<f64, ConfigError> {
    match env::var(env_var) {
        Ok(value) => {
            let rate: f64 = value.parse().map_err(|_| {
                ConfigError::for_var(env_var, format!("'{}' is not a valid number", value))
            })?;

            if !rate.is_finite() || rate <= 0.0 {
                return Err(ConfigError::for_var(
                    env_var,
                    "rate must be strictly positive",
                ));
            }

            Ok(rate)
        }
        Err(_) => Ok(default),
    }
}
