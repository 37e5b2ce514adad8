//! Synthetic log record generation.
//!
//! This module produces semantically-rich JSON log records that mimic the
//! traffic of a busy web service: request/response details, user identity,
//! geo and device attribution, system metrics, and distributed-trace context.
//! Each call to [`RecordGenerator::generate_line`] yields one fully serialized
//! JSON object; the pipeline treats it as an opaque line from that point on.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Log severity levels, serialized in the upper-case style of the
/// downstream indexers this generator seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// All severities, in weight-table order.
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Debug,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Critical,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Debug => write!(f, "DEBUG"),
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

const ENDPOINTS: &[&str] = &[
    "/api/v1/users",
    "/api/v1/products",
    "/api/v1/orders",
    "/api/v1/analytics",
    "/api/v1/reports",
];

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH"];

const HTTP_STATUS: &[u16] = &[
    200, 201, 202, 204, 301, 302, 400, 401, 403, 404, 500, 502, 503,
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1",
];

/// Geographic coordinates attached to a location.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Client location attribution.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub city: &'static str,
    pub district: &'static str,
    pub isp: &'static str,
    pub ip: &'static str,
    pub coordinates: Coordinates,
}

const LOCATIONS: &[Location] = &[
    Location {
        city: "Berlin",
        district: "Mitte",
        isp: "Deutsche Telekom",
        ip: "123.123.123.123",
        coordinates: Coordinates { lat: 52.5200, lon: 13.4050 },
    },
    Location {
        city: "London",
        district: "Camden",
        isp: "BT Group",
        ip: "124.124.124.124",
        coordinates: Coordinates { lat: 51.5074, lon: -0.1278 },
    },
    Location {
        city: "New York",
        district: "Brooklyn",
        isp: "Verizon",
        ip: "125.125.125.125",
        coordinates: Coordinates { lat: 40.7128, lon: -74.0060 },
    },
    Location {
        city: "Tokyo",
        district: "Shibuya",
        isp: "NTT",
        ip: "126.126.126.126",
        coordinates: Coordinates { lat: 35.6762, lon: 139.6503 },
    },
];

/// Client device attribution.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub os: &'static str,
    pub version: &'static str,
    pub browser: &'static str,
    pub device_type: &'static str,
}

const DEVICES: &[DeviceInfo] = &[
    DeviceInfo { os: "Windows", version: "10", browser: "Chrome", device_type: "Desktop" },
    DeviceInfo { os: "MacOS", version: "11.4", browser: "Safari", device_type: "Laptop" },
    DeviceInfo { os: "iOS", version: "14.6", browser: "Safari", device_type: "Mobile" },
    DeviceInfo { os: "Android", version: "11", browser: "Chrome", device_type: "Mobile" },
];

/// Error classification for failing requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub details: &'static str,
    pub solution: &'static str,
}

/// Look up the error catalog entry for a status code, if it is an error.
fn error_detail(status: u16) -> Option<ErrorDetail> {
    let detail = match status {
        400 => ErrorDetail {
            kind: "ValidationError",
            details: "Request parameter validation failed",
            solution: "Check the request parameter format",
        },
        401 => ErrorDetail {
            kind: "AuthenticationError",
            details: "User is not authenticated",
            solution: "Sign in first",
        },
        403 => ErrorDetail {
            kind: "AuthorizationError",
            details: "Insufficient permissions",
            solution: "Request the required role",
        },
        404 => ErrorDetail {
            kind: "NotFoundError",
            details: "Resource does not exist",
            solution: "Check the resource identifier",
        },
        500 | 502 | 503 => ErrorDetail {
            kind: "InternalError",
            details: "Internal server error",
            solution: "Contact technical support",
        },
        _ => return None,
    };
    Some(detail)
}

/// Request/response details for one synthetic hit.
#[derive(Debug, Clone, Serialize)]
pub struct RequestInfo {
    pub id: Uuid,
    pub method: &'static str,
    pub endpoint: &'static str,
    pub status: u16,
    pub duration_ms: f64,
    pub size_bytes: u64,
    pub protocol: &'static str,
    pub user_agent: &'static str,
}

/// Identity of the synthetic user behind a request.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub tier: &'static str,
    pub registration_date: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuMetrics {
    pub usage_percent: f64,
    pub load_average: [f64; 3],
    pub core_count: u32,
    pub process_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryMetrics {
    pub total_gb: u32,
    pub used_gb: f64,
    pub used_percent: f64,
    pub swap_used_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskMetrics {
    pub total_gb: u32,
    pub used_gb: f64,
    pub used_percent: f64,
    pub io_util_percent: f64,
    pub read_mbps: f64,
    pub write_mbps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkMetrics {
    pub rx_mbps: f64,
    pub tx_mbps: f64,
    pub established_connections: u32,
}

/// Point-in-time system gauges, nested as the downstream schema expects.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub network: NetworkMetrics,
}

/// Distributed-trace context for the record.
#[derive(Debug, Clone, Serialize)]
pub struct TraceContext {
    pub trace_id: Uuid,
    pub span_id: String,
    pub parent_span_id: String,
    pub sampled: bool,
    pub flags: u8,
}

/// Coarse business gauges sampled alongside the request.
#[derive(Debug, Clone, Serialize)]
pub struct BusinessMetrics {
    pub queue_size: u32,
    pub cache_hit_ratio: f64,
    pub active_users: u32,
    pub transaction_count: u32,
}

/// A fully populated synthetic log record.
///
/// Serializes to a single self-contained JSON object. Field order matches
/// declaration order, so the timestamp and severity always lead the line.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Severity,
    pub message: String,
    pub logger: String,
    pub trace_id: Uuid,
    pub host: String,
    pub pid: u32,
    pub request: RequestInfo,
    pub user: UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub location: Location,
    pub device: DeviceInfo,
    pub metrics: SystemMetrics,
    pub trace: TraceContext,
    pub business_metrics: BusinessMetrics,
}

/// Round to two decimal places, matching gauge precision downstream.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generator for synthetic log records.
///
/// Stateless between calls apart from the fixed identity fields (logger name,
/// host, pid) and the severity weight table.
pub struct RecordGenerator {
    logger_name: String,
    host: String,
    pid: u32,
    level_weights: WeightedIndex<u32>,
}

impl RecordGenerator {
    /// Create a generator emitting under the given logical source name.
    pub fn new(logger_name: impl Into<String>) -> Self {
        // Mostly INFO with occasional WARNING/ERROR, rare DEBUG/CRITICAL.
        // Debug: 10%, Info: 70%, Warning: 12%, Error: 7%, Critical: 1%
        let weights = [10u32, 70, 12, 7, 1];
        let level_weights = WeightedIndex::new(weights).expect("static weights are valid");

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            logger_name: logger_name.into(),
            host,
            pid: std::process::id(),
            level_weights,
        }
    }

    /// Generate one record with fresh identifiers and sampled field values.
    pub fn generate(&self) -> LogRecord {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        let level = Severity::all()[self.level_weights.sample(&mut rng)];
        let status = HTTP_STATUS[rng.gen_range(0..HTTP_STATUS.len())];
        let location = LOCATIONS[rng.gen_range(0..LOCATIONS.len())].clone();
        let device = DEVICES[rng.gen_range(0..DEVICES.len())].clone();

        let request = RequestInfo {
            id: Uuid::new_v4(),
            method: HTTP_METHODS[rng.gen_range(0..HTTP_METHODS.len())],
            endpoint: ENDPOINTS[rng.gen_range(0..ENDPOINTS.len())],
            status,
            duration_ms: round2(rng.gen_range(10.0..2000.0)),
            size_bytes: rng.gen_range(500..15000),
            protocol: "HTTP/2.0",
            user_agent: USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())],
        };

        let user = UserInfo {
            id: format!("user_{}", rng.gen_range(100..999)),
            tier: ["free", "premium", "enterprise"][rng.gen_range(0..3)],
            registration_date: now - ChronoDuration::days(rng.gen_range(1..365)),
            last_login: now,
        };

        let metrics = self.generate_metrics(&mut rng);

        let trace_id = Uuid::new_v4();
        let trace = TraceContext {
            trace_id,
            span_id: short_id(),
            parent_span_id: short_id(),
            sampled: true,
            flags: 1,
        };

        let business_metrics = BusinessMetrics {
            queue_size: rng.gen_range(0..1000),
            cache_hit_ratio: round2(rng.gen_range(0.5..1.0)),
            active_users: rng.gen_range(1000..10000),
            transaction_count: rng.gen_range(100..1000),
        };

        let message = format!(
            "[{}] {} - Status: {} - Duration: {}ms - User: {} - Location: {}/{} - \
             Device: {}/{} - CPU: {}% - Memory: {}% - Network: rx {}Mbps tx {}Mbps",
            request.method,
            request.endpoint,
            status,
            request.duration_ms,
            user.id,
            location.city,
            location.district,
            device.os,
            device.browser,
            metrics.cpu.usage_percent,
            metrics.memory.used_percent,
            metrics.network.rx_mbps,
            metrics.network.tx_mbps,
        );

        LogRecord {
            timestamp: now,
            level,
            message,
            logger: self.logger_name.clone(),
            trace_id,
            host: self.host.clone(),
            pid: self.pid,
            request,
            user,
            error: error_detail(status),
            location,
            device,
            metrics,
            trace,
            business_metrics,
        }
    }

    /// Generate one record serialized as a single JSON line, no trailing
    /// newline. The pipeline appends the separator at the sink boundary.
    pub fn generate_line(&self) -> String {
        let record = self.generate();
        // A record built from owned fields always serializes.
        serde_json::to_string(&record).expect("record serialization is infallible")
    }

    fn generate_metrics(&self, rng: &mut impl Rng) -> SystemMetrics {
        SystemMetrics {
            cpu: CpuMetrics {
                usage_percent: round2(rng.gen_range(0.0..100.0)),
                load_average: [
                    round2(rng.gen_range(0.0..5.0)),
                    round2(rng.gen_range(0.0..5.0)),
                    round2(rng.gen_range(0.0..5.0)),
                ],
                core_count: 8,
                process_count: rng.gen_range(100..500),
            },
            memory: MemoryMetrics {
                total_gb: 32,
                used_gb: round2(rng.gen_range(0.0..32.0)),
                used_percent: round2(rng.gen_range(0.0..100.0)),
                swap_used_percent: round2(rng.gen_range(0.0..50.0)),
            },
            disk: DiskMetrics {
                total_gb: 512,
                used_gb: round2(rng.gen_range(0.0..512.0)),
                used_percent: round2(rng.gen_range(0.0..100.0)),
                io_util_percent: round2(rng.gen_range(0.0..100.0)),
                read_mbps: round2(rng.gen_range(0.0..1000.0)),
                write_mbps: round2(rng.gen_range(0.0..1000.0)),
            },
            network: NetworkMetrics {
                rx_mbps: round2(rng.gen_range(0.0..1000.0)),
                tx_mbps: round2(rng.gen_range(0.0..1000.0)),
                established_connections: rng.gen_range(1000..5000),
            },
        }
    }
}

/// 16-hex-character span identifier.
fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..16].to_string()
}
