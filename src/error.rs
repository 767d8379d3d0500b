//! Crate-wide error taxonomy.
//!
//! Per the propagation policy of the data plane: worker threads never
//! propagate errors outward. Every per-packet failure becomes a metrics
//! counter increment (see [`crate::telemetry`]) and, where applicable, a
//! state transition. The types here are reserved for conditions that are
//! fatal at *initialization* time — configuration, resource, and port
//! setup failures — which is the only point at which this crate's public
//! API returns a `Result` up to `main`.

use std::fmt;
use thiserror::Error;

/// Top-level error returned from engine initialization.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("port error: {0}")]
    Port(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration load/validation failures (§6, §7 "Configuration errors").
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no flows configured: at least one flow is required")]
    NoFlows,

    #[error("flow {index}: dst_ip must be non-zero")]
    MissingDstIp { index: usize },

    #[error("flow {index}: dst_port must be non-zero unless icmp_ping is set")]
    MissingDstPort { index: usize },

    #[error("load.max_concurrent must be greater than zero")]
    InvalidMaxConcurrent,

    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal resource acquisition failures (§7 "Resource errors").
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("buffer pool exhausted all allocation tiers (1GiB, 2MiB, 4KiB) for worker {worker}")]
    BufferPoolExhausted { worker: usize },

    #[error("core assignment failed: need at least 2 cores, have {available}")]
    InsufficientCores { available: usize },

    #[error("core assignment failed: no worker cores available (n_cores={n_cores} n_mgmt={n_mgmt})")]
    NoWorkerCores { n_cores: usize, n_mgmt: usize },

    #[error("manual core assignment is inconsistent: requested {requested} exceeds available {available}")]
    InconsistentManualAssignment { requested: usize, available: usize },
}

/// Reasons a buffer, segment, or datagram was dropped in the data path.
///
/// These are never returned as `Result`s; they are fed straight to
/// [`crate::telemetry::WorkerMetrics`] counters. The enum exists so call
/// sites and tests can name a drop reason instead of an anonymous `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    BadIpChecksum,
    Fragment,
    NotForUs,
    BadIcmpParse,
    BadTcpParse,
    BadHttpParse,
    RingOverflow,
    SynQueueFull,
    PortPoolExhausted,
    NicTxDropped,
    Other,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::BadIpChecksum => "bad_ip_checksum",
            DropReason::Fragment => "fragment",
            DropReason::NotForUs => "not_for_us",
            DropReason::BadIcmpParse => "bad_icmp_parse",
            DropReason::BadTcpParse => "bad_tcp_parse",
            DropReason::BadHttpParse => "bad_http_parse",
            DropReason::RingOverflow => "ring_overflow",
            DropReason::SynQueueFull => "syn_queue_full",
            DropReason::PortPoolExhausted => "port_pool_exhausted",
            DropReason::NicTxDropped => "nic_tx_dropped",
            DropReason::Other => "other",
        };
        f.write_str(s)
    }
}
