#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod time;
pub mod buffer;
pub mod core_map;
pub mod control_bus;
pub mod checksum;
pub mod port;
pub mod net;
pub mod tcp;

pub mod affinity;
pub mod config;
pub mod raw; // OS-level socket helpers (Linux/Windows), used by the REST listener
pub mod mgmt_tcp; // low-latency std TcpListener/TcpStream wrapper for the management plane

pub mod tx_gen;
pub mod http;
pub mod telemetry;
pub mod run_config;
pub mod tls;
pub mod worker;
pub mod engine;
pub mod cli;
pub mod rest;

/// Convenience re-exports for the ambient network plumbing the
/// management plane (REST/CLI) runs on top of.
pub use config::{NetConfig, apply_low_latency};
pub use error::{ConfigError, DropReason, EngineError, ResourceError};
