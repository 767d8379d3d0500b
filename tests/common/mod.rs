//! Shared scaffolding for the end-to-end scenarios in this directory:
//! a one-worker `WorkerContext` wired to a `RingNic` a test can inject
//! synthetic frames into, plus the frame builders needed to drive the
//! TCP/ARP dispatch paths through `WorkerContext::run_once` exactly as
//! the real worker loop would see them off the wire.

use std::sync::Arc;

use netgen::buffer::BufferPool;
use netgen::control_bus::WorkerChannel;
use netgen::net::arp::ArpCache;
use netgen::net::route::RouteTable;
use netgen::net::{ethernet, ipv4};
use netgen::port::{NicPort, RingNic};
use netgen::tcp::fsm::{self, TcpFlags};
use netgen::tcp::port_pool::PortPool;
use netgen::tcp::tcb::TcbStore;
use netgen::telemetry::WorkerMetrics;
use netgen::worker::{WorkerContext, WorkerFlags};

pub const LOCAL_IP: u32 = 0x0a000001;
pub const LOCAL_MAC: [u8; 6] = [1, 2, 3, 4, 5, 6];
pub const PEER_IP: u32 = 0x0a000002;
pub const PEER_MAC: [u8; 6] = [6, 5, 4, 3, 2, 1];

/// Builds a one-worker harness: a `WorkerContext` exactly like
/// `engine.rs` assembles one, plus the concrete `RingNic` handle a test
/// needs to inject inbound frames (the context only holds the trait
/// object).
pub fn make_ctx(max_concurrent: usize) -> (WorkerContext, WorkerChannel, Arc<RingNic>) {
    let pool = BufferPool::new(0, 8, 8, 4, 1).unwrap();
    let ring = Arc::new(RingNic::new());
    let nic: Arc<dyn NicPort> = ring.clone();
    let arp = Arc::new(ArpCache::new(LOCAL_IP, LOCAL_MAC));
    let routes = Arc::new(RouteTable::new());
    let flags = Arc::new(WorkerFlags::new());

    let ctx = WorkerContext {
        worker_idx: 0,
        local_ip: LOCAL_IP,
        local_mac: LOCAL_MAC,
        pool,
        nic,
        arp,
        routes,
        tcbs: TcbStore::new(max_concurrent),
        ports: PortPool::new(),
        generators: Vec::new(),
        metrics: WorkerMetrics::new(),
        flags,
    };
    let channel = WorkerChannel::new(8);
    (ctx, channel, ring)
}

/// Builds one inbound Ethernet+IPv4+TCP frame from `PEER_IP`/`PEER_MAC`
/// to `LOCAL_IP`/`LOCAL_MAC`, as `run_once`'s RX classification would
/// see it arrive off a real port.
#[allow(clippy::too_many_arguments)]
pub fn build_inbound_tcp_frame(
    local_port: u16,
    remote_port: u16,
    seq: u32,
    ack: u32,
    flags: TcpFlags,
    window: u16,
    payload: &[u8],
) -> Vec<u8> {
    let tcp_seg = fsm::build_segment(
        PEER_IP, LOCAL_IP, remote_port, local_port, seq, ack, flags, window, payload,
    );
    let ip_hdr = ipv4::build(
        PEER_IP,
        LOCAL_IP,
        ipv4::PROTO_TCP,
        1,
        64,
        0,
        false,
        tcp_seg.len() as u16,
        false,
    );
    let eth_hdr = ethernet::build(LOCAL_MAC, PEER_MAC, ethernet::ETHERTYPE_IPV4);

    let mut frame = Vec::with_capacity(eth_hdr.len() + ip_hdr.len() + tcp_seg.len());
    frame.extend_from_slice(&eth_hdr);
    frame.extend_from_slice(&ip_hdr);
    frame.extend_from_slice(&tcp_seg);
    frame
}

/// Pushes raw bytes onto a `RingNic` as if they'd just arrived on the
/// wire, going through the same `Buffer` acquire/append path a real
/// port's RX ring would.
pub fn inject(ctx: &WorkerContext, ring: &RingNic, bytes: &[u8]) {
    let mut buf = ctx.pool.acquire().expect("buffer available");
    assert!(buf.append(bytes));
    ring.inject_rx(buf);
}
