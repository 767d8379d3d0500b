//! Per-core worker loop (component P), §4.13. Grounded on the
//! source's `worker_loop.c`: drain the control ring, RX burst and
//! classify, run one TX generation pass, burst TX, then step the TCP
//! timer. `Stop`/`Start` gate generation only; `Shutdown` is the one
//! command a worker must finish processing before it next polls the
//! NIC, so it's handled synchronously inside the drain step itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::buffer::{Buffer, BufferPool};
use crate::control_bus::{Cmd, WorkerChannel};
use crate::error::DropReason;
use crate::net::arp::ArpCache;
use crate::net::route::RouteTable;
use crate::net::{ethernet, ipv4};
use crate::port::NicPort;
use crate::tcp::fsm::{self, SegmentView, TcpFlags};
use crate::tcp::port_pool::PortPool;
use crate::tcp::tcb::{FourTuple, TcbStore};
use crate::telemetry::WorkerMetrics;
use crate::time::now_ticks;
use crate::tx_gen::TxGenerator;

/// Separately-settable flags a worker checks every iteration: `run`
/// gates the whole loop (cleared by `Shutdown`, observed once per
/// iteration so shutdown is prompt without needing a poison pill on
/// the data ring), `traffic` gates only generation (`Stop`/`Start`),
/// matching the source's own two-flag design.
pub struct WorkerFlags {
    pub run: AtomicBool,
    pub traffic: AtomicBool,
}

impl WorkerFlags {
    pub fn new() -> Self {
        WorkerFlags { run: AtomicBool::new(true), traffic: AtomicBool::new(false) }
    }
}

impl Default for WorkerFlags {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WorkerContext {
    pub worker_idx: usize,
    pub local_ip: u32,
    pub local_mac: [u8; 6],
    pub pool: BufferPool,
    pub nic: Arc<dyn NicPort>,
    pub arp: Arc<ArpCache>,
    pub routes: Arc<RouteTable>,
    pub tcbs: TcbStore,
    pub ports: PortPool,
    pub generators: Vec<TxGenerator>,
    pub metrics: WorkerMetrics,
    pub flags: Arc<WorkerFlags>,
}

impl WorkerContext {
    /// Runs one iteration of the loop. Returns `false` once `Shutdown`
    /// has been processed and the worker should exit.
    pub fn run_once(&mut self, channel: &WorkerChannel) -> bool {
        if !self.drain_control(channel) {
            return false;
        }

        let now = now_ticks();

        let rx = self.nic.rx_burst(0, 64);
        for buf in rx {
            self.classify_and_dispatch(buf);
        }

        if self.flags.traffic.load(Ordering::Relaxed) {
            self.generate_tx(now);
        }

        crate::tcp::timer::tick(&mut self.tcbs, now);
        self.ports.tick(now);

        true
    }

    fn drain_control(&mut self, channel: &WorkerChannel) -> bool {
        while let Some(msg) = channel.to_worker.try_pop() {
            let rc = match msg.cmd {
                Cmd::Shutdown => {
                    let _ = channel.to_mgmt.try_push(crate::control_bus::AckMsg {
                        worker_idx: self.worker_idx as u32,
                        seq: msg.seq,
                        rc: 0,
                    });
                    return false;
                }
                Cmd::Start => {
                    self.flags.traffic.store(true, Ordering::Relaxed);
                    0
                }
                Cmd::Stop => {
                    self.flags.traffic.store(false, Ordering::Relaxed);
                    0
                }
                Cmd::SetRate | Cmd::SetProfile | Cmd::Noop => 0,
            };
            let _ = channel.to_mgmt.try_push(crate::control_bus::AckMsg {
                worker_idx: self.worker_idx as u32,
                seq: msg.seq,
                rc,
            });
        }
        true
    }

    fn classify_and_dispatch(&mut self, mut buf: Buffer) {
        let eth = match ethernet::parse(buf.as_slice()) {
            Some(e) => e,
            None => {
                self.metrics.record_drop(DropReason::Other);
                self.pool.release(buf);
                return;
            }
        };

        match eth.ethertype {
            ethernet::ETHERTYPE_ARP => {
                // ARP state transitions run on the management core;
                // the worker only forwards. In this single-process
                // harness that hand-off is a direct call.
                let rx_port = buf.port;
                if let Some(pkt) = crate::net::arp::parse(&buf.as_slice()[eth.payload_offset..]) {
                    let (reply, flushed) = self.arp.process_incoming(&pkt, rx_port);
                    if let Some(frame) = reply {
                        self.send_frame(frame.port, frame.bytes);
                    }
                    for held in flushed {
                        self.pool.release(held);
                    }
                }
                self.pool.release(buf);
            }
            ethernet::ETHERTYPE_IPV4 => {
                buf.strip_front(eth.payload_offset);
                self.dispatch_ipv4(buf);
            }
            _ => {
                self.metrics.record_drop(DropReason::NotForUs);
                self.pool.release(buf);
            }
        }
    }

    fn dispatch_ipv4(&mut self, buf: Buffer) {
        let view = match ipv4::parse(buf.as_slice(), self.local_ip, false) {
            Ok(v) => v,
            Err(ipv4::Ipv4Error::Fragment) => {
                self.metrics.record_drop(DropReason::Fragment);
                self.pool.release(buf);
                return;
            }
            Err(ipv4::Ipv4Error::BadChecksum) => {
                self.metrics.record_drop(DropReason::BadIpChecksum);
                self.pool.release(buf);
                return;
            }
            Err(ipv4::Ipv4Error::NotForUs) => {
                self.metrics.record_drop(DropReason::NotForUs);
                self.pool.release(buf);
                return;
            }
            Err(_) => {
                self.metrics.record_drop(DropReason::Other);
                self.pool.release(buf);
                return;
            }
        };

        self.metrics.rx_packets += 1;
        self.metrics.rx_bytes += view.payload.len() as u64;

        match view.protocol {
            ipv4::PROTO_ICMP => {
                if let Some(echo) = crate::net::icmp::parse(view.payload) {
                    if echo.is_reply {
                        self.metrics.icmp_echo_received += 1;
                    }
                } else {
                    self.metrics.record_drop(DropReason::BadIcmpParse);
                }
            }
            ipv4::PROTO_TCP => {
                let rx_port = buf.port;
                let remote_ip = view.src;
                match fsm::parse_header(view.payload) {
                    Some(seg) => {
                        let tuple = FourTuple {
                            local_ip: self.local_ip,
                            local_port: seg.dst_port,
                            remote_ip,
                            remote_port: seg.src_port,
                        };
                        self.handle_tcp_segment(tuple, &seg, rx_port);
                    }
                    None => {
                        self.metrics.record_drop(DropReason::BadTcpParse);
                    }
                }
            }
            ipv4::PROTO_UDP => {
                if crate::net::udp::parse(view.payload).is_none() {
                    self.metrics.record_drop(DropReason::Other);
                }
            }
            _ => {}
        }

        self.pool.release(buf);
    }

    /// TCB lookup/dispatch by four-tuple (§4.13, §2 "TCP segments enter
    /// the FSM"): a bare SYN with no match opens a passive connection
    /// and answers with SYN-ACK; a match is handed straight to
    /// `fsm::on_segment` and its outcome turned into a transmitted
    /// segment and/or TCB removal.
    fn handle_tcp_segment(&mut self, tuple: FourTuple, seg: &SegmentView<'_>, rx_port: u16) {
        let now = now_ticks();

        if self.tcbs.get(&tuple).is_none() {
            if seg.flags.syn && !seg.flags.ack {
                let iss = (now as u32) ^ 0x5a5a_5a5a;
                let mss = seg.options.mss.unwrap_or(1460);
                match self.tcbs.insert(tuple, fsm::open_passive(iss, seg.seq, mss)) {
                    Ok(()) => {
                        let tcb = self.tcbs.get(&tuple).unwrap();
                        let flags = TcpFlags { syn: true, ack: true, ..Default::default() };
                        let frame = self.build_tcp_frame(
                            tuple.remote_ip,
                            tuple.local_port,
                            tuple.remote_port,
                            tcb.iss,
                            tcb.rcv_nxt,
                            flags,
                            tcb.rcv_wnd as u16,
                        );
                        self.send_frame(rx_port, frame);
                    }
                    Err(_) => {
                        self.metrics.record_drop(DropReason::SynQueueFull);
                    }
                }
            } else {
                self.metrics.record_drop(DropReason::BadTcpParse);
            }
            return;
        }

        let outcome = {
            let tcb = self.tcbs.get_mut(&tuple).unwrap();
            fsm::on_segment(tcb, seg, now)
        };

        if outcome.send_ack || outcome.send_rst || outcome.send_fin {
            let tcb = self.tcbs.get(&tuple).unwrap();
            let flags = TcpFlags {
                ack: outcome.send_ack || outcome.send_fin,
                rst: outcome.send_rst,
                fin: outcome.send_fin,
                ..Default::default()
            };
            let frame = self.build_tcp_frame(
                tuple.remote_ip,
                tuple.local_port,
                tuple.remote_port,
                tcb.snd_nxt,
                tcb.rcv_nxt,
                flags,
                tcb.rcv_wnd as u16,
            );
            self.send_frame(rx_port, frame);
        }

        if outcome.should_remove {
            self.tcbs.remove(&tuple);
        }
    }

    /// Builds a complete Ethernet+IPv4+TCP frame for `build_tcp_frame`'s
    /// caller's own four-tuple. The peer's MAC is whatever `ArpCache`
    /// currently has resolved; unresolved peers fall back to broadcast,
    /// same placeholder the TX generator uses ahead of a full L2
    /// resolve-before-send path.
    fn build_tcp_frame(
        &self,
        remote_ip: u32,
        local_port: u16,
        remote_port: u16,
        seq: u32,
        ack: u32,
        flags: TcpFlags,
        window: u16,
    ) -> Vec<u8> {
        let tcp_seg = fsm::build_segment(
            self.local_ip,
            remote_ip,
            local_port,
            remote_port,
            seq,
            ack,
            flags,
            window,
            &[],
        );
        let ip_hdr = ipv4::build(
            self.local_ip,
            remote_ip,
            ipv4::PROTO_TCP,
            0,
            64,
            0,
            false,
            tcp_seg.len() as u16,
            false,
        );
        let dst_mac = self.arp.lookup(remote_ip).unwrap_or(ethernet::BROADCAST_MAC);
        let eth_hdr = ethernet::build(dst_mac, self.local_mac, ethernet::ETHERTYPE_IPV4);

        let mut frame = Vec::with_capacity(eth_hdr.len() + ip_hdr.len() + tcp_seg.len());
        frame.extend_from_slice(&eth_hdr);
        frame.extend_from_slice(&ip_hdr);
        frame.extend_from_slice(&tcp_seg);
        frame
    }

    /// Sends one ad hoc frame (ARP reply, TCP control segment) out the
    /// given port, acquiring and releasing a buffer the same way a
    /// generated-traffic burst does.
    fn send_frame(&mut self, port: u16, bytes: Vec<u8>) {
        match self.pool.acquire() {
            Some(mut b) => {
                b.port = port;
                if b.append(&bytes) {
                    let (n_sent, unsent) = self.nic.tx_burst(port, vec![b]);
                    self.metrics.tx_packets += n_sent as u64;
                    for u in unsent {
                        self.pool.release(u);
                    }
                } else {
                    self.pool.release(b);
                }
            }
            None => {
                self.metrics.record_drop(DropReason::NicTxDropped);
            }
        }
    }

    fn generate_tx(&mut self, now: u64) {
        let mut to_send = Vec::new();
        for gen in &mut self.generators {
            if let Some(frame) = gen.generate_one(now) {
                to_send.push(frame);
            }
        }
        if to_send.is_empty() {
            return;
        }

        let mut bufs = Vec::with_capacity(to_send.len());
        for frame in to_send {
            match self.pool.acquire() {
                Some(mut b) => {
                    if b.append(&frame) {
                        bufs.push(b);
                    } else {
                        self.pool.release(b);
                    }
                }
                None => {
                    self.metrics.record_drop(DropReason::NicTxDropped);
                }
            }
        }
        let sent = bufs.len();
        let (n_sent, unsent) = self.nic.tx_burst(0, bufs);
        self.metrics.tx_packets += n_sent as u64;
        for b in unsent {
            self.pool.release(b);
        }
        let _ = sent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_bus::{Cmd, ControlMsg};
    use crate::port::RingNic;
    use crate::tx_gen::{FlowProtocol, FlowSpec, TxGenerator};

    fn make_ctx() -> (WorkerContext, WorkerChannel) {
        let pool = BufferPool::new(0, 8, 8, 4, 1).unwrap();
        let nic: Arc<dyn NicPort> = Arc::new(RingNic::new());
        let arp = Arc::new(ArpCache::new(0x0a000001, [1; 6]));
        let routes = Arc::new(RouteTable::new());
        let flags = Arc::new(WorkerFlags::new());
        flags.traffic.store(true, Ordering::Relaxed);

        let flow = FlowSpec {
            protocol: FlowProtocol::IcmpEcho,
            src_mac: [1; 6],
            dst_mac: [2; 6],
            src_ip: 0x0a000001,
            dst_ip: 0x0a000002,
            dst_port: 0,
            packets_per_second: 1_000_000_000,
            payload_len: 16,
        };

        let ctx = WorkerContext {
            worker_idx: 0,
            local_ip: 0x0a000001,
            local_mac: [1; 6],
            pool,
            nic,
            arp,
            routes,
            tcbs: TcbStore::new(crate::tcp::tcb::MAX_TCBS),
            ports: PortPool::new(),
            generators: vec![TxGenerator::new(flow, 1, None)],
            metrics: WorkerMetrics::new(),
            flags,
        };
        let channel = WorkerChannel::new(8);
        (ctx, channel)
    }

    #[test]
    fn shutdown_command_stops_the_loop() {
        let (mut ctx, channel) = make_ctx();
        channel.to_worker.try_push(ControlMsg::new(Cmd::Shutdown, 1, &[])).unwrap();
        assert!(!ctx.run_once(&channel));
        let acks = channel.to_mgmt.try_pop().unwrap();
        assert_eq!(acks.seq, 1);
        assert_eq!(acks.rc, 0);
    }

    #[test]
    fn run_once_generates_and_sends_traffic() {
        let (mut ctx, channel) = make_ctx();
        assert!(ctx.run_once(&channel));
        assert!(ctx.metrics.tx_packets >= 1 || ctx.generators[0].packets_sent >= 1);
    }

    #[test]
    fn stop_command_disables_generation() {
        let (mut ctx, channel) = make_ctx();
        channel.to_worker.try_push(ControlMsg::new(Cmd::Stop, 1, &[])).unwrap();
        assert!(ctx.run_once(&channel));
        assert!(!ctx.flags.traffic.load(Ordering::Relaxed));
    }
}
