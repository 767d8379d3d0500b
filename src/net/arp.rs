//! ARP resolver and cache (component F), grounded in the reference
//! implementation's per-port cache/hold-queue/probe-timer design (§4.4).
//!
//! Workers never run ARP state logic themselves: a buffer whose
//! EtherType is ARP is hand-off material, not something the worker core
//! processes in place. All state transitions below run on the
//! management core, which is why there is no worker-side mutation here
//! — only the read-locked `lookup` workers are allowed to call.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::buffer::Buffer;
use crate::time::now_ticks;

const HOLD_QUEUE_CAP: usize = 8;
const RESOLVED_TTL_TICKS: u64 = 300 * 1_000_000_000; // 300s at TICK_HZ=1e9
const STALE_WINDOW_TICKS: u64 = 30 * 1_000_000_000;
const MAX_FAILURES: u32 = 2;
const PROBE_RATE_PER_SEC: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpState {
    Pending,
    Resolved,
    Stale,
    Failed,
}

pub struct ArpEntry {
    pub mac: [u8; 6],
    pub state: ArpState,
    pub expire_tsc: u64,
    pub fail_count: u32,
    pub hold: Vec<Buffer>,
}

/// Simple token bucket limiting outbound ARP requests to
/// `PROBE_RATE_PER_SEC` per port.
struct TokenBucket {
    tokens: f64,
    last_tick: u64,
}

impl TokenBucket {
    fn new() -> Self {
        TokenBucket { tokens: PROBE_RATE_PER_SEC as f64, last_tick: now_ticks() }
    }

    fn take(&mut self) -> bool {
        let now = now_ticks();
        let elapsed = now.saturating_sub(self.last_tick) as f64;
        self.last_tick = now;
        self.tokens = (self.tokens + elapsed * PROBE_RATE_PER_SEC as f64 / crate::time::TICK_HZ as f64)
            .min(PROBE_RATE_PER_SEC as f64);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Outbound ARP frame, ready for the TX burst: an Ethernet+ARP payload
/// plus the port it must go out on.
pub struct ArpFrame {
    pub port: u16,
    pub bytes: Vec<u8>,
}

/// Per-port ARP cache.
pub struct ArpCache {
    local_ip: u32,
    local_mac: [u8; 6],
    entries: RwLock<HashMap<u32, ArpEntry>>,
    bucket: std::sync::Mutex<TokenBucket>,
    pub stats_replies_tx: std::sync::atomic::AtomicU64,
    pub stats_requests_tx: std::sync::atomic::AtomicU64,
}

impl ArpCache {
    pub fn new(local_ip: u32, local_mac: [u8; 6]) -> Self {
        ArpCache {
            local_ip,
            local_mac,
            entries: RwLock::new(HashMap::new()),
            bucket: std::sync::Mutex::new(TokenBucket::new()),
            stats_replies_tx: std::sync::atomic::AtomicU64::new(0),
            stats_requests_tx: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Worker-side read-locked lookup: returns the MAC iff RESOLVED.
    pub fn lookup(&self, ip: u32) -> Option<[u8; 6]> {
        let g = self.entries.read().unwrap();
        match g.get(&ip) {
            Some(e) if e.state == ArpState::Resolved => Some(e.mac),
            _ => None,
        }
    }

    /// Outbound probe: insert a PENDING entry if none exists and emit a
    /// broadcast ARP request. Returns the frame to transmit, if the
    /// token bucket allows it.
    pub fn request(&self, port: u16, ip: u32) -> Option<ArpFrame> {
        {
            let mut g = self.entries.write().unwrap();
            g.entry(ip).or_insert_with(|| ArpEntry {
                mac: [0; 6],
                state: ArpState::Pending,
                expire_tsc: 0,
                fail_count: 0,
                hold: Vec::new(),
            });
        }
        if !self.bucket.lock().unwrap().take() {
            return None;
        }
        self.stats_requests_tx.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Some(ArpFrame { port, bytes: build_request(self.local_mac, self.local_ip, ip) })
    }

    /// Push a buffer onto the hold queue of a pending entry. Drops the
    /// buffer (returning it) if the entry is missing or the queue is
    /// full.
    pub fn hold(&self, ip: u32, buf: Buffer) -> Option<Buffer> {
        let mut g = self.entries.write().unwrap();
        match g.get_mut(&ip) {
            Some(e) if e.hold.len() < HOLD_QUEUE_CAP => {
                e.hold.push(buf);
                None
            }
            _ => Some(buf),
        }
    }

    /// Process an incoming ARP request or reply (management tick).
    /// Returns a reply frame to transmit and/or the buffers released
    /// from a hold queue on resolution.
    pub fn process_incoming(&self, pkt: &ArpPacket, port: u16) -> (Option<ArpFrame>, Vec<Buffer>) {
        match pkt.opcode {
            ArpOp::Request if pkt.target_ip == self.local_ip => {
                self.stats_replies_tx.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                let frame = build_reply(self.local_mac, self.local_ip, pkt.sender_mac, pkt.sender_ip);
                (Some(ArpFrame { port, bytes: frame }), Vec::new())
            }
            ArpOp::Reply => {
                let mut g = self.entries.write().unwrap();
                if let Some(e) = g.get_mut(&pkt.sender_ip) {
                    e.mac = pkt.sender_mac;
                    e.state = ArpState::Resolved;
                    e.expire_tsc = now_ticks() + RESOLVED_TTL_TICKS;
                    let held = std::mem::take(&mut e.hold);
                    return (None, held);
                }
                (None, Vec::new())
            }
            _ => (None, Vec::new()),
        }
    }

    /// Age every entry once per management tick: RESOLVED entries near
    /// expiry downgrade to STALE (triggering a re-probe); past expiry
    /// entries fail out after `MAX_FAILURES` attempts.
    pub fn tick(&self, port: u16) -> Vec<ArpFrame> {
        let now = now_ticks();
        let mut to_probe = Vec::new();
        {
            let mut g = self.entries.write().unwrap();
            for (&ip, e) in g.iter_mut() {
                if e.state == ArpState::Resolved && e.expire_tsc.saturating_sub(now) <= STALE_WINDOW_TICKS {
                    e.state = ArpState::Stale;
                    to_probe.push(ip);
                } else if (e.state == ArpState::Stale) && now >= e.expire_tsc {
                    e.fail_count += 1;
                    if e.fail_count > MAX_FAILURES {
                        e.state = ArpState::Failed;
                    } else {
                        to_probe.push(ip);
                    }
                }
            }
        }
        to_probe.into_iter().filter_map(|ip| self.request(port, ip)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    Request,
    Reply,
}

pub struct ArpPacket {
    pub opcode: ArpOp,
    pub sender_mac: [u8; 6],
    pub sender_ip: u32,
    pub target_ip: u32,
}

const ARP_PKT_LEN: usize = 28;

pub fn parse(data: &[u8]) -> Option<ArpPacket> {
    if data.len() < ARP_PKT_LEN {
        return None;
    }
    let opcode = u16::from_be_bytes([data[6], data[7]]);
    let opcode = match opcode {
        1 => ArpOp::Request,
        2 => ArpOp::Reply,
        _ => return None,
    };
    let mut sender_mac = [0u8; 6];
    sender_mac.copy_from_slice(&data[8..14]);
    let sender_ip = u32::from_be_bytes([data[14], data[15], data[16], data[17]]);
    let target_ip = u32::from_be_bytes([data[24], data[25], data[26], data[27]]);
    Some(ArpPacket { opcode, sender_mac, sender_ip, target_ip })
}

fn build_header(opcode: u16) -> [u8; 8] {
    let mut h = [0u8; 8];
    h[0..2].copy_from_slice(&1u16.to_be_bytes()); // hw type: ethernet
    h[2..4].copy_from_slice(&crate::net::ethernet::ETHERTYPE_IPV4.to_be_bytes());
    h[4] = 6; // hw addr len
    h[5] = 4; // proto addr len
    h[6..8].copy_from_slice(&opcode.to_be_bytes());
    h
}

pub fn build_request(local_mac: [u8; 6], local_ip: u32, target_ip: u32) -> Vec<u8> {
    let mut v = build_header(1).to_vec();
    v.extend_from_slice(&local_mac);
    v.extend_from_slice(&local_ip.to_be_bytes());
    v.extend_from_slice(&[0u8; 6]);
    v.extend_from_slice(&target_ip.to_be_bytes());
    v
}

pub fn build_reply(local_mac: [u8; 6], local_ip: u32, requester_mac: [u8; 6], requester_ip: u32) -> Vec<u8> {
    let mut v = build_header(2).to_vec();
    v.extend_from_slice(&local_mac);
    v.extend_from_slice(&local_ip.to_be_bytes());
    v.extend_from_slice(&requester_mac);
    v.extend_from_slice(&requester_ip.to_be_bytes());
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPool;

    #[test]
    fn request_then_reply_resolves_and_flushes_hold_queue() {
        let cache = ArpCache::new(0x0a000001, [1, 2, 3, 4, 5, 6]);
        let frame = cache.request(0, 0x0a000009);
        assert!(frame.is_some());

        let pool = BufferPool::new(0, 8, 8, 4, 1).unwrap();
        let b1 = pool.acquire().unwrap();
        let b2 = pool.acquire().unwrap();
        assert!(cache.hold(0x0a000009, b1).is_none());
        assert!(cache.hold(0x0a000009, b2).is_none());

        let reply = ArpPacket {
            opcode: ArpOp::Reply,
            sender_mac: [9, 9, 9, 9, 9, 9],
            sender_ip: 0x0a000009,
            target_ip: 0x0a000001,
        };
        let (reply_frame, flushed) = cache.process_incoming(&reply, 0);
        assert!(reply_frame.is_none());
        assert_eq!(flushed.len(), 2);
        assert_eq!(cache.lookup(0x0a000009), Some([9, 9, 9, 9, 9, 9]));
    }

    #[test]
    fn request_for_local_ip_builds_reply() {
        let cache = ArpCache::new(0x0a000001, [1, 2, 3, 4, 5, 6]);
        let req = ArpPacket {
            opcode: ArpOp::Request,
            sender_mac: [2; 6],
            sender_ip: 0x0a0000ff,
            target_ip: 0x0a000001,
        };
        let (reply, _) = cache.process_incoming(&req, 0);
        assert!(reply.is_some());
    }

    #[test]
    fn hold_queue_drops_beyond_capacity() {
        let cache = ArpCache::new(1, [0; 6]);
        cache.request(0, 2);
        let pool = BufferPool::new(0, 8, 8, 4, 1).unwrap();
        for _ in 0..HOLD_QUEUE_CAP {
            assert!(cache.hold(2, pool.acquire().unwrap()).is_none());
        }
        assert!(cache.hold(2, pool.acquire().unwrap()).is_some());
    }

    #[test]
    fn build_request_then_parse_roundtrips() {
        let bytes = build_request([1, 2, 3, 4, 5, 6], 0x0a000001, 0x0a000002);
        let pkt = parse(&bytes).unwrap();
        assert_eq!(pkt.opcode, ArpOp::Request);
        assert_eq!(pkt.sender_mac, [1, 2, 3, 4, 5, 6]);
        assert_eq!(pkt.sender_ip, 0x0a000001);
        assert_eq!(pkt.target_ip, 0x0a000002);
    }
}
