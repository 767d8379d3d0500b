//! Rate-controlled TX generator (component N), §4.12. Grounded on the
//! source's `tx_gen.c`: a token bucket gates how many packets a worker
//! may emit per tick, the only fully-built protocol payload is ICMP
//! echo, and other protocols sit behind an extensible dispatch table
//! as documented no-op stubs so the table's shape matches what a
//! multi-protocol generator would need without fabricating behavior
//! the distilled spec never asked for.

use crate::net::{ethernet, icmp, ipv4};
use crate::time::{now_ticks, XorShiftRng, TICK_HZ};

pub const TOKEN_BUCKET_CAP: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowProtocol {
    IcmpEcho,
    Udp,
    TcpSyn,
    Http,
}

#[derive(Debug, Clone, Copy)]
pub struct FlowSpec {
    pub protocol: FlowProtocol,
    pub src_mac: [u8; 6],
    pub dst_mac: [u8; 6],
    pub src_ip: u32,
    pub dst_ip: u32,
    pub dst_port: u16,
    pub packets_per_second: u32,
    pub payload_len: usize,
}

struct TokenBucket {
    tokens: f64,
    rate_per_tick: f64,
    cap: f64,
    last_tick: u64,
}

impl TokenBucket {
    fn new(rate_per_sec: u32) -> Self {
        TokenBucket {
            tokens: TOKEN_BUCKET_CAP as f64,
            rate_per_tick: rate_per_sec as f64 / TICK_HZ as f64,
            cap: TOKEN_BUCKET_CAP as f64,
            last_tick: now_ticks(),
        }
    }

    fn refill(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.last_tick) as f64;
        self.tokens = (self.tokens + elapsed * self.rate_per_tick).min(self.cap);
        self.last_tick = now;
    }

    fn try_take(&mut self, now: u64) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct TxGenerator {
    flow: FlowSpec,
    bucket: TokenBucket,
    rng: XorShiftRng,
    ident: u16,
    seq: u16,
    deadline_tick: Option<u64>,
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

impl TxGenerator {
    pub fn new(flow: FlowSpec, worker_salt: u64, duration: Option<std::time::Duration>) -> Self {
        TxGenerator {
            bucket: TokenBucket::new(flow.packets_per_second),
            flow,
            rng: XorShiftRng::new_seeded(worker_salt),
            ident: (worker_salt & 0xFFFF) as u16,
            seq: 0,
            deadline_tick: duration.map(|d| now_ticks() + crate::time::ticks_from_duration(d)),
            packets_sent: 0,
            bytes_sent: 0,
        }
    }

    pub fn is_armed(&self, now: u64) -> bool {
        match self.deadline_tick {
            Some(d) => now < d,
            None => true,
        }
    }

    /// Generates at most one frame this tick, gated by the token
    /// bucket and the flow's duration deadline. Returns `None` when
    /// rate-limited, disarmed, or the protocol isn't implemented yet.
    pub fn generate_one(&mut self, now: u64) -> Option<Vec<u8>> {
        if !self.is_armed(now) {
            return None;
        }
        if !self.bucket.try_take(now) {
            return None;
        }

        let frame = match self.flow.protocol {
            FlowProtocol::IcmpEcho => Some(self.build_icmp_echo()),
            // UDP/TCP-SYN/HTTP traffic generation is out of scope for
            // this dispatch table today; the table exists so adding a
            // protocol is "write a build_* fn and one match arm", not
            // a rewrite of the rate-limiting and framing machinery.
            FlowProtocol::Udp | FlowProtocol::TcpSyn | FlowProtocol::Http => None,
        };

        if let Some(ref f) = frame {
            self.packets_sent += 1;
            self.bytes_sent += f.len() as u64;
        } else {
            // Unimplemented protocol consumed a token for nothing;
            // hand it back so the bucket doesn't silently drain.
            self.bucket.tokens = (self.bucket.tokens + 1.0).min(self.bucket.cap);
        }
        frame
    }

    fn build_icmp_echo(&mut self) -> Vec<u8> {
        self.seq = self.seq.wrapping_add(1);
        let mut payload = vec![0u8; self.flow.payload_len];
        for b in payload.iter_mut() {
            *b = self.rng.next_u32() as u8;
        }
        let icmp_pkt = icmp::build_echo_request(self.ident, self.seq, &payload);
        let ip_hdr = ipv4::build(
            self.flow.src_ip,
            self.flow.dst_ip,
            ipv4::PROTO_ICMP,
            self.seq,
            64,
            0,
            false,
            icmp_pkt.len() as u16,
            false,
        );
        let eth_hdr = ethernet::build(self.flow.dst_mac, self.flow.src_mac, ethernet::ETHERTYPE_IPV4);

        let mut frame = Vec::with_capacity(eth_hdr.len() + ip_hdr.len() + icmp_pkt.len());
        frame.extend_from_slice(&eth_hdr);
        frame.extend_from_slice(&ip_hdr);
        frame.extend_from_slice(&icmp_pkt);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> FlowSpec {
        FlowSpec {
            protocol: FlowProtocol::IcmpEcho,
            src_mac: [2; 6],
            dst_mac: [3; 6],
            src_ip: 0x0a000001,
            dst_ip: 0x0a000002,
            dst_port: 0,
            packets_per_second: 1_000_000_000, // effectively unthrottled for the test
            payload_len: 32,
        }
    }

    #[test]
    fn icmp_echo_flow_produces_parseable_frames() {
        let mut gen = TxGenerator::new(flow(), 1, None);
        let frame = gen.generate_one(now_ticks()).expect("token available");
        let eth = ethernet::parse(&frame).unwrap();
        assert_eq!(eth.ethertype, ethernet::ETHERTYPE_IPV4);
        let ip = ipv4::parse(&frame[eth.payload_offset..], 0, false).unwrap();
        assert_eq!(ip.protocol, ipv4::PROTO_ICMP);
        let echo = icmp::parse(ip.payload).unwrap();
        assert!(!echo.is_reply);
    }

    #[test]
    fn token_bucket_throttles_bursts() {
        let mut f = flow();
        f.packets_per_second = 1; // one packet per second
        let mut gen = TxGenerator::new(f, 1, None);
        let now = now_ticks();
        assert!(gen.generate_one(now).is_some());
        // Cap starts full (32 tokens) so several sequential calls still
        // succeed before the bucket empties.
        let mut successes = 1;
        for _ in 0..40 {
            if gen.generate_one(now).is_some() {
                successes += 1;
            }
        }
        assert!(successes <= TOKEN_BUCKET_CAP as usize);
    }

    #[test]
    fn duration_deadline_disarms_generator() {
        let f = flow();
        let gen = TxGenerator::new(f, 1, Some(std::time::Duration::from_nanos(0)));
        assert!(!gen.is_armed(now_ticks() + 1));
    }

    #[test]
    fn unimplemented_protocol_returns_none_without_draining_bucket() {
        let mut f = flow();
        f.protocol = FlowProtocol::Udp;
        let mut gen = TxGenerator::new(f, 1, None);
        assert!(gen.generate_one(now_ticks()).is_none());
        assert_eq!(gen.packets_sent, 0);
    }
}
