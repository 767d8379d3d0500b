//! Time & RNG (component A).
//!
//! A tick counter calibrated against [`std::time::Instant`] stands in for
//! the TSC reads the data plane takes on every packet. Real TSC access
//! (`rdtsc`) is deliberately not used here: it is unsafe, non-portable
//! across the soft-NIC backend this crate targets, and the whole point of
//! calibrating against a monotonic clock is that call sites only ever
//! need "now, as an opaque tick" and "convert a duration to ticks" — both
//! of which `Instant` gives for free, safely.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Ticks per second for this process. Fixed at a large value so that
/// microsecond-resolution deadlines (the 100 µs control-ring spin, the
/// 40 ms delayed-ACK window) don't lose precision to integer division.
pub const TICK_HZ: u64 = 1_000_000_000;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

/// Opaque monotonic tick, comparable and subtractable like a TSC reading.
pub fn now_ticks() -> u64 {
    epoch().elapsed().as_nanos() as u64
}

/// Ticks per second, analogous to a calibrated `tsc_hz`.
pub fn tick_hz() -> u64 {
    TICK_HZ
}

/// Convert a [`Duration`] to a tick count at this process's tick rate.
pub fn ticks_from_duration(d: Duration) -> u64 {
    d.as_nanos() as u64
}

/// Convert a millisecond count to ticks.
pub fn ticks_from_millis(ms: u64) -> u64 {
    ms.saturating_mul(TICK_HZ / 1000)
}

/// Convert a microsecond count to ticks.
pub fn ticks_from_micros(us: u64) -> u64 {
    us.saturating_mul(TICK_HZ / 1_000_000)
}

/// Convert ticks to whole microseconds (used for RTT/RTO math, which the
/// distilled spec phrases in microseconds).
pub fn ticks_to_micros(ticks: u64) -> u64 {
    ticks / (TICK_HZ / 1_000_000)
}

/// Per-core xorshift64* PRNG — cheap, allocation-free, good enough for
/// ISN selection and jittering CLI `flood` inter-packet delay. Not
/// cryptographic.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    /// Seed from the current tick and a caller-supplied salt (typically
    /// the worker index), so sibling workers don't share a stream.
    pub fn new_seeded(salt: u64) -> Self {
        let seed = now_ticks() ^ salt.wrapping_mul(0x9E3779B97F4A7C15) ^ 0xDEAD_BEEF_CAFE_F00D;
        Self {
            state: if seed == 0 { 0x1234_5678_9abc_def0 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform integer in `[lo, hi)`. Panics if `hi <= lo`.
    pub fn gen_range(&mut self, lo: u32, hi: u32) -> u32 {
        assert!(hi > lo);
        lo + (self.next_u32() % (hi - lo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_monotonic() {
        let a = now_ticks();
        let b = now_ticks();
        assert!(b >= a);
    }

    #[test]
    fn duration_roundtrip_within_rounding() {
        let d = Duration::from_millis(40);
        let ticks = ticks_from_duration(d);
        assert_eq!(ticks, 40_000_000);
    }

    #[test]
    fn rng_produces_varied_values() {
        let mut rng = XorShiftRng::new_seeded(7);
        let a = rng.next_u64();
        let b = rng.next_u64();
        assert_ne!(a, b);
    }

    #[test]
    fn gen_range_stays_in_bounds() {
        let mut rng = XorShiftRng::new_seeded(1);
        for _ in 0..1000 {
            let v = rng.gen_range(10_000, 60_000);
            assert!(v >= 10_000 && v < 60_000);
        }
    }
}
