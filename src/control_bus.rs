//! Management-to-worker control bus (component D).
//!
//! One SPSC ring per worker carries commands from management to that
//! worker; one shared-direction-per-worker ACK ring carries replies back.
//! Enqueue from the management side spins for up to 100 µs on a full
//! ring before giving up and counting a drop (§4.3). Workers drain their
//! ring once per loop iteration and must ACK every message before moving
//! on to the next (§5 ordering guarantees).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const ENVELOPE_PAYLOAD: usize = 248;
const SPIN_TIMEOUT: Duration = Duration::from_micros(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Cmd {
    Noop = 0,
    SetProfile = 1,
    Start = 2,
    Stop = 3,
    SetRate = 4,
    Shutdown = 5,
}

/// 256-byte fixed-size control envelope (§3 "Control message").
#[derive(Debug, Clone, Copy)]
pub struct ControlMsg {
    pub cmd: Cmd,
    pub seq: u32,
    pub payload: [u8; ENVELOPE_PAYLOAD],
}

impl ControlMsg {
    pub fn new(cmd: Cmd, seq: u32, payload: &[u8]) -> Self {
        let mut buf = [0u8; ENVELOPE_PAYLOAD];
        let n = payload.len().min(ENVELOPE_PAYLOAD);
        buf[..n].copy_from_slice(&payload[..n]);
        ControlMsg { cmd, seq, payload: buf }
    }
}

/// `(worker_idx, seq, rc)`; `rc == 0` is success.
#[derive(Debug, Clone, Copy)]
pub struct AckMsg {
    pub worker_idx: u32,
    pub seq: u32,
    pub rc: i32,
}

/// A bounded single-producer/single-consumer ring of `T`.
///
/// Capacity is rounded up to a power of two (§4.3: `max(64,
/// next_pow2(pipeline_depth * 2))`). Backed by a `Vec<Option<T>>` behind a
/// mutex: a real data-plane ring would use raw atomics and cache-line
/// padding, but a worker's own control ring is touched at most once per
/// loop iteration, so the mutex's cost is immaterial and the
/// implementation stays obviously correct.
pub struct Ring<T> {
    slots: std::sync::Mutex<std::collections::VecDeque<T>>,
    capacity: usize,
    len: AtomicUsize,
}

impl<T> Ring<T> {
    pub fn new(min_capacity: usize) -> Self {
        let capacity = next_pow2(min_capacity.max(64));
        Ring {
            slots: std::sync::Mutex::new(std::collections::VecDeque::with_capacity(capacity)),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    pub(crate) fn try_push(&self, item: T) -> Result<(), T> {
        let mut g = self.slots.lock().unwrap();
        if g.len() >= self.capacity {
            return Err(item);
        }
        g.push_back(item);
        self.len.store(g.len(), Ordering::Release);
        Ok(())
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut g = self.slots.lock().unwrap();
        let item = g.pop_front();
        self.len.store(g.len(), Ordering::Release);
        item
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn next_pow2(mut n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    n -= 1;
    let mut shift = 1;
    while shift < usize::BITS as usize {
        n |= n >> shift;
        shift <<= 1;
    }
    n + 1
}

/// Result of a management-side `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Spun for the full 100 µs timeout without finding room.
    RingOverflow,
}

/// The two rings for one worker, plus the sequence counter management
/// uses when constructing new messages.
pub struct WorkerChannel {
    pub to_worker: Ring<ControlMsg>,
    pub to_mgmt: Ring<AckMsg>,
}

impl WorkerChannel {
    pub fn new(pipeline_depth: usize) -> Self {
        let cap = pipeline_depth.saturating_mul(2).max(64);
        WorkerChannel {
            to_worker: Ring::new(cap),
            to_mgmt: Ring::new(cap),
        }
    }
}

/// All workers' channels, owned by management.
pub struct ControlBus {
    channels: Vec<WorkerChannel>,
}

impl ControlBus {
    pub fn new(num_workers: usize, pipeline_depth: usize) -> Self {
        ControlBus {
            channels: (0..num_workers).map(|_| WorkerChannel::new(pipeline_depth)).collect(),
        }
    }

    pub fn channel(&self, worker: usize) -> &WorkerChannel {
        &self.channels[worker]
    }

    pub fn num_workers(&self) -> usize {
        self.channels.len()
    }

    /// Enqueue `msg` for `worker`, spin-retrying on a full ring for up to
    /// 100 µs before giving up (§4.3).
    pub fn send(&self, worker: usize, msg: ControlMsg) -> SendOutcome {
        let ring = &self.channels[worker].to_worker;
        let deadline = Instant::now() + SPIN_TIMEOUT;
        let mut pending = msg;
        loop {
            match ring.try_push(pending) {
                Ok(()) => return SendOutcome::Delivered,
                Err(returned) => {
                    pending = returned;
                    if Instant::now() >= deadline {
                        return SendOutcome::RingOverflow;
                    }
                    std::hint::spin_loop();
                }
            }
        }
    }

    /// Apply `send` to every worker; returns the count that succeeded.
    pub fn broadcast(&self, msg: ControlMsg) -> usize {
        (0..self.channels.len())
            .filter(|&w| self.send(w, msg) == SendOutcome::Delivered)
            .count()
    }

    /// Drain every worker's ACK ring (management-side telemetry/CLI use).
    pub fn drain_acks(&self, worker: usize) -> Vec<AckMsg> {
        let ring = &self.channels[worker].to_mgmt;
        let mut out = Vec::new();
        while let Some(ack) = ring.try_pop() {
            out.push(ack);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_worker_pop_then_ack() {
        let bus = ControlBus::new(2, 8);
        let msg = ControlMsg::new(Cmd::Start, 1, b"cfg");
        assert_eq!(bus.send(0, msg), SendOutcome::Delivered);

        let got = bus.channel(0).to_worker.try_pop().expect("message present");
        assert_eq!(got.seq, 1);
        assert!(matches!(got.cmd, Cmd::Start));

        bus.channel(0)
            .to_mgmt
            .try_push(AckMsg { worker_idx: 0, seq: 1, rc: 0 })
            .unwrap();
        let acks = bus.drain_acks(0);
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].rc, 0);
    }

    #[test]
    fn broadcast_counts_successes() {
        let bus = ControlBus::new(3, 8);
        let n = bus.broadcast(ControlMsg::new(Cmd::Noop, 0, &[]));
        assert_eq!(n, 3);
    }

    #[test]
    fn full_ring_reports_overflow() {
        let bus = ControlBus::new(1, 1); // capacity rounds up to 64
        let cap = bus.channel(0).to_worker.capacity;
        for i in 0..cap {
            assert_eq!(bus.send(0, ControlMsg::new(Cmd::Noop, i as u32, &[])), SendOutcome::Delivered);
        }
        let start = Instant::now();
        let outcome = bus.send(0, ControlMsg::new(Cmd::Noop, 9999, &[]));
        assert_eq!(outcome, SendOutcome::RingOverflow);
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn shutdown_is_fifo_per_worker() {
        let bus = ControlBus::new(1, 8);
        bus.send(0, ControlMsg::new(Cmd::Start, 1, &[]));
        bus.send(0, ControlMsg::new(Cmd::Shutdown, 2, &[]));
        let first = bus.channel(0).to_worker.try_pop().unwrap();
        let second = bus.channel(0).to_worker.try_pop().unwrap();
        assert!(matches!(first.cmd, Cmd::Start));
        assert!(matches!(second.cmd, Cmd::Shutdown));
    }
}
