//! TCP finite state machine, New Reno wiring, RTO/RTT estimation, and
//! delayed ACKs (component L), §4.10. Grounded on the source's
//! `tcp_fsm.c`.
//!
//! Retransmission of established-state data is out of scope — matching
//! a limitation the original source itself carries — so `Tcb` tracks
//! sequence-space bookkeeping and congestion state but does not buffer
//! unacknowledged payload bytes for resend. The SYN/FIN control
//! segments are the only ones this engine retransmits.

use crate::tcp::congestion::CongestionState;
use crate::tcp::options::TcpOptions;
use crate::time::now_ticks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    Listen,
    SynSent,
    SynReceived,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TcpFlags {
    pub syn: bool,
    pub ack: bool,
    pub fin: bool,
    pub rst: bool,
    pub psh: bool,
}

impl TcpFlags {
    pub fn from_byte(b: u8) -> Self {
        TcpFlags {
            fin: b & 0x01 != 0,
            syn: b & 0x02 != 0,
            rst: b & 0x04 != 0,
            psh: b & 0x08 != 0,
            ack: b & 0x10 != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.fin {
            b |= 0x01;
        }
        if self.syn {
            b |= 0x02;
        }
        if self.rst {
            b |= 0x04;
        }
        if self.psh {
            b |= 0x08;
        }
        if self.ack {
            b |= 0x10;
        }
        b
    }
}

pub struct SegmentView<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub options: TcpOptions,
    pub payload: &'a [u8],
}

pub const TCP_HDR_LEN: usize = 20;

pub fn parse_header(data: &[u8]) -> Option<SegmentView<'_>> {
    if data.len() < TCP_HDR_LEN {
        return None;
    }
    let data_offset = ((data[12] >> 4) as usize) * 4;
    if data_offset < TCP_HDR_LEN || data_offset > data.len() {
        return None;
    }
    Some(SegmentView {
        src_port: u16::from_be_bytes([data[0], data[1]]),
        dst_port: u16::from_be_bytes([data[2], data[3]]),
        seq: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
        ack: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
        flags: TcpFlags::from_byte(data[13]),
        window: u16::from_be_bytes([data[14], data[15]]),
        options: crate::tcp::options::parse(&data[TCP_HDR_LEN..data_offset]),
        payload: &data[data_offset..],
    })
}

/// Builds a TCP segment (header + payload) with the checksum filled in
/// against the IPv4 pseudo-header, ready to hand to [`crate::net::ipv4`]
/// for its own header and onward to the NIC. Options are omitted: every
/// segment this engine emits post-handshake is a bare ACK/RST/FIN.
pub fn build_segment(
    src_ip: u32,
    dst_ip: u32,
    src_port: u16,
    dst_port: u16,
    seq: u32,
    ack: u32,
    flags: TcpFlags,
    window: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut seg = vec![0u8; TCP_HDR_LEN + payload.len()];
    seg[0..2].copy_from_slice(&src_port.to_be_bytes());
    seg[2..4].copy_from_slice(&dst_port.to_be_bytes());
    seg[4..8].copy_from_slice(&seq.to_be_bytes());
    seg[8..12].copy_from_slice(&ack.to_be_bytes());
    seg[12] = ((TCP_HDR_LEN / 4) as u8) << 4;
    seg[13] = flags.to_byte();
    seg[14..16].copy_from_slice(&window.to_be_bytes());
    seg[TCP_HDR_LEN..].copy_from_slice(payload);

    let pseudo = crate::checksum::ipv4_pseudo_header_sum(
        src_ip,
        dst_ip,
        crate::net::ipv4::PROTO_TCP,
        seg.len() as u16,
    );
    let cksum = crate::checksum::fold(pseudo + crate::checksum::partial_sum(&seg));
    seg[16..18].copy_from_slice(&cksum.to_be_bytes());
    seg
}

/// RTO bounds, in timer ticks at `TICK_HZ`. Grounded on RFC 6298's
/// 1s floor / 60s ceiling, mirroring the source's own constants.
const RTO_MIN_TICKS: u64 = 1 * crate::time::TICK_HZ;
const RTO_MAX_TICKS: u64 = 60 * crate::time::TICK_HZ;
const RTO_INITIAL_TICKS: u64 = 1 * crate::time::TICK_HZ;
const TIME_WAIT_TICKS: u64 = 4 * crate::time::TICK_HZ;
const DELAYED_ACK_TICKS: u64 = crate::time::TICK_HZ / 5; // 200ms

pub struct RttEstimator {
    srtt_ticks: Option<u64>,
    rttvar_ticks: u64,
    pub rto_ticks: u64,
}

impl RttEstimator {
    fn new() -> Self {
        RttEstimator { srtt_ticks: None, rttvar_ticks: 0, rto_ticks: RTO_INITIAL_TICKS }
    }

    /// RFC 6298 update on a fresh RTT sample.
    fn sample(&mut self, rtt_ticks: u64) {
        match self.srtt_ticks {
            None => {
                self.srtt_ticks = Some(rtt_ticks);
                self.rttvar_ticks = rtt_ticks / 2;
            }
            Some(srtt) => {
                let delta = srtt.abs_diff(rtt_ticks);
                self.rttvar_ticks = (3 * self.rttvar_ticks + delta) / 4;
                self.srtt_ticks = Some((7 * srtt + rtt_ticks) / 8);
            }
        }
        let srtt = self.srtt_ticks.unwrap();
        self.rto_ticks = (srtt + (4 * self.rttvar_ticks).max(1)).clamp(RTO_MIN_TICKS, RTO_MAX_TICKS);
    }

    fn backoff(&mut self) {
        self.rto_ticks = (self.rto_ticks * 2).min(RTO_MAX_TICKS);
    }
}

pub struct Tcb {
    pub state: TcpState,
    pub snd_una: u32,
    pub snd_nxt: u32,
    pub snd_wnd: u32,
    pub rcv_nxt: u32,
    pub rcv_wnd: u32,
    pub iss: u32,
    pub irs: u32,
    pub mss: u16,
    pub cc: CongestionState,
    rtt: RttEstimator,
    pub rto_deadline: Option<u64>,
    pub rtx_backoffs: u32,
    pub syn_seq_sample: Option<(u32, u64)>, // (seq, send_tick) for one in-flight RTT sample
    pub delayed_ack_deadline: Option<u64>,
    pub time_wait_deadline: Option<u64>,
    pub pending_fin: bool,
}

impl Tcb {
    pub fn new(state: TcpState, iss: u32) -> Self {
        Tcb {
            state,
            snd_una: iss,
            snd_nxt: iss,
            snd_wnd: 0,
            rcv_nxt: 0,
            rcv_wnd: 65_535,
            iss,
            irs: 0,
            mss: 1460,
            cc: CongestionState::new(1460),
            rtt: RttEstimator::new(),
            rto_deadline: None,
            rtx_backoffs: 0,
            syn_seq_sample: None,
            delayed_ack_deadline: None,
            time_wait_deadline: None,
            pending_fin: false,
        }
    }

    fn arm_rto(&mut self, now: u64) {
        self.rto_deadline = Some(now + self.rtt.rto_ticks);
    }

    fn disarm_rto_if_fully_acked(&mut self) {
        if self.snd_una == self.snd_nxt {
            self.rto_deadline = None;
            self.rtx_backoffs = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Rst,
    SynDup,
    InvalidAck,
    WindowProbeNeeded,
}

/// Outputs the FSM step wants the caller to perform: segments to send
/// and/or the TCB's removal from the store.
#[derive(Debug, Default)]
pub struct Outcome {
    pub send_ack: bool,
    pub send_rst: bool,
    pub send_fin: bool,
    pub deliver: Option<Vec<u8>>,
    pub should_remove: bool,
    pub events: Vec<Event>,
}

/// Actively open a connection: builds the initial SYN Tcb in `SynSent`.
pub fn open_active(iss: u32, mss: u16) -> Tcb {
    let mut tcb = Tcb::new(TcpState::SynSent, iss);
    tcb.mss = mss;
    tcb.snd_nxt = iss.wrapping_add(1);
    tcb.syn_seq_sample = Some((iss, now_ticks()));
    tcb.arm_rto(now_ticks());
    tcb
}

/// Passively accept: builds a `SynReceived` Tcb in response to an
/// inbound SYN.
pub fn open_passive(iss: u32, irs: u32, mss: u16) -> Tcb {
    let mut tcb = Tcb::new(TcpState::SynReceived, iss);
    tcb.mss = mss;
    tcb.irs = irs;
    tcb.rcv_nxt = irs.wrapping_add(1);
    tcb.snd_nxt = iss.wrapping_add(1);
    tcb.arm_rto(now_ticks());
    tcb
}

/// Processes one inbound segment against a TCB's current state,
/// advancing sequence numbers, congestion state, and the state
/// machine. `now` is the current tick count for RTT sampling.
pub fn on_segment(tcb: &mut Tcb, seg: &SegmentView<'_>, now: u64) -> Outcome {
    let mut out = Outcome::default();

    if seg.flags.rst {
        out.should_remove = true;
        out.events.push(Event::Rst);
        return out;
    }

    match tcb.state {
        TcpState::SynSent => {
            if seg.flags.syn && seg.flags.ack && seg.ack == tcb.snd_nxt {
                tcb.irs = seg.seq;
                tcb.rcv_nxt = seg.seq.wrapping_add(1);
                tcb.snd_una = seg.ack;
                tcb.snd_wnd = seg.window as u32;
                if let Some((iss, t0)) = tcb.syn_seq_sample.take() {
                    if iss.wrapping_add(1) == seg.ack {
                        tcb.rtt.sample(now.saturating_sub(t0));
                    }
                }
                tcb.state = TcpState::Established;
                tcb.rto_deadline = None;
                tcb.rtx_backoffs = 0;
                out.send_ack = true;
            } else if seg.flags.syn && !seg.flags.ack {
                out.events.push(Event::SynDup);
            }
        }
        TcpState::SynReceived => {
            if seg.flags.ack && seg.ack == tcb.snd_nxt {
                tcb.snd_una = seg.ack;
                tcb.snd_wnd = seg.window as u32;
                tcb.state = TcpState::Established;
                tcb.rto_deadline = None;
            } else {
                out.events.push(Event::InvalidAck);
            }
        }
        TcpState::Established | TcpState::FinWait1 | TcpState::FinWait2 | TcpState::CloseWait => {
            process_established_like(tcb, seg, now, &mut out);
        }
        TcpState::Closing | TcpState::LastAck => {
            if seg.flags.ack && seg.ack == tcb.snd_nxt {
                tcb.snd_una = seg.ack;
                tcb.rto_deadline = None;
                if tcb.state == TcpState::LastAck {
                    out.should_remove = true;
                } else {
                    tcb.state = TcpState::TimeWait;
                    tcb.time_wait_deadline = Some(now + TIME_WAIT_TICKS);
                }
            }
        }
        TcpState::TimeWait => {
            // Any further segment in TIME_WAIT just gets ACKed and the
            // hold-off timer restarted (duplicate FIN retransmit).
            out.send_ack = true;
            tcb.time_wait_deadline = Some(now + TIME_WAIT_TICKS);
        }
        TcpState::Listen | TcpState::Closed => {}
    }

    out
}

fn process_established_like(tcb: &mut Tcb, seg: &SegmentView<'_>, now: u64, out: &mut Outcome) {
    if seg.flags.ack {
        if seq_gt(seg.ack, tcb.snd_una) {
            let acked = seg.ack.wrapping_sub(tcb.snd_una);
            tcb.snd_una = seg.ack;
            tcb.snd_wnd = seg.window as u32;
            tcb.cc.on_new_ack(acked, tcb.mss as u32);
            tcb.disarm_rto_if_fully_acked();
            if !tcb.disarm_checked() {
                tcb.arm_rto(now);
            }
        } else if seg.ack == tcb.snd_una && tcb.snd_una != tcb.snd_nxt {
            if tcb.cc.on_dup_ack(tcb.snd_nxt, tcb.mss as u32) {
                out.send_ack = false; // fast retransmit is driven by the worker loop, not here
            }
        }
    }

    if !seg.payload.is_empty() && seg.seq == tcb.rcv_nxt {
        tcb.rcv_nxt = tcb.rcv_nxt.wrapping_add(seg.payload.len() as u32);
        out.deliver = Some(seg.payload.to_vec());
        tcb.delayed_ack_deadline = Some(now + DELAYED_ACK_TICKS);
    }

    if seg.flags.fin {
        tcb.rcv_nxt = tcb.rcv_nxt.wrapping_add(1);
        out.send_ack = true;
        tcb.state = match tcb.state {
            TcpState::Established => TcpState::CloseWait,
            TcpState::FinWait1 if seg.flags.ack && seg.ack == tcb.snd_nxt => {
                tcb.time_wait_deadline = Some(now + TIME_WAIT_TICKS);
                TcpState::TimeWait
            }
            TcpState::FinWait1 => TcpState::Closing,
            TcpState::FinWait2 => {
                tcb.time_wait_deadline = Some(now + TIME_WAIT_TICKS);
                TcpState::TimeWait
            }
            s => s,
        };
    } else if tcb.state == TcpState::FinWait1 && seg.flags.ack && seg.ack == tcb.snd_nxt {
        tcb.state = TcpState::FinWait2;
    }
}

impl Tcb {
    fn disarm_checked(&self) -> bool {
        self.snd_una == self.snd_nxt
    }
}

fn seq_gt(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

/// Begins active close: transitions `Established`/`CloseWait` into the
/// FIN-sending branch of the state machine and reserves the FIN's
/// sequence number.
pub fn close(tcb: &mut Tcb) -> bool {
    match tcb.state {
        TcpState::Established => {
            tcb.state = TcpState::FinWait1;
            tcb.snd_nxt = tcb.snd_nxt.wrapping_add(1);
            tcb.pending_fin = true;
            true
        }
        TcpState::CloseWait => {
            tcb.state = TcpState::LastAck;
            tcb.snd_nxt = tcb.snd_nxt.wrapping_add(1);
            tcb.pending_fin = true;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(syn: bool, ack: bool, fin: bool) -> TcpFlags {
        TcpFlags { syn, ack, fin, rst: false, psh: false }
    }

    #[test]
    fn three_way_handshake_active_side_reaches_established() {
        let mut tcb = open_active(1000, 1460);
        assert_eq!(tcb.state, TcpState::SynSent);
        let seg = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 5000,
            ack: 1001,
            flags: flags(true, true, false),
            window: 65535,
            options: TcpOptions::default(),
            payload: &[],
        };
        let out = on_segment(&mut tcb, &seg, now_ticks());
        assert_eq!(tcb.state, TcpState::Established);
        assert!(out.send_ack);
        assert_eq!(tcb.rcv_nxt, 5001);
    }

    #[test]
    fn three_way_handshake_passive_side_reaches_established() {
        let mut tcb = open_passive(2000, 5000, 1460);
        assert_eq!(tcb.state, TcpState::SynReceived);
        let seg = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 5001,
            ack: 2001,
            flags: flags(false, true, false),
            window: 65535,
            options: TcpOptions::default(),
            payload: &[],
        };
        on_segment(&mut tcb, &seg, now_ticks());
        assert_eq!(tcb.state, TcpState::Established);
    }

    #[test]
    fn rst_segment_tears_down_the_connection() {
        let mut tcb = open_active(1, 1460);
        let seg = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 0,
            ack: 0,
            flags: TcpFlags { rst: true, ..Default::default() },
            window: 0,
            options: TcpOptions::default(),
            payload: &[],
        };
        let out = on_segment(&mut tcb, &seg, now_ticks());
        assert!(out.should_remove);
    }

    #[test]
    fn in_order_data_segment_is_delivered_and_advances_rcv_nxt() {
        let mut tcb = open_passive(1, 100, 1460);
        tcb.state = TcpState::Established;
        tcb.rcv_nxt = 101;
        let seg = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 101,
            ack: 2,
            flags: flags(false, true, false),
            window: 65535,
            options: TcpOptions::default(),
            payload: b"hello",
        };
        let out = on_segment(&mut tcb, &seg, now_ticks());
        assert_eq!(out.deliver.as_deref(), Some(&b"hello"[..]));
        assert_eq!(tcb.rcv_nxt, 106);
    }

    #[test]
    fn three_duplicate_acks_enter_fast_recovery() {
        let mut tcb = open_passive(1, 100, 1460);
        tcb.state = TcpState::Established;
        tcb.snd_una = 1;
        tcb.snd_nxt = 5000;
        let dup = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 101,
            ack: 1,
            flags: flags(false, true, false),
            window: 65535,
            options: TcpOptions::default(),
            payload: &[],
        };
        on_segment(&mut tcb, &dup, now_ticks());
        on_segment(&mut tcb, &dup, now_ticks());
        on_segment(&mut tcb, &dup, now_ticks());
        assert_eq!(tcb.cc.phase, crate::tcp::congestion::CongestionPhase::FastRecovery);
    }

    #[test]
    fn active_close_moves_established_through_finwait_to_timewait() {
        let mut tcb = open_passive(1, 100, 1460);
        tcb.state = TcpState::Established;
        tcb.rcv_nxt = 101;
        assert!(close(&mut tcb));
        assert_eq!(tcb.state, TcpState::FinWait1);

        let ack_of_fin = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 101,
            ack: tcb.snd_nxt,
            flags: flags(false, true, false),
            window: 65535,
            options: TcpOptions::default(),
            payload: &[],
        };
        on_segment(&mut tcb, &ack_of_fin, now_ticks());
        assert_eq!(tcb.state, TcpState::FinWait2);

        let their_fin = SegmentView {
            src_port: 0,
            dst_port: 0,
            seq: 101,
            ack: tcb.snd_nxt,
            flags: flags(false, true, true),
            window: 65535,
            options: TcpOptions::default(),
            payload: &[],
        };
        let out = on_segment(&mut tcb, &their_fin, now_ticks());
        assert!(out.send_ack);
        assert_eq!(tcb.state, TcpState::TimeWait);
        assert!(tcb.time_wait_deadline.is_some());
    }
}
