//! Per-tick TCP timer scan (component M), §4.11: RTO expiry and
//! control-segment retransmit, delayed-ACK flush, and TIME_WAIT aging.
//! Invoked once per worker loop iteration against every live TCB.

use super::fsm::{Tcb, TcpState};
use super::tcb::{FourTuple, TcbStore};

const MAX_RTX_BACKOFFS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    RetransmitSyn,
    RetransmitFin,
    SendAck,
    GiveUp,
}

#[derive(Debug)]
pub struct TimerEvent {
    pub tuple: FourTuple,
    pub action: TimerAction,
}

/// Scans every TCB once, applying RTO backoff / delayed-ACK flush /
/// TIME_WAIT expiry, and returns the actions the worker loop should
/// perform (segments to emit, TCBs to drop). TCBs returned with
/// `GiveUp` are removed from `store` before this function returns.
pub fn tick(store: &mut TcbStore, now: u64) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    let mut to_remove: Vec<FourTuple> = Vec::new();

    for (tuple, tcb) in store.iter_mut() {
        if let Some(deadline) = tcb.time_wait_deadline {
            if now >= deadline {
                to_remove.push(*tuple);
                continue;
            }
        }

        if let Some(deadline) = tcb.delayed_ack_deadline {
            if now >= deadline {
                tcb.delayed_ack_deadline = None;
                events.push(TimerEvent { tuple: *tuple, action: TimerAction::SendAck });
            }
        }

        if let Some(deadline) = tcb.rto_deadline {
            if now >= deadline {
                if tcb.rtx_backoffs >= MAX_RTX_BACKOFFS {
                    events.push(TimerEvent { tuple: *tuple, action: TimerAction::GiveUp });
                    to_remove.push(*tuple);
                    continue;
                }
                tcb.rtx_backoffs += 1;
                tcb.cc.on_rto(tcb.mss as u32);
                let action = match tcb.state {
                    TcpState::SynSent | TcpState::SynReceived => TimerAction::RetransmitSyn,
                    TcpState::FinWait1 | TcpState::Closing | TcpState::LastAck => {
                        TimerAction::RetransmitFin
                    }
                    _ => TimerAction::RetransmitSyn,
                };
                events.push(TimerEvent { tuple: *tuple, action });
                let backoff_ticks = crate::time::TICK_HZ << tcb.rtx_backoffs.min(6);
                tcb.rto_deadline = Some(now + backoff_ticks);
            }
        }
    }

    for t in &to_remove {
        store.remove(t);
    }

    events
}

/// True if a TCB has aged past TIME_WAIT and should be dropped even
/// without the normal timer scan (used by tests and by shutdown).
pub fn is_expired(tcb: &Tcb, now: u64) -> bool {
    matches!(tcb.state, TcpState::TimeWait) && tcb.time_wait_deadline.is_some_and(|d| now <= d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tcp::fsm::{open_active, TcpState};

    fn tuple(n: u16) -> FourTuple {
        FourTuple { local_ip: 1, local_port: n, remote_ip: 2, remote_port: 80 }
    }

    #[test]
    fn rto_expiry_retransmits_syn_and_backs_off() {
        let mut store = TcbStore::new();
        let tcb = open_active(1000, 1460);
        let deadline = tcb.rto_deadline.unwrap();
        store.insert(tuple(1), tcb).unwrap();

        let events = tick(&mut store, deadline + 1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, TimerAction::RetransmitSyn);
        assert_eq!(store.get(&tuple(1)).unwrap().rtx_backoffs, 1);
    }

    #[test]
    fn time_wait_expiry_removes_the_tcb() {
        let mut store = TcbStore::new();
        let mut tcb = open_active(1, 1460);
        tcb.state = TcpState::TimeWait;
        tcb.time_wait_deadline = Some(100);
        store.insert(tuple(2), tcb).unwrap();

        let events = tick(&mut store, 101);
        assert!(events.is_empty());
        assert!(store.get(&tuple(2)).is_none());
    }

    #[test]
    fn delayed_ack_deadline_fires_send_ack() {
        let mut store = TcbStore::new();
        let mut tcb = open_active(1, 1460);
        tcb.rto_deadline = None;
        tcb.delayed_ack_deadline = Some(50);
        store.insert(tuple(3), tcb).unwrap();

        let events = tick(&mut store, 51);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, TimerAction::SendAck);
    }

    #[test]
    fn repeated_rto_expiry_eventually_gives_up() {
        let mut store = TcbStore::new();
        let tcb = open_active(1, 1460);
        store.insert(tuple(4), tcb).unwrap();

        let mut now = store.get(&tuple(4)).unwrap().rto_deadline.unwrap();
        let mut gave_up = false;
        for _ in 0..(MAX_RTX_BACKOFFS + 2) {
            let events = tick(&mut store, now + 1);
            if events.iter().any(|e| e.action == TimerAction::GiveUp) {
                gave_up = true;
                break;
            }
            now = match store.get(&tuple(4)) {
                Some(t) => t.rto_deadline.unwrap_or(now + 1),
                None => break,
            };
        }
        assert!(gave_up);
        assert!(store.get(&tuple(4)).is_none());
    }
}
