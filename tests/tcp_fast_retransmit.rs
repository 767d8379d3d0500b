//! Three duplicate ACKs on an established connection must cross the
//! fast-retransmit threshold and enter fast recovery, driven through
//! the worker's RX dispatch rather than by calling the FSM directly.

mod common;

use netgen::tcp::congestion::CongestionPhase;
use netgen::tcp::fsm::{TcpFlags, TcpState};
use netgen::tcp::tcb::{FourTuple, MAX_TCBS};

#[test]
fn three_duplicate_acks_trigger_fast_recovery_via_worker_dispatch() {
    let (mut ctx, channel, nic) = common::make_ctx(MAX_TCBS);
    let tuple = FourTuple {
        local_ip: common::LOCAL_IP,
        local_port: 80,
        remote_ip: common::PEER_IP,
        remote_port: 54321,
    };

    let syn = common::build_inbound_tcp_frame(
        80,
        54321,
        1000,
        0,
        TcpFlags { syn: true, ..Default::default() },
        65535,
        &[],
    );
    common::inject(&ctx, &nic, &syn);
    assert!(ctx.run_once(&channel));
    let iss = ctx.tcbs.get(&tuple).unwrap().iss;

    let ack = common::build_inbound_tcp_frame(
        80,
        54321,
        1001,
        iss.wrapping_add(1),
        TcpFlags { ack: true, ..Default::default() },
        65535,
        &[],
    );
    common::inject(&ctx, &nic, &ack);
    assert!(ctx.run_once(&channel));
    assert_eq!(ctx.tcbs.get(&tuple).unwrap().state, TcpState::Established);

    // Simulate an in-flight, unacknowledged segment the peer hasn't
    // seen yet, the same precondition the FSM's own dup-ack unit test
    // uses: without an established-state send path, the worker loop
    // never advances `snd_nxt` past the handshake on its own.
    {
        let tcb = ctx.tcbs.get_mut(&tuple).unwrap();
        tcb.snd_una = iss.wrapping_add(1);
        tcb.snd_nxt = iss.wrapping_add(1001);
    }
    let dup_snd_una = iss.wrapping_add(1);

    for _ in 0..3 {
        let dup_ack = common::build_inbound_tcp_frame(
            80,
            54321,
            1001,
            dup_snd_una,
            TcpFlags { ack: true, ..Default::default() },
            65535,
            &[],
        );
        common::inject(&ctx, &nic, &dup_ack);
        assert!(ctx.run_once(&channel));
    }

    let tcb = ctx.tcbs.get(&tuple).unwrap();
    assert_eq!(tcb.cc.phase, CongestionPhase::FastRecovery);
}
