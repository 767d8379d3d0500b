//! Drives a full passive three-way handshake through the assembled
//! worker RX path: inject a SYN, let `run_once` answer with SYN-ACK and
//! open a TCB, inject the final ACK, and confirm the connection reaches
//! `Established`.

mod common;

use netgen::tcp::fsm::{TcpFlags, TcpState};
use netgen::tcp::tcb::{FourTuple, MAX_TCBS};

#[test]
fn passive_handshake_reaches_established_via_worker_dispatch() {
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

    let tcb = ctx.tcbs.get(&tuple).expect("SYN opens a passive TCB");
    assert_eq!(tcb.state, TcpState::SynReceived);
    assert_eq!(tcb.rcv_nxt, 1001);
    let iss = tcb.iss;

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

    let tcb = ctx.tcbs.get(&tuple).expect("TCB still present after the handshake ACK");
    assert_eq!(tcb.state, TcpState::Established);
}

#[test]
fn syn_with_no_match_and_no_syn_flag_is_dropped_not_opened() {
    let (mut ctx, channel, nic) = common::make_ctx(MAX_TCBS);
    let bogus = common::build_inbound_tcp_frame(
        80,
        54321,
        1000,
        0,
        TcpFlags { ack: true, ..Default::default() },
        65535,
        &[],
    );
    common::inject(&ctx, &nic, &bogus);
    assert!(ctx.run_once(&channel));
    assert_eq!(ctx.tcbs.len(), 0);
}
