//! `PortPool` has no production call site yet (see DESIGN.md: passive
//! accept doesn't need an ephemeral port, and active-open TCP flow
//! generation isn't built out), so this scenario exercises the
//! component directly through its public API rather than through the
//! worker's assembled RX/TX path.

use netgen::time::now_ticks;
use netgen::tcp::port_pool::{PortPool, PortPoolError};

#[test]
fn freed_port_sits_in_time_wait_before_becoming_reusable_again() {
    let mut pool = PortPool::new();
    let src_ip = 0x0a000001;

    let port = pool.allocate(src_ip).unwrap();
    pool.free(src_ip, port);
    assert_eq!(pool.time_wait_len(), 1);

    // Still inside the hold-off: ticking "now" must not release it.
    pool.tick(now_ticks());
    assert_eq!(pool.time_wait_len(), 1);

    // Allocating again must skip the held port and hand out a
    // different one while it's still quarantined.
    let other = pool.allocate(src_ip).unwrap();
    assert_ne!(other, port);

    // Comfortably past the 4s hold-off.
    pool.tick(now_ticks() + 5_000_000_000);
    assert_eq!(pool.time_wait_len(), 0);
}

#[test]
fn exhausted_pool_reports_error_without_touching_time_wait_ring() {
    use netgen::tcp::port_pool::EPHEM_CNT;

    let mut pool = PortPool::new();
    for _ in 0..EPHEM_CNT {
        pool.allocate(9).unwrap();
    }
    assert_eq!(pool.allocate(9), Err(PortPoolError::Exhausted));
    assert_eq!(pool.time_wait_len(), 0);
    assert_eq!(pool.exhaustion_events, 1);
}
