//! `Engine::shutdown` must broadcast `Shutdown` over the control bus
//! and have every worker thread observe it and exit, against the fully
//! assembled engine rather than a single `WorkerContext` in isolation.

use netgen::engine::Engine;
use netgen::run_config::RunConfig;

fn minimal_config() -> RunConfig {
    RunConfig::from_json_str(
        r#"{"flows": [{"name": "t", "protocol": "icmp_echo", "dst_ip": "10.0.0.2", "icmp_ping": true, "packets_per_second": 10}]}"#,
    )
    .unwrap()
}

#[test]
fn shutdown_joins_every_worker_and_stops_traffic() {
    let engine = Engine::start(&minimal_config(), 0x0a000001, [1; 6]).unwrap();
    let workers = engine.core_map.num_workers();
    assert!(workers >= 1);

    engine.start_traffic();
    std::thread::sleep(std::time::Duration::from_millis(20));
    engine.stop_traffic();

    // Consumes `engine`, broadcasting Shutdown and joining every
    // worker thread; returning at all means every worker observed the
    // command and exited its loop.
    engine.shutdown();
}

#[test]
fn bus_broadcast_reaches_every_worker_channel() {
    use netgen::control_bus::{Cmd, ControlBus, ControlMsg};

    let bus = ControlBus::new(4, 16);
    let delivered = bus.broadcast(ControlMsg::new(Cmd::Stop, 1, &[]));
    assert_eq!(delivered, 4);
    for w in 0..4 {
        let msg = bus.channel(w).to_worker.try_pop().expect("message delivered");
        assert!(matches!(msg.cmd, Cmd::Stop));
    }
}
