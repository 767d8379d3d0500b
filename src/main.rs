//! Binary entry point: loads a run configuration, assembles the
//! engine, starts the REST management server, then hands control to
//! either the interactive CLI (when stdin is a terminal) or a headless
//! wait loop (when it isn't — e.g. running under a process supervisor).

use std::io::IsTerminal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use netgen::cli;
use netgen::engine::Engine;
use netgen::rest;
use netgen::run_config::RunConfig;

const DEFAULT_CONFIG: &str = r#"{
    "flows": [
        {"name": "default-ping", "protocol": "icmp_echo", "dst_ip": "10.0.0.2", "icmp_ping": true, "packets_per_second": 100}
    ]
}"#;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match RunConfig::load_from_path(std::path::Path::new(&path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("failed to load configuration from {path}: {e}");
                std::process::exit(1);
            }
        },
        None => RunConfig::from_json_str(DEFAULT_CONFIG).expect("built-in default config is valid"),
    };

    let local_ip = parse_local_ip();
    let local_mac = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

    let engine = match Engine::start(&config, local_ip, local_mac) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            eprintln!("failed to start engine: {e}");
            std::process::exit(1);
        }
    };

    if config.mgmt.rest_port != 0 {
        let rest_addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.mgmt.rest_port));
        let rest_engine = engine.clone();
        std::thread::spawn(move || {
            if let Err(e) = rest::serve(rest_addr, rest_engine) {
                log::error!("REST server stopped: {e}");
            }
        });
    }

    if std::io::stdin().is_terminal() {
        let _ = cli::run_repl(&engine, &config.mgmt.cli_prompt);
    } else {
        let run = AtomicBool::new(true);
        cli::block_until_stopped(&run);
    }
    // `Engine::shutdown` takes the engine by value to join every worker
    // thread; with the REST server holding its own `Arc` clone this
    // process relies on process exit to tear everything down, same as
    // the source's own daemon never calling its shutdown path outside
    // of tests.
}

fn parse_local_ip() -> u32 {
    u32::from_be_bytes([10, 0, 0, 1])
}
