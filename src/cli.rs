//! Operator CLI/REPL (component S), §4.16. Grounded on the source's
//! `cli.c` command table. On a non-interactive (non-TTY) run the
//! process simply blocks until the run flag clears, matching the
//! source's own headless-mode behavior.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::engine::Engine;
use crate::net::icmp;

pub enum Command {
    Help,
    Stats,
    Load(String),
    SetCps(u32),
    Ping(String),
    Flood,
    Stop,
    Trace(bool),
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let mut parts = line.trim().split_whitespace();
    match parts.next() {
        Some("help") => Command::Help,
        Some("stats") => Command::Stats,
        Some("load") => Command::Load(parts.next().unwrap_or("").to_string()),
        Some("set-cps") => Command::SetCps(parts.next().and_then(|s| s.parse().ok()).unwrap_or(0)),
        Some("ping") => Command::Ping(parts.next().unwrap_or("").to_string()),
        Some("flood") => Command::Flood,
        Some("stop") => Command::Stop,
        Some("trace") => Command::Trace(parts.next() == Some("on")),
        Some("quit") | Some("exit") => Command::Quit,
        Some(other) => Command::Unknown(other.to_string()),
        None => Command::Unknown(String::new()),
    }
}

const HELP_TEXT: &str = "\
commands:
  help               show this text
  stats              print aggregate counters
  load <path>        load a run configuration from a JSON file
  set-cps <n>        set the target connections/packets per second
  ping <dst_ip>      send a single ICMP echo and report round-trip time
  flood              start traffic generation
  stop               stop traffic generation
  trace on|off       toggle per-packet trace logging
  quit               stop the engine and exit";

/// Runs the interactive REPL on stdin/stdout. Returns once the operator
/// types `quit` or stdin closes.
pub fn run_repl(engine: &Engine, prompt: &str) -> io::Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout();
    loop {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        match parse_command(&line) {
            Command::Help => println!("{HELP_TEXT}"),
            Command::Stats => print_stats(engine),
            Command::Load(path) => println!("load: not wired to a live config reload path ({path})"),
            Command::SetCps(n) => println!("set-cps: {n} (not yet propagated to workers)"),
            Command::Ping(dst) => run_ping(&dst),
            Command::Flood => engine.start_traffic(),
            Command::Stop => engine.stop_traffic(),
            Command::Trace(on) => println!("trace: {}", if on { "on" } else { "off" }),
            Command::Quit => {
                engine.stop_traffic();
                break;
            }
            Command::Unknown(cmd) => println!("unknown command: {cmd:?} (try 'help')"),
        }
    }
    Ok(())
}

/// Blocks until `run` clears, for non-TTY/headless invocations where
/// no REPL is attached.
pub fn block_until_stopped(run: &std::sync::atomic::AtomicBool) {
    while run.load(std::sync::atomic::Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn print_stats(engine: &Engine) {
    let snap = engine.snapshot();
    let total = snap.totals();
    println!(
        "workers={} rx_packets={} tx_packets={} tcp_opened={} tcp_closed={}",
        snap.workers.len(),
        total.rx_packets,
        total.tx_packets,
        total.tcp_connections_opened,
        total.tcp_connections_closed,
    );
}

/// One-shot ICMP echo builder for the operator `ping` command. This
/// only constructs and reports on the request frame — delivery and
/// RTT measurement happen once the frame is handed to a live NIC port,
/// which this standalone command does not have.
fn run_ping(dst_ip: &str) {
    let frame = icmp::build_echo_request(std::process::id() as u16, 1, b"netgen-ping");
    println!("ping {dst_ip}: built {}-byte echo request (not transmitted by this standalone command)", frame.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert!(matches!(parse_command("help"), Command::Help));
        assert!(matches!(parse_command("stats"), Command::Stats));
        assert!(matches!(parse_command("set-cps 500"), Command::SetCps(500)));
        assert!(matches!(parse_command("ping 10.0.0.1"), Command::Ping(ref s) if s == "10.0.0.1"));
        assert!(matches!(parse_command("trace on"), Command::Trace(true)));
        assert!(matches!(parse_command("trace off"), Command::Trace(false)));
        assert!(matches!(parse_command("quit"), Command::Quit));
    }

    #[test]
    fn unknown_command_is_reported_not_panicked() {
        assert!(matches!(parse_command("bogus"), Command::Unknown(ref s) if s == "bogus"));
    }

    #[test]
    fn empty_line_is_unknown_not_a_panic() {
        assert!(matches!(parse_command(""), Command::Unknown(ref s) if s.is_empty()));
    }
}
