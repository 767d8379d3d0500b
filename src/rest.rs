//! Minimal HTTP/1.1 REST management server (component T), §4.17.
//! Grounded on the source's `mgmt_http.c`, which serves a handful of
//! control routes over a blocking accept loop rather than a full async
//! reactor — this engine follows the same shape, built on
//! [`crate::mgmt_tcp`]'s listener rather than hand-rolled socket code.
//! Request parsing reuses [`crate::http::build_response`] for replies;
//! requests themselves are GET-only and small enough that a simple
//! line scan (no chunked/keep-alive request bodies) covers every route
//! below.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use crate::config::NetConfig;
use crate::engine::Engine;
use crate::http::build_response;
use crate::mgmt_tcp::TcpListener;

/// Runs the REST server on `bind_addr` until the process exits. Each
/// connection is handled on its own thread; this plane carries only a
/// handful of infrequent operator requests, so a thread-per-connection
/// model is simpler than wiring an event loop for it.
pub fn serve(bind_addr: SocketAddr, engine: Arc<Engine>) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr, &NetConfig::default())?;
    log::info!("REST management server listening on {bind_addr}");

    loop {
        match listener.accept_nonblocking() {
            Ok((stream, peer)) => {
                let engine = engine.clone();
                let std_stream = stream.as_std().try_clone()?;
                thread::spawn(move || {
                    let _ = std_stream.set_nonblocking(false);
                    if let Err(e) = handle_connection(std_stream, &engine) {
                        log::warn!("REST connection from {peer} ended: {e}");
                    }
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(std::time::Duration::from_millis(5));
            }
            Err(e) => return Err(e),
        }
    }
}

fn handle_connection(mut stream: std::net::TcpStream, engine: &Engine) -> std::io::Result<()> {
    let request = read_request(&mut stream)?;
    let response = match request {
        Some(req) => route(&req, engine),
        None => build_response(400, "Bad Request", &[], b""),
    };
    stream.write_all(&response)
}

struct Request {
    method: String,
    path: String,
}

/// Reads a single request off `stream`: the request line plus headers,
/// up through the blank line that terminates them. Bodies are not
/// consumed — every route below is GET-only and carries no body.
fn read_request(stream: &mut std::net::TcpStream) -> std::io::Result<Option<Request>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        if let Some(pos) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..pos]).into_owned();
            return Ok(parse_request_line(&head));
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 16 * 1024 {
            return Ok(None);
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(head: &str) -> Option<Request> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();
    Some(Request { method, path })
}

fn route(req: &Request, engine: &Engine) -> Vec<u8> {
    if req.method != "GET" {
        return build_response(405, "Method Not Allowed", &[], b"");
    }
    match req.path.as_str() {
        "/stats" => {
            let snapshot = engine.snapshot();
            let body = snapshot.export_json();
            build_response(200, "OK", &[("Content-Type", "application/json")], body.as_bytes())
        }
        "/metrics" => {
            let snapshot = engine.snapshot();
            let body = snapshot.export_prometheus();
            build_response(200, "OK", &[("Content-Type", "text/plain; version=0.0.4")], body.as_bytes())
        }
        "/flood" => {
            engine.start_traffic();
            build_response(200, "OK", &[], b"traffic started")
        }
        "/stop" => {
            engine.stop_traffic();
            build_response(200, "OK", &[], b"traffic stopped")
        }
        _ => build_response(404, "Not Found", &[], b""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get_request_line() {
        let head = "GET /stats HTTP/1.1\r\nHost: localhost\r\n";
        let req = parse_request_line(head).unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/stats");
    }

    #[test]
    fn rejects_missing_path() {
        assert!(parse_request_line("GET\r\n").is_none());
    }

    #[test]
    fn finds_header_terminator() {
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(find_header_end(buf).is_some());
        assert!(find_header_end(b"GET / HTTP/1.1\r\n").is_none());
    }

    #[test]
    fn unknown_route_is_404() {
        let req = Request { method: "GET".to_string(), path: "/nope".to_string() };
        let cfg = crate::run_config::RunConfig::from_json_str(
            r#"{"flows": [{"name": "t", "protocol": "icmp_echo", "dst_ip": "10.0.0.2", "icmp_ping": true}]}"#,
        )
        .unwrap();
        let engine = Engine::start(&cfg, 0x0a000001, [1; 6]).unwrap();
        let resp = route(&req, &engine);
        let text = String::from_utf8_lossy(&resp);
        assert!(text.starts_with("HTTP/1.1 404"));
        engine.shutdown();
    }
}
