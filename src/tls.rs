//! TLS delegation (component X), §4.13 "Non-goals". This engine never
//! synthesizes TLS record bytes itself; when a flow is configured with
//! `tls: true` it hands the already-established TCP byte stream to
//! whatever implements [`TlsDelegate`] and resumes its own framing once
//! that returns plaintext. No TLS implementation lives in this crate.

pub trait TlsDelegate: Send + Sync {
    /// Wraps a freshly connected TCP stream, performing a handshake and
    /// returning something that behaves like a plaintext duplex byte
    /// stream from here on. Errors are opaque to this crate: the
    /// delegate's own error type is boxed.
    fn wrap_client(
        &self,
        stream: Box<dyn ReadWrite>,
        server_name: &str,
    ) -> Result<Box<dyn ReadWrite>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Minimal duplex-stream interface the delegate operates on and hands
/// back; deliberately narrower than `std::io::{Read, Write}` plus
/// `Send` so a delegate can wrap anything byte-stream-shaped (a TCP
/// socket, an in-memory pipe in tests) without this crate depending on
/// any particular TLS library's types.
pub trait ReadWrite: std::io::Read + std::io::Write + Send {}
impl<T: std::io::Read + std::io::Write + Send> ReadWrite for T {}

/// No-op delegate used when a run has no TLS flows configured; any
/// call is a logic error in the caller, so it returns an error rather
/// than silently passing bytes through unencrypted.
pub struct NoTlsConfigured;

impl TlsDelegate for NoTlsConfigured {
    fn wrap_client(
        &self,
        _stream: Box<dyn ReadWrite>,
        _server_name: &str,
    ) -> Result<Box<dyn ReadWrite>, Box<dyn std::error::Error + Send + Sync>> {
        Err("no TLS delegate configured".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tls_configured_refuses_to_wrap() {
        let delegate = NoTlsConfigured;
        let pipe: std::io::Cursor<Vec<u8>> = std::io::Cursor::new(Vec::new());
        let result = delegate.wrap_client(Box::new(pipe), "example.test");
        assert!(result.is_err());
    }
}
