//! Blocking transport traits with explicit timeouts.
//!
//! The client consumes an established, ordered byte stream through these
//! traits. Connection setup and socket-level concerns stay outside the crate;
//! the engine only interprets "not enough bytes within the timeout" and
//! "transport error".

#![allow(missing_docs)]

/// Read bytes from the connection, blocking at most `timeout_ms`.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` when the timeout elapsed with no data, `Ok(n)` for a
    /// (possibly short) read, and `Err` for a transport failure.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;
}

/// Write bytes to the connection, blocking at most `timeout_ms`.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    ///
    /// Short writes are allowed; the engine retries until its command timer
    /// expires.
    fn write(&mut self, buf: &[u8], timeout_ms: u32) -> Result<usize, Self::Error>;
}

/// Tear down the byte stream.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Close the connection. Best-effort and safe to call more than once.
    fn close(&mut self) -> Result<(), Self::Error>;
}

/// An established, ordered byte stream to the broker.
pub trait Connection: Read + Write + Close {}

/// A dialer that opens fresh connections to a remote endpoint.
///
/// The reconnection supervisor uses this to reopen the transport to the
/// last-known broker address after a detected connection loss.
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;

    /// Open a connection to `remote` (for TCP transports, `"host:port"`).
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}
