//! Reconnect-on-failure session supervision.
//!
//! [`Session`] pairs a [`Connect`] dialer with the handshake parameters so a
//! dropped connection can be rebuilt from scratch: tear down the dead
//! transport, dial a fresh one, and redo the CONNECT handshake. Subscription
//! callbacks registered on the client survive the swap; the application
//! re-subscribes after a successful [`Session::maintain`] if the broker does
//! not hold its session state.

use super::{Client, ConnectOptions};
use crate::error::Error;
use crate::time::Clock;
use crate::transport::{Close, Connect};

/// Owns the dialer and connect parameters needed to (re)establish a session.
#[derive(Debug)]
pub struct Session<'a, D: Connect> {
    dialer: D,
    remote: &'a str,
    options: ConnectOptions<'a>,
}

impl<'a, D: Connect> Session<'a, D> {
    /// Create a session that dials `remote` and connects with `options`.
    pub fn new(dialer: D, remote: &'a str, options: ConnectOptions<'a>) -> Self {
        Self {
            dialer,
            remote,
            options,
        }
    }

    /// Tear down the client's transport, dial a fresh one, and redo the
    /// handshake.
    ///
    /// Safe to call whether or not the old session is still half-alive; the
    /// protocol-level disconnect and the transport close are both
    /// best-effort.
    pub fn maintain<K: Clock, const MAX_ROUTES: usize>(
        &mut self,
        client: &mut Client<'_, D::Connection, K, MAX_ROUTES>,
    ) -> Result<(), Error> {
        let _ = client.disconnect();
        let _ = client.transport_mut().close();
        #[cfg(feature = "log")]
        log::debug!("reconnecting to {}", self.remote);
        let conn = self
            .dialer
            .connect(self.remote)
            .map_err(|_| Error::NotOpen)?;
        let _ = client.replace_transport(conn);
        client.connect(&self.options)
    }

    /// Service an established session, or rebuild it when it is down.
    ///
    /// The single call an application loop needs: while connected it behaves
    /// like [`Client::process`]; once the connection is lost it performs one
    /// reconnect attempt per call, so the caller controls the retry cadence.
    pub fn run_once<K: Clock, const MAX_ROUTES: usize>(
        &mut self,
        client: &mut Client<'_, D::Connection, K, MAX_ROUTES>,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        if client.is_connected() {
            client.process(timeout_ms)
        } else {
            self.maintain(client)
        }
    }
}
