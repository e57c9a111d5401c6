//! The MQTT client: protocol engine, session facade, and reconnection
//! supervisor.
//!
//! [`Client`] owns the transport, the clock, and two caller-supplied framing
//! buffers. All public operations are blocking with an explicit deadline and
//! take `&mut self`; that exclusivity is the concurrency model. The receive
//! path is driven either implicitly, while an operation waits for its
//! acknowledgement, or explicitly through [`Client::process`].

pub mod router;
pub mod session;

pub use router::{MessageCallback, MessageRouter};
pub use session::Session;

use crate::error::{ConnectReturnCode, Error};
use crate::packet::{
    Ack, ConnAck, Connect, Disconnect, ExtendedAck, ExtendedRequest, PacketType, PingReq, Publish,
    QoS, SubAck, Subscribe, UnsubAck, Unsubscribe, encode_remaining_length,
};
use crate::time::{Clock, Timer};
use crate::transport::Connection;

/// An inbound application message, borrowed from the client read buffer for
/// the duration of a callback.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    /// Concrete topic the message was published under.
    pub topic: &'a str,
    /// Opaque application payload.
    pub payload: &'a [u8],
    /// Delivery guarantee level the broker used.
    pub qos: QoS,
    /// Whether this is a broker-retained message.
    pub retained: bool,
    /// Whether the broker flagged this as a redelivery.
    pub duplicate: bool,
}

/// Callback invoked for each extension command reply.
pub type ExtendedCallback = fn(cmd: u8, status: u8, payload: &[u8]);

/// Callback invoked once when keep-alive supervision declares the connection
/// dead. Notification only; recovery happens through [`Session::maintain`] or
/// an application-driven reconnect.
pub type ConnectionLostCallback = fn(reason: &str);

/// CONNECT handshake parameters.
#[derive(Debug, Clone)]
pub struct ConnectOptions<'a> {
    /// Client identifier, unique per broker.
    pub client_id: &'a str,
    /// Optional user name credential.
    pub username: Option<&'a str>,
    /// Optional password credential.
    pub password: Option<&'a [u8]>,
    /// Keep-alive interval in seconds; zero disables keep-alive supervision.
    pub keep_alive_seconds: u16,
    /// Whether the broker should discard previous session state.
    pub clean_session: bool,
}

impl<'a> ConnectOptions<'a> {
    /// Options for `client_id` with a 60 second keep-alive, a clean session,
    /// and no credentials.
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            username: None,
            password: None,
            keep_alive_seconds: 60,
            clean_session: true,
        }
    }

    /// Set the keep-alive interval in seconds. Zero disables keep-alive.
    pub fn keep_alive(mut self, seconds: u16) -> Self {
        self.keep_alive_seconds = seconds;
        self
    }

    /// Attach user name and password credentials.
    pub fn credentials(mut self, username: &'a str, password: &'a [u8]) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Set the clean-session flag.
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }
}

/// Tuning knobs for keep-alive failure escalation.
#[derive(Debug, Clone)]
pub struct KeepAlivePolicy {
    /// Consecutive PINGREQ send failures before the connection is declared
    /// lost.
    pub max_failures: u8,
    /// Back-off before re-attempting a failed PINGREQ, in seconds.
    pub retry_interval_s: u16,
    /// Deadline for pushing a single PINGREQ onto the wire, in milliseconds.
    pub ping_send_timeout_ms: u32,
}

impl Default for KeepAlivePolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            retry_interval_s: 20,
            ping_send_timeout_ms: 1_000,
        }
    }
}

/// A blocking MQTT 3.1.1 client over a [`Connection`].
///
/// `MAX_ROUTES` bounds the number of concurrently registered subscription
/// callbacks.
#[derive(Debug)]
pub struct Client<'buf, C: Connection, K: Clock, const MAX_ROUTES: usize> {
    conn: C,
    clock: K,
    send_buf: &'buf mut [u8],
    read_buf: &'buf mut [u8],
    command_timeout_ms: u32,
    connected: bool,
    keep_alive_seconds: u16,
    ping_timer: Timer,
    ping_outstanding: bool,
    keepalive_failures: u8,
    keepalive_policy: KeepAlivePolicy,
    next_packet_id: u16,
    last_frame_len: usize,
    router: MessageRouter<MAX_ROUTES>,
    on_extended: Option<ExtendedCallback>,
    on_connection_lost: Option<ConnectionLostCallback>,
}

impl<'buf, C: Connection, K: Clock, const MAX_ROUTES: usize> Client<'buf, C, K, MAX_ROUTES> {
    /// Create a client over `conn` in the disconnected state.
    ///
    /// `send_buf` and `read_buf` must each be large enough for the largest
    /// packet the application sends or expects to receive.
    /// `command_timeout_ms` bounds every facade operation, send and
    /// acknowledgement wait included.
    pub fn new(
        conn: C,
        clock: K,
        send_buf: &'buf mut [u8],
        read_buf: &'buf mut [u8],
        command_timeout_ms: u32,
    ) -> Self {
        // Seed the identifier sequence from the clock so restarts do not
        // replay the same ids against a broker holding session state.
        let seed = (clock.now_ms() as u16).max(1);
        let ping_timer = Timer::start(&clock, 0);
        Self {
            conn,
            clock,
            send_buf,
            read_buf,
            command_timeout_ms,
            connected: false,
            keep_alive_seconds: 0,
            ping_timer,
            ping_outstanding: false,
            keepalive_failures: 0,
            keepalive_policy: KeepAlivePolicy::default(),
            next_packet_id: seed,
            last_frame_len: 0,
            router: MessageRouter::new(),
            on_extended: None,
            on_connection_lost: None,
        }
    }

    /// Whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Replace the keep-alive escalation policy.
    pub fn set_keepalive_policy(&mut self, policy: KeepAlivePolicy) {
        self.keepalive_policy = policy;
    }

    /// Install the fallback callback for publishes no subscription filter
    /// matches.
    pub fn set_default_handler(&mut self, callback: MessageCallback) {
        self.router.set_default(callback);
    }

    /// Install the callback for extension command replies.
    pub fn set_extended_handler(&mut self, callback: ExtendedCallback) {
        self.on_extended = Some(callback);
    }

    /// Install the callback fired once when keep-alive supervision declares
    /// the connection dead.
    pub fn set_connection_lost_handler(&mut self, callback: ConnectionLostCallback) {
        self.on_connection_lost = Some(callback);
    }

    /// Swap in a freshly dialed transport, returning the old one.
    ///
    /// Resets the session to disconnected; subscription callbacks are kept so
    /// they survive a re-connect and re-subscribe.
    pub fn replace_transport(&mut self, conn: C) -> C {
        self.connected = false;
        self.ping_outstanding = false;
        self.keepalive_failures = 0;
        core::mem::replace(&mut self.conn, conn)
    }

    /// Borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    fn next_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        if self.next_packet_id == 0 {
            self.next_packet_id = 1;
        }
        id
    }

    /// Write `length` framed bytes from the send buffer, retrying partial
    /// writes until done or the deadline passes. A completed send re-arms the
    /// keep-alive timer.
    fn send_packet(&mut self, length: usize, timer: &Timer) -> Result<(), Error> {
        let mut sent = 0;
        while sent < length {
            if timer.is_expired(&self.clock) {
                return Err(Error::Timeout);
            }
            let n = self
                .conn
                .write(
                    &self.send_buf[sent..length],
                    timer.remaining_ms(&self.clock),
                )
                .map_err(|_| Error::WriteError)?;
            sent += n;
        }
        // Outbound traffic proves the link alive; push the next ping out.
        if self.keep_alive_seconds > 0 {
            self.ping_timer = Timer::start_seconds(&self.clock, self.keep_alive_seconds);
        }
        Ok(())
    }

    fn read_exact(&mut self, offset: usize, len: usize, timer: &Timer) -> Result<(), Error> {
        let mut got = 0;
        while got < len {
            if timer.is_expired(&self.clock) {
                return Err(Error::Timeout);
            }
            let n = self
                .conn
                .read(
                    &mut self.read_buf[offset + got..offset + len],
                    timer.remaining_ms(&self.clock),
                )
                .map_err(|_| Error::ReadError)?;
            if n == 0 {
                return Err(Error::Timeout);
            }
            got += n;
        }
        Ok(())
    }

    /// Read one complete framed packet into the read buffer.
    ///
    /// Returns `Ok(None)` when no traffic arrived before the deadline. Once
    /// a header byte has been seen, a stalled or malformed remainder is an
    /// error. On success the frame occupies `read_buf[..returned len]` with a
    /// canonically re-encoded remaining-length field.
    fn read_packet(&mut self, timer: &Timer) -> Result<Option<(PacketType, usize)>, Error> {
        let mut header = [0u8; 1];
        let n = self
            .conn
            .read(&mut header, timer.remaining_ms(&self.clock))
            .map_err(|_| Error::ReadError)?;
        if n == 0 {
            return Ok(None);
        }
        let packet_type = PacketType::from_header(header[0]).ok_or(Error::MalformedPacket)?;

        // Remaining length arrives one byte at a time.
        let mut remaining_len = 0usize;
        let mut multiplier = 1usize;
        for i in 0.. {
            if i >= 4 {
                return Err(Error::MalformedPacket);
            }
            let mut byte = [0u8; 1];
            let n = self
                .conn
                .read(&mut byte, timer.remaining_ms(&self.clock))
                .map_err(|_| Error::ReadError)?;
            if n == 0 {
                return Err(Error::Timeout);
            }
            remaining_len += (byte[0] & 0x7F) as usize * multiplier;
            multiplier *= 128;
            if byte[0] & 0x80 == 0 {
                break;
            }
        }

        self.read_buf[0] = header[0];
        let len_bytes = encode_remaining_length(&mut self.read_buf[1..], remaining_len)?;
        let body_start = 1 + len_bytes;
        let frame_len = body_start + remaining_len;
        if frame_len > self.read_buf.len() {
            return Err(Error::BufferTooSmall);
        }
        self.read_exact(body_start, remaining_len, timer)?;
        self.last_frame_len = frame_len;
        Ok(Some((packet_type, frame_len)))
    }

    fn send_ack(
        &mut self,
        packet_type: PacketType,
        packet_id: u16,
        timer: &Timer,
    ) -> Result<(), Error> {
        let len = Ack::new(packet_type, packet_id).encode(self.send_buf)?;
        self.send_packet(len, timer)
    }

    fn handle_publish(&mut self, frame_len: usize, timer: &Timer) -> Result<(), Error> {
        let (qos, packet_id) = {
            let publish = Publish::decode(&self.read_buf[..frame_len])?;
            (publish.qos, publish.packet_id)
        };
        // Acknowledge before delivery so a slow callback cannot stall the
        // broker's redelivery logic.
        match qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => self.send_ack(PacketType::PubAck, packet_id, timer)?,
            QoS::ExactlyOnce => self.send_ack(PacketType::PubRec, packet_id, timer)?,
        }
        let publish = Publish::decode(&self.read_buf[..frame_len])?;
        let message = Message {
            topic: publish.topic,
            payload: publish.payload,
            qos,
            retained: publish.retained,
            duplicate: publish.duplicate,
        };
        self.router.dispatch(&message);
        Ok(())
    }

    fn handle_extended(&mut self, frame_len: usize) -> Result<(), Error> {
        let ack = ExtendedAck::decode(&self.read_buf[..frame_len])?;
        if let Some(callback) = self.on_extended {
            callback(ack.cmd, ack.status, ack.payload);
        }
        Ok(())
    }

    fn cycle_inner(&mut self, timer: &Timer) -> Result<Option<PacketType>, Error> {
        let (packet_type, frame_len) = match self.read_packet(timer)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        match packet_type {
            PacketType::ConnAck => {
                let ack = ConnAck::decode(&self.read_buf[..frame_len])?;
                if ack.return_code == ConnectReturnCode::Accepted {
                    self.connected = true;
                }
            }
            PacketType::Publish => self.handle_publish(frame_len, timer)?,
            PacketType::PubRec => {
                let ack = Ack::decode(&self.read_buf[..frame_len])?;
                self.send_ack(PacketType::PubRel, ack.packet_id, timer)?;
            }
            PacketType::PubRel => {
                let ack = Ack::decode(&self.read_buf[..frame_len])?;
                self.send_ack(PacketType::PubComp, ack.packet_id, timer)?;
            }
            PacketType::PubAck | PacketType::PubComp => {
                // Validated and discarded; command issuance is serialized, so
                // the identifier needs no correlation.
                Ack::decode(&self.read_buf[..frame_len])?;
            }
            PacketType::SubAck => {
                SubAck::decode(&self.read_buf[..frame_len])?;
            }
            PacketType::UnsubAck => {
                UnsubAck::decode(&self.read_buf[..frame_len])?;
            }
            PacketType::PingResp => {
                self.ping_outstanding = false;
                self.keepalive_failures = 0;
            }
            PacketType::Extended => self.handle_extended(frame_len)?,
            // Server-to-client traffic never carries these; drop them.
            PacketType::Connect
            | PacketType::Subscribe
            | PacketType::Unsubscribe
            | PacketType::PingReq
            | PacketType::Disconnect => {}
        }
        Ok(Some(packet_type))
    }

    /// Run one receive/dispatch cycle bounded by `timer`, then keep-alive
    /// supervision.
    ///
    /// Returns the type of the packet processed, or `Ok(None)` when the wire
    /// stayed quiet until the deadline.
    pub fn cycle(&mut self, timer: &Timer) -> Result<Option<PacketType>, Error> {
        let result = self.cycle_inner(timer);
        self.keepalive();
        result
    }

    fn keepalive(&mut self) {
        if self.keep_alive_seconds == 0 || !self.connected {
            return;
        }
        if !self.ping_timer.is_expired(&self.clock) {
            return;
        }
        let timer = Timer::start(&self.clock, self.keepalive_policy.ping_send_timeout_ms);
        let sent = match PingReq.encode(self.send_buf) {
            // send_packet re-arms the keep-alive timer on success.
            Ok(len) => self.send_packet(len, &timer).is_ok(),
            Err(_) => false,
        };
        if sent {
            self.ping_outstanding = true;
            self.keepalive_failures = 0;
        } else {
            self.keepalive_failures = self.keepalive_failures.saturating_add(1);
            #[cfg(feature = "log")]
            log::warn!(
                "keep-alive ping failed ({}/{})",
                self.keepalive_failures,
                self.keepalive_policy.max_failures
            );
            if self.keepalive_failures >= self.keepalive_policy.max_failures {
                self.connection_lost("keep-alive ping failed");
            } else {
                self.ping_timer =
                    Timer::start_seconds(&self.clock, self.keepalive_policy.retry_interval_s);
            }
        }
    }

    fn connection_lost(&mut self, reason: &str) {
        self.connected = false;
        self.ping_outstanding = false;
        self.keepalive_failures = 0;
        #[cfg(feature = "log")]
        log::warn!("connection lost: {reason}");
        if let Some(callback) = self.on_connection_lost {
            callback(reason);
        }
    }

    /// Run cycles until a packet of type `want` is processed or the deadline
    /// passes.
    ///
    /// Unrelated traffic received while waiting is processed in full;
    /// malformed packets are dropped and the wait continues.
    fn wait_for(&mut self, want: PacketType, timer: &Timer) -> Result<(), Error> {
        loop {
            if timer.is_expired(&self.clock) {
                return Err(Error::Timeout);
            }
            match self.cycle(timer) {
                Ok(Some(packet_type)) if packet_type == want => return Ok(()),
                Ok(_) | Err(_) => {}
            }
        }
    }

    /// Service the connection for up to `timeout_ms`, dispatching inbound
    /// publishes and driving keep-alive.
    ///
    /// Call this regularly whenever no other operation is in flight.
    pub fn process(&mut self, timeout_ms: u32) -> Result<(), Error> {
        let timer = Timer::start(&self.clock, timeout_ms);
        loop {
            self.cycle(&timer)?;
            if timer.is_expired(&self.clock) {
                return Ok(());
            }
        }
    }

    /// Perform the CONNECT handshake.
    ///
    /// On success the session is established and keep-alive supervision is
    /// armed with the negotiated interval.
    pub fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Error> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        self.keep_alive_seconds = options.keep_alive_seconds;
        self.ping_timer = Timer::start_seconds(&self.clock, options.keep_alive_seconds);
        self.ping_outstanding = false;
        self.keepalive_failures = 0;

        let len = Connect {
            client_id: options.client_id,
            username: options.username,
            password: options.password,
            keep_alive_seconds: options.keep_alive_seconds,
            clean_session: options.clean_session,
        }
        .encode(self.send_buf)?;
        self.send_packet(len, &timer)?;
        self.wait_for(PacketType::ConnAck, &timer)?;

        let ack = ConnAck::decode(&self.read_buf[..self.last_frame_len])?;
        match ack.return_code {
            ConnectReturnCode::Accepted => {
                self.connected = true;
                #[cfg(feature = "log")]
                log::debug!("connected as {:?}", options.client_id);
                Ok(())
            }
            code => {
                self.connected = false;
                #[cfg(feature = "log")]
                log::warn!("connection refused: {code:?}");
                Err(Error::ConnectionRefused(code))
            }
        }
    }

    /// Subscribe to `filter` at `qos`, routing matching publishes to
    /// `callback`. Returns the QoS the broker granted.
    pub fn subscribe(
        &mut self,
        filter: &str,
        qos: QoS,
        callback: MessageCallback,
    ) -> Result<QoS, Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        let packet_id = self.next_packet_id();
        let len = Subscribe {
            packet_id,
            filter,
            qos,
        }
        .encode(self.send_buf)?;
        self.send_packet(len, &timer)?;
        self.wait_for(PacketType::SubAck, &timer)?;

        let ack = SubAck::decode(&self.read_buf[..self.last_frame_len])?;
        match ack.granted_qos {
            Some(granted) => {
                self.router.bind(filter, callback)?;
                Ok(granted)
            }
            None => Err(Error::SubscriptionRejected),
        }
    }

    /// Remove the subscription for `filter`.
    pub fn unsubscribe(&mut self, filter: &str) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        let packet_id = self.next_packet_id();
        let len = Unsubscribe { packet_id, filter }.encode(self.send_buf)?;
        self.send_packet(len, &timer)?;
        self.wait_for(PacketType::UnsubAck, &timer)?;
        UnsubAck::decode(&self.read_buf[..self.last_frame_len])?;
        self.router.unbind(filter);
        Ok(())
    }

    /// Publish `payload` to `topic` at `qos`.
    ///
    /// QoS 0 returns as soon as the packet is on the wire. QoS 1 waits for
    /// the PUBACK, QoS 2 for the full PUBREC/PUBREL/PUBCOMP handshake.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retained: bool,
    ) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        let packet_id = if qos != QoS::AtMostOnce {
            self.next_packet_id()
        } else {
            0
        };
        let len = Publish {
            topic,
            payload,
            qos,
            retained,
            duplicate: false,
            packet_id,
        }
        .encode(self.send_buf)?;
        self.send_packet(len, &timer)?;
        match qos {
            QoS::AtMostOnce => Ok(()),
            // The intermediate PUBREL is sent by the dispatch cycle when the
            // PUBREC arrives.
            QoS::AtLeastOnce => self.wait_for(PacketType::PubAck, &timer),
            QoS::ExactlyOnce => self.wait_for(PacketType::PubComp, &timer),
        }
    }

    /// Issue a vendor extension command and wait for its reply.
    ///
    /// The reply is delivered through the handler installed with
    /// [`Client::set_extended_handler`].
    pub fn extended(
        &mut self,
        cmd: u8,
        payload: &[u8],
        qos: QoS,
        retained: bool,
    ) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        let packet_id = if qos != QoS::AtMostOnce {
            self.next_packet_id()
        } else {
            0
        };
        let len = ExtendedRequest {
            cmd,
            payload,
            qos,
            retained,
            packet_id,
        }
        .encode(self.send_buf)?;
        self.send_packet(len, &timer)?;
        self.wait_for(PacketType::Extended, &timer)
    }

    /// Send DISCONNECT and tear the session down.
    ///
    /// The session is marked disconnected even if the send fails; calling
    /// this while already disconnected is a no-op.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        if !self.connected {
            return Ok(());
        }
        let timer = Timer::start(&self.clock, self.command_timeout_ms);
        let result = Disconnect
            .encode(self.send_buf)
            .and_then(|len| self.send_packet(len, &timer));
        self.connected = false;
        self.ping_outstanding = false;
        self.keepalive_failures = 0;
        #[cfg(feature = "log")]
        log::debug!("disconnected");
        result
    }
}
