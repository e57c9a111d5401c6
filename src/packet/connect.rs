//! Connection lifecycle packets: CONNECT, CONNACK, PINGREQ, DISCONNECT.

use super::{
    CONTENT_OFFSET, PacketType, read_u8, seal, write_binary, write_u8, write_u16,
    write_utf8_string,
};
use crate::error::{ConnectReturnCode, Error};

const PROTOCOL_NAME: &str = "MQTT";
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// A CONNECT request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Connect<'a> {
    /// Client identifier, unique per broker.
    pub client_id: &'a str,
    /// Optional user name credential.
    pub username: Option<&'a str>,
    /// Optional password credential.
    pub password: Option<&'a [u8]>,
    /// Negotiated keep-alive interval in seconds; zero disables keep-alive.
    pub keep_alive_seconds: u16,
    /// Whether the broker should discard previous session state.
    pub clean_session: bool,
}

impl Connect<'_> {
    /// Encode into `buf`, returning the framed length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = CONTENT_OFFSET;

        // Variable header
        write_utf8_string(buf, &mut cursor, PROTOCOL_NAME)?;
        write_u8(buf, &mut cursor, PROTOCOL_LEVEL)?;
        let mut flags = 0u8;
        if self.clean_session {
            flags |= 0x02;
        }
        if self.username.is_some() {
            flags |= 0x80;
        }
        if self.password.is_some() {
            flags |= 0x40;
        }
        write_u8(buf, &mut cursor, flags)?;
        write_u16(buf, &mut cursor, self.keep_alive_seconds)?;

        // Payload
        write_utf8_string(buf, &mut cursor, self.client_id)?;
        if let Some(username) = self.username {
            write_utf8_string(buf, &mut cursor, username)?;
        }
        if let Some(password) = self.password {
            write_binary(buf, &mut cursor, password)?;
        }

        seal(buf, (PacketType::Connect as u8) << 4, cursor)
    }
}

/// A decoded CONNACK response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnAck {
    /// Whether the broker resumed a previous session.
    pub session_present: bool,
    /// The handshake result.
    pub return_code: ConnectReturnCode,
}

impl ConnAck {
    /// Decode from a framed packet.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        if PacketType::from_header(header) != Some(PacketType::ConnAck) {
            return Err(Error::MalformedPacket);
        }
        let remaining_len = super::decode_remaining_length(&mut cursor, buf)?;
        if remaining_len < 2 {
            return Err(Error::MalformedPacket);
        }
        let flags = read_u8(&mut cursor, buf)?;
        let return_code = read_u8(&mut cursor, buf)?;
        Ok(Self {
            session_present: flags & 0x01 != 0,
            return_code: ConnectReturnCode::from(return_code),
        })
    }
}

/// A PINGREQ keep-alive probe.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PingReq;

impl PingReq {
    /// Encode into `buf`, returning the framed length (always two bytes).
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.len() < 2 {
            return Err(Error::BufferTooSmall);
        }
        buf[0] = (PacketType::PingReq as u8) << 4;
        buf[1] = 0;
        Ok(2)
    }
}

/// A DISCONNECT notification.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Disconnect;

impl Disconnect {
    /// Encode into `buf`, returning the framed length (always two bytes).
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.len() < 2 {
            return Err(Error::BufferTooSmall);
        }
        buf[0] = (PacketType::Disconnect as u8) << 4;
        buf[1] = 0;
        Ok(2)
    }
}
