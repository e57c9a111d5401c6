//! MQTT 3.1.1 wire codec.
//!
//! Pure encode/decode between in-memory packet structures and the binary wire
//! format: a fixed header byte (packet type + flags), a variable-length
//! remaining-length field, and a type-specific body. Encoders write into a
//! caller buffer and return the framed length; decoders parse from a buffer
//! that holds exactly one framed packet. No partial or garbage packets are
//! ever produced.

mod connect;
mod extended;
mod publish;
mod subscribe;

pub use connect::{ConnAck, Connect, Disconnect, PingReq};
pub use extended::{ExtendedAck, ExtendedRequest};
pub use publish::{Ack, Publish};
pub use subscribe::{SubAck, Subscribe, UnsubAck, Unsubscribe};

use crate::error::Error;

/// Largest value representable by the remaining-length field (2^28 - 1).
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Offset at which encoders stage a packet body: one fixed-header byte plus
/// the worst-case four-byte remaining-length field.
pub(crate) const CONTENT_OFFSET: usize = 5;

/// MQTT control packet types.
///
/// Type 15 is reserved by MQTT 3.1.1; this client follows brokers that use it
/// for a vendor extension command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PacketType {
    /// Client connection request.
    Connect = 1,
    /// Broker connection acknowledgement.
    ConnAck = 2,
    /// Application message.
    Publish = 3,
    /// QoS 1 publish acknowledgement.
    PubAck = 4,
    /// QoS 2 publish received (step 1).
    PubRec = 5,
    /// QoS 2 publish release (step 2).
    PubRel = 6,
    /// QoS 2 publish complete (step 3).
    PubComp = 7,
    /// Subscription request.
    Subscribe = 8,
    /// Subscription acknowledgement.
    SubAck = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgement.
    UnsubAck = 11,
    /// Keep-alive ping request.
    PingReq = 12,
    /// Keep-alive ping response.
    PingResp = 13,
    /// Clean session teardown.
    Disconnect = 14,
    /// Vendor extension command / reply.
    Extended = 15,
}

impl PacketType {
    /// Extract the packet type from a fixed header byte.
    pub fn from_header(byte: u8) -> Option<Self> {
        Some(match byte >> 4 {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            15 => Self::Extended,
            _ => return None,
        })
    }
}

/// Quality of Service levels for MQTT messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum QoS {
    /// At most once delivery; no acknowledgement.
    AtMostOnce = 0,
    /// At least once delivery; single PUBACK.
    AtLeastOnce = 1,
    /// Exactly once delivery; PUBREC/PUBREL/PUBCOMP handshake.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self, Error> {
        match val {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(Error::MalformedPacket),
        }
    }
}

/// Encode a remaining-length value into `buf`, returning the byte count.
///
/// Seven bits per byte with a continuation bit, up to four bytes.
pub fn encode_remaining_length(buf: &mut [u8], mut len: usize) -> Result<usize, Error> {
    if len > MAX_REMAINING_LENGTH {
        return Err(Error::MalformedPacket);
    }
    let mut i = 0;
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        *buf.get_mut(i).ok_or(Error::BufferTooSmall)? = byte;
        i += 1;
        if len == 0 {
            break;
        }
    }
    Ok(i)
}

/// Decode a remaining-length value starting at `*cursor`, advancing the
/// cursor past the field.
///
/// A continuation bit set on the fourth byte is a protocol error.
pub fn decode_remaining_length(cursor: &mut usize, buf: &[u8]) -> Result<usize, Error> {
    let mut multiplier = 1usize;
    let mut value = 0usize;
    let mut i = 0;
    loop {
        if i >= 4 {
            return Err(Error::MalformedPacket);
        }
        let byte = *buf.get(*cursor + i).ok_or(Error::MalformedPacket)?;
        value += (byte & 0x7F) as usize * multiplier;
        if byte & 0x80 == 0 {
            break;
        }
        multiplier *= 128;
        i += 1;
    }
    *cursor += i + 1;
    Ok(value)
}

/// Compare a topic filter against a concrete topic name.
///
/// `+` matches exactly one level; `#` matches the remainder of the name from
/// that point on and must therefore be the last filter level. Following the
/// reference implementation, `#` consumes at least one level:
/// `topic_matches("a/#", "a")` is `false` while `topic_matches("a/#", "a/b")`
/// is `true`.
pub fn topic_matches(filter: &str, name: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut name_levels = name.split('/');
    loop {
        match (filter_levels.next(), name_levels.next()) {
            (Some("#"), Some(_)) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(n)) if f == n => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Write the fixed header in front of a body staged at [`CONTENT_OFFSET`] and
/// compact the packet to the front of the buffer. Returns the framed length.
pub(crate) fn seal(buf: &mut [u8], first_byte: u8, content_end: usize) -> Result<usize, Error> {
    let remaining_len = content_end - CONTENT_OFFSET;
    *buf.get_mut(0).ok_or(Error::BufferTooSmall)? = first_byte;
    let mut len_field = [0u8; 4];
    let len_bytes = encode_remaining_length(&mut len_field, remaining_len)?;
    buf[1..1 + len_bytes].copy_from_slice(&len_field[..len_bytes]);
    let header_len = 1 + len_bytes;
    buf.copy_within(CONTENT_OFFSET..content_end, header_len);
    Ok(header_len + remaining_len)
}

pub(crate) fn write_u8(buf: &mut [u8], cursor: &mut usize, val: u8) -> Result<(), Error> {
    *buf.get_mut(*cursor).ok_or(Error::BufferTooSmall)? = val;
    *cursor += 1;
    Ok(())
}

pub(crate) fn write_u16(buf: &mut [u8], cursor: &mut usize, val: u16) -> Result<(), Error> {
    let dst = buf
        .get_mut(*cursor..*cursor + 2)
        .ok_or(Error::BufferTooSmall)?;
    dst.copy_from_slice(&val.to_be_bytes());
    *cursor += 2;
    Ok(())
}

pub(crate) fn write_bytes(buf: &mut [u8], cursor: &mut usize, bytes: &[u8]) -> Result<(), Error> {
    let dst = buf
        .get_mut(*cursor..*cursor + bytes.len())
        .ok_or(Error::BufferTooSmall)?;
    dst.copy_from_slice(bytes);
    *cursor += bytes.len();
    Ok(())
}

/// Write a two-byte-length-prefixed byte string.
pub(crate) fn write_binary(buf: &mut [u8], cursor: &mut usize, bytes: &[u8]) -> Result<(), Error> {
    if bytes.len() > usize::from(u16::MAX) {
        return Err(Error::BufferTooSmall);
    }
    write_u16(buf, cursor, bytes.len() as u16)?;
    write_bytes(buf, cursor, bytes)
}

/// Write a two-byte-length-prefixed UTF-8 string.
pub(crate) fn write_utf8_string(buf: &mut [u8], cursor: &mut usize, s: &str) -> Result<(), Error> {
    write_binary(buf, cursor, s.as_bytes())
}

pub(crate) fn read_u8(cursor: &mut usize, buf: &[u8]) -> Result<u8, Error> {
    let val = *buf.get(*cursor).ok_or(Error::MalformedPacket)?;
    *cursor += 1;
    Ok(val)
}

pub(crate) fn read_u16(cursor: &mut usize, buf: &[u8]) -> Result<u16, Error> {
    let bytes = buf
        .get(*cursor..*cursor + 2)
        .ok_or(Error::MalformedPacket)?;
    *cursor += 2;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a two-byte-length-prefixed UTF-8 string.
pub(crate) fn read_utf8_string<'a>(cursor: &mut usize, buf: &'a [u8]) -> Result<&'a str, Error> {
    let len = usize::from(read_u16(cursor, buf)?);
    let bytes = buf
        .get(*cursor..*cursor + len)
        .ok_or(Error::MalformedPacket)?;
    *cursor += len;
    core::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
}
