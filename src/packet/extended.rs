//! Vendor extension command channel (reserved packet type 15).
//!
//! Some brokers overload the reserved control packet type for out-of-band
//! commands (alias management, server-side publish options, and similar). The
//! request side mirrors PUBLISH framing: publish-style flags, a packet
//! identifier for QoS > 0, then a one-byte command kind and an opaque payload.
//! The reply carries the command kind, a one-byte status code, and an opaque
//! result payload. Command kinds and status codes are broker-defined and
//! treated as opaque here.

use super::{
    CONTENT_OFFSET, PacketType, QoS, decode_remaining_length, read_u8, read_u16, seal, write_bytes,
    write_u8, write_u16,
};
use crate::error::Error;

/// An outbound extension command request.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedRequest<'a> {
    /// Broker-defined command kind.
    pub cmd: u8,
    /// Opaque command argument bytes.
    pub payload: &'a [u8],
    /// Delivery guarantee level for the request.
    pub qos: QoS,
    /// Retained flag, interpreted by the broker.
    pub retained: bool,
    /// Exchange identifier; zero for (and only for) QoS 0.
    pub packet_id: u16,
}

impl ExtendedRequest<'_> {
    /// Encode into `buf`, returning the framed length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = CONTENT_OFFSET;
        if self.qos != QoS::AtMostOnce {
            write_u16(buf, &mut cursor, self.packet_id)?;
        }
        write_u8(buf, &mut cursor, self.cmd)?;
        write_bytes(buf, &mut cursor, self.payload)?;

        let mut first_byte = (PacketType::Extended as u8) << 4 | (self.qos as u8) << 1;
        if self.retained {
            first_byte |= 0x01;
        }
        seal(buf, first_byte, cursor)
    }
}

/// A decoded extension command reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedAck<'a> {
    /// Command kind being answered.
    pub cmd: u8,
    /// Broker-defined status code.
    pub status: u8,
    /// Opaque result bytes.
    pub payload: &'a [u8],
}

impl<'a> ExtendedAck<'a> {
    /// Decode from a framed packet.
    pub fn decode(buf: &'a [u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        if PacketType::from_header(header) != Some(PacketType::Extended) {
            return Err(Error::MalformedPacket);
        }
        let qos = QoS::try_from((header >> 1) & 0x03)?;
        let remaining_len = decode_remaining_length(&mut cursor, buf)?;
        let packet_end = cursor
            .checked_add(remaining_len)
            .filter(|end| *end <= buf.len())
            .ok_or(Error::MalformedPacket)?;

        if qos != QoS::AtMostOnce {
            let _packet_id = read_u16(&mut cursor, buf)?;
        }
        let cmd = read_u8(&mut cursor, buf)?;
        let status = read_u8(&mut cursor, buf)?;
        if cursor > packet_end {
            return Err(Error::MalformedPacket);
        }
        Ok(Self {
            cmd,
            status,
            payload: &buf[cursor..packet_end],
        })
    }
}
