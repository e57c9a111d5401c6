//! Subscription management packets: SUBSCRIBE, SUBACK, UNSUBSCRIBE, UNSUBACK.

use super::{
    CONTENT_OFFSET, PacketType, QoS, decode_remaining_length, read_u8, read_u16, seal, write_u8,
    write_u16, write_utf8_string,
};
use crate::error::Error;

/// SUBACK code signalling a rejected subscription.
pub(crate) const SUBACK_FAILURE: u8 = 0x80;

/// A SUBSCRIBE request for a single topic filter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subscribe<'a> {
    /// Exchange identifier.
    pub packet_id: u16,
    /// Topic filter, possibly containing `+`/`#` wildcards.
    pub filter: &'a str,
    /// Maximum QoS the client is willing to receive at.
    pub qos: QoS,
}

impl Subscribe<'_> {
    /// Encode into `buf`, returning the framed length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = CONTENT_OFFSET;
        write_u16(buf, &mut cursor, self.packet_id)?;
        write_utf8_string(buf, &mut cursor, self.filter)?;
        write_u8(buf, &mut cursor, self.qos as u8)?;
        // SUBSCRIBE carries the reserved flag bits 0b0010.
        seal(buf, (PacketType::Subscribe as u8) << 4 | 0x02, cursor)
    }
}

/// A decoded SUBACK response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubAck {
    /// Identifier of the SUBSCRIBE being answered.
    pub packet_id: u16,
    /// Granted QoS, or `None` when the broker rejected the filter (0x80).
    pub granted_qos: Option<QoS>,
}

impl SubAck {
    /// Decode from a framed packet.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        if PacketType::from_header(header) != Some(PacketType::SubAck) {
            return Err(Error::MalformedPacket);
        }
        let remaining_len = decode_remaining_length(&mut cursor, buf)?;
        if remaining_len < 3 {
            return Err(Error::MalformedPacket);
        }
        let packet_id = read_u16(&mut cursor, buf)?;
        let code = read_u8(&mut cursor, buf)?;
        let granted_qos = if code == SUBACK_FAILURE {
            None
        } else {
            Some(QoS::try_from(code)?)
        };
        Ok(Self {
            packet_id,
            granted_qos,
        })
    }
}

/// An UNSUBSCRIBE request for a single topic filter.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unsubscribe<'a> {
    /// Exchange identifier.
    pub packet_id: u16,
    /// Topic filter previously subscribed.
    pub filter: &'a str,
}

impl Unsubscribe<'_> {
    /// Encode into `buf`, returning the framed length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = CONTENT_OFFSET;
        write_u16(buf, &mut cursor, self.packet_id)?;
        write_utf8_string(buf, &mut cursor, self.filter)?;
        // UNSUBSCRIBE carries the reserved flag bits 0b0010.
        seal(buf, (PacketType::Unsubscribe as u8) << 4 | 0x02, cursor)
    }
}

/// A decoded UNSUBACK response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnsubAck {
    /// Identifier of the UNSUBSCRIBE being answered.
    pub packet_id: u16,
}

impl UnsubAck {
    /// Decode from a framed packet.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        if PacketType::from_header(header) != Some(PacketType::UnsubAck) {
            return Err(Error::MalformedPacket);
        }
        let remaining_len = decode_remaining_length(&mut cursor, buf)?;
        if remaining_len < 2 {
            return Err(Error::MalformedPacket);
        }
        let packet_id = read_u16(&mut cursor, buf)?;
        Ok(Self { packet_id })
    }
}
