//! Application message packets: PUBLISH and the QoS acknowledgement family.

use super::{
    CONTENT_OFFSET, PacketType, QoS, decode_remaining_length, read_u8, read_u16, read_utf8_string,
    seal, write_bytes, write_u16, write_utf8_string,
};
use crate::error::Error;

/// A PUBLISH packet, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Publish<'a> {
    /// Concrete topic name the message is published under.
    pub topic: &'a str,
    /// Opaque application payload.
    pub payload: &'a [u8],
    /// Delivery guarantee level.
    pub qos: QoS,
    /// Broker-retained message flag.
    pub retained: bool,
    /// Redelivery flag.
    pub duplicate: bool,
    /// Exchange identifier; zero for (and only for) QoS 0.
    pub packet_id: u16,
}

impl<'a> Publish<'a> {
    /// Encode into `buf`, returning the framed length.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = CONTENT_OFFSET;
        write_utf8_string(buf, &mut cursor, self.topic)?;
        if self.qos != QoS::AtMostOnce {
            write_u16(buf, &mut cursor, self.packet_id)?;
        }
        write_bytes(buf, &mut cursor, self.payload)?;

        let mut first_byte = (PacketType::Publish as u8) << 4 | (self.qos as u8) << 1;
        if self.duplicate {
            first_byte |= 0x08;
        }
        if self.retained {
            first_byte |= 0x01;
        }
        seal(buf, first_byte, cursor)
    }

    /// Decode from a framed packet.
    pub fn decode(buf: &'a [u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        if PacketType::from_header(header) != Some(PacketType::Publish) {
            return Err(Error::MalformedPacket);
        }
        let qos = QoS::try_from((header >> 1) & 0x03)?;
        let remaining_len = decode_remaining_length(&mut cursor, buf)?;
        let packet_end = cursor
            .checked_add(remaining_len)
            .filter(|end| *end <= buf.len())
            .ok_or(Error::MalformedPacket)?;

        let topic = read_utf8_string(&mut cursor, buf)?;
        let packet_id = if qos != QoS::AtMostOnce {
            read_u16(&mut cursor, buf)?
        } else {
            0
        };
        if cursor > packet_end {
            return Err(Error::MalformedPacket);
        }
        Ok(Self {
            topic,
            payload: &buf[cursor..packet_end],
            qos,
            retained: header & 0x01 != 0,
            duplicate: header & 0x08 != 0,
            packet_id,
        })
    }
}

/// A QoS acknowledgement packet: PUBACK, PUBREC, PUBREL, or PUBCOMP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ack {
    /// Which acknowledgement this is.
    pub packet_type: PacketType,
    /// Identifier of the exchange being acknowledged.
    pub packet_id: u16,
}

impl Ack {
    /// Build an acknowledgement of the given type.
    pub fn new(packet_type: PacketType, packet_id: u16) -> Self {
        Self {
            packet_type,
            packet_id,
        }
    }

    /// Encode into `buf`, returning the framed length (always four bytes).
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.len() < 4 {
            return Err(Error::BufferTooSmall);
        }
        let mut first_byte = (self.packet_type as u8) << 4;
        // PUBREL carries the reserved flag bits 0b0010.
        if self.packet_type == PacketType::PubRel {
            first_byte |= 0x02;
        }
        buf[0] = first_byte;
        buf[1] = 2;
        buf[2..4].copy_from_slice(&self.packet_id.to_be_bytes());
        Ok(4)
    }

    /// Decode from a framed packet.
    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        let mut cursor = 0;
        let header = read_u8(&mut cursor, buf)?;
        let packet_type = match PacketType::from_header(header) {
            Some(
                t @ (PacketType::PubAck
                | PacketType::PubRec
                | PacketType::PubRel
                | PacketType::PubComp),
            ) => t,
            _ => return Err(Error::MalformedPacket),
        };
        let remaining_len = decode_remaining_length(&mut cursor, buf)?;
        if remaining_len < 2 {
            return Err(Error::MalformedPacket);
        }
        let packet_id = read_u16(&mut cursor, buf)?;
        Ok(Self {
            packet_type,
            packet_id,
        })
    }
}
