//! First byte of the fixed header: packet type nibble plus flag nibble.

use super::error::DecodeError;
use super::types::{Packet, PacketType, ProtocolVersion, QoS};

pub const FLAG_BITS_MASK: u8 = 0b0000_1111;
pub const DUP_FLAG: u8 = 0b0000_1000;
pub const QOS_MASK: u8 = 0b0000_0110;
pub const RETAIN_FLAG: u8 = 0b0000_0001;

/// Flag nibble 3.1.1 requires for a packet type, `None` for PUBLISH.
pub fn mandated_flags(packet_type: PacketType) -> Option<u8> {
    match packet_type {
        PacketType::Publish => None,
        PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe => {
            Some(0b0000_0010)
        }
        _ => Some(0b0000_0000),
    }
}

/// Packet types whose DUP and QoS bits were still free-form in 3.1.
pub fn has_legacy_flags(packet_type: PacketType) -> bool {
    matches!(
        packet_type,
        PacketType::PublishRelease | PacketType::Subscribe | PacketType::Unsubscribe
    )
}

fn pack_flags(dup: bool, qos: QoS, retain: bool) -> u8 {
    let mut flags: u8 = 0;

    if dup {
        flags |= DUP_FLAG;
    }

    flags |= QOS_MASK & ((qos as u8) << 1);

    if retain {
        flags |= RETAIN_FLAG;
    }

    flags
}

pub fn first_byte(packet: &Packet, version: ProtocolVersion) -> u8 {
    let packet_type = packet.packet_type();

    let flags = match packet {
        Packet::Publish(p) => pack_flags(p.dup, p.qos, p.retain),
        _ if !version.enforces_fixed_flags() && has_legacy_flags(packet_type) => {
            pack_flags(packet.dup(), packet.qos(), false)
        }
        _ if version.enforces_fixed_flags() => mandated_flags(packet_type).unwrap_or(0),
        _ => 0,
    };

    ((packet_type as u8) << 4) | flags
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
}

impl FixedHeader {
    pub fn parse(first_byte: u8) -> Result<Self, DecodeError> {
        let type_nibble = first_byte >> 4;
        let packet_type = PacketType::try_from(type_nibble)
            .map_err(|_| DecodeError::InvalidPacketType(type_nibble))?;

        Ok(FixedHeader {
            packet_type,
            flags: first_byte & FLAG_BITS_MASK,
        })
    }

    /// Fails with `InvalidFlagBits` when 3.1.1 mandates a different nibble.
    pub fn check_flags(&self, version: ProtocolVersion) -> Result<(), DecodeError> {
        if !version.enforces_fixed_flags() {
            return Ok(());
        }

        match mandated_flags(self.packet_type) {
            Some(expected) if expected != self.flags => Err(DecodeError::InvalidFlagBits {
                packet_type: self.packet_type,
                flags: self.flags,
            }),
            _ => Ok(()),
        }
    }

    pub fn dup(&self) -> bool {
        self.flags & DUP_FLAG == DUP_FLAG
    }

    pub fn qos(&self) -> Result<QoS, DecodeError> {
        let qos_val = (self.flags & QOS_MASK) >> 1;
        QoS::try_from(qos_val).map_err(|_| DecodeError::QosNotAllowed(qos_val))
    }

    pub fn retain(&self) -> bool {
        self.flags & RETAIN_FLAG == RETAIN_FLAG
    }

    /// DUP and QoS of a PUBREL, SUBSCRIBE or UNSUBSCRIBE. Only 3.1 sends them,
    /// 3.1.1 packets report the QoS 1 convention.
    pub fn legacy_flags(&self, version: ProtocolVersion) -> Result<(bool, QoS), DecodeError> {
        if version.enforces_fixed_flags() {
            return Ok((false, QoS::AtLeastOnce));
        }

        Ok((self.dup(), self.qos()?))
    }
}
