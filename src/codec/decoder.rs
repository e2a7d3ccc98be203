use super::{
    channel::{self, Channel},
    error::DecodeError,
    header::FixedHeader,
    topic,
    types::{
        Connack, Connect, ConnectReturnCode, Packet, PacketType, ProtocolVersion, Puback, Pubcomp,
        Publish, Pubrec, Pubrel, QoS, Suback, SubackReturnCode, Subscribe, Unsuback, Unsubscribe,
    },
};
use crate::config::TopicLimits;
use bytes::{Buf, Bytes};
use std::time::Duration;
use tracing::{debug, trace};

const CONTINUATION_BIT: u8 = 0b1000_0000;
const VARINT_MAX_BYTES: usize = 4;

// Connect flags
const USERNAME_FLAG: u8 = 0b1000_0000;
const PASSWORD_FLAG: u8 = 0b0100_0000;
const WILL_RETAIN_FLAG: u8 = 0b0010_0000;
const WILL_QOS_MASK: u8 = 0b0001_1000;
const WILL_FLAG: u8 = 0b0000_0100;
const CLEAN_SESSION_FLAG: u8 = 0b0000_0010;
const RESERVED_FLAG: u8 = 0b0000_0001;

const SESSION_PRESENT_FLAG: u8 = 0b0000_0001;

/// Upper bound on a single PUBLISH receive. Payload storage grows with what
/// actually arrives rather than with the declared remaining length.
const RECEIVE_CHUNK: usize = 4096;

/// Reads the remaining length one byte at a time so nothing past it is consumed.
pub fn decode_variable_int<C: Channel + ?Sized>(channel: &mut C) -> Result<usize, DecodeError> {
    let mut multiplier: usize = 1;
    let mut value: usize = 0;

    for _ in 0..VARINT_MAX_BYTES {
        let encoded_byte = channel::receive_byte(channel)?;

        value += ((encoded_byte & !CONTINUATION_BIT) as usize) * multiplier;

        multiplier *= 128;

        if encoded_byte & CONTINUATION_BIT == 0 {
            return Ok(value);
        }
    }

    Err(DecodeError::MalformedVarint)
}

/// Decodes a remaining length at the start of `bytes`, returning the value and
/// the number of bytes it took. `None` means more bytes are needed.
pub fn peek_variable_int(bytes: &[u8]) -> Result<Option<(usize, usize)>, DecodeError> {
    let mut multiplier: usize = 1;
    let mut value: usize = 0;

    for (index, encoded_byte) in bytes.iter().take(VARINT_MAX_BYTES).enumerate() {
        value += ((encoded_byte & !CONTINUATION_BIT) as usize) * multiplier;

        multiplier *= 128;

        if encoded_byte & CONTINUATION_BIT == 0 {
            return Ok(Some((value, index + 1)));
        }
    }

    if bytes.len() >= VARINT_MAX_BYTES {
        return Err(DecodeError::MalformedVarint);
    }

    Ok(None)
}

/// A fully received packet body. Running past its end means the fields
/// disagree with the remaining length.
struct Body {
    packet_type: PacketType,
    bytes: Bytes,
}

impl Body {
    fn receive<C: Channel + ?Sized>(
        packet_type: PacketType,
        remaining_length: usize,
        channel: &mut C,
    ) -> Result<Self, DecodeError> {
        let mut buffer = vec![0u8; remaining_length];
        channel::receive_exact(channel, &mut buffer)?;

        Ok(Body {
            packet_type,
            bytes: Bytes::from(buffer),
        })
    }

    fn require(&self, len: usize) -> Result<(), DecodeError> {
        if self.bytes.remaining() < len {
            return Err(DecodeError::InvalidRemainingLength(self.packet_type));
        }

        Ok(())
    }

    fn has_remaining(&self) -> bool {
        self.bytes.has_remaining()
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.require(1)?;
        Ok(self.bytes.get_u8())
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.require(2)?;
        Ok(self.bytes.get_u16())
    }

    fn read_binary_data(&mut self) -> Result<Bytes, DecodeError> {
        let len = self.read_u16()? as usize;
        self.require(len)?;
        Ok(self.bytes.split_to(len))
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let data = self.read_binary_data()?;
        Ok(String::from_utf8(data.to_vec())?)
    }

    /// Fails when bytes are left over after the last field.
    fn finish(self) -> Result<(), DecodeError> {
        if self.has_remaining() {
            return Err(DecodeError::InvalidRemainingLength(self.packet_type));
        }

        Ok(())
    }
}

fn decode_connect(body: &mut Body) -> Result<Packet, DecodeError> {
    let protocol_name = body.read_string()?;
    let named_version = match ProtocolVersion::from_protocol_name(&protocol_name) {
        Some(version) => version,
        None => return Err(DecodeError::InvalidProtocolName(protocol_name)),
    };

    let protocol_level = body.read_u8()?;
    let protocol_version = ProtocolVersion::try_from(protocol_level)
        .map_err(|_| DecodeError::InvalidProtocolVersion(protocol_level))?;
    if protocol_version != named_version {
        return Err(DecodeError::InvalidProtocolName(protocol_name));
    }

    let connect_flags = body.read_u8()?;
    let strict = protocol_version == ProtocolVersion::V311;

    let clean_session = connect_flags & CLEAN_SESSION_FLAG == CLEAN_SESSION_FLAG;
    let will_flag = connect_flags & WILL_FLAG == WILL_FLAG;
    let will_qos = (connect_flags & WILL_QOS_MASK) >> 3;
    let will_retain = connect_flags & WILL_RETAIN_FLAG == WILL_RETAIN_FLAG;
    let has_password = connect_flags & PASSWORD_FLAG == PASSWORD_FLAG;
    let has_username = connect_flags & USERNAME_FLAG == USERNAME_FLAG;

    if strict {
        let reserved_set = connect_flags & RESERVED_FLAG != 0;
        let password_alone = has_password && !has_username;
        let will_bits_alone = !will_flag && (will_qos != 0 || will_retain);
        if reserved_set || password_alone || will_bits_alone {
            return Err(DecodeError::InvalidConnectFlags(connect_flags));
        }
    }

    if will_flag && will_qos > QoS::ExactlyOnce as u8 {
        return Err(DecodeError::QosNotAllowed(will_qos));
    }

    let keep_alive = Duration::from_secs(body.read_u16()? as u64);

    let client_id = body.read_string()?;
    if strict && client_id.is_empty() && !clean_session {
        return Err(DecodeError::InvalidClientId);
    }

    let (will_topic, will_message) = if will_flag {
        let will_topic = body.read_string()?;
        topic::check_wildcards(&will_topic)?;
        let will_message = body.read_binary_data()?;
        if strict && (will_topic.is_empty() || will_message.is_empty()) {
            return Err(DecodeError::WillInconsistent(
                "will topic and message cannot be empty",
            ));
        }
        (Some(will_topic), Some(will_message))
    } else {
        (None, None)
    };

    let username = if has_username {
        Some(body.read_string()?)
    } else {
        None
    };

    let password = if has_password {
        Some(body.read_binary_data()?)
    } else {
        None
    };

    Ok(Packet::Connect(Connect {
        protocol_version,
        clean_session,
        keep_alive,
        will_flag,
        // 3.1 leaves the will QoS undefined without a will
        will_qos: if will_flag { will_qos } else { 0 },
        will_retain,
        client_id,
        will_topic,
        will_message,
        username,
        password,
    }))
}

fn decode_connect_ack(body: &mut Body, version: ProtocolVersion) -> Result<Packet, DecodeError> {
    let flags = body.read_u8()?;
    let session_present = match version {
        ProtocolVersion::V311 => {
            if flags & !SESSION_PRESENT_FLAG != 0 {
                return Err(DecodeError::InvalidConnectFlags(flags));
            }
            flags & SESSION_PRESENT_FLAG == SESSION_PRESENT_FLAG
        }
        // topic name compression response, unused
        ProtocolVersion::V31 => false,
    };

    let code_byte = body.read_u8()?;
    let code = ConnectReturnCode::try_from(code_byte)
        .map_err(|_| DecodeError::InvalidConnectReturnCode(code_byte))?;

    Ok(Packet::Connack(Connack {
        session_present,
        code,
    }))
}

/// Copies what was already received past the variable header, then keeps
/// receiving through `buffer` until the payload is complete.
fn reassemble_payload<C: Channel + ?Sized>(
    channel: &mut C,
    buffer: &mut [u8],
    filled: usize,
    header_len: usize,
    remaining_length: usize,
) -> Result<Bytes, DecodeError> {
    let expected = remaining_length - header_len;
    let mut payload = Vec::with_capacity(expected.min(RECEIVE_CHUNK));
    payload.extend_from_slice(&buffer[header_len..filled]);

    while payload.len() < expected {
        let bytes_remaining = (expected - payload.len()).min(buffer.len());
        let received = channel::receive_some(channel, &mut buffer[..bytes_remaining])?;
        if received == 0 {
            return Err(DecodeError::TruncatedRead {
                expected: remaining_length,
                received: header_len + payload.len(),
            });
        }

        payload.extend_from_slice(&buffer[..received]);
        let write_offset = payload.len();

        debug!(received, write_offset, expected, "publish payload read");
    }

    Ok(Bytes::from(payload))
}

fn decode_publish<C: Channel + ?Sized>(
    header: &FixedHeader,
    remaining_length: usize,
    channel: &mut C,
) -> Result<Packet, DecodeError> {
    let qos = header.qos()?;
    let message_id_len = match qos {
        QoS::AtMostOnce => 0,
        QoS::AtLeastOnce | QoS::ExactlyOnce => 2,
    };

    if remaining_length < 2 + message_id_len {
        return Err(DecodeError::InvalidRemainingLength(PacketType::Publish));
    }

    let mut buffer = vec![0u8; remaining_length.min(RECEIVE_CHUNK)];
    let mut filled = channel::fill_at_least(channel, &mut buffer, 0, 2)?;

    // Variable header start
    let topic_len = u16::from_be_bytes([buffer[0], buffer[1]]) as usize;
    let header_len = 2 + topic_len + message_id_len;
    if header_len > remaining_length {
        return Err(DecodeError::InvalidRemainingLength(PacketType::Publish));
    }
    if header_len > buffer.len() {
        buffer.resize(header_len, 0);
    }
    filled = channel::fill_at_least(channel, &mut buffer, filled, header_len)?;

    let topic = String::from_utf8(buffer[2..2 + topic_len].to_vec())?;
    topic::check_wildcards(&topic)?;

    let message_id = match qos {
        QoS::AtMostOnce => 0,
        QoS::AtLeastOnce | QoS::ExactlyOnce => {
            u16::from_be_bytes([buffer[2 + topic_len], buffer[3 + topic_len]])
        }
    };
    // Variable header end

    let payload = reassemble_payload(channel, &mut buffer, filled, header_len, remaining_length)?;

    Ok(Packet::Publish(Publish {
        dup: header.dup(),
        qos,
        retain: header.retain(),
        topic,
        message_id,
        payload,
    }))
}

fn decode_publish_release(
    header: &FixedHeader,
    version: ProtocolVersion,
    body: &mut Body,
) -> Result<Packet, DecodeError> {
    let (dup, qos) = header.legacy_flags(version)?;
    let message_id = body.read_u16()?;

    Ok(Packet::Pubrel(Pubrel {
        dup,
        qos,
        message_id,
    }))
}

fn decode_subscribe(
    header: &FixedHeader,
    version: ProtocolVersion,
    body: &mut Body,
    remaining_length: usize,
) -> Result<Packet, DecodeError> {
    let (dup, qos) = header.legacy_flags(version)?;
    let message_id = body.read_u16()?;
    let limits = TopicLimits::default();

    let mut topics = vec![];
    let mut qos_levels = vec![];
    let mut consumed: usize = 2;

    // No count prefix, entries run until the remaining length is used up
    while consumed < remaining_length {
        let topic_filter = body.read_string()?;
        topic::validate_topic_filter(&topic_filter, &limits)?;

        let qos_byte = body.read_u8()?;
        let requested_qos =
            QoS::try_from(qos_byte).map_err(|_| DecodeError::QosNotAllowed(qos_byte))?;

        consumed += 2 + topic_filter.len() + 1;
        topics.push(topic_filter);
        qos_levels.push(requested_qos);
    }

    if topics.is_empty() {
        return Err(DecodeError::TopicsEmpty(PacketType::Subscribe));
    }

    Ok(Packet::Subscribe(Subscribe {
        dup,
        qos,
        message_id,
        topics,
        qos_levels,
    }))
}

fn decode_subscribe_ack(body: &mut Body) -> Result<Packet, DecodeError> {
    let message_id = body.read_u16()?;

    let mut return_codes = vec![];
    while body.has_remaining() {
        let next_byte = body.read_u8()?;
        let return_code = SubackReturnCode::try_from(next_byte)
            .map_err(|_| DecodeError::InvalidSubackReturnCode(next_byte))?;
        return_codes.push(return_code);
    }

    Ok(Packet::Suback(Suback {
        message_id,
        return_codes,
    }))
}

fn decode_unsubscribe(
    header: &FixedHeader,
    version: ProtocolVersion,
    body: &mut Body,
    remaining_length: usize,
) -> Result<Packet, DecodeError> {
    let (dup, qos) = header.legacy_flags(version)?;
    let message_id = body.read_u16()?;
    let limits = TopicLimits::default();

    let mut topics = vec![];
    let mut consumed: usize = 2;

    while consumed < remaining_length {
        let topic_filter = body.read_string()?;
        topic::validate_topic_filter(&topic_filter, &limits)?;

        consumed += 2 + topic_filter.len();
        topics.push(topic_filter);
    }

    if topics.is_empty() {
        return Err(DecodeError::TopicsEmpty(PacketType::Unsubscribe));
    }

    Ok(Packet::Unsubscribe(Unsubscribe {
        dup,
        qos,
        message_id,
        topics,
    }))
}

/// Body length of packets that carry nothing but fixed-width fields.
fn fixed_body_len(packet_type: PacketType) -> Option<usize> {
    match packet_type {
        PacketType::ConnectAck
        | PacketType::PublishAck
        | PacketType::PublishReceived
        | PacketType::PublishRelease
        | PacketType::PublishComplete
        | PacketType::UnsubscribeAck => Some(2),
        _ => None,
    }
}

fn decode_body(
    header: &FixedHeader,
    version: ProtocolVersion,
    mut body: Body,
    remaining_length: usize,
) -> Result<Packet, DecodeError> {
    let packet = match header.packet_type {
        PacketType::Connect => decode_connect(&mut body)?,
        PacketType::ConnectAck => decode_connect_ack(&mut body, version)?,
        PacketType::PublishAck => Packet::Puback(Puback {
            message_id: body.read_u16()?,
        }),
        PacketType::PublishReceived => Packet::Pubrec(Pubrec {
            message_id: body.read_u16()?,
        }),
        PacketType::PublishRelease => decode_publish_release(header, version, &mut body)?,
        PacketType::PublishComplete => Packet::Pubcomp(Pubcomp {
            message_id: body.read_u16()?,
        }),
        PacketType::Subscribe => decode_subscribe(header, version, &mut body, remaining_length)?,
        PacketType::SubscribeAck => decode_subscribe_ack(&mut body)?,
        PacketType::Unsubscribe => {
            decode_unsubscribe(header, version, &mut body, remaining_length)?
        }
        PacketType::UnsubscribeAck => Packet::Unsuback(Unsuback {
            message_id: body.read_u16()?,
        }),
        PacketType::Publish
        | PacketType::PingRequest
        | PacketType::PingResponse
        | PacketType::Disconnect => {
            return Err(DecodeError::InvalidPacketType(header.packet_type as u8))
        }
    };

    body.finish()?;

    Ok(packet)
}

/// Decodes one packet whose first byte the caller has already received.
/// Reads stop exactly at the end of the packet.
pub fn decode<C: Channel + ?Sized>(
    first_byte: u8,
    version: ProtocolVersion,
    channel: &mut C,
) -> Result<Packet, DecodeError> {
    let header = FixedHeader::parse(first_byte)?;
    header.check_flags(version)?;

    let remaining_length = decode_variable_int(channel)?;

    if let Some(len) = fixed_body_len(header.packet_type) {
        if remaining_length != len {
            return Err(DecodeError::InvalidRemainingLength(header.packet_type));
        }
    }

    let packet = match header.packet_type {
        PacketType::Publish => decode_publish(&header, remaining_length, channel)?,
        // Bodies of these are consumed but never inspected
        PacketType::PingRequest => {
            channel::discard(channel, remaining_length)?;
            Packet::Pingreq
        }
        PacketType::PingResponse => {
            channel::discard(channel, remaining_length)?;
            Packet::Pingresp
        }
        PacketType::Disconnect => {
            channel::discard(channel, remaining_length)?;
            Packet::Disconnect
        }
        packet_type => {
            let body = Body::receive(packet_type, remaining_length, channel)?;
            decode_body(&header, version, body, remaining_length)?
        }
    };

    trace!(packet_type = ?header.packet_type, remaining_length, ?version, "decoded packet");

    Ok(packet)
}

/// Receives the next packet. `None` when the channel closes cleanly between
/// packets.
pub fn read_packet<C: Channel + ?Sized>(
    version: ProtocolVersion,
    channel: &mut C,
) -> Result<Option<Packet>, DecodeError> {
    let mut first_byte = [0u8; 1];
    if channel::receive_some(channel, &mut first_byte)? == 0 {
        return Ok(None);
    }

    decode(first_byte[0], version, channel).map(Some)
}
