use super::{
    error::EncodeError,
    header, topic,
    types::{
        Connack, Connect, Packet, PacketType, ProtocolVersion, Publish, QoS, Suback, Subscribe,
        Unsubscribe, VariableByteInt, MAX_REMAINING_LENGTH,
    },
};
use crate::config::TopicLimits;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

const MAX_STRING_LEN: usize = u16::MAX as usize;
const MAX_KEEP_ALIVE: u64 = u16::MAX as u64;
// 3.1 only; 3.1.1 lifted the limit
const CLIENT_ID_MAX_LENGTH_V31: usize = 23;

// Connect flags
const USERNAME_FLAG: u8 = 0b1000_0000;
const PASSWORD_FLAG: u8 = 0b0100_0000;
const WILL_RETAIN_FLAG: u8 = 0b0010_0000;
const WILL_QOS_SHIFT: u8 = 3;
const WILL_FLAG: u8 = 0b0000_0100;
const CLEAN_SESSION_FLAG: u8 = 0b0000_0010;

const SESSION_PRESENT_FLAG: u8 = 0b0000_0001;

/// Writes `value` as a remaining length varint and returns the byte count.
pub fn encode_variable_int(value: usize, bytes: &mut BytesMut) -> Result<usize, EncodeError> {
    if value > MAX_REMAINING_LENGTH {
        return Err(EncodeError::PacketTooLarge(value));
    }

    let mut x = value;
    let mut byte_counter = 0;

    loop {
        let mut encoded_byte: u8 = (x % 128) as u8;
        x /= 128;

        if x > 0 {
            encoded_byte |= 128;
        }

        bytes.put_u8(encoded_byte);

        byte_counter += 1;

        if x == 0 {
            break;
        }
    }

    Ok(byte_counter)
}

fn encode_string(value: &str, bytes: &mut BytesMut) {
    bytes.put_u16(value.len() as u16);
    bytes.put_slice(value.as_bytes());
}

fn encode_binary_data(value: &[u8], bytes: &mut BytesMut) {
    bytes.put_u16(value.len() as u16);
    bytes.put_slice(value);
}

fn check_field_len(field: &'static str, len: usize) -> Result<(), EncodeError> {
    if len > MAX_STRING_LEN {
        return Err(EncodeError::FieldTooLong { field, len });
    }

    Ok(())
}

fn check_message_id(packet_type: PacketType, message_id: u16) -> Result<(), EncodeError> {
    if message_id == 0 {
        return Err(EncodeError::MessageIdMissing(packet_type));
    }

    Ok(())
}

fn validate_will(packet: &Connect) -> Result<(), EncodeError> {
    if packet.will_qos > QoS::ExactlyOnce as u8 {
        return Err(EncodeError::WillInconsistent("will QoS must be 0, 1 or 2"));
    }

    let will_topic_len = packet.will_topic.as_ref().map(String::len);
    let will_message_len = packet.will_message.as_ref().map(Bytes::len);

    if packet.will_flag {
        if will_topic_len.is_none() || will_message_len.is_none() {
            return Err(EncodeError::WillInconsistent(
                "will flag requires a will topic and message",
            ));
        }

        if packet.protocol_version == ProtocolVersion::V311
            && (will_topic_len == Some(0) || will_message_len == Some(0))
        {
            return Err(EncodeError::WillInconsistent(
                "will topic and message cannot be empty",
            ));
        }
    } else if packet.protocol_version == ProtocolVersion::V311 {
        // Will QoS only goes on the wire together with the will flag
        if packet.will_qos != 0 {
            return Err(EncodeError::WillInconsistent(
                "will QoS requires the will flag",
            ));
        }

        if packet.will_retain {
            return Err(EncodeError::WillInconsistent(
                "will retain requires the will flag",
            ));
        }

        if will_topic_len.is_some() || will_message_len.is_some() {
            return Err(EncodeError::WillInconsistent(
                "will topic and message require the will flag",
            ));
        }
    }

    Ok(())
}

fn validate_connect(packet: &Connect) -> Result<(), EncodeError> {
    validate_will(packet)?;

    let keep_alive = packet.keep_alive.as_secs();
    if keep_alive > MAX_KEEP_ALIVE {
        return Err(EncodeError::KeepAliveOutOfRange(keep_alive));
    }

    match packet.protocol_version {
        ProtocolVersion::V311 => {
            if packet.client_id.is_empty() && !packet.clean_session {
                return Err(EncodeError::InvalidClientId(
                    "empty client id requires clean session",
                ));
            }

            if packet.password.is_some() && packet.username.is_none() {
                return Err(EncodeError::PasswordWithoutUsername);
            }
        }
        ProtocolVersion::V31 => {
            if packet.client_id.is_empty() || packet.client_id.len() > CLIENT_ID_MAX_LENGTH_V31 {
                return Err(EncodeError::InvalidClientId(
                    "3.1 client id must be 1 to 23 bytes",
                ));
            }
        }
    }

    check_field_len("client id", packet.client_id.len())?;
    if packet.will_flag {
        check_field_len("will topic", packet.will_topic.as_ref().map_or(0, String::len))?;
        check_field_len("will message", packet.will_message.as_ref().map_or(0, Bytes::len))?;
    }
    check_field_len("username", packet.username.as_ref().map_or(0, String::len))?;
    check_field_len("password", packet.password.as_ref().map_or(0, Bytes::len))?;

    Ok(())
}

fn validate_publish(packet: &Publish, limits: &TopicLimits) -> Result<(), EncodeError> {
    topic::validate_topic_name(&packet.topic, limits)?;
    check_field_len("topic", packet.topic.len())?;

    // The session layer assigns ids before handing the packet over
    if packet.qos != QoS::AtMostOnce {
        check_message_id(PacketType::Publish, packet.message_id)?;
    }

    Ok(())
}

fn validate_subscribe(packet: &Subscribe, limits: &TopicLimits) -> Result<(), EncodeError> {
    if packet.topics.is_empty() {
        return Err(EncodeError::TopicsEmpty);
    }

    if packet.qos_levels.is_empty() {
        return Err(EncodeError::QosLevelsEmpty);
    }

    if packet.topics.len() != packet.qos_levels.len() {
        return Err(EncodeError::TopicCountMismatch {
            topics: packet.topics.len(),
            qos_levels: packet.qos_levels.len(),
        });
    }

    for filter in &packet.topics {
        topic::validate_topic_filter(filter, limits)?;
        check_field_len("topic", filter.len())?;
    }

    check_message_id(PacketType::Subscribe, packet.message_id)
}

fn validate_unsubscribe(packet: &Unsubscribe, limits: &TopicLimits) -> Result<(), EncodeError> {
    if packet.topics.is_empty() {
        return Err(EncodeError::TopicsEmpty);
    }

    for filter in &packet.topics {
        topic::validate_topic_filter(filter, limits)?;
        check_field_len("topic", filter.len())?;
    }

    check_message_id(PacketType::Unsubscribe, packet.message_id)
}

/// Every rule is checked before a single byte is written.
fn validate(packet: &Packet, limits: &TopicLimits) -> Result<(), EncodeError> {
    match packet {
        Packet::Connect(p) => validate_connect(p),
        Packet::Publish(p) => validate_publish(p, limits),
        Packet::Subscribe(p) => validate_subscribe(p, limits),
        Packet::Unsubscribe(p) => validate_unsubscribe(p, limits),
        Packet::Puback(_)
        | Packet::Pubrec(_)
        | Packet::Pubrel(_)
        | Packet::Pubcomp(_)
        | Packet::Suback(_)
        | Packet::Unsuback(_) => check_message_id(packet.packet_type(), packet.message_id()),
        Packet::Connack(_) | Packet::Pingreq | Packet::Pingresp | Packet::Disconnect => Ok(()),
    }
}

fn encode_connect(packet: &Connect, bytes: &mut BytesMut) {
    let protocol = packet.protocol_version;
    encode_string(protocol.protocol_name(), bytes);
    bytes.put_u8(protocol as u8);

    let mut connect_flags: u8 = 0b0000_0000;

    if packet.username.is_some() {
        connect_flags |= USERNAME_FLAG;
    }

    if packet.password.is_some() {
        connect_flags |= PASSWORD_FLAG;
    }

    if packet.will_retain {
        connect_flags |= WILL_RETAIN_FLAG;
    }

    // Will QoS must stay 0 without a will
    if packet.will_flag {
        connect_flags |= packet.will_qos << WILL_QOS_SHIFT;
        connect_flags |= WILL_FLAG;
    }

    if packet.clean_session {
        connect_flags |= CLEAN_SESSION_FLAG;
    }

    bytes.put_u8(connect_flags);
    bytes.put_u16(packet.keep_alive.as_secs() as u16);

    encode_string(&packet.client_id, bytes);

    if packet.will_flag {
        if let (Some(topic), Some(message)) = (&packet.will_topic, &packet.will_message) {
            encode_string(topic, bytes);
            encode_binary_data(message, bytes);
        }
    }

    if let Some(username) = &packet.username {
        encode_string(username, bytes);
    }

    if let Some(password) = &packet.password {
        encode_binary_data(password, bytes);
    }
}

fn encode_connect_ack(packet: &Connack, version: ProtocolVersion, bytes: &mut BytesMut) {
    // 3.1 used this byte for the topic name compression response, always zero
    let mut connect_ack_flags: u8 = 0b0000_0000;
    if version == ProtocolVersion::V311 && packet.session_present {
        connect_ack_flags |= SESSION_PRESENT_FLAG;
    }

    bytes.put_u8(connect_ack_flags);
    bytes.put_u8(packet.code as u8);
}

fn encode_publish(packet: &Publish, bytes: &mut BytesMut) {
    encode_string(&packet.topic, bytes);

    if packet.qos != QoS::AtMostOnce {
        bytes.put_u16(packet.message_id);
    }

    bytes.put_slice(&packet.payload);
}

fn encode_subscribe(packet: &Subscribe, bytes: &mut BytesMut) {
    bytes.put_u16(packet.message_id);

    for (topic, qos) in packet.topics.iter().zip(&packet.qos_levels) {
        encode_string(topic, bytes);
        bytes.put_u8(*qos as u8);
    }
}

fn encode_subscribe_ack(packet: &Suback, bytes: &mut BytesMut) {
    bytes.put_u16(packet.message_id);

    for code in &packet.return_codes {
        bytes.put_u8((*code) as u8);
    }
}

fn encode_unsubscribe(packet: &Unsubscribe, bytes: &mut BytesMut) {
    bytes.put_u16(packet.message_id);

    for topic_filter in &packet.topics {
        encode_string(topic_filter, bytes);
    }
}

/// Validates `packet` and appends its wire form to `bytes`. On error nothing
/// is appended.
pub fn encode_packet(
    packet: &Packet,
    version: ProtocolVersion,
    limits: &TopicLimits,
    bytes: &mut BytesMut,
) -> Result<(), EncodeError> {
    validate(packet, limits)?;

    let remaining_length = packet.calculate_size();
    let length_size = VariableByteInt(remaining_length)
        .calculate_size()
        .ok_or(EncodeError::PacketTooLarge(remaining_length))?;
    bytes.reserve(1 + length_size + remaining_length);

    bytes.put_u8(header::first_byte(packet, version));
    encode_variable_int(remaining_length, bytes)?;

    match packet {
        Packet::Connect(p) => encode_connect(p, bytes),
        Packet::Connack(p) => encode_connect_ack(p, version, bytes),
        Packet::Publish(p) => encode_publish(p, bytes),
        Packet::Puback(_)
        | Packet::Pubrec(_)
        | Packet::Pubrel(_)
        | Packet::Pubcomp(_)
        | Packet::Unsuback(_) => bytes.put_u16(packet.message_id()),
        Packet::Subscribe(p) => encode_subscribe(p, bytes),
        Packet::Suback(p) => encode_subscribe_ack(p, bytes),
        Packet::Unsubscribe(p) => encode_unsubscribe(p, bytes),
        Packet::Pingreq => (),
        Packet::Pingresp => (),
        Packet::Disconnect => (),
    }

    trace!(packet_type = ?packet.packet_type(), remaining_length, ?version, "encoded packet");

    Ok(())
}

/// Encodes with the default topic limits.
pub fn encode(packet: &Packet, version: ProtocolVersion) -> Result<Bytes, EncodeError> {
    let mut bytes = BytesMut::new();
    encode_packet(packet, version, &TopicLimits::default(), &mut bytes)?;
    Ok(bytes.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{topic::TopicError, ConnectReturnCode, Pubrel};
    use std::time::Duration;

    fn encode_v4(packet: Packet) -> Result<Bytes, EncodeError> {
        encode(&packet, ProtocolVersion::V311)
    }

    #[test]
    fn test_encode_variable_int() {
        fn normal_test(value: usize, expected: &[u8]) {
            let mut bytes = BytesMut::new();
            let written = encode_variable_int(value, &mut bytes).unwrap();
            assert_eq!(written, expected.len());
            assert_eq!(&bytes[..], expected);
        }

        // Digits 1
        normal_test(0, &[0x00]);
        normal_test(127, &[0x7F]);

        // Digits 2
        normal_test(128, &[0x80, 0x01]);
        normal_test(16_383, &[0xFF, 0x7F]);

        // Digits 3
        normal_test(16_384, &[0x80, 0x80, 0x01]);
        normal_test(2_097_151, &[0xFF, 0xFF, 0x7F]);

        // Digits 4
        normal_test(2_097_152, &[0x80, 0x80, 0x80, 0x01]);
        normal_test(268_435_455, &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_encode_variable_int_too_large() {
        let mut bytes = BytesMut::new();
        assert!(matches!(
            encode_variable_int(268_435_456, &mut bytes),
            Err(EncodeError::PacketTooLarge(268_435_456))
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_connect_bytes() {
        let mut connect = Connect::new("imvj");
        connect.keep_alive = Duration::from_secs(120);
        let bytes = encode_v4(Packet::Connect(connect)).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0x10, 16, // fixed header
                0x00, 0x04, b'M', b'Q', b'T', b'T', // protocol name
                0x04, // level
                0x02, // clean session
                0x00, 120, // keep-alive
                0x00, 0x04, b'i', b'm', b'v', b'j',
            ]
        );
    }

    #[test]
    fn test_connect_v31_bytes() {
        let mut connect = Connect::new("c")
            .with_will("w", &b"bye"[..], QoS::AtLeastOnce, true)
            .with_credentials("u", Some("p".into()));
        connect.protocol_version = ProtocolVersion::V31;
        connect.clean_session = false;
        let bytes = encode(&Packet::Connect(connect), ProtocolVersion::V31).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0x10, 29, // fixed header
                0x00, 0x06, b'M', b'Q', b'I', b's', b'd', b'p', // protocol name
                0x03, // level
                0b1110_1100, // username, password, will retain, will QoS 1, will
                0x00, 60, // keep-alive
                0x00, 0x01, b'c', // client id
                0x00, 0x01, b'w', // will topic
                0x00, 0x03, b'b', b'y', b'e', // will message
                0x00, 0x01, b'u', // username
                0x00, 0x01, b'p', // password
            ]
        );
    }

    #[test]
    fn test_connect_will_invariants() {
        // will retain without will flag
        let mut connect = Connect::new("client");
        connect.will_retain = true;
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::WillInconsistent(_))
        ));

        // will flag with empty topic
        let connect =
            Connect::new("client").with_will("", &b"gone"[..], QoS::AtMostOnce, false);
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::WillInconsistent(_))
        ));

        // will flag without message
        let mut connect =
            Connect::new("client").with_will("w", &b"gone"[..], QoS::AtMostOnce, false);
        connect.will_message = None;
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::WillInconsistent(_))
        ));

        // will QoS 3
        let mut connect =
            Connect::new("client").with_will("w", &b"gone"[..], QoS::AtMostOnce, false);
        connect.will_qos = 3;
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::WillInconsistent(_))
        ));

        // will topic without will flag
        let mut connect = Connect::new("client");
        connect.will_topic = Some("w".into());
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::WillInconsistent(_))
        ));
    }

    #[test]
    fn test_connect_will_qos_requires_will_flag() {
        let mut connect = Connect::new("c");
        connect.will_qos = QoS::ExactlyOnce as u8;
        assert!(matches!(
            encode_v4(Packet::Connect(connect.clone())),
            Err(EncodeError::WillInconsistent("will QoS requires the will flag"))
        ));

        // 3.1 has no such rule and the bits are left off the wire
        connect.protocol_version = ProtocolVersion::V31;
        let bytes = encode(&Packet::Connect(connect), ProtocolVersion::V31).unwrap();
        assert_eq!(bytes[11], CLEAN_SESSION_FLAG);
    }

    #[test]
    fn test_connect_keep_alive_ceiling() {
        let mut connect = Connect::new("client");
        connect.keep_alive = Duration::from_secs(65_535);
        assert!(encode_v4(Packet::Connect(connect.clone())).is_ok());

        connect.keep_alive = Duration::from_secs(65_536);
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::KeepAliveOutOfRange(65_536))
        ));
    }

    #[test]
    fn test_connect_client_id_rules() {
        let mut connect = Connect::new("");
        assert!(encode_v4(Packet::Connect(connect.clone())).is_ok());

        connect.clean_session = false;
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::InvalidClientId(_))
        ));

        let mut connect = Connect::new("a".repeat(24));
        assert!(encode_v4(Packet::Connect(connect.clone())).is_ok());
        connect.protocol_version = ProtocolVersion::V31;
        assert!(matches!(
            encode(&Packet::Connect(connect), ProtocolVersion::V31),
            Err(EncodeError::InvalidClientId(_))
        ));
    }

    #[test]
    fn test_connect_password_without_username() {
        let mut connect = Connect::new("client");
        connect.password = Some("secret".into());
        assert!(matches!(
            encode_v4(Packet::Connect(connect)),
            Err(EncodeError::PasswordWithoutUsername)
        ));
    }

    #[test]
    fn test_connack_bytes() {
        let connack = Packet::Connack(Connack {
            session_present: true,
            code: ConnectReturnCode::NotAuthorized,
        });
        assert_eq!(
            &encode(&connack, ProtocolVersion::V311).unwrap()[..],
            &[0x20, 0x02, 0x01, 0x05]
        );
        // no session present flag before 3.1.1
        assert_eq!(
            &encode(&connack, ProtocolVersion::V31).unwrap()[..],
            &[0x20, 0x02, 0x00, 0x05]
        );
    }

    #[test]
    fn test_publish_bytes() {
        let mut publish = Publish::new("asdf", &b"hello"[..]);
        publish.qos = QoS::ExactlyOnce;
        publish.retain = true;
        publish.message_id = 10;
        let bytes = encode_v4(Packet::Publish(publish)).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0x35, 13, 0x00, 0x04, b'a', b's', b'd', b'f', 0x00, 0x0A, b'h', b'e', b'l',
                b'l', b'o'
            ]
        );

        // no message id at QoS 0, zero-length payload allowed
        let bytes = encode_v4(Packet::Publish(Publish::new("a", Bytes::new()))).unwrap();
        assert_eq!(&bytes[..], &[0x30, 3, 0x00, 0x01, b'a']);
    }

    #[test]
    fn test_publish_rejects_wildcards() {
        let result = encode_v4(Packet::Publish(Publish::new("a/#", &b"x"[..])));
        assert!(matches!(
            result,
            Err(EncodeError::Topic(TopicError::WildcardNotPermitted(_)))
        ));
    }

    #[test]
    fn test_publish_requires_message_id() {
        let mut publish = Publish::new("sensors/temp", &b"21.5"[..]);
        publish.qos = QoS::AtLeastOnce;
        assert!(matches!(
            encode_v4(Packet::Publish(publish)),
            Err(EncodeError::MessageIdMissing(PacketType::Publish))
        ));
    }

    #[test]
    fn test_publish_topic_limits() {
        let limits = TopicLimits { min: 2, max: 8 };
        let mut bytes = BytesMut::new();

        let publish = Packet::Publish(Publish::new("a", &b"x"[..]));
        assert!(matches!(
            encode_packet(&publish, ProtocolVersion::V311, &limits, &mut bytes),
            Err(EncodeError::Topic(TopicError::LengthOutOfRange { len: 1, .. }))
        ));

        let publish = Packet::Publish(Publish::new("123456789", &b"x"[..]));
        assert!(matches!(
            encode_packet(&publish, ProtocolVersion::V311, &limits, &mut bytes),
            Err(EncodeError::Topic(TopicError::LengthOutOfRange { len: 9, .. }))
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_failed_encode_writes_nothing() {
        let mut bytes = BytesMut::from(&b"keep"[..]);
        let subscribe =
            Packet::Subscribe(Subscribe::new(0, vec!["a".into()], vec![QoS::AtMostOnce]));
        let limits = TopicLimits::default();
        assert!(encode_packet(&subscribe, ProtocolVersion::V311, &limits, &mut bytes).is_err());
        assert_eq!(&bytes[..], b"keep");
    }

    #[test]
    fn test_subscribe_validation() {
        let subscribe = Subscribe::new(1, vec![], vec![]);
        assert!(matches!(
            encode_v4(Packet::Subscribe(subscribe)),
            Err(EncodeError::TopicsEmpty)
        ));

        let subscribe = Subscribe::new(1, vec!["a".into()], vec![]);
        assert!(matches!(
            encode_v4(Packet::Subscribe(subscribe)),
            Err(EncodeError::QosLevelsEmpty)
        ));

        let subscribe = Subscribe::new(
            1,
            vec!["a".into(), "b".into()],
            vec![QoS::AtLeastOnce],
        );
        assert!(matches!(
            encode_v4(Packet::Subscribe(subscribe)),
            Err(EncodeError::TopicCountMismatch {
                topics: 2,
                qos_levels: 1
            })
        ));

        let subscribe = Subscribe::new(0, vec!["a".into()], vec![QoS::AtLeastOnce]);
        assert!(matches!(
            encode_v4(Packet::Subscribe(subscribe)),
            Err(EncodeError::MessageIdMissing(PacketType::Subscribe))
        ));
    }

    #[test]
    fn test_subscribe_bytes() {
        let subscribe = Subscribe::new(345, vec!["a/b".into()], vec![QoS::ExactlyOnce]);
        let bytes = encode_v4(Packet::Subscribe(subscribe.clone())).unwrap();
        assert_eq!(
            &bytes[..],
            &[0x82, 8, 0x01, 0x59, 0x00, 0x03, b'a', b'/', b'b', 0x02]
        );

        // 3.1 writes the QoS 1 convention into the fixed header
        let bytes = encode(&Packet::Subscribe(subscribe), ProtocolVersion::V31).unwrap();
        assert_eq!(bytes[0], 0x82);
    }

    #[test]
    fn test_unsubscribe_validation() {
        assert!(matches!(
            encode_v4(Packet::Unsubscribe(Unsubscribe::new(1, vec![]))),
            Err(EncodeError::TopicsEmpty)
        ));
        assert!(matches!(
            encode_v4(Packet::Unsubscribe(Unsubscribe::new(1, vec!["".into()]))),
            Err(EncodeError::Topic(TopicError::LengthOutOfRange { len: 0, .. }))
        ));
        assert!(matches!(
            encode_v4(Packet::Unsubscribe(Unsubscribe::new(0, vec!["a".into()]))),
            Err(EncodeError::MessageIdMissing(PacketType::Unsubscribe))
        ));
    }

    #[test]
    fn test_acks_require_message_id() {
        assert!(matches!(
            encode_v4(Packet::Pubrel(Pubrel::new(0))),
            Err(EncodeError::MessageIdMissing(PacketType::PublishRelease))
        ));
        assert_eq!(
            &encode_v4(Packet::Pubrel(Pubrel::new(19))).unwrap()[..],
            &[0x62, 0x02, 0x00, 19]
        );
    }

    #[test]
    fn test_disconnect_bytes() {
        assert_eq!(&encode_v4(Packet::Disconnect).unwrap()[..], &[0xE0, 0x00]);
        assert_eq!(
            &encode(&Packet::Disconnect, ProtocolVersion::V31).unwrap()[..],
            &[0xE0, 0x00]
        );
    }

    #[test]
    fn test_oversized_field() {
        let mut publish = Publish::new("t", &b""[..]);
        publish.topic = "t".repeat(70_000);
        let limits = TopicLimits {
            min: 1,
            max: usize::MAX,
        };
        let mut bytes = BytesMut::new();
        assert!(matches!(
            encode_packet(&Packet::Publish(publish), ProtocolVersion::V311, &limits, &mut bytes),
            Err(EncodeError::FieldTooLong {
                field: "topic",
                len: 70_000
            })
        ));
    }
}
