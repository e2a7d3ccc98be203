use bytes::Bytes;
use num_enum::TryFromPrimitive;
use std::time::Duration;

/// Largest value the remaining length field can carry (four varint bytes).
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Keep-alive applied by [`Connect::new`].
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum ProtocolVersion {
    /// MQTT 3.1, protocol name "MQIsdp"
    V31 = 0x03,
    /// MQTT 3.1.1, protocol name "MQTT"
    V311 = 0x04,
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::V311
    }
}

impl ProtocolVersion {
    pub fn protocol_name(self) -> &'static str {
        match self {
            ProtocolVersion::V31 => "MQIsdp",
            ProtocolVersion::V311 => "MQTT",
        }
    }

    pub fn from_protocol_name(name: &str) -> Option<Self> {
        match name {
            "MQIsdp" => Some(ProtocolVersion::V31),
            "MQTT" => Some(ProtocolVersion::V311),
            _ => None,
        }
    }

    /// 3.1.1 fixes the flag nibble of every packet type except PUBLISH.
    pub fn enforces_fixed_flags(self) -> bool {
        self == ProtocolVersion::V311
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum PacketType {
    Connect = 1,
    ConnectAck = 2,
    Publish = 3,
    PublishAck = 4,
    PublishReceived = 5,
    PublishRelease = 6,
    PublishComplete = 7,
    Subscribe = 8,
    SubscribeAck = 9,
    Unsubscribe = 10,
    UnsubscribeAck = 11,
    PingRequest = 12,
    PingResponse = 13,
    Disconnect = 14,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
#[allow(clippy::enum_variant_names)]
pub enum QoS {
    AtMostOnce = 0,  // QoS 0
    AtLeastOnce = 1, // QoS 1
    ExactlyOnce = 2, // QoS 2
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum ConnectReturnCode {
    /// Connection accepted
    Accepted = 0x00,
    /// The Server does not support the level of the MQTT protocol requested by the Client
    UnacceptableProtocol = 0x01,
    /// The Client identifier is correct UTF-8 but not allowed by the Server
    IdentifierRejected = 0x02,
    /// The Network Connection has been made but the MQTT service is unavailable
    ServerUnavailable = 0x03,
    /// The data in the user name or password is malformed
    BadUsernameOrPassword = 0x04,
    /// The Client is not authorized to connect
    NotAuthorized = 0x05,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum SubackReturnCode {
    GrantedQoSZero = 0x00,
    GrantedQoSOne = 0x01,
    GrantedQoSTwo = 0x02,
    Failure = 0x80,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableByteInt(pub usize);

impl VariableByteInt {
    /// Number of bytes the value occupies on the wire, `None` above the protocol ceiling.
    pub fn calculate_size(&self) -> Option<usize> {
        match self.0 {
            0..=127 => Some(1),
            128..=16_383 => Some(2),
            16_384..=2_097_151 => Some(3),
            2_097_152..=MAX_REMAINING_LENGTH => Some(4),
            _ => None,
        }
    }
}

pub(crate) trait PacketSize {
    fn calc_size(&self) -> usize;
}

impl PacketSize for String {
    fn calc_size(&self) -> usize {
        2 + self.len()
    }
}

impl PacketSize for Bytes {
    fn calc_size(&self) -> usize {
        2 + self.len()
    }
}

impl PacketSize for Vec<String> {
    fn calc_size(&self) -> usize {
        self.iter().map(|x| x.calc_size()).sum()
    }
}

impl<T: PacketSize> PacketSize for Option<T> {
    fn calc_size(&self) -> usize {
        match self {
            Some(p) => p.calc_size(),
            None => 0,
        }
    }
}

// Control Packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    // Variable header
    pub protocol_version: ProtocolVersion,
    pub clean_session: bool,
    pub keep_alive: Duration,
    pub will_flag: bool,
    pub will_qos: u8,
    pub will_retain: bool,

    // Payload
    pub client_id: String,
    pub will_topic: Option<String>,
    pub will_message: Option<Bytes>,
    pub username: Option<String>,
    /// Binary in 3.1.1, so not required to be UTF-8.
    pub password: Option<Bytes>,
}

impl Connect {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            protocol_version: ProtocolVersion::V311,
            clean_session: true,
            keep_alive: DEFAULT_KEEP_ALIVE,
            will_flag: false,
            will_qos: 0,
            will_retain: false,
            client_id: client_id.into(),
            will_topic: None,
            will_message: None,
            username: None,
            password: None,
        }
    }

    pub fn with_will(
        mut self,
        topic: impl Into<String>,
        message: impl Into<Bytes>,
        qos: QoS,
        retain: bool,
    ) -> Self {
        self.will_flag = true;
        self.will_qos = qos as u8;
        self.will_retain = retain;
        self.will_topic = Some(topic.into());
        self.will_message = Some(message.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<Bytes>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connack {
    /// Only carried on the wire by 3.1.1.
    pub session_present: bool,
    pub code: ConnectReturnCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    // Fixed header
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,

    // Variable header
    pub topic: String,
    /// Zero means unassigned; only sent for QoS 1 and 2.
    pub message_id: u16,

    // Payload
    pub payload: Bytes,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: topic.into(),
            message_id: 0,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puback {
    pub message_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pubrec {
    pub message_id: u16,
}

/// PUBREL travels as a QoS 1 packet. The flags are only free-form under 3.1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pubrel {
    pub dup: bool,
    pub qos: QoS,
    pub message_id: u16,
}

impl Pubrel {
    pub fn new(message_id: u16) -> Self {
        Self {
            dup: false,
            qos: QoS::AtLeastOnce,
            message_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pubcomp {
    pub message_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    // Fixed header (3.1 only)
    pub dup: bool,
    pub qos: QoS,

    // Variable header
    pub message_id: u16,

    // Payload
    pub topics: Vec<String>,
    pub qos_levels: Vec<QoS>,
}

impl Subscribe {
    pub fn new(message_id: u16, topics: Vec<String>, qos_levels: Vec<QoS>) -> Self {
        Self {
            dup: false,
            qos: QoS::AtLeastOnce,
            message_id,
            topics,
            qos_levels,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suback {
    pub message_id: u16,
    pub return_codes: Vec<SubackReturnCode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribe {
    // Fixed header (3.1 only)
    pub dup: bool,
    pub qos: QoS,

    // Variable header
    pub message_id: u16,

    // Payload
    pub topics: Vec<String>,
}

impl Unsubscribe {
    pub fn new(message_id: u16, topics: Vec<String>) -> Self {
        Self {
            dup: false,
            qos: QoS::AtLeastOnce,
            message_id,
            topics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsuback {
    pub message_id: u16,
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(Connect),
    Connack(Connack),
    Publish(Publish),
    Puback(Puback),
    Pubrec(Pubrec),
    Pubrel(Pubrel),
    Pubcomp(Pubcomp),
    Subscribe(Subscribe),
    Suback(Suback),
    Unsubscribe(Unsubscribe),
    Unsuback(Unsuback),
    Pingreq,
    Pingresp,
    Disconnect,
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::Connect(_) => PacketType::Connect,
            Packet::Connack(_) => PacketType::ConnectAck,
            Packet::Publish(_) => PacketType::Publish,
            Packet::Puback(_) => PacketType::PublishAck,
            Packet::Pubrec(_) => PacketType::PublishReceived,
            Packet::Pubrel(_) => PacketType::PublishRelease,
            Packet::Pubcomp(_) => PacketType::PublishComplete,
            Packet::Subscribe(_) => PacketType::Subscribe,
            Packet::Suback(_) => PacketType::SubscribeAck,
            Packet::Unsubscribe(_) => PacketType::Unsubscribe,
            Packet::Unsuback(_) => PacketType::UnsubscribeAck,
            Packet::Pingreq => PacketType::PingRequest,
            Packet::Pingresp => PacketType::PingResponse,
            Packet::Disconnect => PacketType::Disconnect,
        }
    }

    pub fn to_byte(&self) -> u8 {
        self.packet_type() as u8
    }

    pub fn dup(&self) -> bool {
        match self {
            Packet::Publish(p) => p.dup,
            Packet::Pubrel(p) => p.dup,
            Packet::Subscribe(p) => p.dup,
            Packet::Unsubscribe(p) => p.dup,
            _ => false,
        }
    }

    pub fn qos(&self) -> QoS {
        match self {
            Packet::Publish(p) => p.qos,
            Packet::Pubrel(p) => p.qos,
            Packet::Subscribe(p) => p.qos,
            Packet::Unsubscribe(p) => p.qos,
            _ => QoS::AtMostOnce,
        }
    }

    pub fn retain(&self) -> bool {
        match self {
            Packet::Publish(p) => p.retain,
            _ => false,
        }
    }

    /// Zero when the packet kind carries no message id.
    pub fn message_id(&self) -> u16 {
        match self {
            Packet::Publish(p) => p.message_id,
            Packet::Puback(p) => p.message_id,
            Packet::Pubrec(p) => p.message_id,
            Packet::Pubrel(p) => p.message_id,
            Packet::Pubcomp(p) => p.message_id,
            Packet::Subscribe(p) => p.message_id,
            Packet::Suback(p) => p.message_id,
            Packet::Unsubscribe(p) => p.message_id,
            Packet::Unsuback(p) => p.message_id,
            Packet::Connect(_)
            | Packet::Connack(_)
            | Packet::Pingreq
            | Packet::Pingresp
            | Packet::Disconnect => 0,
        }
    }

    pub fn calculate_size(&self) -> usize {
        self.calc_size()
    }
}

impl PacketSize for Packet {
    fn calc_size(&self) -> usize {
        match self {
            Packet::Connect(p) => {
                let mut size = 2 + p.protocol_version.protocol_name().len();

                // Protocol level + connect flags + keep-alive
                size += 1 + 1 + 2;

                size += p.client_id.calc_size();
                if p.will_flag {
                    size += p.will_topic.calc_size();
                    size += p.will_message.calc_size();
                }
                size += p.username.calc_size();
                size += p.password.calc_size();

                size
            }
            Packet::Connack(_p) => {
                // flags + return code
                1 + 1
            }
            Packet::Publish(p) => {
                let mut size = p.topic.calc_size();
                if p.qos != QoS::AtMostOnce {
                    size += 2;
                }

                // This payload does not have a length prefix
                size += p.payload.len();

                size
            }
            Packet::Puback(_) | Packet::Pubrec(_) | Packet::Pubrel(_) | Packet::Pubcomp(_) => {
                // message id
                2
            }
            Packet::Subscribe(p) => {
                // message id
                let mut size = 2;

                // each topic is followed by its requested QoS byte
                size += p.topics.calc_size() + p.topics.len();

                size
            }
            Packet::Suback(p) => 2 + p.return_codes.len(),
            Packet::Unsubscribe(p) => 2 + p.topics.calc_size(),
            Packet::Unsuback(_) => 2,
            Packet::Pingreq => 0,
            Packet::Pingresp => 0,
            Packet::Disconnect => 0,
        }
    }
}
