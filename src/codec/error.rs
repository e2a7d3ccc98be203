use super::topic::TopicError;
use super::types::PacketType;
use std::{io, string::FromUtf8Error};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("will fields are inconsistent: {0}")]
    WillInconsistent(&'static str),
    #[error("keep-alive of {0} seconds does not fit in 16 bits")]
    KeepAliveOutOfRange(u64),
    #[error("invalid client id: {0}")]
    InvalidClientId(&'static str),
    #[error("password flag set without username flag")]
    PasswordWithoutUsername,
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error("topic list is empty")]
    TopicsEmpty,
    #[error("QoS level list is empty")]
    QosLevelsEmpty,
    #[error("{topics} topics but {qos_levels} QoS levels")]
    TopicCountMismatch { topics: usize, qos_levels: usize },
    #[error("{0:?} requires a nonzero message id")]
    MessageIdMissing(PacketType),
    #[error("{field} is {len} bytes, longer than 65535")]
    FieldTooLong { field: &'static str, len: usize },
    #[error("remaining length {0} exceeds 268435455")]
    PacketTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid packet type {0}")]
    InvalidPacketType(u8),
    #[error("invalid flag bits {flags:#06b} for {packet_type:?}")]
    InvalidFlagBits { packet_type: PacketType, flags: u8 },
    #[error("invalid protocol name {0:?}")]
    InvalidProtocolName(String),
    #[error("invalid protocol version {0}")]
    InvalidProtocolVersion(u8),
    #[error("invalid connect flags {0:#010b}")]
    InvalidConnectFlags(u8),
    #[error("empty client id requires clean session")]
    InvalidClientId,
    #[error("will fields are inconsistent: {0}")]
    WillInconsistent(&'static str),
    #[error("QoS level {0} is not allowed")]
    QosNotAllowed(u8),
    #[error("invalid connect return code {0}")]
    InvalidConnectReturnCode(u8),
    #[error("invalid subscribe return code {0:#04x}")]
    InvalidSubackReturnCode(u8),
    #[error("{0:?} carries no topics")]
    TopicsEmpty(PacketType),
    #[error("invalid utf-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error("remaining length continues past four bytes")]
    MalformedVarint,
    #[error("{0:?} fields overrun the remaining length")]
    InvalidRemainingLength(PacketType),
    #[error("channel closed after {received} of {expected} bytes")]
    TruncatedRead { expected: usize, received: usize },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
