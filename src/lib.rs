//! Wire codec for MQTT 3.1 and 3.1.1 control packets.
//!
//! The blocking API is [`codec::encode`] / [`codec::encode_packet`] for the
//! write side and [`codec::decode`] / [`codec::read_packet`] for the read side,
//! pulling bytes from any [`codec::Channel`] (every [`std::io::Read`] is one).
//! [`codec::MqttCodec`] wraps the same functions for `tokio_util` framing.
//!
//! The protocol version is passed to every call rather than stored on packets.

pub mod codec;
pub mod config;

pub use codec::{
    decode, encode, encode_packet, read_packet, Channel, DecodeError, EncodeError, MqttCodec,
    Packet, PacketType, ProtocolVersion, QoS,
};
pub use config::{Settings, TopicLimits};
