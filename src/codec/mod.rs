pub mod channel;
pub mod decoder;
pub mod encoder;
pub mod header;
pub mod topic;

mod error;
mod types;


pub use channel::Channel;
pub use decoder::{decode, read_packet};
pub use encoder::{encode, encode_packet};
pub use error::*;
pub use topic::TopicError;
pub use types::*;

use crate::config::TopicLimits;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// Frames packets over an async byte stream using the same encode and decode
/// paths as the blocking API.
#[derive(Debug, Clone, Default)]
pub struct MqttCodec {
    version: ProtocolVersion,
    limits: TopicLimits,
}

impl MqttCodec {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            limits: TopicLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: TopicLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }
}

impl Decoder for MqttCodec {
    type Error = DecodeError;
    type Item = Packet;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if buf.is_empty() {
            return Ok(None);
        }

        let (remaining_length, length_size) = match decoder::peek_variable_int(&buf[1..])? {
            Some(length) => length,
            None => return Ok(None),
        };

        let frame_len = 1 + length_size + remaining_length;
        if buf.len() < frame_len {
            // If we don't have the full packet, just bail
            buf.reserve(frame_len - buf.len());
            return Ok(None);
        }

        let frame = buf.split_to(frame_len);
        let mut body = &frame[1..];
        let packet = decoder::decode(frame[0], self.version, &mut body)?;

        // Everything after CONNECT speaks the client's protocol level
        if let Packet::Connect(connect) = &packet {
            if connect.protocol_version != self.version {
                debug!(
                    from = ?self.version,
                    to = ?connect.protocol_version,
                    "switching protocol version"
                );
                self.version = connect.protocol_version;
            }
        }

        Ok(Some(packet))
    }
}

impl Encoder<Packet> for MqttCodec {
    type Error = EncodeError;

    fn encode(&mut self, packet: Packet, bytes: &mut BytesMut) -> Result<(), Self::Error> {
        encoder::encode_packet(&packet, self.version, &self.limits, bytes)
    }
}
