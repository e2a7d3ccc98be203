//! Client-side settings.
//!
//! [`Settings`] is built once at startup and handed by reference to whatever
//! needs it. The codec itself only ever sees [`TopicLimits`] and a
//! [`ProtocolVersion`].

use crate::codec::{ProtocolVersion, DEFAULT_KEEP_ALIVE};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_TLS_PORT: u16 = 8883;

/// Inclusive bounds on topic length in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for TopicLimits {
    fn default() -> Self {
        Self {
            min: 1,
            max: u16::MAX as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Broker port for plain TCP.
    pub port: u16,
    /// Broker port for TLS.
    pub tls_port: u16,
    /// How long to wait for bytes from the broker.
    pub timeout_on_receiving: Duration,
    /// How long the broker may take to answer CONNECT.
    pub timeout_on_connection: Duration,
    /// Retries for unacknowledged QoS 1/2 PUBLISH, SUBSCRIBE and UNSUBSCRIBE.
    pub attempts_on_retry: u32,
    pub delay_on_retry: Duration,
    pub inflight_queue_size: usize,
    pub keep_alive: Duration,
    pub protocol_version: ProtocolVersion,
    pub topic_limits: TopicLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tls_port: DEFAULT_TLS_PORT,
            timeout_on_receiving: Duration::from_secs(30),
            timeout_on_connection: Duration::from_secs(30),
            attempts_on_retry: 3,
            delay_on_retry: Duration::from_secs(10),
            inflight_queue_size: usize::MAX,
            keep_alive: DEFAULT_KEEP_ALIVE,
            protocol_version: ProtocolVersion::V311,
            topic_limits: TopicLimits::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn tls_port(mut self, port: u16) -> Self {
        self.tls_port = port;
        self
    }

    pub fn timeout_on_receiving(mut self, timeout: Duration) -> Self {
        self.timeout_on_receiving = timeout;
        self
    }

    pub fn timeout_on_connection(mut self, timeout: Duration) -> Self {
        self.timeout_on_connection = timeout;
        self
    }

    pub fn retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts_on_retry = attempts;
        self.delay_on_retry = delay;
        self
    }

    pub fn inflight_queue_size(mut self, size: usize) -> Self {
        self.inflight_queue_size = size;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn topic_limits(mut self, limits: TopicLimits) -> Self {
        self.topic_limits = limits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::new();
        assert_eq!(settings.port, 1883);
        assert_eq!(settings.tls_port, 8883);
        assert_eq!(settings.timeout_on_receiving, Duration::from_secs(30));
        assert_eq!(settings.timeout_on_connection, Duration::from_secs(30));
        assert_eq!(settings.attempts_on_retry, 3);
        assert_eq!(settings.delay_on_retry, Duration::from_secs(10));
        assert_eq!(settings.inflight_queue_size, usize::MAX);
        assert_eq!(settings.keep_alive, Duration::from_secs(60));
        assert_eq!(settings.protocol_version, ProtocolVersion::V311);
        assert_eq!(settings.topic_limits, TopicLimits { min: 1, max: 65_535 });
    }

    #[test]
    fn test_builder() {
        let settings = Settings::new()
            .port(11883)
            .retry(5, Duration::from_secs(2))
            .protocol_version(ProtocolVersion::V31)
            .topic_limits(TopicLimits { min: 2, max: 128 });
        assert_eq!(settings.port, 11883);
        assert_eq!(settings.attempts_on_retry, 5);
        assert_eq!(settings.delay_on_retry, Duration::from_secs(2));
        assert_eq!(settings.protocol_version, ProtocolVersion::V31);
        assert_eq!(settings.topic_limits.max, 128);
    }
}
