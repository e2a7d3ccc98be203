use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use mqtt_wire::codec::{
    Connect, ConnectReturnCode, Puback, Pubcomp, Pubrec, Publish, Subscribe,
};
use mqtt_wire::{MqttCodec, Packet, ProtocolVersion, QoS, Settings};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Connects to a broker, subscribes to a topic filter and logs what arrives.
#[derive(Debug, Parser)]
#[command(name = "mqtt-wire", version)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = mqtt_wire::config::DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value = "mqtt-wire")]
    client_id: String,

    #[arg(long, default_value = "#")]
    topic: String,

    /// Protocol level: 3 for MQTT 3.1, 4 for MQTT 3.1.1
    #[arg(long, default_value_t = 4)]
    protocol: u8,

    /// Keep-alive in seconds
    #[arg(long, default_value_t = 60)]
    keep_alive: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let version = ProtocolVersion::try_from(args.protocol)
        .map_err(|_| anyhow::anyhow!("unsupported protocol level {}", args.protocol))?;
    let settings = Settings::new()
        .port(args.port)
        .keep_alive(Duration::from_secs(args.keep_alive))
        .protocol_version(version);

    let address = format!("{}:{}", args.host, settings.port);
    info!("Connecting to mqtt://{}...", address);
    let stream = timeout(settings.timeout_on_connection, TcpStream::connect(&address))
        .await
        .context("timed out connecting")??;

    let codec = MqttCodec::new(settings.protocol_version).with_limits(settings.topic_limits);
    let mut framed = Framed::new(stream, codec);

    let mut connect = Connect::new(args.client_id);
    connect.protocol_version = settings.protocol_version;
    connect.keep_alive = settings.keep_alive;
    framed.send(Packet::Connect(connect)).await?;

    match timeout(settings.timeout_on_receiving, framed.next()).await {
        Ok(Some(Ok(Packet::Connack(connack)))) if connack.code == ConnectReturnCode::Accepted => {
            info!(session_present = connack.session_present, "Connected!");
        }
        Ok(Some(Ok(Packet::Connack(connack)))) => bail!("connection refused: {:?}", connack.code),
        Ok(Some(Ok(packet))) => bail!("expected CONNACK, got {:?}", packet.packet_type()),
        Ok(Some(Err(err))) => return Err(err.into()),
        Ok(None) => bail!("broker closed the connection"),
        Err(_) => bail!("timed out waiting for CONNACK"),
    }

    framed
        .send(Packet::Subscribe(Subscribe::new(
            1,
            vec![args.topic.clone()],
            vec![QoS::AtLeastOnce],
        )))
        .await?;
    info!("Subscribed to {}", args.topic);

    let mut ping = interval((settings.keep_alive / 2).max(Duration::from_secs(1)));
    ping.tick().await;

    loop {
        tokio::select! {
            packet = framed.next() => {
                let packet = match packet {
                    Some(packet) => packet?,
                    None => {
                        warn!("broker closed the connection");
                        return Ok(());
                    }
                };

                match packet {
                    Packet::Publish(publish) => {
                        log_publish(&publish);
                        match publish.qos {
                            QoS::AtMostOnce => {}
                            QoS::AtLeastOnce => {
                                let puback = Puback { message_id: publish.message_id };
                                framed.send(Packet::Puback(puback)).await?;
                            }
                            QoS::ExactlyOnce => {
                                let pubrec = Pubrec { message_id: publish.message_id };
                                framed.send(Packet::Pubrec(pubrec)).await?;
                            }
                        }
                    }
                    Packet::Pubrel(pubrel) => {
                        let pubcomp = Pubcomp { message_id: pubrel.message_id };
                        framed.send(Packet::Pubcomp(pubcomp)).await?;
                    }
                    Packet::Suback(suback) => info!(return_codes = ?suback.return_codes, "SUBACK"),
                    other => debug!(packet_type = ?other.packet_type(), "ignored"),
                }
            }
            _ = ping.tick() => {
                framed.send(Packet::Pingreq).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Disconnecting");
                framed.send(Packet::Disconnect).await?;
                return Ok(());
            }
        }
    }
}

fn log_publish(publish: &Publish) {
    match std::str::from_utf8(&publish.payload) {
        Ok(text) => info!("Received on '{}': {}", publish.topic, text),
        Err(_) => info!("Received on '{}': <{} bytes>", publish.topic, publish.payload.len()),
    }
}
