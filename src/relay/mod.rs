//! Forwards every message of one MQTT topic to InfluxDB.
//!
//! The controller publishes ready-made line-protocol text, so payloads are
//! written verbatim and sent right away. There is no reconnection: any
//! error from the event loop ends the relay.

pub mod mqtt_client;

use crate::config::mqtt::MqttConfig;
use crate::influxdb::{InfluxClient, SendOutcome};
use anyhow::{Context, Result, bail};
use mqtt_client::{make_client_options, parse_qos};
use rumqttc::{AsyncClient, Event, Packet};
use tracing::info;

pub async fn run_relay(config: &MqttConfig, mut influx: InfluxClient) -> Result<()> {
    let mqtt_options = make_client_options(config)?;
    let qos = parse_qos(config.qos)?;

    let (client, mut event_loop) = AsyncClient::new(mqtt_options, 16);

    client
        .subscribe(config.topic.as_str(), qos)
        .await
        .with_context(|| format!("Failed to subscribe to {}", config.topic))?;
    info!(url = %config.url, topic = %config.topic, "Relaying MQTT messages to InfluxDB");

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                info!(topic = %publish.topic, payload = ?publish.payload, "Received message");
                relay_payload(&mut influx, &publish.payload).await?;
            }
            Ok(_) => {}
            Err(e) => {
                bail!("MQTT client error: {:?}", e);
            }
        }
    }
}

/// Write one payload as a line and send it immediately.
///
/// A rejected batch is not an error: the lines stay buffered and go out
/// again with the next message.
pub async fn relay_payload(influx: &mut InfluxClient, payload: &[u8]) -> Result<SendOutcome> {
    let line = std::str::from_utf8(payload).context("MQTT payload is not valid UTF-8")?;
    influx.write_line(line);
    let outcome = influx
        .send()
        .await
        .context("Failed to post MQTT payload to InfluxDB")?;
    Ok(outcome)
}
