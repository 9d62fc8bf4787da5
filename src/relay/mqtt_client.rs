use crate::config::mqtt::MqttConfig;
use anyhow::{Context, Result, bail};
use rand::Rng;
use rand::distr::Alphanumeric;
use rumqttc::{MqttOptions, QoS, Transport};
use std::time::Duration;

fn random_client_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(18)
        .map(char::from)
        .collect()
}

fn get_client_id(config: &MqttConfig) -> String {
    config.client_id.clone().unwrap_or_else(|| {
        let mut client_id = "diypresso-".to_string();
        client_id.push_str(&random_client_id());
        client_id
    })
}

pub fn parse_qos(level: u8) -> Result<QoS> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        _ => bail!("Invalid MQTT QoS level: {} (expected 0, 1 or 2)", level),
    }
}

fn make_websocket_client_options(config: &MqttConfig, tls: bool) -> Result<MqttOptions> {
    let url = &config.url;
    let parsed_url =
        url::Url::parse(url).context(format!("Failed to parse MQTT WS URL: {}", url))?;

    let port = parsed_url.port().unwrap_or(8000);

    let mut mqtt_options = MqttOptions::new(get_client_id(config), url, port);

    if tls {
        mqtt_options.set_transport(Transport::wss_with_default_config());
    } else {
        mqtt_options.set_transport(Transport::Ws);
    }

    configure_mqtt_options(config, mqtt_options)
}

pub fn make_client_options(config: &MqttConfig) -> Result<MqttOptions> {
    let ws = config.url.starts_with("ws://");
    let ws_tls = config.url.starts_with("wss://");
    if ws || ws_tls {
        return make_websocket_client_options(config, ws_tls);
    }

    let mut parsed_url = url::Url::parse(&config.url)
        .with_context(|| format!("Failed to parse MQTT URL: {}", config.url))?;

    // rumqttc reads the client id from the query string only.
    let has_client_id = parsed_url.query_pairs().any(|(key, _)| key == "client_id");
    let url = if has_client_id {
        if config.client_id.is_some() {
            bail!("client_id is not allowed in `url` when it is set in MqttConfig");
        }
        config.url.clone()
    } else {
        let mut queries = parsed_url.query_pairs_mut();
        queries.append_pair("client_id", &get_client_id(config));
        queries.finish().to_string()
    };

    let mqtt_options = MqttOptions::parse_url(url).context("Failed to parse MQTT URL")?;

    configure_mqtt_options(config, mqtt_options)
}

fn configure_mqtt_options(
    config: &MqttConfig,
    mut mqtt_options: MqttOptions,
) -> Result<MqttOptions> {
    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds));

    if let Some(username) = &config.username {
        let password = config.password.clone().unwrap_or_default();
        mqtt_options.set_credentials(username, password);
    }

    Ok(mqtt_options)
}
