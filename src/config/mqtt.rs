use confique::Config;

#[derive(Debug, Clone, Config)]
pub struct MqttConfig {
    #[config(env = "DIYP_MQTT_URL", default = "mqtt://test.mosquitto.org:1883")]
    pub url: String,

    #[config(env = "DIYP_MQTT_TOPIC", default = "diyPressoOne/16F6866666E6")]
    pub topic: String,

    #[config(env = "DIYP_MQTT_QOS", default = 0)]
    pub qos: u8,

    #[config(env = "DIYP_MQTT_CLIENT_ID")]
    pub client_id: Option<String>,
    #[config(env = "DIYP_MQTT_USERNAME")]
    pub username: Option<String>,
    #[config(env = "DIYP_MQTT_PASSWORD")]
    pub password: Option<String>,

    #[config(env = "DIYP_MQTT_KEEP_ALIVE_SECONDS", default = 30)]
    pub keep_alive_seconds: u64,
}
