use anyhow::Error;
use confique::Config;
use std::{
    net::IpAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

use self::influxdb::InfluxDbConfig;
use self::mqtt::MqttConfig;
pub mod influxdb;
pub mod mqtt;

#[derive(Debug, Config)]
pub struct DiypConfig {
    #[config(env = "DIYP_PORT", default = 8888)]
    pub port: u16,
    #[config(env = "DIYP_ENDPOINT", default = "0.0.0.0")]
    pub endpoint: IpAddr,

    /// Unset means uploads of any size are accepted.
    #[config(env = "DIYP_HTTP_BODY_LIMIT")]
    pub http_body_limit: Option<String>,

    /// Unset means requests are never cut off.
    #[config(env = "DIYP_HTTP_SERVER_TIMEOUT_SECONDS")]
    pub http_server_timeout_seconds: Option<u64>,

    /// Directory served under `/fw/`.
    #[config(env = "DIYP_FIRMWARE_DIR", default = "fw")]
    pub firmware_dir: PathBuf,

    /// Directory where uploaded files are written.
    #[config(env = "DIYP_UPLOAD_DIR", default = ".")]
    pub upload_dir: PathBuf,

    /// File removed from the upload directory at the start of every upload.
    #[config(env = "DIYP_REPORT_FILE", default = "Report")]
    pub report_file: String,

    #[config(env = "DIYP_UPLOAD_RESPONSE_DELAY_MS", default = 1000)]
    pub upload_response_delay_ms: u64,

    #[config(env = "DIYP_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,

    #[config(nested)]
    pub influxdb: InfluxDbConfig,

    #[config(nested)]
    pub mqtt: MqttConfig,
}

impl DiypConfig {
    pub fn load() -> Result<DiypConfig, Error> {
        let c = DiypConfig::builder()
            .env()
            .file("settings.toml")
            .load()?;

        Ok(c)
    }

    pub fn parse_http_body_limit(&self) -> Result<Option<usize>, Error> {
        let Some(limit) = &self.http_body_limit else {
            return Ok(None);
        };
        let size = byte_unit::Byte::parse_str(limit, true)?.as_u64();
        if size > 128 * 1024 * 1024 * 1024 {
            anyhow::bail!("Body size is too big: > 128GB");
        }
        Ok(Some(size as usize))
    }

    pub fn http_server_timeout(&self) -> Option<Duration> {
        self.http_server_timeout_seconds.map(Duration::from_secs)
    }

    pub fn upload_response_delay(&self) -> Duration {
        Duration::from_millis(self.upload_response_delay_ms)
    }
}

static DIYP_CONFIG: OnceLock<Arc<DiypConfig>> = OnceLock::new();

pub fn get() -> Result<Arc<DiypConfig>, Error> {
    DIYP_CONFIG.get().cloned().ok_or_else(|| {
        Error::msg(
            "Configuration not loaded. Please call load_configuration() before using the configuration",
        )
    })
}

pub fn load_configuration() -> Result<(), Error> {
    if DIYP_CONFIG.get().is_some() {
        return Ok(());
    }

    let config = DiypConfig::load()?;
    DIYP_CONFIG.get_or_init(|| Arc::new(config));

    Ok(())
}
