use crate::config::DiypConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct HttpServerState {
    pub firmware_dir: Arc<PathBuf>,
    pub upload_dir: Arc<PathBuf>,
    pub report_file: Arc<String>,
    pub response_delay: Duration,
}

impl HttpServerState {
    pub fn from_config(config: &DiypConfig) -> Self {
        Self {
            firmware_dir: Arc::new(config.firmware_dir.clone()),
            upload_dir: Arc::new(config.upload_dir.clone()),
            report_file: Arc::new(config.report_file.clone()),
            response_delay: config.upload_response_delay(),
        }
    }
}
