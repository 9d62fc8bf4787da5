//! Buffered writer for the InfluxDB 2.x HTTP write API.
//!
//! Records are accumulated as line-protocol text and flushed with a single
//! `POST /api/v2/write`. The buffer is only cleared when the database
//! answers `204 No Content`. Any other answer keeps it, so the next
//! [`InfluxClient::send`] posts the same lines again followed by whatever
//! was written in between.

pub mod error;
pub mod precision;

pub use error::InfluxError;
pub use precision::Precision;

use crate::config::influxdb::InfluxDbConfig;
use crate::datamodel::Measurement;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The database acknowledged the batch, the buffer is now empty.
    Accepted,
    /// The database answered with something else than 204.
    /// The buffer is left untouched.
    Rejected { status: u16, body: String },
}

impl SendOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SendOutcome::Accepted)
    }
}

#[derive(Debug)]
pub struct InfluxClient {
    http: reqwest::Client,
    write_url: Url,
    token: String,
    buffer: String,
}

impl InfluxClient {
    pub fn new(config: &InfluxDbConfig) -> Result<Self, InfluxError> {
        let precision = Precision::from_str(&config.precision)?;

        // Appended to the host path, so a host behind a path prefix keeps it.
        let mut write_url = Url::parse(&config.host)?;
        write_url
            .path_segments_mut()
            .map_err(|_| InfluxError::HostNotABase(config.host.clone()))?
            .pop_if_empty()
            .extend(["api", "v2", "write"]);
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", precision.as_str());

        Ok(Self {
            http: reqwest::Client::new(),
            write_url,
            token: config.token.clone(),
            buffer: String::new(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    /// Lines waiting for the next [`send`](Self::send).
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Format one record and append it to the buffer.
    ///
    /// Successive records are separated by a single newline.
    pub fn write<T, F, TK, TV, FK, FV>(
        &mut self,
        measurement: &str,
        tags: T,
        fields: F,
        time: Option<i64>,
    ) where
        T: IntoIterator<Item = (TK, TV)>,
        F: IntoIterator<Item = (FK, FV)>,
        TK: Display,
        TV: Display,
        FK: Display,
        FV: Display,
    {
        let measurement = Measurement::new(measurement, tags, fields, time);
        self.write_measurement(&measurement);
    }

    pub fn write_measurement(&mut self, measurement: &Measurement) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(&measurement.to_string());
    }

    /// Append an already formatted line, followed by a newline.
    pub fn write_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    /// Post the whole buffer to the write endpoint.
    ///
    /// Returns an error only when no response was received. In that case,
    /// as for a rejected batch, the buffer is kept.
    pub async fn send(&mut self) -> Result<SendOutcome, InfluxError> {
        debug!(url = %self.write_url, pending = %self.buffer, "Posting batch to InfluxDB");

        let response = self
            .http
            .post(self.write_url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .header(ACCEPT, "application/json")
            .body(self.buffer.clone())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!("Data posted successfully");
            self.buffer.clear();
            return Ok(SendOutcome::Accepted);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => format!("<unreadable body: {}>", err),
        };
        warn!(status = status.as_u16(), response = %body, "Failed to post data");
        Ok(SendOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
