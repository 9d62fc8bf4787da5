use thiserror::Error;

/// Errors raised by the line-protocol client.
///
/// A non-204 answer from the database is not an error, see
/// [`SendOutcome::Rejected`](super::SendOutcome::Rejected).
#[derive(Error, Debug)]
pub enum InfluxError {
    /// The configured host cannot be turned into a write URL
    #[error("Invalid InfluxDB host: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The host parses but has no path to extend, e.g. `mailto:`
    #[error("InfluxDB host cannot carry a path: {0}")]
    HostNotABase(String),

    #[error("Invalid precision: {0} (expected ns, us, ms or s)")]
    InvalidPrecision(String),

    /// The request did not get a response (connection refused, reset...)
    #[error("InfluxDB request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
