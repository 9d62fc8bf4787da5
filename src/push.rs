use crate::influxdb::{InfluxClient, SendOutcome};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

/// Buffer every non-blank line of `reader` and send them in one batch.
pub async fn push_lines<R>(influx: &mut InfluxClient, reader: R) -> Result<SendOutcome>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        if line.trim().is_empty() {
            continue;
        }
        influx.write_line(&line);
        count += 1;
    }

    info!(lines = count, "Pushing lines to InfluxDB");
    let outcome = influx.send().await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::influxdb::FakeInfluxDb;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_push_lines_skips_blank_lines() {
        let server = FakeInfluxDb::start(StatusCode::NO_CONTENT).await.unwrap();
        let mut influx = InfluxClient::new(&server.config()).unwrap();

        let input: &[u8] = b"brew,machine=one shot=1\n\n   \nbrew,machine=one shot=2\n";
        let outcome = push_lines(&mut influx, input).await.unwrap();
        assert_eq!(outcome, SendOutcome::Accepted);

        let received = server.received();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].body,
            "brew,machine=one shot=1\nbrew,machine=one shot=2\n"
        );
    }

    #[tokio::test]
    async fn test_push_lines_reports_rejection() {
        let server = FakeInfluxDb::start(StatusCode::UNAUTHORIZED).await.unwrap();
        let mut influx = InfluxClient::new(&server.config()).unwrap();

        let input: &[u8] = b"brew,machine=one shot=1\n";
        let outcome = push_lines(&mut influx, input).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Rejected { status: 401, .. }));
        assert_eq!(influx.pending(), "brew,machine=one shot=1\n");
    }
}
