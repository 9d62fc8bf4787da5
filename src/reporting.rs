use sentry::integrations::anyhow::capture_anyhow;
use tracing::error;

/// Log an error that ends a subcommand and forward it to Sentry.
///
/// Without an initialised Sentry client the capture is a no-op.
pub fn report_failure(err: &anyhow::Error) {
    error!("{:#}", err);
    capture_anyhow(err);
}
