#![forbid(unsafe_code)]
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use diypresso_server::config::{self, DiypConfig, load_configuration};
use diypresso_server::http::server::run_http_server;
use diypresso_server::http::state::HttpServerState;
use diypresso_server::influxdb::{InfluxClient, SendOutcome};
use diypresso_server::push::push_lines;
use diypresso_server::relay::run_relay;
use diypresso_server::reporting::report_failure;
use std::net::SocketAddr;
use tokio::io::BufReader;
use tracing::info;

/// Companion services for the diyPresso espresso controller.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Receive camera uploads and serve firmware images
    Serve,
    /// Forward MQTT messages to InfluxDB
    Relay,
    /// Send line-protocol lines read from stdin to InfluxDB
    Push,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install CryptoProvider: {:?}", e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    load_configuration().context("Failed to load configuration")?;
    let config = config::get().context("Failed to get configuration")?;

    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    // Exit the program if a panic occurs
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    let result = match cli.command {
        Command::Serve => serve(&config).await,
        Command::Relay => relay(&config).await,
        Command::Push => push(&config).await,
    };
    if let Err(err) = &result {
        report_failure(err);
    }
    result
}

async fn serve(config: &DiypConfig) -> Result<()> {
    let address = SocketAddr::from((config.endpoint, config.port));
    run_http_server(HttpServerState::from_config(config), address).await?;
    info!("HTTP server stopped gracefully");
    Ok(())
}

async fn relay(config: &DiypConfig) -> Result<()> {
    let influx = InfluxClient::new(&config.influxdb).context("Failed to create InfluxDB client")?;
    run_relay(&config.mqtt, influx).await
}

async fn push(config: &DiypConfig) -> Result<()> {
    let mut influx =
        InfluxClient::new(&config.influxdb).context("Failed to create InfluxDB client")?;
    match push_lines(&mut influx, BufReader::new(tokio::io::stdin())).await? {
        SendOutcome::Accepted => Ok(()),
        SendOutcome::Rejected { status, body } => {
            bail!("InfluxDB rejected the batch with status {}: {}", status, body)
        }
    }
}
