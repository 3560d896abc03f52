//! 'main' for the gasless process

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use gasless_common::TxInput;
use gasless_module_blockfrost::BlockfrostProvider;
use gasless_module_pool_server::{build_pool, serve};
use gasless_module_sponsor::{PoolValidation, Sponsor, SponsorAugmentation, SponsorTxParams};
use gasless_module_sponsor_client::{PoolEndpoint, SponsorClient};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, filter, fmt};

mod settings;

use settings::Settings;

const DEFAULT_CONFIG: &str = "gasless.toml";

#[derive(Parser, Debug)]
#[command(name = "gasless")]
#[command(about = "Sponsor Cardano transaction fees from a pool")]
struct Args {
    /// Path to configuration; gasless.toml in the working directory if present
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a pool server from the [pool] and [conditions] configuration
    Pool,

    /// Sponsor a transaction from a pool's address, then have the pool
    /// countersign it
    Sponsor {
        /// Hex CBOR of the unsigned transaction, or @file to read it from a file
        tx: String,

        /// Pool server URL
        #[arg(long)]
        pool_url: String,

        /// Address the pool sponsors from
        #[arg(long)]
        pool_id: String,

        /// Pool output to spend, as <tx hash>#<index>
        #[arg(long)]
        utxo: Option<TxInput>,
    },

    /// Print the conditions a pool publishes
    Conditions {
        /// Pool server URL
        pool_url: String,
    },
}

fn init_tracing() -> Result<()> {
    // Standard logging using RUST_LOG for log levels
    let fmt_layer = fmt::layer().with_filter(EnvFilter::from_default_env());

    // Only turn on tracing if some OTEL environment variables exist
    if std::env::vars().any(|(name, _)| name.starts_with("OTEL_")) {
        let otel_exporter = SpanExporter::builder().with_tonic().build()?;
        let otel_tracer = SdkTracerProvider::builder()
            .with_batch_exporter(otel_exporter)
            .build()
            .tracer("rust-otel-otlp");
        let otel_layer = OpenTelemetryLayer::new(otel_tracer)
            .with_filter(
                EnvFilter::from_default_env().add_directive(filter::LevelFilter::INFO.into()),
            )
            .with_filter(filter::filter_fn(|meta| meta.is_span()));
        Registry::default().with(fmt_layer).with(otel_layer).init();
    } else {
        Registry::default().with(fmt_layer).init();
    }
    Ok(())
}

fn read_tx(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)
            .with_context(|| format!("reading transaction from {path}"))?
            .trim()
            .to_string()),
        None => Ok(arg.trim().to_string()),
    }
}

async fn run_pool(settings: Settings, config_path: PathBuf, required: bool) -> Result<()> {
    let provider = BlockfrostProvider::new(&settings.blockfrost)?;
    let pool = Arc::new(build_pool(&settings.pool, provider, settings.conditions.clone())?);

    #[cfg(unix)]
    {
        let pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = reload_on_hangup(pool, config_path, required).await {
                tracing::error!("Conditions reload stopped: {e}");
            }
        });
    }
    #[cfg(not(unix))]
    let _ = (config_path, required);

    serve(pool, &settings.pool.listen_address()).await
}

/// Re-read `[conditions]` on SIGHUP and swap them into the running pool
#[cfg(unix)]
async fn reload_on_hangup<L, S>(
    pool: Arc<gasless_module_sponsor::Pool<L, S>>,
    config_path: PathBuf,
    required: bool,
) -> Result<()>
where
    L: gasless_common::LedgerQuery,
    S: gasless_common::Signer,
{
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    while hangup.recv().await.is_some() {
        match Settings::load(&config_path, required) {
            Ok(settings) => pool.set_conditions(settings.conditions),
            Err(e) => tracing::warn!("Keeping current conditions, reload failed: {e}"),
        }
    }
    Ok(())
}

async fn run_sponsor(
    settings: Settings,
    tx: String,
    pool_url: String,
    pool_id: String,
    utxo: Option<TxInput>,
) -> Result<()> {
    let provider = Arc::new(BlockfrostProvider::new(&settings.blockfrost)?);
    let params = SponsorTxParams {
        tx_cbor: read_tx(&tx)?,
        pool_id,
        utxo,
    };

    let sponsor = Sponsor::new(provider.clone()).with_reservation(settings.pool.fee_reservation);
    let unsigned = sponsor.sponsor_tx(params).await?;
    info!("Sponsored transaction built, asking {pool_url} to countersign");

    let timeout = Duration::from_secs(settings.blockfrost.timeout_secs);
    let client = SponsorClient::new(provider, PoolEndpoint::new(&pool_url, timeout)?);
    let signed = client.validate_tx(&unsigned).await?;

    println!("{signed}");
    Ok(())
}

async fn run_conditions(settings: Settings, pool_url: String) -> Result<()> {
    let timeout = Duration::from_secs(settings.blockfrost.timeout_secs);
    let endpoint = PoolEndpoint::new(&pool_url, timeout)?;

    let conditions = endpoint.fetch_conditions().await?;
    println!("{}", serde_json::to_string_pretty(&conditions)?);
    Ok(())
}

/// Standard main
#[tokio::main]
pub async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let required = args.config.is_some();
    let config_path = args.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let settings = Settings::load(&config_path, required)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    match args.command {
        Command::Pool => run_pool(settings, config_path, required).await?,
        Command::Sponsor {
            tx,
            pool_url,
            pool_id,
            utxo,
        } => run_sponsor(settings, tx, pool_url, pool_id, utxo).await?,
        Command::Conditions { pool_url } => run_conditions(settings, pool_url).await?,
    }

    info!("Exiting");
    Ok(())
}
