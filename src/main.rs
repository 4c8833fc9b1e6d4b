use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::error;

use cert_expiry_exporter::config::Config;
use cert_expiry_exporter::scheduler;
use cert_expiry_exporter::server::MetricsServer;
use cert_expiry_exporter::store::MetricStore;

/// Prometheus exporter polling remote endpoints for entitlement expiry dates.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Address to serve /metrics on
    #[arg(long, default_value = "0.0.0.0:18000")]
    listen: SocketAddr,

    /// Seconds between polling cycles
    #[arg(long, default_value_t = 36_000)]
    interval_secs: u64,

    /// Per-request timeout in seconds for outbound polls
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn main() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(err) = run(Args::parse()) {
        error!(error = %err, "exporter terminated");
        exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(&args.config)?;

    // Every configured endpoint must hold the sentinel before the scrape
    // endpoint becomes reachable.
    let store = Arc::new(MetricStore::new()?);
    for endpoint in &config.urls {
        store.initialize(&endpoint.metric_key());
    }

    let _server = MetricsServer::start(Arc::clone(&store), args.listen)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    scheduler::run(
        &args.config,
        Duration::from_secs(args.interval_secs),
        &client,
        &store,
    )?;
    Ok(())
}
