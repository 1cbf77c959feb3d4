//! confcost - export Confluent Cloud Kafka costs per capability

use clap::Parser;
use confcost::{
    artifact_store::HttpArtifactStore,
    billing_client::BillingClient,
    billing_fetcher::BillingFetcher,
    cli::Cli,
    exporter::ExportScheduler,
    metrics_client::MetricsClient,
    report::ReportWriter,
    usage_fetcher::UsageFetcher,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The --quiet flag should override RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("confcost=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("confcost {} starting", confcost::VERSION);

    let metrics = Arc::new(MetricsClient::new(cli.metrics_endpoint.clone()));
    let billing = Arc::new(BillingClient::new(
        cli.billing_endpoint.clone(),
        cli.billing_api_key_id.clone(),
        cli.billing_api_key_secret.clone(),
    ));
    let store = Arc::new(HttpArtifactStore::new(
        cli.store_endpoint.clone(),
        cli.store_token.clone(),
    ));

    let scheduler = ExportScheduler::new(
        UsageFetcher::new(metrics),
        BillingFetcher::new(billing),
        store,
        ReportWriter::new(cli.export_dir.clone()),
        cli.worker_config(),
    );

    scheduler.run().await?;
    Ok(())
}
