//! CLI interface for confcost
//!
//! The worker is configured entirely through flags, each with a
//! `CONFCOST_*` environment fallback so deployments can stay flag-free.
//!
//! # Example
//!
//! ```bash
//! confcost \
//!     --metrics-endpoint http://prometheus:9090 \
//!     --billing-api-key-id KEY --billing-api-key-secret SECRET \
//!     --store-endpoint https://storage-gw.internal \
//!     --bucket-name kafka-cost-reports
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::exporter::WorkerConfig;

/// Export Confluent Cloud Kafka costs per capability as daily CSV artifacts
#[derive(Parser, Debug, Clone)]
#[command(name = "confcost")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Seconds to sleep between scheduler ticks
    #[arg(long, env = "CONFCOST_INTERVAL_SECONDS", default_value_t = 60)]
    pub interval_seconds: u64,

    /// How many days back (ending yesterday) to consider for export
    #[arg(long, env = "CONFCOST_DAYS_TO_LOOK_BACK", default_value_t = 7)]
    pub days_to_look_back: u32,

    /// Also check remote storage for already-exported days (not implemented)
    #[arg(long, env = "CONFCOST_CHECK_REMOTE_EXPORTS")]
    pub check_remote_exports: bool,

    /// Base URL of the usage query backend
    #[arg(long, env = "CONFCOST_METRICS_ENDPOINT")]
    pub metrics_endpoint: String,

    /// Base URL of the billing API
    #[arg(
        long,
        env = "CONFCOST_BILLING_ENDPOINT",
        default_value = "https://api.confluent.cloud"
    )]
    pub billing_endpoint: String,

    /// API key id for the billing API
    #[arg(long, env = "CONFCOST_BILLING_API_KEY_ID")]
    pub billing_api_key_id: String,

    /// API key secret for the billing API
    #[arg(long, env = "CONFCOST_BILLING_API_KEY_SECRET", hide_env_values = true)]
    pub billing_api_key_secret: String,

    /// Base URL of the artifact store gateway
    #[arg(long, env = "CONFCOST_STORE_ENDPOINT")]
    pub store_endpoint: String,

    /// Bearer token for the artifact store, if it requires one
    #[arg(long, env = "CONFCOST_STORE_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// Destination bucket for uploaded artifacts
    #[arg(long, env = "CONFCOST_BUCKET_NAME")]
    pub bucket_name: String,

    /// Key prefix for uploaded artifacts
    #[arg(
        long,
        env = "CONFCOST_BUCKET_KEY_PREFIX",
        default_value = "confluent-costs"
    )]
    pub bucket_key_prefix: String,

    /// Directory for local CSV artifacts
    #[arg(long, env = "CONFCOST_EXPORT_DIR", default_value = "export")]
    pub export_dir: PathBuf,

    /// Only log warnings and errors
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// The scheduler's slice of the configuration
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            interval: Duration::from_secs(self.interval_seconds),
            days_to_look_back: self.days_to_look_back,
            check_remote_exports: self.check_remote_exports,
            bucket: self.bucket_name.clone(),
            key_prefix: self.bucket_key_prefix.clone(),
        }
    }
}
