//! confcost - export Confluent Cloud Kafka costs per capability
//!
//! This library provides the per-day export pipeline:
//! - Fetch billing lines and usage samples for each day in a lookback window
//! - Attribute per-topic usage to organizational capabilities
//! - Price usage against the day's billing lines
//! - Render one CSV artifact per day and push it to durable storage
//!
//! The scheduler in [`exporter`] drives everything; the wire clients behind
//! the [`metrics_client::MetricsQuery`], [`billing_client::BillingApi`] and
//! [`artifact_store::ArtifactStore`] traits are swappable for in-memory
//! fakes in tests.

pub mod aggregation;
pub mod artifact_store;
pub mod billing_client;
pub mod billing_fetcher;
pub mod cli;
pub mod cost_calculator;
pub mod error;
pub mod exporter;
pub mod metrics_client;
pub mod report;
pub mod types;
pub mod usage_fetcher;

// Re-export commonly used types
pub use error::{ConfcostError, Result};
pub use types::{CalendarDay, CapabilityId, ClusterId, MetricKind, TopicName};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
