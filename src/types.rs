//! Core domain types for confcost
//!
//! This module contains the fundamental types used throughout the exporter:
//! the calendar-day unit of export, the closed metric/billing enumerations,
//! and the cached usage and cost records built from them.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ConfcostError, Result};

/// Multiplier applied to storage cost to account for physically replicated
/// copies of retained data.
pub const STORAGE_REPLICATION_FACTOR: f64 = 3.0;

/// A UTC calendar day, the unit of export and caching.
///
/// Two values are equal iff they name the same (year, month, day); converting
/// to a timestamp always yields UTC midnight.
///
/// # Examples
/// ```
/// use confcost::types::CalendarDay;
/// use chrono::NaiveDate;
///
/// let day = CalendarDay::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
/// assert_eq!(day.to_string(), "2024-03-07");
/// assert_eq!(day.file_token(), "2024_3_7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Create a new CalendarDay
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The current day in UTC
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    /// Shift by a signed number of days
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// UTC midnight at the start of this day
    pub fn to_timestamp(&self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    /// Get the inner NaiveDate
    pub fn inner(&self) -> NaiveDate {
        self.0
    }

    /// Token used in artifact file names and storage keys, `{y}_{m}_{d}`
    /// without zero padding.
    pub fn file_token(&self) -> String {
        use chrono::Datelike;
        format!("{}_{}_{}", self.0.year(), self.0.month(), self.0.day())
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// The closed set of throughput/storage counters tracked per topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    /// Bytes received by the brokers (producer traffic)
    ReceivedBytes,
    /// Bytes sent by the brokers (consumer traffic)
    SentBytes,
    /// Bytes retained on disk
    RetainedBytes,
}

impl MetricKind {
    /// Every tracked metric, in query and render order.
    pub const ALL: [MetricKind; 3] = [
        MetricKind::ReceivedBytes,
        MetricKind::SentBytes,
        MetricKind::RetainedBytes,
    ];

    /// Time-series name of this metric in the query backend
    pub fn series(&self) -> &'static str {
        match self {
            MetricKind::ReceivedBytes => "confluent_kafka_server_received_bytes",
            MetricKind::SentBytes => "confluent_kafka_server_sent_bytes",
            MetricKind::RetainedBytes => "confluent_kafka_server_retained_bytes",
        }
    }

    /// Action label used in the CSV artifact
    pub fn action_label(&self) -> &'static str {
        match self {
            MetricKind::ReceivedBytes => "read-bytes",
            MetricKind::SentBytes => "written-bytes",
            MetricKind::RetainedBytes => "stored-bytes",
        }
    }

    /// The billing cost type priced against this metric
    pub fn cost_type(&self) -> CostType {
        match self {
            MetricKind::ReceivedBytes => CostType::KafkaNetworkRead,
            MetricKind::SentBytes => CostType::KafkaNetworkWrite,
            MetricKind::RetainedBytes => CostType::KafkaStorage,
        }
    }

    /// Retained bytes is a point-in-time gauge; the throughput metrics are
    /// summed over the day's window.
    pub fn is_storage(&self) -> bool {
        matches!(self, MetricKind::RetainedBytes)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.series())
    }
}

/// The statically known registry of managed clusters.
///
/// Samples and billing lines referencing ids outside this registry are
/// dropped at the fetch boundary with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterId {
    Production,
    Development,
    DevelopmentCluster4,
    SsuDevEnvironment,
    SsuDevEnvironment2,
}

impl ClusterId {
    /// Every registered cluster.
    pub const ALL: [ClusterId; 5] = [
        ClusterId::Production,
        ClusterId::Development,
        ClusterId::DevelopmentCluster4,
        ClusterId::SsuDevEnvironment,
        ClusterId::SsuDevEnvironment2,
    ];

    /// Wire id of the cluster
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterId::Production => "lkc-4npj6",
            ClusterId::Development => "lkc-3wqzw",
            ClusterId::DevelopmentCluster4 => "lkc-3m912",
            ClusterId::SsuDevEnvironment => "lkc-pj37pk",
            ClusterId::SsuDevEnvironment2 => "lkc-j9gknw",
        }
    }

    /// Resolve a wire id against the registry
    pub fn try_parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConfcostError::UnknownClusterId(s.to_string()))
    }

    /// Whether this cluster resolves to the production price tier
    pub fn is_production(&self) -> bool {
        matches!(self, ClusterId::Production)
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strongly-typed topic name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicName(String);

impl TopicName {
    /// Create a new TopicName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organizational grouping key derived from the topic-naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityId(String);

impl CapabilityId {
    /// Create a CapabilityId from an extracted root segment
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The shared bucket for traffic that cannot be attributed to any
    /// capability (ksql-internal topics).
    pub fn unknown() -> Self {
        Self("UNKNOWN".to_string())
    }

    /// The per-topic bucket for topics outside the naming convention,
    /// preserving per-topic cost visibility.
    pub fn unattributed(topic: &TopicName) -> Self {
        Self(format!("unknown-{}", topic.as_str()))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of billing line types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostType {
    ConnectCapacity,
    ConnectNumTasks,
    ConnectThroughput,
    KafkaBase,
    KafkaStorage,
    KafkaNetworkRead,
    KafkaNetworkWrite,
    KafkaNumCkus,
    KafkaPartition,
    Support,
}

impl CostType {
    const ALL: [CostType; 10] = [
        CostType::ConnectCapacity,
        CostType::ConnectNumTasks,
        CostType::ConnectThroughput,
        CostType::KafkaBase,
        CostType::KafkaStorage,
        CostType::KafkaNetworkRead,
        CostType::KafkaNetworkWrite,
        CostType::KafkaNumCkus,
        CostType::KafkaPartition,
        CostType::Support,
    ];

    /// Canonical wire string of this line type
    pub fn as_str(&self) -> &'static str {
        match self {
            CostType::ConnectCapacity => "CONNECT_CAPACITY",
            CostType::ConnectNumTasks => "CONNECT_NUM_TASKS",
            CostType::ConnectThroughput => "CONNECT_THROUGHPUT",
            CostType::KafkaBase => "KAFKA_BASE",
            CostType::KafkaStorage => "KAFKA_STORAGE",
            CostType::KafkaNetworkRead => "KAFKA_NETWORK_READ",
            CostType::KafkaNetworkWrite => "KAFKA_NETWORK_WRITE",
            CostType::KafkaNumCkus => "KAFKA_NUM_CKUS",
            CostType::KafkaPartition => "KAFKA_PARTITION",
            CostType::Support => "SUPPORT",
        }
    }

    /// Parse a wire line-type string
    pub fn try_parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfcostError::UnknownCostType(s.to_string()))
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of billed products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductType {
    Connect,
    Kafka,
    Support,
}

impl ProductType {
    const ALL: [ProductType; 3] = [ProductType::Connect, ProductType::Kafka, ProductType::Support];

    /// Canonical wire string of this product
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Connect => "CONNECT",
            ProductType::Kafka => "KAFKA",
            ProductType::Support => "SUPPORT_CLOUD_BUSINESS",
        }
    }

    /// Parse a wire product string
    pub fn try_parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfcostError::UnknownProductType(s.to_string()))
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of billing units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostUnit {
    Gb,
    GbHour,
    Hour,
    CkuHour,
    TaskHour,
    PartitionHour,
}

impl CostUnit {
    const ALL: [CostUnit; 6] = [
        CostUnit::Gb,
        CostUnit::GbHour,
        CostUnit::Hour,
        CostUnit::CkuHour,
        CostUnit::TaskHour,
        CostUnit::PartitionHour,
    ];

    /// Canonical wire string of this unit
    pub fn as_str(&self) -> &'static str {
        match self {
            CostUnit::Gb => "GB",
            CostUnit::GbHour => "GB-hour",
            CostUnit::Hour => "Hour",
            CostUnit::CkuHour => "CKU-hour",
            CostUnit::TaskHour => "Task-hour",
            CostUnit::PartitionHour => "Partition-hour",
        }
    }

    /// Parse a wire unit string
    pub fn try_parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ConfcostError::UnknownCostUnit(s.to_string()))
    }
}

impl fmt::Display for CostUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One priced billing line for a cluster and cost type on a given day.
/// Immutable once cached.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingLine {
    pub cost_type: CostType,
    pub product: ProductType,
    pub cluster: ClusterId,
    /// Unit price in USD
    pub cost_per_unit: f64,
    pub unit: CostUnit,
    /// Total cost reported by the provider for the window
    pub total_cost: f64,
}

/// One observation of a metric for a cluster and topic. Immutable once cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSample {
    /// When the backend evaluated the sample
    pub at: DateTime<Utc>,
    /// Observed value in bytes
    pub bytes: f64,
}

/// The complete, frozen usage picture for one day across all tracked
/// metrics, clusters and topics.
///
/// Ordered maps keep downstream rendering deterministic.
#[derive(Debug, Clone, Default)]
pub struct DaySnapshot {
    metrics: BTreeMap<MetricKind, BTreeMap<ClusterId, BTreeMap<TopicName, UsageSample>>>,
}

impl DaySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample. A second observation for the same
    /// (metric, cluster, topic) is a contract breach in the data source and
    /// fails the whole fetch.
    pub fn insert(
        &mut self,
        kind: MetricKind,
        cluster: ClusterId,
        topic: TopicName,
        sample: UsageSample,
    ) -> Result<()> {
        let per_topic = self
            .metrics
            .entry(kind)
            .or_default()
            .entry(cluster)
            .or_default();
        if per_topic.contains_key(&topic) {
            return Err(ConfcostError::DuplicateSample {
                metric: kind,
                cluster,
                topic,
            });
        }
        per_topic.insert(topic, sample);
        Ok(())
    }

    /// Samples for one metric on one cluster, keyed by topic
    pub fn topics(
        &self,
        kind: MetricKind,
        cluster: ClusterId,
    ) -> Option<&BTreeMap<TopicName, UsageSample>> {
        self.metrics.get(&kind)?.get(&cluster)
    }

    /// Iterate every (metric, cluster, topic, sample) tuple in order
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, ClusterId, &TopicName, &UsageSample)> {
        self.metrics.iter().flat_map(|(kind, clusters)| {
            clusters.iter().flat_map(move |(cluster, topics)| {
                topics
                    .iter()
                    .map(move |(topic, sample)| (*kind, *cluster, topic, sample))
            })
        })
    }

    /// Total bytes for one metric on one cluster across all topics
    pub fn cluster_total(&self, kind: MetricKind, cluster: ClusterId) -> f64 {
        self.topics(kind, cluster)
            .map(|topics| topics.values().map(|s| s.bytes).sum())
            .unwrap_or(0.0)
    }

    /// True if no samples were recorded
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
