//! Capability attribution and per-day rollups
//!
//! Shared infrastructure cost is attributed to owning teams ("capabilities")
//! by convention: topic names carry a capability root id, optionally behind
//! a `pub.` namespace prefix, ending in a 5-character suffix block before
//! the first literal dot. Topics outside the convention keep per-topic
//! visibility under `unknown-{topic}` buckets; ksql-internal topics are not
//! attributable at all and collapse into a single `UNKNOWN` bucket.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::types::{CalendarDay, CapabilityId, ClusterId, DaySnapshot, MetricKind, TopicName};

static CAPABILITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(pub.)?(.*-.{5})\.").expect("capability pattern compiles"));

const KSQL_MARKER: &str = "_confluent-ksql";

/// Derive the grouping key for a topic.
pub fn capability_for_topic(topic: &TopicName) -> CapabilityId {
    if let Some(captures) = CAPABILITY_PATTERN.captures(topic.as_str()) {
        if let Some(root) = captures.get(2).map(|m| m.as_str()) {
            if !root.is_empty() {
                if root.contains(KSQL_MARKER) {
                    return CapabilityId::unknown();
                }
                return CapabilityId::new(root);
            }
        }
    }
    CapabilityId::unattributed(topic)
}

/// Raw byte totals for one day, grouped by capability.
///
/// Holds bytes, not dollars: unit pricing differs per cluster, so cost is
/// computed per line at render time against that cluster's billing lines.
#[derive(Debug, Clone)]
pub struct CapabilityRollup {
    day: CalendarDay,
    totals: BTreeMap<CapabilityId, BTreeMap<ClusterId, BTreeMap<MetricKind, f64>>>,
    by_topic: BTreeMap<CapabilityId, BTreeMap<ClusterId, BTreeMap<TopicName, BTreeMap<MetricKind, f64>>>>,
}

impl CapabilityRollup {
    /// Attribute every sample in a snapshot to its capability.
    pub fn from_snapshot(day: CalendarDay, snapshot: &DaySnapshot) -> Self {
        let mut rollup = CapabilityRollup {
            day,
            totals: BTreeMap::new(),
            by_topic: BTreeMap::new(),
        };
        for (kind, cluster, topic, sample) in snapshot.iter() {
            let capability = capability_for_topic(topic);

            *rollup
                .totals
                .entry(capability.clone())
                .or_default()
                .entry(cluster)
                .or_default()
                .entry(kind)
                .or_insert(0.0) += sample.bytes;

            *rollup
                .by_topic
                .entry(capability)
                .or_default()
                .entry(cluster)
                .or_default()
                .entry(topic.clone())
                .or_default()
                .entry(kind)
                .or_insert(0.0) += sample.bytes;
        }
        rollup
    }

    /// The day this rollup covers
    pub fn day(&self) -> CalendarDay {
        self.day
    }

    /// Summed raw bytes for (capability, cluster, metric)
    pub fn total(&self, capability: &CapabilityId, cluster: ClusterId, kind: MetricKind) -> f64 {
        self.totals
            .get(capability)
            .and_then(|clusters| clusters.get(&cluster))
            .and_then(|metrics| metrics.get(&kind))
            .copied()
            .unwrap_or(0.0)
    }

    /// Iterate every per-topic line in deterministic order
    pub fn lines(
        &self,
    ) -> impl Iterator<Item = (&CapabilityId, ClusterId, &TopicName, MetricKind, f64)> {
        self.by_topic.iter().flat_map(|(capability, clusters)| {
            clusters.iter().flat_map(move |(cluster, topics)| {
                topics.iter().flat_map(move |(topic, metrics)| {
                    metrics
                        .iter()
                        .map(move |(kind, bytes)| (capability, *cluster, topic, *kind, *bytes))
                })
            })
        })
    }

    /// True if the rollup holds no lines
    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UsageSample;
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn extracts_capability_roots() {
        let cases = [
            ("pub.sales-ab12e.orders", "sales-ab12e"),
            ("sales-ab12e.orders", "sales-ab12e"),
            ("pub.cloud-ops-xy42z.audit.v2", "cloud-ops-xy42z"),
        ];
        for (topic, expected) in cases {
            assert_eq!(
                capability_for_topic(&TopicName::new(topic)).as_str(),
                expected,
                "topic {topic}"
            );
        }
    }

    #[test]
    fn ksql_internal_topics_share_one_unknown_bucket() {
        let capability =
            capability_for_topic(&TopicName::new("internal_confluent-ksql_processing-xy789.foo"));
        assert_eq!(capability.as_str(), "UNKNOWN");
    }

    #[test]
    fn unmatched_topics_get_per_topic_buckets() {
        assert_eq!(
            capability_for_topic(&TopicName::new("malformed")).as_str(),
            "unknown-malformed"
        );
        assert_eq!(
            capability_for_topic(&TopicName::new("another")).as_str(),
            "unknown-another"
        );
    }

    #[test]
    fn rollup_sums_per_capability_and_keeps_per_topic_values() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap();
        let mut snapshot = DaySnapshot::new();
        for (topic, bytes) in [("pub.sales-ab12e.orders", 100.0), ("pub.sales-ab12e.events", 28.0)] {
            snapshot
                .insert(
                    MetricKind::SentBytes,
                    ClusterId::Production,
                    TopicName::new(topic),
                    UsageSample { at, bytes },
                )
                .unwrap();
        }

        let day = CalendarDay::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        let rollup = CapabilityRollup::from_snapshot(day, &snapshot);

        let capability = CapabilityId::new("sales-ab12e");
        assert_eq!(
            rollup.total(&capability, ClusterId::Production, MetricKind::SentBytes),
            128.0
        );

        let lines: Vec<_> = rollup.lines().collect();
        assert_eq!(lines.len(), 2);
        // BTreeMap ordering makes the render order stable
        assert_eq!(lines[0].2.as_str(), "pub.sales-ab12e.events");
        assert_eq!(lines[0].4, 28.0);
        assert_eq!(lines[1].2.as_str(), "pub.sales-ab12e.orders");
        assert_eq!(lines[1].4, 100.0);
    }

    #[test]
    fn rollup_separates_clusters() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap();
        let mut snapshot = DaySnapshot::new();
        snapshot
            .insert(
                MetricKind::RetainedBytes,
                ClusterId::Production,
                TopicName::new("pub.sales-ab12e.orders"),
                UsageSample { at, bytes: 10.0 },
            )
            .unwrap();
        snapshot
            .insert(
                MetricKind::RetainedBytes,
                ClusterId::Development,
                TopicName::new("pub.sales-ab12e.orders"),
                UsageSample { at, bytes: 7.0 },
            )
            .unwrap();

        let day = CalendarDay::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        let rollup = CapabilityRollup::from_snapshot(day, &snapshot);
        let capability = CapabilityId::new("sales-ab12e");

        assert_eq!(
            rollup.total(&capability, ClusterId::Production, MetricKind::RetainedBytes),
            10.0
        );
        assert_eq!(
            rollup.total(&capability, ClusterId::Development, MetricKind::RetainedBytes),
            7.0
        );
    }
}
