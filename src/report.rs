//! CSV artifact rendering and the local export directory
//!
//! One file per exported day, named by the day's file token. An existing
//! file is never rewritten: the writer surfaces `ArtifactExists`, which the
//! process layer treats as success, making file existence the authoritative
//! idempotency marker. Rendering happens fully in memory before anything
//! touches disk, so a failed render never leaves a partial artifact behind.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::aggregation::CapabilityRollup;
use crate::billing_fetcher::BillingFetcher;
use crate::cost_calculator::sample_cost;
use crate::error::{ConfcostError, Result};
use crate::types::CalendarDay;

/// Canonical artifact schema
pub const CSV_HEADER: [&str; 6] = ["Date", "Cost", "Name", "ClusterId", "Action", "Capability"];

/// Renders rollups into day-scoped CSV files under the export directory.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the artifact for `day`
    pub fn path_for_day(&self, day: CalendarDay) -> PathBuf {
        self.dir.join(format!("{}.csv", day.file_token()))
    }

    /// Whether an artifact already exists for `day`
    pub fn has_artifact(&self, day: CalendarDay) -> bool {
        self.path_for_day(day).exists()
    }

    /// Render the day's cost lines to CSV bytes.
    ///
    /// Lines whose cluster has no cached billing line for the metric's cost
    /// type are skipped with a warning; pricing gaps must stay visible in
    /// the logs rather than render as zero.
    pub fn render(&self, rollup: &CapabilityRollup, costs: &BillingFetcher) -> Result<Vec<u8>> {
        let day = rollup.day();
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer.write_record(CSV_HEADER)?;

            for (capability, cluster, topic, kind, bytes) in rollup.lines() {
                let Some(line) = costs.get(day, cluster, kind.cost_type()) else {
                    warn!(
                        "no billing line for cluster {cluster} and cost type {}, skipping topic {topic}",
                        kind.cost_type()
                    );
                    continue;
                };
                writer.write_record([
                    day.to_string(),
                    format!("{:.6}", sample_cost(bytes, line)),
                    topic.to_string(),
                    cluster.to_string(),
                    kind.action_label().to_string(),
                    capability.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        Ok(buf)
    }

    /// Render and persist the artifact for the rollup's day.
    ///
    /// Refuses to overwrite: an existing file yields `ArtifactExists`, which
    /// callers must treat as already-done rather than as a transient failure.
    pub fn write(&self, rollup: &CapabilityRollup, costs: &BillingFetcher) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for_day(rollup.day());
        if path.exists() {
            return Err(ConfcostError::ArtifactExists(path));
        }

        let bytes = self.render(rollup, costs)?;
        fs::write(&path, &bytes)?;
        Ok(path)
    }

    /// Read a day's artifact back for upload
    pub fn read_raw(&self, day: CalendarDay) -> Result<Vec<u8>> {
        Ok(fs::read(self.path_for_day(day))?)
    }

    /// The export directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing_client::{BillingApi, BillingResource, BillingResponse, RawBillingLine};
    use crate::types::{ClusterId, DaySnapshot, MetricKind, TopicName, UsageSample};
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::Arc;

    struct FixtureBillingApi(BillingResponse);

    #[async_trait]
    impl BillingApi for FixtureBillingApi {
        async fn costs(&self, _start: CalendarDay, _end: CalendarDay) -> Result<BillingResponse> {
            Ok(self.0.clone())
        }
    }

    fn day() -> CalendarDay {
        CalendarDay::new(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())
    }

    async fn costs_with_prod_lines() -> BillingFetcher {
        let lines = vec![
            RawBillingLine {
                line_type: "KAFKA_NETWORK_WRITE".to_string(),
                product: "KAFKA".to_string(),
                price: 0.066,
                unit: "GB".to_string(),
                resource: BillingResource {
                    id: "lkc-4npj6".to_string(),
                    display_name: String::new(),
                },
                ..Default::default()
            },
            RawBillingLine {
                line_type: "KAFKA_STORAGE".to_string(),
                product: "KAFKA".to_string(),
                price: 0.00012055,
                unit: "GB-hour".to_string(),
                resource: BillingResource {
                    id: "lkc-4npj6".to_string(),
                    display_name: String::new(),
                },
                ..Default::default()
            },
        ];
        let mut costs = BillingFetcher::new(Arc::new(FixtureBillingApi(BillingResponse {
            data: lines,
        })));
        costs.fetch_and_cache(day()).await.unwrap();
        costs
    }

    fn snapshot() -> DaySnapshot {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 0, 0, 0).unwrap();
        let mut snapshot = DaySnapshot::new();
        snapshot
            .insert(
                MetricKind::SentBytes,
                ClusterId::Production,
                TopicName::new("pub.sales-ab12e.orders"),
                UsageSample {
                    at,
                    bytes: 2_147_483_648.0,
                },
            )
            .unwrap();
        snapshot
            .insert(
                MetricKind::RetainedBytes,
                ClusterId::Production,
                TopicName::new("pub.sales-ab12e.orders"),
                UsageSample {
                    at,
                    bytes: 1_073_741_824.0,
                },
            )
            .unwrap();
        // no billing line cached for Development, so this one is skipped
        snapshot
            .insert(
                MetricKind::SentBytes,
                ClusterId::Development,
                TopicName::new("pub.sales-ab12e.orders"),
                UsageSample { at, bytes: 1024.0 },
            )
            .unwrap();
        snapshot
    }

    #[tokio::test]
    async fn renders_priced_lines_with_six_decimals() {
        let costs = costs_with_prod_lines().await;
        let rollup = CapabilityRollup::from_snapshot(day(), &snapshot());
        let writer = ReportWriter::new("unused");

        let bytes = writer.render(&rollup, &costs).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Date,Cost,Name,ClusterId,Action,Capability");
        assert_eq!(
            lines[1],
            "2024-03-07,0.132000,pub.sales-ab12e.orders,lkc-4npj6,written-bytes,sales-ab12e"
        );
        assert_eq!(
            lines[2],
            "2024-03-07,0.008680,pub.sales-ab12e.orders,lkc-4npj6,stored-bytes,sales-ab12e"
        );
        // the Development line had no pricing and must not appear
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn refuses_to_overwrite_an_existing_artifact() {
        let costs = costs_with_prod_lines().await;
        let rollup = CapabilityRollup::from_snapshot(day(), &snapshot());
        let tmp = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(tmp.path());

        let path = writer.write(&rollup, &costs).unwrap();
        let first = fs::read(&path).unwrap();

        let err = writer.write(&rollup, &costs).unwrap_err();
        assert!(matches!(err, ConfcostError::ArtifactExists(_)));
        assert_eq!(fs::read(&path).unwrap(), first, "existing bytes untouched");
    }

    #[tokio::test]
    async fn artifact_round_trips_through_read_raw() {
        let costs = costs_with_prod_lines().await;
        let rollup = CapabilityRollup::from_snapshot(day(), &snapshot());
        let tmp = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(tmp.path());

        writer.write(&rollup, &costs).unwrap();
        assert!(writer.has_artifact(day()));
        assert_eq!(
            writer.path_for_day(day()).file_name().unwrap(),
            "2024_3_7.csv"
        );

        let rendered = writer.render(&rollup, &costs).unwrap();
        assert_eq!(writer.read_raw(day()).unwrap(), rendered);
    }
}
