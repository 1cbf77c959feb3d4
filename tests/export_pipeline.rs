//! End-to-end scheduler tests over in-memory collaborators
//!
//! These drive the real scheduler, caches, aggregation and CSV writer; only
//! the three wire clients are replaced by fakes behind their traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use confcost::{
    artifact_store::ArtifactStore,
    billing_client::{BillingApi, BillingResource, BillingResponse, RawBillingLine},
    billing_fetcher::BillingFetcher,
    error::{ConfcostError, Result},
    exporter::{ExportScheduler, ExportState, WorkerConfig},
    metrics_client::{MetricsQuery, SampleLabels, VectorSample},
    report::ReportWriter,
    types::CalendarDay,
    usage_fetcher::UsageFetcher,
};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct FakeMetrics {
    samples: Vec<VectorSample>,
}

#[async_trait]
impl MetricsQuery for FakeMetrics {
    async fn query(&self, _query: &str, _at: DateTime<Utc>) -> Result<Vec<VectorSample>> {
        Ok(self.samples.clone())
    }
}

struct FakeBilling {
    response: BillingResponse,
    fail: bool,
}

#[async_trait]
impl BillingApi for FakeBilling {
    async fn costs(&self, _start: CalendarDay, _end: CalendarDay) -> Result<BillingResponse> {
        if self.fail {
            return Err(ConfcostError::Api {
                status: 503,
                context: "billing API",
            });
        }
        Ok(self.response.clone())
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), bytes);
        Ok(())
    }
}

fn usage_sample(topic: &str, value: &str) -> VectorSample {
    VectorSample {
        metric: SampleLabels {
            kafka_id: "lkc-4npj6".to_string(),
            topic: topic.to_string(),
        },
        value: (1709769600.0, value.to_string()),
    }
}

fn kafka_line(line_type: &str, unit: &str, price: f64) -> RawBillingLine {
    RawBillingLine {
        amount: 1.0,
        line_type: line_type.to_string(),
        product: "KAFKA".to_string(),
        price,
        unit: unit.to_string(),
        resource: BillingResource {
            id: "lkc-4npj6".to_string(),
            display_name: String::new(),
        },
        ..Default::default()
    }
}

fn full_billing_response() -> BillingResponse {
    BillingResponse {
        data: vec![
            kafka_line("KAFKA_NETWORK_READ", "GB", 0.066),
            kafka_line("KAFKA_NETWORK_WRITE", "GB", 0.013),
            kafka_line("KAFKA_STORAGE", "GB-hour", 0.00012055),
        ],
    }
}

fn worker_config(days_to_look_back: u32) -> WorkerConfig {
    WorkerConfig {
        interval: Duration::from_secs(60),
        days_to_look_back,
        check_remote_exports: false,
        bucket: "kafka-cost-reports".to_string(),
        key_prefix: "confluent-costs".to_string(),
    }
}

fn scheduler_with(
    store: Arc<MemoryStore>,
    export_dir: &std::path::Path,
    billing_fails: bool,
    days_to_look_back: u32,
) -> ExportScheduler {
    let metrics = Arc::new(FakeMetrics {
        samples: vec![usage_sample("pub.sales-ab12e.orders", "1073741824")],
    });
    let billing = Arc::new(FakeBilling {
        response: full_billing_response(),
        fail: billing_fails,
    });
    ExportScheduler::new(
        UsageFetcher::new(metrics),
        BillingFetcher::new(billing),
        store,
        ReportWriter::new(export_dir),
        worker_config(days_to_look_back),
    )
}

#[tokio::test]
async fn full_pipeline_exports_and_uploads_each_pending_day() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut scheduler = scheduler_with(store.clone(), tmp.path(), false, 2);

    // one transition per tick: costs, usage, csv, upload
    for _ in 0..4 {
        scheduler.tick().await;
    }

    assert!(scheduler.active().is_empty(), "all processes retired");

    let objects = store.objects.lock().unwrap();
    assert_eq!(objects.len(), 2);
    for offset in 1..=2 {
        let day = CalendarDay::today().add_days(-offset);
        let key = format!("kafka-cost-reports/confluent-costs/{}.csv", day.file_token());
        let body = String::from_utf8(objects[&key].clone()).unwrap();
        assert!(body.starts_with("Date,Cost,Name,ClusterId,Action,Capability\n"));
        assert!(body.contains("pub.sales-ab12e.orders"));
        assert!(body.contains("sales-ab12e"));

        let local = fs::read(tmp.path().join(format!("{}.csv", day.file_token()))).unwrap();
        assert_eq!(local, objects[&key], "uploaded bytes match the local artifact");
    }
}

#[tokio::test]
async fn days_with_existing_artifacts_are_not_rescheduled() {
    let tmp = tempfile::tempdir().unwrap();
    let yesterday = CalendarDay::today().add_days(-1);
    fs::write(
        tmp.path().join(format!("{}.csv", yesterday.file_token())),
        "Date,Cost,Name,ClusterId,Action,Capability\n",
    )
    .unwrap();

    let store = Arc::new(MemoryStore::default());
    let mut scheduler = scheduler_with(store, tmp.path(), false, 2);

    scheduler.tick().await;

    let active: Vec<_> = scheduler.active().iter().map(|p| p.day).collect();
    assert_eq!(active, vec![CalendarDay::today().add_days(-2)]);
}

#[tokio::test]
async fn billing_failure_pins_the_process_without_regressing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut scheduler = scheduler_with(store.clone(), tmp.path(), true, 1);

    let mut observed = Vec::new();
    for _ in 0..3 {
        scheduler.tick().await;
        observed.push(scheduler.active().to_vec());
    }

    for processes in &observed {
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].state, ExportState::NeedCosts);
    }
    // state indexes never go backwards across ticks
    for pair in observed.windows(2) {
        assert!(pair[1][0].state >= pair[0][0].state);
    }
    assert!(store.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn artifact_appearing_mid_flight_counts_as_exported() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut scheduler = scheduler_with(store.clone(), tmp.path(), false, 1);
    let yesterday = CalendarDay::today().add_days(-1);

    // costs, then usage
    scheduler.tick().await;
    scheduler.tick().await;
    assert_eq!(scheduler.active()[0].state, ExportState::NeedCsvExport);

    // someone else wrote the artifact in the meantime
    let path = tmp.path().join(format!("{}.csv", yesterday.file_token()));
    let existing = b"Date,Cost,Name,ClusterId,Action,Capability\n".to_vec();
    fs::write(&path, &existing).unwrap();

    scheduler.tick().await;
    assert_eq!(scheduler.active()[0].state, ExportState::NeedUpload);
    assert_eq!(fs::read(&path).unwrap(), existing, "existing bytes untouched");

    scheduler.tick().await;
    assert!(scheduler.active().is_empty());

    let objects = store.objects.lock().unwrap();
    let key = format!(
        "kafka-cost-reports/confluent-costs/{}.csv",
        yesterday.file_token()
    );
    assert_eq!(objects[&key], existing, "the pre-existing artifact is what gets uploaded");
}

#[tokio::test]
async fn empty_lookback_window_means_no_work() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut scheduler = scheduler_with(store.clone(), tmp.path(), false, 0);

    scheduler.tick().await;

    assert!(scheduler.active().is_empty());
    assert!(store.objects.lock().unwrap().is_empty());
}
