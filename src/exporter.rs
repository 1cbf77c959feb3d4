//! The per-day export state machine and its scheduler
//!
//! Every calendar day in the lookback window gets one [`ExportProcess`] that
//! walks forward through cost-fetch, usage-fetch, CSV render and upload.
//! The scheduler advances each active process by exactly one transition per
//! tick; a process that cannot advance stays where it is and is retried on
//! the next tick, without limit and without backoff. Daily batch reporting
//! tolerates eventual consistency over hours, so progress-or-wait is the
//! whole error model here.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::aggregation::CapabilityRollup;
use crate::artifact_store::ArtifactStore;
use crate::billing_fetcher::BillingFetcher;
use crate::error::ConfcostError;
use crate::report::ReportWriter;
use crate::types::CalendarDay;
use crate::usage_fetcher::UsageFetcher;

/// Pipeline states in strict forward order. A process never regresses and
/// never skips ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExportState {
    NeedCosts,
    NeedUsageData,
    NeedCsvExport,
    NeedUpload,
    Done,
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportState::NeedCosts => "NEED_COSTS",
            ExportState::NeedUsageData => "NEED_USAGE_DATA",
            ExportState::NeedCsvExport => "NEED_CSV_EXPORT",
            ExportState::NeedUpload => "NEED_UPLOAD",
            ExportState::Done => "DONE",
        };
        write!(f, "{name}")
    }
}

/// One day's pipeline instance: identity plus state, nothing else. All
/// derived data lives in the scheduler's caches, so processes are cheap to
/// re-create from scratch after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProcess {
    pub day: CalendarDay,
    pub state: ExportState,
}

impl ExportProcess {
    /// A fresh process at the head of the pipeline
    pub fn new(day: CalendarDay) -> Self {
        Self {
            day,
            state: ExportState::NeedCosts,
        }
    }
}

/// Scheduler knobs, owned by bootstrap and handed in at construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Seconds to sleep between ticks
    pub interval: Duration,
    /// How many days back (ending yesterday) to consider for export
    pub days_to_look_back: u32,
    /// Whether to also consult remote storage for existing exports.
    /// Accepted but not implemented; the local artifact is the only
    /// idempotency marker.
    pub check_remote_exports: bool,
    /// Destination bucket for uploads
    pub bucket: String,
    /// Key prefix for uploaded artifacts
    pub key_prefix: String,
}

/// Drives all active [`ExportProcess`]es. Owns both caches; everything runs
/// on one cooperative task, so no synchronization is needed as long as
/// nothing else touches the scheduler's state.
pub struct ExportScheduler {
    usage: UsageFetcher,
    costs: BillingFetcher,
    store: Arc<dyn ArtifactStore>,
    writer: ReportWriter,
    config: WorkerConfig,
    active: Vec<ExportProcess>,
}

impl ExportScheduler {
    /// Assemble a scheduler with an empty active set
    pub fn new(
        usage: UsageFetcher,
        costs: BillingFetcher,
        store: Arc<dyn ArtifactStore>,
        writer: ReportWriter,
        config: WorkerConfig,
    ) -> Self {
        Self {
            usage,
            costs,
            store,
            writer,
            config,
            active: Vec::new(),
        }
    }

    /// Tick forever, sleeping the configured interval in between.
    pub async fn run(mut self) -> crate::Result<()> {
        info!(
            "starting export scheduler: tick every {}s, looking back {} days",
            self.config.interval.as_secs(),
            self.config.days_to_look_back
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.config.interval).await;
            debug!("woke up, checking for work");
        }
    }

    /// One scheduler pass: derive pending work if idle, then advance every
    /// active process by at most one transition and keep the survivors.
    pub async fn tick(&mut self) {
        if self.active.is_empty() {
            self.active = self.derive_pending();
            if self.active.is_empty() {
                info!("no export work to do");
                return;
            }
        }

        let processes = std::mem::take(&mut self.active);
        let mut survivors = Vec::with_capacity(processes.len());
        for process in processes {
            let advanced = self.advance(process).await;
            debug_assert!(advanced.state >= process.state);
            if advanced.state == ExportState::Done {
                info!("export for {} complete", advanced.day);
            } else {
                survivors.push(advanced);
            }
        }
        self.active = survivors;
    }

    /// Days in the lookback window, newest first, that have no local
    /// artifact yet.
    fn derive_pending(&self) -> Vec<ExportProcess> {
        if self.config.check_remote_exports {
            error!("checking remote storage for exported data is not implemented yet");
        }

        info!(
            "checking locally for exported data for the last {} days",
            self.config.days_to_look_back
        );
        let today = CalendarDay::today();
        (1..=i64::from(self.config.days_to_look_back))
            .map(|i| today.add_days(-i))
            .filter(|day| !self.writer.has_artifact(*day))
            .map(ExportProcess::new)
            .collect()
    }

    /// Attempt exactly one forward transition. Failures leave the state
    /// untouched; the process is retried on the next tick.
    async fn advance(&mut self, process: ExportProcess) -> ExportProcess {
        let day = process.day;
        let state = match process.state {
            ExportState::NeedCosts => {
                if !self.costs.has(day) {
                    if let Err(e) = self.costs.fetch_and_cache(day).await {
                        warn!("unable to fetch costs for {day}: {e}");
                    }
                }
                if self.costs.has(day) {
                    info!("found billing costs for {day}");
                    ExportState::NeedUsageData
                } else {
                    warn!("billing costs for {day} still unavailable, will retry");
                    ExportState::NeedCosts
                }
            }
            ExportState::NeedUsageData => match self.usage.snapshot(day).await {
                Ok(_) => {
                    info!("found usage data for {day}");
                    ExportState::NeedCsvExport
                }
                Err(e) => {
                    warn!("unable to fetch usage data for {day}: {e}");
                    ExportState::NeedUsageData
                }
            },
            ExportState::NeedCsvExport => match self.usage.snapshot(day).await {
                Ok(snapshot) => {
                    let rollup = CapabilityRollup::from_snapshot(day, snapshot);
                    match self.writer.write(&rollup, &self.costs) {
                        Ok(path) => {
                            info!("wrote csv for {day} to {}", path.display());
                            ExportState::NeedUpload
                        }
                        Err(ConfcostError::ArtifactExists(path)) => {
                            info!(
                                "csv for {day} already present at {}, skipping render",
                                path.display()
                            );
                            ExportState::NeedUpload
                        }
                        Err(e) => {
                            warn!("unable to write csv for {day}: {e}");
                            ExportState::NeedCsvExport
                        }
                    }
                }
                Err(e) => {
                    warn!("usage data for {day} went missing before render: {e}");
                    ExportState::NeedCsvExport
                }
            },
            ExportState::NeedUpload => match self.writer.read_raw(day) {
                Ok(bytes) => {
                    let key = format!("{}/{}.csv", self.config.key_prefix, day.file_token());
                    match self.store.put(&self.config.bucket, &key, bytes).await {
                        Ok(()) => {
                            info!("uploaded csv for {day} to {}/{key}", self.config.bucket);
                            ExportState::Done
                        }
                        Err(e) => {
                            warn!("unable to upload csv for {day}: {e}");
                            ExportState::NeedUpload
                        }
                    }
                }
                Err(e) => {
                    warn!("unable to read csv back for {day}: {e}");
                    ExportState::NeedUpload
                }
            },
            ExportState::Done => ExportState::Done,
        };

        ExportProcess { day, state }
    }

    /// The processes still in flight
    pub fn active(&self) -> &[ExportProcess] {
        &self.active
    }
}
