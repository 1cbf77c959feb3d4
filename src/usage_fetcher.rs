//! Usage fetching and the per-day snapshot cache
//!
//! A day's usage is gathered once from the time-series backend and then
//! served from memory for the rest of the process lifetime. Storage metrics
//! are read as a point-in-time gauge at the day's midnight; throughput
//! metrics are summed over the trailing 24 h window. Both are anchored with
//! an offset computed from the elapsed seconds between "now" and the day's
//! midnight, so the queries stay correct regardless of when inside a tick
//! they run.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ConfcostError, Result};
use crate::metrics_client::MetricsQuery;
use crate::types::{CalendarDay, ClusterId, DaySnapshot, MetricKind, TopicName, UsageSample};

/// Fetches and caches one immutable [`DaySnapshot`] per day.
pub struct UsageFetcher {
    client: Arc<dyn MetricsQuery>,
    cache: HashMap<CalendarDay, DaySnapshot>,
}

impl UsageFetcher {
    /// Create a fetcher with an empty cache
    pub fn new(client: Arc<dyn MetricsQuery>) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    /// The snapshot for `day`, fetching and freezing it on first request.
    ///
    /// Fails without caching anything if the day is not strictly in the
    /// past, if the backend is unreachable, or if it returns a duplicate
    /// series (a contract breach, never silently overwritten).
    pub async fn snapshot(&mut self, day: CalendarDay) -> Result<&DaySnapshot> {
        if !self.cache.contains_key(&day) {
            let snapshot = fetch_day(self.client.as_ref(), day, Utc::now()).await?;
            self.cache.insert(day, snapshot);
        }
        Ok(&self.cache[&day])
    }

    /// Whether the day is already cached
    pub fn is_cached(&self, day: CalendarDay) -> bool {
        self.cache.contains_key(&day)
    }
}

/// The instant query for one metric, anchored `offset_secs` before the
/// evaluation timestamp.
fn query_for_metric(kind: MetricKind, offset_secs: i64) -> String {
    if kind.is_storage() {
        format!("{} offset {}s", kind.series(), offset_secs)
    } else {
        format!("sum_over_time({}[1d] offset {}s)", kind.series(), offset_secs)
    }
}

/// Gather all metrics for `day`, evaluated at `now`.
async fn fetch_day(
    client: &dyn MetricsQuery,
    day: CalendarDay,
    now: DateTime<Utc>,
) -> Result<DaySnapshot> {
    let offset_secs = (now - day.to_timestamp()).num_seconds();
    if offset_secs <= 0 {
        return Err(ConfcostError::DayNotComplete(day));
    }

    let mut snapshot = DaySnapshot::new();
    for kind in MetricKind::ALL {
        let query = query_for_metric(kind, offset_secs);
        debug!("querying usage backend with: {query}");
        let samples = client.query(&query, now).await?;

        for sample in samples {
            let cluster = match ClusterId::try_parse(&sample.metric.kafka_id) {
                Ok(cluster) => cluster,
                Err(e) => {
                    warn!("dropping sample for topic {}: {e}", sample.metric.topic);
                    continue;
                }
            };
            let bytes: f64 = match sample.value.1.parse() {
                Ok(value) => value,
                Err(_) => {
                    warn!(
                        "dropping sample with malformed value {:?} for topic {} on {cluster}",
                        sample.value.1, sample.metric.topic
                    );
                    continue;
                }
            };
            let Some(at) = DateTime::from_timestamp(sample.value.0 as i64, 0) else {
                warn!(
                    "dropping sample with out-of-range timestamp {} for topic {}",
                    sample.value.0, sample.metric.topic
                );
                continue;
            };

            snapshot.insert(
                kind,
                cluster,
                TopicName::new(sample.metric.topic),
                UsageSample { at, bytes },
            )?;
        }
    }

    Ok(snapshot)
}
