//! Billing fetching and the per-day cost cache
//!
//! Raw billing lines are pulled for the 24 h window ending at the target
//! day's midnight and reconciled against the closed product/line-type/unit
//! enumerations. Only Kafka product lines are kept; Connect and Support are
//! recognized and discarded. Lines that fail any classification step are
//! skipped with a warning and never fail the fetch.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::billing_client::{BillingApi, BillingResponse};
use crate::error::Result;
use crate::types::{BillingLine, CalendarDay, ClusterId, CostType, CostUnit, ProductType};

/// Fetches and caches billing lines per day, keyed by (cluster, cost type).
pub struct BillingFetcher {
    client: Arc<dyn BillingApi>,
    cache: HashMap<CalendarDay, HashMap<(ClusterId, CostType), BillingLine>>,
}

impl BillingFetcher {
    /// Create a fetcher with an empty cache
    pub fn new(client: Arc<dyn BillingApi>) -> Self {
        Self {
            client,
            cache: HashMap::new(),
        }
    }

    /// Whether at least one billing line is cached for the day. A fetch that
    /// produced zero usable lines leaves the day absent, keeping it eligible
    /// for re-fetch on a later tick.
    pub fn has(&self, day: CalendarDay) -> bool {
        self.cache.contains_key(&day)
    }

    /// The cached line for (day, cluster, cost type), if any
    pub fn get(
        &self,
        day: CalendarDay,
        cluster: ClusterId,
        cost_type: CostType,
    ) -> Option<&BillingLine> {
        self.cache.get(&day)?.get(&(cluster, cost_type))
    }

    /// Query the billing API for the 24 h window ending at `day`'s midnight
    /// and cache whatever reconciles cleanly.
    pub async fn fetch_and_cache(&mut self, day: CalendarDay) -> Result<()> {
        let start = day.add_days(-1);
        let response = self.client.costs(start, day).await?;
        let lines = reconcile(response);
        if lines.is_empty() {
            warn!("billing response for {day} contained no usable Kafka lines");
        } else {
            debug!("cached {} billing lines for {day}", lines.len());
            self.cache.insert(day, lines);
        }
        Ok(())
    }
}

/// Classify a raw response into cached lines. Later duplicates of the same
/// (cluster, cost type) overwrite earlier ones.
fn reconcile(response: BillingResponse) -> HashMap<(ClusterId, CostType), BillingLine> {
    let mut lines = HashMap::new();

    for raw in response.data {
        let product = match ProductType::try_parse(&raw.product) {
            Ok(product) => product,
            Err(e) => {
                warn!("skipping billing line: {e}");
                continue;
            }
        };
        match product {
            ProductType::Kafka => {}
            // recognized, intentionally not attributed to topics
            ProductType::Connect | ProductType::Support => continue,
        }

        let cost_type = match CostType::try_parse(&raw.line_type) {
            Ok(cost_type) => cost_type,
            Err(e) => {
                warn!("skipping billing line: {e}");
                continue;
            }
        };
        let unit = match CostUnit::try_parse(&raw.unit) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("skipping {cost_type} line: {e}");
                continue;
            }
        };
        let cluster = match ClusterId::try_parse(&raw.resource.id) {
            Ok(cluster) => cluster,
            Err(e) => {
                warn!("skipping {cost_type} line: {e}");
                continue;
            }
        };

        lines.insert(
            (cluster, cost_type),
            BillingLine {
                cost_type,
                product,
                cluster,
                cost_per_unit: raw.price,
                unit,
                total_cost: raw.amount,
            },
        );
    }

    lines
}
