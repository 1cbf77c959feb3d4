//! Cost calculation for usage samples
//!
//! Maps one observed byte value and one billing line to a dollar amount.
//! Throughput is priced per GB moved; storage is priced per GB-hour held,
//! for a full day, times the replication factor (retained data is billed
//! per physically replicated copy).

use tracing::warn;

use crate::types::{BillingLine, CostType, CostUnit, STORAGE_REPLICATION_FACTOR};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Price `sample_bytes` against `line`.
///
/// Units outside the modeled set are an unknown pricing case: they
/// contribute zero and are logged rather than silently absorbed into totals.
pub fn sample_cost(sample_bytes: f64, line: &BillingLine) -> f64 {
    let gb = sample_bytes / BYTES_PER_GB;
    match line.unit {
        CostUnit::Gb => gb * line.cost_per_unit,
        CostUnit::GbHour => {
            let day_cost = gb * line.cost_per_unit * 24.0;
            if line.cost_type == CostType::KafkaStorage {
                day_cost * STORAGE_REPLICATION_FACTOR
            } else {
                day_cost
            }
        }
        other => {
            warn!(
                "no cost model for unit {other} on {} lines, counting zero",
                line.cost_type
            );
            0.0
        }
    }
}
