//! Error types for confcost
//!
//! One `thiserror`-derived enum covers the whole pipeline. Parse and
//! classification failures carry the offending wire value so the skip-with-
//! warning call sites can log something actionable.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{CalendarDay, ClusterId, MetricKind, TopicName};

/// Main error type for confcost operations
#[derive(Error, Debug)]
pub enum ConfcostError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network error
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A collaborator answered with a non-success status
    #[error("{context} returned status {status}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Which collaborator answered
        context: &'static str,
    },

    /// Cluster id not present in the static registry
    #[error("unknown cluster id: {0}")]
    UnknownClusterId(String),

    /// Unparseable billing line type
    #[error("unknown cost type: {0}")]
    UnknownCostType(String),

    /// Unparseable billing unit
    #[error("unknown cost unit: {0}")]
    UnknownCostUnit(String),

    /// Unparseable billed product
    #[error("unknown product type: {0}")]
    UnknownProductType(String),

    /// Usage was requested for a day that has not finished yet
    #[error("usage data for {0} is not complete yet")]
    DayNotComplete(CalendarDay),

    /// The data source returned the same series twice in one query
    #[error("duplicate sample for metric {metric}, cluster {cluster}, topic {topic}")]
    DuplicateSample {
        metric: MetricKind,
        cluster: ClusterId,
        topic: TopicName,
    },

    /// A CSV artifact is already present for the day
    #[error("artifact already exists: {0}")]
    ArtifactExists(PathBuf),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results in confcost
pub type Result<T> = std::result::Result<T, ConfcostError>;
