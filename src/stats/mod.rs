//! Hub-wide counters

pub mod metrics;

pub use metrics::{HubStats, StatsSnapshot};
