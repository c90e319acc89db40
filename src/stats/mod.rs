//! Statistics and metrics for the device fleet

pub mod metrics;

pub use metrics::{FleetStats, FleetStatsSnapshot};
