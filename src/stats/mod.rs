//! Statistics for the broadcast engine and the server

pub mod metrics;

pub use metrics::{EngineMetrics, EngineStats, ServerMetrics, ServerStats};
