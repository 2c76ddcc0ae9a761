//! Telemetry module
//!
//! Logging and data-quality counters

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{record_quality, set_training_gauge, QualityMetric, TrainingGauge};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(
        &config.log_level,
        LogFormat::from_json_flag(config.json_logs),
    )
}
