//! Observability configuration.
//!
//! Parameters for system instrumentation:
//! - Log filtering
//! - Metrics collection

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Telemetry configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[validate(custom(function = validation::validate_log_level))]
    pub log_level: String,

    /// Collect prometheus metrics from kernel signals.
    pub metrics: bool,

    /// Print the metrics exposition at the end of the run.
    pub print_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            metrics: true,
            print_metrics: false,
        }
    }
}
