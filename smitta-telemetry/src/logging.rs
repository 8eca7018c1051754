//! ## smitta-telemetry::logging
//! **Structured logging with tracing and OpenTelemetry key/values**
//!
//! `EventLogger::init` installs the process-wide subscriber; `log_event`
//! records one scenario event (infection, reconfiguration, spawn) inside
//! its own span so collectors can filter on `event_type`.

use opentelemetry::KeyValue;
use tracing::info_span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    pub fn init() {
        Self::init_with_level("info")
    }

    /// Installs the subscriber; `RUST_LOG` takes precedence over `level`.
    /// A second call is a no-op.
    pub fn init_with_level(level: &str) {
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_thread_names(true)
            .with_span_events(FmtSpan::NONE)
            .try_init();
    }

    #[inline]
    pub fn log_event(event_type: &str, metadata: Vec<KeyValue>) {
        let span = info_span!(
            "scenario_event",
            event_type = event_type,
            otel.kind = "INTERNAL"
        );
        let _guard = span.enter();
        tracing::info!(metadata = ?metadata, "Scenario event occurred");
    }
}
