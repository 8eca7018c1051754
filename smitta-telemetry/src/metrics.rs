//! ## smitta-telemetry::metrics
//! **Prometheus counters fed by kernel signals**
//!
//! The recorder is a `SignalListener`: the kernel forwards every emission
//! and the recorder counts the ones it knows. Handler durations and the
//! processed-event counter are updated by the kernel directly.

use prometheus::{Counter, Histogram, HistogramOpts, Registry};

use smitta_core::signal::{
    SignalEvent, SignalListener, INFECTION_EVENT_TIME, PACKET_SENT, TRAFFIC_RECONFIGURED,
};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub processed_events: Counter,
    pub infections: Counter,
    pub reconfigurations: Counter,
    pub packets_sent: Counter,
    pub bytes_sent: Counter,
    pub handler_duration: Histogram,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::try_new().expect("static metric descriptors are valid")
    }

    pub fn try_new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let processed_events =
            Counter::new("smitta_events_total", "Total events delivered by the kernel")?;
        let infections = Counter::new("smitta_infections_total", "Infection events fired")?;
        let reconfigurations = Counter::new(
            "smitta_reconfigurations_total",
            "Traffic reconfigurations applied on infection",
        )?;
        let packets_sent =
            Counter::new("smitta_packets_sent_total", "Packets emitted by traffic senders")?;
        let bytes_sent =
            Counter::new("smitta_bytes_sent_total", "Bytes emitted by traffic senders")?;

        let handler_duration = Histogram::with_opts(
            HistogramOpts::new(
                "smitta_handler_duration_ns",
                "Wall-clock time spent in one module handler",
            )
            .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0]),
        )?;

        registry.register(Box::new(processed_events.clone()))?;
        registry.register(Box::new(infections.clone()))?;
        registry.register(Box::new(reconfigurations.clone()))?;
        registry.register(Box::new(packets_sent.clone()))?;
        registry.register(Box::new(bytes_sent.clone()))?;
        registry.register(Box::new(handler_duration.clone()))?;

        Ok(Self {
            registry,
            processed_events,
            infections,
            reconfigurations,
            packets_sent,
            bytes_sent,
            handler_duration,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_processed_events(&self) {
        self.processed_events.inc();
    }
}

impl SignalListener for MetricsRecorder {
    fn receive(&mut self, event: &SignalEvent<'_>) {
        match event.name {
            INFECTION_EVENT_TIME => self.infections.inc(),
            TRAFFIC_RECONFIGURED => self.reconfigurations.inc(),
            PACKET_SENT => {
                self.packets_sent.inc();
                self.bytes_sent.inc_by(event.value.max(0) as f64);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smitta_core::entity::ModuleId;
    use smitta_core::signal::SignalRegistry;
    use smitta_core::time::SimTime;

    #[test]
    fn counts_known_signals() {
        let mut signals = SignalRegistry::new();
        let infection = signals.register(INFECTION_EVENT_TIME);
        let sent = signals.register(PACKET_SENT);
        let mut metrics = MetricsRecorder::new();

        let emit = |metrics: &mut MetricsRecorder, signal, name, value| {
            metrics.receive(&SignalEvent {
                time: SimTime::ZERO,
                source: ModuleId(0),
                source_path: "X.controller",
                signal,
                name,
                value,
            });
        };
        emit(&mut metrics, infection, INFECTION_EVENT_TIME, 3);
        emit(&mut metrics, sent, PACKET_SENT, 4096);
        emit(&mut metrics, sent, PACKET_SENT, 512);

        assert_eq!(metrics.infections.get(), 1.0);
        assert_eq!(metrics.packets_sent.get(), 2.0);
        assert_eq!(metrics.bytes_sent.get(), 4608.0);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("smitta_infections_total 1"));
    }
}
