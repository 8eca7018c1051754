// smitta-simulator/src/lib.rs

/*!
# Smitta Simulator

Single-threaded discrete-event kernel hosting the infection controller and
the traffic senders it reconfigures.

## Key Components:
- **Virtual Clock:** Simulated time with nanosecond precision, shared via `Arc`.
- **Future-Event Set:** Events delivered in time order, ties in submission order.
- **Entity Registry:** Node containers and their named traffic entities.
- **Signals & Results:** Emitted values fan out to listeners and the `.vec` recorder.
- **Lifecycle:** Listeners notified once when the run ends.

Every delivered event is fed into a BLAKE3 hasher, so two runs with the same
inputs produce the same fingerprint.
*/

use std::time::Instant;

use blake3::Hasher;
use tracing::{error, info, warn};

use smitta_core::entity::{EntityRegistry, ModuleId, NodeId};
use smitta_core::error::SimulationError;
use smitta_core::module::{EntityParams, EntityRequest, Module};
use smitta_core::signal::SignalListener;
use smitta_core::time::{SimTime, VirtualClock};
use smitta_telemetry::metrics::MetricsRecorder;

pub mod apps;
mod kernel;
pub mod lifecycle;
pub mod results;
pub mod topology;

pub use kernel::EntityFactory;
pub use lifecycle::{LifecycleListener, RunOutcome, RunSummary};
pub use results::VectorRecorder;

use kernel::Kernel;

/// Owns the kernel and drives the event loop.
pub struct Simulator {
    kernel: Kernel,
    lifecycle: Vec<Box<dyn LifecycleListener>>,
    metrics: Option<MetricsRecorder>,
    pub state_hasher: Hasher,
    events_processed: u64,
}

impl Simulator {
    pub fn new(network: &str) -> Self {
        Self {
            kernel: Kernel::new(network),
            lifecycle: Vec::new(),
            metrics: None,
            state_hasher: Hasher::new(),
            events_processed: 0,
        }
    }

    /// Makes `type_name` instantiable through `create_entity`.
    pub fn register_type(&mut self, type_name: &str, factory: EntityFactory) {
        self.kernel.factories.insert(type_name.to_string(), factory);
    }

    /// Declares a destination host senders can resolve.
    pub fn add_host(&mut self, name: &str) {
        self.kernel.hosts.insert(name.to_string());
    }

    /// Creates the `cbrUe[node]` container.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        self.kernel.registry.add_node(node)
    }

    /// Instantiates a registered entity type under `node`.
    pub fn add_entity(
        &mut self,
        node: NodeId,
        name: &str,
        type_name: &str,
        params: EntityParams,
    ) -> Result<ModuleId, SimulationError> {
        self.kernel.create_entity(EntityRequest {
            type_name: type_name.to_string(),
            node,
            name: name.to_string(),
            params,
        })
    }

    /// Adds a network-level module at `<network>.<name>`.
    pub fn add_module(&mut self, name: &str, module: Box<dyn Module>) -> ModuleId {
        let path = format!("{}.{}", self.kernel.registry.network(), name);
        self.kernel.push_slot(path, module)
    }

    pub fn subscribe(&mut self, listener: Box<dyn SignalListener>) {
        self.kernel.listeners.push(listener);
    }

    pub fn add_lifecycle_listener(&mut self, listener: Box<dyn LifecycleListener>) {
        self.lifecycle.push(listener);
    }

    /// Counts events and handler time, and subscribes the recorder to signals.
    pub fn with_metrics(&mut self, metrics: MetricsRecorder) {
        self.subscribe(Box::new(metrics.clone()));
        self.metrics = Some(metrics);
    }

    pub fn record_vectors(&mut self, recorder: VectorRecorder) {
        self.kernel.recorder = Some(recorder);
    }

    pub fn vectors(&self) -> Option<&VectorRecorder> {
        self.kernel.recorder.as_ref()
    }

    pub fn clock(&self) -> VirtualClock {
        self.kernel.clock.clone()
    }

    pub fn now(&self) -> SimTime {
        self.kernel.clock.now()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.kernel.registry
    }

    pub fn path_of(&self, id: ModuleId) -> &str {
        self.kernel.path_of(id)
    }

    /// Downcasts a module for inspection.
    pub fn module<T: 'static>(&self, id: ModuleId) -> Option<&T> {
        self.kernel
            .slots
            .get(id.0)?
            .module
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn pending_events(&self) -> usize {
        self.kernel.queue.len()
    }

    /// Runs the initialization stage of every module not yet initialized,
    /// in creation order.
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        let mut index = 0;
        while index < self.kernel.slots.len() {
            let id = ModuleId(index);
            self.kernel
                .initialize_module(id)
                .map_err(|source| SimulationError::Module {
                    module: self.kernel.path_of(id).to_string(),
                    time: self.kernel.clock.now(),
                    source,
                })?;
            index += 1;
        }
        Ok(())
    }

    /// Initializes, then delivers events until the queue drains or the next
    /// event lies beyond `limit`. A module error aborts the run.
    pub fn run(&mut self, limit: Option<SimTime>) -> Result<RunSummary, SimulationError> {
        info!(
            network = self.kernel.registry.network(),
            limit = ?limit.map(|l| l.as_secs_f64()),
            "Simulation started"
        );
        if let Err(e) = self.initialize() {
            return Err(self.abort(e));
        }

        while let Some(next) = self.kernel.queue.peek_time() {
            if let Some(limit) = limit {
                if next > limit {
                    self.kernel.clock.advance_to(limit);
                    break;
                }
            }
            let Some(event) = self.kernel.queue.pop() else {
                break;
            };
            self.kernel.clock.advance_to(event.at);

            self.state_hasher.update(&event.at.as_nanos().to_le_bytes());
            self.state_hasher.update(&(event.target.0 as u64).to_le_bytes());
            self.state_hasher.update(event.message.name().as_bytes());

            let started = Instant::now();
            let result = self.kernel.deliver(event.target, event.message);
            self.events_processed += 1;
            if let Some(metrics) = &self.metrics {
                metrics.inc_processed_events();
                metrics
                    .handler_duration
                    .observe(started.elapsed().as_nanos() as f64);
            }

            if let Err(source) = result {
                let err = SimulationError::Module {
                    module: self.kernel.path_of(event.target).to_string(),
                    time: event.at,
                    source,
                };
                return Err(self.abort(err));
            }
        }

        for index in 0..self.kernel.slots.len() {
            self.kernel.finish_module(ModuleId(index));
        }

        let summary = self.end_run(RunOutcome::Completed);
        info!(
            end_time = %summary.end_time,
            events = summary.events_processed,
            fingerprint = %summary.fingerprint,
            "Simulation completed"
        );
        Ok(summary)
    }

    fn abort(&mut self, err: SimulationError) -> SimulationError {
        error!(time = %self.kernel.clock.now(), "Simulation aborted: {err}");
        self.end_run(RunOutcome::Aborted(err.to_string()));
        err
    }

    fn end_run(&mut self, outcome: RunOutcome) -> RunSummary {
        let result_file = self.kernel.recorder.as_ref().and_then(|recorder| {
            match recorder.write() {
                Ok(()) => Some(recorder.path().to_path_buf()),
                Err(e) => {
                    warn!(path = %recorder.path().display(), "Failed to write result vectors: {e}");
                    None
                }
            }
        });
        let summary = RunSummary {
            outcome,
            end_time: self.kernel.clock.now(),
            events_processed: self.events_processed,
            fingerprint: hex::encode(self.state_hasher.finalize().as_bytes()),
            result_file,
        };
        for listener in self.lifecycle.iter_mut() {
            listener.on_run_end(&summary);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    use smitta_core::events::{Message, MessageKind};
    use smitta_core::module::{ModuleResult, SimContext};
    use smitta_core::signal::{SignalEvent, SignalId};
    use tracing_test::traced_test;

    use super::*;

    /// Records delivery times of its own timers; fails on node 99.
    #[derive(Default)]
    struct Probe {
        times: Vec<(SimTime, u32)>,
        schedule: Vec<(u64, u32)>,
        signal: Option<SignalId>,
    }

    impl Module for Probe {
        fn type_name(&self) -> &'static str {
            "Probe"
        }

        fn initialize(&mut self, ctx: &mut dyn SimContext) -> ModuleResult {
            self.signal = Some(ctx.register_signal("probe"));
            for (ms, node) in &self.schedule {
                ctx.schedule_at(SimTime::from_millis(*ms), Message::infection(NodeId(*node)))?;
            }
            Ok(())
        }

        fn handle_message(&mut self, message: Message, ctx: &mut dyn SimContext) -> ModuleResult {
            let MessageKind::Infection { node_id } = message.kind else {
                return Ok(());
            };
            if node_id == NodeId(99) {
                return Err("probe failure".into());
            }
            self.times.push((ctx.now(), node_id.0));
            if let Some(signal) = self.signal {
                ctx.emit(signal, i64::from(node_id.0));
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn probe(schedule: &[(u64, u32)]) -> Box<Probe> {
        Box::new(Probe {
            schedule: schedule.to_vec(),
            ..Default::default()
        })
    }

    #[derive(Clone, Default)]
    struct Outcomes(Arc<Mutex<Vec<RunOutcome>>>);

    impl LifecycleListener for Outcomes {
        fn on_run_end(&mut self, summary: &RunSummary) {
            self.0.lock().unwrap().push(summary.outcome.clone());
        }
    }

    struct Collect(Arc<Mutex<Vec<i64>>>);

    impl SignalListener for Collect {
        fn receive(&mut self, event: &SignalEvent<'_>) {
            self.0.lock().unwrap().push(event.value);
        }
    }

    #[test]
    fn delivers_in_time_order_with_stable_ties() {
        let mut sim = Simulator::new("X");
        let id = sim.add_module("probe", probe(&[(300, 1), (100, 2), (300, 3), (200, 4)]));
        let summary = sim.run(None).unwrap();

        let probe = sim.module::<Probe>(id).unwrap();
        let order: Vec<u32> = probe.times.iter().map(|(_, node)| *node).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(summary.events_processed, 4);
        assert_eq!(summary.end_time, SimTime::from_millis(300));
        assert!(summary.outcome.is_completed());
    }

    #[test]
    fn stops_at_time_limit() {
        let mut sim = Simulator::new("X");
        let id = sim.add_module("probe", probe(&[(100, 1), (2_000, 2)]));
        let summary = sim.run(Some(SimTime::from_millis(1_000))).unwrap();

        assert_eq!(sim.module::<Probe>(id).unwrap().times.len(), 1);
        assert_eq!(summary.end_time, SimTime::from_millis(1_000));
        assert_eq!(sim.pending_events(), 1);
    }

    #[test]
    fn signals_reach_listeners() {
        let values = Arc::new(Mutex::new(Vec::new()));
        let mut sim = Simulator::new("X");
        sim.subscribe(Box::new(Collect(values.clone())));
        sim.add_module("probe", probe(&[(1, 7), (2, 8)]));
        sim.run(None).unwrap();
        assert_eq!(*values.lock().unwrap(), vec![7, 8]);
    }

    #[traced_test]
    #[test]
    fn module_error_aborts_and_notifies_lifecycle() {
        let outcomes = Outcomes::default();
        let mut sim = Simulator::new("X");
        sim.add_lifecycle_listener(Box::new(outcomes.clone()));
        let id = sim.add_module("probe", probe(&[(100, 1), (200, 99), (300, 2)]));

        let err = sim.run(None).unwrap_err();
        assert!(matches!(
            &err,
            SimulationError::Module { module, time, .. }
                if module == "X.probe" && *time == SimTime::from_millis(200)
        ));
        assert_eq!(err.module_source().unwrap().to_string(), "probe failure");
        assert_eq!(sim.module::<Probe>(id).unwrap().times.len(), 1);

        let outcomes = outcomes.0.lock().unwrap();
        assert!(matches!(outcomes.as_slice(), [RunOutcome::Aborted(_)]));
        assert!(logs_contain("Simulation aborted"));
    }

    #[test]
    fn identical_runs_share_a_fingerprint() {
        let fingerprint = |schedule: &[(u64, u32)]| {
            let mut sim = Simulator::new("X");
            sim.add_module("probe", probe(schedule));
            sim.run(None).unwrap().fingerprint
        };
        let a = fingerprint(&[(100, 1), (200, 2)]);
        assert_eq!(a, fingerprint(&[(100, 1), (200, 2)]));
        assert_ne!(a, fingerprint(&[(100, 1), (250, 2)]));
    }

    #[test]
    fn metrics_count_delivered_events() {
        let metrics = MetricsRecorder::new();
        let mut sim = Simulator::new("X");
        sim.with_metrics(metrics.clone());
        sim.add_module("probe", probe(&[(1, 1), (2, 2), (3, 3)]));
        sim.run(None).unwrap();
        assert_eq!(metrics.processed_events.get(), 3.0);
    }
}
