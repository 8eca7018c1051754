//! Turns an infection schedule into timed kernel events.

use tracing::{debug, info};

use smitta_core::events::Message;
use smitta_core::module::SimContext;

use crate::error::ControllerError;
use crate::schedule::InfectionSchedule;

/// Submits one self-addressed infection event per entry and returns how
/// many were submitted.
///
/// Every activation time must lie strictly after the current instant. All
/// entries are checked before the first submission, so a rejected schedule
/// leaves the event queue untouched.
pub fn schedule_infections(
    schedule: &InfectionSchedule,
    ctx: &mut dyn SimContext,
) -> Result<usize, ControllerError> {
    let now = ctx.now();
    if let Some(entry) = schedule.iter().find(|entry| entry.activation_time <= now) {
        return Err(ControllerError::PastSchedule {
            node_id: entry.node_id,
            at: entry.activation_time,
            now,
        });
    }

    for entry in schedule.iter() {
        ctx.schedule_at(entry.activation_time, Message::infection(entry.node_id))?;
        debug!(node_id = %entry.node_id, at = %entry.activation_time, "Infection event scheduled");
    }
    info!(count = schedule.len(), "Infection events scheduled");
    Ok(schedule.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    use smitta_core::entity::{EntityRegistry, ModuleId, NodeId, TrafficApp};
    use smitta_core::error::SimulationError;
    use smitta_core::events::MessageKind;
    use smitta_core::module::EntityRequest;
    use smitta_core::signal::{SignalId, SignalRegistry};
    use smitta_core::time::SimTime;

    use crate::schedule::InfectionEntry;

    /// Context that only records what gets scheduled.
    struct RecordingContext {
        pub now: SimTime,
        pub scheduled: Vec<(SimTime, Message)>,
        registry: EntityRegistry,
        signals: SignalRegistry,
    }

    impl RecordingContext {
        pub fn at(now: SimTime) -> Self {
            Self {
                now,
                scheduled: Vec::new(),
                registry: EntityRegistry::new("X"),
                signals: SignalRegistry::new(),
            }
        }
    }

    impl SimContext for RecordingContext {
        fn now(&self) -> SimTime {
            self.now
        }

        fn module_id(&self) -> ModuleId {
            ModuleId(0)
        }

        fn module_path(&self) -> &str {
            "X.trafficController"
        }

        fn schedule_at(&mut self, at: SimTime, message: Message) -> Result<(), SimulationError> {
            if at < self.now {
                return Err(SimulationError::PastEvent { at, now: self.now });
            }
            self.scheduled.push((at, message));
            Ok(())
        }

        fn send_direct(&mut self, _target: ModuleId, _message: Message) {}

        fn register_signal(&mut self, name: &str) -> SignalId {
            self.signals.register(name)
        }

        fn emit(&mut self, _signal: SignalId, _value: i64) {}

        fn registry(&self) -> &EntityRegistry {
            &self.registry
        }

        fn traffic_app(&mut self, _target: ModuleId) -> Option<&mut dyn TrafficApp> {
            None
        }

        fn create_entity(&mut self, request: EntityRequest) -> Result<ModuleId, SimulationError> {
            Err(SimulationError::UnknownEntityType(request.type_name))
        }

        fn initialize_entity(&mut self, target: ModuleId) -> Result<(), SimulationError> {
            Err(SimulationError::UnknownModule(target))
        }

        fn resolve_address(&self, _name: &str) -> bool {
            false
        }
    }

    fn entry(node: u32, ms: u64) -> InfectionEntry {
        InfectionEntry {
            node_id: NodeId(node),
            activation_time: SimTime::from_millis(ms),
        }
    }

    #[test]
    fn submits_one_event_per_entry() {
        let schedule = InfectionSchedule::new(vec![entry(3, 5_000), entry(1, 2_000), entry(3, 7_000)]);
        let mut ctx = RecordingContext::at(SimTime::ZERO);

        assert_eq!(schedule_infections(&schedule, &mut ctx).unwrap(), 3);
        let submitted: Vec<(u64, NodeId)> = ctx
            .scheduled
            .iter()
            .map(|(at, message)| match message.kind {
                MessageKind::Infection { node_id } => (at.as_nanos() / 1_000_000, node_id),
                ref other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            submitted,
            vec![(5_000, NodeId(3)), (2_000, NodeId(1)), (7_000, NodeId(3))]
        );
        assert!(ctx.scheduled.iter().all(|(_, m)| m.is_self_message()));
    }

    #[test]
    fn activation_at_now_is_rejected() {
        let schedule = InfectionSchedule::new(vec![entry(1, 1_000), entry(2, 0)]);
        let mut ctx = RecordingContext::at(SimTime::ZERO);

        let err = schedule_infections(&schedule, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::PastSchedule { node_id: NodeId(2), at, now } if at == SimTime::ZERO && now == SimTime::ZERO
        ));
        assert!(ctx.scheduled.is_empty());
    }

    #[test]
    fn sub_nanosecond_activation_is_submitted() {
        let schedule = InfectionSchedule::from_json_str(
            r#"{"infectionData":[{"node_id":0,"malware_active_time":1e-10}]}"#,
        )
        .unwrap();
        let mut ctx = RecordingContext::at(SimTime::ZERO);

        assert_eq!(schedule_infections(&schedule, &mut ctx).unwrap(), 1);
        assert_eq!(ctx.scheduled[0].0, SimTime::from_nanos(1));
    }

    #[test]
    fn empty_schedule_submits_nothing() {
        let mut ctx = RecordingContext::at(SimTime::ZERO);
        assert_eq!(schedule_infections(&InfectionSchedule::default(), &mut ctx).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn non_future_entries_are_always_rejected(
            now_ms in 0u64..1_000_000,
            back_ms in 0u64..1_000_000,
            future in proptest::collection::vec(1u64..1_000_000, 0..8),
        ) {
            let past_ms = now_ms.saturating_sub(back_ms);
            let mut entries: Vec<InfectionEntry> =
                future.iter().map(|ahead| entry(1, now_ms + ahead)).collect();
            let position = entries.len() / 2;
            entries.insert(position, entry(9, past_ms));

            let mut ctx = RecordingContext::at(SimTime::from_millis(now_ms));
            let result = schedule_infections(&InfectionSchedule::new(entries), &mut ctx);

            let rejected = matches!(result, Err(ControllerError::PastSchedule { node_id: NodeId(9), .. }));
            prop_assert!(rejected);
            prop_assert!(ctx.scheduled.is_empty());
        }

        #[test]
        fn future_entries_are_all_submitted(
            now_ms in 0u64..1_000_000,
            ahead in proptest::collection::vec(1u64..1_000_000, 0..16),
        ) {
            let entries: Vec<InfectionEntry> =
                ahead.iter().enumerate().map(|(i, a)| entry(i as u32, now_ms + a)).collect();
            let mut ctx = RecordingContext::at(SimTime::from_millis(now_ms));

            let submitted = schedule_infections(&InfectionSchedule::new(entries), &mut ctx).unwrap();
            prop_assert_eq!(submitted, ahead.len());
            prop_assert_eq!(ctx.scheduled.len(), ahead.len());
        }
    }
}
