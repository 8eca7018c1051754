//! Staged creation of a high-rate attack application under an infected node.
//!
//! `new` → `finalize_parameters` → `build` → `initialize`, each stage a
//! distinct type. The first three stages fail with a typed `SpawnError`
//! that aborts the run. Initialization failures are logged and reported as
//! `SpawnOutcome::Degraded`; the entity stays registered but silent.

use opentelemetry::KeyValue;
use tracing::{info, warn};

use smitta_config::AttackAppConfig;
use smitta_core::entity::{ModuleId, NodeId, TrafficConfig};
use smitta_core::error::TimeError;
use smitta_core::module::{EntityParams, EntityRequest, SimContext};
use smitta_core::time::SimTime;
use smitta_telemetry::logging::EventLogger;

use crate::error::SpawnError;

/// What to spawn and with which elevated traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackProfile {
    pub type_name: String,
    pub name: String,
    pub traffic: TrafficConfig,
    pub dest_address: String,
}

impl Default for AttackProfile {
    fn default() -> Self {
        Self {
            type_name: "DDoSSender".into(),
            name: "ddosApp".into(),
            traffic: TrafficConfig {
                packet_size: 4096,
                send_interval: SimTime::from_millis(1),
            },
            dest_address: "remoteServer".into(),
        }
    }
}

impl AttackProfile {
    pub fn from_config(config: &AttackAppConfig) -> Result<Self, TimeError> {
        Ok(Self {
            type_name: config.type_name.clone(),
            name: config.name.clone(),
            traffic: config.traffic_config()?,
            dest_address: config.dest_address.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnOutcome {
    Ready { module: ModuleId, path: String },
    Degraded {
        module: ModuleId,
        path: String,
        reason: String,
    },
}

impl SpawnOutcome {
    pub fn module(&self) -> ModuleId {
        match self {
            SpawnOutcome::Ready { module, .. } | SpawnOutcome::Degraded { module, .. } => *module,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SpawnOutcome::Degraded { .. })
    }
}

pub struct Configured;

pub struct Finalized {
    params: EntityParams,
}

pub struct Built {
    module: ModuleId,
    path: String,
}

pub struct EntitySpawner<S> {
    node_id: NodeId,
    profile: AttackProfile,
    stage: S,
}

impl EntitySpawner<Configured> {
    pub fn new(node_id: NodeId, profile: AttackProfile) -> Self {
        Self {
            node_id,
            profile,
            stage: Configured,
        }
    }

    /// Fixes the entity parameters. Rejects zero packet size or interval
    /// and an empty destination.
    pub fn finalize_parameters(self) -> Result<EntitySpawner<Finalized>, SpawnError> {
        self.profile
            .traffic
            .validate()
            .map_err(|e| SpawnError::Parameters(e.to_string()))?;
        if self.profile.dest_address.is_empty() {
            return Err(SpawnError::Parameters("destination address is empty".into()));
        }
        if self.profile.name.is_empty() {
            return Err(SpawnError::Parameters("entity name is empty".into()));
        }

        let params = EntityParams {
            traffic: self.profile.traffic,
            dest_address: self.profile.dest_address.clone(),
            start_offset: SimTime::ZERO,
        };
        Ok(EntitySpawner {
            node_id: self.node_id,
            profile: self.profile,
            stage: Finalized { params },
        })
    }
}

impl EntitySpawner<Finalized> {
    /// Creates the entity under `cbrUe[node]`. The node must exist and must
    /// not already hold an entity with the profile's name.
    pub fn build(self, ctx: &mut dyn SimContext) -> Result<EntitySpawner<Built>, SpawnError> {
        let registry = ctx.registry();
        if !registry.has_node(self.node_id) {
            return Err(SpawnError::NodeNotFound {
                node_id: self.node_id,
                path: registry.node_path(self.node_id),
            });
        }
        if registry.contains(self.node_id, &self.profile.name) {
            return Err(SpawnError::Duplicate {
                node_id: self.node_id,
                name: self.profile.name.clone(),
            });
        }
        let path = registry.entity_path(self.node_id, &self.profile.name);

        let module = ctx
            .create_entity(EntityRequest {
                type_name: self.profile.type_name.clone(),
                node: self.node_id,
                name: self.profile.name.clone(),
                params: self.stage.params,
            })
            .map_err(|source| SpawnError::Build {
                type_name: self.profile.type_name.clone(),
                source,
            })?;

        info!(node_id = %self.node_id, module = %path, "Created {}", self.profile.type_name);
        Ok(EntitySpawner {
            node_id: self.node_id,
            profile: self.profile,
            stage: Built { module, path },
        })
    }
}

impl EntitySpawner<Built> {
    pub fn module_id(&self) -> ModuleId {
        self.stage.module
    }

    /// Runs the entity's initialization. Never fails the run.
    pub fn initialize(self, ctx: &mut dyn SimContext) -> SpawnOutcome {
        let Built { module, path } = self.stage;
        match ctx.initialize_entity(module) {
            Ok(()) => {
                info!(
                    node_id = %self.node_id,
                    packet_size = self.profile.traffic.packet_size,
                    send_interval = %self.profile.traffic.send_interval,
                    dest = %self.profile.dest_address,
                    "Successfully initialized {}", self.profile.type_name
                );
                EventLogger::log_event(
                    "attack_app_spawned",
                    vec![
                        KeyValue::new("node_id", i64::from(self.node_id.0)),
                        KeyValue::new("module", path.clone()),
                    ],
                );
                SpawnOutcome::Ready { module, path }
            }
            Err(e) => {
                warn!(node_id = %self.node_id, module = %path, "Attack application initialization failed: {e}");
                SpawnOutcome::Degraded {
                    module,
                    path,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use smitta_core::events::{Message, MessageKind};
    use smitta_core::module::{Module, ModuleResult};
    use smitta_simulator::apps::{CbrSender, DDOS_SENDER};
    use smitta_simulator::Simulator;
    use tracing_test::traced_test;

    use super::*;

    /// Runs the spawner for `node` when its 1 ms timer fires.
    struct Trigger {
        node: NodeId,
        profile: AttackProfile,
        result: Option<Result<SpawnOutcome, SpawnError>>,
    }

    impl Module for Trigger {
        fn type_name(&self) -> &'static str {
            "Trigger"
        }

        fn initialize(&mut self, ctx: &mut dyn SimContext) -> ModuleResult {
            ctx.schedule_at(SimTime::from_millis(1), Message::infection(self.node))?;
            Ok(())
        }

        fn handle_message(&mut self, message: Message, ctx: &mut dyn SimContext) -> ModuleResult {
            if let MessageKind::Infection { node_id } = message.kind {
                let spawned = EntitySpawner::new(node_id, self.profile.clone())
                    .finalize_parameters()
                    .and_then(|spawner| spawner.build(ctx))
                    .map(|spawner| spawner.initialize(ctx));
                self.result = Some(spawned);
            }
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn spawn(
        node: u32,
        profile: AttackProfile,
        setup: impl FnOnce(&mut Simulator),
    ) -> (Simulator, ModuleId) {
        let mut sim = Simulator::new("X");
        sim.register_type(DDOS_SENDER, CbrSender::ddos_factory());
        sim.add_host("remoteServer");
        sim.add_node(NodeId(0));
        setup(&mut sim);
        let id = sim.add_module(
            "trigger",
            Box::new(Trigger {
                node: NodeId(node),
                profile,
                result: None,
            }),
        );
        sim.run(Some(SimTime::from_millis(11))).unwrap();
        (sim, id)
    }

    fn result(sim: &Simulator, trigger: ModuleId) -> &Result<SpawnOutcome, SpawnError> {
        sim.module::<Trigger>(trigger)
            .and_then(|t| t.result.as_ref())
            .expect("trigger fired")
    }

    #[test]
    fn default_profile_matches_attack_defaults() {
        let profile = AttackProfile::default();
        assert_eq!(profile, AttackProfile::from_config(&AttackAppConfig::default()).unwrap());
        assert_eq!(profile.traffic.packet_size, 4096);
        assert_eq!(profile.traffic.send_interval, SimTime::from_nanos(1_000_000));
    }

    #[test]
    fn finalize_rejects_invalid_parameters() {
        let zero_size = AttackProfile {
            traffic: TrafficConfig {
                packet_size: 0,
                send_interval: SimTime::from_millis(1),
            },
            ..Default::default()
        };
        assert!(matches!(
            EntitySpawner::new(NodeId(0), zero_size).finalize_parameters(),
            Err(SpawnError::Parameters(_))
        ));

        let no_dest = AttackProfile {
            dest_address: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            EntitySpawner::new(NodeId(0), no_dest).finalize_parameters(),
            Err(SpawnError::Parameters(_))
        ));
    }

    #[test]
    fn spawned_sender_runs_at_elevated_rate() {
        let (sim, trigger) = spawn(0, AttackProfile::default(), |_| {});
        let outcome = result(&sim, trigger).as_ref().unwrap().clone();
        assert!(!outcome.is_degraded());
        assert_eq!(sim.registry().lookup(NodeId(0), "ddosApp"), Some(outcome.module()));
        assert_eq!(sim.path_of(outcome.module()), "X.cbrUe[0].ddosApp");

        let sender = sim.module::<CbrSender>(outcome.module()).unwrap();
        assert_eq!(sender.active_config().packet_size, 4096);
        // First packet at 1 ms, then every 1 ms up to the 11 ms limit.
        assert_eq!(sender.packets_sent(), 11);
    }

    #[test]
    fn missing_node_container_is_fatal() {
        let (sim, trigger) = spawn(4, AttackProfile::default(), |_| {});
        assert!(matches!(
            result(&sim, trigger),
            Err(SpawnError::NodeNotFound { node_id: NodeId(4), path }) if path == "X.cbrUe[4]"
        ));
    }

    #[test]
    fn existing_entity_name_is_a_duplicate() {
        let (sim, trigger) = spawn(0, AttackProfile::default(), |sim| {
            sim.add_entity(
                NodeId(0),
                "ddosApp",
                DDOS_SENDER,
                EntityParams {
                    traffic: TrafficConfig::default(),
                    dest_address: "remoteServer".into(),
                    start_offset: SimTime::ZERO,
                },
            )
            .unwrap();
        });
        let err = result(&sim, trigger).as_ref().unwrap_err();
        assert!(matches!(err, SpawnError::Duplicate { node_id: NodeId(0), name } if name == "ddosApp"));
        assert_eq!(err.to_string(), "Application module 'ddosApp' already exists for node 0");
    }

    #[test]
    fn unknown_type_fails_build() {
        let profile = AttackProfile {
            type_name: "UdpFlood".into(),
            ..Default::default()
        };
        let (sim, trigger) = spawn(0, profile, |_| {});
        assert!(matches!(
            result(&sim, trigger),
            Err(SpawnError::Build { type_name, .. }) if type_name == "UdpFlood"
        ));
        assert_eq!(sim.registry().lookup(NodeId(0), "ddosApp"), None);
    }

    #[traced_test]
    #[test]
    fn initialization_failure_is_degraded() {
        let profile = AttackProfile {
            dest_address: "unknownHost".into(),
            ..Default::default()
        };
        let (sim, trigger) = spawn(0, profile, |_| {});
        let outcome = result(&sim, trigger).as_ref().unwrap().clone();
        let SpawnOutcome::Degraded { module, reason, .. } = outcome else {
            panic!("expected a degraded spawn");
        };
        assert!(reason.contains("unknownHost"));
        assert_eq!(sim.registry().lookup(NodeId(0), "ddosApp"), Some(module));
        assert_eq!(sim.module::<CbrSender>(module).unwrap().packets_sent(), 0);
        assert!(logs_contain("Attack application initialization failed"));
    }
}
