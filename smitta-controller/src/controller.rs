//! The traffic reconfiguration controller module.
//!
//! At initialization it loads the infection schedule and turns it into
//! timed events. When an event fires it announces the infection, rewrites
//! the node's baseline sender (`cbrUe[<node>].app[0]`) to the configured
//! traffic and asks it to re-read its parameters. With the attack trigger
//! set, it also spawns the attack application under the node.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::PathBuf;

use opentelemetry::KeyValue;
use tracing::{info, warn};

use smitta_config::SmittaConfig;
use smitta_core::entity::{notify_config_changed, NodeId, TrafficConfig, PRIMARY_APP};
use smitta_core::error::TimeError;
use smitta_core::events::{Message, MessageKind};
use smitta_core::module::{Module, ModuleResult, SimContext};
use smitta_core::signal::{SignalId, INFECTION_EVENT_TIME, TRAFFIC_RECONFIGURED};
use smitta_telemetry::logging::EventLogger;

use crate::error::ControllerError;
use crate::schedule::{load_schedule, InfectionSchedule};
use crate::scheduler::schedule_infections;
use crate::spawner::{AttackProfile, EntitySpawner, SpawnOutcome};

pub const CONTROLLER_TYPE: &str = "DataTrafficController";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Rewrite the infected node's sender when set.
    pub enable_traffic_mod: bool,
    /// Traffic written into the sender on infection.
    pub traffic: TrafficConfig,
    pub infection_file: PathBuf,
    /// Attack application spawned on infection, if any.
    pub attack: Option<AttackProfile>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            enable_traffic_mod: false,
            traffic: TrafficConfig::default(),
            infection_file: PathBuf::from("infection.json"),
            attack: None,
        }
    }
}

impl ControllerSettings {
    pub fn from_config(config: &SmittaConfig) -> Result<Self, TimeError> {
        let attack = if config.attack_app.enabled {
            Some(AttackProfile::from_config(&config.attack_app)?)
        } else {
            None
        };
        Ok(Self {
            enable_traffic_mod: config.traffic.enable_traffic_mod,
            traffic: config.traffic.traffic_config()?,
            infection_file: config.infection.file_path.clone(),
            attack,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// At least one infection is scheduled, none has fired yet.
    Pending,
    Infected,
}

pub struct TrafficController {
    settings: ControllerSettings,
    schedule: Option<InfectionSchedule>,
    states: BTreeMap<NodeId, NodeState>,
    scheduled: usize,
    infected: u64,
    reconfigured: u64,
    spawned: Vec<(NodeId, SpawnOutcome)>,
    infection_signal: Option<SignalId>,
    reconfigured_signal: Option<SignalId>,
}

impl TrafficController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            schedule: None,
            states: BTreeMap::new(),
            scheduled: 0,
            infected: 0,
            reconfigured: 0,
            spawned: Vec::new(),
            infection_signal: None,
            reconfigured_signal: None,
        }
    }

    /// Uses `schedule` instead of reading the infection file.
    pub fn with_schedule(mut self, schedule: InfectionSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn state_of(&self, node: NodeId) -> Option<NodeState> {
        self.states.get(&node).copied()
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled
    }

    pub fn infected_count(&self) -> u64 {
        self.infected
    }

    pub fn reconfigured_count(&self) -> u64 {
        self.reconfigured
    }

    pub fn spawned(&self) -> &[(NodeId, SpawnOutcome)] {
        &self.spawned
    }

    fn on_infection(&mut self, node_id: NodeId, ctx: &mut dyn SimContext) -> Result<(), ControllerError> {
        if let Some(signal) = self.infection_signal {
            ctx.emit(signal, i64::from(node_id.0));
        }
        self.states.insert(node_id, NodeState::Infected);
        self.infected += 1;
        EventLogger::log_event(
            "infection",
            vec![
                KeyValue::new("node_id", i64::from(node_id.0)),
                KeyValue::new("time", ctx.now().as_secs_f64()),
            ],
        );

        if self.settings.enable_traffic_mod {
            self.reconfigure(node_id, ctx)?;
            info!(%node_id, "Update traffic is enabled, reconfigured node");
        } else {
            info!(%node_id, "Update traffic is disabled, skipping reconfiguration");
        }

        if let Some(profile) = self.settings.attack.clone() {
            self.spawn_attack_app(node_id, profile, ctx)?;
        }
        Ok(())
    }

    /// Writes the configured traffic into the node's baseline sender and
    /// notifies it. Fails before any write if the sender is missing.
    fn reconfigure(&mut self, node_id: NodeId, ctx: &mut dyn SimContext) -> Result<(), ControllerError> {
        let path = ctx.registry().entity_path(node_id, PRIMARY_APP);
        let target = ctx
            .registry()
            .lookup(node_id, PRIMARY_APP)
            .ok_or_else(|| ControllerError::EntityNotFound {
                node_id,
                path: path.clone(),
            })?;
        let app = ctx
            .traffic_app(target)
            .ok_or_else(|| ControllerError::NotTrafficApp {
                node_id,
                path: path.clone(),
            })?;

        let traffic = self.settings.traffic;
        app.set_packet_size(traffic.packet_size);
        app.set_send_interval(traffic.send_interval);
        notify_config_changed(ctx, target);

        if let Some(signal) = self.reconfigured_signal {
            ctx.emit(signal, i64::from(node_id.0));
        }
        self.reconfigured += 1;
        EventLogger::log_event(
            "traffic_reconfigured",
            vec![
                KeyValue::new("node_id", i64::from(node_id.0)),
                KeyValue::new("module", path),
                KeyValue::new("packet_size", i64::from(traffic.packet_size)),
                KeyValue::new("send_interval", traffic.send_interval.as_secs_f64()),
            ],
        );
        Ok(())
    }

    /// Spawns `profile` under `cbrUe[node_id]`. Only a failed
    /// initialization is tolerated; it yields `SpawnOutcome::Degraded`.
    pub fn spawn_attack_app(
        &mut self,
        node_id: NodeId,
        profile: AttackProfile,
        ctx: &mut dyn SimContext,
    ) -> Result<SpawnOutcome, ControllerError> {
        info!(%node_id, "Creating new {} for node", profile.type_name);
        let outcome = EntitySpawner::new(node_id, profile)
            .finalize_parameters()?
            .build(ctx)?
            .initialize(ctx);
        self.spawned.push((node_id, outcome.clone()));
        Ok(outcome)
    }
}

impl Module for TrafficController {
    fn type_name(&self) -> &'static str {
        CONTROLLER_TYPE
    }

    fn initialize(&mut self, ctx: &mut dyn SimContext) -> ModuleResult {
        self.infection_signal = Some(ctx.register_signal(INFECTION_EVENT_TIME));
        self.reconfigured_signal = Some(ctx.register_signal(TRAFFIC_RECONFIGURED));

        let schedule = match self.schedule.take() {
            Some(schedule) => schedule,
            None => load_schedule(&self.settings.infection_file).map_err(ControllerError::from)?,
        };
        for entry in schedule.iter() {
            self.states.entry(entry.node_id).or_insert(NodeState::Pending);
        }
        self.scheduled = schedule_infections(&schedule, ctx)?;
        self.schedule = Some(schedule);
        Ok(())
    }

    fn handle_message(&mut self, message: Message, ctx: &mut dyn SimContext) -> ModuleResult {
        if !message.is_self_message() {
            warn!(gate = message.gate.name(), "Ignoring {} from outside", message.name());
            return Ok(());
        }
        match message.kind {
            MessageKind::Infection { node_id } => Ok(self.on_infection(node_id, ctx)?),
            other => Err(format!("{} cannot handle {:?}", CONTROLLER_TYPE, other).into()),
        }
    }

    fn finish(&mut self, ctx: &mut dyn SimContext) {
        info!(
            scheduled = self.scheduled,
            infected = self.infected,
            reconfigured = self.reconfigured,
            spawned = self.spawned.len(),
            "DataTrafficController simulation ended at {}",
            ctx.now()
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
