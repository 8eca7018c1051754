//! Traffic-generating entities and the registry that locates them.
//!
//! Entities live under node containers named `cbrUe[<node>]` inside the
//! network. The registry maps `(node, slot)` to the kernel module handle, so
//! a missing entity is a plain lookup miss. Structural paths are only
//! rendered for logs and error messages.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::events::Message;
use crate::module::SimContext;
use crate::time::SimTime;

/// Name of the node container vector inside the network.
pub const NODE_VECTOR: &str = "cbrUe";
/// Slot of the node's baseline traffic application.
pub const PRIMARY_APP: &str = "app[0]";

/// Kernel handle of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Packet size and inter-send interval of a traffic source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficConfig {
    /// Bytes per packet.
    pub packet_size: u32,
    /// Time between two packets.
    pub send_interval: SimTime,
}

impl TrafficConfig {
    pub fn new(packet_size: u32, send_interval: SimTime) -> Result<Self, SimulationError> {
        let config = Self {
            packet_size,
            send_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.packet_size == 0 {
            return Err(SimulationError::InvalidTraffic(
                "packet size must be positive".into(),
            ));
        }
        if self.send_interval.is_zero() {
            return Err(SimulationError::InvalidTraffic(
                "send interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            packet_size: 512,
            send_interval: SimTime::from_millis(1_000),
        }
    }
}

/// Capability the controller needs from a traffic-generating entity.
///
/// Writes go to the entity's live configuration only. The entity keeps
/// using its active configuration until it receives an `ApplyConfig`
/// notification (see [`notify_config_changed`]).
pub trait TrafficApp {
    fn live_config(&self) -> TrafficConfig;

    fn set_packet_size(&mut self, bytes: u32);

    fn set_send_interval(&mut self, interval: SimTime);

    fn apply_config(&mut self, config: TrafficConfig) {
        self.set_packet_size(config.packet_size);
        self.set_send_interval(config.send_interval);
    }
}

/// Fire-and-forget refresh request on the target's `controlIn` channel.
#[inline]
pub fn notify_config_changed(ctx: &mut dyn SimContext, target: ModuleId) {
    ctx.send_direct(target, Message::apply_config());
}

/// Maps node containers and their named entities to module handles.
#[derive(Debug, Clone)]
pub struct EntityRegistry {
    network: String,
    nodes: BTreeMap<NodeId, BTreeMap<String, ModuleId>>,
}

impl EntityRegistry {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    /// Creates the container for `node`. Returns false if it already existed.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.nodes.contains_key(&node) {
            return false;
        }
        self.nodes.insert(node, BTreeMap::new());
        true
    }

    pub fn has_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn register(
        &mut self,
        node: NodeId,
        name: &str,
        module: ModuleId,
    ) -> Result<(), SimulationError> {
        let path = self.entity_path(node, name);
        let entities = self
            .nodes
            .get_mut(&node)
            .ok_or(SimulationError::UnknownNode(node))?;
        if entities.contains_key(name) {
            return Err(SimulationError::DuplicateEntity { path });
        }
        entities.insert(name.to_string(), module);
        Ok(())
    }

    #[inline]
    pub fn lookup(&self, node: NodeId, name: &str) -> Option<ModuleId> {
        self.nodes.get(&node)?.get(name).copied()
    }

    #[inline]
    pub fn contains(&self, node: NodeId, name: &str) -> bool {
        self.lookup(node, name).is_some()
    }

    /// Node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn entities(&self, node: NodeId) -> impl Iterator<Item = (&str, ModuleId)> + '_ {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|entities| entities.iter().map(|(name, id)| (name.as_str(), *id)))
    }

    pub fn node_path(&self, node: NodeId) -> String {
        format!("{}.{}[{}]", self.network, NODE_VECTOR, node)
    }

    pub fn entity_path(&self, node: NodeId, name: &str) -> String {
        format!("{}.{}", self.node_path(node), name)
    }
}
