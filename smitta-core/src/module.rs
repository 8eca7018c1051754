//! The seam between the kernel and the modules it drives.
//!
//! A module never touches the kernel directly: every callback receives a
//! `SimContext` scoped to the module being called. Handlers run to
//! completion; the kernel never interleaves two of them.

use std::any::Any;

use crate::entity::{EntityRegistry, ModuleId, NodeId, TrafficApp, TrafficConfig};
use crate::error::{BoxError, SimulationError};
use crate::events::Message;
use crate::signal::SignalId;
use crate::time::SimTime;

pub type ModuleResult = Result<(), BoxError>;

pub trait Module: Send {
    /// Registered type name, e.g. `CbrSender`.
    fn type_name(&self) -> &'static str;

    fn initialize(&mut self, _ctx: &mut dyn SimContext) -> ModuleResult {
        Ok(())
    }

    /// Handles one delivered message. An error aborts the run.
    fn handle_message(&mut self, message: Message, ctx: &mut dyn SimContext) -> ModuleResult;

    fn finish(&mut self, _ctx: &mut dyn SimContext) {}

    /// Traffic capability, for modules that generate traffic.
    fn as_traffic_app(&mut self) -> Option<&mut dyn TrafficApp> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Kernel services available to the module currently being called.
pub trait SimContext {
    fn now(&self) -> SimTime;

    fn module_id(&self) -> ModuleId;

    fn module_path(&self) -> &str;

    /// Schedules a message to this module. Fails if `at` is before now.
    fn schedule_at(&mut self, at: SimTime, message: Message) -> Result<(), SimulationError>;

    /// Delivers `message` to `target` at the current instant, after the
    /// running handler returns. No delivery report exists.
    fn send_direct(&mut self, target: ModuleId, message: Message);

    fn register_signal(&mut self, name: &str) -> SignalId;

    fn emit(&mut self, signal: SignalId, value: i64);

    fn registry(&self) -> &EntityRegistry;

    /// Traffic capability of another module, if it has one.
    fn traffic_app(&mut self, target: ModuleId) -> Option<&mut dyn TrafficApp>;

    /// Instantiates a registered entity type under a node container.
    /// The new module is registered but not yet initialized.
    fn create_entity(&mut self, request: EntityRequest) -> Result<ModuleId, SimulationError>;

    /// Runs the initialization stage of a module created at runtime.
    fn initialize_entity(&mut self, target: ModuleId) -> Result<(), SimulationError>;

    /// Whether `name` is a known destination host.
    fn resolve_address(&self, name: &str) -> bool;
}

/// Parameters handed to an entity factory.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityParams {
    pub traffic: TrafficConfig,
    pub dest_address: String,
    /// Delay between initialization and the first packet.
    pub start_offset: SimTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityRequest {
    pub type_name: String,
    pub node: NodeId,
    pub name: String,
    pub params: EntityParams,
}
