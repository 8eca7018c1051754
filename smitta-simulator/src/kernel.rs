//! Kernel state reachable from module callbacks.
//!
//! A module being called is taken out of its slot for the duration of the
//! call, so the rest of the kernel (queue, registry, other modules) can be
//! handed to it through a `Context` without aliasing.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace, warn};

use smitta_core::entity::{EntityRegistry, ModuleId, NodeId, TrafficApp};
use smitta_core::error::{BoxError, SimulationError};
use smitta_core::events::{EventQueue, Message};
use smitta_core::module::{EntityParams, EntityRequest, Module, SimContext};
use smitta_core::signal::{SignalEvent, SignalId, SignalListener, SignalRegistry};
use smitta_core::time::{SimTime, VirtualClock};

use crate::results::VectorRecorder;

/// Builds a module of a registered entity type.
pub type EntityFactory = Box<dyn Fn(NodeId, &EntityParams) -> Box<dyn Module> + Send>;

pub(crate) struct Slot {
    pub(crate) module: Option<Box<dyn Module>>,
    pub(crate) path: String,
    pub(crate) initialized: bool,
}

pub(crate) struct Kernel {
    pub(crate) clock: VirtualClock,
    pub(crate) queue: EventQueue,
    pub(crate) slots: Vec<Slot>,
    pub(crate) registry: EntityRegistry,
    pub(crate) signals: SignalRegistry,
    pub(crate) listeners: Vec<Box<dyn SignalListener>>,
    pub(crate) recorder: Option<VectorRecorder>,
    pub(crate) factories: HashMap<String, EntityFactory>,
    pub(crate) hosts: HashSet<String>,
}

impl Kernel {
    pub(crate) fn new(network: &str) -> Self {
        Self {
            clock: VirtualClock::new(SimTime::ZERO),
            queue: EventQueue::new(),
            slots: Vec::new(),
            registry: EntityRegistry::new(network),
            signals: SignalRegistry::new(),
            listeners: Vec::new(),
            recorder: None,
            factories: HashMap::new(),
            hosts: HashSet::new(),
        }
    }

    pub(crate) fn push_slot(&mut self, path: String, module: Box<dyn Module>) -> ModuleId {
        let id = ModuleId(self.slots.len());
        debug!(module = %path, type_name = module.type_name(), "Adding module {id}");
        self.slots.push(Slot {
            module: Some(module),
            path,
            initialized: false,
        });
        id
    }

    pub(crate) fn path_of(&self, id: ModuleId) -> &str {
        self.slots.get(id.0).map(|slot| slot.path.as_str()).unwrap_or("")
    }

    pub(crate) fn schedule(
        &mut self,
        at: SimTime,
        target: ModuleId,
        message: Message,
    ) -> Result<(), SimulationError> {
        let now = self.clock.now();
        if at < now {
            return Err(SimulationError::PastEvent { at, now });
        }
        if target.0 >= self.slots.len() {
            return Err(SimulationError::UnknownModule(target));
        }
        self.queue.insert(at, target, message);
        Ok(())
    }

    pub(crate) fn emit(&mut self, source: ModuleId, signal: SignalId, value: i64) {
        let Some(name) = self.signals.name(signal) else {
            warn!("Emit on unregistered signal {:?} ignored", signal);
            return;
        };
        let source_path = self
            .slots
            .get(source.0)
            .map(|slot| slot.path.as_str())
            .unwrap_or("");
        let event = SignalEvent {
            time: self.clock.now(),
            source,
            source_path,
            signal,
            name,
            value,
        };
        trace!(signal = name, value, module = source_path, "Signal emitted");
        for listener in self.listeners.iter_mut() {
            listener.receive(&event);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.receive(&event);
        }
    }

    /// Builds an entity from its factory and registers it under the node.
    pub(crate) fn create_entity(
        &mut self,
        request: EntityRequest,
    ) -> Result<ModuleId, SimulationError> {
        if !self.registry.has_node(request.node) {
            return Err(SimulationError::UnknownNode(request.node));
        }
        if self.registry.contains(request.node, &request.name) {
            return Err(SimulationError::DuplicateEntity {
                path: self.registry.entity_path(request.node, &request.name),
            });
        }
        let factory = self
            .factories
            .get(&request.type_name)
            .ok_or_else(|| SimulationError::UnknownEntityType(request.type_name.clone()))?;
        let module = factory(request.node, &request.params);

        let path = self.registry.entity_path(request.node, &request.name);
        let id = self.push_slot(path, module);
        self.registry.register(request.node, &request.name, id)?;
        Ok(id)
    }

    /// Runs `initialize` on one module. The module is marked initialized
    /// whatever the outcome, so a failed stage is never retried.
    pub(crate) fn initialize_module(&mut self, id: ModuleId) -> Result<(), BoxError> {
        let slot = self
            .slots
            .get_mut(id.0)
            .ok_or(SimulationError::UnknownModule(id))?;
        if slot.initialized {
            return Ok(());
        }
        slot.initialized = true;
        let mut module = slot
            .module
            .take()
            .ok_or(SimulationError::UnknownModule(id))?;

        let result = module.initialize(&mut Context::new(self, id));
        self.slots[id.0].module = Some(module);
        result
    }

    pub(crate) fn deliver(&mut self, target: ModuleId, message: Message) -> Result<(), BoxError> {
        let mut module = self
            .slots
            .get_mut(target.0)
            .and_then(|slot| slot.module.take())
            .ok_or(SimulationError::UnknownModule(target))?;

        let result = module.handle_message(message, &mut Context::new(self, target));
        self.slots[target.0].module = Some(module);
        result
    }

    pub(crate) fn finish_module(&mut self, id: ModuleId) {
        if let Some(mut module) = self.slots.get_mut(id.0).and_then(|slot| slot.module.take()) {
            module.finish(&mut Context::new(self, id));
            self.slots[id.0].module = Some(module);
        }
    }
}

/// `SimContext` scoped to one module.
pub(crate) struct Context<'a> {
    kernel: &'a mut Kernel,
    module: ModuleId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(kernel: &'a mut Kernel, module: ModuleId) -> Self {
        Self { kernel, module }
    }
}

impl SimContext for Context<'_> {
    fn now(&self) -> SimTime {
        self.kernel.clock.now()
    }

    fn module_id(&self) -> ModuleId {
        self.module
    }

    fn module_path(&self) -> &str {
        self.kernel.path_of(self.module)
    }

    fn schedule_at(&mut self, at: SimTime, message: Message) -> Result<(), SimulationError> {
        self.kernel.schedule(at, self.module, message)
    }

    fn send_direct(&mut self, target: ModuleId, message: Message) {
        let now = self.kernel.clock.now();
        trace!(
            from = %self.kernel.path_of(self.module),
            to = %self.kernel.path_of(target),
            gate = message.gate.name(),
            "sendDirect {}",
            message.name()
        );
        if let Err(e) = self.kernel.schedule(now, target, message) {
            warn!("Direct message dropped: {e}");
        }
    }

    fn register_signal(&mut self, name: &str) -> SignalId {
        self.kernel.signals.register(name)
    }

    fn emit(&mut self, signal: SignalId, value: i64) {
        self.kernel.emit(self.module, signal, value);
    }

    fn registry(&self) -> &EntityRegistry {
        &self.kernel.registry
    }

    fn traffic_app(&mut self, target: ModuleId) -> Option<&mut dyn TrafficApp> {
        self.kernel
            .slots
            .get_mut(target.0)?
            .module
            .as_mut()?
            .as_traffic_app()
    }

    fn create_entity(&mut self, request: EntityRequest) -> Result<ModuleId, SimulationError> {
        self.kernel.create_entity(request)
    }

    fn initialize_entity(&mut self, target: ModuleId) -> Result<(), SimulationError> {
        self.kernel
            .initialize_module(target)
            .map_err(|e| SimulationError::Initialization {
                module: self.kernel.path_of(target).to_string(),
                reason: e.to_string(),
            })
    }

    fn resolve_address(&self, name: &str) -> bool {
        self.kernel.hosts.contains(name)
    }
}
