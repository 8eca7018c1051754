//! ## smitta-core::events
//! **Kernel messages and the future-event set**
//!
//! Every delivery in a run goes through one `EventQueue`: timers a module
//! schedules for itself and out-of-band notifications sent directly to
//! another module's `controlIn` gate alike.

pub mod message;
pub mod queue;

pub use message::{Gate, Message, MessageKind};
pub use queue::{EventQueue, ScheduledEvent};
