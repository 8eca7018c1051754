//! # smitta-core
//!
//! Foundation layer shared by the kernel and the infection controller.
//!
//! ### Key Submodules:
//! - `time`: integer-nanosecond `SimTime` and the shared `VirtualClock`
//! - `events`: kernel messages and the future-event set
//! - `signal`: named observable value streams and their listeners
//! - `entity`: typed traffic configuration and the entity registry
//! - `module`: the `Module` / `SimContext` seam between kernel and modules
//!
//! Nothing here runs an event loop; `smitta-simulator` does.

pub mod entity;
pub mod error;
pub mod events;
pub mod module;
pub mod signal;
pub mod time;

pub mod prelude {
    pub use crate::entity::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::module::*;
    pub use crate::signal::*;
    pub use crate::time::*;
}

pub use error::SimulationError;
