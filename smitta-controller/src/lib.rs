//! # smitta-controller
//!
//! Infection-event scheduling and traffic reconfiguration.
//!
//! - `schedule`: loads `(node, activation time)` entries from JSON
//! - `scheduler`: submits one timed infection event per entry
//! - `controller`: the kernel module reacting to infection events
//! - `spawner`: staged creation of an attack application under a node

pub mod controller;
pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod spawner;

pub use controller::{ControllerSettings, NodeState, TrafficController, CONTROLLER_TYPE};
pub use error::{ControllerError, ScheduleLoadError, SpawnError};
pub use schedule::{load_schedule, InfectionEntry, InfectionSchedule};
pub use scheduler::schedule_infections;
pub use spawner::{AttackProfile, EntitySpawner, SpawnOutcome};
