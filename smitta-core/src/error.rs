use thiserror::Error;

use crate::entity::{ModuleId, NodeId};
use crate::time::SimTime;

/// Boxed error returned by module callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    #[error("simulated time must be finite and non-negative, got {0}")]
    Invalid(f64),

    #[error("simulated time {0}s overflows the clock")]
    Overflow(f64),
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("event scheduled in the past: {at} < {now}")]
    PastEvent { at: SimTime, now: SimTime },

    #[error("unknown module id {0}")]
    UnknownModule(ModuleId),

    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("node container for node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("entity '{path}' already exists")]
    DuplicateEntity { path: String },

    #[error("invalid traffic configuration: {0}")]
    InvalidTraffic(String),

    #[error("initialization of '{module}' failed: {reason}")]
    Initialization { module: String, reason: String },

    #[error("module '{module}' failed at {time}: {source}")]
    Module {
        module: String,
        time: SimTime,
        #[source]
        source: BoxError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    /// Returns the module failure cause, if this error wraps one.
    pub fn module_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            SimulationError::Module { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
