use std::path::PathBuf;

use thiserror::Error;

use smitta_core::entity::NodeId;
use smitta_core::error::{SimulationError, TimeError};
use smitta_core::time::SimTime;

#[derive(Debug, Error)]
pub enum ScheduleLoadError {
    #[error("Unable to open infection data file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON structure in infection data: {0}")]
    Parse(String),

    #[error("Infection entry {index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Infection entry {index} has an invalid `{field}`: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Invalid attack application parameters: {0}")]
    Parameters(String),

    #[error("Node container {path} not found for node {node_id}")]
    NodeNotFound { node_id: NodeId, path: String },

    #[error("Application module '{name}' already exists for node {node_id}")]
    Duplicate { node_id: NodeId, name: String },

    #[error("Failed to build '{type_name}': {source}")]
    Build {
        type_name: String,
        #[source]
        source: SimulationError,
    },
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    ScheduleLoad(#[from] ScheduleLoadError),

    #[error("Infection of node {node_id} scheduled in the past: {at} <= {now}")]
    PastSchedule {
        node_id: NodeId,
        at: SimTime,
        now: SimTime,
    },

    #[error("Traffic application not found for node {node_id}: {path}")]
    EntityNotFound { node_id: NodeId, path: String },

    #[error("Module {path} is not a traffic application")]
    NotTrafficApp { node_id: NodeId, path: String },

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Time(#[from] TimeError),
}
