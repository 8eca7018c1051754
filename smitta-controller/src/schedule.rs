//! Infection schedule loading.
//!
//! Input document:
//!
//! ```json
//! {"infectionData":[{"node_id":3,"malware_active_time":5.0}]}
//! ```
//!
//! The whole document is validated eagerly; one malformed entry fails the
//! load. Unknown fields are ignored and duplicate node ids are kept.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use smitta_core::entity::NodeId;
use smitta_core::time::SimTime;

use crate::error::ScheduleLoadError;

const NODE_ID: &str = "node_id";
const ACTIVE_TIME: &str = "malware_active_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfectionEntry {
    pub node_id: NodeId,
    pub activation_time: SimTime,
}

/// Infection entries in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfectionSchedule {
    entries: Vec<InfectionEntry>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(rename = "infectionData")]
    infection_data: Vec<Map<String, Value>>,
}

impl InfectionSchedule {
    pub fn new(entries: Vec<InfectionEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ScheduleLoadError> {
        let document: Document =
            serde_json::from_str(json).map_err(|e| ScheduleLoadError::Parse(e.to_string()))?;

        let entries = document
            .infection_data
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        for entry in &entries {
            debug!(
                node_id = %entry.node_id,
                malware_active_time = entry.activation_time.as_secs_f64(),
                "Infection entry parsed"
            );
        }
        info!("Parsed infection data with {} entries", entries.len());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[InfectionEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &InfectionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and parses an infection document from disk.
pub fn load_schedule(path: impl AsRef<Path>) -> Result<InfectionSchedule, ScheduleLoadError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| ScheduleLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    InfectionSchedule::from_json_str(&json)
}

fn parse_entry(index: usize, entry: &Map<String, Value>) -> Result<InfectionEntry, ScheduleLoadError> {
    let require = move |field: &'static str| {
        entry
            .get(field)
            .ok_or(ScheduleLoadError::MissingField { index, field })
    };
    let invalid = |field: &'static str, reason: String| ScheduleLoadError::InvalidField {
        index,
        field,
        reason,
    };

    let active_time = require(ACTIVE_TIME)?;
    let node_id = require(NODE_ID)?;

    let node_id = node_id
        .as_u64()
        .ok_or_else(|| invalid(NODE_ID, format!("expected a non-negative integer, got {node_id}")))?;
    let node_id = u32::try_from(node_id)
        .map_err(|_| invalid(NODE_ID, format!("{node_id} is out of range")))?;

    let secs = active_time
        .as_f64()
        .ok_or_else(|| invalid(ACTIVE_TIME, format!("expected a number, got {active_time}")))?;
    let activation_time =
        SimTime::from_secs_f64(secs).map_err(|e| invalid(ACTIVE_TIME, e.to_string()))?;

    Ok(InfectionEntry {
        node_id: NodeId(node_id),
        activation_time,
    })
}
