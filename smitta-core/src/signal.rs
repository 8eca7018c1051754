//! Named observable value streams.
//!
//! Modules register a signal by name once and then emit integer values on
//! it. The kernel fans every emission out to its `SignalListener`s
//! (result recording, metrics).

use std::collections::HashMap;

use crate::entity::ModuleId;
use crate::time::SimTime;

/// Emitted once per infection, carrying the node id.
pub const INFECTION_EVENT_TIME: &str = "infectionEventTime";
/// Emitted once per successful traffic reconfiguration, carrying the node id.
pub const TRAFFIC_RECONFIGURED: &str = "trafficReconfigured";
/// Emitted by traffic senders once per packet, carrying its size in bytes.
pub const PACKET_SENT: &str = "packetSent";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(usize);

impl SignalId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct SignalRegistry {
    names: Vec<String>,
    by_name: HashMap<String, SignalId>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name`, returning the existing id if already known.
    pub fn register(&mut self, name: &str) -> SignalId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = SignalId(self.names.len());
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SignalId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: SignalId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One emission as seen by listeners.
#[derive(Clone, Copy, Debug)]
pub struct SignalEvent<'a> {
    pub time: SimTime,
    pub source: ModuleId,
    pub source_path: &'a str,
    pub signal: SignalId,
    pub name: &'a str,
    pub value: i64,
}

/// Consumer of emitted signal values (recorders, metrics, test probes).
pub trait SignalListener: Send {
    fn receive(&mut self, event: &SignalEvent<'_>);
}
