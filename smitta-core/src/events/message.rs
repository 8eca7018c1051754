//! Message types delivered by the kernel.

use crate::entity::NodeId;

/// Arrival channel of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Timer a module scheduled for itself.
    SelfTimer,
    /// Out-of-band side channel, bypassing normal connections.
    ControlIn,
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Gate::SelfTimer => "self",
            Gate::ControlIn => "controlIn",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Infection of the given node is due.
    Infection { node_id: NodeId },
    /// Next packet of a traffic sender is due. Timers from an older
    /// configuration generation are stale.
    SendTimer { generation: u64 },
    /// Re-read the live traffic configuration.
    ApplyConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub gate: Gate,
}

impl Message {
    #[inline]
    pub fn timer(kind: MessageKind) -> Self {
        Self {
            kind,
            gate: Gate::SelfTimer,
        }
    }

    #[inline]
    pub fn control(kind: MessageKind) -> Self {
        Self {
            kind,
            gate: Gate::ControlIn,
        }
    }

    #[inline]
    pub fn infection(node_id: NodeId) -> Self {
        Self::timer(MessageKind::Infection { node_id })
    }

    #[inline]
    pub fn apply_config() -> Self {
        Self::control(MessageKind::ApplyConfig)
    }

    #[inline]
    pub fn is_self_message(&self) -> bool {
        self.gate == Gate::SelfTimer
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            MessageKind::Infection { .. } => "infectionEventTime",
            MessageKind::SendTimer { .. } => "sendTimer",
            MessageKind::ApplyConfig => "updateParams",
        }
    }
}
