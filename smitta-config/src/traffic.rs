//! Infection-time traffic parameters.
//!
//! - `TrafficModConfig`: what an infected node's baseline sender switches to
//! - `AttackAppConfig`: the extra high-rate sender the spawner creates

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use smitta_core::entity::TrafficConfig;
use smitta_core::error::TimeError;
use smitta_core::time::SimTime;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct TrafficModConfig {
    /// Reconfigure the node's sender on infection.
    pub enable_traffic_mod: bool,

    /// Packet size written on infection (bytes).
    #[validate(range(min = 1, max = 65535))]
    pub packet_size: u32,

    /// Send interval written on infection (seconds).
    #[validate(custom(function = validation::validate_positive_seconds))]
    pub send_interval_s: f64,
}

impl Default for TrafficModConfig {
    fn default() -> Self {
        Self {
            enable_traffic_mod: false,
            packet_size: 512,
            send_interval_s: 1.0,
        }
    }
}

impl TrafficModConfig {
    pub fn traffic_config(&self) -> Result<TrafficConfig, TimeError> {
        Ok(TrafficConfig {
            packet_size: self.packet_size,
            send_interval: SimTime::from_secs_f64(self.send_interval_s)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct AttackAppConfig {
    /// Spawn the attack application when a node becomes infected.
    pub enabled: bool,

    /// Registered entity type to instantiate.
    #[validate(custom(function = validation::validate_identifier))]
    pub type_name: String,

    /// Reserved submodule name under the node container.
    #[validate(custom(function = validation::validate_entity_name))]
    pub name: String,

    #[validate(range(min = 1, max = 65535))]
    pub packet_size: u32,

    #[validate(custom(function = validation::validate_positive_seconds))]
    pub send_interval_s: f64,

    #[validate(length(min = 1))]
    pub dest_address: String,
}

impl Default for AttackAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            type_name: "DDoSSender".into(),
            name: "ddosApp".into(),
            packet_size: 4096,
            send_interval_s: 0.001,
            dest_address: "remoteServer".into(),
        }
    }
}

impl AttackAppConfig {
    pub fn traffic_config(&self) -> Result<TrafficConfig, TimeError> {
        Ok(TrafficConfig {
            packet_size: self.packet_size,
            send_interval: SimTime::from_secs_f64(self.send_interval_s)?,
        })
    }
}
