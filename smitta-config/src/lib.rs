//! # Smitta Configuration System
//!
//! Hierarchical run configuration for infection scenarios.
//!
//! ## Features
//! - **Unified Configuration**: one document drives the kernel, the
//!   controller, the spawner and the post-run export
//! - **Validation**: every section is checked with `validator` on load
//! - **Environment Awareness**: `SMITTA_*` variables override file values

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod export;
mod infection;
mod simulation;
mod telemetry;
mod traffic;
mod validation;

pub use error::ConfigError;
pub use export::ExportConfig;
pub use infection::InfectionConfig;
pub use simulation::{SimulationConfig, TopologyConfig};
pub use telemetry::TelemetryConfig;
pub use traffic::{AttackAppConfig, TrafficModConfig};

/// Top‑level configuration container for one simulation run.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
#[serde(default)]
pub struct SmittaConfig {
    /// Kernel parameters (network name, time limit, result naming).
    #[validate(nested)]
    pub simulation: SimulationConfig,

    /// Nodes and baseline traffic senders created before the run.
    #[validate(nested)]
    pub topology: TopologyConfig,

    /// Traffic applied to a node when it becomes infected.
    #[validate(nested)]
    pub traffic: TrafficModConfig,

    /// Infection schedule input.
    #[validate(nested)]
    pub infection: InfectionConfig,

    /// High-rate attack application spawned on explicit trigger.
    #[validate(nested)]
    pub attack_app: AttackAppConfig,

    /// Post-run vector export.
    #[validate(nested)]
    pub export: ExportConfig,

    /// Logging and metrics.
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl SmittaConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/smitta.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<SMITTA_ENV>.yaml` - Environment‑specific overrides.
    /// 4. `SMITTA_*` environment variables (`__` separates sections).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SmittaConfig::default()));

        if Path::new("config/smitta.yaml").exists() {
            figment = figment.merge(Yaml::file("config/smitta.yaml"));
        }

        let env = std::env::var("SMITTA_ENV").unwrap_or_else(|_| "default".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Load configuration from a specific file on top of defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(SmittaConfig::default()))
            .merge(Yaml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("SMITTA_").ignore(&["ENV"]).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
