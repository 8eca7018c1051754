//! Kernel and topology configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use smitta_core::error::TimeError;
use smitta_core::time::SimTime;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    /// Name of the network module; root of every structural path.
    #[validate(custom(function = validation::validate_identifier))]
    pub network: String,

    /// Stop the run at this simulated time (seconds). Runs until the event
    /// queue drains when unset, which never happens while senders are active.
    #[validate(custom(function = validation::validate_positive_seconds))]
    pub sim_time_limit_s: Option<f64>,

    /// Configuration name used in result file paths.
    #[validate(custom(function = validation::validate_identifier))]
    pub config_name: String,

    /// Iteration variables rendered into result file names.
    pub iteration_vars: String,

    /// Repetition index rendered into result file names.
    pub repetition: u32,

    /// Directory receiving `.vec` result files.
    #[validate(custom(function = validation::validate_non_empty_path))]
    pub result_dir: std::path::PathBuf,

    /// Record signal vectors and write them at the end of the run.
    pub record_vectors: bool,

    /// Destination host names that traffic senders can resolve.
    #[validate(custom(function = validation::validate_hosts))]
    pub hosts: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: "Network".into(),
            sim_time_limit_s: Some(60.0),
            config_name: "General".into(),
            iteration_vars: String::new(),
            repetition: 0,
            result_dir: "results".into(),
            record_vectors: true,
            hosts: vec!["remoteServer".into()],
        }
    }
}

impl SimulationConfig {
    pub fn time_limit(&self) -> Result<Option<SimTime>, TimeError> {
        self.sim_time_limit_s
            .map(SimTime::from_secs_f64)
            .transpose()
    }

    /// Base name of this run's result files, `<iteration_vars>-repit-<repetition>`.
    pub fn run_basename(&self) -> String {
        format!("{}-repit-{}", self.iteration_vars, self.repetition)
    }
}

/// Nodes created before the run, each with one baseline sender at `app[0]`.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct TopologyConfig {
    /// Number of `cbrUe` node containers (ids `0..ue_count`).
    #[validate(range(max = 100_000))]
    pub ue_count: u32,

    /// Entity type of the baseline sender.
    #[validate(custom(function = validation::validate_identifier))]
    pub app_type: String,

    /// Baseline packet size in bytes.
    #[validate(range(min = 1, max = 65535))]
    pub packet_size: u32,

    /// Baseline inter-send interval in seconds.
    #[validate(custom(function = validation::validate_positive_seconds))]
    pub send_interval_s: f64,

    /// Offset of the first baseline packet after initialization, in seconds.
    #[validate(custom(function = validation::validate_non_negative_seconds))]
    pub start_offset_s: f64,

    #[validate(custom(function = validation::validate_identifier))]
    pub dest_address: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            ue_count: 5,
            app_type: "CbrSender".into(),
            packet_size: 512,
            send_interval_s: 1.0,
            start_offset_s: 0.0,
            dest_address: "remoteServer".into(),
        }
    }
}

impl TopologyConfig {
    pub fn traffic_config(&self) -> Result<smitta_core::entity::TrafficConfig, TimeError> {
        Ok(smitta_core::entity::TrafficConfig {
            packet_size: self.packet_size,
            send_interval: SimTime::from_secs_f64(self.send_interval_s)?,
        })
    }

    pub fn start_offset(&self) -> Result<SimTime, TimeError> {
        SimTime::from_secs_f64(self.start_offset_s)
    }
}
