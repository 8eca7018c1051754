//! Post-run export parameters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct ExportConfig {
    /// Run the export when the simulation ends.
    pub enabled: bool,

    /// Vector conversion tool, invoked as `<tool> x <vec> -F JSON -o <json>`.
    #[validate(length(min = 1))]
    pub tool: String,

    /// Dataset directory name below the project root.
    #[validate(custom(function = validation::validate_non_empty_path))]
    pub dataset_dir: PathBuf,

    /// Environment variable naming the project root.
    #[validate(length(min = 1))]
    pub project_root_env: String,

    /// Root used when the environment variable is unset.
    #[validate(custom(function = validation::validate_non_empty_path))]
    pub fallback_root: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tool: "opp_scavetool".into(),
            dataset_dir: "sim_dataset".into(),
            project_root_env: "PROJECT_ROOT_DIR".into(),
            fallback_root: "../..".into(),
        }
    }
}
