//! Infection schedule input.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(default)]
pub struct InfectionConfig {
    /// JSON document with the `infectionData` entries.
    #[validate(custom(function = validation::validate_non_empty_path))]
    pub file_path: PathBuf,
}

impl Default for InfectionConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("infection.json"),
        }
    }
}
