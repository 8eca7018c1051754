//! # smitta-export
//!
//! Converts the run's `.vec` result file into a JSON dataset once the
//! simulation ends:
//!
//! ```text
//! <tool> x <root>/<result_dir>/<config>/<base>.vec -F JSON -o <root>/sim_dataset/<base>-vector-data.json
//! ```
//!
//! `<root>` comes from `$PROJECT_ROOT_DIR`, falling back to `../..`. The
//! exporter is registered on the simulator as a lifecycle listener; its
//! outcome is logged and kept for the caller, never propagated.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

use smitta_config::{ExportConfig, SmittaConfig};
use smitta_simulator::{LifecycleListener, RunSummary};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Error creating directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    Tool { tool: String, status: String },
}

/// Files involved in one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub vec_file: PathBuf,
    pub dataset_dir: PathBuf,
    pub output_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Exported(PathBuf),
    Failed(String),
}

pub type SharedStatus = Arc<Mutex<Option<ExportStatus>>>;

pub struct ResultExporter {
    tool: String,
    root: PathBuf,
    dataset_dir: PathBuf,
    /// `<result_dir>/<config_name>`, relative to the root.
    result_dir: PathBuf,
    basename: String,
    status: SharedStatus,
}

impl ResultExporter {
    /// Derives the export from run configuration. The project root is read
    /// from the configured environment variable now.
    pub fn from_config(config: &SmittaConfig) -> Self {
        let export = &config.export;
        let simulation = &config.simulation;
        Self {
            tool: export.tool.clone(),
            root: project_root(export),
            dataset_dir: export.dataset_dir.clone(),
            result_dir: simulation.result_dir.join(&simulation.config_name),
            basename: simulation.run_basename(),
            status: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_tool(mut self, tool: &str) -> Self {
        self.tool = tool.to_string();
        self
    }

    /// Handle to the outcome of the last export.
    pub fn status(&self) -> SharedStatus {
        Arc::clone(&self.status)
    }

    pub fn plan(&self) -> ExportPlan {
        let dataset_dir = self.root.join(&self.dataset_dir);
        ExportPlan {
            vec_file: self
                .root
                .join(&self.result_dir)
                .join(format!("{}.vec", self.basename)),
            output_file: dataset_dir.join(format!("{}-vector-data.json", self.basename)),
            dataset_dir,
        }
    }

    pub fn export(&self) -> Result<ExportPlan, ExportError> {
        let plan = self.plan();
        info!(vec_file = %plan.vec_file.display(), "Exporting result vectors");
        ensure_dir(&plan.dataset_dir)?;

        let status = Command::new(&self.tool)
            .arg("x")
            .arg(&plan.vec_file)
            .args(["-F", "JSON", "-o"])
            .arg(&plan.output_file)
            .status()
            .map_err(|source| ExportError::Spawn {
                tool: self.tool.clone(),
                source,
            })?;
        if !status.success() {
            return Err(ExportError::Tool {
                tool: self.tool.clone(),
                status: status.to_string(),
            });
        }
        Ok(plan)
    }
}

impl LifecycleListener for ResultExporter {
    fn on_run_end(&mut self, summary: &RunSummary) {
        info!(outcome = ?summary.outcome, "Simulation end detected, running post-simulation export");
        let status = match self.export() {
            Ok(plan) => {
                info!(output = %plan.output_file.display(), "Post-simulation export succeeded");
                ExportStatus::Exported(plan.output_file)
            }
            Err(e) => {
                error!("Post-simulation export failed: {e}");
                ExportStatus::Failed(e.to_string())
            }
        };
        *self.status.lock() = Some(status);
    }
}

fn project_root(config: &ExportConfig) -> PathBuf {
    match std::env::var(&config.project_root_env) {
        Ok(root) if !root.is_empty() => PathBuf::from(root),
        _ => config.fallback_root.clone(),
    }
}

fn ensure_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path).map_err(|source| ExportError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
