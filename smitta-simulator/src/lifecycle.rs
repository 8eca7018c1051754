//! Run lifecycle notifications.

use std::path::PathBuf;

use smitta_core::time::SimTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted(String),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

/// What a finished (or aborted) run reports to lifecycle listeners.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub end_time: SimTime,
    pub events_processed: u64,
    /// Hex blake3 digest over every delivered event in order.
    pub fingerprint: String,
    /// `.vec` file written for this run, if vector recording was on.
    pub result_file: Option<PathBuf>,
}

/// Hook called once when the run ends, normally or not.
pub trait LifecycleListener: Send {
    fn on_run_end(&mut self, summary: &RunSummary);
}
