//! Acquisition run catalog and experiment-name resolution.
//!
//! Runs are addressed by their 1-based position in the catalog, which is
//! also the number embedded in the on-disk time-series file names.

use crate::error::{HcpError, Result};
use serde::{Deserialize, Serialize};

/// Default HCP run names: 4 resting-state runs followed by 7 tasks in both
/// phase-encoding directions.
pub const DEFAULT_RUNS: [&str; 18] = [
    "rfMRI_REST1_LR",
    "rfMRI_REST1_RL",
    "rfMRI_REST2_LR",
    "rfMRI_REST2_RL",
    "tfMRI_MOTOR_RL",
    "tfMRI_MOTOR_LR",
    "tfMRI_WM_RL",
    "tfMRI_WM_LR",
    "tfMRI_EMOTION_RL",
    "tfMRI_EMOTION_LR",
    "tfMRI_GAMBLING_RL",
    "tfMRI_GAMBLING_LR",
    "tfMRI_LANGUAGE_RL",
    "tfMRI_LANGUAGE_LR",
    "tfMRI_RELATIONAL_RL",
    "tfMRI_RELATIONAL_LR",
    "tfMRI_SOCIAL_RL",
    "tfMRI_SOCIAL_LR",
];

/// Task names in export order.
pub const DEFAULT_TASKS: [&str; 7] = [
    "motor",
    "wm",
    "emotion",
    "gambling",
    "language",
    "relational",
    "social",
];

/// Ordered, immutable list of run identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunCatalog {
    names: Vec<String>,
}

impl Default for RunCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_RUNS.iter().map(|name| name.to_string()).collect())
    }
}

impl RunCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Identifier of the run at 1-based position `run`.
    pub fn name(&self, run: usize) -> Result<&str> {
        run.checked_sub(1)
            .and_then(|idx| self.names.get(idx))
            .map(String::as_str)
            .ok_or(HcpError::RunOutOfRange {
                run,
                len: self.names.len(),
            })
    }

    /// `(run, name)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx + 1, name.as_str()))
    }

    /// Resolve an experiment name ("rest", "wm", "motor_rl", ...) to the
    /// 1-based positions of every run whose identifier contains it,
    /// ignoring case. The result is in catalog order.
    pub fn resolve(&self, experiment: &str) -> Result<Vec<usize>> {
        let needle = experiment.trim().to_uppercase();
        if needle.is_empty() {
            return Err(HcpError::NoMatchingRuns(experiment.to_string()));
        }
        let runs: Vec<usize> = self
            .iter()
            .filter(|(_, name)| name.to_uppercase().contains(&needle))
            .map(|(run, _)| run)
            .collect();
        if runs.is_empty() {
            return Err(HcpError::NoMatchingRuns(experiment.to_string()));
        }
        Ok(runs)
    }
}
