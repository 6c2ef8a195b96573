//! Dataset configuration.
//!
//! [`HcpConfig`] replaces the dataset-wide constants (parcel count, TR, run
//! catalog) with one immutable value handed to every loader and assembler.
//! Every field has a default matching the HCP release; a TOML file can
//! override any subset of them:
//!
//! ```toml
//! data_dir = "/data/hcp"
//! n_parcels = 360
//! tr = 0.72
//! hrf_skip = 2
//! ```

use crate::catalog::{RunCatalog, DEFAULT_TASKS};
use crate::error::{HcpError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HcpConfig {
    /// Root of the extracted dataset (contains `regions.npy` and `subjects/`).
    pub data_dir: PathBuf,

    /// Number of subjects used when no `subjects_list.txt` is present.
    ///
    /// Default: `339`.
    pub n_subjects: usize,

    /// Rows of every time-series array and length of every parcel vector.
    ///
    /// Default: `360`.
    pub n_parcels: usize,

    /// Repetition time in seconds.
    ///
    /// Default: `0.72`.
    pub tr: f64,

    /// Ordered run catalog; position (1-based) is the run index.
    pub runs: RunCatalog,

    /// Number of resting-state runs at the head of the catalog.
    pub rest_runs: usize,

    /// Runs per task (phase-encoding directions).
    pub runs_per_task: usize,

    /// Tasks exported by the all-tasks table, in row order.
    pub tasks: Vec<String>,

    /// Subtract each parcel's temporal mean when loading for export.
    pub remove_mean: bool,

    /// Leading frames dropped from every trial to skip the hemodynamic
    /// ramp-up. Applied everywhere a condition is converted to frames.
    ///
    /// Default: `0`.
    pub hrf_skip: usize,

    /// Frames attributed to one working-memory trial when numbering trials.
    ///
    /// Default: `4`.
    pub frames_per_trial: usize,
}

impl Default for HcpConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("hcp"),
            n_subjects: 339,
            n_parcels: 360,
            tr: 0.72,
            runs: RunCatalog::default(),
            rest_runs: 4,
            runs_per_task: 2,
            tasks: DEFAULT_TASKS.iter().map(|task| task.to_string()).collect(),
            remove_mean: true,
            hrf_skip: 0,
            frames_per_trial: 4,
        }
    }
}

impl HcpConfig {
    /// Read a TOML overlay; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| HcpError::io(path, source))?;
        let cfg: HcpConfig = toml::from_str(&contents).map_err(|source| HcpError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tr.is_finite() && self.tr > 0.0) {
            return Err(HcpError::Config(format!(
                "tr must be a positive number of seconds, got {}",
                self.tr
            )));
        }
        if self.n_parcels == 0 {
            return Err(HcpError::Config("n_parcels must be non-zero".into()));
        }
        if self.runs.is_empty() {
            return Err(HcpError::Config("run catalog is empty".into()));
        }
        if self.runs_per_task == 0 {
            return Err(HcpError::Config("runs_per_task must be non-zero".into()));
        }
        if self.rest_runs > self.runs.len()
            || (self.runs.len() - self.rest_runs) % self.runs_per_task != 0
        {
            return Err(HcpError::Config(format!(
                "{} runs cannot hold {} rest runs plus tasks of {} runs each",
                self.runs.len(),
                self.rest_runs,
                self.runs_per_task
            )));
        }
        if self.frames_per_trial == 0 {
            return Err(HcpError::Config("frames_per_trial must be non-zero".into()));
        }
        Ok(())
    }

    /// 1-based number of `task` among the catalog's task groups
    /// (motor = 1, wm = 2, ... with the default catalog).
    pub fn task_number(&self, task: &str) -> Result<usize> {
        let runs = self.runs.resolve(task)?;
        let first = runs[0];
        if first <= self.rest_runs {
            return Err(HcpError::UnknownTask(task.to_string()));
        }
        Ok((first - self.rest_runs - 1) / self.runs_per_task + 1)
    }
}
