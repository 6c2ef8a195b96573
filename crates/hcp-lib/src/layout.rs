use crate::config::HcpConfig;
use crate::error::{HcpError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Path conventions of the extracted HCP parcellated dataset.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(cfg: &HcpConfig) -> Self {
        Self::new(cfg.data_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn regions_path(&self) -> PathBuf {
        self.root.join("regions.npy")
    }

    pub fn subject_dir(&self, subject: &str) -> PathBuf {
        self.root.join("subjects").join(subject)
    }

    /// `subjects/<subject>/timeseries/bold<run>_Atlas_MSMAll_Glasser360Cortical.npy`
    pub fn timeseries_path(&self, subject: &str, run: usize) -> PathBuf {
        self.subject_dir(subject)
            .join("timeseries")
            .join(format!("bold{run}_Atlas_MSMAll_Glasser360Cortical.npy"))
    }

    /// `subjects/<subject>/EVs/<run name>/<condition>.txt`
    pub fn ev_path(&self, subject: &str, run_name: &str, condition: &str) -> PathBuf {
        self.subject_dir(subject)
            .join("EVs")
            .join(run_name)
            .join(format!("{condition}.txt"))
    }

    /// Subject ids from `subjects_list.txt` when present, otherwise
    /// `0..n_subjects`.
    pub fn subjects(&self, cfg: &HcpConfig) -> Result<Vec<String>> {
        let list = self.root.join("subjects_list.txt");
        if !list.exists() {
            return Ok((0..cfg.n_subjects).map(|idx| idx.to_string()).collect());
        }
        let text = fs::read_to_string(&list).map_err(|source| HcpError::io(&list, source))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }
}
