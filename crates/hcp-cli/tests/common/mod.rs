//! Synthetic two-parcel dataset trees for CLI tests.
#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use ndarray::Array2;
use ndarray_npy::write_npy;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Dataset {
    dir: TempDir,
    config: PathBuf,
}

impl Dataset {
    /// Dataset root plus a config with two parcels exporting `tasks`.
    pub fn new(tasks: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("hcp");
        fs::create_dir_all(&root).unwrap();
        let task_list: Vec<String> = tasks.iter().map(|t| format!("\"{t}\"")).collect();
        let config = dir.path().join("hcp.toml");
        fs::write(
            &config,
            format!(
                "data_dir = \"{}\"\nn_parcels = 2\nn_subjects = 2\nremove_mean = false\ntasks = [{}]\n",
                root.to_string_lossy().replace('\\', "/"),
                task_list.join(", ")
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("hcp")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// `data[p, t] = 100 * p + t`
    pub fn write_run(&self, subject: &str, run: usize, frames: usize) {
        let dir = self.root().join("subjects").join(subject).join("timeseries");
        fs::create_dir_all(&dir).unwrap();
        let data = Array2::from_shape_fn((2, frames), |(p, t)| (100 * p + t) as f64);
        write_npy(
            dir.join(format!("bold{run}_Atlas_MSMAll_Glasser360Cortical.npy")),
            &data,
        )
        .unwrap();
    }

    pub fn write_ev(&self, subject: &str, run_name: &str, condition: &str, text: &str) {
        let dir = self.root().join("subjects").join(subject).join("EVs").join(run_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{condition}.txt")), text).unwrap();
    }

    /// Two regions written as a `<U7` (2, 3) NumPy table.
    pub fn write_regions(&self) {
        let cells = ["R_V1", "Visual1", "2.1", "R_4", "Motor", "1.7"];
        let mut header =
            "{'descr': '<U7', 'fortran_order': False, 'shape': (2, 3), }".to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');
        let mut buf = b"\x93NUMPY\x01\x00".to_vec();
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        for cell in cells {
            let mut chars: Vec<u32> = cell.chars().map(|c| c as u32).collect();
            chars.resize(7, 0);
            for code in chars {
                buf.extend_from_slice(&code.to_le_bytes());
            }
        }
        fs::write(self.root().join("regions.npy"), buf).unwrap();
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("hcp");
        cmd.arg("--config").arg(&self.config);
        cmd
    }
}

pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let headers = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

pub fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}
