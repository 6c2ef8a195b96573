//! Synthetic dataset trees for unit tests.

use crate::config::HcpConfig;
use crate::layout::DataLayout;
use ndarray::Array2;
use ndarray_npy::write_npy;
use std::fs;
use std::path::Path;

/// Default catalog with two parcels, rooted at `root`.
pub fn small_config(root: &Path) -> HcpConfig {
    HcpConfig {
        data_dir: root.to_path_buf(),
        n_subjects: 2,
        n_parcels: 2,
        ..HcpConfig::default()
    }
}

pub fn write_run(layout: &DataLayout, subject: &str, run: usize, data: &Array2<f64>) {
    let path = layout.timeseries_path(subject, run);
    fs::create_dir_all(path.parent().expect("timeseries dir")).unwrap();
    write_npy(&path, data).unwrap();
}

pub fn write_ev(layout: &DataLayout, subject: &str, run_name: &str, condition: &str, text: &str) {
    let path = layout.ev_path(subject, run_name, condition);
    fs::create_dir_all(path.parent().expect("EV dir")).unwrap();
    fs::write(path, text).unwrap();
}

/// `[n_parcels, n_frames]` with `data[p, t] = 100 * p + t`.
pub fn ramp(n_parcels: usize, n_frames: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_parcels, n_frames), |(p, t)| (100 * p + t) as f64)
}
