//! Parcel × timepoint time-series loading.
//!
//! Arrays are `[P, T]` (parcels × frames). Nothing is cached: every call
//! reads the file again.

use crate::config::HcpConfig;
use crate::error::{HcpError, Result};
use crate::io::npy::read_f64_matrix;
use crate::layout::DataLayout;
use log::debug;
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// One run's array together with its 1-based catalog index.
#[derive(Debug, Clone)]
pub struct RunSeries {
    pub run: usize,
    pub data: Array2<f64>,
}

/// Subtract each parcel's temporal mean: `data[p, t] -= mean(data[p, :])`.
pub fn remove_mean_inplace(data: &mut Array2<f64>) {
    if data.ncols() == 0 {
        return;
    }
    for mut row in data.rows_mut() {
        let mean = row.sum() / row.len() as f64;
        row -= mean;
    }
}

/// Load one subject's run (1-based `run`), optionally de-meaned.
pub fn load_single_timeseries(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    run: usize,
    remove_mean: bool,
) -> Result<Array2<f64>> {
    // Reject indices the catalog does not know before touching the disk.
    cfg.runs.name(run)?;
    let path = layout.timeseries_path(subject, run);
    let mut data = read_f64_matrix(&path)?;
    if data.nrows() != cfg.n_parcels {
        return Err(HcpError::ParcelCount {
            path,
            found: data.nrows(),
            expected: cfg.n_parcels,
        });
    }
    debug!(
        "loaded subject {} run {} ({} parcels x {} frames)",
        subject,
        run,
        data.nrows(),
        data.ncols()
    );
    if remove_mean {
        remove_mean_inplace(&mut data);
    }
    Ok(data)
}

/// Load every run matching `name`, in catalog order.
pub fn load_runs(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    name: &str,
    remove_mean: bool,
) -> Result<Vec<RunSeries>> {
    cfg.runs
        .resolve(name)?
        .into_iter()
        .map(|run| {
            load_single_timeseries(layout, cfg, subject, run, remove_mean)
                .map(|data| RunSeries { run, data })
        })
        .collect()
}

/// Load every run matching `name` and join them along the time axis.
pub fn load_concatenated(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    name: &str,
    remove_mean: bool,
) -> Result<Array2<f64>> {
    let runs = load_runs(layout, cfg, subject, name, remove_mean)?;
    let views: Vec<ArrayView2<f64>> = runs.iter().map(|run| run.data.view()).collect();
    concatenate(Axis(1), &views).map_err(HcpError::ParcelAxis)
}
