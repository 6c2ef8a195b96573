//! Condition timing (EV files) and frame selection.
//!
//! ```text
//! EVs/<run>/<condition>.txt   onset  duration  amplitude   (seconds)
//!        │
//!        ├─ load_evs()          one ConditionEvents per run of the task
//!        ├─ condition_frames()  floor(onset/TR) + skip .. + ceil(duration/TR)
//!        └─ selective_average() mean over the selected columns of all runs
//! ```

use crate::config::HcpConfig;
use crate::error::{HcpError, Result};
use crate::io::ev::{read_ev_file, EvTrial};
use crate::layout::DataLayout;
use log::debug;
use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};
use serde::Serialize;
use std::ops::Range;

/// Relative distance to an integer under which a TR ratio is snapped.
const FRAME_SNAP: f64 = 1e-9;

/// Trials of one condition in one run. The three sequences are index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionEvents {
    pub run: usize,
    pub onset: Vec<f64>,
    pub duration: Vec<f64>,
    pub amplitude: Vec<f64>,
}

impl ConditionEvents {
    pub fn from_trials(run: usize, trials: &[EvTrial]) -> Self {
        Self {
            run,
            onset: trials.iter().map(|t| t.onset).collect(),
            duration: trials.iter().map(|t| t.duration).collect(),
            amplitude: trials.iter().map(|t| t.amplitude).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.onset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onset.is_empty()
    }
}

/// Read `condition` for every run of `task`, in catalog order.
pub fn load_evs(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    task: &str,
    condition: &str,
) -> Result<Vec<ConditionEvents>> {
    let mut out = Vec::new();
    for run in cfg.runs.resolve(task)? {
        let path = layout.ev_path(subject, cfg.runs.name(run)?, condition);
        let trials = read_ev_file(&path)?;
        debug!(
            "subject {} run {} {}: {} trials",
            subject,
            run,
            condition,
            trials.len()
        );
        out.push(ConditionEvents::from_trials(run, &trials));
    }
    Ok(out)
}

fn tr_ratio(seconds: f64, tr: f64) -> f64 {
    let ratio = seconds / tr;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= FRAME_SNAP * nearest.abs().max(1.0) {
        nearest
    } else {
        ratio
    }
}

/// Frame index containing `seconds`: `floor(seconds / tr)`.
pub fn frame_at(seconds: f64, tr: f64) -> usize {
    tr_ratio(seconds, tr).floor().max(0.0) as usize
}

/// Frames covering one trial, with the first `skip` frames dropped and the
/// end frame unchanged.
pub fn trial_frames(onset: f64, duration: f64, tr: f64, skip: usize) -> Range<usize> {
    let start = frame_at(onset, tr);
    let count = tr_ratio(duration, tr).ceil().max(0.0) as usize;
    let first = start.saturating_add(skip.min(count));
    first..start.saturating_add(count)
}

/// Per run, the concatenated frames of every trial in file order. Overlapping
/// trials repeat indices; runs without trials give an empty list.
pub fn condition_frames(evs: &[ConditionEvents], tr: f64, skip: usize) -> Vec<Vec<usize>> {
    evs.iter()
        .map(|run| {
            run.onset
                .iter()
                .zip(&run.duration)
                .flat_map(|(&onset, &duration)| trial_frames(onset, duration, tr, skip))
                .collect()
        })
        .collect()
}

/// Mean per parcel over the condition's frames, pooled across runs.
/// `series[i]` must be the run described by `evs[i]`.
pub fn selective_average(
    series: &[Array2<f64>],
    evs: &[ConditionEvents],
    tr: f64,
    skip: usize,
) -> Result<Array1<f64>> {
    if series.len() != evs.len() {
        return Err(HcpError::LengthMismatch {
            series: series.len(),
            conditions: evs.len(),
        });
    }
    let mut selected = Vec::with_capacity(series.len());
    for (data, run) in series.iter().zip(evs) {
        let len = data.ncols();
        let mut frames = Vec::new();
        for (&onset, &duration) in run.onset.iter().zip(&run.duration) {
            let window = trial_frames(onset, duration, tr, skip);
            if window.end > len {
                return Err(HcpError::FrameOutOfRange {
                    run: run.run,
                    frame: window.start.max(len),
                    len,
                });
            }
            frames.extend(window);
        }
        selected.push(data.select(Axis(1), &frames));
    }
    if selected.is_empty() {
        return Err(HcpError::EmptySelection);
    }
    let views: Vec<ArrayView2<f64>> = selected.iter().map(|a| a.view()).collect();
    let pooled = concatenate(Axis(1), &views).map_err(HcpError::ParcelAxis)?;
    pooled.mean_axis(Axis(1)).ok_or(HcpError::EmptySelection)
}
