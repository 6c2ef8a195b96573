//! Per-subject table assembly.
//!
//! Two exports share the same shape (typed metadata cells followed by one
//! column per parcel) and differ in their metadata:
//!
//! * [`TaskRow`]: every timepoint of every exported task, runs concatenated.
//! * [`BoredomRow`]: every timepoint of the two working-memory runs, labelled
//!   with n-back condition, response correctness and trial number.

use crate::conditions::{condition_frames, frame_at, load_evs, ConditionEvents};
use crate::config::HcpConfig;
use crate::error::Result;
use crate::io::export::{write_table, CsvRow};
use crate::layout::DataLayout;
use crate::timeseries::{load_concatenated, load_runs};
use log::{debug, info, warn};
use ndarray::Array2;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const WM_TASK: &str = "wm";

#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub subject: String,
    pub task: String,
    pub task_number: usize,
    pub parcels: Vec<f64>,
}

impl CsvRow for TaskRow {
    fn metadata_header() -> &'static [&'static str] {
        &["subject", "task", "task_number"]
    }

    fn metadata(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.task.clone(),
            self.task_number.to_string(),
        ]
    }

    fn parcels(&self) -> &[f64] {
        &self.parcels
    }
}

/// One row per column of `data` (`[P, T]`).
pub fn task_rows(subject: &str, task: &str, task_number: usize, data: &Array2<f64>) -> Vec<TaskRow> {
    data.columns()
        .into_iter()
        .map(|column| TaskRow {
            subject: subject.to_string(),
            task: task.to_string(),
            task_number,
            parcels: column.to_vec(),
        })
        .collect()
}

/// Rows for every task in `cfg.tasks`, in that order.
pub fn assemble_task_table(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
) -> Result<Vec<TaskRow>> {
    let mut rows = Vec::new();
    for task in &cfg.tasks {
        let task_number = cfg.task_number(task)?;
        let data = load_concatenated(layout, cfg, subject, task, cfg.remove_mean)?;
        debug!("subject {} task {}: {} frames", subject, task, data.ncols());
        rows.extend(task_rows(subject, task, task_number, &data));
    }
    info!("subject {}: {} task rows", subject, rows.len());
    Ok(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NBack {
    ZeroBack,
    TwoBack,
}

impl NBack {
    pub fn label(self) -> &'static str {
        match self {
            NBack::ZeroBack => "0bk",
            NBack::TwoBack => "2bk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Correctness {
    Correct,
    Error,
    NoResponse,
}

impl Correctness {
    pub fn label(self) -> &'static str {
        match self {
            Correctness::Correct => "correct",
            Correctness::Error => "error",
            Correctness::NoResponse => "no_response",
        }
    }

    fn ev_suffix(self) -> &'static str {
        match self {
            Correctness::Correct => "cor",
            Correctness::Error => "err",
            Correctness::NoResponse => "nlr",
        }
    }
}

/// The six working-memory outcome conditions, in file-name order.
pub const WM_OUTCOMES: [(NBack, Correctness); 6] = [
    (NBack::ZeroBack, Correctness::Correct),
    (NBack::ZeroBack, Correctness::Error),
    (NBack::ZeroBack, Correctness::NoResponse),
    (NBack::TwoBack, Correctness::Correct),
    (NBack::TwoBack, Correctness::Error),
    (NBack::TwoBack, Correctness::NoResponse),
];

pub fn outcome_condition(nback: NBack, correctness: Correctness) -> String {
    format!("{}_{}", nback.label(), correctness.ev_suffix())
}

/// Outcome events of one WM run, one entry per [`WM_OUTCOMES`] condition.
#[derive(Debug, Clone, Default)]
pub struct WmOutcomes {
    pub run: usize,
    pub events: Vec<(NBack, Correctness, ConditionEvents)>,
}

/// Read each outcome condition once and regroup the result by run.
pub fn load_wm_outcomes(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
) -> Result<Vec<WmOutcomes>> {
    let mut by_run: Vec<WmOutcomes> = cfg
        .runs
        .resolve(WM_TASK)?
        .into_iter()
        .map(|run| WmOutcomes {
            run,
            events: Vec::new(),
        })
        .collect();
    for (nback, correctness) in WM_OUTCOMES {
        let condition = outcome_condition(nback, correctness);
        let evs = load_evs(layout, cfg, subject, WM_TASK, &condition)?;
        for (slot, run_evs) in by_run.iter_mut().zip(evs) {
            slot.events.push((nback, correctness, run_evs));
        }
    }
    Ok(by_run)
}

/// Per-frame labels of one WM run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLabels {
    pub condition: Vec<Option<NBack>>,
    pub correctness: Vec<Option<Correctness>>,
    pub trial: Vec<Option<usize>>,
    /// Frames claimed by more than one trial or outcome; the first claim is kept.
    pub overlaps: usize,
}

/// Label `n_frames` frames of one run.
///
/// Condition and correctness come from the timing-derived condition frames
/// (with `skip`). Trials of all outcomes are sorted by onset and numbered
/// from 1; trial `i` owns the `frames_per_trial` frames starting at its
/// onset frame. Frames past the end of the run are ignored.
pub fn label_wm_run(
    outcomes: &WmOutcomes,
    n_frames: usize,
    tr: f64,
    skip: usize,
    frames_per_trial: usize,
) -> RunLabels {
    let mut labels = RunLabels {
        condition: vec![None; n_frames],
        correctness: vec![None; n_frames],
        trial: vec![None; n_frames],
        overlaps: 0,
    };

    let mut onsets: Vec<f64> = Vec::new();
    for (nback, correctness, evs) in &outcomes.events {
        let frames = condition_frames(std::slice::from_ref(evs), tr, skip);
        for &frame in frames.iter().flatten() {
            if frame >= n_frames {
                continue;
            }
            match (labels.condition[frame], labels.correctness[frame]) {
                (None, _) => {
                    labels.condition[frame] = Some(*nback);
                    labels.correctness[frame] = Some(*correctness);
                }
                (Some(n), Some(c)) if n == *nback && c == *correctness => {}
                _ => labels.overlaps += 1,
            }
        }
        onsets.extend_from_slice(&evs.onset);
    }

    onsets.sort_by(f64::total_cmp);
    for (idx, &onset) in onsets.iter().enumerate() {
        let start = frame_at(onset, tr);
        for frame in start..start.saturating_add(frames_per_trial).min(n_frames) {
            match labels.trial[frame] {
                None => labels.trial[frame] = Some(idx + 1),
                Some(_) => labels.overlaps += 1,
            }
        }
    }
    labels
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoredomRow {
    pub subject: String,
    pub task: String,
    pub task_number: usize,
    /// 1-based position of the run within the task.
    pub run: usize,
    pub condition: Option<NBack>,
    pub frame: usize,
    pub trial: Option<usize>,
    pub correctness: Option<Correctness>,
    pub parcels: Vec<f64>,
}

impl CsvRow for BoredomRow {
    fn metadata_header() -> &'static [&'static str] {
        &[
            "subject",
            "task",
            "task_number",
            "run",
            "condition",
            "frame",
            "trial",
            "correctness",
            "predicted_label",
            "predicted_probability",
        ]
    }

    fn metadata(&self) -> Vec<String> {
        vec![
            self.subject.clone(),
            self.task.clone(),
            self.task_number.to_string(),
            self.run.to_string(),
            self.condition.map(NBack::label).unwrap_or_default().to_string(),
            self.frame.to_string(),
            self.trial.map(|t| t.to_string()).unwrap_or_default(),
            self.correctness
                .map(Correctness::label)
                .unwrap_or_default()
                .to_string(),
            String::new(),
            String::new(),
        ]
    }

    fn parcels(&self) -> &[f64] {
        &self.parcels
    }
}

/// Rows for one labelled WM run.
pub fn boredom_rows(
    subject: &str,
    task_number: usize,
    run_position: usize,
    data: &Array2<f64>,
    labels: &RunLabels,
) -> Vec<BoredomRow> {
    data.columns()
        .into_iter()
        .enumerate()
        .map(|(frame, column)| BoredomRow {
            subject: subject.to_string(),
            task: WM_TASK.to_string(),
            task_number,
            run: run_position,
            condition: labels.condition.get(frame).copied().flatten(),
            frame,
            trial: labels.trial.get(frame).copied().flatten(),
            correctness: labels.correctness.get(frame).copied().flatten(),
            parcels: column.to_vec(),
        })
        .collect()
}

/// Rows of a subject's boredom export plus the total overlap count.
#[derive(Debug, Clone, Default)]
pub struct BoredomTable {
    pub rows: Vec<BoredomRow>,
    pub overlaps: usize,
}

pub fn assemble_boredom_table(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
) -> Result<BoredomTable> {
    let task_number = cfg.task_number(WM_TASK)?;
    let runs = load_runs(layout, cfg, subject, WM_TASK, cfg.remove_mean)?;
    let outcomes = load_wm_outcomes(layout, cfg, subject)?;
    let mut table = BoredomTable::default();
    for (position, (series, run_outcomes)) in runs.iter().zip(&outcomes).enumerate() {
        let labels = label_wm_run(
            run_outcomes,
            series.data.ncols(),
            cfg.tr,
            cfg.hrf_skip,
            cfg.frames_per_trial,
        );
        if labels.overlaps > 0 {
            warn!(
                "subject {} run {}: {} frames claimed by more than one trial or outcome",
                subject, series.run, labels.overlaps
            );
        }
        table.overlaps += labels.overlaps;
        table
            .rows
            .extend(boredom_rows(subject, task_number, position + 1, &series.data, &labels));
    }
    info!("subject {}: {} boredom rows", subject, table.rows.len());
    Ok(table)
}

/// Which per-subject table to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    Tasks,
    Boredom,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub subject: String,
    pub path: PathBuf,
    pub rows: usize,
    pub overlaps: usize,
}

/// Assemble one subject's table and write it to `<out_dir>/<subject>.csv`.
pub fn export_subject(
    layout: &DataLayout,
    cfg: &HcpConfig,
    export: Export,
    subject: &str,
    out_dir: &Path,
    parcel_columns: &[String],
) -> Result<ExportSummary> {
    let path = out_dir.join(format!("{subject}.csv"));
    let (rows, overlaps) = match export {
        Export::Tasks => {
            let rows = assemble_task_table(layout, cfg, subject)?;
            write_table(&path, parcel_columns, &rows)?;
            (rows.len(), 0)
        }
        Export::Boredom => {
            let table = assemble_boredom_table(layout, cfg, subject)?;
            write_table(&path, parcel_columns, &table.rows)?;
            (table.rows.len(), table.overlaps)
        }
    };
    Ok(ExportSummary {
        subject: subject.to_string(),
        path,
        rows,
        overlaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ramp, small_config, write_ev, write_run};
    use tempfile::tempdir;

    const TR: f64 = 0.72;

    fn events(run: usize, onsets: &[f64], duration: f64) -> ConditionEvents {
        ConditionEvents {
            run,
            onset: onsets.to_vec(),
            duration: vec![duration; onsets.len()],
            amplitude: vec![1.0; onsets.len()],
        }
    }

    /// One `(condition, correctness, onset)` entry per trial.
    fn outcomes_with(run: usize, trials: &[(NBack, Correctness, f64)]) -> WmOutcomes {
        WmOutcomes {
            run,
            events: WM_OUTCOMES
                .iter()
                .map(|&(n, c)| {
                    let onsets: Vec<f64> = trials
                        .iter()
                        .filter(|(tn, tc, _)| *tn == n && *tc == c)
                        .map(|(_, _, onset)| *onset)
                        .collect();
                    (n, c, events(run, &onsets, 2.5))
                })
                .collect(),
        }
    }

    #[test]
    fn task_rows_sum_over_tasks() {
        let mut rows = task_rows("5", "motor", 1, &ramp(2, 10));
        rows.extend(task_rows("5", "wm", 2, &ramp(2, 15)));
        assert_eq!(rows.len(), 25);
        assert_eq!(rows[10].task, "wm");
        assert_eq!(rows[10].parcels, vec![0.0, 100.0]);
    }

    #[test]
    fn trials_numbered_in_onset_order() {
        let outcomes = outcomes_with(
            7,
            &[
                (NBack::TwoBack, Correctness::Correct, 2.88),
                (NBack::ZeroBack, Correctness::Error, 0.0),
            ],
        );
        let labels = label_wm_run(&outcomes, 10, TR, 0, 4);
        let trials: Vec<Option<usize>> = labels.trial.clone();
        assert_eq!(&trials[0..4], &[Some(1); 4]);
        assert_eq!(&trials[4..8], &[Some(2); 4]);
        assert_eq!(&trials[8..], &[None, None]);
        assert_eq!(labels.condition[0], Some(NBack::ZeroBack));
        assert_eq!(labels.correctness[1], Some(Correctness::Error));
        assert_eq!(labels.condition[5], Some(NBack::TwoBack));
        assert_eq!(labels.correctness[7], Some(Correctness::Correct));
        assert_eq!(labels.overlaps, 0);
    }

    #[test]
    fn overlapping_trials_are_counted_not_merged() {
        let outcomes = outcomes_with(
            7,
            &[
                (NBack::ZeroBack, Correctness::Correct, 0.0),
                (NBack::ZeroBack, Correctness::NoResponse, 1.44),
            ],
        );
        let labels = label_wm_run(&outcomes, 8, TR, 0, 4);
        assert_eq!(labels.trial[2], Some(1));
        assert_eq!(labels.trial[5], Some(2));
        assert_eq!(labels.correctness[3], Some(Correctness::Correct));
        // frames 2 and 3 are claimed twice for trial and outcome
        assert_eq!(labels.overlaps, 4);
    }

    #[test]
    fn trial_blocks_clip_at_run_end() {
        let outcomes = outcomes_with(8, &[(NBack::TwoBack, Correctness::Error, 2.88)]);
        let labels = label_wm_run(&outcomes, 6, TR, 0, 4);
        assert_eq!(labels.trial, vec![None, None, None, None, Some(1), Some(1)]);
    }

    #[test]
    fn far_onset_labels_nothing() {
        let outcomes = outcomes_with(7, &[(NBack::TwoBack, Correctness::Correct, 1e300)]);
        let labels = label_wm_run(&outcomes, 6, TR, 0, 4);
        assert_eq!(labels.trial, vec![None; 6]);
        assert_eq!(labels.condition, vec![None; 6]);
        assert_eq!(labels.overlaps, 0);
    }

    #[test]
    fn skip_shrinks_condition_labels_only() {
        let outcomes = outcomes_with(7, &[(NBack::ZeroBack, Correctness::Correct, 0.0)]);
        let labels = label_wm_run(&outcomes, 4, TR, 2, 4);
        assert_eq!(labels.condition, vec![None, None, Some(NBack::ZeroBack), Some(NBack::ZeroBack)]);
        assert_eq!(labels.trial, vec![Some(1); 4]);
    }

    #[test]
    fn boredom_csv_cells() {
        let labels = RunLabels {
            condition: vec![Some(NBack::TwoBack), None],
            correctness: vec![Some(Correctness::NoResponse), None],
            trial: vec![Some(3), None],
            overlaps: 0,
        };
        let rows = boredom_rows("9", 2, 1, &ramp(2, 2), &labels);
        assert_eq!(
            rows[0].metadata(),
            vec!["9", "wm", "2", "1", "2bk", "0", "3", "no_response", "", ""]
        );
        let cells = rows[1].metadata();
        assert_eq!(&cells[4..8], &["", "1", "", ""]);
    }

    #[test]
    fn assembles_task_table_from_disk() {
        let dir = tempdir().unwrap();
        let cfg = HcpConfig {
            tasks: vec!["motor".into(), "wm".into()],
            remove_mean: false,
            ..small_config(dir.path())
        };
        let layout = DataLayout::from_config(&cfg);
        write_run(&layout, "0", 5, &ramp(2, 4));
        write_run(&layout, "0", 6, &ramp(2, 6));
        write_run(&layout, "0", 7, &ramp(2, 7));
        write_run(&layout, "0", 8, &ramp(2, 8));
        let rows = assemble_task_table(&layout, &cfg, "0").unwrap();
        assert_eq!(rows.len(), 25);
        assert_eq!(rows[0].task_number, 1);
        assert_eq!(rows[10].task, "wm");
        assert_eq!(rows[10].task_number, 2);
        assert_eq!(rows[24].parcels, vec![7.0, 107.0]);
    }

    #[test]
    fn assembles_boredom_table_from_disk() {
        let dir = tempdir().unwrap();
        let cfg = HcpConfig {
            remove_mean: false,
            ..small_config(dir.path())
        };
        let layout = DataLayout::from_config(&cfg);
        write_run(&layout, "0", 7, &ramp(2, 10));
        write_run(&layout, "0", 8, &ramp(2, 6));
        for run_name in ["tfMRI_WM_RL", "tfMRI_WM_LR"] {
            for (n, c) in WM_OUTCOMES {
                write_ev(&layout, "0", run_name, &outcome_condition(n, c), "");
            }
        }
        write_ev(&layout, "0", "tfMRI_WM_RL", "0bk_cor", "0.0\t2.5\t1\n");
        write_ev(&layout, "0", "tfMRI_WM_RL", "2bk_err", "2.88\t2.5\t1\n");
        write_ev(&layout, "0", "tfMRI_WM_LR", "2bk_nlr", "0.72\t2.5\t1\n");

        let table = assemble_boredom_table(&layout, &cfg, "0").unwrap();
        assert_eq!(table.rows.len(), 16);
        assert_eq!(table.overlaps, 0);
        let first = &table.rows[0];
        assert_eq!((first.run, first.trial, first.condition), (1, Some(1), Some(NBack::ZeroBack)));
        assert_eq!(table.rows[4].trial, Some(2));
        assert_eq!(table.rows[4].correctness, Some(Correctness::Error));
        let second_run = &table.rows[10..];
        assert_eq!(second_run[0].run, 2);
        assert_eq!(second_run[0].trial, None);
        assert_eq!(second_run[1].trial, Some(1));
        assert_eq!(second_run[1].correctness, Some(Correctness::NoResponse));
        assert_eq!(second_run[5].frame, 5);
    }

    #[test]
    fn export_writes_subject_csv() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let cfg = HcpConfig {
            tasks: vec!["social".into()],
            ..small_config(dir.path())
        };
        let layout = DataLayout::from_config(&cfg);
        write_run(&layout, "12", 17, &ramp(2, 3));
        write_run(&layout, "12", 18, &ramp(2, 2));
        let columns = crate::io::export::parcel_columns(None, 2);
        let summary =
            export_subject(&layout, &cfg, Export::Tasks, "12", out.path(), &columns).unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.path, out.path().join("12.csv"));
        let mut reader = csv::Reader::from_path(&summary.path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 5);
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[1], "social");
        assert_eq!(&first[2], "7");
        // de-meaned: parcel 0 of run 17 is [0, 1, 2]
        assert_eq!(&first[3], "-1");
    }
}
