use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use hcp_lib::{
    analysis::{contrast, network_means},
    conditions::{load_evs, selective_average},
    io::export::parcel_columns,
    table::{export_subject, Export},
    timeseries::load_runs,
    DataLayout, HcpConfig, RegionCatalog,
};
use log::{error, info, warn};
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "hcp",
    version,
    about = "Load, slice and export HCP parcellated time series"
)]
struct Cli {
    /// TOML file overriding the built-in dataset constants
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root (overrides `data_dir` from the config)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the runs matching an experiment name (e.g. rest, wm, motor)
    Runs {
        #[arg(long)]
        name: String,
    },
    /// Print the region catalog, one JSON object per line
    Regions,
    /// Per-parcel mean over the frames of one condition, pooled across the task's runs
    Average {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        condition: String,
        /// Leading frames dropped per trial (defaults to `hrf_skip`)
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Difference of two condition averages, summarised per network
    Contrast {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        condition_a: String,
        #[arg(long)]
        condition_b: String,
        #[arg(long)]
        skip: Option<usize>,
    },
    /// Write one CSV per subject with every timepoint of every configured task
    ExportTasks {
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Write one CSV per subject with labelled working-memory frames
    ExportBoredom {
        #[command(flatten)]
        batch: BatchArgs,
    },
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Output directory (created if missing)
    #[arg(long)]
    out: PathBuf,
    /// Subjects to export; defaults to every subject of the dataset
    #[arg(long = "subject")]
    subjects: Vec<String>,
    /// Log a failing subject and continue; still exits non-zero at the end
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    let cfg = load_config(cli.config.as_deref(), cli.data_dir)?;
    let layout = DataLayout::from_config(&cfg);
    match cli.command {
        Commands::Runs { name } => cmd_runs(&cfg, &name)?,
        Commands::Regions => cmd_regions(&layout)?,
        Commands::Average {
            subject,
            task,
            condition,
            skip,
        } => cmd_average(&layout, &cfg, &subject, &task, &condition, skip)?,
        Commands::Contrast {
            subject,
            task,
            condition_a,
            condition_b,
            skip,
        } => cmd_contrast(
            &layout,
            &cfg,
            &subject,
            &task,
            &condition_a,
            &condition_b,
            skip,
        )?,
        Commands::ExportTasks { batch } => cmd_export(&layout, &cfg, Export::Tasks, &batch)?,
        Commands::ExportBoredom { batch } => cmd_export(&layout, &cfg, Export::Boredom, &batch)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<HcpConfig> {
    let mut cfg = match path {
        Some(path) => HcpConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HcpConfig::default(),
    };
    if let Some(dir) = data_dir {
        cfg.data_dir = dir;
    }
    Ok(cfg)
}

/// Region catalog when `regions.npy` exists; exports fall back to numbered columns.
fn optional_regions(layout: &DataLayout) -> Result<Option<RegionCatalog>> {
    let path = layout.regions_path();
    if !path.exists() {
        warn!("{} not found; using numbered parcel columns", path.display());
        return Ok(None);
    }
    Ok(Some(RegionCatalog::load(&path)?))
}

#[derive(Serialize)]
struct RunEntry<'a> {
    run: usize,
    name: &'a str,
}

fn cmd_runs(cfg: &HcpConfig, name: &str) -> Result<()> {
    let mut runs = Vec::new();
    for run in cfg.runs.resolve(name)? {
        runs.push(RunEntry {
            run,
            name: cfg.runs.name(run)?,
        });
    }
    println!("{}", serde_json::to_string(&runs)?);
    Ok(())
}

fn cmd_regions(layout: &DataLayout) -> Result<()> {
    let regions = RegionCatalog::load(&layout.regions_path())?;
    for region in regions.iter() {
        println!("{}", serde_json::to_string(region)?);
    }
    Ok(())
}

fn condition_average(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    task: &str,
    condition: &str,
    skip: usize,
) -> Result<Array1<f64>> {
    let series: Vec<Array2<f64>> = load_runs(layout, cfg, subject, task, cfg.remove_mean)?
        .into_iter()
        .map(|run| run.data)
        .collect();
    let evs = load_evs(layout, cfg, subject, task, condition)?;
    let avg = selective_average(&series, &evs, cfg.tr, skip)
        .with_context(|| format!("averaging {condition} for subject {subject}"))?;
    Ok(avg)
}

#[derive(Serialize)]
struct AverageOutput<'a> {
    subject: &'a str,
    task: &'a str,
    condition: &'a str,
    skip: usize,
    parcels: Vec<String>,
    mean: Vec<f64>,
}

fn cmd_average(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    task: &str,
    condition: &str,
    skip: Option<usize>,
) -> Result<()> {
    let skip = skip.unwrap_or(cfg.hrf_skip);
    let avg = condition_average(layout, cfg, subject, task, condition, skip)?;
    let regions = optional_regions(layout)?;
    let output = AverageOutput {
        subject,
        task,
        condition,
        skip,
        parcels: parcel_columns(regions.as_ref(), cfg.n_parcels),
        mean: avg.to_vec(),
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn cmd_contrast(
    layout: &DataLayout,
    cfg: &HcpConfig,
    subject: &str,
    task: &str,
    condition_a: &str,
    condition_b: &str,
    skip: Option<usize>,
) -> Result<()> {
    let skip = skip.unwrap_or(cfg.hrf_skip);
    let a = condition_average(layout, cfg, subject, task, condition_a, skip)?;
    let b = condition_average(layout, cfg, subject, task, condition_b, skip)?;
    let diff = contrast(&a, &b)?;
    let regions = RegionCatalog::load(&layout.regions_path())
        .context("network summary needs regions.npy")?;
    let means = network_means(&diff, &regions)?;
    println!(
        "{}",
        serde_json::json!({
            "subject": subject,
            "task": task,
            "contrast": format!("{condition_a}-{condition_b}"),
            "networks": means,
        })
    );
    Ok(())
}

fn cmd_export(layout: &DataLayout, cfg: &HcpConfig, export: Export, batch: &BatchArgs) -> Result<()> {
    fs::create_dir_all(&batch.out)
        .with_context(|| format!("creating {}", batch.out.display()))?;
    let subjects = if batch.subjects.is_empty() {
        layout.subjects(cfg)?
    } else {
        batch.subjects.clone()
    };
    let regions = optional_regions(layout)?;
    let columns = parcel_columns(regions.as_ref(), cfg.n_parcels);
    info!("exporting {:?} tables for {} subjects", export, subjects.len());

    let mut failed = 0;
    for subject in &subjects {
        match export_subject(layout, cfg, export, subject, &batch.out, &columns) {
            Ok(summary) => println!("{}", serde_json::to_string(&summary)?),
            Err(err) if batch.keep_going => {
                error!("subject {}: {}", subject, err);
                failed += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("exporting subject {subject}"));
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} subjects failed", failed, subjects.len());
    }
    Ok(())
}
