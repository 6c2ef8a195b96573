use ndarray_npy::ReadNpyError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = HcpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HcpError {
    #[error("no runs match experiment name '{0}'")]
    NoMatchingRuns(String),

    #[error("run {run} is outside the run catalog (1..={len})")]
    RunOutOfRange { run: usize, len: usize },

    #[error("task '{0}' has no runs among the task runs of the catalog")]
    UnknownTask(String),

    #[error("failed to read time series {}: {source}", path.display())]
    TimeSeries {
        path: PathBuf,
        #[source]
        source: ReadNpyError,
    },

    #[error("time series {} has {found} parcels, expected {expected}", path.display())]
    ParcelCount {
        path: PathBuf,
        found: usize,
        expected: usize,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {message}", path.display())]
    EvParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("length mismatch: {series} time series but {conditions} condition records")]
    LengthMismatch { series: usize, conditions: usize },

    #[error("runs disagree on parcel count: {0}")]
    ParcelAxis(#[source] ndarray::ShapeError),

    #[error("{values} parcel values but {regions} regions")]
    RegionCount { values: usize, regions: usize },

    #[error("run {run}: frame {frame} is outside a time series of {len} timepoints")]
    FrameOutOfRange { run: usize, frame: usize, len: usize },

    #[error("condition selects no frames")]
    EmptySelection,

    #[error("malformed region table {}: {message}", path.display())]
    Regions { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("parsing config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("writing {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl HcpError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HcpError::Io {
            path: path.into(),
            source,
        }
    }
}
