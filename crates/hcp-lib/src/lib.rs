//! Loading and tabular export of HCP parcellated fMRI time series.
//!
//! ```text
//! HcpConfig ── RunCatalog::resolve("wm") ─► [7, 8]
//!     │
//!     ├─ timeseries::load_runs / load_concatenated   [P, T] arrays
//!     ├─ conditions::load_evs                        EV files per run
//!     ├─ conditions::condition_frames                 frame indices
//!     ├─ conditions::selective_average               [P] means
//!     └─ table::export_subject                       <out>/<subject>.csv
//! ```
pub mod analysis;
pub mod catalog;
pub mod conditions;
pub mod config;
pub mod error;
pub mod io;
pub mod layout;
pub mod regions;
pub mod table;
pub mod timeseries;

#[cfg(test)]
mod fixtures;

pub use catalog::RunCatalog;
pub use config::HcpConfig;
pub use error::{HcpError, Result};
pub use layout::DataLayout;
pub use regions::{Region, RegionCatalog};
