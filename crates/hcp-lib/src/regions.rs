//! Parcel catalog loaded from `regions.npy`.

use crate::error::{HcpError, Result};
use crate::io::npy::{read_string_table, StringTable};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub network: String,
    pub myelin: f64,
}

/// Ordered parcel records; position `i` labels row `i` of every time series.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
}

impl RegionCatalog {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Load the `(n, 3)` name/network/myelin string table. A `(3, n)` table
    /// is transposed first.
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_string_table(path)?;
        Self::from_table(&table).map_err(|message| HcpError::Regions {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_table(table: &StringTable) -> std::result::Result<Self, String> {
        if table.shape.len() != 2 {
            return Err(format!("expected a 2-D table, got shape {:?}", table.shape));
        }
        let table = match (table.rows(), table.cols()) {
            (_, 3) => table.clone(),
            (3, _) => table.transposed(),
            (rows, cols) => return Err(format!("expected 3 columns, got {rows}x{cols}")),
        };
        let mut regions = Vec::with_capacity(table.rows());
        for row in 0..table.rows() {
            let cell = |col| table.get(row, col).unwrap_or_default().trim().to_string();
            let myelin_text = cell(2);
            let myelin = myelin_text
                .parse::<f64>()
                .map_err(|_| format!("region {row}: myelin '{myelin_text}' is not numeric"))?;
            regions.push(Region {
                name: cell(0),
                network: cell(1),
                myelin,
            });
        }
        Ok(Self { regions })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Region> {
        self.regions.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Distinct network labels, sorted.
    pub fn networks(&self) -> Vec<&str> {
        let mut networks: Vec<&str> = self.regions.iter().map(|r| r.network.as_str()).collect();
        networks.sort_unstable();
        networks.dedup();
        networks
    }
}
