use crate::error::{HcpError, Result};
use crate::regions::RegionCatalog;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Per-parcel `a - b`.
pub fn contrast(a: &Array1<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if a.len() != b.len() {
        return Err(HcpError::LengthMismatch {
            series: a.len(),
            conditions: b.len(),
        });
    }
    Ok(a - b)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMean {
    pub network: String,
    pub parcels: usize,
    pub mean: f64,
}

/// Mean of `values` within each network of `regions`, ordered by network name.
pub fn network_means(values: &Array1<f64>, regions: &RegionCatalog) -> Result<Vec<NetworkMean>> {
    if values.len() != regions.len() {
        return Err(HcpError::RegionCount {
            values: values.len(),
            regions: regions.len(),
        });
    }
    Ok(regions
        .networks()
        .into_iter()
        .map(|network| {
            let members: Vec<f64> = regions
                .iter()
                .zip(values.iter())
                .filter(|(region, _)| region.network == network)
                .map(|(_, value)| *value)
                .collect();
            NetworkMean {
                network: network.to_string(),
                parcels: members.len(),
                mean: members.iter().sum::<f64>() / members.len() as f64,
            }
        })
        .collect())
}
