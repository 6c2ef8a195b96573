use crate::error::{HcpError, Result};
use crate::regions::RegionCatalog;
use csv::WriterBuilder;
use std::fs;
use std::path::Path;

/// A table row: typed metadata cells followed by one value per parcel.
pub trait CsvRow {
    fn metadata_header() -> &'static [&'static str];
    fn metadata(&self) -> Vec<String>;
    fn parcels(&self) -> &[f64];
}

/// Parcel column headers: region names when a catalog of the right size is
/// available, `parcel_000`, `parcel_001`, ... otherwise.
pub fn parcel_columns(regions: Option<&RegionCatalog>, n_parcels: usize) -> Vec<String> {
    match regions {
        Some(catalog) if catalog.len() == n_parcels => {
            catalog.iter().map(|region| region.name.clone()).collect()
        }
        _ => (0..n_parcels).map(|idx| format!("parcel_{idx:03}")).collect(),
    }
}

pub fn write_table<R: CsvRow>(path: &Path, parcel_columns: &[String], rows: &[R]) -> Result<()> {
    let csv_err = |source| HcpError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = fs::File::create(path).map_err(|source| HcpError::io(path, source))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let header: Vec<&str> = R::metadata_header()
        .iter()
        .copied()
        .chain(parcel_columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header).map_err(csv_err)?;
    for row in rows {
        let mut record = row.metadata();
        record.extend(row.parcels().iter().map(|value| value.to_string()));
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|source| HcpError::io(path, source))?;
    Ok(())
}
