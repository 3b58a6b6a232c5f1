//! Reading the already-parsed grid and records files from disk.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::engine::AnalyticsEngine;
use crate::error::LoadError;
use crate::grid::{GridFile, MetricGrid};
use crate::records::{RecordStore, RecordsFile};
use crate::scanner::DataFiles;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let json = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

pub fn load_grid(path: &Path) -> Result<MetricGrid, LoadError> {
    let grid = MetricGrid::from_file(read_json::<GridFile>(path)?)?;
    info!(
        path = %path.display(),
        shape = ?grid.values.shape(),
        years = grid.years.len(),
        "grid loaded"
    );
    Ok(grid)
}

pub fn load_records(path: &Path) -> Result<RecordStore, LoadError> {
    let store = RecordStore::from_file(read_json::<RecordsFile>(path)?)?;
    info!(
        path = %path.display(),
        records = store.records().len(),
        categories = store.categories().len(),
        "records loaded"
    );
    Ok(store)
}

pub fn load_engine(files: &DataFiles) -> Result<AnalyticsEngine, LoadError> {
    Ok(AnalyticsEngine::new(load_grid(&files.grid)?, load_records(&files.records)?))
}
