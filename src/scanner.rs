use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::LoadError;

pub const GRID_SUFFIX: &str = ".grid.json";
pub const RECORDS_SUFFIX: &str = ".records.json";

/// The two inputs the engine is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub grid: PathBuf,
    pub records: PathBuf,
}

/// Find the grid and records files in a data directory.
///
/// Expected layout:
///   {root}/{name}.grid.json
///   {root}/{name}.records.json
///
/// Only the top level is searched. When several files share a suffix the
/// first in sorted path order wins.
pub fn scan_data_dir(root: &Path) -> Result<DataFiles, LoadError> {
    Ok(DataFiles {
        grid: first_with_suffix(root, GRID_SUFFIX)?,
        records: first_with_suffix(root, RECORDS_SUFFIX)?,
    })
}

fn first_with_suffix(root: &Path, suffix: &'static str) -> Result<PathBuf, LoadError> {
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(suffix))
        })
        .ok_or_else(|| LoadError::MissingInput {
            dir: root.to_path_buf(),
            suffix,
        })
}
