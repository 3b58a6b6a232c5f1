use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::error::LoadError;
use crate::scanner::{DataFiles, scan_data_dir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

/// Where the data lives and how results are printed. Every flag can also be
/// set through its environment variable.
#[derive(Debug, Clone, Args)]
pub struct DataConfig {
    /// Directory holding `*.grid.json` and `*.records.json`
    #[arg(long, env = "SAMARTH_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Grid file, overriding the directory scan
    #[arg(long, env = "SAMARTH_GRID", global = true)]
    pub grid: Option<PathBuf>,

    /// Records file, overriding the directory scan
    #[arg(long, env = "SAMARTH_RECORDS", global = true)]
    pub records: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,
}

impl DataConfig {
    /// Explicit paths win; whatever is missing comes from the directory scan.
    pub fn resolve(&self) -> Result<DataFiles, LoadError> {
        match (&self.grid, &self.records) {
            (Some(grid), Some(records)) => Ok(DataFiles {
                grid: grid.clone(),
                records: records.clone(),
            }),
            (grid, records) => {
                let scanned = scan_data_dir(&self.data_dir)?;
                Ok(DataFiles {
                    grid: grid.clone().unwrap_or(scanned.grid),
                    records: records.clone().unwrap_or(scanned.records),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config(dir: PathBuf) -> DataConfig {
        DataConfig {
            data_dir: dir,
            grid: None,
            records: None,
            format: OutputFormat::default(),
        }
    }

    #[test]
    fn test_explicit_paths_skip_scan() {
        let cfg = DataConfig {
            grid: Some("g.json".into()),
            records: Some("r.json".into()),
            ..config("/nonexistent".into())
        };
        let files = cfg.resolve().unwrap();
        assert_eq!(files.grid, PathBuf::from("g.json"));
        assert_eq!(files.records, PathBuf::from("r.json"));
    }

    #[test]
    fn test_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rain.grid.json"), "{}").unwrap();
        fs::write(dir.path().join("crops.records.json"), "{}").unwrap();
        let cfg = DataConfig {
            records: Some("other.records.json".into()),
            ..config(dir.path().to_path_buf())
        };
        let files = cfg.resolve().unwrap();
        assert_eq!(files.grid, dir.path().join("rain.grid.json"));
        assert_eq!(files.records, PathBuf::from("other.records.json"));
    }

    #[test]
    fn test_missing_dir_is_load_error() {
        let cfg = config("/nonexistent/samarth".into());
        assert!(matches!(cfg.resolve(), Err(LoadError::MissingInput { .. })));
    }
}
