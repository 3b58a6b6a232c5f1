//! Gridded metric (rainfall) held in memory for the process lifetime.

use ndarray::{ArrayD, IxDyn};
use serde::Deserialize;

use crate::error::LoadError;
use crate::temporal::year_to_index;

pub const DEFAULT_DATASET: &str = "IMD Rainfall Data";
pub const DEFAULT_UNIT: &str = "mm";
pub const DEFAULT_PERIOD: &str = "All available";

/// On-disk form of a grid: coordinate axes plus the row-major flattening
/// of `shape`, `null` marking a missing cell.
#[derive(Debug, Deserialize)]
pub struct GridFile {
    pub source: String,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(default)]
    pub years: Vec<i32>,
    pub shape: Vec<usize>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridMeta {
    pub source: String,
    pub dataset: String,
    pub variable: Option<String>,
    pub unit: String,
    pub period: String,
}

#[derive(Debug, Clone)]
pub struct MetricGrid {
    pub meta: GridMeta,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub time: Vec<f64>,
    /// Calendar years the grid covers, for temporal alignment.
    pub years: Vec<i32>,
    pub values: ArrayD<f64>,
}

impl MetricGrid {
    pub fn from_file(file: GridFile) -> Result<Self, LoadError> {
        let expected: usize = file.shape.iter().product();
        if file.values.len() != expected {
            return Err(LoadError::Shape(format!(
                "{}: {} values for shape {:?} (expected {expected})",
                file.source,
                file.values.len(),
                file.shape
            )));
        }
        if matches!(file.shape.len(), 2 | 3) {
            let n = file.shape.len();
            let (nlat, nlon) = (file.shape[n - 2], file.shape[n - 1]);
            if nlat != file.lat.len() || nlon != file.lon.len() {
                return Err(LoadError::Shape(format!(
                    "{}: spatial dims {nlat}x{nlon} do not match axes lat={} lon={}",
                    file.source,
                    file.lat.len(),
                    file.lon.len()
                )));
            }
            if n == 3 && !file.time.is_empty() && file.time.len() != file.shape[0] {
                return Err(LoadError::Shape(format!(
                    "{}: time axis has {} entries, array has {} steps",
                    file.source,
                    file.time.len(),
                    file.shape[0]
                )));
            }
        }

        let flat: Vec<f64> = file.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let values = ArrayD::from_shape_vec(IxDyn(&file.shape), flat)
            .map_err(|e| LoadError::Shape(format!("{}: {e}", file.source)))?;

        let years = if file.years.is_empty() {
            years_from_time_axis(&file.time)
        } else {
            file.years
        };

        Ok(Self {
            meta: GridMeta {
                source: file.source,
                dataset: file.dataset.unwrap_or_else(|| DEFAULT_DATASET.to_string()),
                variable: file.variable,
                unit: file.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                period: file.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string()),
            },
            lon: file.lon,
            lat: file.lat,
            time: file.time,
            years,
            values,
        })
    }
}

/// Literal calendar years found on the time axis, deduplicated in order.
fn years_from_time_axis(time: &[f64]) -> Vec<i32> {
    let mut years: Vec<i32> = Vec::new();
    for &t in time {
        let y = t.trunc() as i32;
        if year_to_index(y, &[t]).is_some() && !years.contains(&y) {
            years.push(y);
        }
    }
    years
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(shape: Vec<usize>, values: Vec<Option<f64>>) -> GridFile {
        GridFile {
            source: "rain.nc".into(),
            dataset: None,
            variable: Some("RAINFALL".into()),
            unit: None,
            period: None,
            lon: vec![75.0, 76.0],
            lat: vec![12.0, 15.0],
            time: vec![2021.0, 2022.0],
            years: vec![],
            shape,
            values,
        }
    }

    #[test]
    fn test_from_file_nulls_become_nan() {
        let grid = MetricGrid::from_file(file(
            vec![2, 2, 2],
            vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0), Some(7.0), Some(8.0)],
        ))
        .unwrap();
        assert!(grid.values[[0, 0, 1]].is_nan());
        assert_eq!(grid.values[[1, 1, 1]], 8.0);
        assert_eq!(grid.years, vec![2021, 2022]);
        assert_eq!(grid.meta.dataset, DEFAULT_DATASET);
        assert_eq!(grid.meta.unit, "mm");
    }

    #[test]
    fn test_from_file_rejects_wrong_length() {
        let err = MetricGrid::from_file(file(vec![2, 2], vec![Some(1.0)])).unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
    }

    #[test]
    fn test_from_file_rejects_axis_mismatch() {
        let err = MetricGrid::from_file(file(vec![1, 4], vec![Some(1.0); 4])).unwrap_err();
        assert!(err.to_string().contains("spatial dims"));
    }

    #[test]
    fn test_from_file_accepts_other_ranks() {
        let grid = MetricGrid::from_file(file(vec![1, 1, 2, 2], vec![Some(0.0); 4])).unwrap();
        assert_eq!(grid.values.ndim(), 4);
    }
}
