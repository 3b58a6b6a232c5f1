//! Region registry and grid-cell selection.
//!
//! Each region maps to an approximate rectangular bounding box. Boxes overlap
//! and are not geographically validated; they exist so a named state can be
//! turned into a set of grid cells of the gridded metric.

use ndarray::{ArrayViewD, Axis};
use tracing::warn;

use crate::error::QueryError;

// ── Registry ─────────────────────────────────────────────────────────

/// Inclusive longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    const fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self { lon_min, lon_max, lat_min, lat_max }
    }

    fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max
    }

    fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub name: &'static str,
    pub bounds: BoundingBox,
}

const fn entry(name: &'static str, lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> RegionBounds {
    RegionBounds { name, bounds: BoundingBox::new(lon_min, lon_max, lat_min, lat_max) }
}

/// Iteration order matters: the substring fallback returns the first hit.
pub static REGISTRY: &[RegionBounds] = &[
    entry("Andhra Pradesh", 76.0, 84.0, 12.0, 20.0),
    entry("Arunachal Pradesh", 91.0, 97.0, 26.0, 30.0),
    entry("Assam", 89.0, 96.0, 24.0, 28.0),
    entry("Bihar", 83.0, 88.0, 24.0, 28.0),
    entry("Chhattisgarh", 80.0, 85.0, 17.0, 24.0),
    entry("Goa", 73.5, 74.5, 14.5, 15.5),
    entry("Gujarat", 68.0, 75.0, 20.0, 25.0),
    entry("Haryana", 74.0, 78.0, 28.0, 31.0),
    entry("Himachal Pradesh", 75.0, 79.0, 30.0, 33.0),
    entry("Jharkhand", 83.0, 88.0, 22.0, 25.0),
    entry("Karnataka", 74.0, 78.5, 11.5, 18.5),
    entry("Kerala", 74.5, 77.5, 8.0, 12.5),
    entry("Madhya Pradesh", 73.0, 82.0, 21.0, 27.0),
    entry("Maharashtra", 72.0, 81.0, 15.0, 22.0),
    entry("Manipur", 93.0, 95.0, 23.0, 25.0),
    entry("Meghalaya", 89.0, 93.0, 25.0, 26.5),
    entry("Mizoram", 92.0, 93.5, 22.0, 24.5),
    entry("Nagaland", 93.0, 95.5, 25.0, 27.0),
    entry("Odisha", 81.0, 88.0, 17.0, 22.5),
    entry("Punjab", 73.5, 77.0, 29.5, 32.5),
    entry("Rajasthan", 69.0, 78.5, 23.0, 30.5),
    entry("Sikkim", 88.0, 89.0, 27.0, 28.5),
    entry("Tamil Nadu", 76.0, 80.5, 8.0, 13.5),
    entry("Telangana", 77.0, 81.0, 15.5, 20.0),
    entry("Tripura", 91.0, 92.5, 22.5, 24.5),
    entry("Uttar Pradesh", 77.0, 85.0, 24.0, 31.0),
    entry("Uttarakhand", 77.0, 81.0, 28.5, 31.5),
    entry("West Bengal", 86.0, 90.0, 21.5, 27.5),
    entry("Andaman and Nicobar Islands", 92.0, 94.0, 6.0, 14.0),
    entry("Delhi", 76.8, 77.4, 28.4, 28.9),
    entry("Puducherry", 79.7, 79.9, 11.8, 12.1),
    entry("Jammu and Kashmir", 73.0, 80.0, 32.0, 37.0),
    entry("Ladakh", 75.0, 80.0, 32.0, 36.0),
];

/// Resolve a region name: exact, then case-insensitive, then substring in
/// either direction. First registry hit wins at every step.
pub fn resolve(name: &str) -> Option<&'static RegionBounds> {
    if let Some(r) = REGISTRY.iter().find(|r| r.name == name) {
        return Some(r);
    }
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    if let Some(r) = REGISTRY.iter().find(|r| r.name.to_lowercase() == wanted) {
        return Some(r);
    }
    REGISTRY.iter().find(|r| {
        let key = r.name.to_lowercase();
        key.contains(&wanted) || wanted.contains(&key)
    })
}

// ── Selection ────────────────────────────────────────────────────────

/// Grid cells inside one region's box. Both lists are empty when the region
/// did not resolve or lies outside the grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSelection {
    pub region: Option<&'static str>,
    pub lat: Vec<usize>,
    pub lon: Vec<usize>,
}

impl GridSelection {
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }
}

/// Result of spatially averaging a metric over one region.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// 2-D input: one mean over the selected cells (NaN if all missing).
    Scalar(f64),
    /// 3-D input: one mean per selected time step.
    Series(Vec<f64>),
    /// The region selected no cells.
    Empty,
}

impl Aggregate {
    /// Non-missing values of the aggregate.
    pub fn finite_values(&self) -> Vec<f64> {
        match self {
            Aggregate::Scalar(v) => [*v].into_iter().filter(|v| !v.is_nan()).collect(),
            Aggregate::Series(vs) => vs.iter().copied().filter(|v| !v.is_nan()).collect(),
            Aggregate::Empty => Vec::new(),
        }
    }
}

/// Maps region names onto the coordinate axes of one grid.
#[derive(Debug, Clone)]
pub struct RegionSelector {
    lon: Vec<f64>,
    lat: Vec<f64>,
}

impl RegionSelector {
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self { lon, lat }
    }

    pub fn select_indices(&self, region: &str) -> GridSelection {
        let Some(entry) = resolve(region) else {
            warn!(region, "region not found in registry");
            return GridSelection::default();
        };
        let bounds = entry.bounds;
        GridSelection {
            region: Some(entry.name),
            lat: indices_where(&self.lat, |v| bounds.contains_lat(v)),
            lon: indices_where(&self.lon, |v| bounds.contains_lon(v)),
        }
    }

    /// Average `values` over the region's cells, ignoring NaN.
    ///
    /// Accepts `(lat, lon)` or `(time, lat, lon)`; `time` restricts the
    /// time steps of a 3-D array. The input view is never mutated: the
    /// selection is copied into an owned array before reduction.
    pub fn aggregate(
        &self,
        values: &ArrayViewD<'_, f64>,
        region: &str,
        time: Option<&[usize]>,
    ) -> Result<Aggregate, QueryError> {
        let sel = self.select_indices(region);
        if sel.is_empty() {
            return Ok(Aggregate::Empty);
        }
        match values.ndim() {
            2 => {
                let sub = values.select(Axis(0), &sel.lat).select(Axis(1), &sel.lon);
                Ok(Aggregate::Scalar(nan_mean(sub.iter().copied())))
            }
            3 => {
                let sub = match time {
                    Some(steps) => values.select(Axis(0), steps),
                    None => values.to_owned(),
                };
                let sub = sub.select(Axis(1), &sel.lat).select(Axis(2), &sel.lon);
                let series = sub
                    .axis_iter(Axis(0))
                    .map(|step| nan_mean(step.iter().copied()))
                    .collect();
                Ok(Aggregate::Series(series))
            }
            n => Err(QueryError::Shape(format!(
                "expected a 2-D (lat, lon) or 3-D (time, lat, lon) array, got {n}-D"
            ))),
        }
    }
}

fn indices_where(axis: &[f64], keep: impl Fn(f64) -> bool) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|&(_, &v)| keep(v))
        .map(|(i, _)| i)
        .collect()
}

/// Mean of the non-NaN values; NaN when there are none.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}
