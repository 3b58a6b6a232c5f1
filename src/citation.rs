use samarth_types::Citation;

use crate::grid::GridMeta;

pub const RECORDS_DATASET: &str = "Agriculture Production Data";
pub const RECORDS_RESOLUTION: &str = "District-level";

/// Citations for a single engine call. Built fresh per call and moved into
/// the result, so no state is shared between calls.
#[derive(Debug, Default)]
pub struct Citations(Vec<Citation>);

impl Citations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(mut self, meta: &GridMeta, nlon: usize, nlat: usize) -> Self {
        self.0.push(Citation {
            dataset: meta.dataset.clone(),
            source: format!("NetCDF: {}", meta.source),
            year: Some(meta.period.clone()),
            resolution: Some(format!("{nlon} x {nlat} grid cells")),
        });
        self
    }

    pub fn records(mut self, source: &str, years: impl Into<String>) -> Self {
        self.0.push(Citation {
            dataset: RECORDS_DATASET.to_string(),
            source: format!("File: {source}"),
            year: Some(years.into()),
            resolution: Some(RECORDS_RESOLUTION.to_string()),
        });
        self
    }

    pub fn finish(self) -> Vec<Citation> {
        self.0
    }
}

/// "2019-2021" for a year list, "All available" when unfiltered.
pub fn span_label(years: Option<&[i32]>) -> String {
    match years {
        Some(ys) if !ys.is_empty() => {
            let (lo, hi) = ys
                .iter()
                .fold((i32::MAX, i32::MIN), |(lo, hi), &y| (lo.min(y), hi.max(y)));
            if lo == hi { lo.to_string() } else { format!("{lo}-{hi}") }
        }
        _ => "All available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_grid_then_records() {
        let grid = fixtures::grid();
        let cites = Citations::new()
            .grid(&grid.meta, grid.lon.len(), grid.lat.len())
            .records("crops.html", "2019-2020")
            .finish();
        assert_eq!(cites.len(), 2);
        assert_eq!(cites[0].dataset, "IMD Rainfall Data");
        assert_eq!(cites[0].source, "NetCDF: RF25_ind2022_rfp25.nc");
        assert_eq!(cites[0].resolution.as_deref(), Some("4 x 4 grid cells"));
        assert_eq!(cites[1].source, "File: crops.html");
        assert_eq!(cites[1].year.as_deref(), Some("2019-2020"));
    }

    #[test]
    fn test_span_label() {
        assert_eq!(span_label(None), "All available");
        assert_eq!(span_label(Some(&[])), "All available");
        assert_eq!(span_label(Some(&[2021, 2019, 2020])), "2019-2021");
        assert_eq!(span_label(Some(&[2020])), "2020");
    }
}
