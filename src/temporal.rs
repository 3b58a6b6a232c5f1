use std::collections::BTreeSet;

/// Years shared by the gridded metric and the category records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporalAligner {
    common_years: Vec<i32>,
}

impl TemporalAligner {
    pub fn new(grid_years: &[i32], record_years: &[i32]) -> Self {
        let a: BTreeSet<i32> = grid_years.iter().copied().collect();
        let b: BTreeSet<i32> = record_years.iter().copied().collect();
        Self {
            common_years: a.intersection(&b).copied().collect(),
        }
    }

    pub fn common_years(&self) -> &[i32] {
        &self.common_years
    }

    /// Common years within the inclusive bounds, when given.
    pub fn overlapping(&self, start: Option<i32>, end: Option<i32>) -> Vec<i32> {
        self.common_years
            .iter()
            .copied()
            .filter(|&y| start.is_none_or(|s| y >= s) && end.is_none_or(|e| y <= e))
            .collect()
    }
}

/// Best-effort lookup of a calendar year on a time axis.
///
/// Only values in [1900, 2100) are read as literal years; an axis encoded
/// as "days since" never matches.
pub fn year_to_index(year: i32, time_axis: &[f64]) -> Option<usize> {
    time_axis
        .iter()
        .position(|&t| t >= 1900.0 && t < 2100.0 && t.trunc() as i32 == year)
}

/// Whether the axis holds literal calendar years at all.
pub fn is_calendar_axis(time_axis: &[f64]) -> bool {
    time_axis.iter().any(|&t| t >= 1900.0 && t < 2100.0)
}

/// Indices on `time_axis` for each requested year that is present.
pub fn year_indices(years: &[i32], time_axis: &[f64]) -> Vec<usize> {
    years
        .iter()
        .filter_map(|&y| year_to_index(y, time_axis))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_years_sorted_intersection() {
        let aligner = TemporalAligner::new(&[2022, 2019, 2020, 2021], &[2021, 2018, 2019, 2023]);
        assert_eq!(aligner.common_years(), &[2019, 2021]);
    }

    #[test]
    fn test_common_years_empty_input() {
        let aligner = TemporalAligner::new(&[], &[2019]);
        assert!(aligner.common_years().is_empty());
        assert!(aligner.overlapping(None, None).is_empty());
    }

    #[test]
    fn test_overlapping_bounds_inclusive() {
        let aligner = TemporalAligner::new(&[2018, 2019, 2020, 2021], &[2018, 2019, 2020, 2021]);
        assert_eq!(aligner.overlapping(Some(2019), Some(2020)), vec![2019, 2020]);
        assert_eq!(aligner.overlapping(Some(2020), None), vec![2020, 2021]);
        assert_eq!(aligner.overlapping(None, Some(2018)), vec![2018]);
    }

    #[test]
    fn test_year_to_index_literal_years() {
        let axis = [2019.0, 2020.0, 2021.0];
        assert_eq!(year_to_index(2020, &axis), Some(1));
        assert_eq!(year_to_index(2030, &axis), None);
    }

    #[test]
    fn test_year_to_index_half_open_range() {
        assert_eq!(year_to_index(1900, &[1900.0, 1901.0]), Some(0));
        assert!(is_calendar_axis(&[1900.0]));
        assert_eq!(year_to_index(2100, &[2100.0]), None);
        assert!(!is_calendar_axis(&[2100.0]));
    }

    #[test]
    fn test_year_to_index_ignores_day_offsets() {
        // days since 1900-01-01
        let axis = [44560.0, 44925.0];
        assert_eq!(year_to_index(2022, &axis), None);
        assert!(year_indices(&[2022, 2023], &axis).is_empty());
        assert!(!is_calendar_axis(&axis));
        assert!(is_calendar_axis(&[2021.0]));
    }
}
