//! The analytical operations over the rainfall grid and the crop table.
//!
//! Every operation is a pure function of the loaded data and its
//! arguments. Each returns either a payload with the citations gathered for
//! that call, or a [`QueryError`]; nothing is carried between calls.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use samarth_types::{
    Argument, AverageMetric, CategoryComparison, CategoryRanking, CategoryStats, CategoryTotal,
    Cited, CorrelationReport, MetricComparison, MetricRow, Outcome, SubregionRanking,
    SubregionTotal, TrendDirection, TrendReport, YearlyTotal,
};
use tracing::{debug, info};

use crate::citation::{Citations, span_label};
use crate::error::QueryError;
use crate::grid::MetricGrid;
use crate::records::{CategoryRecord, RecordStore, total, years_of};
use crate::region::{RegionSelector, nan_mean};
use crate::stats::linregress;
use crate::temporal::{TemporalAligner, is_calendar_axis, year_indices};

pub type EngineResult<T> = Result<Cited<T>, QueryError>;

pub const CORRELATION_DISCLAIMER: &str =
    "For detailed year-by-year correlation, year-specific rainfall data is needed";

/// Collapse an engine result into the payload-or-error boundary form.
pub fn into_outcome<T>(result: EngineResult<T>) -> Outcome<T> {
    match result {
        Ok(cited) => Outcome::Success(cited),
        Err(e) => Outcome::Failure(e.into()),
    }
}

pub struct AnalyticsEngine {
    grid: MetricGrid,
    records: RecordStore,
    selector: RegionSelector,
    aligner: TemporalAligner,
}

impl AnalyticsEngine {
    pub fn new(grid: MetricGrid, records: RecordStore) -> Self {
        let selector = RegionSelector::new(grid.lon.clone(), grid.lat.clone());
        let aligner = TemporalAligner::new(&grid.years, &records.years());
        info!(
            grid = %grid.meta.source,
            shape = ?grid.values.shape(),
            records = records.records().len(),
            categories = records.categories().len(),
            common_years = ?aligner.common_years(),
            "engine ready"
        );
        Self { grid, records, selector, aligner }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn aligner(&self) -> &TemporalAligner {
        &self.aligner
    }

    fn grid_citation(&self) -> Citations {
        Citations::new().grid(&self.grid.meta, self.grid.lon.len(), self.grid.lat.len())
    }

    // ── Gridded metric ───────────────────────────────────────────────

    /// Mean of the gridded metric over a region.
    ///
    /// The year filter only narrows the time steps when the grid's time axis
    /// holds literal calendar years; otherwise every step is averaged and the
    /// years appear in the label alone.
    pub fn average_metric(&self, region: &str, years: Option<&[i32]>) -> EngineResult<AverageMetric> {
        let sel = self.selector.select_indices(region);
        if sel.is_empty() {
            return Err(QueryError::RegionNotFound(region.to_string()));
        }

        let values = self.grid.values.view();
        let steps = match years {
            Some(ys) if values.ndim() == 3 && is_calendar_axis(&self.grid.time) => {
                let idx = year_indices(ys, &self.grid.time);
                if idx.is_empty() {
                    return Err(QueryError::NoData(format!(
                        "No rainfall data available for {region} in {}",
                        span_label(Some(ys))
                    )));
                }
                Some(idx)
            }
            _ => None,
        };

        let agg = self.selector.aggregate(&values, region, steps.as_deref())?;
        let finite = agg.finite_values();
        if finite.is_empty() {
            return Err(QueryError::NoData(format!("No rainfall data available for {region}")));
        }

        Ok(Cited {
            payload: AverageMetric {
                region: region.to_string(),
                resolved_region: sel.region.unwrap_or(region).to_string(),
                value: nan_mean(finite),
                unit: self.grid.meta.unit.clone(),
                years: span_label(years),
            },
            citations: self.grid_citation().finish(),
        })
    }

    /// [`average_metric`](Self::average_metric) per region; regions that
    /// fail are dropped.
    pub fn compare_metric(&self, regions: &[String], years: Option<&[i32]>) -> EngineResult<MetricComparison> {
        let rows: Vec<MetricRow> = regions
            .iter()
            .filter_map(|r| match self.average_metric(r, years) {
                Ok(avg) => Some(MetricRow { region: r.clone(), value: avg.payload.value }),
                Err(e) => {
                    debug!(region = %r, error = %e, "dropping region from comparison");
                    None
                }
            })
            .collect();
        if rows.is_empty() {
            return Err(QueryError::AllFailed { regions: regions.to_vec() });
        }
        Ok(Cited {
            payload: MetricComparison {
                rows,
                unit: self.grid.meta.unit.clone(),
                years: span_label(years),
            },
            citations: self.grid_citation().finish(),
        })
    }

    // ── Category rankings ────────────────────────────────────────────

    pub fn rank_categories(&self, region: &str, years: Option<&[i32]>, limit: usize) -> EngineResult<CategoryRanking> {
        let rows: Vec<&CategoryRecord> = self.records.in_region(region).collect();
        if rows.is_empty() {
            return Err(QueryError::RegionNotFound(region.to_string()));
        }
        let categories = self.records.categories();
        if categories.is_empty() {
            return Err(QueryError::NoCategories);
        }
        let rows = filter_years(rows, years);

        let mut totals: Vec<(usize, Option<f64>)> = (0..categories.len())
            .map(|id| (id, total(rows.iter().map(|r| r.production(id)))))
            .collect();
        totals.sort_by(|a, b| by_total(a.1, b.1, false));
        totals.truncate(limit);

        let rows = totals
            .into_iter()
            .enumerate()
            .map(|(i, (id, sum))| CategoryTotal {
                rank: i + 1,
                category: categories[id].name.clone(),
                total: sum,
                unit: categories[id].unit.to_string(),
            })
            .collect();

        Ok(Cited {
            payload: CategoryRanking {
                region: region.to_string(),
                limit,
                rows,
                years: span_label(years),
            },
            citations: Citations::new().records(&self.records.source, span_label(years)).finish(),
        })
    }

    /// Sub-regions ordered by summed production of one category.
    ///
    /// Each (region, sub-region) group reports the first year seen in it,
    /// which is only representative when the group spans a single year.
    pub fn rank_subregions(
        &self,
        category: &str,
        region: Option<&str>,
        year: Option<i32>,
        limit: Option<usize>,
        ascending: bool,
    ) -> EngineResult<SubregionRanking> {
        let cat = self.records.category_or_err(category, region)?;
        let rows: Vec<&CategoryRecord> = match region {
            Some(r) => {
                let rows: Vec<_> = self.records.in_region(r).collect();
                if rows.is_empty() {
                    return Err(QueryError::RegionNotFound(r.to_string()));
                }
                rows
            }
            None => self.records.records().iter().collect(),
        };
        let rows = filter_years(rows, year.map(|y| vec![y]).as_deref());

        let mut groups: BTreeMap<(&str, &str), (Vec<Option<f64>>, Option<i32>)> = BTreeMap::new();
        for r in &rows {
            let g = groups.entry((r.region.as_str(), r.subregion.as_str())).or_default();
            g.0.push(r.production(cat));
            g.1 = g.1.or(r.year);
        }

        let unit = self.records.category(cat).unit;
        let mut out: Vec<SubregionTotal> = groups
            .into_iter()
            .map(|((reg, sub), (values, first_year))| SubregionTotal {
                region: reg.to_string(),
                subregion: sub.to_string(),
                total: total(values),
                unit: unit.to_string(),
                year: first_year,
            })
            .collect();
        if !out.iter().any(|s| s.total.is_some_and(|t| t > 0.0)) {
            return Err(QueryError::NoData(format!(
                "No production data for '{category}' in {}",
                region.unwrap_or("any state")
            )));
        }
        out.sort_by(|a, b| by_total(a.total, b.total, ascending));
        if let Some(n) = limit {
            out.truncate(n);
        }

        let year_label = year.map(|y| y.to_string());
        Ok(Cited {
            payload: SubregionRanking {
                category: category.to_string(),
                region: region.unwrap_or("All states").to_string(),
                year: year_label.clone().unwrap_or_else(|| "All years".to_string()),
                rows: out,
            },
            citations: Citations::new()
                .records(&self.records.source, year_label.unwrap_or_else(|| "All available".to_string()))
                .finish(),
        })
    }

    // ── Trend and correlation ────────────────────────────────────────

    pub fn trend(&self, category: &str, region: Option<&str>, years: Option<&[i32]>) -> EngineResult<TrendReport> {
        let cat = self.records.category_or_err(category, region)?;
        let rows = self.scoped_rows(region, years);
        let yearly = yearly_totals(&rows, cat);

        let (x, y): (Vec<f64>, Vec<f64>) = yearly
            .iter()
            .filter_map(|p| p.total.map(|t| (p.year as f64, t)))
            .unzip();
        let fit = linregress(&x, &y).ok_or(QueryError::InsufficientData { points: x.len() })?;

        Ok(Cited {
            payload: TrendReport {
                category: category.to_string(),
                region: region.unwrap_or("All states").to_string(),
                slope: fit.slope,
                intercept: fit.intercept,
                r_squared: fit.r_squared(),
                p_value: fit.p_value,
                direction: if fit.slope > 0.0 {
                    TrendDirection::Increasing
                } else {
                    TrendDirection::Decreasing
                },
                yearly,
            },
            citations: Citations::new().records(&self.records.source, span_label(years)).finish(),
        })
    }

    /// The region's average metric placed next to yearly category totals.
    /// The metric is one number for the whole period, so this is a side by
    /// side view rather than a year-aligned correlation.
    pub fn correlate(&self, category: &str, region: &str, years: Option<&[i32]>) -> EngineResult<CorrelationReport> {
        let avg = self.average_metric(region, years)?;
        let cat = self.records.category_or_err(category, Some(region))?;
        let rows = self.scoped_rows(Some(region), years);

        let mut citations = avg.citations;
        citations.extend(Citations::new().records(&self.records.source, span_label(years)).finish());
        Ok(Cited {
            payload: CorrelationReport {
                category: category.to_string(),
                region: region.to_string(),
                average_metric: avg.payload.value,
                unit: avg.payload.unit,
                yearly: yearly_totals(&rows, cat),
                disclaimer: CORRELATION_DISCLAIMER.to_string(),
            },
            citations,
        })
    }

    // ── Two-category comparison ──────────────────────────────────────

    /// Three data-backed arguments comparing two crops in one region.
    ///
    /// Every comparison is strict, so an exact tie credits `category_b`.
    pub fn compare_categories(
        &self,
        category_a: &str,
        category_b: &str,
        region: &str,
        year: Option<i32>,
        years: Option<&[i32]>,
    ) -> EngineResult<CategoryComparison> {
        let ca = self.records.category_or_err(category_a, Some(region))?;
        let cb = self.records.category_or_err(category_b, Some(region))?;

        let rows: Vec<&CategoryRecord> = self.records.in_region(region).collect();
        if rows.is_empty() {
            return Err(QueryError::RegionNotFound(region.to_string()));
        }
        let rows = match (years, year) {
            (Some(ys), _) if !ys.is_empty() => filter_years(rows, Some(ys)),
            (_, Some(y)) => filter_years(rows, Some(&[y])),
            _ => rows,
        };
        let available = years_of(rows.iter().copied());

        let positive = |r: &CategoryRecord, c: usize| r.production(c).is_some_and(|v| v > 0.0);
        let filtered: Vec<&CategoryRecord> = rows
            .iter()
            .copied()
            .filter(|r| positive(r, ca) || positive(r, cb))
            .collect();
        let used = if filtered.is_empty() {
            let has_a = rows.iter().any(|r| r.production(ca).is_some());
            let has_b = rows.iter().any(|r| r.production(cb).is_some());
            if !has_a || !has_b {
                return Err(QueryError::NoData(format!(
                    "One or both crops may not have production data for {region}. \
                     Available years in dataset: {available:?}. \
                     Try selecting different crops or checking data availability."
                )));
            }
            rows
        } else {
            filtered
        };

        let stats = |c: usize, name: &str| {
            let sum = total(used.iter().map(|r| r.production(c))).unwrap_or(0.0);
            let area = self
                .records
                .category(c)
                .has_area
                .then(|| total(used.iter().map(|r| r.area(c))).unwrap_or(0.0));
            let subregions: BTreeSet<&str> = used
                .iter()
                .filter(|r| positive(r, c))
                .map(|r| r.subregion.as_str())
                .collect();
            CategoryStats {
                category: name.to_string(),
                total: sum,
                area,
                yield_: area.filter(|&a| a > 0.0).map(|a| sum / a),
                subregions: subregions.len(),
            }
        };
        let a = stats(ca, category_a);
        let b = stats(cb, category_b);

        let mut arguments = Vec::with_capacity(3);
        let (hi, lo) = if a.total > b.total { (&a, &b) } else { (&b, &a) };
        arguments.push(Argument {
            argument: format!("{} has higher total production", hi.category),
            data: format!(
                "{}: {} vs {}: {}",
                hi.category,
                format_count(hi.total),
                lo.category,
                format_count(lo.total)
            ),
            metric: "Total Production".to_string(),
        });
        if let (Some(ya), Some(yb)) = (a.yield_, b.yield_)
            && ya != 0.0
            && yb != 0.0
        {
            let ((hn, hy), (ln, ly)) = if ya > yb {
                ((&a.category, ya), (&b.category, yb))
            } else {
                ((&b.category, yb), (&a.category, ya))
            };
            arguments.push(Argument {
                argument: format!("{hn} has higher yield per hectare"),
                data: format!("{hn}: {hy:.2} vs {ln}: {ly:.2}"),
                metric: "Yield (Production/Area)".to_string(),
            });
        }
        let (hi, lo) = if a.subregions > b.subregions { (&a, &b) } else { (&b, &a) };
        arguments.push(Argument {
            argument: format!("{} is grown in more districts", hi.category),
            data: format!(
                "{}: {} districts vs {}: {} districts",
                hi.category, hi.subregions, lo.category, lo.subregions
            ),
            metric: "Geographic Spread".to_string(),
        });

        let note = (a.total == 0.0 && b.total == 0.0).then(|| {
            format!(
                "Note: Both crops show zero production. Available years in dataset: {available:?}. \
                 This may indicate limited data availability for these crops in {region}."
            )
        });

        let year_label = match (year, years) {
            (Some(y), _) => y.to_string(),
            (None, Some(ys)) if !ys.is_empty() => format!("Years: {ys:?}"),
            _ => "All years".to_string(),
        };
        let cite_years = match (years, year) {
            (Some(ys), _) if !ys.is_empty() => span_label(Some(ys)),
            (_, Some(y)) => y.to_string(),
            _ => span_label(None),
        };

        Ok(Cited {
            payload: CategoryComparison {
                category_a: category_a.to_string(),
                category_b: category_b.to_string(),
                region: region.to_string(),
                year: year_label,
                arguments,
                table: vec![a, b],
                note,
            },
            citations: Citations::new().records(&self.records.source, cite_years).finish(),
        })
    }

    fn scoped_rows(&self, region: Option<&str>, years: Option<&[i32]>) -> Vec<&CategoryRecord> {
        let rows: Vec<&CategoryRecord> = match region {
            Some(r) => self.records.in_region(r).collect(),
            None => self.records.records().iter().collect(),
        };
        filter_years(rows, years)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Keep rows whose year is listed. Rows without a year drop out of any
/// filtered view.
fn filter_years<'a>(rows: Vec<&'a CategoryRecord>, years: Option<&[i32]>) -> Vec<&'a CategoryRecord> {
    match years {
        Some(ys) => rows
            .into_iter()
            .filter(|r| r.year.is_some_and(|y| ys.contains(&y)))
            .collect(),
        None => rows,
    }
}

fn yearly_totals(rows: &[&CategoryRecord], category: usize) -> Vec<YearlyTotal> {
    let mut by_year: BTreeMap<i32, Vec<Option<f64>>> = BTreeMap::new();
    for r in rows {
        if let Some(y) = r.year {
            by_year.entry(y).or_default().push(r.production(category));
        }
    }
    by_year
        .into_iter()
        .map(|(year, values)| YearlyTotal { year, total: total(values) })
        .collect()
}

/// Order by total, missing totals last in either direction.
fn by_total(a: Option<f64>, b: Option<f64>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if ascending => x.total_cmp(&y),
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Whole number with thousands separators: 1234567.8 -> "1,234,568".
pub fn format_count(v: f64) -> String {
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}
