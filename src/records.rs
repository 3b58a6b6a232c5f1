//! Per-(region, sub-region, year) crop table with a typed category mapping.
//!
//! The source table names its metric columns `<Crop>_area`,
//! `<Crop>_production` and `<Crop>_yield`. Those names are scanned once at
//! load time into [`Category`] entries; every later lookup goes through the
//! mapping instead of re-matching column strings. Stored yield columns are
//! recognised but not loaded: yield is always production over area.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{LoadError, QueryError};

// ── Table file ───────────────────────────────────────────────────────

/// On-disk form of the crop table: column names in source order plus rows.
#[derive(Debug, Deserialize)]
pub struct RecordsFile {
    pub source: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

// ── Categories ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Area,
    Production,
    Yield,
}

impl MetricKind {
    /// `Rice_production` -> (`Rice`, Production). Suffix match ignores case.
    fn split(column: &str) -> Option<(&str, MetricKind)> {
        [
            ("_production", MetricKind::Production),
            ("_area", MetricKind::Area),
            ("_yield", MetricKind::Yield),
        ]
        .into_iter()
        .find_map(|(suffix, kind)| {
            let cut = column.len().checked_sub(suffix.len())?;
            let (base, tail) = (column.get(..cut)?, column.get(cut..)?);
            (!base.is_empty() && tail.eq_ignore_ascii_case(suffix)).then_some((base, kind))
        })
    }
}

/// One tracked crop and which of its sub-metrics the table carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub unit: &'static str,
    pub has_area: bool,
}

/// Unit implied by the production column name.
fn unit_for(production_column: &str) -> &'static str {
    let lower = production_column.to_lowercase();
    if lower.contains("nuts") {
        "Nuts"
    } else if lower.contains("bales") {
        "Bales"
    } else {
        "Tonnes"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryMetrics {
    pub area: Option<f64>,
    pub production: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub region: String,
    pub subregion: String,
    pub year: Option<i32>,
    /// Indexed like [`RecordStore::categories`].
    pub metrics: Vec<CategoryMetrics>,
}

impl CategoryRecord {
    pub fn production(&self, category: usize) -> Option<f64> {
        self.metrics.get(category).and_then(|m| m.production)
    }

    pub fn area(&self, category: usize) -> Option<f64> {
        self.metrics.get(category).and_then(|m| m.area)
    }

    fn matches_region(&self, needle: &str) -> bool {
        self.region.to_lowercase().contains(needle)
    }
}

/// Sum of the present values; `None` when every value is missing.
pub fn total(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

// ── Store ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RecordStore {
    pub source: String,
    categories: Vec<Category>,
    records: Vec<CategoryRecord>,
}

impl RecordStore {
    pub fn from_file(file: RecordsFile) -> Result<Self, LoadError> {
        Self::from_table(file.source, &file.columns, &file.rows)
    }

    pub fn from_table(source: String, columns: &[String], rows: &[Vec<Value>]) -> Result<Self, LoadError> {
        let find = |names: &[&str]| {
            columns
                .iter()
                .position(|c| names.iter().any(|n| c.eq_ignore_ascii_case(n)))
        };
        let region_col = find(&["State", "Region"])
            .ok_or_else(|| LoadError::Shape(format!("{source}: no State/Region column")))?;
        let subregion_col = find(&["District", "SubRegion"]);
        let year_col = find(&["Year"]);

        // category name -> [area, production] column positions
        let mut layout: Vec<(String, [Option<usize>; 2])> = Vec::new();
        for (i, col) in columns.iter().enumerate() {
            let Some((base, kind)) = MetricKind::split(col) else {
                if Some(i) != subregion_col && Some(i) != year_col && i != region_col {
                    debug!(column = %col, "ignoring column");
                }
                continue;
            };
            let slot = match kind {
                MetricKind::Area => 0,
                MetricKind::Production => 1,
                MetricKind::Yield => continue,
            };
            match layout.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(base)) {
                Some((_, cols)) => cols[slot] = cols[slot].or(Some(i)),
                None => {
                    let mut cols = [None; 2];
                    cols[slot] = Some(i);
                    layout.push((base.to_string(), cols));
                }
            }
        }
        // Only crops with a production column take part in any query.
        layout.retain(|(name, cols)| {
            if cols[1].is_none() {
                debug!(category = %name, "no production column, skipping");
            }
            cols[1].is_some()
        });

        let categories = layout
            .iter()
            .map(|(name, cols)| Category {
                name: name.clone(),
                unit: cols[1].map(|c| unit_for(&columns[c])).unwrap_or("Tonnes"),
                has_area: cols[0].is_some(),
            })
            .collect();

        let records = rows
            .iter()
            .map(|row| {
                let cell = |i: usize| row.get(i).and_then(parse_number);
                CategoryRecord {
                    region: row.get(region_col).map(text).unwrap_or_default(),
                    subregion: subregion_col.and_then(|i| row.get(i)).map(text).unwrap_or_default(),
                    year: year_col.and_then(cell).map(|y| y as i32),
                    metrics: layout
                        .iter()
                        .map(|(_, cols)| CategoryMetrics {
                            area: cols[0].and_then(cell),
                            production: cols[1].and_then(cell),
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(Self { source, categories, records })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: usize) -> &Category {
        &self.categories[id]
    }

    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    /// Rows whose region contains `region`, case-insensitively. A blank
    /// region matches nothing.
    pub fn in_region<'a>(&'a self, region: &str) -> impl Iterator<Item = &'a CategoryRecord> + 'a {
        let needle = region.trim().to_lowercase();
        self.records
            .iter()
            .filter(move |r| !needle.is_empty() && r.matches_region(&needle))
    }

    /// Resolve a crop name: exact (case-insensitive) base name first, then the
    /// first category whose name contains the query. Column order decides
    /// between several substring hits.
    pub fn resolve_category(&self, query: &str) -> Option<usize> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .position(|c| c.name.to_lowercase() == q)
            .or_else(|| self.categories.iter().position(|c| c.name.to_lowercase().contains(&q)))
    }

    /// Up to three names that overlap the query as substrings or are close
    /// spellings of it, best match first.
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let q = query.trim().to_lowercase();
        let mut scored: Vec<(f64, &str)> = self
            .categories
            .iter()
            .filter_map(|c| {
                let name = c.name.to_lowercase();
                let score = strsim::jaro_winkler(&q, &name);
                let overlaps = !q.is_empty() && (name.contains(&q) || q.contains(&name));
                (overlaps || score >= 0.85).then_some((score, c.name.as_str()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(3).map(|(_, n)| n.to_string()).collect()
    }

    pub fn category_or_err(&self, query: &str, region: Option<&str>) -> Result<usize, QueryError> {
        self.resolve_category(query).ok_or_else(|| QueryError::CategoryNotFound {
            category: query.to_string(),
            region: region.map(str::to_string),
            suggestions: self.suggest(query),
            available: self.categories.iter().map(|c| c.name.clone()).collect(),
        })
    }

    /// Distinct years in the table, ascending.
    pub fn years(&self) -> Vec<i32> {
        years_of(self.records.iter())
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.records.iter().filter_map(|r| r.year).max()
    }
}

/// Distinct years of the given rows, ascending.
pub fn years_of<'a>(rows: impl Iterator<Item = &'a CategoryRecord>) -> Vec<i32> {
    rows.filter_map(|r| r.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ── Cell parsing ─────────────────────────────────────────────────────

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numbers pass through; strings are parsed after dropping thousands
/// separators. Anything else is missing, never zero.
fn parse_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
