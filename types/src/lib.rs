//! Serializable shapes that cross the query boundary.
//!
//! Everything here is plain data: the analytics engine fills these in, the CLI
//! prints them as JSON or markdown, and any downstream dashboard can
//! deserialize the same JSON without depending on the engine itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Provenance ───────────────────────────────────────────────────────────

/// Where the numbers in a result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub dataset: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// A payload together with the citations gathered while computing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cited<T> {
    #[serde(flatten)]
    pub payload: T,
    pub citations: Vec<Citation>,
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RegionNotFound,
    CategoryNotFound,
    NoData,
    InsufficientData,
    ShapeError,
    AllFailed,
    NoCategories,
    UnparsedQuery,
}

/// The error side of the result boundary: a readable message, a machine
/// kind, and (for category lookups) up to three suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Either a cited payload or an error descriptor, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Success(Cited<T>),
    Failure(ErrorDescriptor),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

// ── Metric (gridded) payloads ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageMetric {
    /// Region name as asked.
    pub region: String,
    /// Registry entry the name resolved to.
    pub resolved_region: String,
    pub value: f64,
    pub unit: String,
    pub years: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub region: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub rows: Vec<MetricRow>,
    pub unit: String,
    pub years: String,
}

// ── Category (tabular) payloads ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// 1-based display rank.
    pub rank: usize,
    pub category: String,
    pub total: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRanking {
    pub region: String,
    pub limit: usize,
    pub rows: Vec<CategoryTotal>,
    pub years: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubregionTotal {
    pub region: String,
    pub subregion: String,
    pub total: Option<f64>,
    pub unit: String,
    /// First year seen for the group, not a per-group aggregate.
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubregionRanking {
    pub category: String,
    pub region: String,
    pub year: String,
    pub rows: Vec<SubregionTotal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyTotal {
    pub year: i32,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub category: String,
    pub region: String,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub direction: TrendDirection,
    pub yearly: Vec<YearlyTotal>,
}

/// Average metric next to yearly category totals. Not a statistical
/// correlation: the metric is one scalar for the whole period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub category: String,
    pub region: String,
    pub average_metric: f64,
    pub unit: String,
    pub yearly: Vec<YearlyTotal>,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub argument: String,
    pub data: String,
    pub metric: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: f64,
    pub area: Option<f64>,
    #[serde(rename = "yield")]
    pub yield_: Option<f64>,
    pub subregions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category_a: String,
    pub category_b: String,
    pub region: String,
    pub year: String,
    pub arguments: Vec<Argument>,
    pub table: Vec<CategoryStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Highest sub-region in one region against the lowest in another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossRegionReport {
    pub category: String,
    pub highest_region: String,
    pub lowest_region: String,
    pub year: Option<i32>,
    pub highest: Outcome<SubregionRanking>,
    pub lowest: Outcome<SubregionRanking>,
}

// ── Answers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "answer", rename_all = "snake_case")]
pub enum Answer {
    AverageMetric(Cited<AverageMetric>),
    MetricComparison(Cited<MetricComparison>),
    CategoryRanking(Cited<CategoryRanking>),
    SubregionRanking(Cited<SubregionRanking>),
    CrossRegionSubregions(CrossRegionReport),
    Trend(Cited<TrendReport>),
    Correlation(Cited<CorrelationReport>),
    CategoryComparison(Cited<CategoryComparison>),
    /// Independently executed parts, keyed by part name.
    Composite { parts: BTreeMap<String, Answer> },
}

impl Answer {
    /// Citations attached directly to this answer (composite parts carry their own).
    pub fn citations(&self) -> Vec<&Citation> {
        match self {
            Answer::AverageMetric(c) => c.citations.iter().collect(),
            Answer::MetricComparison(c) => c.citations.iter().collect(),
            Answer::CategoryRanking(c) => c.citations.iter().collect(),
            Answer::SubregionRanking(c) => c.citations.iter().collect(),
            Answer::Trend(c) => c.citations.iter().collect(),
            Answer::Correlation(c) => c.citations.iter().collect(),
            Answer::CategoryComparison(c) => c.citations.iter().collect(),
            Answer::CrossRegionSubregions(r) => [&r.highest, &r.lowest]
                .into_iter()
                .filter_map(|o| match o {
                    Outcome::Success(c) => Some(c.citations.iter()),
                    Outcome::Failure(_) => None,
                })
                .flatten()
                .collect(),
            Answer::Composite { .. } => Vec::new(),
        }
    }
}

// ── Parsed intent ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum QueryIntent {
    AverageMetric {
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    CompareMetric {
        regions: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    RankCategories {
        region: String,
        limit: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    CrossRegionSubregions {
        category: String,
        highest_region: String,
        lowest_region: String,
    },
    RankSubregions {
        category: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        year: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
        ascending: bool,
    },
    Trend {
        category: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        region: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    Correlation {
        category: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    CompareCategories {
        category_a: String,
        category_b: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        year: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    MultiPart {
        regions: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
    TrendCorrelation {
        category: String,
        region: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        years: Option<Vec<i32>>,
    },
}

// ── Query envelope ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInfo {
    pub original_question: String,
    pub intent: Option<QueryIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_functions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts_executed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub parsed_info: ParsedInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
    /// Per-part failures of multi-part and composite questions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}
