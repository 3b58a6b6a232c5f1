//! Question execution: parse, dispatch to the engine, wrap the outcome in a
//! [`QueryResponse`].
//!
//! Two question shapes bypass the single-intent cascade: a trend question
//! that also asks to correlate, and a multi-part question that mixes
//! rainfall with crop rankings. Their parts run independently; whatever
//! succeeds is returned next to the per-part error strings.

use std::collections::BTreeMap;

use samarth_types::{Answer, CrossRegionReport, ErrorDescriptor, ParsedInfo, QueryIntent, QueryResponse};
use tracing::{debug, info};

use crate::engine::{AnalyticsEngine, into_outcome};
use crate::error::QueryError;
use crate::parser::{
    self, MultiPartPlan, ParseContext, SUGGESTED_FUNCTIONS, function_call,
};

pub fn execute(engine: &AnalyticsEngine, question: &str) -> QueryResponse {
    info!(question, "answering");
    let ctx = ParseContext::new(engine.records().years());

    if parser::is_trend_correlation(question) {
        return match parser::parse_trend_correlation(question, &ctx) {
            Some(intent) => respond(engine, question, intent),
            None => unparsed(question),
        };
    }
    if parser::is_multi_part(question) {
        let plan = parser::plan_multi_part(question, &ctx);
        debug!(?plan, "multi-part question");
        let intent = QueryIntent::MultiPart {
            regions: plan.regions.clone(),
            years: plan.years.clone(),
        };
        return composite(question, intent, run_multi_part(engine, &plan));
    }
    match parser::parse(question, &ctx) {
        Some(parsed) => respond(engine, question, parsed.intent),
        None => unparsed(question),
    }
}

/// Run an already-resolved intent. Used by `execute` and by the direct CLI
/// subcommands, which build the intent from their arguments.
///
/// A multi-part plan is only ever built from question text, so a bare
/// `MultiPart` intent is answered as unparsed.
pub fn respond(engine: &AnalyticsEngine, question: &str, intent: QueryIntent) -> QueryResponse {
    match &intent {
        QueryIntent::TrendCorrelation { category, region, years } => {
            let parts = run_trend_correlation(engine, category, region, years.as_deref());
            composite(question, intent, parts)
        }
        _ => {
            let outcome = answer(engine, &intent);
            let function_suggestion = Some(function_call(&intent));
            let (result, error) = match outcome {
                Ok(answer) => (Some(answer), None),
                Err(e) => {
                    debug!(error = %e, "query failed");
                    (None, Some(ErrorDescriptor::from(e)))
                }
            };
            QueryResponse {
                parsed_info: ParsedInfo {
                    original_question: question.to_string(),
                    intent: Some(intent),
                    function_suggestion,
                    suggested_functions: Vec::new(),
                    parts_executed: Vec::new(),
                },
                result,
                error,
                errors: Vec::new(),
            }
        }
    }
}

/// Dispatch a single intent to its engine operation.
pub fn answer(engine: &AnalyticsEngine, intent: &QueryIntent) -> Result<Answer, QueryError> {
    Ok(match intent {
        QueryIntent::AverageMetric { region, years } => {
            Answer::AverageMetric(engine.average_metric(region, years.as_deref())?)
        }
        QueryIntent::CompareMetric { regions, years } => {
            Answer::MetricComparison(engine.compare_metric(regions, years.as_deref())?)
        }
        QueryIntent::RankCategories { region, limit, years } => {
            Answer::CategoryRanking(engine.rank_categories(region, years.as_deref(), *limit)?)
        }
        QueryIntent::CrossRegionSubregions { category, highest_region, lowest_region } => {
            let year = engine.records().latest_year();
            let highest = engine.rank_subregions(category, Some(highest_region), year, Some(1), false);
            let lowest = engine.rank_subregions(category, Some(lowest_region), year, Some(1), true);
            Answer::CrossRegionSubregions(CrossRegionReport {
                category: category.clone(),
                highest_region: highest_region.clone(),
                lowest_region: lowest_region.clone(),
                year,
                highest: into_outcome(highest),
                lowest: into_outcome(lowest),
            })
        }
        QueryIntent::RankSubregions { category, region, year, limit, ascending } => Answer::SubregionRanking(
            engine.rank_subregions(category, region.as_deref(), *year, *limit, *ascending)?,
        ),
        QueryIntent::Trend { category, region, years } => {
            Answer::Trend(engine.trend(category, region.as_deref(), years.as_deref())?)
        }
        QueryIntent::Correlation { category, region, years } => {
            Answer::Correlation(engine.correlate(category, region, years.as_deref())?)
        }
        QueryIntent::CompareCategories { category_a, category_b, region, year, years } => {
            Answer::CategoryComparison(engine.compare_categories(
                category_a,
                category_b,
                region,
                *year,
                years.as_deref(),
            )?)
        }
        QueryIntent::MultiPart { .. } | QueryIntent::TrendCorrelation { .. } => {
            return Err(QueryError::Unparsed);
        }
    })
}

// ── Composite questions ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct Parts {
    answers: BTreeMap<String, Answer>,
    order: Vec<String>,
    errors: Vec<String>,
}

impl Parts {
    fn record(&mut self, key: String, label: &str, outcome: Result<Answer, QueryError>) {
        match outcome {
            Ok(answer) => {
                self.order.push(key.clone());
                self.answers.insert(key, answer);
            }
            Err(e) => {
                debug!(part = %key, error = %e, "part failed");
                self.errors.push(format!("{label}: {e}"));
            }
        }
    }
}

fn run_trend_correlation(
    engine: &AnalyticsEngine,
    category: &str,
    region: &str,
    years: Option<&[i32]>,
) -> Parts {
    let mut parts = Parts::default();
    parts.record(
        "trend_analysis".into(),
        "Trend analysis error",
        engine.trend(category, Some(region), years).map(Answer::Trend),
    );
    parts.record(
        "correlation".into(),
        "Correlation error",
        engine.correlate(category, region, years).map(Answer::Correlation),
    );
    parts
}

fn run_multi_part(engine: &AnalyticsEngine, plan: &MultiPartPlan) -> Parts {
    let mut parts = Parts::default();
    let years = plan.years.as_deref();
    if let Some((a, b)) = &plan.rainfall_pair {
        parts.record(
            "rainfall_comparison".into(),
            "Rainfall comparison error",
            engine
                .compare_metric(&[a.clone(), b.clone()], years)
                .map(Answer::MetricComparison),
        );
    }
    for region in &plan.crop_regions {
        parts.record(
            format!("top_crops_{}", region.replace(' ', "_")),
            &format!("Top crops error for {region}"),
            engine
                .rank_categories(region, years, plan.limit)
                .map(Answer::CategoryRanking),
        );
    }
    parts
}

fn composite(question: &str, intent: QueryIntent, parts: Parts) -> QueryResponse {
    let result = (!parts.answers.is_empty()).then(|| Answer::Composite { parts: parts.answers });
    let error = (result.is_none() && parts.errors.is_empty()).then(|| ErrorDescriptor::from(QueryError::Unparsed));
    QueryResponse {
        parsed_info: ParsedInfo {
            original_question: question.to_string(),
            function_suggestion: Some(function_call(&intent)),
            intent: Some(intent),
            suggested_functions: Vec::new(),
            parts_executed: parts.order,
        },
        result,
        error,
        errors: parts.errors,
    }
}

fn unparsed(question: &str) -> QueryResponse {
    debug!(question, "no rule matched");
    QueryResponse {
        parsed_info: ParsedInfo {
            original_question: question.to_string(),
            intent: None,
            function_suggestion: None,
            suggested_functions: SUGGESTED_FUNCTIONS.iter().map(|s| s.to_string()).collect(),
            parts_executed: Vec::new(),
        },
        result: None,
        error: Some(QueryError::Unparsed.into()),
        errors: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use samarth_types::ErrorKind;

    fn engine() -> AnalyticsEngine {
        AnalyticsEngine::new(fixtures::grid(), fixtures::records())
    }

    // ── single intents ───────────────────────────────────────────────

    #[test]
    fn test_average_rainfall_question() {
        let resp = execute(&engine(), "What is the average annual rainfall in Karnataka?");
        let Some(Answer::AverageMetric(avg)) = resp.result else {
            panic!("expected average, got {:?}", resp.result);
        };
        assert!((avg.payload.value - 165.0).abs() < 1e-9);
        assert_eq!(avg.citations.len(), 1);
        assert_eq!(
            resp.parsed_info.function_suggestion.as_deref(),
            Some(r#"average_metric("Karnataka", years=None)"#)
        );
    }

    #[test]
    fn test_top_crops_question() {
        let resp = execute(&engine(), "What are the top 2 crops in Punjab?");
        let Some(Answer::CategoryRanking(ranking)) = resp.result else {
            panic!("expected ranking, got {:?}", resp.result);
        };
        let names: Vec<&str> = ranking.payload.rows.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, ["Wheat", "Rice"]);
    }

    #[test]
    fn test_unknown_crop_is_error_descriptor() {
        let resp = execute(&engine(), "Which district has the highest production of Mango in Punjab?");
        assert!(resp.result.is_none());
        let err = resp.error.expect("error descriptor");
        assert_eq!(err.kind, ErrorKind::CategoryNotFound);
        assert!(err.error.contains("Mango"));
    }

    #[test]
    fn test_unparsed_lists_functions() {
        let resp = execute(&engine(), "Tell me a joke");
        assert!(resp.parsed_info.intent.is_none());
        assert_eq!(resp.parsed_info.suggested_functions.len(), SUGGESTED_FUNCTIONS.len());
        assert_eq!(resp.error.map(|e| e.kind), Some(ErrorKind::UnparsedQuery));
    }

    #[test]
    fn test_cross_region_runs_both_sides() {
        let q = "Identify the district in Punjab with the highest production of Rice in the most recent \
                 year and compare that with the district with the lowest production of Rice in Tamil Nadu.";
        let resp = execute(&engine(), q);
        let Some(Answer::CrossRegionSubregions(report)) = resp.result else {
            panic!("expected cross-region report, got {:?}", resp.result);
        };
        assert_eq!(report.year, Some(2021));
        assert!(report.highest.is_success());
        // Tamil Nadu has no 2021 rows.
        assert!(!report.lowest.is_success());
    }

    #[test]
    fn test_respond_with_direct_intent() {
        let intent = QueryIntent::CompareCategories {
            category_a: "Rice".into(),
            category_b: "Wheat".into(),
            region: "Punjab".into(),
            year: None,
            years: None,
        };
        let resp = respond(&engine(), "compare-crops Rice Wheat Punjab", intent);
        assert!(matches!(resp.result, Some(Answer::CategoryComparison(_))));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_respond_bare_multi_part_intent_is_unparsed() {
        let intent = QueryIntent::MultiPart {
            regions: vec!["Punjab".into(), "Tamil Nadu".into()],
            years: None,
        };
        let resp = respond(&engine(), "multi-part", intent);
        assert!(resp.result.is_none());
        assert!(resp.parsed_info.parts_executed.is_empty());
        assert_eq!(resp.error.map(|e| e.kind), Some(ErrorKind::UnparsedQuery));
    }

    // ── composites ───────────────────────────────────────────────────

    #[test]
    fn test_multi_part_question() {
        let q = "Compare the rainfall in Punjab and Tamil Nadu. Also list the top 2 crops in each of those states";
        let resp = execute(&engine(), q);
        assert_eq!(
            resp.parsed_info.parts_executed,
            ["rainfall_comparison", "top_crops_Tamil_Nadu", "top_crops_Punjab"]
        );
        assert!(resp.errors.is_empty());
        let Some(Answer::Composite { parts }) = resp.result else {
            panic!("expected composite, got {:?}", resp.result);
        };
        let Some(Answer::CategoryRanking(punjab)) = parts.get("top_crops_Punjab") else {
            panic!("missing Punjab ranking");
        };
        assert_eq!(punjab.payload.rows.len(), 2);
    }

    #[test]
    fn test_trend_correlation_question() {
        let q = "Analyze the production trend of Rice in Punjab over the last decade and correlate it with rainfall";
        let resp = execute(&engine(), q);
        assert_eq!(resp.parsed_info.parts_executed, ["trend_analysis", "correlation"]);
        assert!(resp.errors.is_empty());
    }

    #[test]
    fn test_trend_correlation_honours_years() {
        let q = "Analyze the production trend of Wheat in Punjab for 2019-2020 and correlate it with rainfall";
        let resp = execute(&engine(), q);
        assert_eq!(
            resp.parsed_info.intent,
            Some(QueryIntent::TrendCorrelation {
                category: "Wheat".into(),
                region: "Punjab".into(),
                years: Some(vec![2019, 2020]),
            })
        );
        let Some(Answer::Composite { parts }) = resp.result else {
            panic!("expected composite, got {:?}", resp.result);
        };
        let Some(Answer::Trend(trend)) = parts.get("trend_analysis") else {
            panic!("missing trend part");
        };
        let years: Vec<i32> = trend.payload.yearly.iter().map(|y| y.year).collect();
        assert_eq!(years, [2019, 2020]);
        let Some(Answer::Correlation(corr)) = parts.get("correlation") else {
            panic!("missing correlation part");
        };
        assert_eq!(corr.payload.yearly.len(), 2);
    }

    #[test]
    fn test_trend_correlation_collects_part_errors() {
        let q = "Analyze the production trend of Mango in Punjab and correlate it with rainfall";
        let resp = execute(&engine(), q);
        assert!(resp.result.is_none());
        assert_eq!(resp.errors.len(), 2);
        assert!(resp.errors[0].starts_with("Trend analysis error: "));
        assert!(resp.errors[1].starts_with("Correlation error: "));
    }
}
