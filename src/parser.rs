use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

use samarth_types::QueryIntent;

// ── Word lists ─────────────────────────────────────────────────────
//
// Region captures are greedy runs of words, so they drag trailing filler
// along: "Karnataka for the most recent year". Each question family trims
// its own tail list.

const AVERAGE_STOP: &[&str] = &[
    "the", "for", "in", "of", "and", "most", "recent", "year", "available", "last",
];
const COMPARE_STOP: &[&str] = &["the", "for", "in", "of", "and"];
const TOP_STOP: &[&str] = &[
    "the", "for", "in", "of", "and", "most", "recent", "year", "years", "available", "last",
    "during", "over",
];
const SUBREGION_STOP: &[&str] = &[
    "the", "for", "in", "of", "and", "most", "recent", "year", "available",
];
const TREND_STOP: &[&str] = &[
    "the", "for", "in", "of", "and", "over", "last", "decade", "period", "same", "during",
];
const CATEGORY_COMPARE_STOP: &[&str] = &[
    "the", "for", "in", "of", "and", "based", "on", "historical", "data", "from", "last",
    "most", "recent", "year", "years",
];

/// Regions recognised inside free text. Also the token list for stripping
/// region words out of crop captures.
pub const KNOWN_REGIONS: &[&str] = &[
    "Andhra Pradesh",
    "Karnataka",
    "Maharashtra",
    "Tamil Nadu",
    "Kerala",
    "Punjab",
    "Gujarat",
    "West Bengal",
    "Rajasthan",
    "Uttar Pradesh",
    "Madhya Pradesh",
    "Bihar",
    "Odisha",
    "Telangana",
    "Assam",
];

pub const DEFAULT_LIMIT: usize = 10;

/// Engine calls offered when a question matches nothing.
pub const SUGGESTED_FUNCTIONS: &[&str] = &[
    "average_metric(region, years)",
    "compare_metric(regions, years)",
    "rank_categories(region, years, limit)",
    "rank_subregions(category, region, year, limit, ascending)",
    "trend(category, region, years)",
    "correlate(category, region, years)",
    "compare_categories(category_a, category_b, region, year, years)",
];

/// Drop trailing (and optionally leading) filler words and punctuation.
/// Tokens without any letter, such as "2019-2021", count as filler.
/// Returns the input unchanged if nothing would be left.
pub fn trim_words(raw: &str, stop: &[&str], leading: bool) -> String {
    let raw = raw.trim();
    let is_filler = |w: &&str| {
        let w = w.trim_matches(|c: char| c.is_ascii_punctuation());
        w.is_empty() || !w.chars().any(char::is_alphabetic) || stop.iter().any(|s| s.eq_ignore_ascii_case(w))
    };
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    while words.last().is_some_and(|w| is_filler(w)) {
        words.pop();
    }
    if leading {
        let skip = words.iter().take_while(|w| is_filler(*w)).count();
        words.drain(..skip);
    }
    if words.is_empty() {
        return raw.to_string();
    }
    let joined = words.join(" ");
    joined
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}

/// How a captured crop phrase is cleaned before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCleanup {
    Keep,
    /// Remove every word that is a substring of one of these region names.
    /// A crop whose name hides inside a region name is lost, in which case
    /// the capture is kept as is.
    StripRegionTokens(&'static [&'static str]),
}

impl CategoryCleanup {
    pub fn apply(&self, raw: &str) -> String {
        let raw = raw.trim();
        match self {
            CategoryCleanup::Keep => raw.to_string(),
            CategoryCleanup::StripRegionTokens(regions) => {
                let kept: Vec<&str> = raw
                    .split_whitespace()
                    .filter(|w| {
                        let w = w.to_lowercase();
                        !regions.iter().any(|r| r.to_lowercase().contains(&w))
                    })
                    .collect();
                if kept.is_empty() {
                    raw.to_string()
                } else {
                    kept.join(" ")
                }
            }
        }
    }
}

const CROP_CLEANUP: CategoryCleanup = CategoryCleanup::StripRegionTokens(KNOWN_REGIONS);
const CROP_AS_IS: CategoryCleanup = CategoryCleanup::Keep;

/// Canonical spelling of a known region, ignoring case and spacing
/// ("tamilnadu" -> "Tamil Nadu"); otherwise title-cased.
pub fn normalize_known_region(captured: &str) -> String {
    let squashed: String = captured.split_whitespace().collect::<String>().to_lowercase();
    if let Some(r) = KNOWN_REGIONS
        .iter()
        .find(|r| r.split_whitespace().collect::<String>().to_lowercase() == squashed)
    {
        return r.to_string();
    }
    captured
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ── Years ──────────────────────────────────────────────────────────

// "2015-2019", "2015 – 2019"
static RE_YEAR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})\s*[-–]\s*(\d{4})").unwrap());

// "last 3 years", "last 5 available years"
static RE_LAST_N_YEARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)last\s+(\d+)\s+(?:available\s+)?years?").unwrap());

// "in 2019 and 2021"
static RE_YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

/// Years the records actually hold; backs "last N years" and "most recent".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    /// Ascending, distinct.
    pub record_years: Vec<i32>,
}

impl ParseContext {
    pub fn new(record_years: Vec<i32>) -> Self {
        Self { record_years }
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.record_years.last().copied()
    }

    fn last_n_years(&self, n: usize) -> Vec<i32> {
        let ys = &self.record_years;
        ys[ys.len().saturating_sub(n)..].to_vec()
    }
}

/// Explicit range, then "last N years" against the records, then every
/// standalone 19xx/20xx token.
pub fn extract_years(text: &str, ctx: &ParseContext) -> Option<Vec<i32>> {
    if let Some(c) = RE_YEAR_RANGE.captures(text) {
        let start: i32 = c[1].parse().ok()?;
        let end: i32 = c[2].parse().ok()?;
        let years: Vec<i32> = (start..=end).collect();
        return (!years.is_empty()).then_some(years);
    }
    if let Some(c) = RE_LAST_N_YEARS.captures(text) {
        let n: usize = c[1].parse().ok()?;
        let years = ctx.last_n_years(n);
        return (!years.is_empty()).then_some(years);
    }
    let years: Vec<i32> = RE_YEAR_TOKEN
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    (!years.is_empty()).then_some(years)
}

// ── Rule cascade ───────────────────────────────────────────────────

/// Question families, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    AverageMetric,
    CompareMetric,
    RankCategories,
    CrossRegionSubregions,
    RankSubregions,
    Trend,
    Correlation,
    CompareCategories,
}

struct Question<'a> {
    text: &'a str,
    lower: String,
    years: Option<Vec<i32>>,
    ctx: &'a ParseContext,
}

impl<'a> Question<'a> {
    fn new(text: &'a str, ctx: &'a ParseContext) -> Self {
        let text = text.trim();
        Self {
            text,
            lower: text.to_lowercase(),
            years: extract_years(text, ctx),
            ctx,
        }
    }
}

type Extract = fn(&Captures<'_>, &Question<'_>) -> Option<QueryIntent>;

pub struct Rule {
    pub stage: Stage,
    pub pattern: Regex,
    extract: Extract,
}

// Greedy run of words; filler is trimmed afterwards.
const WORDS: &str = r"([A-Za-z]+(?:\s+[A-Za-z]+)*)";
// Everything up to a comma or question mark.
const CLAUSE: &str = r"([^,?]+)";

fn rule(stage: Stage, template: &str, extract: Extract) -> Rule {
    let pattern = template.replace("{W}", WORDS).replace("{C}", CLAUSE);
    Rule {
        stage,
        pattern: Regex::new(&format!("(?i){pattern}")).unwrap(),
        extract,
    }
}

fn group<'t>(c: &Captures<'t>, i: usize) -> Option<&'t str> {
    c.get(i).map(|m| m.as_str().trim())
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use Stage::*;
    vec![
        // What is the average annual rainfall in Karnataka?
        rule(AverageMetric, r"what.*is.*average.*annual.*rainfall.*in\s+{W}", average_metric),
        rule(AverageMetric, r"what.*is.*average.*rainfall.*in\s+{W}", average_metric),
        rule(AverageMetric, r"average.*annual.*rainfall.*in\s+{W}", average_metric),
        rule(AverageMetric, r"average.*rainfall.*in\s+{W}", average_metric),
        // Compare rainfall in Kerala and Punjab
        rule(CompareMetric, r"compare.*average.*annual.*rainfall.*in\s+{W}\s+and\s+{W}", compare_metric),
        rule(CompareMetric, r"compare.*rainfall.*in\s+{W}\s+and\s+{W}", compare_metric),
        rule(CompareMetric, r"rainfall.*comparison.*between\s+{W}\s+and\s+{W}", compare_metric),
        rule(CompareMetric, r"compare.*average.*rainfall.*in\s+{W}\s+and\s+{W}", compare_metric),
        // Top 5 crops in Punjab
        rule(RankCategories, r"top\s+(\d+).*crops?\s+in\s+{C}", rank_categories),
        rule(RankCategories, r"most\s+produced\s+crops?\s+in\s+{C}", rank_categories_default),
        rule(RankCategories, r"list.*top\s+(\d+).*crops?\s+in\s+{C}", rank_categories),
        // Identify the district in X with the highest production of Rice ...
        // and compare that with the lowest production of Rice in Y
        rule(
            CrossRegionSubregions,
            r"identify.*district.*in\s+{W}\s+with.*highest.*production.*of\s+([A-Za-z]+)\s+[^.]*compare.*lowest.*production.*of\s+([A-Za-z]+)\s+in\s+{W}",
            cross_region,
        ),
        rule(
            CrossRegionSubregions,
            r"(?:highest|district.*with.*highest).*production.*of\s+([A-Za-z]+)",
            cross_region_split,
        ),
        // Which district has the highest production of Rice in Punjab?
        rule(
            RankSubregions,
            r"identify.*district.*in\s+{W}\s+with.*highest.*production.*of\s+{W}",
            rank_subregions_region_first,
        ),
        rule(RankSubregions, r"what.*is.*highest.*production.*district.*for\s+{W}\s+in\s+{W}", rank_subregions),
        rule(RankSubregions, r"highest.*production.*district.*for\s+{W}\s+in\s+{W}", rank_subregions),
        rule(RankSubregions, r"district.*with.*highest.*production.*of\s+{W}\s+in\s+{W}", rank_subregions),
        rule(
            RankSubregions,
            r"district.*in\s+{W}\s+with.*highest.*production.*of\s+{W}",
            rank_subregions_region_first_plain,
        ),
        rule(RankSubregions, r"highest.*production.*of\s+{W}\s+in\s+{W}", rank_subregions),
        rule(RankSubregions, r"lowest.*production.*of\s+{W}\s+in\s+{W}", rank_subregions),
        // Analyze the production trend of Rice in Punjab over the last decade
        rule(Trend, r"analyze.*trend.*of\s+{W}\s+in\s+{W}", trend),
        rule(Trend, r"analyze.*production.*trend.*of\s+{W}\s+in\s+{W}", trend),
        rule(Trend, r"trend.*of\s+{W}\s+in\s+{W}", trend),
        rule(Trend, r"production.*trend.*of\s+{W}\s+in\s+{W}", trend),
        rule(Trend, r"decade.*trend.*of\s+{W}", trend),
        rule(Trend, r"decadal.*trend.*of\s+{W}", trend),
        // Correlate rice production with rainfall in Punjab
        rule(
            Correlation,
            r"correlate\s+(?:the\s+)?(?:production\s+of\s+)?([a-z]+)(?:\s+production)?\s+with.*rainfall.*in\s+{C}",
            correlation,
        ),
        rule(
            Correlation,
            r"correlate\s+(?:the\s+)?(?:production\s+of\s+)?([a-z]+)(?:\s+production)?\s+with.*climate.*in\s+{C}",
            correlation,
        ),
        rule(
            Correlation,
            r"relationship.*between\s+(?:the\s+)?([a-z]+)(?:\s+production)?\s+and.*(?:climate|rainfall).*in\s+{C}",
            correlation,
        ),
        // Promote Millet over Rice in Karnataka
        rule(CompareCategories, r"promote\s+{W}\s+over\s+{W}.*in\s+{W}", compare_categories),
        rule(CompareCategories, r"arguments.*for\s+{W}\s+vs\s+{W}.*in\s+{W}", compare_categories),
        rule(CompareCategories, r"compare\s+{W}\s+and\s+{W}\s+in\s+{W}", compare_categories),
        rule(CompareCategories, r"{W}\s+vs\s+{W}.*in\s+{W}", compare_categories),
    ]
});

// Split form of the cross-region question: the regions are looked up on
// their own once the crop has matched. Lazy so each binds to its own clause.
static RE_HIGHEST_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)highest.*?production.*?of\s+[A-Za-z]+\s+in\s+{WORDS}")).unwrap()
});
static RE_LOWEST_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)lowest.*?production.*?of\s+[A-Za-z]+\s+in\s+{WORDS}")).unwrap()
});

// ── Extractors ─────────────────────────────────────────────────────

fn average_metric(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::AverageMetric {
        region: trim_words(group(c, 1)?, AVERAGE_STOP, false),
        years: q.years.clone(),
    })
}

fn compare_metric(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::CompareMetric {
        regions: vec![
            trim_words(group(c, 1)?, COMPARE_STOP, false),
            trim_words(group(c, 2)?, COMPARE_STOP, false),
        ],
        years: q.years.clone(),
    })
}

fn rank_categories(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::RankCategories {
        region: trim_words(group(c, 2)?, TOP_STOP, false),
        limit: group(c, 1)?.parse().unwrap_or(DEFAULT_LIMIT),
        years: q.years.clone(),
    })
}

fn rank_categories_default(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::RankCategories {
        region: trim_words(group(c, 1)?, TOP_STOP, false),
        limit: DEFAULT_LIMIT,
        years: q.years.clone(),
    })
}

fn cross_region(c: &Captures<'_>, _q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::CrossRegionSubregions {
        category: CROP_CLEANUP.apply(group(c, 2)?),
        highest_region: trim_words(group(c, 1)?, SUBREGION_STOP, false),
        lowest_region: trim_words(group(c, 4)?, SUBREGION_STOP, false),
    })
}

fn cross_region_split(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    let highest = RE_HIGHEST_IN.captures(q.text)?;
    let lowest = RE_LOWEST_IN.captures(q.text)?;
    Some(QueryIntent::CrossRegionSubregions {
        category: CROP_CLEANUP.apply(group(c, 1)?),
        highest_region: trim_words(group(&highest, 1)?, SUBREGION_STOP, false),
        lowest_region: trim_words(group(&lowest, 1)?, SUBREGION_STOP, false),
    })
}

fn subregion_intent(crop: &str, region: &str, q: &Question<'_>) -> QueryIntent {
    let year = if q.lower.contains("most recent") {
        q.ctx.latest_year()
    } else {
        None
    };
    QueryIntent::RankSubregions {
        category: CROP_CLEANUP.apply(crop),
        region: Some(trim_words(region, SUBREGION_STOP, false)),
        year,
        limit: Some(1),
        ascending: q.lower.contains("lowest"),
    }
}

fn rank_subregions(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(subregion_intent(group(c, 1)?, group(c, 2)?, q))
}

/// "identify ... district in <region> with ... of <crop>": the crop run may
/// swallow a trailing "in"/"and" clause, in which case only its first word
/// is the crop.
fn rank_subregions_region_first(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    let crop = group(c, 2)?;
    let words: Vec<&str> = crop.split_whitespace().collect();
    let crop = match words.as_slice() {
        [first, .., last] if last.eq_ignore_ascii_case("in") || last.eq_ignore_ascii_case("and") => *first,
        _ => crop,
    };
    Some(subregion_intent(crop, group(c, 1)?, q))
}

fn rank_subregions_region_first_plain(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(subregion_intent(group(c, 2)?, group(c, 1)?, q))
}

fn trend(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::Trend {
        category: CROP_AS_IS.apply(group(c, 1)?),
        region: group(c, 2).map(|r| trim_words(r, TREND_STOP, true)),
        years: q.years.clone(),
    })
}

fn correlation(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::Correlation {
        category: CROP_AS_IS.apply(group(c, 1)?),
        region: trim_words(group(c, 2)?, COMPARE_STOP, false),
        years: q.years.clone(),
    })
}

fn compare_categories(c: &Captures<'_>, q: &Question<'_>) -> Option<QueryIntent> {
    Some(QueryIntent::CompareCategories {
        category_a: CROP_AS_IS.apply(group(c, 1)?),
        category_b: CROP_AS_IS.apply(group(c, 2)?),
        region: trim_words(group(c, 3)?, CATEGORY_COMPARE_STOP, false),
        year: q.years.as_ref().and_then(|ys| ys.first().copied()),
        years: q.years.clone(),
    })
}

// ── Single-intent parse ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub stage: Stage,
    pub intent: QueryIntent,
}

/// First rule whose pattern matches and whose extractor accepts the
/// captures wins; later families are never consulted.
pub fn parse(question: &str, ctx: &ParseContext) -> Option<Parsed> {
    let q = Question::new(question, ctx);
    RULES.iter().find_map(|rule| {
        let caps = rule.pattern.captures(q.text)?;
        let intent = (rule.extract)(&caps, &q)?;
        debug!(stage = ?rule.stage, pattern = rule.pattern.as_str(), "question matched");
        Some(Parsed { stage: rule.stage, intent })
    })
}

// ── Multi-part and composite questions ─────────────────────────────

/// Both a trend cue and a correlation cue.
pub fn is_trend_correlation(question: &str) -> bool {
    let lower = question.to_lowercase();
    (lower.contains("trend") || lower.contains("analyze")) && lower.contains("correlate")
}

/// Rainfall and crops asked together ("... also list the top crops"), or a
/// "list" request that mentions both domains.
pub fn is_multi_part(question: &str) -> bool {
    let lower = question.to_lowercase();
    let has_rainfall = ["rainfall", "precipitation", "climate"].iter().any(|w| lower.contains(w));
    let has_crops = ["crop", "production", "agriculture"].iter().any(|w| lower.contains(w));
    let has_parallel = lower.contains("parallel") || lower.contains("also");
    let has_list = lower.contains("list") && has_crops;
    (has_rainfall && has_crops && has_parallel) || (has_list && has_rainfall)
}

fn known_region_alternation() -> String {
    KNOWN_REGIONS
        .iter()
        .map(|r| r.replace(' ', r"\s*"))
        .collect::<Vec<_>>()
        .join("|")
}

static RE_MULTI_RAINFALL: LazyLock<Regex> = LazyLock::new(|| {
    let s = known_region_alternation();
    Regex::new(&format!(r"(?i)rainfall.*in\s+({s})\s+and\s+({s})")).unwrap()
});

static RE_MULTI_TOP: LazyLock<Regex> = LazyLock::new(|| {
    let s = known_region_alternation();
    Regex::new(&format!(r"(?i)top\s+(\d+).*crop.*in\s+({s})(?:\s+and\s+({s}))?")).unwrap()
});

static RE_TOP_N: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)top\s+(\d+)").unwrap());

/// What a multi-part question asks for. Each part runs on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPartPlan {
    /// Known regions mentioned anywhere, in registry-list order.
    pub regions: Vec<String>,
    pub years: Option<Vec<i32>>,
    pub rainfall_pair: Option<(String, String)>,
    pub crop_regions: Vec<String>,
    pub limit: usize,
}

pub fn plan_multi_part(question: &str, ctx: &ParseContext) -> MultiPartPlan {
    let lower = question.to_lowercase();
    let squashed: String = lower.split_whitespace().collect();
    let regions: Vec<String> = KNOWN_REGIONS
        .iter()
        .filter(|r| squashed.contains(&r.to_lowercase().replace(' ', "")))
        .map(|r| r.to_string())
        .collect();

    let rainfall_pair = if lower.contains("rainfall") || lower.contains("precipitation") {
        RE_MULTI_RAINFALL.captures(question).map(|c| {
            (normalize_known_region(&c[1]), normalize_known_region(&c[2]))
        })
    } else {
        None
    };

    let mut limit = DEFAULT_LIMIT;
    let mut crop_regions = Vec::new();
    if lower.contains("top") && lower.contains("crop") {
        let first_two = || regions.iter().take(2).cloned().collect::<Vec<_>>();
        if let Some(c) = RE_MULTI_TOP.captures(question) {
            limit = c[1].parse().unwrap_or(DEFAULT_LIMIT);
            crop_regions = if lower.contains("each of those states") || lower.contains("each state") {
                first_two()
            } else {
                [c.get(2), c.get(3)]
                    .into_iter()
                    .flatten()
                    .map(|m| normalize_known_region(m.as_str()))
                    .collect()
            };
        } else {
            if let Some(c) = RE_TOP_N.captures(question) {
                limit = c[1].parse().unwrap_or(DEFAULT_LIMIT);
            }
            crop_regions = first_two();
        }
    }

    MultiPartPlan {
        regions,
        years: extract_years(question, ctx),
        rainfall_pair,
        crop_regions,
        limit,
    }
}

// "Analyze the production trend of Rice in Punjab ... correlate ..."
static RE_TREND_CORRELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(?:analyze|production.*trend).*of\s+{WORDS}\s+in\s+{WORDS}")).unwrap()
});

/// The region run here continues into the correlation clause
/// ("Punjab over the last decade and correlate it ..."), so it is cut at
/// the first filler word rather than trimmed from the end.
pub fn parse_trend_correlation(question: &str, ctx: &ParseContext) -> Option<QueryIntent> {
    let c = RE_TREND_CORRELATION.captures(question)?;
    let region: Vec<&str> = group(&c, 2)?
        .split_whitespace()
        .take_while(|w| !TREND_STOP.iter().any(|s| s.eq_ignore_ascii_case(w)))
        .collect();
    if region.is_empty() {
        return None;
    }
    Some(QueryIntent::TrendCorrelation {
        category: CROP_AS_IS.apply(group(&c, 1)?),
        region: region.join(" "),
        years: extract_years(question, ctx),
    })
}

// ── Display ────────────────────────────────────────────────────────

fn fmt_years(years: &Option<Vec<i32>>) -> String {
    match years {
        Some(ys) => format!("{ys:?}"),
        None => "None".to_string(),
    }
}

fn fmt_opt<T: std::fmt::Debug>(v: &Option<T>) -> String {
    match v {
        Some(v) => format!("{v:?}"),
        None => "None".to_string(),
    }
}

/// The engine call an intent maps to, for display.
pub fn function_call(intent: &QueryIntent) -> String {
    match intent {
        QueryIntent::AverageMetric { region, years } => {
            format!("average_metric({region:?}, years={})", fmt_years(years))
        }
        QueryIntent::CompareMetric { regions, years } => {
            format!("compare_metric({regions:?}, years={})", fmt_years(years))
        }
        QueryIntent::RankCategories { region, limit, years } => {
            format!("rank_categories({region:?}, years={}, limit={limit})", fmt_years(years))
        }
        QueryIntent::CrossRegionSubregions { category, highest_region, lowest_region } => format!(
            "rank_subregions({category:?}, {highest_region:?}, limit=1) / rank_subregions({category:?}, {lowest_region:?}, limit=1, ascending=true)"
        ),
        QueryIntent::RankSubregions { category, region, year, limit, ascending } => format!(
            "rank_subregions({category:?}, region={}, year={}, limit={}, ascending={ascending})",
            fmt_opt(region),
            fmt_opt(year),
            fmt_opt(limit)
        ),
        QueryIntent::Trend { category, region, years } => {
            format!("trend({category:?}, region={}, years={})", fmt_opt(region), fmt_years(years))
        }
        QueryIntent::Correlation { category, region, years } => {
            format!("correlate({category:?}, {region:?}, years={})", fmt_years(years))
        }
        QueryIntent::CompareCategories { category_a, category_b, region, year, years } => format!(
            "compare_categories({category_a:?}, {category_b:?}, {region:?}, year={}, years={})",
            fmt_opt(year),
            fmt_years(years)
        ),
        QueryIntent::MultiPart { regions, years } => {
            format!("multi_part({regions:?}, years={})", fmt_years(years))
        }
        QueryIntent::TrendCorrelation { category, region, years } => {
            let years = fmt_years(years);
            format!("trend({category:?}, {region:?}, years={years}) + correlate({category:?}, {region:?}, years={years})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ParseContext {
        ParseContext::new(vec![2017, 2018, 2019, 2020, 2021])
    }

    fn intent(q: &str) -> QueryIntent {
        parse(q, &ctx()).unwrap_or_else(|| panic!("no rule matched {q:?}")).intent
    }

    fn stage(q: &str) -> Option<Stage> {
        parse(q, &ctx()).map(|p| p.stage)
    }

    // ── trim_words ───────────────────────────────────────────────────

    #[test]
    fn test_trim_words_trailing_filler() {
        assert_eq!(trim_words("Karnataka for the most recent year", AVERAGE_STOP, false), "Karnataka");
        assert_eq!(trim_words("Punjab during 2019-2021.", TOP_STOP, false), "Punjab");
        assert_eq!(trim_words("the", AVERAGE_STOP, false), "the");
    }

    #[test]
    fn test_trim_words_leading() {
        assert_eq!(trim_words("over the Punjab", TREND_STOP, true), "Punjab");
        assert_eq!(trim_words("over the Punjab", TREND_STOP, false), "over the Punjab");
    }

    // ── CategoryCleanup ──────────────────────────────────────────────

    #[test]
    fn test_strip_region_tokens() {
        assert_eq!(CROP_CLEANUP.apply("Rice Karnataka"), "Rice");
        assert_eq!(CROP_CLEANUP.apply("Sugarcane Tamil Nadu"), "Sugarcane");
        assert_eq!(CategoryCleanup::Keep.apply(" Rice Karnataka "), "Rice Karnataka");
    }

    #[test]
    fn test_strip_region_tokens_keeps_capture_when_all_removed() {
        // "Bihar" is itself a region word: nothing survives, keep the capture.
        assert_eq!(CROP_CLEANUP.apply("Bihar"), "Bihar");
    }

    #[test]
    fn test_normalize_known_region() {
        assert_eq!(normalize_known_region("tamilnadu"), "Tamil Nadu");
        assert_eq!(normalize_known_region("WEST  bengal"), "West Bengal");
        assert_eq!(normalize_known_region("goa"), "Goa");
    }

    // ── extract_years ────────────────────────────────────────────────

    #[test]
    fn test_extract_years_range() {
        assert_eq!(extract_years("from 2018-2020", &ctx()), Some(vec![2018, 2019, 2020]));
        assert_eq!(extract_years("from 2018 – 2019", &ctx()), Some(vec![2018, 2019]));
    }

    #[test]
    fn test_extract_years_last_n_uses_records() {
        assert_eq!(extract_years("over the last 3 years", &ctx()), Some(vec![2019, 2020, 2021]));
        assert_eq!(extract_years("last 2 available years", &ctx()), Some(vec![2020, 2021]));
        assert_eq!(extract_years("last 3 years", &ParseContext::default()), None);
    }

    #[test]
    fn test_extract_years_tokens() {
        assert_eq!(extract_years("in 2019 and 2021", &ctx()), Some(vec![2019, 2021]));
        assert_eq!(extract_years("in 12019", &ctx()), None);
        assert_eq!(extract_years("no years here", &ctx()), None);
    }

    // ── precedence ───────────────────────────────────────────────────

    #[test]
    fn test_average_metric() {
        assert_eq!(
            intent("What is the average annual rainfall in Karnataka for the most recent year?"),
            QueryIntent::AverageMetric { region: "Karnataka".into(), years: None }
        );
    }

    #[test]
    fn test_average_shadows_compare() {
        // The average family is tried first and swallows both regions.
        let q = "Compare the average annual rainfall in Karnataka and Tamil Nadu";
        assert_eq!(stage(q), Some(Stage::AverageMetric));
        assert_eq!(
            intent(q),
            QueryIntent::AverageMetric { region: "Karnataka and Tamil Nadu".into(), years: None }
        );
    }

    #[test]
    fn test_compare_metric() {
        assert_eq!(
            intent("Compare rainfall in Kerala and Punjab for 2019"),
            QueryIntent::CompareMetric {
                regions: vec!["Kerala".into(), "Punjab".into()],
                years: Some(vec![2019]),
            }
        );
        assert_eq!(stage("Rainfall comparison between Assam and Bihar"), Some(Stage::CompareMetric));
    }

    #[test]
    fn test_rank_categories() {
        assert_eq!(
            intent("What are the top 5 crops in Punjab?"),
            QueryIntent::RankCategories { region: "Punjab".into(), limit: 5, years: None }
        );
        assert_eq!(
            intent("Most produced crops in Tamil Nadu during 2019-2020"),
            QueryIntent::RankCategories {
                region: "Tamil Nadu".into(),
                limit: DEFAULT_LIMIT,
                years: Some(vec![2019, 2020]),
            }
        );
    }

    #[test]
    fn test_cross_region_full_form() {
        let q = "Identify the district in Karnataka with the highest production of Rice in the most \
                 recent year and compare that with the district with the lowest production of Rice in Tamil Nadu.";
        assert_eq!(
            intent(q),
            QueryIntent::CrossRegionSubregions {
                category: "Rice".into(),
                highest_region: "Karnataka".into(),
                lowest_region: "Tamil Nadu".into(),
            }
        );
    }

    #[test]
    fn test_cross_region_split_form() {
        let q = "Which district has the highest production of Wheat in Punjab, and the lowest production of Wheat in Bihar?";
        assert_eq!(
            intent(q),
            QueryIntent::CrossRegionSubregions {
                category: "Wheat".into(),
                highest_region: "Punjab".into(),
                lowest_region: "Bihar".into(),
            }
        );
    }

    #[test]
    fn test_rank_subregions_highest_and_lowest() {
        assert_eq!(
            intent("Highest production district for Rice in Punjab"),
            QueryIntent::RankSubregions {
                category: "Rice".into(),
                region: Some("Punjab".into()),
                year: None,
                limit: Some(1),
                ascending: false,
            }
        );
        assert_eq!(
            intent("Show the lowest production of Maize in Karnataka for the most recent year"),
            QueryIntent::RankSubregions {
                category: "Maize".into(),
                region: Some("Karnataka".into()),
                year: Some(2021),
                limit: Some(1),
                ascending: true,
            }
        );
    }

    #[test]
    fn test_rank_subregions_region_first() {
        assert_eq!(
            intent("Identify the district in Kerala with the highest production of Coconut"),
            QueryIntent::RankSubregions {
                category: "Coconut".into(),
                region: Some("Kerala".into()),
                year: None,
                limit: Some(1),
                ascending: false,
            }
        );
    }

    #[test]
    fn test_trend_region_trimmed() {
        assert_eq!(
            intent("Show the production trend of Rice in Punjab over the last decade"),
            QueryIntent::Trend {
                category: "Rice".into(),
                region: Some("Punjab".into()),
                years: None,
            }
        );
        assert_eq!(
            intent("decadal trend of Wheat"),
            QueryIntent::Trend { category: "Wheat".into(), region: None, years: None }
        );
    }

    #[test]
    fn test_correlation_whole_word() {
        assert_eq!(
            intent("Correlate rice production with rainfall in Punjab?"),
            QueryIntent::Correlation { category: "rice".into(), region: "Punjab".into(), years: None }
        );
        assert_eq!(
            intent("What is the relationship between wheat and climate in Haryana"),
            QueryIntent::Correlation { category: "wheat".into(), region: "Haryana".into(), years: None }
        );
    }

    #[test]
    fn test_correlation_without_region_falls_through() {
        assert_eq!(stage("correlate the trend with climate data"), None);
    }

    #[test]
    fn test_compare_categories() {
        assert_eq!(
            intent("Promote Millet over Rice in Karnataka based on historical data from the last 3 years"),
            QueryIntent::CompareCategories {
                category_a: "Millet".into(),
                category_b: "Rice".into(),
                region: "Karnataka".into(),
                year: Some(2019),
                years: Some(vec![2019, 2020, 2021]),
            }
        );
        assert_eq!(stage("Compare Rice and Wheat in Punjab"), Some(Stage::CompareCategories));
    }

    #[test]
    fn test_unparsed() {
        assert!(parse("Tell me a joke", &ctx()).is_none());
    }

    // ── multi-part ───────────────────────────────────────────────────

    #[test]
    fn test_is_multi_part() {
        assert!(is_multi_part(
            "Compare rainfall in Kerala and Punjab. In parallel, list the top 3 crops in each of those states"
        ));
        assert!(is_multi_part("List rainfall and crop production figures"));
        assert!(!is_multi_part("List the top 5 crops in Punjab"));
        assert!(!is_multi_part("Compare rainfall in Kerala and Punjab"));
    }

    #[test]
    fn test_plan_multi_part_each_state() {
        let q = "Compare the rainfall in Kerala and Tamil Nadu for 2019-2020. \
                 Also list the top 3 crops in each of those states";
        let plan = plan_multi_part(q, &ctx());
        assert_eq!(plan.rainfall_pair, Some(("Kerala".to_string(), "Tamil Nadu".to_string())));
        assert_eq!(plan.limit, 3);
        assert_eq!(plan.years, Some(vec![2019, 2020]));
        // registry-list order, not question order
        assert_eq!(plan.crop_regions, vec!["Tamil Nadu".to_string(), "Kerala".to_string()]);
    }

    #[test]
    fn test_plan_multi_part_explicit_regions() {
        let q = "Also show the rainfall in Punjab and Bihar, and the top 4 crops in Bihar and Punjab";
        let plan = plan_multi_part(q, &ctx());
        assert_eq!(plan.limit, 4);
        assert_eq!(plan.crop_regions, vec!["Bihar".to_string(), "Punjab".to_string()]);
    }

    #[test]
    fn test_plan_multi_part_default_limit() {
        let q = "List rainfall in Assam and Kerala plus the top crops";
        let plan = plan_multi_part(q, &ctx());
        assert_eq!(plan.limit, DEFAULT_LIMIT);
        assert_eq!(plan.crop_regions, vec!["Kerala".to_string(), "Assam".to_string()]);
    }

    #[test]
    fn test_parse_trend_correlation() {
        assert!(is_trend_correlation(
            "Analyze the production trend of Rice in Punjab over the last decade and correlate it with rainfall"
        ));
        assert_eq!(
            parse_trend_correlation(
                "Analyze the production trend of Rice in Punjab over the last decade and correlate it with rainfall",
                &ctx()
            ),
            Some(QueryIntent::TrendCorrelation { category: "Rice".into(), region: "Punjab".into(), years: None })
        );
        assert_eq!(
            parse_trend_correlation(
                "Analyze the production trend of Wheat in Punjab for 2019-2020 and correlate it with rainfall",
                &ctx()
            ),
            Some(QueryIntent::TrendCorrelation {
                category: "Wheat".into(),
                region: "Punjab".into(),
                years: Some(vec![2019, 2020]),
            })
        );
    }

    // ── function_call ────────────────────────────────────────────────

    #[test]
    fn test_function_call() {
        let call = function_call(&QueryIntent::RankCategories {
            region: "Punjab".into(),
            limit: 3,
            years: Some(vec![2020]),
        });
        assert_eq!(call, r#"rank_categories("Punjab", years=[2020], limit=3)"#);
    }
}
