mod citation;
mod config;
mod engine;
mod error;
#[cfg(test)]
mod fixtures;
mod grid;
mod loader;
mod logging;
mod parser;
mod query;
mod records;
mod region;
mod render;
mod scanner;
mod stats;
mod temporal;

use std::str::FromStr;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use samarth_types::{QueryIntent, QueryResponse};

use config::{DataConfig, OutputFormat};
use parser::DEFAULT_LIMIT;

#[derive(Parser)]
#[command(
    name = "samarth",
    about = "Questions over Indian rainfall grids and district crop production"
)]
struct Cli {
    #[command(flatten)]
    data: DataConfig,

    /// More log output on stderr (-v info, -vv debug); RUST_LOG wins
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a free-text question
    Ask {
        /// e.g. "What is the average annual rainfall in Karnataka?"
        question: Vec<String>,
    },
    /// Average rainfall over one state
    Rainfall {
        region: String,
        /// "2019-2021" or "2019,2021"
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// Average rainfall for several states
    CompareRainfall {
        #[arg(required = true)]
        regions: Vec<String>,
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// Crops of a state ranked by total production
    TopCrops {
        region: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// Districts ranked by production of one crop
    Districts {
        crop: String,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        limit: Option<usize>,
        /// Lowest first
        #[arg(long)]
        ascending: bool,
    },
    /// Linear trend of yearly production
    Trend {
        crop: String,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// Average rainfall next to yearly production
    Correlate {
        crop: String,
        region: String,
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// Arguments for one crop over another in a state
    CompareCrops {
        crop_a: String,
        crop_b: String,
        region: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        years: Option<YearSpec>,
    },
    /// List the known state bounding boxes
    Regions,
    /// Years covered by both datasets
    Years {
        #[arg(long)]
        from: Option<i32>,
        #[arg(long)]
        to: Option<i32>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let format = cli.data.format;
    let load = || -> anyhow::Result<engine::AnalyticsEngine> {
        let files = cli.data.resolve().context("locating data files")?;
        loader::load_engine(&files).with_context(|| {
            format!("loading {} and {}", files.grid.display(), files.records.display())
        })
    };

    let response = match cli.command {
        Command::Regions => return print_regions(format),
        Command::Years { from, to } => return print_years(&load()?, from, to, format),
        Command::Ask { question } => query::execute(&load()?, &question.join(" ")),
        direct => {
            let intent = direct_intent(direct).context("not a direct engine call")?;
            query::respond(&load()?, &invocation(), intent)
        }
    };
    emit(&response, format)
}

// ═══════════════════════════════════════════════════════════════════════
//  DIRECT SUBCOMMANDS → INTENTS
// ═══════════════════════════════════════════════════════════════════════

fn direct_intent(command: Command) -> Option<QueryIntent> {
    let years = |y: Option<YearSpec>| y.map(|y| y.0);
    Some(match command {
        Command::Rainfall { region, years: y } => QueryIntent::AverageMetric { region, years: years(y) },
        Command::CompareRainfall { regions, years: y } => QueryIntent::CompareMetric { regions, years: years(y) },
        Command::TopCrops { region, limit, years: y } => QueryIntent::RankCategories { region, limit, years: years(y) },
        Command::Districts { crop, region, year, limit, ascending } => QueryIntent::RankSubregions {
            category: crop,
            region,
            year,
            limit,
            ascending,
        },
        Command::Trend { crop, region, years: y } => QueryIntent::Trend { category: crop, region, years: years(y) },
        Command::Correlate { crop, region, years: y } => QueryIntent::Correlation { category: crop, region, years: years(y) },
        Command::CompareCrops { crop_a, crop_b, region, year, years: y } => QueryIntent::CompareCategories {
            category_a: crop_a,
            category_b: crop_b,
            region,
            year,
            years: years(y),
        },
        Command::Ask { .. } | Command::Regions | Command::Years { .. } => return None,
    })
}

/// The command line as typed, recorded as the "question" of a direct call.
fn invocation() -> String {
    std::env::args().skip(1).collect::<Vec<_>>().join(" ")
}

/// `--years` value: "2019-2021" (inclusive) or "2019,2021".
#[derive(Debug, Clone, PartialEq, Eq)]
struct YearSpec(Vec<i32>);

impl FromStr for YearSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bad = |e: std::num::ParseIntError| format!("invalid year in {raw:?}: {e}");
        let years: Vec<i32> = match raw.split_once('-') {
            Some((a, b)) => {
                let (a, b): (i32, i32) = (a.trim().parse().map_err(bad)?, b.trim().parse().map_err(bad)?);
                (a..=b).collect()
            }
            None => raw
                .split(',')
                .map(|y| y.trim().parse().map_err(bad))
                .collect::<Result<_, _>>()?,
        };
        if years.is_empty() {
            return Err(format!("empty year range {raw:?}"));
        }
        Ok(YearSpec(years))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  OUTPUT
// ═══════════════════════════════════════════════════════════════════════

fn emit(response: &QueryResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Markdown => println!("{}", render::markdown(response)),
    }
    Ok(())
}

fn print_regions(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = region::REGISTRY
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "name": r.name,
                        "lon": [r.bounds.lon_min, r.bounds.lon_max],
                        "lat": [r.bounds.lat_min, r.bounds.lat_max],
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Markdown => {
            println!("| State | Longitude | Latitude |\n|---|---|---|");
            for r in region::REGISTRY {
                println!(
                    "| {} | {:.1} to {:.1} | {:.1} to {:.1} |",
                    r.name, r.bounds.lon_min, r.bounds.lon_max, r.bounds.lat_min, r.bounds.lat_max
                );
            }
        }
    }
    Ok(())
}

fn print_years(
    engine: &engine::AnalyticsEngine,
    from: Option<i32>,
    to: Option<i32>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let common = engine.aligner().overlapping(from, to);
    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "record_years": engine.records().years(),
                "common_years": common,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Markdown => {
            let list = |ys: &[i32]| ys.iter().map(i32::to_string).collect::<Vec<_>>().join(", ");
            println!("Record years: {}", list(&engine.records().years()));
            println!("Common years: {}", list(&common));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_spec_range_and_list() {
        assert_eq!("2019-2021".parse(), Ok(YearSpec(vec![2019, 2020, 2021])));
        assert_eq!("2019, 2021".parse(), Ok(YearSpec(vec![2019, 2021])));
        assert!("2021-2019".parse::<YearSpec>().is_err());
        assert!("twenty".parse::<YearSpec>().is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_direct_intent_from_args() {
        let cli = Cli::try_parse_from(["samarth", "districts", "Rice", "--region", "Punjab", "--ascending"]).unwrap();
        assert_eq!(
            direct_intent(cli.command),
            Some(QueryIntent::RankSubregions {
                category: "Rice".into(),
                region: Some("Punjab".into()),
                year: None,
                limit: None,
                ascending: true,
            })
        );
    }

    #[test]
    fn test_years_flag_parses_range() {
        let cli = Cli::try_parse_from(["samarth", "rainfall", "Kerala", "--years", "2019-2020"]).unwrap();
        assert_eq!(
            direct_intent(cli.command),
            Some(QueryIntent::AverageMetric { region: "Kerala".into(), years: Some(vec![2019, 2020]) })
        );
    }
}
