//! Markdown rendering of a [`QueryResponse`] for terminal output.

use std::fmt::Write;

use samarth_types::{
    Answer, Citation, CrossRegionReport, ErrorDescriptor, Outcome, QueryResponse, SubregionRanking,
    YearlyTotal,
};

use crate::engine::format_count;

/// Integers print without decimals, everything else with two.
pub fn number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format_count(v)
    } else {
        format!("{v:.2}")
    }
}

fn cell(v: Option<f64>) -> String {
    v.map(number).unwrap_or_else(|| "N/A".to_string())
}

fn table(out: &mut String, header: &[&str], rows: impl IntoIterator<Item = Vec<String>>) {
    let _ = writeln!(out, "| {} |", header.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(header.len()));
    for row in rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
    out.push('\n');
}

pub fn citations(out: &mut String, cites: &[&Citation]) {
    if cites.is_empty() {
        return;
    }
    out.push_str("### Data Citations\n\n");
    for (i, c) in cites.iter().enumerate() {
        let mut parts = vec![format!("**{}**", c.dataset)];
        if !c.source.is_empty() {
            parts.push(format!("Source: {}", c.source));
        }
        if let Some(y) = &c.year {
            parts.push(format!("Year: {y}"));
        }
        if let Some(r) = &c.resolution {
            parts.push(format!("Resolution: {r}"));
        }
        let _ = writeln!(out, "{}. {}", i + 1, parts.join(" | "));
    }
    out.push('\n');
}

fn error(out: &mut String, err: &ErrorDescriptor) {
    let _ = writeln!(out, "**Error:** {}\n", err.error);
    if !err.suggestions.is_empty() {
        let _ = writeln!(out, "Did you mean: {}\n", err.suggestions.join(", "));
    }
}

fn yearly(out: &mut String, rows: &[YearlyTotal]) {
    table(
        out,
        &["Year", "Production"],
        rows.iter().map(|r| vec![r.year.to_string(), cell(r.total)]),
    );
}

fn subregions(out: &mut String, ranking: &SubregionRanking) {
    table(
        out,
        &["State", "District", "Production", "Year"],
        ranking.rows.iter().map(|r| {
            vec![
                r.region.clone(),
                r.subregion.clone(),
                format!("{} {}", cell(r.total), r.unit),
                r.year.map(|y| y.to_string()).unwrap_or_else(|| "N/A".to_string()),
            ]
        }),
    );
}

fn cross_region(out: &mut String, report: &CrossRegionReport) {
    let year = report.year.map(|y| format!(" ({y})")).unwrap_or_default();
    let _ = writeln!(out, "## {} by district{year}\n", report.category);
    for (label, region, side) in [
        ("Highest", &report.highest_region, &report.highest),
        ("Lowest", &report.lowest_region, &report.lowest),
    ] {
        let _ = writeln!(out, "### {label} in {region}\n");
        match side {
            Outcome::Success(c) => subregions(out, &c.payload),
            Outcome::Failure(e) => error(out, e),
        }
    }
}

fn answer(out: &mut String, ans: &Answer) {
    match ans {
        Answer::AverageMetric(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## Average rainfall in {}\n", p.resolved_region);
            let _ = writeln!(out, "**{} {}** ({})\n", number(p.value), p.unit, p.years);
        }
        Answer::MetricComparison(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## Rainfall comparison ({})\n", p.years);
            let value_header = format!("Average ({})", p.unit);
            table(
                out,
                &["State", value_header.as_str()],
                p.rows.iter().map(|r| vec![r.region.clone(), number(r.value)]),
            );
        }
        Answer::CategoryRanking(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## Top {} crops in {} ({})\n", p.limit, p.region, p.years);
            table(
                out,
                &["Rank", "Crop", "Production", "Unit"],
                p.rows.iter().map(|r| {
                    vec![r.rank.to_string(), r.category.clone(), cell(r.total), r.unit.clone()]
                }),
            );
        }
        Answer::SubregionRanking(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## {} by district in {} ({})\n", p.category, p.region, p.year);
            subregions(out, p);
        }
        Answer::CrossRegionSubregions(r) => cross_region(out, r),
        Answer::Trend(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## Production trend of {} in {}\n", p.category, p.region);
            let _ = writeln!(
                out,
                "Direction: **{:?}**, slope {}/year, R² {:.3}, p-value {:.4}\n",
                p.direction,
                number(p.slope),
                p.r_squared,
                p.p_value
            );
            yearly(out, &p.yearly);
        }
        Answer::Correlation(c) => {
            let p = &c.payload;
            let _ = writeln!(out, "## {} production and rainfall in {}\n", p.category, p.region);
            let _ = writeln!(out, "Average rainfall: **{} {}**\n", number(p.average_metric), p.unit);
            yearly(out, &p.yearly);
            let _ = writeln!(out, "_{}_\n", p.disclaimer);
        }
        Answer::CategoryComparison(c) => {
            let p = &c.payload;
            let _ = writeln!(
                out,
                "## {} vs {} in {} ({})\n",
                p.category_a, p.category_b, p.region, p.year
            );
            for (i, a) in p.arguments.iter().enumerate() {
                let _ = writeln!(out, "{}. **{}**: {} ({})", i + 1, a.argument, a.data, a.metric);
            }
            out.push('\n');
            table(
                out,
                &["Crop", "Production", "Area", "Yield", "Districts"],
                p.table.iter().map(|s| {
                    vec![
                        s.category.clone(),
                        number(s.total),
                        cell(s.area),
                        cell(s.yield_),
                        s.subregions.to_string(),
                    ]
                }),
            );
            if let Some(note) = &p.note {
                let _ = writeln!(out, "> {note}\n");
            }
        }
        Answer::Composite { parts } => {
            for part in parts.values() {
                answer(out, part);
            }
            return;
        }
    }
    citations(out, &ans.citations());
}

pub fn markdown(resp: &QueryResponse) -> String {
    let mut out = String::new();
    if let Some(ans) = &resp.result {
        answer(&mut out, ans);
    }
    if let Some(err) = &resp.error {
        error(&mut out, err);
    }
    for e in &resp.errors {
        let _ = writeln!(out, "- {e}");
    }
    if !resp.parsed_info.suggested_functions.is_empty() {
        out.push_str("Try one of:\n\n");
        for f in &resp.parsed_info.suggested_functions {
            let _ = writeln!(out, "- `{f}`");
        }
    }
    out.trim_end().to_string()
}
