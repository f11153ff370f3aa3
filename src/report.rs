use std::fmt::Write;

use crate::filter::{Filter, FilterOptions};
use crate::models::{AggregationResult, IngestStats};

const TOP_LABELS: usize = 10;
const TOP_REPORT_WORDS: usize = 15;

fn ranked(map: &std::collections::BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = map
        .iter()
        .map(|(label, count)| (label.as_str(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

pub fn build_summary(filter: &Filter, stats: &IngestStats, result: &AggregationResult) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Loaded {} rows ({} unparseable dates, {} non-numeric vol_requests).",
        stats.rows, stats.invalid_dates, stats.invalid_vol_requests
    );
    let _ = writeln!(
        output,
        "Filter: category={}, borough={}",
        filter.category, filter.borough
    );
    let _ = writeln!(
        output,
        "{} opportunities requesting {} volunteers, {} to {}.",
        result.totals.records,
        result.totals.vol_requests,
        result.date_range.start,
        result.date_range.end
    );
    let _ = writeln!(
        output,
        "Recurrence: {} one-time, {} ongoing.",
        result.recurrence_split.onetime, result.recurrence_split.ongoing
    );

    if let Some((category, count)) = ranked(&result.category_distribution).first() {
        let _ = writeln!(output, "Top category: {category} ({count})");
    }
    if let Some((borough, count)) = ranked(&result.borough_distribution).first() {
        let _ = writeln!(output, "Top borough: {borough} ({count})");
    }

    output
}

pub fn build_report(filter: &Filter, result: &AggregationResult) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Volunteer Opportunity Report");
    let _ = writeln!(
        output,
        "Generated for category {} in borough {} ({} to {})",
        filter.category, filter.borough, result.date_range.start, result.date_range.end
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(output, "- Opportunities: {}", result.totals.records);
    let _ = writeln!(output, "- Volunteers requested: {}", result.totals.vol_requests);
    let _ = writeln!(output, "- Active days: {}", result.heatmap.len());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");
    write_ranked(&mut output, &result.category_distribution, "No categorized opportunities.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Borough Mix");
    write_ranked(&mut output, &result.borough_distribution, "No opportunities with a borough.");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recurrence");
    let _ = writeln!(output, "- One-time: {}", result.recurrence_split.onetime);
    let _ = writeln!(output, "- Ongoing: {}", result.recurrence_split.ongoing);

    let trend = &result.category_trend;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");

    if trend.months.is_empty() {
        let _ = writeln!(output, "No dated, categorized opportunities.");
    } else {
        let _ = writeln!(output, "| Month | {} |", trend_header(result));
        let _ = writeln!(output, "|---{}|", "|---".repeat(trend.series.len()));
        for (index, month) in trend.months.iter().enumerate() {
            let cells: Vec<String> = trend
                .series
                .iter()
                .map(|series| series.counts[index].to_string())
                .collect();
            let _ = writeln!(output, "| {} | {} |", month, cells.join(" | "));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Common Title Words");

    if result.word_frequencies.is_empty() {
        let _ = writeln!(output, "No titles recorded.");
    } else {
        for word in result.word_frequencies.iter().take(TOP_REPORT_WORDS) {
            let _ = writeln!(output, "- {} (weight {})", word.text, word.value);
        }
    }

    let skipped = &result.skipped;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Excluded From Views");
    let _ = writeln!(output, "- Without a date: {}", skipped.missing_date);
    let _ = writeln!(output, "- Without a category: {}", skipped.missing_category);
    let _ = writeln!(output, "- Without a borough: {}", skipped.missing_borough);
    let _ = writeln!(
        output,
        "- Other recurrence types: {} (missing: {})",
        skipped.unrecognized_recurrence, skipped.missing_recurrence
    );

    output
}

pub fn build_options(options: &FilterOptions) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Categories:");
    for category in &options.categories {
        let _ = writeln!(output, "- {category}");
    }
    let _ = writeln!(output, "Boroughs:");
    for borough in &options.boroughs {
        let _ = writeln!(output, "- {borough}");
    }

    output
}

fn trend_header(result: &AggregationResult) -> String {
    result
        .category_trend
        .series
        .iter()
        .map(|series| series.category.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn write_ranked(
    output: &mut String,
    map: &std::collections::BTreeMap<String, usize>,
    empty: &str,
) {
    if map.is_empty() {
        let _ = writeln!(output, "{empty}");
        return;
    }

    for (label, count) in ranked(map).into_iter().take(TOP_LABELS) {
        let _ = writeln!(output, "- {label}: {count}");
    }
}
