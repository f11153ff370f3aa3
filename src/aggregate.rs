use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    AggregationResult, CategorySeries, CategoryTrend, DateRange, OpportunityRecord, Recurrence,
    RecurrenceSplit, SkipCounts, Totals, WordFrequency,
};

pub const TOP_WORDS: usize = 50;
pub const WORD_SCALE: usize = 10;

/// Runs every view over an already-filtered record set.
pub fn aggregate(records: &[&OpportunityRecord], today: NaiveDate) -> AggregationResult {
    let heatmap = date_histogram(records);
    let date_range = date_range(&heatmap, today);

    let result = AggregationResult {
        totals: totals(records),
        date_range,
        category_trend: category_trend(records),
        category_distribution: count_by(records, |record| record.category.as_deref()),
        borough_distribution: count_by(records, |record| record.borough.as_deref()),
        recurrence_split: recurrence_split(records),
        word_frequencies: word_frequencies(records),
        skipped: skip_counts(records),
        heatmap,
    };

    debug!(
        records = result.totals.records,
        days = result.heatmap.len(),
        categories = result.category_distribution.len(),
        boroughs = result.borough_distribution.len(),
        skipped = ?result.skipped,
        "Aggregated records"
    );

    result
}

pub fn totals(records: &[&OpportunityRecord]) -> Totals {
    Totals {
        records: records.len(),
        vol_requests: records
            .iter()
            .map(|record| u64::from(record.vol_requests))
            .sum(),
    }
}

pub fn date_histogram(records: &[&OpportunityRecord]) -> BTreeMap<NaiveDate, usize> {
    let mut heatmap = BTreeMap::new();
    for date in records.iter().filter_map(|record| record.created_date) {
        *heatmap.entry(date).or_insert(0) += 1;
    }
    heatmap
}

/// First and last day with activity, or `today` for both ends when nothing is dated.
pub fn date_range(heatmap: &BTreeMap<NaiveDate, usize>, today: NaiveDate) -> DateRange {
    match (heatmap.keys().next(), heatmap.keys().next_back()) {
        (Some(start), Some(end)) => DateRange {
            start: *start,
            end: *end,
        },
        _ => DateRange {
            start: today,
            end: today,
        },
    }
}

pub fn category_trend(records: &[&OpportunityRecord]) -> CategoryTrend {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, BTreeMap<String, usize>> = HashMap::new();
    let mut months: BTreeSet<String> = BTreeSet::new();

    for record in records {
        let (Some(category), Some(date)) = (record.category.as_deref(), record.created_date) else {
            continue;
        };
        let month = date.format("%Y-%m").to_string();
        months.insert(month.clone());

        let by_month = counts.entry(category).or_insert_with(|| {
            order.push(category);
            BTreeMap::new()
        });
        *by_month.entry(month).or_insert(0) += 1;
    }

    let months: Vec<String> = months.into_iter().collect();
    let total = order.len();
    let series = order
        .iter()
        .enumerate()
        .map(|(index, category)| {
            let by_month = &counts[category];
            let hue = (index * 360) as f64 / total as f64;
            CategorySeries {
                category: category.to_string(),
                hue,
                color: format!("hsl({hue}, 70%, 50%)"),
                counts: months
                    .iter()
                    .map(|month| by_month.get(month).copied().unwrap_or(0))
                    .collect(),
            }
        })
        .collect();

    CategoryTrend { months, series }
}

pub fn count_by<F>(records: &[&OpportunityRecord], field: F) -> BTreeMap<String, usize>
where
    F: Fn(&OpportunityRecord) -> Option<&str>,
{
    let mut counts = BTreeMap::new();
    for value in records.iter().filter_map(|record| field(record)) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn recurrence_split(records: &[&OpportunityRecord]) -> RecurrenceSplit {
    let mut split = RecurrenceSplit::default();
    for record in records {
        match record.recurrence {
            Recurrence::OneTime => split.onetime += 1,
            Recurrence::Ongoing => split.ongoing += 1,
            Recurrence::Other(_) | Recurrence::Unspecified => {}
        }
    }
    split
}

/// Top words across all titles, lowercased and split on whitespace. Ties
/// are ordered alphabetically so the cut at `TOP_WORDS` is stable.
pub fn word_frequencies(records: &[&OpportunityRecord]) -> Vec<WordFrequency> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for title in records.iter().filter_map(|record| record.title.as_deref()) {
        for word in title.to_lowercase().split_whitespace() {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words
        .into_iter()
        .take(TOP_WORDS)
        .map(|(text, count)| WordFrequency {
            text,
            value: count * WORD_SCALE,
        })
        .collect()
}

pub fn skip_counts(records: &[&OpportunityRecord]) -> SkipCounts {
    let mut skipped = SkipCounts::default();
    for record in records {
        if record.created_date.is_none() {
            skipped.missing_date += 1;
        }
        if record.category.is_none() {
            skipped.missing_category += 1;
        }
        if record.borough.is_none() {
            skipped.missing_borough += 1;
        }
        if record.title.is_none() {
            skipped.missing_title += 1;
        }
        match record.recurrence {
            Recurrence::Unspecified => skipped.missing_recurrence += 1,
            Recurrence::Other(_) => skipped.unrecognized_recurrence += 1,
            Recurrence::OneTime | Recurrence::Ongoing => {}
        }
    }
    skipped
}
