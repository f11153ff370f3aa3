use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    OneTime,
    Ongoing,
    Other(String),
    Unspecified,
}

impl Recurrence {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Recurrence::Unspecified,
            Some("onetime") => Recurrence::OneTime,
            Some("ongoing") => Recurrence::Ongoing,
            Some(other) => Recurrence::Other(other.to_string()),
        }
    }
}

/// One volunteer opportunity, already normalized at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityRecord {
    pub created_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub borough: Option<String>,
    pub vol_requests: u32,
    pub recurrence: Recurrence,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub invalid_dates: usize,
    pub invalid_vol_requests: usize,
}

impl IngestStats {
    pub fn merge(&mut self, other: IngestStats) {
        self.rows += other.rows;
        self.invalid_dates += other.invalid_dates;
        self.invalid_vol_requests += other.invalid_vol_requests;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub records: Vec<OpportunityRecord>,
    pub stats: IngestStats,
}

impl RecordSet {
    /// Appends another batch in order. Duplicates are kept.
    pub fn append(&mut self, other: RecordSet) {
        self.records.extend(other.records);
        self.stats.merge(other.stats);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub category: String,
    pub hue: f64,
    pub color: String,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTrend {
    pub months: Vec<String>,
    pub series: Vec<CategorySeries>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecurrenceSplit {
    pub onetime: usize,
    pub ongoing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFrequency {
    pub text: String,
    pub value: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub records: usize,
    pub vol_requests: u64,
}

/// Records left out of a view, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub missing_date: usize,
    pub missing_category: usize,
    pub missing_borough: usize,
    pub missing_recurrence: usize,
    pub unrecognized_recurrence: usize,
    pub missing_title: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub totals: Totals,
    pub heatmap: BTreeMap<NaiveDate, usize>,
    pub date_range: DateRange,
    pub category_trend: CategoryTrend,
    pub category_distribution: BTreeMap<String, usize>,
    pub borough_distribution: BTreeMap<String, usize>,
    pub recurrence_split: RecurrenceSplit,
    pub word_frequencies: Vec<WordFrequency>,
    pub skipped: SkipCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> OpportunityRecord {
        OpportunityRecord {
            created_date: None,
            category: None,
            borough: None,
            vol_requests: 0,
            recurrence: Recurrence::Unspecified,
            title: Some(title.to_string()),
        }
    }

    #[test]
    fn recurrence_only_recognizes_two_literals() {
        assert_eq!(Recurrence::parse(Some("onetime")), Recurrence::OneTime);
        assert_eq!(Recurrence::parse(Some(" ongoing ")), Recurrence::Ongoing);
        assert_eq!(
            Recurrence::parse(Some("Ongoing")),
            Recurrence::Other("Ongoing".to_string())
        );
        assert_eq!(Recurrence::parse(Some("")), Recurrence::Unspecified);
        assert_eq!(Recurrence::parse(None), Recurrence::Unspecified);
    }

    #[test]
    fn append_keeps_duplicates_and_order() {
        let mut first = RecordSet {
            records: vec![record("a")],
            stats: IngestStats {
                rows: 1,
                invalid_dates: 1,
                invalid_vol_requests: 0,
            },
        };
        let second = RecordSet {
            records: vec![record("a"), record("b")],
            stats: IngestStats {
                rows: 2,
                invalid_dates: 0,
                invalid_vol_requests: 2,
            },
        };

        first.append(second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.records[2].title.as_deref(), Some("b"));
        assert_eq!(first.stats.rows, 3);
        assert_eq!(first.stats.invalid_dates, 1);
        assert_eq!(first.stats.invalid_vol_requests, 2);
    }

    #[test]
    fn heatmap_keys_serialize_as_iso_dates() {
        let mut heatmap = BTreeMap::new();
        heatmap.insert(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(), 4usize);
        let json = serde_json::to_string(&heatmap).unwrap();
        assert_eq!(json, r#"{"2024-03-07":4}"#);
    }
}
