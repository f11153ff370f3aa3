use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::IngestError;
use crate::models::{IngestStats, OpportunityRecord, RecordSet, Recurrence};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Row shape shared by the CSV export and the JSON endpoint. Every other
/// column is ignored. CSV rows are decoded by serde; JSON elements go
/// through `from_json` so one mistyped field cannot fail the payload.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    created_date: Option<String>,
    #[serde(default)]
    category_desc: Option<String>,
    #[serde(default, rename = "Borough")]
    borough: Option<String>,
    #[serde(default, rename = "borough")]
    borough_lower: Option<String>,
    #[serde(default)]
    vol_requests: Option<RawCount>,
    #[serde(default)]
    recurrence_type: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl RawRecord {
    /// Picks fields out of one JSON element. Numbers stand in for their
    /// text; any other non-string value is treated as absent, except for
    /// `created_date`, where it is kept so it is counted as unparseable.
    fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            debug!("Non-object element in JSON payload, treating as empty row");
            return Self::default();
        };
        let text = |key: &str| match object.get(key) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        };

        Self {
            created_date: match object.get("created_date") {
                None | Some(Value::Null) => None,
                Some(Value::String(value)) => Some(value.clone()),
                Some(other) => Some(other.to_string()),
            },
            category_desc: text("category_desc"),
            borough: text("Borough"),
            borough_lower: text("borough"),
            vol_requests: match object.get("vol_requests") {
                None | Some(Value::Null) => None,
                Some(Value::Number(number)) => Some(
                    number
                        .as_i64()
                        .map(RawCount::Int)
                        .or_else(|| number.as_f64().map(RawCount::Float))
                        .unwrap_or(RawCount::Other(IgnoredAny)),
                ),
                Some(Value::String(value)) => Some(RawCount::Text(value.clone())),
                Some(_) => Some(RawCount::Other(IgnoredAny)),
            },
            recurrence_type: text("recurrence_type"),
            title: text("title"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCount {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

pub fn load_csv(path: &Path) -> Result<RecordSet, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let set = read_csv(file)?;
    info!(
        path = %path.display(),
        rows = set.stats.rows,
        invalid_dates = set.stats.invalid_dates,
        invalid_vol_requests = set.stats.invalid_vol_requests,
        "Loaded CSV"
    );
    Ok(set)
}

/// Reads a CSV export. The first row names the columns; blank lines are
/// skipped and short rows leave the missing columns empty.
pub fn read_csv<R: Read>(reader: R) -> Result<RecordSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut set = RecordSet::default();
    for result in reader.deserialize::<RawRecord>() {
        let raw = result?;
        set.records.push(normalize(raw, &mut set.stats));
    }

    Ok(set)
}

/// Reads a JSON array of records. Only a payload that is not a JSON array
/// fails; a field of the wrong type is coerced like a bad CSV cell.
pub fn parse_json(bytes: &[u8]) -> Result<RecordSet, IngestError> {
    let rows: Vec<Value> = serde_json::from_slice(bytes)?;
    let mut set = RecordSet::default();
    for row in &rows {
        set.records
            .push(normalize(RawRecord::from_json(row), &mut set.stats));
    }
    Ok(set)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        })
}

fn normalize(raw: RawRecord, stats: &mut IngestStats) -> OpportunityRecord {
    stats.rows += 1;

    let created_date = match clean(raw.created_date) {
        Some(value) => {
            let parsed = parse_date(&value);
            if parsed.is_none() {
                stats.invalid_dates += 1;
                debug!(row = stats.rows, value = %value, "Unparseable created_date");
            }
            parsed
        }
        None => None,
    };

    let vol_requests = match raw.vol_requests.map(coerce_count) {
        Some(Ok(count)) => count,
        Some(Err(())) => {
            stats.invalid_vol_requests += 1;
            debug!(row = stats.rows, "Non-numeric vol_requests, using 0");
            0
        }
        None => 0,
    };

    OpportunityRecord {
        created_date,
        category: clean(raw.category_desc),
        borough: clean(raw.borough).or_else(|| clean(raw.borough_lower)),
        vol_requests,
        recurrence: Recurrence::parse(raw.recurrence_type.as_deref()),
        title: clean(raw.title),
    }
}

fn coerce_count(raw: RawCount) -> Result<u32, ()> {
    match raw {
        RawCount::Int(value) => u32::try_from(value).map_err(|_| ()),
        RawCount::Float(value) => float_count(value),
        RawCount::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0);
            }
            match text.parse::<u32>() {
                Ok(value) => Ok(value),
                Err(_) => text.parse::<f64>().map_err(|_| ()).and_then(float_count),
            }
        }
        RawCount::Other(_) => Err(()),
    }
}

fn float_count(value: f64) -> Result<u32, ()> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Ok(value as u32)
    } else {
        Err(())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
