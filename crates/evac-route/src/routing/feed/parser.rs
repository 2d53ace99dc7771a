use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ByteRecord, StringRecord};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::normalizer::normalize_headers;

/// Header-keyed hazard row; column order in the source file is irrelevant.
#[derive(Debug, Deserialize)]
pub(crate) struct HazardRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) id: Option<String>,
    #[serde(
        default,
        alias = "lat",
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) latitude: Option<String>,
    #[serde(
        default,
        alias = "lng",
        alias = "lon",
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) longitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) severity: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) detected_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShelterRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) name: Option<String>,
    #[serde(
        default,
        alias = "lat",
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) latitude: Option<String>,
    #[serde(
        default,
        alias = "lng",
        alias = "lon",
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) longitude: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) capacity: Option<String>,
    #[serde(
        default,
        alias = "current_occupancy",
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) occupancy: Option<String>,
}

/// Reads every row with normalized headers; row numbers are 1-based data rows.
pub(crate) fn parse_rows<R, T>(reader: R) -> Result<Vec<(usize, T)>, csv::Error>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = normalize_headers(csv_reader.headers()?);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row: T = record.deserialize(Some(&headers))?;
        rows.push((index + 1, row));
    }

    Ok(rows)
}

/// Per-row variant for feeds that must survive bad rows: cells are decoded
/// lossily and a row that fails to read or deserialize is returned as its own
/// error. Header and I/O failures still reject the file.
pub(crate) fn parse_rows_lossy<R, T>(
    reader: R,
) -> Result<Vec<(usize, Result<T, csv::Error>)>, csv::Error>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = normalize_headers(&decode_lossy(csv_reader.byte_headers()?));

    let mut rows = Vec::new();
    for (index, record) in csv_reader.byte_records().enumerate() {
        let parsed = match record {
            Ok(record) => decode_lossy(&record).deserialize::<T>(Some(&headers)),
            Err(err) if err.is_io_error() => return Err(err),
            Err(err) => Err(err),
        };
        rows.push((index + 1, parsed));
    }

    Ok(rows)
}

fn decode_lossy(record: &ByteRecord) -> StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

pub(crate) fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|parsed| parsed.is_finite())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
