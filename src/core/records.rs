//! Turning raw parser output into InfluxDB points.

use crate::domain::model::{FieldValue, Point, Record};
use crate::utils::error::{CollectorError, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

const SEPARATOR: &str = "_";

/// Flatten nested objects, joining keys with underscores.
///
/// `{"production": {"hydro": 1.0}}` becomes `{"production_hydro": 1.0}`.
/// Arrays are leaves and are kept as-is.
pub fn flatten(record: &Record) -> Map<String, Value> {
    let mut flat = Map::new();
    flatten_into(&mut flat, None, &record.data);
    flat
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let full_key = match prefix {
            Some(prefix) => format!("{prefix}{SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(out, Some(&full_key), nested),
            other => {
                out.insert(full_key, other.clone());
            }
        }
    }
}

/// Parser output may be a single object, a list of objects, or nothing at all.
pub fn records_from_value(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(data) => Ok(vec![Record { data }]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(data) => Ok(Record { data }),
                other => Err(CollectorError::ProcessingError {
                    message: format!("expected an object per record, got {}", other),
                }),
            })
            .collect(),
        other => Err(CollectorError::ProcessingError {
            message: format!("unexpected parser output: {}", other),
        }),
    }
}

pub fn parse_datetime(value: &Value) -> Result<DateTime<Utc>> {
    let text = value
        .as_str()
        .ok_or_else(|| CollectorError::InvalidDatetime {
            value: value.to_string(),
            reason: "datetimes must be RFC 3339 strings".to_string(),
        })?;

    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CollectorError::InvalidDatetime {
            value: text.to_string(),
            reason: e.to_string(),
        })
}

/// Every record must carry a timezone-aware `datetime`.
pub fn record_datetimes(records: &[Record]) -> Result<Vec<DateTime<Utc>>> {
    let raw: Option<Vec<&Value>> = records.iter().map(Record::datetime_value).collect();
    let raw = raw.ok_or_else(|| CollectorError::MissingDatetime {
        output: serde_json::to_string(records).unwrap_or_else(|_| format!("{:?}", records)),
    })?;

    raw.into_iter().map(parse_datetime).collect()
}

fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Boolean(*b)),
        // all numbers as floats so a column never flips type between writes
        Value::Number(n) => n.as_f64().map(FieldValue::Float),
        Value::String(s) => Some(FieldValue::String(s.clone())),
        Value::Array(_) => Some(FieldValue::String(value.to_string())),
        Value::Object(_) => None,
    }
}

/// Build a point from a flattened record. Returns `None` when nothing but the
/// timestamp is left.
pub fn to_point(measurement: &str, flat: &Map<String, Value>) -> Result<Option<Point>> {
    let timestamp_value =
        flat.get(Record::DATETIME_KEY)
            .ok_or_else(|| CollectorError::MissingDatetime {
                output: Value::Object(flat.clone()).to_string(),
            })?;
    let timestamp = parse_datetime(timestamp_value)?;

    let fields: Vec<(String, FieldValue)> = flat
        .iter()
        .filter(|(key, _)| key.as_str() != Record::DATETIME_KEY)
        .filter_map(|(key, value)| field_value(value).map(|field| (key.clone(), field)))
        .collect();

    if fields.is_empty() {
        tracing::debug!("Skipping row at {} with no fields", timestamp);
        return Ok(None);
    }

    Ok(Some(Point {
        measurement: measurement.to_string(),
        tags: Vec::new(),
        fields,
        timestamp,
    }))
}

pub fn to_points(measurement: &str, records: &[Record]) -> Result<Vec<Point>> {
    let mut points = Vec::with_capacity(records.len());
    for record in records {
        if let Some(point) = to_point(measurement, &flatten(record))? {
            points.push(point);
        }
    }
    Ok(points)
}
