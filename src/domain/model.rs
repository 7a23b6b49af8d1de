use crate::utils::error::{CollectorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Kind of grid data a parser produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Production,
    Exchange,
    ExchangeForecast,
    Price,
    Consumption,
    GenerationForecast,
    ConsumptionForecast,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Production,
        DataType::Exchange,
        DataType::ExchangeForecast,
        DataType::Price,
        DataType::Consumption,
        DataType::GenerationForecast,
        DataType::ConsumptionForecast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Production => "production",
            DataType::Exchange => "exchange",
            DataType::ExchangeForecast => "exchangeForecast",
            DataType::Price => "price",
            DataType::Consumption => "consumption",
            DataType::GenerationForecast => "generationForecast",
            DataType::ConsumptionForecast => "consumptionForecast",
        }
    }

    pub fn is_exchange(&self) -> bool {
        matches!(self, DataType::Exchange | DataType::ExchangeForecast)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == s)
            .ok_or_else(|| CollectorError::InvalidConfigValueError {
                field: "data_type".to_string(),
                value: s.to_string(),
                reason: format!(
                    "Unknown data type. Valid types: {}",
                    DataType::ALL.map(|d| d.as_str()).join(", ")
                ),
            })
    }
}

/// Grid zone, or an exchange pair such as `AT->CH`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneKey(String);

impl ZoneKey {
    pub const EXCHANGE_SEPARATOR: &'static str = "->";

    pub fn new(zone: impl Into<String>) -> Self {
        Self(zone.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Arguments handed to the parser: both sides of the pair for exchanges.
    pub fn parser_args(&self, data_type: DataType) -> Vec<String> {
        if data_type.is_exchange() {
            self.0
                .split(Self::EXCHANGE_SEPARATOR)
                .map(str::to_string)
                .collect()
        } else {
            vec![self.0.clone()]
        }
    }
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneKey {
    fn from(zone: &str) -> Self {
        Self::new(zone)
    }
}

/// One row of parser output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub const DATETIME_KEY: &'static str = "datetime";

    pub fn datetime_value(&self) -> Option<&serde_json::Value> {
        self.data.get(Self::DATETIME_KEY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Boolean(bool),
    String(String),
}

/// A single InfluxDB point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, FieldValue)>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub zone: ZoneKey,
    pub data_type: DataType,
    pub target_datetime: Option<DateTime<Utc>>,
}

impl FetchRequest {
    pub fn latest(zone: impl Into<ZoneKey>, data_type: DataType) -> Self {
        Self {
            zone: zone.into(),
            data_type,
            target_datetime: None,
        }
    }

    /// Series name: exchange data is split per pair.
    pub fn measurement(&self) -> String {
        if self.data_type.is_exchange() {
            format!("{}{}", self.data_type, self.zone)
        } else {
            self.data_type.to_string()
        }
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.data_type, self.zone)
    }
}

impl From<ZoneKey> for String {
    fn from(zone: ZoneKey) -> Self {
        zone.0
    }
}

impl<'a> From<&'a String> for ZoneKey {
    fn from(zone: &'a String) -> Self {
        Self::new(zone.clone())
    }
}

impl From<String> for ZoneKey {
    fn from(zone: String) -> Self {
        Self(zone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Latest point is within the allowed lag.
    Fresh,
    Stale,
    /// A past target datetime was requested, so lag is meaningless.
    Historical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectReport {
    pub request: FetchRequest,
    pub measurement: String,
    pub points_written: usize,
    pub elapsed: Duration,
    pub first_datetime: DateTime<Utc>,
    pub last_datetime: DateTime<Utc>,
    pub freshness: Freshness,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectOutcome {
    Written(CollectReport),
    /// Parser returned nothing; nothing was written.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub request: FetchRequest,
    pub every: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_round_trips_through_names() {
        for data_type in DataType::ALL {
            assert_eq!(data_type.as_str().parse::<DataType>().unwrap(), data_type);
        }
        assert!("forecast".parse::<DataType>().is_err());
    }

    #[test]
    fn test_data_type_serde_uses_camel_case() {
        let json = serde_json::to_string(&DataType::GenerationForecast).unwrap();
        assert_eq!(json, "\"generationForecast\"");
    }

    #[test]
    fn test_exchange_zone_split_into_parser_args() {
        let zone = ZoneKey::new("AT->IT-NO");
        assert_eq!(zone.parser_args(DataType::Exchange), vec!["AT", "IT-NO"]);
        assert_eq!(
            zone.parser_args(DataType::ExchangeForecast),
            vec!["AT", "IT-NO"]
        );

        let zone = ZoneKey::new("NO-NO3");
        assert_eq!(zone.parser_args(DataType::Production), vec!["NO-NO3"]);
    }

    #[test]
    fn test_measurement_naming() {
        assert_eq!(
            FetchRequest::latest("AT->CH", DataType::Exchange).measurement(),
            "exchangeAT->CH"
        );
        assert_eq!(
            FetchRequest::latest("AT->CZ", DataType::ExchangeForecast).measurement(),
            "exchangeForecastAT->CZ"
        );
        assert_eq!(
            FetchRequest::latest("AT", DataType::Price).measurement(),
            "price"
        );
    }
}
