use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::GatewayError;
use crate::models::common::Document;

/// Field every log collection is ordered by.
pub const TIMESTAMP_FIELD: &str = "timestamp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogCollection {
    #[serde(rename = "hourly_logs")]
    HourlyLogs,
    #[serde(rename = "error_logs")]
    ErrorLogs,
}

impl LogCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCollection::HourlyLogs => "hourly_logs",
            LogCollection::ErrorLogs => "error_logs",
        }
    }
}

impl std::fmt::Display for LogCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly_logs" => Ok(LogCollection::HourlyLogs),
            "error_logs" => Ok(LogCollection::ErrorLogs),
            other => Err(format!("unknown log collection: {}", other)),
        }
    }
}

/// A water-quality value: hourly logs carry every sample of the hour, error logs a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measurement {
    Series(Vec<f64>),
    Scalar(f64),
}

impl Measurement {
    /// Lowest and highest sample, `None` for an empty series.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            Measurement::Scalar(v) => Some((*v, *v)),
            Measurement::Series(values) => values.iter().fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }),
        }
    }
}

/// When a log was written. Anything that is not an RFC 3339 instant is kept as the store sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogTimestamp {
    At(DateTime<Utc>),
    Text(String),
    Number(f64),
}

impl LogTimestamp {
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            LogTimestamp::At(at) => Some(*at),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogTimestamp::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S UTC")),
            LogTimestamp::Text(text) => write!(f, "{}", text),
            LogTimestamp::Number(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub timestamp: LogTimestamp,
    pub ph: Measurement,
    pub tds: Measurement,
    pub temp: Measurement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_parameters: Option<Vec<String>>,
}

impl LogRecord {
    pub fn from_document(document: Document) -> Result<Self, GatewayError> {
        let Document { id, mut fields } = document;
        fields.insert("id".to_string(), serde_json::Value::String(id.clone()));

        serde_json::from_value(serde_json::Value::Object(fields))
            .map_err(|e| GatewayError::Decode(format!("log record {}: {}", id, e)))
    }

    pub fn out_of_range_label(&self) -> String {
        match &self.error_parameters {
            Some(params) => params.join(", "),
            None => "N/A".to_string(),
        }
    }
}
