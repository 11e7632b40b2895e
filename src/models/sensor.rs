//! Live sensor values pushed by the realtime store under `sensors`.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Key path the dashboard listens on.
pub const SENSORS_PATH: &str = "sensors";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub sensor_id: String,
    /// NaN when the pushed value could not be read as a number. Travels as `null` in JSON.
    #[serde(deserialize_with = "nan_from_null")]
    pub value: f64,
}

fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Decoded contents of the `sensors` key path, in the order the store reported the children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    entries: Vec<(String, f64)>,
}

impl SensorSnapshot {
    pub fn decode(raw: Option<&Value>) -> Self {
        let entries = match raw {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(children)) => children
                .iter()
                .map(|(key, value)| (key.clone(), coerce_number(value)))
                .collect(),
            // The realtime store renders objects with integer keys as arrays, with null holes.
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter(|(_, value)| !value.is_null())
                .map(|(index, value)| (index.to_string(), coerce_number(value)))
                .collect(),
            Some(other) => {
                log::warn!("Ignoring scalar snapshot at {}: {}", SENSORS_PATH, other);
                Vec::new()
            }
        };

        for (sensor_id, value) in &entries {
            if value.is_nan() {
                log::warn!("Sensor {} pushed a non-numeric value", sensor_id);
            }
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn readings(&self) -> Vec<SensorReading> {
        self.entries
            .iter()
            .map(|(sensor_id, value)| SensorReading {
                sensor_id: sensor_id.clone(),
                value: *value,
            })
            .collect()
    }
}

/// Converts a raw realtime snapshot into display readings.
pub fn reduce_snapshot(raw: Option<&Value>) -> Vec<SensorReading> {
    SensorSnapshot::decode(raw).readings()
}

/// Number coercion with the same results as a JavaScript `Number(...)` cast.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Human label and unit for a known sensor id.
pub fn sensor_label(sensor_id: &str) -> (&str, &'static str) {
    match sensor_id {
        "ph" => ("pH", "pH"),
        "tds" => ("TDS", "ppm"),
        "temp" => ("Temperature", "°C"),
        other => (other, ""),
    }
}

impl SensorReading {
    pub fn display_value(&self) -> String {
        if self.value.is_nan() {
            "--".to_string()
        } else {
            format!("{}", self.value)
        }
    }
}
