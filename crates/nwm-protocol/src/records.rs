//! Warehouse rows and the canonical records projected from them.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;

use crate::time::format_timestamp;

/// A typed warehouse cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Nested or repeated cell, kept as JSON.
    Json(JsonValue),
}

impl Value {
    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    /// JSON form of the cell. Timestamps become `%Y-%m-%dT%H:%M:%S` strings;
    /// non-finite floats become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Timestamp(t) => JsonValue::String(format_timestamp(t)),
            Value::Json(v) => v.clone(),
        }
    }
}

/// One warehouse result row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WarehouseRow {
    pub columns: Vec<(String, Value)>,
}

impl WarehouseRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// First cell named `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Canonical output record; serializes as a JSON object in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, JsonValue)>,
}

impl Record {
    pub fn new(fields: Vec<(String, JsonValue)>) -> Self {
        Self { fields }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Map warehouse rows to canonical records, preserving order.
pub fn project(rows: Vec<WarehouseRow>) -> Vec<Record> {
    rows.into_iter()
        .map(|row| {
            Record::new(
                row.columns
                    .into_iter()
                    .map(|(name, value)| (name, value.to_json()))
                    .collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn forecast_row(ensemble: Value, streamflow: f64) -> WarehouseRow {
        WarehouseRow::new(vec![
            ("feature_id".into(), Value::Int(12068774)),
            (
                "reference_time".into(),
                Value::Timestamp(Utc.with_ymd_and_hms(2023, 11, 25, 6, 0, 0).unwrap()),
            ),
            (
                "time".into(),
                Value::Timestamp(Utc.with_ymd_and_hms(2023, 11, 25, 12, 0, 0).unwrap()),
            ),
            ("ensemble".into(), ensemble),
            ("streamflow".into(), Value::Float(streamflow)),
            ("velocity".into(), Value::Null),
        ])
    }

    #[test]
    fn test_project_formats_timestamps() {
        let records = project(vec![forecast_row(Value::Int(0), 1.5)]);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.get("reference_time"), Some(&json!("2023-11-25T06:00:00")));
        assert_eq!(record.get("time"), Some(&json!("2023-11-25T12:00:00")));
        assert_eq!(record.get("ensemble"), Some(&json!(0)));
        assert_eq!(record.get("velocity"), Some(&JsonValue::Null));
    }

    #[test]
    fn test_project_preserves_column_and_row_order() {
        let rows = vec![
            forecast_row(Value::String("average".into()), 1.0),
            forecast_row(Value::String("average".into()), 2.0),
        ];
        let records = project(rows);

        let names: Vec<&str> = records[0].field_names().collect();
        assert_eq!(
            names,
            vec!["feature_id", "reference_time", "time", "ensemble", "streamflow", "velocity"]
        );
        assert_eq!(records[1].get("streamflow"), Some(&json!(2.0)));
    }

    #[test]
    fn test_project_empty() {
        assert!(project(Vec::new()).is_empty());
    }

    #[test]
    fn test_record_serializes_in_column_order() {
        let record = Record::new(vec![
            ("zeta".into(), json!(1)),
            ("alpha".into(), json!("x")),
        ]);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"x"}"#);
    }

    #[test]
    fn test_nan_becomes_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), JsonValue::Null);
    }
}
