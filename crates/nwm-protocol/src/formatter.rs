//! Serialization of canonical records into response bodies.

use serde_json::Value as JsonValue;

use crate::errors::{ApiError, ApiResult};
use crate::records::Record;
use crate::types::OutputFormat;

/// A formatted response body with its media type.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Serialize `records` as `format`.
///
/// JSON output is a compact array of objects in column order. CSV takes its
/// header from the first record, so an empty result cannot be rendered as CSV.
pub fn format(records: &[Record], format: OutputFormat) -> ApiResult<Payload> {
    let body = match format {
        OutputFormat::Json => serde_json::to_vec(records)?,
        OutputFormat::Csv => to_csv(records)?,
    };
    Ok(Payload {
        content_type: format.content_type(),
        body,
    })
}

fn to_csv(records: &[Record]) -> ApiResult<Vec<u8>> {
    let first = records
        .first()
        .ok_or_else(|| ApiError::EmptyResult(OutputFormat::Csv.name().to_string()))?;
    let header: Vec<&str> = first.field_names().collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;

    for record in records {
        let row = header
            .iter()
            .map(|name| record.get(name).map(csv_cell).unwrap_or_default());
        writer.write_record(row).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV flush failed: {}", e)))
}

fn csv_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_error(err: csv::Error) -> ApiError {
    ApiError::Internal(format!("CSV write failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Record> {
        vec![
            Record::new(vec![
                ("feature_id".into(), json!(12068774)),
                ("time".into(), json!("2023-11-25T12:00:00")),
                ("ensemble".into(), json!("average")),
                ("streamflow".into(), json!(1.25)),
                ("velocity".into(), JsonValue::Null),
            ]),
            Record::new(vec![
                ("feature_id".into(), json!(12068774)),
                ("time".into(), json!("2023-11-25T13:00:00")),
                ("ensemble".into(), json!("average")),
                ("streamflow".into(), json!(1.5)),
                ("velocity".into(), json!(0.3)),
            ]),
        ]
    }

    #[test]
    fn test_json_is_compact_and_ordered() {
        let payload = format(&records()[..1], OutputFormat::Json).unwrap();
        assert_eq!(payload.content_type, "application/json");
        assert_eq!(
            String::from_utf8(payload.body).unwrap(),
            r#"[{"feature_id":12068774,"time":"2023-11-25T12:00:00","ensemble":"average","streamflow":1.25,"velocity":null}]"#
        );
    }

    #[test]
    fn test_json_is_deterministic() {
        let a = format(&records(), OutputFormat::Json).unwrap();
        let b = format(&records(), OutputFormat::Json).unwrap();
        assert_eq!(a.body, b.body);
    }

    #[test]
    fn test_json_empty_is_empty_array() {
        let payload = format(&[], OutputFormat::Json).unwrap();
        assert_eq!(payload.body, b"[]");
    }

    #[test]
    fn test_csv_layout() {
        let payload = format(&records(), OutputFormat::Csv).unwrap();
        assert_eq!(payload.content_type, "text/csv");

        let text = String::from_utf8(payload.body).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "feature_id,time,ensemble,streamflow,velocity");
        assert_eq!(lines[1], "12068774,2023-11-25T12:00:00,average,1.25,");
        assert_eq!(lines[2], "12068774,2023-11-25T13:00:00,average,1.5,0.3");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_reads_back_same_values() {
        let payload = format(&records(), OutputFormat::Csv).unwrap();
        let mut reader = csv::Reader::from_reader(payload.body.as_slice());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "12068774");
        assert_eq!(&rows[1][3], "1.5");
    }

    #[test]
    fn test_csv_quotes_embedded_commas() {
        let records = vec![Record::new(vec![
            ("name".into(), json!("Provo River, lower")),
            ("geometry".into(), json!("LINESTRING(-111.6 40.2, -111.7 40.3)")),
        ])];
        let text = String::from_utf8(format(&records, OutputFormat::Csv).unwrap().body).unwrap();
        assert!(text.contains("\"Provo River, lower\""));
    }

    #[test]
    fn test_csv_empty_is_input_error() {
        let err = format(&[], OutputFormat::Csv).unwrap_err();
        assert_eq!(err, ApiError::EmptyResult("CSV".to_string()));
        assert_eq!(err.status_code(), 400);
    }
}
