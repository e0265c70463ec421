//! BigQuery REST warehouse client.
//!
//! Queries go through `jobs.query`; jobs that outlive the synchronous wait
//! are polled with `jobs.getQueryResults`, which also serves later pages.
//! Rows arrive as `{"f": [{"v": ...}]}` cells and are decoded against the
//! returned schema into typed [`Value`]s.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

use nwm_protocol::{Value, WarehouseRow};

use crate::error::{Result, WarehouseError};
use crate::Warehouse;

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Connection settings for [`BigQueryWarehouse`].
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// REST base URL, without a trailing slash.
    pub endpoint: String,
    /// Project billed for the queries.
    pub project: String,
    /// Pre-issued OAuth bearer token; requests are unauthenticated without one.
    pub access_token: Option<String>,
    /// Job location, e.g. `US`.
    pub location: Option<String>,
    /// Budget for a whole query, polling and paging included.
    pub timeout: Duration,
}

/// [`Warehouse`] backed by the BigQuery REST API.
pub struct BigQueryWarehouse {
    client: Client,
    config: BigQueryConfig,
}

impl BigQueryWarehouse {
    pub fn new(config: BigQueryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10).min(config.timeout))
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| WarehouseError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn timeout_error(&self) -> WarehouseError {
        WarehouseError::Timeout(self.config.timeout.as_secs())
    }

    fn transport_error(&self, err: reqwest::Error) -> WarehouseError {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            err.into()
        }
    }

    async fn start_query(&self, sql: &str, deadline: Instant) -> Result<QueryResponse> {
        let body = QueryRequest {
            query: sql,
            use_legacy_sql: false,
            use_query_cache: true,
            timeout_ms: remaining_ms(deadline),
            location: self.config.location.as_deref(),
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };
        let request = self.authorize(self.client.post(self.queries_url()).json(&body));
        self.send(request).await
    }

    async fn fetch_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        deadline: Instant,
    ) -> Result<QueryResponse> {
        let url = format!("{}/{}", self.queries_url(), job.job_id);

        let mut params: Vec<(&str, String)> = vec![
            ("timeoutMs", remaining_ms(deadline).to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(location) = job.location.as_deref().or(self.config.location.as_deref()) {
            params.push(("location", location.to_string()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let request = self.authorize(self.client.get(url).query(&params));
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<QueryResponse> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        parse_response(&body)
    }

    async fn run(&self, sql: &str) -> Result<Vec<WarehouseRow>> {
        let deadline = Instant::now() + self.config.timeout;

        let mut response = self.start_query(sql, deadline).await?;
        let job = response.job_reference.clone();
        let mut schema: Option<TableSchema> = None;
        let mut rows = Vec::new();

        loop {
            if !response.job_complete {
                let job = job.as_ref().ok_or_else(|| {
                    WarehouseError::Incomplete("response carries no job reference".to_string())
                })?;
                if Instant::now() >= deadline {
                    return Err(self.timeout_error());
                }
                debug!(job_id = %job.job_id, "Query job still running, polling");
                response = self.fetch_results(job, None, deadline).await?;
                continue;
            }

            if schema.is_none() {
                schema = response.schema.take();
            }
            let page = std::mem::take(&mut response.rows);
            match &schema {
                Some(schema) => rows.extend(decode_rows(&schema.fields, page)?),
                None if page.is_empty() => {}
                None => {
                    return Err(WarehouseError::Decode(
                        "rows returned without a schema".to_string(),
                    ))
                }
            }

            let Some(token) = response.page_token.take() else {
                break;
            };
            let job = job.as_ref().ok_or_else(|| {
                WarehouseError::Incomplete("page token without job reference".to_string())
            })?;
            debug!(job_id = %job.job_id, rows = rows.len(), "Fetching next result page");
            response = self.fetch_results(job, Some(&token), deadline).await?;
        }

        Ok(rows)
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    #[instrument(skip(self, sql), fields(project = %self.config.project))]
    async fn query(&self, sql: &str) -> Result<Vec<WarehouseRow>> {
        debug!(sql = %sql, "Submitting query");
        let started = Instant::now();

        let result = match tokio::time::timeout(self.config.timeout, self.run(sql)).await {
            Ok(result) => result,
            Err(_) => Err(self.timeout_error()),
        };

        match &result {
            Ok(rows) => debug!(
                rows = rows.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query complete"
            ),
            Err(e) => warn!(error = %e, "Query failed"),
        }
        result
    }

    fn name(&self) -> &'static str {
        "bigquery"
    }
}

fn remaining_ms(deadline: Instant) -> u64 {
    deadline.saturating_duration_since(Instant::now()).as_millis() as u64
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    use_query_cache: bool,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    format_options: FormatOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FormatOptions {
    use_int64_timestamp: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

impl FieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: JsonValue,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

fn parse_response(body: &[u8]) -> Result<QueryResponse> {
    Ok(serde_json::from_slice(body)?)
}

fn rejected(status: StatusCode, body: &[u8]) -> WarehouseError {
    let message = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => String::from_utf8_lossy(body).chars().take(200).collect(),
    };
    WarehouseError::Rejected {
        status: status.as_u16(),
        message,
    }
}

// =============================================================================
// CELL DECODING
// =============================================================================

fn decode_rows(fields: &[FieldSchema], rows: Vec<TableRow>) -> Result<Vec<WarehouseRow>> {
    rows.into_iter().map(|row| decode_row(fields, row)).collect()
}

fn decode_row(fields: &[FieldSchema], row: TableRow) -> Result<WarehouseRow> {
    if row.f.len() != fields.len() {
        return Err(WarehouseError::Decode(format!(
            "row has {} cells but the schema has {} fields",
            row.f.len(),
            fields.len()
        )));
    }

    let columns = fields
        .iter()
        .zip(row.f)
        .map(|(field, cell)| Ok((field.name.clone(), decode_cell(field, cell.v)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(WarehouseRow::new(columns))
}

fn decode_cell(field: &FieldSchema, raw: JsonValue) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if !field.is_repeated() {
        return decode_single(field, raw);
    }

    let JsonValue::Array(items) = raw else {
        return Err(unexpected(field, &raw));
    };
    let values = items
        .into_iter()
        .map(|item| {
            let inner = match item {
                JsonValue::Object(mut cell) => cell.remove("v").unwrap_or(JsonValue::Null),
                other => other,
            };
            decode_single(field, inner).map(|value| value.to_json())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Value::Json(JsonValue::Array(values)))
}

fn decode_single(field: &FieldSchema, raw: JsonValue) -> Result<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match field.type_.to_ascii_uppercase().as_str() {
        "RECORD" | "STRUCT" => {
            let cells = raw
                .get("f")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| unexpected(field, &raw))?;
            let mut object = serde_json::Map::new();
            for (sub, cell) in field.fields.iter().zip(cells) {
                let inner = cell.get("v").cloned().unwrap_or(JsonValue::Null);
                object.insert(sub.name.clone(), decode_cell(sub, inner)?.to_json());
            }
            Ok(Value::Json(JsonValue::Object(object)))
        }
        "TIMESTAMP" => parse_timestamp(text(field, &raw)?)
            .map(Value::Timestamp)
            .ok_or_else(|| unexpected(field, &raw)),
        "DATETIME" => NaiveDateTime::parse_from_str(text(field, &raw)?, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|ndt| Value::Timestamp(ndt.and_utc()))
            .map_err(|_| unexpected(field, &raw)),
        "INTEGER" | "INT64" => text(field, &raw)?
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| unexpected(field, &raw)),
        // Decimal text is kept verbatim; f64 cannot hold NUMERIC precision.
        "NUMERIC" | "BIGNUMERIC" => Ok(Value::String(text(field, &raw)?.to_string())),
        "FLOAT" | "FLOAT64" => text(field, &raw)?
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| unexpected(field, &raw)),
        "BOOLEAN" | "BOOL" => match text(field, &raw)? {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(unexpected(field, &raw)),
        },
        "JSON" => {
            let text = text(field, &raw)?;
            Ok(Value::Json(
                serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string())),
            ))
        }
        _ => Ok(Value::String(text(field, &raw)?.to_string())),
    }
}

/// Integer microseconds (`useInt64Timestamp`), or legacy float seconds.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(micros) = raw.parse::<i64>() {
        return DateTime::from_timestamp_micros(micros);
    }
    let seconds = raw.parse::<f64>().ok().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

fn text<'a>(field: &FieldSchema, raw: &'a JsonValue) -> Result<&'a str> {
    raw.as_str().ok_or_else(|| unexpected(field, raw))
}

fn unexpected(field: &FieldSchema, raw: &JsonValue) -> WarehouseError {
    WarehouseError::Decode(format!(
        "column '{}' ({}) has unexpected value {}",
        field.name, field.type_, raw
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FORECAST_RESPONSE: &str = r#"{
        "kind": "bigquery#queryResponse",
        "schema": {
            "fields": [
                {"name": "feature_id", "type": "INTEGER", "mode": "NULLABLE"},
                {"name": "reference_time", "type": "TIMESTAMP", "mode": "NULLABLE"},
                {"name": "time", "type": "TIMESTAMP", "mode": "NULLABLE"},
                {"name": "ensemble", "type": "STRING", "mode": "NULLABLE"},
                {"name": "streamflow", "type": "FLOAT", "mode": "NULLABLE"},
                {"name": "velocity", "type": "FLOAT", "mode": "NULLABLE"}
            ]
        },
        "jobReference": {"projectId": "my-project", "jobId": "job_abc", "location": "US"},
        "totalRows": "2",
        "rows": [
            {"f": [{"v": "12068774"}, {"v": "1700892000000000"}, {"v": "1700913600000000"}, {"v": "average"}, {"v": "1.25"}, {"v": null}]},
            {"f": [{"v": "12068774"}, {"v": "1700892000000000"}, {"v": "1700917200000000"}, {"v": "average"}, {"v": "1.5"}, {"v": "0.3"}]}
        ],
        "totalBytesProcessed": "0",
        "jobComplete": true,
        "cacheHit": true
    }"#;

    fn decode(body: &str) -> Vec<WarehouseRow> {
        let mut response = parse_response(body.as_bytes()).unwrap();
        let schema = response.schema.take().unwrap();
        decode_rows(&schema.fields, response.rows).unwrap()
    }

    #[test]
    fn test_decode_forecast_rows() {
        let rows = decode(FORECAST_RESPONSE);
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.get("feature_id"), Some(&Value::Int(12068774)));
        assert_eq!(
            first.get("reference_time"),
            Some(&Value::Timestamp(Utc.with_ymd_and_hms(2023, 11, 25, 6, 0, 0).unwrap()))
        );
        assert_eq!(
            first.get("time"),
            Some(&Value::Timestamp(Utc.with_ymd_and_hms(2023, 11, 25, 12, 0, 0).unwrap()))
        );
        assert_eq!(first.get("ensemble"), Some(&Value::String("average".into())));
        assert_eq!(first.get("velocity"), Some(&Value::Null));
        assert_eq!(rows[1].get("velocity"), Some(&Value::Float(0.3)));

        let names: Vec<&str> = first.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["feature_id", "reference_time", "time", "ensemble", "streamflow", "velocity"]
        );
    }

    #[test]
    fn test_decode_latest_reference_time_null() {
        let body = r#"{
            "schema": {"fields": [{"name": "latest_reference_time", "type": "TIMESTAMP", "mode": "NULLABLE"}]},
            "rows": [{"f": [{"v": null}]}],
            "jobComplete": true
        }"#;
        let rows = decode(body);
        assert_eq!(rows[0].get("latest_reference_time"), Some(&Value::Null));
    }

    #[test]
    fn test_decode_geometry_and_nested_cells() {
        let body = r#"{
            "schema": {"fields": [
                {"name": "station_id", "type": "INT64"},
                {"name": "geometry", "type": "GEOGRAPHY"},
                {"name": "in_network", "type": "BOOL"},
                {"name": "updated", "type": "DATETIME"},
                {"name": "gages", "type": "STRING", "mode": "REPEATED"},
                {"name": "attrs", "type": "RECORD", "fields": [
                    {"name": "order", "type": "INTEGER"},
                    {"name": "slope", "type": "FLOAT"}
                ]}
            ]},
            "rows": [{"f": [
                {"v": "15039097"},
                {"v": "LINESTRING(-111.6 40.2, -111.7 40.3)"},
                {"v": "true"},
                {"v": "2023-11-25T06:00:00.500000"},
                {"v": [{"v": "10163000"}, {"v": "10164500"}]},
                {"v": {"f": [{"v": "3"}, {"v": "0.0021"}]}}
            ]}],
            "jobComplete": true
        }"#;
        let rows = decode(body);
        let row = &rows[0];

        assert_eq!(row.get("station_id"), Some(&Value::Int(15039097)));
        assert_eq!(
            row.get("geometry"),
            Some(&Value::String("LINESTRING(-111.6 40.2, -111.7 40.3)".into()))
        );
        assert_eq!(row.get("in_network"), Some(&Value::Bool(true)));
        assert!(matches!(row.get("updated"), Some(Value::Timestamp(_))));
        assert_eq!(
            row.get("gages"),
            Some(&Value::Json(serde_json::json!(["10163000", "10164500"])))
        );
        assert_eq!(
            row.get("attrs"),
            Some(&Value::Json(serde_json::json!({"order": 3, "slope": 0.0021})))
        );
    }

    #[test]
    fn test_decode_numeric_keeps_exact_text() {
        let body = r#"{
            "schema": {"fields": [
                {"name": "q", "type": "NUMERIC", "mode": "NULLABLE"},
                {"name": "big", "type": "BIGNUMERIC", "mode": "NULLABLE"},
                {"name": "approx", "type": "FLOAT64", "mode": "NULLABLE"}
            ]},
            "rows": [{"f": [{"v": "12345678901234567.123456789"}, {"v": "-0.00000000000000000000000000000000000001"}, {"v": "2.5"}]}],
            "jobComplete": true
        }"#;
        let rows = decode(body);

        assert_eq!(rows[0].get("q"), Some(&Value::String("12345678901234567.123456789".into())));
        assert_eq!(
            rows[0].get("big"),
            Some(&Value::String("-0.00000000000000000000000000000000000001".into()))
        );
        assert_eq!(rows[0].get("approx"), Some(&Value::Float(2.5)));
    }

    #[test]
    fn test_decode_empty_result() {
        let body = r#"{
            "schema": {"fields": [{"name": "feature_id", "type": "INTEGER"}]},
            "totalRows": "0",
            "jobComplete": true
        }"#;
        assert!(decode(body).is_empty());
    }

    #[test]
    fn test_decode_rejects_mismatched_row() {
        let body = r#"{
            "schema": {"fields": [{"name": "feature_id", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "1"}, {"v": "2"}]}],
            "jobComplete": true
        }"#;
        let mut response = parse_response(body.as_bytes()).unwrap();
        let schema = response.schema.take().unwrap();
        let err = decode_rows(&schema.fields, response.rows).unwrap_err();
        assert!(matches!(err, WarehouseError::Decode(_)));
    }

    #[test]
    fn test_decode_bad_integer() {
        let body = r#"{
            "schema": {"fields": [{"name": "feature_id", "type": "INTEGER"}]},
            "rows": [{"f": [{"v": "abc"}]}],
            "jobComplete": true
        }"#;
        let mut response = parse_response(body.as_bytes()).unwrap();
        let schema = response.schema.take().unwrap();
        let err = decode_rows(&schema.fields, response.rows).unwrap_err();
        assert!(err.to_string().contains("feature_id"));
    }

    #[test]
    fn test_incomplete_job_response() {
        let body = r#"{
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "jobComplete": false
        }"#;
        let response = parse_response(body.as_bytes()).unwrap();
        assert!(!response.job_complete);
        assert_eq!(response.job_reference.unwrap().job_id, "job_1");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 25, 6, 0, 0).unwrap();
        assert_eq!(parse_timestamp("1700892000000000"), Some(expected));
        assert_eq!(parse_timestamp("1.700892E9"), Some(expected));
        assert_eq!(parse_timestamp("soon"), None);
    }

    #[test]
    fn test_rejected_error_message() {
        let body = br#"{"error": {"code": 400, "message": "Syntax error: Unexpected identifier", "status": "INVALID_ARGUMENT"}}"#;
        match rejected(StatusCode::BAD_REQUEST, body) {
            WarehouseError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Syntax error: Unexpected identifier");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let html = rejected(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert!(html.to_string().contains("bad gateway"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = QueryRequest {
            query: "SELECT 1",
            use_legacy_sql: false,
            use_query_cache: true,
            timeout_ms: 30_000,
            location: None,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["useLegacySql"], false);
        assert_eq!(json["useQueryCache"], true);
        assert_eq!(json["formatOptions"]["useInt64Timestamp"], true);
        assert!(json.get("location").is_none());
    }
}
