//! Warehouse rows shaped like the NWM public dataset tables.

use chrono::{DateTime, Duration, TimeZone, Utc};
use nwm_protocol::queries::LATEST_REFERENCE_TIME_COLUMN;
use nwm_protocol::{Value, WarehouseRow};

/// Reach used throughout the scenarios (Provo River, UT).
pub const PROVO_RIVER: i64 = 12068774;

/// Whole-hour UTC timestamp.
pub fn ts(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture time {}-{}-{} {}h", year, month, day, hour))
}

/// Single-row answer to the latest reference time lookup.
pub fn latest_reference_time(t: DateTime<Utc>) -> WarehouseRow {
    WarehouseRow::new(vec![(
        LATEST_REFERENCE_TIME_COLUMN.to_string(),
        Value::Timestamp(t),
    )])
}

/// The lookup's answer when no cycle landed in the last day.
pub fn no_reference_time() -> WarehouseRow {
    WarehouseRow::new(vec![(LATEST_REFERENCE_TIME_COLUMN.to_string(), Value::Null)])
}

/// One forecast row with the canonical column order.
pub fn forecast(
    feature_id: i64,
    reference_time: DateTime<Utc>,
    time: DateTime<Utc>,
    ensemble: Value,
    streamflow: f64,
    velocity: f64,
) -> WarehouseRow {
    WarehouseRow::new(vec![
        ("feature_id".to_string(), Value::Int(feature_id)),
        ("reference_time".to_string(), Value::Timestamp(reference_time)),
        ("time".to_string(), Value::Timestamp(time)),
        ("ensemble".to_string(), ensemble),
        ("streamflow".to_string(), Value::Float(streamflow)),
        ("velocity".to_string(), Value::Float(velocity)),
    ])
}

/// `hours` consecutive hourly forecast rows after `reference_time`.
pub fn forecast_series(
    feature_id: i64,
    reference_time: DateTime<Utc>,
    ensemble: Value,
    hours: i64,
) -> Vec<WarehouseRow> {
    (1..=hours)
        .map(|h| {
            forecast(
                feature_id,
                reference_time,
                reference_time + Duration::hours(h),
                ensemble.clone(),
                10.0 + h as f64,
                0.5,
            )
        })
        .collect()
}

/// One analysis-assimilation row.
pub fn assimilation(feature_id: i64, time: DateTime<Utc>, streamflow: f64) -> WarehouseRow {
    WarehouseRow::new(vec![
        ("feature_id".to_string(), Value::Int(feature_id)),
        ("time".to_string(), Value::Timestamp(time)),
        ("streamflow".to_string(), Value::Float(streamflow)),
        ("velocity".to_string(), Value::Float(0.4)),
    ])
}

/// One stream network row; `distance` is appended for nearest lookups.
pub fn stream_network(station_id: i64, distance: Option<f64>) -> WarehouseRow {
    let mut columns = vec![
        ("station_id".to_string(), Value::Int(station_id)),
        (
            "geometry".to_string(),
            Value::String("LINESTRING(-111.65 40.23, -111.66 40.24)".to_string()),
        ),
    ];
    if let Some(distance) = distance {
        columns.push(("distance".to_string(), Value::Float(distance)));
    }
    WarehouseRow::new(columns)
}

/// One flood return period row holding the given `(years, flow)` columns.
pub fn return_period(feature_id: i64, periods: &[(u32, f64)]) -> WarehouseRow {
    let mut columns = vec![("feature_id".to_string(), Value::Int(feature_id))];
    columns.extend(
        periods
            .iter()
            .map(|(years, flow)| (format!("return_period_{}", years), Value::Float(*flow))),
    );
    WarehouseRow::new(columns)
}
