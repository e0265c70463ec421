//! Warehouse query templates.
//!
//! Each endpoint maps to one [`QueryTemplate`] variant built from fully
//! resolved values. Rendering is pure: identifiers become numeric lists,
//! caller-supplied text becomes escaped string literals, and table names come
//! from a validated [`TableConfig`].
//!
//! # Example
//!
//! ```rust
//! use nwm_protocol::identifiers::parse_comids;
//! use nwm_protocol::queries::{QueryTemplate, TableConfig};
//! use nwm_protocol::types::{EnsembleSelector, ForecastType};
//! use chrono::{TimeZone, Utc};
//!
//! let ids = parse_comids("12068774").unwrap();
//! let reference_time = Utc.with_ymd_and_hms(2023, 11, 25, 6, 0, 0).unwrap();
//! let query = QueryTemplate::forecast(
//!     ForecastType::LongRange,
//!     ids,
//!     reference_time,
//!     &EnsembleSelector::Members(vec![0]),
//! );
//!
//! let sql = query.render(&TableConfig::default());
//! assert!(sql.contains("ensemble IN (0)"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::records::{Value, WarehouseRow};
use crate::time::{render_reference_time, TimeWindow};
use crate::types::{
    join_display, Coordinates, EnsembleSelector, ForecastType, IdentifierSet, ReturnPeriod,
    RunOffset,
};

/// Column produced by [`QueryTemplate::LatestReferenceTime`].
pub const LATEST_REFERENCE_TIME_COLUMN: &str = "latest_reference_time";

/// Cheapest query the warehouse will answer; used by readiness checks.
pub const PROBE_QUERY: &str = "SELECT 1";

const PUBLIC_DATASET: &str = "bigquery-public-data.national_water_model";

fn default_long_range() -> String {
    format!("{}.long_range_channel_rt", PUBLIC_DATASET)
}

fn default_medium_range() -> String {
    format!("{}.medium_range_channel_rt", PUBLIC_DATASET)
}

fn default_short_range() -> String {
    format!("{}.short_range_channel_rt", PUBLIC_DATASET)
}

fn default_analysis_assim() -> String {
    format!("{}.analysis_assim_channel_rt", PUBLIC_DATASET)
}

fn default_stream_network() -> String {
    format!("{}.stream_network", PUBLIC_DATASET)
}

fn default_return_periods() -> String {
    format!("{}.flood_return_periods", PUBLIC_DATASET)
}

fn default_canary_feature_id() -> i64 {
    101
}

/// Warehouse table names and lookup constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_long_range")]
    pub long_range: String,

    #[serde(default = "default_medium_range")]
    pub medium_range: String,

    #[serde(default = "default_short_range")]
    pub short_range: String,

    #[serde(default = "default_analysis_assim")]
    pub analysis_assim: String,

    #[serde(default = "default_stream_network")]
    pub stream_network: String,

    /// Optional routing-attribute table joined onto geometry lookups.
    #[serde(default)]
    pub routing: Option<String>,

    #[serde(default = "default_return_periods")]
    pub return_periods: String,

    /// Reach that exists in every forecast cycle, used to find the latest one.
    #[serde(default = "default_canary_feature_id")]
    pub canary_feature_id: i64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            long_range: default_long_range(),
            medium_range: default_medium_range(),
            short_range: default_short_range(),
            analysis_assim: default_analysis_assim(),
            stream_network: default_stream_network(),
            routing: None,
            return_periods: default_return_periods(),
            canary_feature_id: default_canary_feature_id(),
        }
    }
}

impl TableConfig {
    pub fn forecast_table(&self, forecast_type: ForecastType) -> &str {
        match forecast_type {
            ForecastType::LongRange => &self.long_range,
            ForecastType::MediumRange => &self.medium_range,
            ForecastType::ShortRange => &self.short_range,
        }
    }

    /// Reject table names that cannot be safely placed inside backticks.
    pub fn validate(&self) -> Result<(), String> {
        let mut tables = vec![
            ("long_range", self.long_range.as_str()),
            ("medium_range", self.medium_range.as_str()),
            ("short_range", self.short_range.as_str()),
            ("analysis_assim", self.analysis_assim.as_str()),
            ("stream_network", self.stream_network.as_str()),
            ("return_periods", self.return_periods.as_str()),
        ];
        if let Some(routing) = &self.routing {
            tables.push(("routing", routing.as_str()));
        }

        for (key, name) in tables {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
            if !valid {
                return Err(format!("table '{}' has an invalid name: {:?}", key, name));
            }
        }

        if self.canary_feature_id <= 0 {
            return Err(format!(
                "canary_feature_id must be positive, got {}",
                self.canary_feature_id
            ));
        }
        Ok(())
    }
}

/// Geometry lookup variants.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryQuery {
    /// Attribute rows for the given stations.
    ByIdentifiers(IdentifierSet),
    /// The single reach closest to a point.
    Nearest(Coordinates),
}

/// A fully parameterized warehouse query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTemplate {
    LatestReferenceTime {
        forecast_type: ForecastType,
    },
    ForecastAggregate {
        forecast_type: ForecastType,
        ids: IdentifierSet,
        reference_time: DateTime<Utc>,
    },
    ForecastExplicit {
        forecast_type: ForecastType,
        ids: IdentifierSet,
        reference_time: DateTime<Utc>,
        members: Vec<u32>,
    },
    Assimilation {
        ids: IdentifierSet,
        run_offset: RunOffset,
        window: TimeWindow,
    },
    Geometry(GeometryQuery),
    ReturnPeriod {
        ids: IdentifierSet,
        periods: Vec<ReturnPeriod>,
        order_by_comid: bool,
    },
}

impl QueryTemplate {
    /// Pick the forecast shape for an ensemble selection.
    pub fn forecast(
        forecast_type: ForecastType,
        ids: IdentifierSet,
        reference_time: DateTime<Utc>,
        ensemble: &EnsembleSelector,
    ) -> Self {
        match ensemble {
            EnsembleSelector::Average => QueryTemplate::ForecastAggregate {
                forecast_type,
                ids,
                reference_time,
            },
            EnsembleSelector::Members(members) => QueryTemplate::ForecastExplicit {
                forecast_type,
                ids,
                reference_time,
                members: members.clone(),
            },
        }
    }

    /// Short label for logs and metrics.
    pub fn shape(&self) -> &'static str {
        match self {
            QueryTemplate::LatestReferenceTime { .. } => "latest_reference_time",
            QueryTemplate::ForecastAggregate { .. } => "forecast_aggregate",
            QueryTemplate::ForecastExplicit { .. } => "forecast_explicit",
            QueryTemplate::Assimilation { .. } => "assimilation",
            QueryTemplate::Geometry(GeometryQuery::ByIdentifiers(_)) => "geometry_ids",
            QueryTemplate::Geometry(GeometryQuery::Nearest(_)) => "geometry_nearest",
            QueryTemplate::ReturnPeriod { .. } => "return_period",
        }
    }

    pub fn render(&self, tables: &TableConfig) -> String {
        match self {
            QueryTemplate::LatestReferenceTime { forecast_type } => format!(
                "SELECT\n    MAX(reference_time) AS {column}\nFROM\n    `{table}`\nWHERE\n    \
                 DATETIME(reference_time) >= DATE_SUB(CURRENT_DATE(), INTERVAL 1 DAY)\n    \
                 AND feature_id = {canary}\n    AND ensemble = 0",
                column = LATEST_REFERENCE_TIME_COLUMN,
                table = tables.forecast_table(*forecast_type),
                canary = tables.canary_feature_id,
            ),

            QueryTemplate::ForecastAggregate {
                forecast_type,
                ids,
                reference_time,
            } => format!(
                "WITH average_rolls AS (\n    SELECT\n        feature_id,\n        reference_time,\n        \
                 time,\n        'average' AS ensemble,\n        AVG(streamflow) AS streamflow,\n        \
                 AVG(velocity) AS velocity\n    FROM\n        `{table}`\n    WHERE\n        \
                 feature_id IN ({ids})\n        AND reference_time = {reference_time}\n    \
                 GROUP BY\n        feature_id, reference_time, time\n)\n\
                 SELECT *\nFROM average_rolls\nORDER BY time",
                table = tables.forecast_table(*forecast_type),
                ids = ids.sql_list(),
                reference_time = quote_literal(&render_reference_time(reference_time)),
            ),

            QueryTemplate::ForecastExplicit {
                forecast_type,
                ids,
                reference_time,
                members,
            } => format!(
                "SELECT\n    feature_id,\n    reference_time,\n    time,\n    ensemble,\n    \
                 streamflow,\n    velocity\nFROM\n    `{table}`\nWHERE\n    feature_id IN ({ids})\n    \
                 AND reference_time = {reference_time}\n    AND ensemble IN ({members})\n\
                 ORDER BY\n    time",
                table = tables.forecast_table(*forecast_type),
                ids = ids.sql_list(),
                reference_time = quote_literal(&render_reference_time(reference_time)),
                members = join_display(members),
            ),

            QueryTemplate::Assimilation {
                ids,
                run_offset,
                window,
            } => format!(
                "SELECT\n    feature_id,\n    time,\n    streamflow,\n    velocity\nFROM\n    \
                 `{table}`\nWHERE\n    feature_id IN ({ids})\n    AND forecast_offset = {offset}\n    \
                 AND time >= {start}\n    AND time <= {end}\nORDER BY\n    time",
                table = tables.analysis_assim,
                ids = ids.sql_list(),
                offset = run_offset.get(),
                start = quote_literal(&window.start),
                end = quote_literal(&window.end),
            ),

            QueryTemplate::Geometry(GeometryQuery::ByIdentifiers(ids)) => {
                match &tables.routing {
                    Some(routing) => format!(
                        "SELECT\n    streams.*,\n    routing.* EXCEPT (feature_id)\nFROM\n    \
                         `{streams}` AS streams\nLEFT JOIN\n    `{routing}` AS routing\n    \
                         ON routing.feature_id = streams.station_id\nWHERE\n    \
                         streams.station_id IN ({ids})\nORDER BY\n    streams.station_id",
                        streams = tables.stream_network,
                        routing = routing,
                        ids = ids.sql_list(),
                    ),
                    None => format!(
                        "SELECT\n    streams.*\nFROM\n    `{streams}` AS streams\nWHERE\n    \
                         streams.station_id IN ({ids})\nORDER BY\n    streams.station_id",
                        streams = tables.stream_network,
                        ids = ids.sql_list(),
                    ),
                }
            }

            QueryTemplate::Geometry(GeometryQuery::Nearest(point)) => format!(
                "SELECT\n    streams.*,\n    ST_DISTANCE(streams.geometry, ST_GEOGPOINT({lon}, {lat})) \
                 AS distance\nFROM\n    `{streams}` AS streams\nORDER BY distance\nLIMIT 1",
                lon = point.lon,
                lat = point.lat,
                streams = tables.stream_network,
            ),

            QueryTemplate::ReturnPeriod {
                ids,
                periods,
                order_by_comid,
            } => {
                let mut columns = vec!["feature_id".to_string()];
                columns.extend(periods.iter().map(ReturnPeriod::column));

                let mut sql = format!(
                    "SELECT\n    {columns}\nFROM\n    `{table}`\nWHERE\n    feature_id IN ({ids})",
                    columns = columns.join(",\n    "),
                    table = tables.return_periods,
                    ids = ids.sql_list(),
                );
                if *order_by_comid {
                    sql.push_str("\nORDER BY feature_id");
                }
                sql
            }
        }
    }
}

/// Quote `raw` as a SQL string literal, escaping backslashes and quotes.
pub fn quote_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Latest non-null `latest_reference_time` across `rows`.
pub fn latest_reference_time(rows: &[WarehouseRow]) -> Option<DateTime<Utc>> {
    rows.iter()
        .filter_map(|row| row.get(LATEST_REFERENCE_TIME_COLUMN))
        .filter_map(Value::as_timestamp)
        .max()
        .copied()
}
