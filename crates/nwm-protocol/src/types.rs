//! Domain types for NWM requests.
//!
//! Every query parameter arrives as an optional string and is parsed here, so
//! malformed values of any kind surface as an [`ApiError`] with the same body.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, ApiResult};

/// Identifier of a single model reach (NHDPlus COMID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReachId(i64);

impl ReachId {
    /// Returns `None` unless `id` is strictly positive.
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ReachId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered, non-empty, duplicate-free set of reach identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: Vec<ReachId>,
}

impl IdentifierSet {
    /// Build a set, dropping repeats but keeping first-seen order.
    ///
    /// Returns `None` when `ids` yields nothing.
    pub fn from_ids(ids: impl IntoIterator<Item = ReachId>) -> Option<Self> {
        let mut seen = HashSet::new();
        let out: Vec<ReachId> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        if out.is_empty() {
            None
        } else {
            Some(Self { ids: out })
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReachId> {
        self.ids.iter()
    }

    /// Render as a SQL numeric list, e.g. `1, 2, 3`.
    pub fn sql_list(&self) -> String {
        join_display(&self.ids)
    }
}

/// NWM forecast configuration backing the `/forecast` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastType {
    LongRange,
    MediumRange,
    ShortRange,
}

impl ForecastType {
    pub const ALL: [ForecastType; 3] = [
        ForecastType::LongRange,
        ForecastType::MediumRange,
        ForecastType::ShortRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastType::LongRange => "long_range",
            ForecastType::MediumRange => "medium_range",
            ForecastType::ShortRange => "short_range",
        }
    }

    /// Parse the required `forecast_type` parameter.
    pub fn parse(value: Option<&str>) -> ApiResult<Self> {
        let raw = value.map(str::trim).filter(|v| !v.is_empty()).ok_or_else(|| {
            ApiError::MissingParameter("Missing required parameter 'forecast_type'".to_string())
        })?;

        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| {
                ApiError::invalid(
                    "forecast_type",
                    format!(
                        "'{}' is not supported. Supported values are long_range, medium_range, short_range",
                        raw
                    ),
                )
            })
    }
}

impl fmt::Display for ForecastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output representation of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    /// Get the Content-Type header value for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Json => crate::media_types::JSON,
            OutputFormat::Csv => crate::media_types::CSV,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Csv => "CSV",
        }
    }

    /// Parse the `output_format` parameter, case-insensitively.
    ///
    /// Absent means JSON.
    pub fn from_query_param(value: Option<&str>) -> ApiResult<Self> {
        let Some(raw) = value else {
            return Ok(OutputFormat::Json);
        };
        match raw.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(ApiError::UnsupportedFormat(raw.to_string())),
        }
    }
}

/// Analysis-assimilation forecast offset (hours before the analysis time).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOffset(u8);

impl RunOffset {
    pub fn new(value: u8) -> Option<Self> {
        (1..=3).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Parse the `run_offset` parameter. Absent means 1.
    pub fn parse(value: Option<&str>) -> ApiResult<Self> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(Self::default());
        };
        raw.parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| {
                ApiError::invalid(
                    "run_offset",
                    format!("'{}' is not supported. Supported values are 1, 2, and 3", raw),
                )
            })
    }
}

impl Default for RunOffset {
    fn default() -> Self {
        Self(1)
    }
}

/// Which ensemble members to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsembleSelector {
    /// Average over every member, labelled `"average"`.
    Average,
    /// Explicit member list in caller order.
    Members(Vec<u32>),
}

impl EnsembleSelector {
    /// Parse the `ensemble` parameter. Absent or blank means [`EnsembleSelector::Average`].
    pub fn parse(value: Option<&str>) -> ApiResult<Self> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(EnsembleSelector::Average);
        };

        let members = raw
            .split(',')
            .map(|token| {
                let token = token.trim();
                token.parse::<u32>().map_err(|_| {
                    ApiError::invalid(
                        "ensemble",
                        format!("'{}' is not a non-negative integer member", token),
                    )
                })
            })
            .collect::<ApiResult<Vec<u32>>>()?;

        Ok(EnsembleSelector::Members(members))
    }
}

/// Canonical flood recurrence interval in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnPeriod {
    Y2,
    Y5,
    Y10,
    Y25,
    Y50,
    Y100,
}

impl ReturnPeriod {
    pub const ALL: [ReturnPeriod; 6] = [
        ReturnPeriod::Y2,
        ReturnPeriod::Y5,
        ReturnPeriod::Y10,
        ReturnPeriod::Y25,
        ReturnPeriod::Y50,
        ReturnPeriod::Y100,
    ];

    pub fn years(&self) -> u32 {
        match self {
            ReturnPeriod::Y2 => 2,
            ReturnPeriod::Y5 => 5,
            ReturnPeriod::Y10 => 10,
            ReturnPeriod::Y25 => 25,
            ReturnPeriod::Y50 => 50,
            ReturnPeriod::Y100 => 100,
        }
    }

    pub fn from_years(years: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.years() == years)
    }

    /// Warehouse column holding this interval.
    pub fn column(&self) -> String {
        format!("return_period_{}", self.years())
    }

    /// Parse the `return_periods` parameter.
    ///
    /// Absent or blank selects all six intervals. Caller order is kept and
    /// repeats are dropped.
    pub fn parse_list(value: Option<&str>) -> ApiResult<Vec<Self>> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(Self::ALL.to_vec());
        };

        let mut periods = Vec::new();
        for token in raw.split(',') {
            let token = token.trim();
            let period = token
                .parse::<u32>()
                .ok()
                .and_then(Self::from_years)
                .ok_or_else(|| {
                    ApiError::invalid(
                        "return_periods",
                        format!(
                            "'{}' is not supported. Supported values are 2, 5, 10, 25, 50, 100",
                            token
                        ),
                    )
                })?;
            if !periods.contains(&period) {
                periods.push(period);
            }
        }
        Ok(periods)
    }
}

/// Geographic point used for nearest-reach lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Parse `lat`/`lon`. Both absent yields `None`; exactly one present is an error.
    pub fn parse(lat: Option<&str>, lon: Option<&str>) -> ApiResult<Option<Self>> {
        let lat = lat.map(str::trim).filter(|v| !v.is_empty());
        let lon = lon.map(str::trim).filter(|v| !v.is_empty());

        match (lat, lon) {
            (None, None) => Ok(None),
            (Some(lat), Some(lon)) => {
                let lat = parse_coordinate("lat", lat, 90.0)?;
                let lon = parse_coordinate("lon", lon, 180.0)?;
                Ok(Some(Coordinates { lat, lon }))
            }
            (Some(_), None) => Err(ApiError::invalid("lon", "lon must be provided together with lat")),
            (None, Some(_)) => Err(ApiError::invalid("lat", "lat must be provided together with lon")),
        }
    }
}

fn parse_coordinate(param: &str, raw: &str, limit: f64) -> ApiResult<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ApiError::invalid(param, format!("'{}' is not a number", raw)))?;
    if !value.is_finite() || value < -limit || value > limit {
        return Err(ApiError::invalid(
            param,
            format!("{} is outside [-{}, {}]", value, limit, limit),
        ));
    }
    Ok(value)
}

/// Parse a boolean flag such as `order_by_comid`. Absent means `false`.
pub fn parse_flag(param: &str, value: Option<&str>) -> ApiResult<bool> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(false);
    };
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiError::invalid(param, format!("'{}' is not a boolean", raw))),
    }
}

pub(crate) fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
