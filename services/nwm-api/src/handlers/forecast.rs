//! Forecast handlers (`/forecast` and `/forecast-records`).

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, instrument};

use nwm_protocol::time::parse_reference_time;
use nwm_protocol::{
    format, project, ApiResult, EnsembleSelector, ForecastType, IdentifierSource, OutputFormat,
    Payload, QueryTemplate,
};

use super::common::{non_blank, query_rejected, respond};
use crate::metrics::Timer;
use crate::resolve::{execute, resolve_identifiers, resolve_reference_time};
use crate::state::AppState;

/// Query parameters for the forecast endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ForecastParams {
    /// long_range, medium_range or short_range. Required.
    pub forecast_type: Option<String>,

    /// Forecast cycle; the latest cycle when absent.
    pub reference_time: Option<String>,

    /// Comma-separated reach IDs.
    pub comids: Option<String>,

    /// HydroShare resource publishing `nwm_comids.json`.
    pub hydroshare_id: Option<String>,

    /// Comma-separated ensemble members; the member average when absent.
    pub ensemble: Option<String>,

    pub output_format: Option<String>,
}

/// GET /forecast
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> Response {
    let timer = Timer::start();
    let result = match params {
        Ok(Query(params)) => forecast(&state, params).await,
        Err(rejection) => Err(query_rejected(rejection)),
    };
    respond("forecast", &timer, result)
}

/// GET /forecast-records
pub async fn forecast_records_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<ForecastParams>, QueryRejection>,
) -> Response {
    let timer = Timer::start();
    let result = match params {
        Ok(Query(params)) => forecast(&state, params).await,
        Err(rejection) => Err(query_rejected(rejection)),
    };
    respond("forecast_records", &timer, result)
}

#[instrument(skip_all, fields(forecast_type = ?params.forecast_type))]
async fn forecast(state: &AppState, params: ForecastParams) -> ApiResult<Payload> {
    // Every parameter is validated before any collaborator is called.
    let forecast_type = ForecastType::parse(params.forecast_type.as_deref())?;
    let output_format = OutputFormat::from_query_param(params.output_format.as_deref())?;
    let ensemble = EnsembleSelector::parse(params.ensemble.as_deref())?;
    let requested_time = non_blank(&params.reference_time)
        .map(parse_reference_time)
        .transpose()?;
    let source =
        IdentifierSource::select(params.comids.as_deref(), params.hydroshare_id.as_deref())?;

    let (ids, reference_time) = tokio::try_join!(
        resolve_identifiers(state, source),
        resolve_reference_time(state, forecast_type, requested_time),
    )?;

    info!(
        %forecast_type,
        %reference_time,
        reaches = ids.len(),
        "Querying forecast"
    );

    let query = QueryTemplate::forecast(forecast_type, ids, reference_time, &ensemble);
    let rows = execute(state, &query).await?;
    format(&project(rows), output_format)
}
