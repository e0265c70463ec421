//! Reach geometry handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use nwm_protocol::{
    format, project, ApiResult, Coordinates, GeometryQuery, GeometrySelector, IdentifierSource,
    OutputFormat, Payload, QueryTemplate,
};

use super::common::{query_rejected, respond};
use crate::metrics::Timer;
use crate::resolve::{execute, resolve_identifiers};
use crate::state::AppState;

/// Query parameters for `/geometry`.
#[derive(Debug, Default, Deserialize)]
pub struct GeometryParams {
    pub comids: Option<String>,
    pub hydroshare_id: Option<String>,

    /// Latitude for a nearest-reach lookup; requires `lon`.
    pub lat: Option<String>,

    /// Longitude for a nearest-reach lookup; requires `lat`.
    pub lon: Option<String>,

    pub output_format: Option<String>,
}

/// GET /geometry
pub async fn geometry_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<GeometryParams>, QueryRejection>,
) -> Response {
    let timer = Timer::start();
    let result = match params {
        Ok(Query(params)) => geometry(&state, params).await,
        Err(rejection) => Err(query_rejected(rejection)),
    };
    respond("geometry", &timer, result)
}

#[instrument(skip_all)]
async fn geometry(state: &AppState, params: GeometryParams) -> ApiResult<Payload> {
    let output_format = OutputFormat::from_query_param(params.output_format.as_deref())?;
    let coordinates = Coordinates::parse(params.lat.as_deref(), params.lon.as_deref())?;
    let selector = GeometrySelector::select(
        params.comids.as_deref(),
        params.hydroshare_id.as_deref(),
        coordinates,
    )?;

    let query = match selector {
        GeometrySelector::Identifiers(ids) => GeometryQuery::ByIdentifiers(ids),
        GeometrySelector::Resource(token) => {
            let ids = resolve_identifiers(state, IdentifierSource::Resource(token)).await?;
            GeometryQuery::ByIdentifiers(ids)
        }
        GeometrySelector::Nearest(point) => {
            debug!(lat = point.lat, lon = point.lon, "Nearest reach lookup");
            GeometryQuery::Nearest(point)
        }
    };

    let rows = execute(state, &QueryTemplate::Geometry(query)).await?;
    format(&project(rows), output_format)
}
