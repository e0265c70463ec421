//! Request resolution: identifiers, reference times and query execution.
//!
//! Everything here talks to a collaborator. Parameter parsing has already
//! happened by the time these run, so failures are upstream failures.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use nwm_protocol::queries::latest_reference_time;
use nwm_protocol::{
    ApiError, ApiResult, ForecastType, IdentifierSet, IdentifierSource, QueryTemplate,
    WarehouseRow,
};

use crate::metrics::{record_identifier_lookup, record_warehouse_query, Timer};
use crate::state::AppState;

/// Turn an identifier source into a concrete set, fetching from HydroShare
/// when the source is a resource token.
pub async fn resolve_identifiers(
    state: &AppState,
    source: IdentifierSource,
) -> ApiResult<IdentifierSet> {
    match source {
        IdentifierSource::Direct(ids) => Ok(ids),
        IdentifierSource::Resource(token) => {
            let result = state.resolver.resolve(&token).await;
            record_identifier_lookup(result.is_ok());
            result
        }
    }
}

/// Use the caller's reference time, or look up the latest forecast cycle.
///
/// The lookup only considers the last day of cycles. Finding none is treated
/// as an upstream failure rather than querying with an empty reference time.
pub async fn resolve_reference_time(
    state: &AppState,
    forecast_type: ForecastType,
    requested: Option<DateTime<Utc>>,
) -> ApiResult<DateTime<Utc>> {
    if let Some(reference_time) = requested {
        return Ok(reference_time);
    }

    let query = QueryTemplate::LatestReferenceTime { forecast_type };
    let rows = execute(state, &query).await?;

    match latest_reference_time(&rows) {
        Some(reference_time) => {
            debug!(%forecast_type, %reference_time, "Resolved latest reference time");
            Ok(reference_time)
        }
        None => {
            warn!(%forecast_type, "No forecast cycle found in the last day");
            Err(ApiError::NoReferenceTime(
                state.config.tables.forecast_table(forecast_type).to_string(),
            ))
        }
    }
}

/// Render and run a query, timing it per shape.
pub async fn execute(state: &AppState, query: &QueryTemplate) -> ApiResult<Vec<WarehouseRow>> {
    let sql = query.render(&state.config.tables);
    debug!(shape = query.shape(), sql = %sql, "Executing warehouse query");

    let timer = Timer::start();
    let result = state.warehouse.query(&sql).await;
    record_warehouse_query(query.shape(), result.is_ok(), timer.elapsed());

    result.map_err(ApiError::from)
}
