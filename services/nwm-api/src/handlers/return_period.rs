//! Flood return-period handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};
use serde::Deserialize;
use tracing::instrument;

use nwm_protocol::types::parse_flag;
use nwm_protocol::{
    format, project, ApiResult, IdentifierSource, OutputFormat, Payload, QueryTemplate,
    ReturnPeriod,
};

use super::common::{query_rejected, respond};
use crate::metrics::Timer;
use crate::resolve::{execute, resolve_identifiers};
use crate::state::AppState;

/// Query parameters for `/return-period`.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnPeriodParams {
    pub comids: Option<String>,
    pub hydroshare_id: Option<String>,

    /// Comma-separated recurrence intervals in years; all six when absent.
    pub return_periods: Option<String>,

    /// Sort rows by reach ID.
    pub order_by_comid: Option<String>,

    pub output_format: Option<String>,
}

/// GET /return-period
pub async fn return_period_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<ReturnPeriodParams>, QueryRejection>,
) -> Response {
    let timer = Timer::start();
    let result = match params {
        Ok(Query(params)) => return_period(&state, params).await,
        Err(rejection) => Err(query_rejected(rejection)),
    };
    respond("return_period", &timer, result)
}

#[instrument(skip_all)]
async fn return_period(state: &AppState, params: ReturnPeriodParams) -> ApiResult<Payload> {
    let output_format = OutputFormat::from_query_param(params.output_format.as_deref())?;
    let periods = ReturnPeriod::parse_list(params.return_periods.as_deref())?;
    let order_by_comid = parse_flag("order_by_comid", params.order_by_comid.as_deref())?;
    let source =
        IdentifierSource::select(params.comids.as_deref(), params.hydroshare_id.as_deref())?;

    let ids = resolve_identifiers(state, source).await?;

    let query = QueryTemplate::ReturnPeriod {
        ids,
        periods,
        order_by_comid,
    };
    let rows = execute(state, &query).await?;
    format(&project(rows), output_format)
}
