//! Analysis-assimilation handler.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::Response,
};
use serde::Deserialize;
use tracing::{info, instrument};

use nwm_protocol::{
    format, project, ApiResult, IdentifierSource, OutputFormat, Payload, QueryTemplate,
    RunOffset, TimeWindow,
};

use super::common::{query_rejected, respond};
use crate::metrics::Timer;
use crate::resolve::{execute, resolve_identifiers};
use crate::state::AppState;

/// Query parameters for `/analysis-assim`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisAssimParams {
    /// Window start; the configured epoch when absent.
    pub start_time: Option<String>,

    /// Window end; the current time when absent.
    pub end_time: Option<String>,

    pub comids: Option<String>,
    pub hydroshare_id: Option<String>,

    /// Hours before the analysis time, 1 to 3.
    pub run_offset: Option<String>,

    pub output_format: Option<String>,
}

/// GET /analysis-assim
pub async fn analysis_assim_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: Result<Query<AnalysisAssimParams>, QueryRejection>,
) -> Response {
    let timer = Timer::start();
    let result = match params {
        Ok(Query(params)) => analysis_assim(&state, params).await,
        Err(rejection) => Err(query_rejected(rejection)),
    };
    respond("analysis_assim", &timer, result)
}

#[instrument(skip_all)]
async fn analysis_assim(state: &AppState, params: AnalysisAssimParams) -> ApiResult<Payload> {
    let run_offset = RunOffset::parse(params.run_offset.as_deref())?;
    let output_format = OutputFormat::from_query_param(params.output_format.as_deref())?;
    let source =
        IdentifierSource::select(params.comids.as_deref(), params.hydroshare_id.as_deref())?;
    let window = TimeWindow::resolve(
        params.start_time.as_deref(),
        params.end_time.as_deref(),
        &state.config.default_start_time,
        state.now(),
    );

    let ids = resolve_identifiers(state, source).await?;

    info!(
        run_offset = run_offset.get(),
        start = %window.start,
        end = %window.end,
        reaches = ids.len(),
        "Querying analysis assimilation"
    );

    let query = QueryTemplate::Assimilation {
        ids,
        run_offset,
        window,
    };
    let rows = execute(state, &query).await?;
    format(&project(rows), output_format)
}
