//! Benchmark and test-script endpoints

use crate::error::{ApiError, ApiResult};
use crate::handlers::AppState;
use axum::extract::{rejection::JsonRejection, Json, State};
use catalog_core::bench::{
    compile_scripts, default_suite, BenchmarkOptions, BenchmarkQuery, BenchmarkReport, TestScript,
};
use catalog_core::config::BenchmarkSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Run parameters; absent fields take the configured defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkParams {
    pub iterations: Option<u32>,
    pub concurrency: Option<usize>,
    /// Overall timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Include every call record in the report
    #[serde(default)]
    pub include_calls: bool,
}

impl BenchmarkParams {
    /// Resolves and validates the options against the configured ceilings
    pub fn options(&self, settings: &BenchmarkSettings) -> ApiResult<BenchmarkOptions> {
        let options = BenchmarkOptions {
            iterations: self.iterations.unwrap_or(settings.iterations),
            concurrency: self.concurrency.unwrap_or(settings.concurrency),
            overall_timeout: Some(Duration::from_millis(
                self.timeout_ms.unwrap_or(settings.timeout_ms),
            )),
        };
        options.validate(settings.max_iterations, settings.max_concurrency)?;
        Ok(options)
    }
}

/// Body of `POST /api/test-scripts/run`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScriptRequest {
    pub scripts: Vec<TestScript>,
    #[serde(flatten)]
    pub params: BenchmarkParams,
}

async fn run_report(
    state: &AppState,
    queries: Vec<BenchmarkQuery>,
    params: &BenchmarkParams,
) -> ApiResult<Json<BenchmarkReport>> {
    let options = params.options(&state.config.benchmark)?;
    info!(
        "Benchmarking {} queries: {} iterations, concurrency {}",
        queries.len(),
        options.iterations,
        options.concurrency
    );

    let run = state.harness.run(queries, options).await?;
    let report = BenchmarkReport::from_run(run, params.include_calls);

    info!(
        "Benchmark {} finished: success rate {}%",
        report.run_id, report.overall.success_rate
    );
    Ok(Json(report))
}

/// Runs the built-in query suite; a request without a JSON body uses the
/// configured defaults
pub async fn handle_benchmark(
    State(state): State<AppState>,
    payload: Result<Json<BenchmarkParams>, JsonRejection>,
) -> ApiResult<Json<BenchmarkReport>> {
    let params = match payload {
        Ok(Json(params)) => params,
        Err(JsonRejection::MissingJsonContentType(_)) => BenchmarkParams::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    run_report(&state, default_suite(), &params).await
}

/// Runs caller supplied named searches
pub async fn handle_test_scripts(
    State(state): State<AppState>,
    payload: Result<Json<TestScriptRequest>, JsonRejection>,
) -> ApiResult<Json<BenchmarkReport>> {
    let Json(request) = payload?;
    if request.scripts.is_empty() {
        return Err(ApiError::bad_request("At least one test script is required"));
    }

    let queries = compile_scripts(&request.scripts, state.max_page_size())?;
    run_report(&state, queries, &request.params).await
}
