//! Benchmark harness
//!
//! Runs a fixed list of queries once per iteration. Queries inside an
//! iteration run in order; up to `concurrency` iterations are in flight at
//! once. Every call lands in the slot for its `(iteration, position)`, so the
//! output never depends on completion order.

use super::clock::Clock;
use crate::engine::SearchEngine;
use crate::query::CompiledQuery;
use crate::types::RunId;
use crate::{CatalogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant as TokioInstant;
use tracing::{debug, info, warn};

/// Error recorded for calls cut off by the overall timeout
pub const TIMED_OUT: &str = "benchmark timed out";

/// Knobs for one benchmark invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkOptions {
    pub iterations: u32,
    pub concurrency: usize,
    pub overall_timeout: Option<Duration>,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            iterations: 10,
            concurrency: 1,
            overall_timeout: None,
        }
    }
}

impl BenchmarkOptions {
    /// Checks the options against configured ceilings
    pub fn validate(&self, max_iterations: u32, max_concurrency: usize) -> Result<()> {
        if self.iterations == 0 {
            return Err(CatalogError::validation("iterations must be at least 1"));
        }
        if self.iterations > max_iterations {
            return Err(CatalogError::validation(format!(
                "iterations cannot exceed {}",
                max_iterations
            )));
        }
        if self.concurrency == 0 {
            return Err(CatalogError::validation("concurrency must be at least 1"));
        }
        if self.concurrency > max_concurrency {
            return Err(CatalogError::validation(format!(
                "concurrency cannot exceed {}",
                max_concurrency
            )));
        }
        if self.overall_timeout == Some(Duration::ZERO) {
            return Err(CatalogError::validation("timeout must be positive"));
        }
        Ok(())
    }
}

/// A named query in the benchmark suite
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkQuery {
    pub name: String,
    pub query: CompiledQuery,
}

impl BenchmarkQuery {
    pub fn new(name: impl Into<String>, query: CompiledQuery) -> Self {
        Self {
            name: name.into(),
            query,
        }
    }
}

/// Outcome of one engine call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResult {
    pub query_index: usize,
    pub query_name: String,
    pub duration_ms: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_took_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CallResult {
    pub fn succeeded(
        query_index: usize,
        query_name: &str,
        duration_ms: f64,
        hit_count: u64,
        engine_took_ms: u64,
    ) -> Self {
        Self {
            query_index,
            query_name: query_name.to_string(),
            duration_ms,
            success: true,
            hit_count: Some(hit_count),
            engine_took_ms: Some(engine_took_ms),
            error: None,
        }
    }

    pub fn failed(query_index: usize, query_name: &str, duration_ms: f64, error: String) -> Self {
        Self {
            query_index,
            query_name: query_name.to_string(),
            duration_ms,
            success: false,
            hit_count: None,
            engine_took_ms: None,
            error: Some(error),
        }
    }
}

/// Calls of one iteration, in query order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationResult {
    /// 1-based iteration number
    pub iteration: u32,
    pub per_query: Vec<CallResult>,
}

/// Everything recorded by one benchmark invocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkRun {
    pub run_id: RunId,
    #[serde(skip)]
    pub queries: Vec<BenchmarkQuery>,
    pub iterations: u32,
    pub concurrency: usize,
    pub started_at: DateTime<Utc>,
    pub total_duration_ms: f64,
    pub results: Vec<IterationResult>,
}

impl BenchmarkRun {
    /// Every call, iteration by iteration
    pub fn calls(&self) -> impl Iterator<Item = &CallResult> {
        self.results.iter().flat_map(|r| r.per_query.iter())
    }

    pub fn query_names(&self) -> Vec<&str> {
        self.queries.iter().map(|q| q.name.as_str()).collect()
    }
}

/// Drives benchmark queries against a shared engine handle
#[derive(Clone)]
pub struct BenchmarkHarness {
    engine: Arc<dyn SearchEngine>,
    clock: Arc<dyn Clock>,
}

impl BenchmarkHarness {
    pub fn new(engine: Arc<dyn SearchEngine>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    /// Run every query once per iteration
    ///
    /// Call failures are recorded, never raised. Only invalid arguments fail
    /// the run itself.
    pub async fn run(
        &self,
        queries: Vec<BenchmarkQuery>,
        options: BenchmarkOptions,
    ) -> Result<BenchmarkRun> {
        if queries.is_empty() {
            return Err(CatalogError::validation("benchmark needs at least one query"));
        }
        if options.iterations == 0 || options.concurrency == 0 {
            return Err(CatalogError::validation(
                "iterations and concurrency must be at least 1",
            ));
        }

        let run_id = RunId::new();
        let started_at = Utc::now();
        let run_start = self.clock.now();
        let deadline = options.overall_timeout.map(|t| TokioInstant::now() + t);

        info!(
            "Starting benchmark {}: {} queries x {} iterations, concurrency {}",
            run_id,
            queries.len(),
            options.iterations,
            options.concurrency
        );

        let shared = Arc::new(queries);
        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut tasks = JoinSet::new();

        for iteration in 1..=options.iterations {
            let engine = Arc::clone(&self.engine);
            let clock = Arc::clone(&self.clock);
            let queries = Arc::clone(&shared);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match acquire(semaphore, deadline).await {
                    Some(_permit) => {
                        run_iteration(engine.as_ref(), clock.as_ref(), &queries, iteration, deadline)
                            .await
                    }
                    None => timed_out_iteration(&queries, iteration),
                };
                (iteration, result)
            });
        }

        let mut slots: Vec<Option<IterationResult>> = vec![None; options.iterations as usize];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((iteration, result)) => slots[(iteration - 1) as usize] = Some(result),
                Err(e) => warn!("Benchmark iteration task failed: {}", e),
            }
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    failed_iteration(&shared, idx as u32 + 1, "iteration task aborted")
                })
            })
            .collect();

        let total_duration_ms = self.clock.elapsed_ms(run_start);
        let queries = Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone());

        info!("Benchmark {} finished in {:.2}ms", run_id, total_duration_ms);

        Ok(BenchmarkRun {
            run_id,
            queries,
            iterations: options.iterations,
            concurrency: options.concurrency,
            started_at,
            total_duration_ms,
            results,
        })
    }
}

async fn acquire(
    semaphore: Arc<Semaphore>,
    deadline: Option<TokioInstant>,
) -> Option<tokio::sync::OwnedSemaphorePermit> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, semaphore.acquire_owned())
            .await
            .ok()
            .and_then(|permit| permit.ok()),
        None => semaphore.acquire_owned().await.ok(),
    }
}

async fn run_iteration(
    engine: &dyn SearchEngine,
    clock: &dyn Clock,
    queries: &[BenchmarkQuery],
    iteration: u32,
    deadline: Option<TokioInstant>,
) -> IterationResult {
    let mut per_query = Vec::with_capacity(queries.len());

    for (index, entry) in queries.iter().enumerate() {
        if deadline.is_some_and(|d| TokioInstant::now() >= d) {
            per_query.push(CallResult::failed(index, &entry.name, 0.0, TIMED_OUT.to_string()));
            continue;
        }

        let start = clock.now();
        // None when the overall deadline cut the call off
        let outcome = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, engine.execute(&entry.query))
                .await
                .ok(),
            None => Some(engine.execute(&entry.query).await),
        };
        let duration_ms = clock.elapsed_ms(start);

        let call = match outcome {
            Some(Ok(response)) => CallResult::succeeded(
                index,
                &entry.name,
                duration_ms,
                response.total(),
                response.took_ms(),
            ),
            None => CallResult::failed(index, &entry.name, duration_ms, TIMED_OUT.to_string()),
            Some(Err(e)) => {
                warn!(
                    "Benchmark query '{}' failed in iteration {}: {}",
                    entry.name, iteration, e
                );
                CallResult::failed(index, &entry.name, duration_ms, e.to_string())
            }
        };
        per_query.push(call);
    }

    debug!("Benchmark iteration {} complete", iteration);
    IterationResult {
        iteration,
        per_query,
    }
}

fn timed_out_iteration(queries: &[BenchmarkQuery], iteration: u32) -> IterationResult {
    failed_iteration(queries, iteration, TIMED_OUT)
}

fn failed_iteration(queries: &[BenchmarkQuery], iteration: u32, error: &str) -> IterationResult {
    IterationResult {
        iteration,
        per_query: queries
            .iter()
            .enumerate()
            .map(|(index, q)| CallResult::failed(index, &q.name, 0.0, error.to_string()))
            .collect(),
    }
}
