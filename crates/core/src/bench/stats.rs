//! Latency statistics over benchmark calls
//!
//! Statistics are derived on demand from a [`BenchmarkRun`] and never stored
//! independently. Latency figures cover successful calls only; the success
//! rate covers every attempted call.

use super::harness::{BenchmarkRun, CallResult};
use crate::shaper::round_currency;
use crate::types::RunId;
use serde::{Deserialize, Serialize};

/// Percentiles reported for every statistics block
pub const PERCENTILES: [u32; 4] = [50, 90, 95, 99];

/// Nearest-rank percentile over ascending `sorted` values
///
/// Uses `idx = ceil(p/100 * n) - 1`, clamped at 0. Returns `None` for an
/// empty slice.
pub fn percentile(sorted: &[f64], p: u32) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let rank = (p as usize * n).div_ceil(100);
    let idx = rank.saturating_sub(1).min(n - 1);
    Some(sorted[idx])
}

/// Summary of call latencies in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub success_count: usize,
    /// Percentage of successful calls, two decimals
    pub success_rate: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

impl Statistics {
    pub fn from_calls<'a, I>(calls: I) -> Self
    where
        I: IntoIterator<Item = &'a CallResult>,
    {
        let mut count = 0;
        let mut durations = Vec::new();
        for call in calls {
            count += 1;
            if call.success {
                durations.push(call.duration_ms);
            }
        }
        Self::from_durations(count, durations)
    }

    /// Statistics over every call of a run
    pub fn from_run(run: &BenchmarkRun) -> Self {
        Self::from_calls(run.calls())
    }

    /// Statistics for each query position, in suite order
    pub fn per_query(run: &BenchmarkRun) -> Vec<QueryStatistics> {
        let positions = run
            .results
            .iter()
            .map(|r| r.per_query.len())
            .max()
            .unwrap_or(0)
            .max(run.queries.len());

        (0..positions)
            .map(|index| {
                let calls: Vec<&CallResult> = run
                    .calls()
                    .filter(|call| call.query_index == index)
                    .collect();
                let query_name = run
                    .queries
                    .get(index)
                    .map(|q| q.name.clone())
                    .or_else(|| calls.first().map(|c| c.query_name.clone()))
                    .unwrap_or_default();
                QueryStatistics {
                    query_index: index,
                    query_name,
                    errors: calls.iter().filter_map(|c| c.error.clone()).collect(),
                    statistics: Self::from_calls(calls),
                }
            })
            .collect()
    }

    /// `count` attempted calls, `durations` from the successful ones
    fn from_durations(count: usize, mut durations: Vec<f64>) -> Self {
        durations.sort_by(f64::total_cmp);
        let success_count = durations.len();
        let success_rate = if count == 0 {
            0.0
        } else {
            round_currency(success_count as f64 / count as f64 * 100.0)
        };

        let mean = if durations.is_empty() {
            None
        } else {
            Some(round_currency(
                durations.iter().sum::<f64>() / durations.len() as f64,
            ))
        };
        let at = |p: u32| percentile(&durations, p).map(round_currency);

        Self {
            count,
            success_count,
            success_rate,
            mean,
            min: durations.first().copied().map(round_currency),
            max: durations.last().copied().map(round_currency),
            p50: at(PERCENTILES[0]),
            p90: at(PERCENTILES[1]),
            p95: at(PERCENTILES[2]),
            p99: at(PERCENTILES[3]),
        }
    }
}

/// Statistics of one query across all iterations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStatistics {
    pub query_index: usize,
    pub query_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub statistics: Statistics,
}

/// Report handed back to benchmark callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    pub run_id: RunId,
    pub iterations: u32,
    pub concurrency: usize,
    pub total_duration_ms: f64,
    pub overall: Statistics,
    pub per_query: Vec<QueryStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<BenchmarkRun>,
}

impl BenchmarkReport {
    /// Summarizes a run; `include_calls` keeps the raw per-call records
    pub fn from_run(run: BenchmarkRun, include_calls: bool) -> Self {
        let overall = Statistics::from_run(&run);
        let per_query = Statistics::per_query(&run);
        Self {
            run_id: run.run_id.clone(),
            iterations: run.iterations,
            concurrency: run.concurrency,
            total_duration_ms: round_currency(run.total_duration_ms),
            overall,
            per_query,
            run: include_calls.then_some(run),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Human readable report
    pub fn summary(&self) -> String {
        let mut s = "Benchmark Report\n".to_string();
        s.push_str("================\n");
        s.push_str(&format!("Run: {}\n", self.run_id));
        s.push_str(&format!(
            "Iterations: {} (concurrency {})\n",
            self.iterations, self.concurrency
        ));
        s.push_str(&format!("Total Time: {:.2}ms\n\n", self.total_duration_ms));
        push_block(&mut s, "Overall", &self.overall);

        for query in &self.per_query {
            push_block(&mut s, &query.query_name, &query.statistics);
        }
        s
    }
}

fn push_block(s: &mut String, title: &str, stats: &Statistics) {
    let ms = |value: Option<f64>| match value {
        Some(v) => format!("{:.2}ms", v),
        None => "n/a".to_string(),
    };
    s.push_str(&format!("{}\n", title));
    s.push_str(&format!(
        "  Calls: {} ({} ok, {:.2}%)\n",
        stats.count, stats.success_count, stats.success_rate
    ));
    s.push_str(&format!("  Mean: {}\n", ms(stats.mean)));
    s.push_str(&format!("  Min: {}\n", ms(stats.min)));
    s.push_str(&format!("  Max: {}\n", ms(stats.max)));
    s.push_str(&format!("  P50: {}\n", ms(stats.p50)));
    s.push_str(&format!("  P90: {}\n", ms(stats.p90)));
    s.push_str(&format!("  P95: {}\n", ms(stats.p95)));
    s.push_str(&format!("  P99: {}\n\n", ms(stats.p99)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::harness::IterationResult;
    use chrono::Utc;
    use rand::seq::SliceRandom;

    fn ok(index: usize, ms: f64) -> CallResult {
        CallResult::succeeded(index, &format!("q{}", index), ms, 1, 1)
    }

    fn failed(index: usize) -> CallResult {
        CallResult::failed(index, &format!("q{}", index), 3.0, "boom".to_string())
    }

    fn run_of(results: Vec<Vec<CallResult>>) -> BenchmarkRun {
        BenchmarkRun {
            run_id: RunId::new(),
            queries: Vec::new(),
            iterations: results.len() as u32,
            concurrency: 1,
            started_at: Utc::now(),
            total_duration_ms: 0.0,
            results: results
                .into_iter()
                .enumerate()
                .map(|(i, per_query)| IterationResult {
                    iteration: i as u32 + 1,
                    per_query,
                })
                .collect(),
        }
    }

    #[test]
    fn test_nearest_rank_percentiles() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile(&sorted, 50), Some(5.0));
        assert_eq!(percentile(&sorted, 90), Some(9.0));
        assert_eq!(percentile(&sorted, 95), Some(10.0));
        assert_eq!(percentile(&sorted, 99), Some(10.0));
        assert_eq!(percentile(&sorted, 0), Some(1.0));
        assert_eq!(percentile(&[7.0], 50), Some(7.0));
        assert_eq!(percentile(&[], 50), None);
    }

    #[test]
    fn test_two_thirds_success_rate() {
        let iteration = || vec![ok(0, 10.0), failed(1), ok(2, 20.0)];
        let run = run_of(vec![iteration(), iteration()]);

        let stats = Statistics::from_run(&run);
        assert_eq!(stats.count, 6);
        assert_eq!(stats.success_count, 4);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(stats.mean, Some(15.0));
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(20.0));

        let per_query = Statistics::per_query(&run);
        assert_eq!(per_query.len(), 3);
        assert_eq!(per_query[1].statistics.success_rate, 0.0);
        assert_eq!(per_query[1].errors, vec!["boom", "boom"]);
        assert_eq!(per_query[0].statistics.success_rate, 100.0);
    }

    #[test]
    fn test_all_failing_run() {
        let run = run_of(vec![vec![failed(0), failed(1)], vec![failed(0), failed(1)]]);
        let stats = Statistics::from_run(&run);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.mean.is_none());
        assert!(stats.min.is_none());
        assert!(stats.p99.is_none());

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["mean"].is_null());
    }

    #[test]
    fn test_empty_run() {
        let stats = Statistics::from_calls(std::iter::empty());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_shuffle_invariance() {
        let mut calls: Vec<CallResult> = (0..200)
            .map(|i| ok(0, f64::from(i % 37) * 1.7 + 0.3))
            .chain((0..20).map(|_| failed(0)))
            .collect();
        let expected = Statistics::from_calls(&calls);

        let mut rng = rand::rng();
        for _ in 0..10 {
            calls.shuffle(&mut rng);
            assert_eq!(Statistics::from_calls(&calls), expected);
        }
    }

    #[test]
    fn test_report_summary() {
        let run = run_of(vec![vec![ok(0, 12.5), failed(1)]]);
        let report = BenchmarkReport::from_run(run, false);

        assert!(report.run.is_none());
        let summary = report.summary();
        assert!(summary.contains("Benchmark Report"));
        assert!(summary.contains("50.00%"));
        assert!(summary.contains("n/a"));

        let json = report.to_json();
        assert_eq!(json["overall"]["successRate"], 50.0);
        assert_eq!(json["perQuery"][1]["errors"][0], "boom");
    }
}
