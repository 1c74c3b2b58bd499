//! Benchmark and load-test harness

pub mod clock;
pub mod harness;
pub mod scenarios;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use harness::{
    BenchmarkHarness, BenchmarkOptions, BenchmarkQuery, BenchmarkRun, CallResult,
    IterationResult, TIMED_OUT,
};
pub use scenarios::{compile_scripts, default_suite, TestScript};
pub use stats::{percentile, BenchmarkReport, QueryStatistics, Statistics};
