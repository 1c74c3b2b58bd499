//! Catalog Search
//!
//! REST facade over an Elasticsearch-compatible engine for a product catalog,
//! with a built-in query latency benchmark.

use catalog_core::bench::default_suite;
use catalog_core::{
    BenchmarkHarness, BenchmarkOptions, BenchmarkReport, CatalogConfig, CatalogError, Result,
    SystemClock,
};
use catalog_infra::{connect, health_check, init_logger, LoggerConfig};
use catalog_serve::ServerBuilder;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Product catalog search service backed by an Elasticsearch-compatible engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (json, yaml, pretty)
    #[arg(short, long, default_value = "pretty", global = true)]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Server host address
        #[arg(long)]
        host: Option<String>,

        /// Server port
        #[arg(short, long)]
        port: Option<u16>,

        /// Create the product index before serving
        #[arg(long)]
        init_index: bool,
    },

    /// Run the default benchmark suite against the engine
    Bench {
        /// Iterations over the whole suite
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Iterations allowed in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Overall timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Include every individual call in the report
        #[arg(long)]
        calls: bool,
    },

    /// Check that the engine is reachable
    Health,

    /// Create the product index with its mapping if it is missing
    InitIndex,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CatalogConfig::load(cli.config.as_deref())?;

    let mut logger = LoggerConfig::from(&config.logging).with_env_overrides();
    if cli.verbose {
        logger.level = "debug".to_string();
    }
    init_logger(logger)?;

    info!("Starting catalog v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve {
            host,
            port,
            init_index,
        } => handle_serve(config, host, port, init_index).await,
        Commands::Bench {
            iterations,
            concurrency,
            timeout_ms,
            calls,
        } => {
            let options = bench_options(&config, iterations, concurrency, timeout_ms)?;
            handle_bench(&config, options, calls, &cli.output).await
        }
        Commands::Health => handle_health(&config, &cli.output).await,
        Commands::InitIndex => handle_init_index(&config).await,
        Commands::Version => {
            println!("{}", catalog_core::version_info());
            println!("  infra: v{}", catalog_infra::VERSION);
            println!("  serve: v{}", catalog_serve::VERSION);
            Ok(())
        }
    }
}

async fn handle_serve(
    config: CatalogConfig,
    host: Option<String>,
    port: Option<u16>,
    init_index: bool,
) -> Result<()> {
    let engine = connect(&config)?;

    if init_index && engine.ensure_index().await? {
        info!("Created index {}", engine.index());
    }

    let mut builder = ServerBuilder::new(engine).catalog_config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }

    builder.build().start().await
}

/// Benchmark options from configuration defaults and command-line overrides
fn bench_options(
    config: &CatalogConfig,
    iterations: Option<u32>,
    concurrency: Option<usize>,
    timeout_ms: Option<u64>,
) -> Result<BenchmarkOptions> {
    let settings = &config.benchmark;
    let options = BenchmarkOptions {
        iterations: iterations.unwrap_or(settings.iterations),
        concurrency: concurrency.unwrap_or(settings.concurrency),
        overall_timeout: Some(Duration::from_millis(
            timeout_ms.unwrap_or(settings.timeout_ms),
        )),
    };
    options.validate(settings.max_iterations, settings.max_concurrency)?;
    Ok(options)
}

async fn handle_bench(
    config: &CatalogConfig,
    options: BenchmarkOptions,
    include_calls: bool,
    output: &str,
) -> Result<()> {
    let engine = connect(config)?;
    let harness = BenchmarkHarness::new(engine, Arc::new(SystemClock));

    info!(
        "Benchmarking {} iterations with concurrency {}",
        options.iterations, options.concurrency
    );
    let run = harness.run(default_suite(), options).await?;
    let report = BenchmarkReport::from_run(run, include_calls);

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "yaml" => println!("{}", serde_yaml::to_string(&report)?),
        _ => print!("{}", report.summary()),
    }

    Ok(())
}

async fn handle_health(config: &CatalogConfig, output: &str) -> Result<()> {
    let engine = connect(config)?;
    let status = health_check(engine.as_ref()).await;

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&status)?),
        "yaml" => println!("{}", serde_yaml::to_string(&status)?),
        _ => {
            let state = if status.is_healthy() { "healthy" } else { "unreachable" };
            println!("Engine at {}: {}", config.engine.url, state);
            println!("Version: {}", status.version);
        }
    }

    if status.is_healthy() {
        Ok(())
    } else {
        Err(CatalogError::network(format!(
            "search engine at {} is unreachable",
            config.engine.url
        )))
    }
}

async fn handle_init_index(config: &CatalogConfig) -> Result<()> {
    let engine = connect(config)?;

    if engine.ensure_index().await? {
        println!("Created index {}", engine.index());
    } else {
        println!("Index {} already exists", engine.index());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bench_overrides() {
        let cli = Cli::try_parse_from([
            "catalog",
            "--output",
            "json",
            "bench",
            "--iterations",
            "5",
            "--concurrency",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.output, "json");
        match cli.command {
            Commands::Bench {
                iterations,
                concurrency,
                timeout_ms,
                calls,
            } => {
                assert_eq!(iterations, Some(5));
                assert_eq!(concurrency, Some(2));
                assert_eq!(timeout_ms, None);
                assert!(!calls);
            }
            _ => panic!("expected bench command"),
        }
    }

    #[test]
    fn test_parse_serve_with_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["catalog", "serve", "--port", "8080", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Serve {
                port: Some(8080),
                ..
            }
        ));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["catalog"]).is_err());
    }

    #[test]
    fn test_bench_options_use_configured_defaults() {
        let config = CatalogConfig::default();
        let options = bench_options(&config, None, None, None).unwrap();

        assert_eq!(options.iterations, config.benchmark.iterations);
        assert_eq!(options.concurrency, config.benchmark.concurrency);
        assert_eq!(
            options.overall_timeout,
            Some(Duration::from_millis(config.benchmark.timeout_ms))
        );
    }

    #[test]
    fn test_bench_options_enforce_ceilings() {
        let config = CatalogConfig::default();
        let too_many = config.benchmark.max_concurrency + 1;
        assert!(bench_options(&config, None, Some(too_many), None).is_err());
        assert!(bench_options(&config, Some(0), None, None).is_err());
    }
}
