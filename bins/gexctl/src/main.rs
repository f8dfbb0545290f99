//! gexctl: gamma exposure analytics over options chain snapshots
//!
//! Runs the engine over snapshot files, validates configuration, and
//! writes default configuration files.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use cli::{Cli, Commands};
use config::{
    generate_default_config, load_config, save_config, validate_config, GexConfig,
};
use gex_engine::{ChainRequest, CycleReport, GexEngine, InMemoryBaselineStore, SystemClock};
use observability::{init_logging, init_metrics, CycleMetrics, CycleOutcome, CycleTimer, LogFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Analyze reads its config before logging starts so `logging.format` applies
    let config = match &cli.command {
        Commands::Analyze {
            config: Some(path), ..
        } => Some(load_config(path)?),
        _ => None,
    };

    let format = resolve_log_format(cli.log_format.map(|f| f.as_str()), config.as_ref());
    init_logging("gexctl", format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Analyze {
            snapshots,
            as_of,
            expiration,
            pretty,
            ..
        } => {
            info!(snapshots = snapshots.len(), "Executing 'analyze' command");
            analyze_command(config.unwrap_or_default(), snapshots, as_of, expiration, pretty).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
    }
}

/// CLI flag first, then `logging.format`, then pretty
fn resolve_log_format(flag: Option<&str>, config: Option<&GexConfig>) -> LogFormat {
    flag.or_else(|| config.map(|c| c.logging.format.as_str()))
        .and_then(LogFormat::parse)
        .unwrap_or_default()
}

fn ensure_valid(config: &GexConfig) -> Result<()> {
    let report = validate_config(config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot run the engine due to configuration errors");
    }
    Ok(())
}

async fn analyze_command(
    config: GexConfig,
    snapshots: Vec<PathBuf>,
    as_of: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
    pretty: bool,
) -> Result<()> {
    ensure_valid(&config)?;

    if let Some(metrics) = config.metrics.as_ref().filter(|m| m.enabled) {
        init_metrics(metrics.port)?;
    }

    let engine = GexEngine::from_config(
        &config,
        Arc::new(InMemoryBaselineStore::new()),
        Arc::new(SystemClock::new()),
    )
    .context("Failed to build engine")?;

    let reports = run_snapshots(
        Arc::new(engine),
        CycleMetrics::new("gexctl"),
        snapshots,
        as_of,
        expiration,
    )
    .await?;

    let output = match reports.as_slice() {
        [single] => render(single, pretty)?,
        _ => render(&reports, pretty)?,
    };
    println!("{}", output);

    Ok(())
}

fn render<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

/// Analyze every snapshot on the blocking pool, returning reports in input order.
///
/// Fails if any snapshot fails, after logging each failure.
async fn run_snapshots(
    engine: Arc<GexEngine>,
    metrics: CycleMetrics,
    snapshots: Vec<PathBuf>,
    as_of: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
) -> Result<Vec<CycleReport>> {
    let mut tasks = JoinSet::new();

    for (index, path) in snapshots.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        let metrics = metrics.clone();
        tasks.spawn_blocking(move || {
            let report = analyze_snapshot(&engine, &metrics, &path, as_of, expiration)
                .with_context(|| format!("Failed to analyze snapshot {:?}", path));
            (index, report)
        });
    }

    let mut reports = Vec::new();
    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.context("Analysis task panicked")?;
        match outcome {
            Ok(report) => reports.push((index, report)),
            Err(e) => {
                error!(error = %format!("{:#}", e), "Snapshot failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} snapshot(s) could not be analyzed", failures);
    }

    reports.sort_by_key(|(index, _)| *index);
    Ok(reports.into_iter().map(|(_, report)| report).collect())
}

fn analyze_snapshot(
    engine: &GexEngine,
    metrics: &CycleMetrics,
    path: &Path,
    as_of: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
) -> Result<CycleReport> {
    let request = read_snapshot(path, as_of, expiration)?;

    let mut timer = CycleTimer::new(metrics);
    let report = engine.run_cycle(&request)?;

    metrics.record_dropped(report.stats.dropped());
    metrics.set_walls(report.walls.len());
    if let Some(signal) = &report.signal {
        metrics.record_signal(signal.classification.as_str());
    }
    timer.set_outcome(if report.profile.is_some() {
        CycleOutcome::Completed
    } else {
        CycleOutcome::Unresolved
    });

    Ok(report)
}

/// Load a snapshot file; CLI dates override the file's
fn read_snapshot(
    path: &Path,
    as_of: Option<NaiveDate>,
    expiration: Option<NaiveDate>,
) -> Result<ChainRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    let mut request: ChainRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;

    if as_of.is_some() {
        request.as_of = as_of;
    }
    if expiration.is_some() {
        request.expiration = expiration;
    }

    debug!(
        symbol = %request.symbol,
        records = request.records.len(),
        "Loaded snapshot"
    );
    Ok(request)
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Exposure convention: {}", config.engine.exposure_convention.as_str());
    println!("Max walls: {}", config.walls.max_walls);
    println!("Baseline window: {}s", config.flow.baseline_window_seconds);
    println!("Threshold tiers: {}", config.flow.thresholds.len());

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to tune walls and flow thresholds");
    println!(
        "  2. Run 'gexctl validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'gexctl analyze --config {:?} <snapshot.json>' to analyze a chain",
        output_path
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gex_engine::{Classification, SignalReason};

    const SNAPSHOT: &str = r#"{
        "symbol": "AAPL",
        "results": [
            {"details": {"strike_price": 100, "contract_type": "call", "expiration_date": "2026-10-23"},
             "greeks": {"gamma": 0.03}, "open_interest": 6000, "implied_volatility": 0.3,
             "underlying_asset": {"price": 100.0}},
            {"details": {"strike_price": 100, "contract_type": "put", "expiration_date": "2026-10-23"},
             "greeks": {"gamma": 0.03}, "open_interest": 4000, "implied_volatility": 0.3,
             "underlying_asset": {"price": 100.0}}
        ]
    }"#;

    fn write_snapshot(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gexctl_{}_{}.json", std::process::id(), name));
        std::fs::write(&path, content).unwrap();
        path
    }

    fn as_of() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 10, 19)
    }

    #[test]
    fn test_resolve_log_format() {
        let mut config = GexConfig::default();
        config.logging.format = "json".to_string();

        assert_eq!(resolve_log_format(Some("compact"), Some(&config)), LogFormat::Compact);
        assert_eq!(resolve_log_format(None, Some(&config)), LogFormat::Json);
        assert_eq!(resolve_log_format(None, None), LogFormat::Pretty);
    }

    #[test]
    fn test_read_snapshot_applies_overrides() {
        let path = write_snapshot("overrides", SNAPSHOT);
        let expiration = NaiveDate::from_ymd_opt(2026, 10, 30);

        let request = read_snapshot(&path, as_of(), expiration).unwrap();

        assert_eq!(request.symbol, "AAPL");
        assert_eq!(request.records.len(), 2);
        assert_eq!(request.as_of, as_of());
        assert_eq!(request.expiration, expiration);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_run_snapshots_keeps_input_order() {
        let aapl = write_snapshot("aapl", SNAPSHOT);
        let spy = write_snapshot("spy", &SNAPSHOT.replace("AAPL", "SPY"));
        let engine = Arc::new(GexEngine::with_defaults());

        let reports = run_snapshots(
            Arc::clone(&engine),
            CycleMetrics::new("test"),
            vec![aapl.clone(), spy.clone()],
            as_of(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].symbol, "AAPL");
        assert_eq!(reports[1].symbol, "SPY");
        let signal = reports[0].signal.unwrap();
        assert_eq!(signal.reason, SignalReason::NoBaseline);
        assert_eq!(signal.classification, Classification::Neutral);
        assert_eq!(engine.baselines().len(), 2);

        std::fs::remove_file(aapl).ok();
        std::fs::remove_file(spy).ok();
    }

    #[tokio::test]
    async fn test_run_snapshots_reports_failures() {
        let bad = write_snapshot("bad", "{ not json");

        let result = run_snapshots(
            Arc::new(GexEngine::with_defaults()),
            CycleMetrics::new("test"),
            vec![bad.clone(), PathBuf::from("/nonexistent/gexctl.json")],
            None,
            None,
        )
        .await;

        assert!(result.is_err());
        std::fs::remove_file(bad).ok();
    }
}
