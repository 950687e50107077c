//! Monitor orchestration -- configuration, assembly and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `ctwatch-daemon`.
//! It loads configuration and rules, builds the CT log manager with an
//! HTTP transport and a JSON-lines sink on stdout, and drives the
//! manager through discovery, startup, the main loop and shutdown.
//!
//! # Lifecycle
//!
//! 1. Discover eligible CT logs (fatal if the log list cannot be fetched)
//! 2. Start one poll loop per log plus the filter worker pool
//! 3. Wait for SIGTERM/SIGINT or the optional run duration, logging
//!    health periodically
//! 4. Stop: cancel poll loops, drain and join workers, close the queue

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use ctwatch_core::config::CtwatchConfig;
use ctwatch_core::error::{ConfigError, CtwatchError};
use ctwatch_core::pipeline::Pipeline;
use ctwatch_monitor::{
    CtLogsManager, CtMonitorBuilder, HttpClientFactory, HttpLogListSource, JsonLinesSink,
    MonitorConfig, RulePack,
};

use crate::health::{DaemonHealth, log_health};
use crate::metrics_server;

/// Interval between periodic health reports in the main loop.
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Load `ctwatch.toml`, falling back to built-in defaults when the file is missing.
///
/// Environment overrides are applied in both cases and the result is validated.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed,
/// or if the resulting configuration is invalid.
pub async fn load_config(path: &Path) -> Result<CtwatchConfig> {
    match CtwatchConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(CtwatchError::Config(ConfigError::FileNotFound { path })) => {
            tracing::info!(path = %path, "config file not found, using defaults");
            let mut config = CtwatchConfig::default();
            config.apply_env_overrides();
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
            Ok(config)
        }
        Err(e) => Err(anyhow::anyhow!("failed to load config: {}", e)),
    }
}

/// Apply command-line overrides on top of file and environment values,
/// then validate the result again.
///
/// # Errors
///
/// Returns an error if an override produces an invalid configuration
/// (for example an unknown log level), before logging is initialised.
pub fn apply_cli_overrides(
    config: &mut CtwatchConfig,
    log_level: Option<String>,
    log_format: Option<String>,
    log_list_url: Option<String>,
) -> Result<()> {
    if let Some(level) = log_level {
        config.general.log_level = level;
    }
    if let Some(format) = log_format {
        config.general.log_format = format;
    }
    if let Some(url) = log_list_url {
        config.monitor.log_list_url = url;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid command-line override: {}", e))
}

/// Load and compile the rule file.
///
/// # Errors
///
/// Returns an error if the file is missing, is not a JSON object of
/// strings, defines no categories, or contains an invalid pattern.
pub async fn load_rules(path: &Path) -> Result<RulePack> {
    RulePack::load_json_file(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))
}

/// Validate configuration and rules without starting the monitor.
///
/// Returns the number of rule categories on success.
///
/// # Errors
///
/// Returns the first configuration or rule problem found.
pub async fn validate(config: &CtwatchConfig, rules_path: &Path) -> Result<usize> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    MonitorConfig::from_core(&config.monitor)
        .validate()
        .map_err(|e| anyhow::anyhow!("monitor config validation failed: {}", e))?;
    let rules = load_rules(rules_path).await?;
    Ok(rules.len())
}

/// The main daemon orchestrator.
///
/// Owns the CT log manager for the whole process lifetime.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: CtwatchConfig,
    /// CT log manager wired to HTTP transport and stdout sink.
    manager: CtLogsManager<HttpLogListSource, HttpClientFactory>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Build from an already-loaded configuration and rule pack.
    ///
    /// Installs the Prometheus recorder first when metrics are enabled,
    /// so that discovery counters are already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The metrics recorder cannot be installed
    /// - The log list URL is invalid or the manager cannot be built
    pub async fn build_from_config(config: CtwatchConfig, rules: RulePack) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
            record_daemon_metrics(rules.len());
        }

        let rule_count = rules.len();
        let (manager, _) = CtMonitorBuilder::new()
            .config(MonitorConfig::from_core(&config.monitor))
            .rules(rules)
            .sink(JsonLinesSink::stdout())
            .with_http_transport()
            .map_err(|e| anyhow::anyhow!("failed to configure transport: {}", e))?
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build CT monitor: {}", e))?;

        tracing::info!(
            rules = rule_count,
            log_list_url = %config.monitor.log_list_url,
            workers = config.monitor.workers,
            "orchestrator initialized"
        );

        Ok(Self {
            config,
            manager,
            start_time: Instant::now(),
        })
    }

    /// Discover logs, start monitoring and run until shutdown.
    ///
    /// # Shutdown Triggers
    ///
    /// - `SIGTERM` (from systemd, Docker, or `kill`)
    /// - `SIGINT` (Ctrl+C)
    /// - `duration` elapsed, when given
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or startup fails, or if signal
    /// handlers cannot be installed. The manager is stopped in every
    /// case once it has been started.
    pub async fn run(&mut self, duration: Option<Duration>) -> Result<()> {
        let sources = self
            .manager
            .discover()
            .await
            .map_err(|e| anyhow::anyhow!("log discovery failed: {}", e))?;
        if sources == 0 {
            tracing::warn!("no usable CT logs discovered; nothing will be polled");
        }

        self.manager
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start CT monitor: {}", e))?;

        let result = self.main_loop(shutdown_signal(duration)).await;

        self.shutdown().await?;
        result
    }

    /// Main loop: periodic health reports until `shutdown` resolves.
    async fn main_loop<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = Result<&'static str>>,
    {
        let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        // First tick completes immediately; skip it so the first report
        // reflects at least one polling round.
        ticker.tick().await;
        let mut previous: Option<DaemonHealth> = None;

        tokio::pin!(shutdown);
        tracing::info!("entering main event loop");
        loop {
            tokio::select! {
                reason = &mut shutdown => {
                    let reason = reason?;
                    tracing::info!(reason = reason, "shutdown requested");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let health = self.health().await;
                    log_health(&health, previous.as_ref());
                    previous = Some(health);
                }
            }
        }
    }

    /// Stop the manager and log the final counters.
    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping CT monitor");
        self.manager
            .stop()
            .await
            .map_err(|e| anyhow::anyhow!("failed to stop CT monitor: {}", e))?;

        let stats = self.manager.stats();
        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            polls = stats.polls,
            entries_fetched = stats.entries_fetched,
            entries_dropped = stats.entries_dropped,
            matches = stats.matches,
            "CT monitor stopped"
        );
        Ok(())
    }

    /// Get the current health report.
    pub async fn health(&self) -> DaemonHealth {
        DaemonHealth {
            status: self.manager.health_check().await,
            uptime_secs: self.start_time.elapsed().as_secs(),
            sources: self.manager.source_count(),
            queue_depth: self.manager.queue().len(),
            stats: self.manager.stats(),
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &CtwatchConfig {
        &self.config
    }
}

/// Resolve when the daemon should stop: a signal or the optional run duration.
async fn shutdown_signal(duration: Option<Duration>) -> Result<&'static str> {
    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        signal = wait_for_shutdown_signal() => signal,
        () = deadline => Ok("duration elapsed"),
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record daemon-level gauges.
#[allow(clippy::cast_precision_loss)]
fn record_daemon_metrics(rule_count: usize) {
    use ctwatch_core::metrics as m;
    metrics::gauge!(m::DAEMON_RULES_LOADED).set(rule_count as f64);
}
