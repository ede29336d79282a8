//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - Daily rolling file output under the application data directory
//! - Configuration based log level control with per-module filters
//! - Structured JSON logging (optional)
//! - Console and file output support
//!
//! `RUST_LOG` takes precedence over the configured filters when set:
//! ```bash
//! RUST_LOG="debug,sqlx::query=debug" trend-radar --once
//! ```

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Utc;
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::get_app_data_dir;

// Keeps the non-blocking file writers alive for the life of the process
static LOG_GUARDS: Lazy<Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(Vec::new()));

struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"))
    }
}

/// Get the log directory: `<data dir>/trend-radar/logs`, falling back to `./logs`
pub fn get_log_directory() -> PathBuf {
    get_app_data_dir().map_or_else(|_| PathBuf::from("logs"), |dir| dir.join("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Build the env filter; verbose dependency logs are suppressed unless the
/// configured level is TRACE
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for (module, level) in &config.module_filters {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| anyhow!("Invalid log directive for {}: {}", module, e))?;
            filter = filter.add_directive(directive);
        }
    }

    let own = format!("trend_radar={}", config.level)
        .parse()
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;
    Ok(filter.add_directive(own))
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    let log_dir = config.directory.clone().unwrap_or_else(get_log_directory);
    let env_filter = build_env_filter(&config)?;
    let registry = Registry::default().with(env_filter);

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        let file_appender = rolling::daily(&log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(file_appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        Some(writer)
    } else {
        None
    };

    if file_writer.is_none() && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    // Absent layers are no-ops
    let json_file_layer = file_writer.clone().filter(|_| config.json_format).map(|writer| {
        fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_timer(UtcTimeFormatter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
    });
    let plain_file_layer = file_writer.filter(|_| !config.json_format).map(|writer| {
        fmt::Layer::new()
            .with_writer(writer)
            .with_timer(UtcTimeFormatter)
            .with_target(false)
            .with_ansi(false)
    });
    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(UtcTimeFormatter)
            .with_target(false)
    });

    registry
        .with(json_file_layer)
        .with(plain_file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log directory: {:?}", log_dir);
    info!("Log level: {}", config.level);
    info!("JSON format: {}", config.json_format);
    info!("Console output: {}, file output: {}", config.console_output, config.file_output);

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Trend Radar System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("Log directory: {:?}", get_log_directory());
    info!("======================================");
}
