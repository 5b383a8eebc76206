use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::config::LoggingConfig;

const MAX_BUFFERED_LOGS: usize = 1000;

/// Shared logger backing the `log` facade.
///
/// Records always land in an in-memory buffer; with logging enabled they are also
/// appended to a log file.
#[derive(Clone)]
pub struct Logger {
    logs: Arc<Mutex<Vec<String>>>,
    level: log::LevelFilter,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Logger for the given configuration. Nothing is installed until [`Logger::init`].
    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let log_file = if config.enabled {
            match &config.file {
                Some(path) => Some(path.clone()),
                None => Some(Self::get_log_file_path()?),
            }
        } else {
            None
        };

        Ok(Self {
            logs: Arc::new(Mutex::new(Vec::new())),
            level: config.level_filter()?,
            log_file,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.log_file.is_some()
    }

    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Build the fern dispatch feeding the buffer and, when enabled, the log file.
    pub fn dispatch(&self) -> Result<fern::Dispatch> {
        let logs = Arc::clone(&self.logs);
        let mut dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] {:<5} {}: {}",
                    Utc::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(self.level)
            .chain(fern::Output::call(move |record| {
                if let Ok(mut logs) = logs.lock() {
                    if logs.len() >= MAX_BUFFERED_LOGS {
                        logs.remove(0);
                    }
                    logs.push(record.args().to_string());
                }
            }));

        if let Some(path) = &self.log_file {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
            }
            let file =
                fern::log_file(path).with_context(|| format!("Failed to open log file: {}", path.display()))?;
            dispatch = dispatch.chain(file);
        }

        Ok(dispatch)
    }

    /// Install this logger as the global `log` backend.
    pub fn init(&self) -> Result<()> {
        self.dispatch()?
            .apply()
            .context("A global logger is already installed")
    }

    /// Get all buffered logs (newest first)
    pub fn get_logs(&self) -> Vec<String> {
        if let Ok(logs) = self.logs.lock() {
            let mut sorted_logs = logs.clone();
            sorted_logs.reverse();
            sorted_logs
        } else {
            Vec::new()
        }
    }

    /// Clear all buffered logs
    pub fn clear(&self) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.clear();
        }
    }

    /// Default log file location under the platform data directory
    pub fn get_log_file_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
            .map(|dir| dir.join("generic-repository").join("generic-repository.log"))
    }
}

/// Install the logger described by `config` and return it.
pub fn init(config: &LoggingConfig) -> Result<Logger> {
    let logger = Logger::from_config(config)?;
    logger.init()?;
    Ok(logger)
}
