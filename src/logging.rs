//! Structured logging for element resolution.
//!
//! Records carry a category (`resolve`, `classify`, `match`, `training`, ...)
//! and an optional JSON payload. They go to an external callback when one is
//! configured, otherwise to the `log` facade so binaries can pick any backend.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Verbosity;

/// Convenience alias for external logging callbacks.
pub type LogCallback = Arc<dyn Fn(&LogRecord) + Send + Sync + 'static>;

#[derive(Clone)]
pub struct LogConfig {
    pub verbose: Verbosity,
    pub external_logger: Option<LogCallback>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            verbose: Verbosity::Medium,
            external_logger: None,
        }
    }
}

impl LogConfig {
    pub fn new(verbose: Verbosity) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    /// Errors and warnings always pass; info needs `Medium`, debug `Detailed`.
    pub fn should_log(&self, level: LogLevel) -> bool {
        level.threshold() <= self.verbose.as_u8()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn threshold(self) -> u8 {
        match self {
            LogLevel::Error | LogLevel::Warn => 0,
            LogLevel::Info => 1,
            LogLevel::Debug => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

/// Structured log entry shared with external callbacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<Value>,
}

impl LogRecord {
    pub fn new(
        message: impl Into<String>,
        level: LogLevel,
        category: Option<String>,
        auxiliary: Option<Value>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            level,
            category,
            auxiliary,
        }
    }
}

/// Forward a record to the `log` facade under the `testai` target.
pub fn default_log_handler(record: &LogRecord) {
    let level = record.level.as_log_level();
    let category = record.category.as_deref().unwrap_or("general");
    match record.auxiliary.as_ref().filter(|aux| !aux.is_null()) {
        Some(aux) => log::log!(target: "testai", level, "[{category}] {} {aux}", record.message),
        None => log::log!(target: "testai", level, "[{category}] {}", record.message),
    }
}

pub struct TestAiLogger {
    config: LogConfig,
    default_handler: LogCallback,
}

impl fmt::Debug for TestAiLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAiLogger")
            .field("verbosity", &self.config.verbose)
            .field("external_logger", &self.config.external_logger.is_some())
            .finish()
    }
}

impl Default for TestAiLogger {
    fn default() -> Self {
        Self::with_config(LogConfig::default())
    }
}

impl TestAiLogger {
    pub fn with_config(config: LogConfig) -> Self {
        Self {
            config,
            default_handler: Arc::new(default_log_handler),
        }
    }

    pub fn new(verbose: Verbosity) -> Self {
        Self::with_config(LogConfig::new(verbose))
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    pub fn set_verbose(&mut self, verbose: Verbosity) {
        self.config.verbose = verbose;
    }

    pub fn set_external_logger(&mut self, logger: Option<LogCallback>) {
        self.config.external_logger = logger;
    }

    pub fn log(
        &self,
        message: impl Into<String>,
        level: LogLevel,
        category: Option<&str>,
        auxiliary: Option<Value>,
    ) {
        if !self.config.should_log(level) {
            return;
        }

        let record = LogRecord::new(message, level, category.map(str::to_string), auxiliary);

        match &self.config.external_logger {
            Some(callback) => callback(&record),
            None => (self.default_handler)(&record),
        }
    }

    pub fn error(
        &self,
        message: impl Into<String>,
        category: Option<&str>,
        auxiliary: Option<Value>,
    ) {
        self.log(message, LogLevel::Error, category, auxiliary);
    }

    pub fn warn(&self, message: impl Into<String>, category: Option<&str>, auxiliary: Option<Value>) {
        self.log(message, LogLevel::Warn, category, auxiliary);
    }

    pub fn info(&self, message: impl Into<String>, category: Option<&str>, auxiliary: Option<Value>) {
        self.log(message, LogLevel::Info, category, auxiliary);
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
        category: Option<&str>,
        auxiliary: Option<Value>,
    ) {
        self.log(message, LogLevel::Debug, category, auxiliary);
    }
}
