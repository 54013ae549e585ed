//! Configuration for a resolution session.
//!
//! Values come from defaults, the environment (with optional `.env` support)
//! or explicit overrides, in increasing order of precedence.

use std::env;
use std::fmt;
use std::num::ParseIntError;
use std::time::Duration;

use dotenvy::dotenv;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, Serializer};
use serde::{Deserialize as DeriveDeserialize, Serialize as DeriveSerialize};
use thiserror::Error;

use crate::logging::LogCallback;

/// Production classification service.
pub const DEFAULT_SERVER_URL: &str = "https://sdk.test.ai";

/// Development service; its certificates are not validated.
pub const DEV_SERVER_URL: &str = "https://sdk.dev.test.ai";

/// Environment variable that overrides the default server URL.
pub const SERVER_URL_ENV: &str = "TESTAI_FLUFFY_DRAGON_URL";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Verbosity level for resolver logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Minimal,
    #[default]
    Medium,
    Detailed,
}

impl Verbosity {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Verbosity::Minimal => 0,
            Verbosity::Medium => 1,
            Verbosity::Detailed => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Verbosity::Minimal),
            1 => Some(Verbosity::Medium),
            2 => Some(Verbosity::Detailed),
            _ => None,
        }
    }
}

impl Serialize for Verbosity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Verbosity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Verbosity::from_u8(value).ok_or_else(|| {
            DeError::custom(format!(
                "invalid verbosity value {value}; expected 0, 1, or 2"
            ))
        })
    }
}

#[derive(DeriveSerialize, DeriveDeserialize, Clone)]
#[serde(default)]
pub struct TestAiConfig {
    #[serde(alias = "apiKey")]
    pub api_key: Option<String>,
    #[serde(alias = "serverUrl")]
    pub server_url: String,
    /// Setting a test case name switches the session into test-authoring mode.
    #[serde(alias = "testCaseName")]
    pub test_case_name: Option<String>,
    pub train: bool,
    #[serde(alias = "httpTimeoutSecs")]
    pub http_timeout_secs: u64,
    pub verbose: Verbosity,
    #[serde(skip_serializing, skip_deserializing)]
    pub logger: Option<LogCallback>,
}

impl Default for TestAiConfig {
    fn default() -> Self {
        let server_url = env_var(SERVER_URL_ENV).unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        TestAiConfig {
            api_key: None,
            server_url,
            test_case_name: None,
            train: true,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            verbose: Verbosity::default(),
            logger: None,
        }
    }
}

impl TestAiConfig {
    /// Build a configuration from environment variables, after loading a
    /// `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv();
        let mut config = TestAiConfig::default();

        if let Some(value) = env_var("TESTAI_API_KEY") {
            config.api_key = Some(value);
        }

        if let Some(value) = env_var(SERVER_URL_ENV) {
            config.server_url = value;
        }

        if let Some(value) = env_var("TESTAI_TEST_CASE_NAME") {
            config.test_case_name = Some(value);
        }

        if let Some(value) = env_var("TESTAI_TRAIN") {
            config.train = parse_bool("TESTAI_TRAIN", &value)?;
        }

        if let Some(value) = env_var("TESTAI_HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = parse_u64("TESTAI_HTTP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = env_var("TESTAI_VERBOSE") {
            let parsed = parse_u64("TESTAI_VERBOSE", &value)?;
            config.verbose = u8::try_from(parsed)
                .ok()
                .and_then(Verbosity::from_u8)
                .ok_or(ConfigError::InvalidEnumVariant {
                    field: "TESTAI_VERBOSE",
                    value,
                })?;
        }

        Ok(config)
    }

    /// Create a new configuration with explicit field overrides applied.
    pub fn with_overrides(&self, overrides: TestAiConfigOverrides) -> TestAiConfig {
        let mut next = self.clone();

        if let Some(value) = overrides.api_key {
            next.api_key = value;
        }
        if let Some(value) = overrides.server_url {
            next.server_url = value;
        }
        if let Some(value) = overrides.test_case_name {
            next.test_case_name = value;
        }
        if let Some(value) = overrides.train {
            next.train = value;
        }
        if let Some(value) = overrides.http_timeout_secs {
            next.http_timeout_secs = value;
        }
        if let Some(value) = overrides.verbose {
            next.verbose = value;
        }
        if let Some(value) = overrides.logger {
            next.logger = value;
        }

        next
    }

    /// Base URL without a trailing slash.
    pub fn server_url(&self) -> &str {
        self.server_url.trim().trim_end_matches('/')
    }

    /// Whether certificate validation is relaxed for this server.
    pub fn is_insecure(&self) -> bool {
        self.server_url() == DEV_SERVER_URL
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

/// Field-level overrides for [`TestAiConfig::with_overrides`].
#[derive(Default, Clone)]
pub struct TestAiConfigOverrides {
    pub api_key: Option<Option<String>>,
    pub server_url: Option<String>,
    pub test_case_name: Option<Option<String>>,
    pub train: Option<bool>,
    pub http_timeout_secs: Option<u64>,
    pub verbose: Option<Verbosity>,
    pub logger: Option<Option<LogCallback>>,
}

impl TestAiConfigOverrides {
    pub fn api_key<T: Into<Option<String>>>(mut self, api_key: T) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }
}

impl fmt::Debug for TestAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("server_url", &self.server_url)
            .field("test_case_name", &self.test_case_name)
            .field("train", &self.train)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("verbose", &self.verbose)
            .field("logger_present", &self.logger.is_some())
            .finish()
    }
}

impl fmt::Debug for TestAiConfigOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestAiConfigOverrides")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|inner| inner.is_some()),
            )
            .field("server_url", &self.server_url)
            .field("test_case_name", &self.test_case_name)
            .field("train", &self.train)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("verbose", &self.verbose)
            .field("logger", &self.logger.as_ref().map(|inner| inner.is_some()))
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key; set TESTAI_API_KEY or pass one explicitly")]
    MissingApiKey,
    #[error("invalid value '{value}' for {field}")]
    InvalidEnumVariant { field: &'static str, value: String },
    #[error("invalid boolean '{value}' for {field}")]
    InvalidBool { field: &'static str, value: String },
    #[error("invalid number '{value}' for {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field,
            value: value.to_string(),
        }),
    }
}

fn parse_u64(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| ConfigError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}
