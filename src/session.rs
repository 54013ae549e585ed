//! Per-session context shared by every lookup.
//!
//! A [`Session`] is assembled once, when the browser is already on a page,
//! and never changes afterwards: the run id groups training signals and the
//! density multiplier is measured a single time.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::{ClassifierApi, ClassifierError, HttpClassifier};
use crate::config::{ConfigError, TestAiConfig};
use crate::driver::{DriverError, PageDriver};
use crate::geometry::{DensityMultiplier, GeometryError, png_width};
use crate::logging::{LogConfig, TestAiLogger};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to measure the page: {0}")]
    Driver(#[from] DriverError),
    #[error("screenshot is not valid base64: {0}")]
    Screenshot(#[from] base64::DecodeError),
    #[error("invalid density multiplier: {0}")]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// How classification requests are handled for this session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Automatic,
    /// Test-authoring mode. Classification is not available.
    Interactive { test_case_name: String },
}

pub struct Session {
    api_key: String,
    run_id: String,
    server_url: String,
    multiplier: DensityMultiplier,
    mode: SessionMode,
    train: bool,
    classifier: Arc<dyn ClassifierApi>,
    logger: Arc<TestAiLogger>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_key", &"<redacted>")
            .field("run_id", &self.run_id)
            .field("server_url", &self.server_url)
            .field("multiplier", &self.multiplier)
            .field("mode", &self.mode)
            .field("train", &self.train)
            .finish()
    }
}

impl Session {
    /// Session with a fresh run id, automatic mode and training enabled.
    pub fn new(
        api_key: impl Into<String>,
        server_url: impl Into<String>,
        multiplier: DensityMultiplier,
        classifier: Arc<dyn ClassifierApi>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            run_id: Uuid::new_v4().to_string(),
            server_url: server_url.into().trim().trim_end_matches('/').to_string(),
            multiplier,
            mode: SessionMode::Automatic,
            train: true,
            classifier,
            logger: Arc::new(TestAiLogger::default()),
        }
    }

    /// Measure the page and connect to the configured classification server.
    pub async fn start<D: PageDriver>(
        config: &TestAiConfig,
        driver: &D,
    ) -> Result<Self, SessionError> {
        let api_key = config.require_api_key()?.to_string();
        let classifier = HttpClassifier::from_config(config)?;

        let logger = Arc::new(TestAiLogger::with_config(LogConfig {
            verbose: config.verbose,
            external_logger: config.logger.clone(),
        }));

        let multiplier = measure_multiplier(driver).await?;
        logger.debug(
            format!("The screen multiplier is {}", multiplier.value()),
            Some("session"),
            None,
        );

        let mode = match config.test_case_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => SessionMode::Interactive {
                test_case_name: name.to_string(),
            },
            _ => SessionMode::Automatic,
        };

        Ok(Self::new(api_key, config.server_url(), multiplier, Arc::new(classifier))
            .with_mode(mode)
            .with_train(config.train)
            .with_logger(logger))
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_train(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_logger(mut self, logger: Arc<TestAiLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn multiplier(&self) -> DensityMultiplier {
        self.multiplier
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn train(&self) -> bool {
        self.train
    }

    pub fn classifier(&self) -> &dyn ClassifierApi {
        self.classifier.as_ref()
    }

    pub fn logger(&self) -> &TestAiLogger {
        &self.logger
    }

    /// Page where an element can be labeled by hand.
    pub fn labeling_url(&self, element_name: &str) -> String {
        format!("{}/label/{}", self.server_url, element_name)
    }
}

/// Screenshot pixel width divided by the logical viewport width.
pub async fn measure_multiplier<D: PageDriver>(
    driver: &D,
) -> Result<DensityMultiplier, SessionError> {
    let encoded = driver.screenshot_base64().await?;
    let bytes = STANDARD.decode(encoded.trim())?;
    let width = png_width(&bytes)?;
    let viewport = driver.viewport_width().await?;
    Ok(DensityMultiplier::from_widths(width, viewport)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{CandidateElement, Locator};
    use crate::geometry::BoundingBox;
    use crate::types::{ClassificationResult, ClassifyRequest, TrainingReport};
    use async_trait::async_trait;
    use serde_json::Value;

    struct Unused;

    #[async_trait]
    impl CandidateElement for Unused {
        async fn rect(&self) -> Result<BoundingBox, DriverError> {
            Ok(BoundingBox::default())
        }

        async fn tag_role(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }
    }

    struct FixedPage {
        png_width: u32,
        viewport: f64,
    }

    fn png_header(width: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0, 0, 0, 13]);
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&600u32.to_be_bytes());
        bytes
    }

    #[async_trait]
    impl PageDriver for FixedPage {
        type Element = Unused;

        async fn find_element(&self, locator: &Locator) -> Result<Unused, DriverError> {
            Err(DriverError::NotFound(locator.to_string()))
        }

        async fn find_all_elements(&self) -> Result<Vec<Unused>, DriverError> {
            Ok(Vec::new())
        }

        async fn screenshot_base64(&self) -> Result<String, DriverError> {
            Ok(STANDARD.encode(png_header(self.png_width)))
        }

        async fn page_source(&self) -> Result<String, DriverError> {
            Ok(String::new())
        }

        async fn viewport_width(&self) -> Result<f64, DriverError> {
            Ok(self.viewport)
        }

        async fn execute_script(&self, _script: &str) -> Result<Value, DriverError> {
            Ok(Value::Null)
        }
    }

    struct NullClassifier;

    #[async_trait]
    impl ClassifierApi for NullClassifier {
        async fn classify(
            &self,
            _request: &ClassifyRequest,
        ) -> Result<ClassificationResult, ClassifierError> {
            Ok(ClassificationResult::Failure {
                key: None,
                raw_message: None,
                raw: Value::Null,
            })
        }

        async fn add_action(&self, _report: &TrainingReport) -> Result<(), ClassifierError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn multiplier_is_screenshot_over_viewport() {
        let page = FixedPage {
            png_width: 2560,
            viewport: 1280.0,
        };
        let multiplier = measure_multiplier(&page).await.unwrap();
        assert!((multiplier.value() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn zero_viewport_is_rejected() {
        let page = FixedPage {
            png_width: 1280,
            viewport: 0.0,
        };
        assert!(matches!(
            measure_multiplier(&page).await,
            Err(SessionError::Geometry(GeometryError::InvalidViewport(_)))
        ));
    }

    #[tokio::test]
    async fn start_requires_an_api_key() {
        let page = FixedPage {
            png_width: 1280,
            viewport: 1280.0,
        };
        let config = TestAiConfig {
            api_key: None,
            ..TestAiConfig::default()
        };
        assert!(matches!(
            Session::start(&config, &page).await,
            Err(SessionError::Config(ConfigError::MissingApiKey))
        ));
    }

    #[tokio::test]
    async fn start_selects_interactive_mode_from_test_case() {
        let page = FixedPage {
            png_width: 1280,
            viewport: 1280.0,
        };
        let config = TestAiConfig {
            api_key: Some("key".into()),
            server_url: "http://127.0.0.1:9/".into(),
            test_case_name: Some("checkout".into()),
            ..TestAiConfig::default()
        };
        let session = Session::start(&config, &page).await.unwrap();
        assert_eq!(
            session.mode(),
            &SessionMode::Interactive {
                test_case_name: "checkout".into()
            }
        );
        assert_eq!(session.server_url(), "http://127.0.0.1:9");
        assert_eq!(session.multiplier().value(), 1.0);
    }

    #[test]
    fn run_ids_are_unique_and_labeling_url_uses_server() {
        let a = Session::new("k", "https://sdk.test.ai/", DensityMultiplier::default(), Arc::new(NullClassifier));
        let b = Session::new("k", "https://sdk.test.ai", DensityMultiplier::default(), Arc::new(NullClassifier));
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.labeling_url("login_button"), "https://sdk.test.ai/label/login_button");
    }
}
