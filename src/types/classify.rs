use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::{BoundingBox, DensityMultiplier};

/// Form body of `POST /classify`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClassifyRequest {
    /// Base64 encoded PNG.
    pub screenshot: String,
    pub source: String,
    pub api_key: String,
    pub label: String,
    pub run_id: String,
}

/// Element description inside a successful classify response. Coordinates are
/// in screenshot pixels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElementPayload {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: Option<String>,
    pub class: Option<String>,
}

impl ElementPayload {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

/// JSON envelope returned by `POST /classify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifyResponse {
    pub success: bool,
    pub key: Option<String>,
    pub elem: Option<ElementPayload>,
    pub message: Option<String>,
}

/// Outcome of a single classify call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationResult {
    Success {
        key: Option<String>,
        /// Classifier-space box.
        bbox: BoundingBox,
        text: String,
        tag_role: String,
        raw: Value,
    },
    Failure {
        key: Option<String>,
        raw_message: Option<String>,
        raw: Value,
    },
}

impl ClassificationResult {
    /// Interpret a decoded response body. A `success` envelope without an
    /// `elem` payload is reported as a failure carrying the raw body.
    pub fn from_response(response: ClassifyResponse, raw: Value) -> Self {
        match (response.success, response.elem) {
            (true, Some(elem)) => ClassificationResult::Success {
                key: response.key,
                bbox: elem.bbox(),
                text: elem.text.unwrap_or_default(),
                tag_role: elem.class.unwrap_or_default(),
                raw,
            },
            _ => ClassificationResult::Failure {
                key: response.key,
                raw_message: response.message,
                raw,
            },
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            ClassificationResult::Success { key, .. } | ClassificationResult::Failure { key, .. } => {
                key.as_deref()
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ClassificationResult::Success { .. })
    }
}

/// Form body of `POST /add_action`. Geometry is the resolved element's logical
/// rectangle rounded to whole pixels.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingReport {
    pub key: String,
    pub api_key: String,
    pub run_id: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub multiplier: f64,
    pub train_if_necessary: bool,
}

impl TrainingReport {
    pub fn new(
        key: Option<&str>,
        api_key: &str,
        run_id: &str,
        rect: &BoundingBox,
        multiplier: DensityMultiplier,
        train_if_necessary: bool,
    ) -> Self {
        Self {
            key: key.unwrap_or_default().to_string(),
            api_key: api_key.to_string(),
            run_id: run_id.to_string(),
            x: rect.x.round() as i64,
            y: rect.y.round() as i64,
            width: rect.width.round() as i64,
            height: rect.height.round() as i64,
            multiplier: multiplier.value(),
            train_if_necessary,
        }
    }
}
