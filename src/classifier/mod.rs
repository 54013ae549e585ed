//! Client side of the remote classification service.
//!
//! Two calls exist: `classify` asks where a named element sits on a
//! screenshot, `add_action` feeds a confirmed element back as a training
//! signal. [`ClassifierApi`] is the seam the resolver depends on so tests can
//! substitute the network.

pub mod error;
pub mod http;

use async_trait::async_trait;

use crate::types::{ClassificationResult, ClassifyRequest, TrainingReport};

pub use error::ClassifierError;
pub use http::HttpClassifier;

#[async_trait]
pub trait ClassifierApi: Send + Sync {
    async fn classify(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassificationResult, ClassifierError>;

    async fn add_action(&self, report: &TrainingReport) -> Result<(), ClassifierError>;
}
