use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::TestAiConfig;
use crate::types::{ClassificationResult, ClassifyRequest, ClassifyResponse, TrainingReport};

use super::{ClassifierApi, ClassifierError};

/// [`ClassifierApi`] over form-encoded HTTP POSTs.
#[derive(Clone, Debug)]
pub struct HttpClassifier {
    client: Client,
    base_url: String,
}

impl HttpClassifier {
    /// Wrap an existing `reqwest` client.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Build a client with the configured timeout. The dev server's
    /// certificates are not validated.
    pub fn from_config(config: &TestAiConfig) -> Result<Self, ClassifierError> {
        let timeout = config.http_timeout();
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .danger_accept_invalid_certs(config.is_insecure())
            .build()
            .map_err(ClassifierError::Build)?;
        Ok(Self::new(client, config.server_url()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post_form<T: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<String, ClassifierError> {
        let endpoint = self.endpoint(path);
        let response = self
            .client
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|source| ClassifierError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClassifierError::Http {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl ClassifierApi for HttpClassifier {
    async fn classify(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassificationResult, ClassifierError> {
        let body = self.post_form("classify", request).await?;
        let raw: Value = serde_json::from_str(&body)?;
        let response: ClassifyResponse = serde_json::from_value(raw.clone())?;
        Ok(ClassificationResult::from_response(response, raw))
    }

    async fn add_action(&self, report: &TrainingReport) -> Result<(), ClassifierError> {
        self.post_form("add_action", report).await.map(|_| ())
    }
}
