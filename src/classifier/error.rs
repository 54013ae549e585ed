use thiserror::Error;

/// Failures talking to the classification service.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("could not decode classifier response: {0}")]
    Decode(#[from] serde_json::Error),
}
