//! Wire types exchanged with the classification service, plus the element
//! synthesized from a classifier answer.

pub mod classify;
pub mod element;

pub use classify::{
    ClassificationResult, ClassifyRequest, ClassifyResponse, ElementPayload, TrainingReport,
};
pub use element::ClassifiedElement;
