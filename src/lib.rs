//! Browser element lookup with a visual classification fallback.
//!
//! A native locator is tried first. When it misses, a remote classifier is
//! asked where the named element appears on a screenshot, and that box is
//! matched against the live elements on the page.

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod geometry;
pub mod logging;
pub mod matcher;
pub mod metrics;
pub mod resolver;
pub mod runtime;
pub mod scripts;
pub mod session;
pub mod types;

pub use classifier::{ClassifierApi, ClassifierError, HttpClassifier};
pub use config::{TestAiConfig, TestAiConfigOverrides, Verbosity};
pub use driver::{CandidateElement, DriverError, Locator, PageDriver};
pub use geometry::{BoundingBox, DensityMultiplier};
pub use resolver::{ElementResolver, FailureCategory, ResolveError, Resolved, ResolvedElement};
pub use session::{Session, SessionError, SessionMode};
