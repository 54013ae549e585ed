//! Element resolution: native lookup first, the classifier as fallback.
//!
//! Each lookup performs at most one native attempt, one classify call and one
//! training report, strictly in sequence. Native failures of any kind are
//! never surfaced; they only trigger the classifier. Training reports are a
//! side channel and cannot change an outcome that has already been decided.

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::driver::{CandidateElement, DriverError, Locator, PageDriver};
use crate::geometry::BoundingBox;
use crate::logging::TestAiLogger;
use crate::matcher::match_candidates;
use crate::metrics::{ResolutionEvent, ResolutionMetrics, elapsed_ms, start_timer};
use crate::session::{Session, SessionMode};
use crate::types::{ClassificationResult, ClassifiedElement, ClassifyRequest, TrainingReport};

const CLASSIFICATION_FAILED: &str = "Classification failed for element_name: ";

/// Coarse failure taxonomy callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    UnlabeledElement,
    FrozenElement,
    UnknownClassifierError,
    NoMatchingElement,
    Transport,
    NotImplemented,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{message}")]
    Unlabeled {
        element_name: String,
        message: String,
    },
    #[error("{message}")]
    Frozen {
        element_name: String,
        message: String,
    },
    #[error("{message}")]
    UnknownClassifier {
        element_name: String,
        raw_message: Option<String>,
        message: String,
    },
    #[error(
        "could not find any web element under the center of the bounding box for '{element_name}'"
    )]
    NoMatchingElement { element_name: String },
    #[error("classification of '{element_name}' failed: {source}")]
    Transport {
        element_name: String,
        #[source]
        source: ClassifierError,
    },
    #[error("could not capture a screenshot to classify '{element_name}': {source}")]
    Screenshot {
        element_name: String,
        #[source]
        source: DriverError,
    },
    #[error("interactive test authoring is not implemented (test case '{test_case_name}')")]
    NotImplemented { test_case_name: String },
}

impl ResolveError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ResolveError::Unlabeled { .. } => FailureCategory::UnlabeledElement,
            ResolveError::Frozen { .. } => FailureCategory::FrozenElement,
            ResolveError::UnknownClassifier { .. } => FailureCategory::UnknownClassifierError,
            ResolveError::NoMatchingElement { .. } => FailureCategory::NoMatchingElement,
            ResolveError::Transport { .. } | ResolveError::Screenshot { .. } => {
                FailureCategory::Transport
            }
            ResolveError::NotImplemented { .. } => FailureCategory::NotImplemented,
        }
    }
}

/// The element a lookup produced.
#[derive(Debug)]
pub enum ResolvedElement<E> {
    /// A live element from the page's element tree.
    Live(E),
    /// Built from the classifier payload alone.
    Classified(ClassifiedElement),
}

impl<E> ResolvedElement<E> {
    pub fn as_live(&self) -> Option<&E> {
        match self {
            ResolvedElement::Live(element) => Some(element),
            ResolvedElement::Classified(_) => None,
        }
    }

    pub fn as_classified(&self) -> Option<&ClassifiedElement> {
        match self {
            ResolvedElement::Live(_) => None,
            ResolvedElement::Classified(element) => Some(element),
        }
    }
}

#[derive(Debug)]
pub struct Resolved<E> {
    pub element: ResolvedElement<E>,
    /// Classifier key for the element, when the classifier was consulted and
    /// returned one.
    pub key: Option<String>,
}

pub struct ElementResolver<D: PageDriver> {
    driver: D,
    session: Session,
    metrics: Mutex<ResolutionMetrics>,
}

impl<D: PageDriver> ElementResolver<D> {
    pub fn new(driver: D, session: Session) -> Self {
        Self {
            driver,
            session,
            metrics: Mutex::new(ResolutionMetrics::default()),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Snapshot of the counters collected so far.
    pub fn metrics(&self) -> ResolutionMetrics {
        self.lock_metrics().clone()
    }

    /// Look an element up with a native locator, falling back to the
    /// classifier under `element_name` (or a name derived from the locator).
    pub async fn find_element(
        &self,
        locator: &Locator,
        element_name: Option<&str>,
    ) -> Result<Resolved<D::Element>, ResolveError> {
        let element_name = element_name
            .map(str::to_string)
            .unwrap_or_else(|| locator.default_element_name())
            .replace(' ', "_");

        match self.driver.find_element(locator).await {
            Ok(element) => {
                self.record(ResolutionEvent::NativeHit);
                let key = self.key_for_native_hit(&element_name).await;
                match element.rect().await {
                    Ok(rect) => self.report_training(&element_name, &rect, key.as_deref()).await,
                    Err(err) => self.log().warn(
                        format!("Could not measure '{element_name}' for training: {err}"),
                        Some("training"),
                        None,
                    ),
                }
                Ok(Resolved {
                    element: ResolvedElement::Live(element),
                    key,
                })
            }
            Err(err) => {
                let details = json!({ "locator": locator.to_string(), "error": err.to_string() });
                if err.is_missing() {
                    self.log().info(
                        format!(
                            "Element '{element_name}' was not found natively, trying the classifier"
                        ),
                        Some("resolve"),
                        Some(details),
                    );
                } else {
                    self.log().warn(
                        format!("Native lookup of '{element_name}' failed, trying the classifier"),
                        Some("resolve"),
                        Some(details),
                    );
                }
                self.record(ResolutionEvent::ClassifierFallback);
                self.find_by_element_name(&element_name).await
            }
        }
    }

    /// Resolve purely through the classifier.
    pub async fn find_by_element_name(
        &self,
        element_name: &str,
    ) -> Result<Resolved<D::Element>, ResolveError> {
        let outcome = self.resolve_classified(element_name).await;
        if let Err(err) = &outcome {
            self.record(ResolutionEvent::Failed(err.category()));
            self.log().error(
                format!("Unable to find the element with name '{element_name}'"),
                Some("resolve"),
                Some(json!({ "category": err.category(), "error": err.to_string() })),
            );
        }
        outcome
    }

    async fn resolve_classified(
        &self,
        element_name: &str,
    ) -> Result<Resolved<D::Element>, ResolveError> {
        let (key, bbox, text, tag_role) = match self.classify(element_name).await? {
            ClassificationResult::Success {
                key,
                bbox,
                text,
                tag_role,
                ..
            } => (key, bbox, text, tag_role),
            ClassificationResult::Failure {
                raw_message, raw, ..
            } => {
                let err = self.classification_failure(element_name, raw_message, &raw);
                self.log().warn(err.to_string(), Some("classify"), None);
                return Err(err);
            }
        };

        self.log().info(
            format!("Successfully classified: {element_name}"),
            Some("classify"),
            None,
        );

        let multiplier = self.session.multiplier();
        let candidates = if self.driver.has_element_tree() {
            match self.driver.find_all_elements().await {
                Ok(candidates) => Some(candidates),
                Err(err) => {
                    self.log().warn(
                        format!(
                            "Could not enumerate page elements for '{element_name}', using the classifier box: {err}"
                        ),
                        Some("match"),
                        None,
                    );
                    None
                }
            }
        } else {
            None
        };

        let Some(candidates) = candidates else {
            self.record(ResolutionEvent::Synthesized);
            return Ok(Resolved {
                element: ResolvedElement::Classified(ClassifiedElement::from_classifier(
                    bbox, text, tag_role, multiplier,
                )),
                key,
            });
        };

        let target = bbox.normalize(multiplier);
        let (element, best) = match_candidates(&target, candidates, Some(self.log()))
            .await
            .map_err(|_| ResolveError::NoMatchingElement {
                element_name: element_name.to_string(),
            })?;

        self.record(ResolutionEvent::Matched);
        self.log().debug(
            format!("Matched '{element_name}' to a <{}> element", best.tag_role),
            Some("match"),
            Some(json!({ "score": best.score, "target": target })),
        );

        let rect = best.rect.unwrap_or(target);
        self.report_training(element_name, &rect, key.as_deref()).await;

        Ok(Resolved {
            element: ResolvedElement::Live(element),
            key,
        })
    }

    /// One classify round trip for `element_name`.
    async fn classify(&self, element_name: &str) -> Result<ClassificationResult, ResolveError> {
        if let SessionMode::Interactive { test_case_name } = self.session.mode() {
            return Err(ResolveError::NotImplemented {
                test_case_name: test_case_name.clone(),
            });
        }

        let source = match self.driver.page_source().await {
            Ok(source) => source,
            Err(err) => {
                self.log().debug(
                    format!("Page source unavailable, sending an empty one: {err}"),
                    Some("classify"),
                    None,
                );
                String::new()
            }
        };

        let screenshot = self.driver.screenshot_base64().await.map_err(|source| {
            ResolveError::Screenshot {
                element_name: element_name.to_string(),
                source,
            }
        })?;

        let request = ClassifyRequest {
            screenshot,
            source,
            api_key: self.session.api_key().to_string(),
            label: element_name.to_string(),
            run_id: self.session.run_id().to_string(),
        };

        let start = start_timer();
        let result = self.session.classifier().classify(&request).await;
        self.lock_metrics().record_classify(elapsed_ms(start));

        result.map_err(|source| ResolveError::Transport {
            element_name: element_name.to_string(),
            source,
        })
    }

    /// Training needs the classifier's key for the element; fetching it is
    /// best-effort.
    async fn key_for_native_hit(&self, element_name: &str) -> Option<String> {
        if matches!(self.session.mode(), SessionMode::Interactive { .. }) {
            return None;
        }
        match self.classify(element_name).await {
            Ok(result) => result.key().map(str::to_string),
            Err(err) => {
                self.log().warn(
                    format!("Could not fetch a key for '{element_name}': {err}"),
                    Some("classify"),
                    None,
                );
                None
            }
        }
    }

    async fn report_training(&self, element_name: &str, rect: &BoundingBox, key: Option<&str>) {
        let report = TrainingReport::new(
            key,
            self.session.api_key(),
            self.session.run_id(),
            rect,
            self.session.multiplier(),
            self.session.train(),
        );

        match self.session.classifier().add_action(&report).await {
            Ok(()) => {
                self.record(ResolutionEvent::TrainingReported);
                self.log().debug(
                    format!("Reported '{element_name}' for training"),
                    Some("training"),
                    None,
                );
            }
            Err(err) => {
                self.record(ResolutionEvent::TrainingFailed);
                self.log().warn(
                    format!("Training report for '{element_name}' failed: {err}"),
                    Some("training"),
                    None,
                );
            }
        }
    }

    fn classification_failure(
        &self,
        element_name: &str,
        raw_message: Option<String>,
        raw: &Value,
    ) -> ResolveError {
        let lowered = raw_message.as_deref().map(str::to_ascii_lowercase);
        let lowered = lowered.as_deref().unwrap_or_default();

        if ["please label", "did not find", "needs labeling", "not found"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            return ResolveError::Unlabeled {
                element_name: element_name.to_string(),
                message: format!(
                    "{CLASSIFICATION_FAILED}{element_name} - Please visit {} to classify",
                    self.session.labeling_url(element_name)
                ),
            };
        }

        if lowered.contains("frozen label") {
            return ResolveError::Frozen {
                element_name: element_name.to_string(),
                message: format!(
                    "{CLASSIFICATION_FAILED}{element_name} - However this element is frozen, so no new screenshot was uploaded. Please unfreeze the element if you want to add this screenshot to training"
                ),
            };
        }

        ResolveError::UnknownClassifier {
            element_name: element_name.to_string(),
            raw_message,
            message: format!(
                "test.ai driver exception: Unknown error, here was the API response: {raw}"
            ),
        }
    }

    fn log(&self) -> &TestAiLogger {
        self.session.logger()
    }

    fn record(&self, event: ResolutionEvent) {
        self.lock_metrics().record(event);
    }

    fn lock_metrics(&self) -> MutexGuard<'_, ResolutionMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassifierApi, ClassifierError};
    use crate::geometry::DensityMultiplier;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SERVER: &str = "https://sdk.test.ai";

    #[derive(Debug, Clone)]
    struct MockElement {
        rect: BoundingBox,
        tag: &'static str,
    }

    #[async_trait]
    impl CandidateElement for MockElement {
        async fn rect(&self) -> Result<BoundingBox, DriverError> {
            Ok(self.rect)
        }

        async fn tag_role(&self) -> Result<String, DriverError> {
            Ok(self.tag.to_string())
        }
    }

    enum Native {
        Found(MockElement),
        Stale,
    }

    struct MockDriver {
        native: Native,
        page: Vec<MockElement>,
        tree: bool,
        enumerate_fails: bool,
        screenshot_fails: bool,
    }

    impl MockDriver {
        fn stale(page: Vec<MockElement>) -> Self {
            Self {
                native: Native::Stale,
                page,
                tree: true,
                enumerate_fails: false,
                screenshot_fails: false,
            }
        }

        fn found(element: MockElement) -> Self {
            Self {
                native: Native::Found(element),
                page: Vec::new(),
                tree: true,
                enumerate_fails: false,
                screenshot_fails: false,
            }
        }
    }

    #[async_trait]
    impl PageDriver for MockDriver {
        type Element = MockElement;

        async fn find_element(&self, locator: &Locator) -> Result<MockElement, DriverError> {
            match &self.native {
                Native::Found(element) => Ok(element.clone()),
                Native::Stale => Err(DriverError::Stale(locator.to_string())),
            }
        }

        async fn find_all_elements(&self) -> Result<Vec<MockElement>, DriverError> {
            if self.enumerate_fails {
                return Err(DriverError::Other("target closed".into()));
            }
            Ok(self.page.clone())
        }

        async fn screenshot_base64(&self) -> Result<String, DriverError> {
            if self.screenshot_fails {
                return Err(DriverError::Screenshot("page crashed".into()));
            }
            Ok("iVBORw0KGgo=".to_string())
        }

        async fn page_source(&self) -> Result<String, DriverError> {
            Err(DriverError::Other("source unavailable".into()))
        }

        async fn viewport_width(&self) -> Result<f64, DriverError> {
            Ok(1280.0)
        }

        async fn execute_script(&self, _script: &str) -> Result<Value, DriverError> {
            Ok(Value::Null)
        }

        fn has_element_tree(&self) -> bool {
            self.tree
        }
    }

    struct MockClassifier {
        response: Value,
        fail_training: bool,
        classify_calls: AtomicUsize,
        requests: Mutex<Vec<ClassifyRequest>>,
        reports: Mutex<Vec<TrainingReport>>,
    }

    impl MockClassifier {
        fn new(response: Value) -> Arc<Self> {
            Arc::new(Self {
                response,
                fail_training: false,
                classify_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reports: Mutex::new(Vec::new()),
            })
        }

        fn failing_training(response: Value) -> Arc<Self> {
            Arc::new(Self {
                response,
                fail_training: true,
                classify_calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                reports: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ClassifierApi for MockClassifier {
        async fn classify(
            &self,
            request: &ClassifyRequest,
        ) -> Result<ClassificationResult, ClassifierError> {
            self.classify_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let response = serde_json::from_value(self.response.clone())?;
            Ok(ClassificationResult::from_response(
                response,
                self.response.clone(),
            ))
        }

        async fn add_action(&self, report: &TrainingReport) -> Result<(), ClassifierError> {
            self.reports.lock().unwrap().push(report.clone());
            if self.fail_training {
                return Err(ClassifierError::Status {
                    endpoint: format!("{SERVER}/add_action"),
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(())
        }
    }

    fn resolver(
        driver: MockDriver,
        classifier: Arc<MockClassifier>,
        multiplier: f64,
    ) -> ElementResolver<MockDriver> {
        let session = Session::new(
            "api-key",
            SERVER,
            DensityMultiplier::new(multiplier).unwrap(),
            classifier,
        )
        .with_run_id("run-1");
        ElementResolver::new(driver, session)
    }

    fn element(x: f64, y: f64, w: f64, h: f64, tag: &'static str) -> MockElement {
        MockElement {
            rect: BoundingBox::new(x, y, w, h),
            tag,
        }
    }

    fn success(x: f64, y: f64, w: f64, h: f64) -> Value {
        json!({
            "success": true,
            "key": "key-42",
            "elem": { "x": x, "y": y, "width": w, "height": h, "text": "Sign in", "class": "button" }
        })
    }

    #[tokio::test]
    async fn stale_native_lookup_falls_back_to_unlabeled_failure() {
        let classifier = MockClassifier::new(json!({ "success": false, "message": "Did not find label" }));
        let resolver = resolver(MockDriver::stale(Vec::new()), classifier.clone(), 1.0);

        let err = resolver
            .find_element(&Locator::Id("login".into()), Some("login button"))
            .await
            .unwrap_err();

        assert_eq!(classifier.classify_calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.category(), FailureCategory::UnlabeledElement);
        let message = err.to_string();
        assert!(message.contains("https://sdk.test.ai/label/login_button"), "{message}");
        assert!(message.starts_with("Classification failed for element_name: login_button"));

        let requests = classifier.requests.lock().unwrap();
        assert_eq!(requests[0].label, "login_button");
        assert_eq!(requests[0].run_id, "run-1");
        assert_eq!(requests[0].source, "");

        let metrics = resolver.metrics();
        assert_eq!(metrics.classifier_fallbacks, 1);
        assert_eq!(metrics.unlabeled_failures, 1);
        assert_eq!(metrics.classify_calls, 1);
    }

    #[tokio::test]
    async fn native_hit_reports_training_with_logical_rect() {
        let classifier = MockClassifier::new(success(0.0, 0.0, 10.0, 10.0));
        let native = element(12.0, 34.0, 56.0, 78.0, "input");
        let resolver = resolver(MockDriver::found(native), classifier.clone(), 2.0);

        let resolved = resolver
            .find_element(&Locator::CssSelector("#user.name".into()), None)
            .await
            .unwrap();

        assert!(resolved.element.as_live().is_some());
        assert_eq!(resolved.key.as_deref(), Some("key-42"));
        assert_eq!(
            classifier.requests.lock().unwrap()[0].label,
            "element_name_by_css_selector_#user_name"
        );

        let reports = classifier.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!((report.x, report.y, report.width, report.height), (12, 34, 56, 78));
        assert_eq!(report.run_id, "run-1");
        assert_eq!(report.key, "key-42");
        assert_eq!(report.multiplier, 2.0);
        assert!(report.train_if_necessary);
    }

    #[tokio::test]
    async fn training_failure_does_not_change_outcome() {
        let classifier = MockClassifier::failing_training(success(0.0, 0.0, 10.0, 10.0));
        let resolver = resolver(
            MockDriver::found(element(0.0, 0.0, 20.0, 20.0, "button")),
            classifier.clone(),
            1.0,
        );

        let resolved = resolver
            .find_element(&Locator::Id("go".into()), Some("go"))
            .await
            .unwrap();

        assert!(resolved.element.as_live().is_some());
        assert_eq!(classifier.reports.lock().unwrap().len(), 1);
        assert_eq!(resolver.metrics().training_failures, 1);
    }

    #[tokio::test]
    async fn classifier_box_is_normalized_and_matched() {
        let classifier = MockClassifier::new(success(200.0, 200.0, 160.0, 60.0));
        let page = vec![
            element(0.0, 0.0, 1280.0, 800.0, "body"),
            element(100.0, 100.0, 82.0, 30.0, "div"),
            element(104.0, 100.0, 80.0, 30.0, "button"),
        ];
        let resolver = resolver(MockDriver::stale(page), classifier.clone(), 2.0);

        let resolved = resolver.find_by_element_name("sign_in").await.unwrap();

        let matched = resolved.element.as_live().unwrap();
        assert_eq!(matched.tag, "button");
        let reports = classifier.reports.lock().unwrap();
        assert_eq!((reports[0].x, reports[0].width), (104, 80));
        assert_eq!(resolver.metrics().matched, 1);
    }

    #[tokio::test]
    async fn no_candidate_under_center_is_no_matching_element() {
        let classifier = MockClassifier::new(success(0.0, 0.0, 20.0, 20.0));
        let page = vec![element(500.0, 500.0, 20.0, 20.0, "button")];
        let resolver = resolver(MockDriver::stale(page), classifier.clone(), 1.0);

        let err = resolver.find_by_element_name("ghost").await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::NoMatchingElement);
        assert!(classifier.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn frozen_and_unknown_messages_are_categorised() {
        let frozen = MockClassifier::new(json!({ "success": false, "message": "This is a frozen label" }));
        let err = resolver(MockDriver::stale(Vec::new()), frozen, 1.0)
            .find_by_element_name("cart")
            .await
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::FrozenElement);
        assert!(err.to_string().contains("no new screenshot was uploaded"));

        let unknown = MockClassifier::new(json!({ "success": false, "message": "quota exceeded" }));
        let err = resolver(MockDriver::stale(Vec::new()), unknown, 1.0)
            .find_by_element_name("cart")
            .await
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::UnknownClassifierError);
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn interactive_mode_short_circuits() {
        let classifier = MockClassifier::new(success(0.0, 0.0, 10.0, 10.0));
        let session = Session::new("k", SERVER, DensityMultiplier::default(), classifier.clone())
            .with_mode(SessionMode::Interactive {
                test_case_name: "checkout".into(),
            });
        let resolver = ElementResolver::new(MockDriver::stale(Vec::new()), session);

        let err = resolver.find_by_element_name("pay").await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::NotImplemented);
        assert_eq!(classifier.classify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pages_without_a_tree_get_a_synthesized_element() {
        let classifier = MockClassifier::new(success(200.0, 100.0, 160.0, 60.0));
        let driver = MockDriver {
            tree: false,
            ..MockDriver::stale(Vec::new())
        };
        let resolver = resolver(driver, classifier, 2.0);

        let resolved = resolver.find_by_element_name("sign_in").await.unwrap();
        let synthesized = resolved.element.as_classified().unwrap();
        assert_eq!(synthesized.rect(), BoundingBox::new(100.0, 50.0, 80.0, 30.0));
        assert_eq!(synthesized.text(), "Sign in");
        assert_eq!(resolved.key.as_deref(), Some("key-42"));
        assert_eq!(resolver.metrics().synthesized, 1);
    }

    #[tokio::test]
    async fn enumeration_failure_falls_back_to_classifier_box() {
        let classifier = MockClassifier::new(success(200.0, 100.0, 160.0, 60.0));
        let driver = MockDriver {
            enumerate_fails: true,
            ..MockDriver::stale(vec![element(100.0, 50.0, 80.0, 30.0, "button")])
        };
        let resolver = resolver(driver, classifier.clone(), 2.0);

        let resolved = resolver.find_by_element_name("sign_in").await.unwrap();

        let synthesized = resolved.element.as_classified().unwrap();
        assert_eq!(synthesized.rect(), BoundingBox::new(100.0, 50.0, 80.0, 30.0));
        assert_eq!(resolved.key.as_deref(), Some("key-42"));
        assert!(classifier.reports.lock().unwrap().is_empty());

        let metrics = resolver.metrics();
        assert_eq!(metrics.synthesized, 1);
        assert_eq!(metrics.total_failures(), 0);
    }

    #[tokio::test]
    async fn undecodable_classifier_response_is_a_transport_failure() {
        let classifier = MockClassifier::new(json!("<html>bad gateway</html>"));
        let resolver = resolver(MockDriver::stale(Vec::new()), classifier.clone(), 1.0);

        let err = resolver
            .find_element(&Locator::Id("x".into()), None)
            .await
            .unwrap_err();

        assert_eq!(err.category(), FailureCategory::Transport);
        assert!(matches!(
            err,
            ResolveError::Transport {
                ref element_name,
                source: ClassifierError::Decode(_),
            } if element_name == "element_name_by_id_x"
        ));
        assert_eq!(classifier.classify_calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.metrics().transport_failures, 1);
    }

    #[tokio::test]
    async fn screenshot_failure_is_a_transport_failure() {
        let classifier = MockClassifier::new(success(0.0, 0.0, 10.0, 10.0));
        let driver = MockDriver {
            screenshot_fails: true,
            ..MockDriver::stale(Vec::new())
        };
        let resolver = resolver(driver, classifier.clone(), 1.0);

        let err = resolver.find_by_element_name("logo").await.unwrap_err();

        assert!(matches!(err, ResolveError::Screenshot { .. }));
        assert_eq!(err.category(), FailureCategory::Transport);
        assert_eq!(classifier.classify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.metrics().transport_failures, 1);
    }

    #[tokio::test]
    async fn interactive_native_hit_skips_classify_but_reports_training() {
        let classifier = MockClassifier::new(success(0.0, 0.0, 10.0, 10.0));
        let session = Session::new("k", SERVER, DensityMultiplier::default(), classifier.clone())
            .with_mode(SessionMode::Interactive {
                test_case_name: "checkout".into(),
            });
        let native = element(5.0, 6.0, 70.0, 20.0, "button");
        let resolver = ElementResolver::new(MockDriver::found(native), session);

        let resolved = resolver
            .find_element(&Locator::Id("pay".into()), Some("pay"))
            .await
            .unwrap();

        assert!(resolved.element.as_live().is_some());
        assert!(resolved.key.is_none());
        assert_eq!(classifier.classify_calls.load(Ordering::SeqCst), 0);

        let reports = classifier.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key, "");
        assert_eq!((reports[0].x, reports[0].y, reports[0].width, reports[0].height), (5, 6, 70, 20));
        assert_eq!(resolver.metrics().native_hits, 1);
    }
}
