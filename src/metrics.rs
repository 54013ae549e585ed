//! Counters describing how lookups were resolved.
//!
//! One [`ResolutionMetrics`] lives on each resolver; snapshots can be merged
//! when several sessions report into the same place.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::resolver::FailureCategory;

/// Something that happened during a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionEvent {
    NativeHit,
    ClassifierFallback,
    Matched,
    Synthesized,
    Failed(FailureCategory),
    TrainingReported,
    TrainingFailed,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionMetrics {
    pub native_hits: u64,
    pub classifier_fallbacks: u64,
    pub matched: u64,
    pub synthesized: u64,

    pub unlabeled_failures: u64,
    pub frozen_failures: u64,
    pub unknown_classifier_failures: u64,
    pub no_match_failures: u64,
    pub transport_failures: u64,
    pub not_implemented: u64,

    pub training_reports: u64,
    pub training_failures: u64,

    pub classify_calls: u64,
    pub classify_time_ms: u64,
}

impl ResolutionMetrics {
    pub fn record(&mut self, event: ResolutionEvent) {
        match event {
            ResolutionEvent::NativeHit => self.native_hits += 1,
            ResolutionEvent::ClassifierFallback => self.classifier_fallbacks += 1,
            ResolutionEvent::Matched => self.matched += 1,
            ResolutionEvent::Synthesized => self.synthesized += 1,
            ResolutionEvent::Failed(category) => match category {
                FailureCategory::UnlabeledElement => self.unlabeled_failures += 1,
                FailureCategory::FrozenElement => self.frozen_failures += 1,
                FailureCategory::UnknownClassifierError => self.unknown_classifier_failures += 1,
                FailureCategory::NoMatchingElement => self.no_match_failures += 1,
                FailureCategory::Transport => self.transport_failures += 1,
                FailureCategory::NotImplemented => self.not_implemented += 1,
            },
            ResolutionEvent::TrainingReported => self.training_reports += 1,
            ResolutionEvent::TrainingFailed => self.training_failures += 1,
        }
    }

    /// Count one classify round trip and its latency.
    pub fn record_classify(&mut self, elapsed_ms: u64) {
        self.classify_calls += 1;
        self.classify_time_ms += elapsed_ms;
    }

    pub fn total_failures(&self) -> u64 {
        self.unlabeled_failures
            + self.frozen_failures
            + self.unknown_classifier_failures
            + self.no_match_failures
            + self.transport_failures
            + self.not_implemented
    }

    /// Merge the values from another metrics instance into this one.
    pub fn merge(&mut self, other: &ResolutionMetrics) {
        self.native_hits += other.native_hits;
        self.classifier_fallbacks += other.classifier_fallbacks;
        self.matched += other.matched;
        self.synthesized += other.synthesized;

        self.unlabeled_failures += other.unlabeled_failures;
        self.frozen_failures += other.frozen_failures;
        self.unknown_classifier_failures += other.unknown_classifier_failures;
        self.no_match_failures += other.no_match_failures;
        self.transport_failures += other.transport_failures;
        self.not_implemented += other.not_implemented;

        self.training_reports += other.training_reports;
        self.training_failures += other.training_failures;

        self.classify_calls += other.classify_calls;
        self.classify_time_ms += other.classify_time_ms;
    }
}

pub fn start_timer() -> Instant {
    Instant::now()
}

/// Milliseconds since `start`, saturating at `u64::MAX`.
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_events_by_kind() {
        let mut metrics = ResolutionMetrics::default();
        metrics.record(ResolutionEvent::NativeHit);
        metrics.record(ResolutionEvent::ClassifierFallback);
        metrics.record(ResolutionEvent::Failed(FailureCategory::UnlabeledElement));
        metrics.record(ResolutionEvent::Failed(FailureCategory::Transport));
        metrics.record(ResolutionEvent::TrainingFailed);
        metrics.record_classify(120);
        metrics.record_classify(30);

        assert_eq!(metrics.native_hits, 1);
        assert_eq!(metrics.classifier_fallbacks, 1);
        assert_eq!(metrics.unlabeled_failures, 1);
        assert_eq!(metrics.transport_failures, 1);
        assert_eq!(metrics.total_failures(), 2);
        assert_eq!(metrics.training_failures, 1);
        assert_eq!(metrics.classify_calls, 2);
        assert_eq!(metrics.classify_time_ms, 150);
    }

    #[test]
    fn merge_combines_two_instances() {
        let mut a = ResolutionMetrics::default();
        a.record(ResolutionEvent::Matched);
        a.record_classify(40);

        let mut b = ResolutionMetrics::default();
        b.record(ResolutionEvent::Matched);
        b.record(ResolutionEvent::Synthesized);
        b.record(ResolutionEvent::Failed(FailureCategory::FrozenElement));
        b.record_classify(10);

        a.merge(&b);
        assert_eq!(a.matched, 2);
        assert_eq!(a.synthesized, 1);
        assert_eq!(a.frozen_failures, 1);
        assert_eq!(a.classify_calls, 2);
        assert_eq!(a.classify_time_ms, 50);
    }

    #[test]
    fn events_serialize_in_snake_case() {
        let value = serde_json::to_value(ResolutionEvent::Failed(FailureCategory::NoMatchingElement))
            .unwrap();
        assert_eq!(value, serde_json::json!({ "failed": "no_matching_element" }));
    }
}
