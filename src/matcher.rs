//! Pick the live element that best explains a classifier bounding box.
//!
//! Ranking is by IOU against the (already normalised) target box. A candidate
//! is only eligible when its rectangle also contains the target's center, and
//! interactive controls within 90% of the best score win over whatever
//! container happens to rank first.

use thiserror::Error;

use crate::driver::CandidateElement;
use crate::geometry::{BoundingBox, center_contained, iou};
use crate::logging::TestAiLogger;

/// Fraction of the top score an interactive candidate needs to be preferred.
pub const INTERACTIVE_PREFERENCE_RATIO: f64 = 0.9;

const INTERACTIVE_TAGS: &[&str] = &["input", "button", "textarea", "select", "textbox"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("could not find any web element under the center of the bounding box")]
pub struct NoMatchingElement;

/// Whether a tag or role names a control users type into or press. Drivers
/// report the tag and any ARIA role tokens separated by whitespace; one
/// interactive token is enough.
pub fn is_interactive(tag_role: &str) -> bool {
    tag_role.split_whitespace().any(|token| {
        INTERACTIVE_TAGS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(token))
    })
}

/// A candidate after measurement: its score, rectangle and tag.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub index: usize,
    pub score: f64,
    pub rect: Option<BoundingBox>,
    pub tag_role: String,
}

/// Measure every candidate against `target`. Elements whose rectangle cannot be
/// read score `0` instead of failing the whole match.
pub async fn score_candidates<E: CandidateElement>(
    target: &BoundingBox,
    candidates: &[E],
    logger: Option<&TestAiLogger>,
) -> Vec<ScoredCandidate> {
    let mut scored = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let rect = match candidate.rect().await {
            Ok(rect) => Some(rect),
            Err(err) => {
                if let Some(logger) = logger {
                    logger.debug(
                        format!("Unreadable candidate #{index}, setting score of 0: {err}"),
                        Some("match"),
                        None,
                    );
                }
                None
            }
        };
        let score = rect.as_ref().map(|rect| iou(target, rect)).unwrap_or(0.0);
        scored.push(ScoredCandidate {
            index,
            score,
            rect,
            tag_role: String::new(),
        });
    }
    scored
}

/// Apply ranking, the center gate and the interactive preference to measured
/// candidates.
pub fn select_best(
    target: &BoundingBox,
    mut scored: Vec<ScoredCandidate>,
) -> Result<ScoredCandidate, NoMatchingElement> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    let retained: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|candidate| candidate.score > 0.0)
        .filter(|candidate| {
            candidate
                .rect
                .as_ref()
                .is_some_and(|rect| center_contained(target, rect))
        })
        .collect();

    let top_score = retained.first().ok_or(NoMatchingElement)?.score;
    let threshold = top_score * INTERACTIVE_PREFERENCE_RATIO;

    let preferred = retained
        .iter()
        .position(|candidate| is_interactive(&candidate.tag_role) && candidate.score >= threshold)
        .unwrap_or(0);

    retained
        .into_iter()
        .nth(preferred)
        .ok_or(NoMatchingElement)
}

/// Full match: measure, gate and choose. Takes ownership of the candidate list
/// and hands back the winning element.
pub async fn match_candidates<E: CandidateElement>(
    target: &BoundingBox,
    candidates: Vec<E>,
    logger: Option<&TestAiLogger>,
) -> Result<(E, ScoredCandidate), NoMatchingElement> {
    let mut scored = score_candidates(target, &candidates, logger).await;

    // Tags are only needed for the candidates that can still win.
    for entry in scored.iter_mut() {
        let eligible = entry.score > 0.0
            && entry
                .rect
                .as_ref()
                .is_some_and(|rect| center_contained(target, rect));
        if !eligible {
            continue;
        }
        entry.tag_role = candidates[entry.index]
            .tag_role()
            .await
            .unwrap_or_default();
    }

    let best = select_best(target, scored)?;
    let element = candidates
        .into_iter()
        .nth(best.index)
        .ok_or(NoMatchingElement)?;
    Ok((element, best))
}
