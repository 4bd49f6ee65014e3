// src/domain/resolution/value_objects.rs
//
// Resolution Value Objects
//
// Pure, immutable data structures representing the outcome of deciding
// which show an extracted name refers to. Constructed by the resolution
// cascade, consumed by the presentation layer.

use serde::{Deserialize, Serialize};

use crate::domain::show::ShowCandidate;

// ============================================================================
// RESOLUTION DECISION (TOP-LEVEL OUTCOME)
// ============================================================================

/// The outcome of evaluating an extracted show name against a provider
/// candidate list. Exactly one of three kinds; a chosen candidate exists
/// if and only if the decision is `Resolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionDecision {
    /// A single candidate was selected with a stated justification
    Resolved {
        chosen: ShowCandidate,
        reason: ResolutionReason,
    },

    /// No rule produced a confident answer. `scored` is the candidate
    /// list sorted by descending match score when scoring ran, empty
    /// otherwise.
    Ambiguous { scored: Vec<ScoredCandidate> },

    /// The provider returned no candidates at all
    NotFound,
}

impl ResolutionDecision {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionDecision::Resolved { .. })
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, ResolutionDecision::Ambiguous { .. })
    }

    /// The selected candidate, if resolved
    pub fn chosen(&self) -> Option<&ShowCandidate> {
        match self {
            ResolutionDecision::Resolved { chosen, .. } => Some(chosen),
            _ => None,
        }
    }

    /// The scored candidate list, if ambiguous
    pub fn scored(&self) -> Option<&[ScoredCandidate]> {
        match self {
            ResolutionDecision::Ambiguous { scored } => Some(scored),
            _ => None,
        }
    }

    /// The top-ranked scored candidate, when it is strong enough to
    /// suggest to the user (rank 0 and score at or above the
    /// recommendation threshold)
    pub fn recommended(&self) -> Option<&ScoredCandidate> {
        self.scored()?
            .first()
            .filter(|s| s.score >= ScoredCandidate::RECOMMEND_THRESHOLD)
    }
}

// ============================================================================
// RESOLUTION REASON
// ============================================================================

/// Which cascade rule selected the candidate. Rendered to the user as
/// the justification for an automatic choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    /// A remembered identifier for this query matched one candidate
    Pinned,

    /// Display name equals the extracted name (case-insensitive)
    ExactName,

    /// Names match once punctuation differences are normalized away
    NormalizedName,

    /// An alternative title matched the extracted name
    Alias,

    /// The base title won over its parenthetical variants
    BaseTitle,

    /// Titles contain the same words in a different order
    TokenSet,

    /// The year in the extracted name singled out one candidate
    YearTolerance,

    /// Best similarity score, with a clear gap to the runner-up
    Fuzzy,

    /// Only one candidate existed
    OnlyOption,
}

impl std::fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResolutionReason::Pinned => "previously selected for this query",
            ResolutionReason::ExactName => "exact name match",
            ResolutionReason::NormalizedName => "name match ignoring punctuation",
            ResolutionReason::Alias => "alias match",
            ResolutionReason::BaseTitle => "base title preferred over regional variants",
            ResolutionReason::TokenSet => "same words in a different order",
            ResolutionReason::YearTolerance => "year singled out one candidate",
            ResolutionReason::Fuzzy => "closest match by similarity",
            ResolutionReason::OnlyOption => "only candidate returned",
        };
        write!(f, "{}", text)
    }
}

// ============================================================================
// SCORED CANDIDATE
// ============================================================================

/// A candidate paired with its similarity score against the query,
/// in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: ShowCandidate,
    pub score: u8,
}

impl ScoredCandidate {
    /// Minimum score for the rank-0 entry to be shown as "recommended"
    pub const RECOMMEND_THRESHOLD: u8 = 70;

    pub fn new(candidate: ShowCandidate, score: u8) -> Self {
        Self { candidate, score }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str) -> ShowCandidate {
        ShowCandidate::new(id, name)
    }

    #[test]
    fn test_decision_accessors() {
        let resolved = ResolutionDecision::Resolved {
            chosen: candidate("1", "Game of Thrones"),
            reason: ResolutionReason::ExactName,
        };
        assert!(resolved.is_resolved());
        assert_eq!(resolved.chosen().unwrap().id, "1");
        assert!(resolved.scored().is_none());

        let ambiguous = ResolutionDecision::Ambiguous {
            scored: vec![ScoredCandidate::new(candidate("2", "House of the Dragon"), 55)],
        };
        assert!(!ambiguous.is_resolved());
        assert!(ambiguous.chosen().is_none());
        assert_eq!(ambiguous.scored().unwrap().len(), 1);

        assert!(ResolutionDecision::NotFound.chosen().is_none());
        assert!(ResolutionDecision::NotFound.scored().is_none());
    }

    #[test]
    fn test_recommended_requires_threshold_at_rank_zero() {
        let strong = ResolutionDecision::Ambiguous {
            scored: vec![
                ScoredCandidate::new(candidate("1", "The Flash"), 78),
                ScoredCandidate::new(candidate("2", "Flash Gordon"), 60),
            ],
        };
        assert_eq!(strong.recommended().unwrap().candidate.id, "1");

        let weak = ResolutionDecision::Ambiguous {
            scored: vec![
                ScoredCandidate::new(candidate("1", "The Flash"), 64),
                ScoredCandidate::new(candidate("2", "Flash Gordon"), 60),
            ],
        };
        assert!(weak.recommended().is_none());

        let empty = ResolutionDecision::Ambiguous { scored: vec![] };
        assert!(empty.recommended().is_none());
    }
}
