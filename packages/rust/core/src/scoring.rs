//! Confidence bounds and match status derived from a candidate list.

use semtab_shared::{AnnotationMeta, Candidate, MatchStatus};

/// Lowest and highest candidate score of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    pub lowest_score: f64,
    pub highest_score: f64,
}

impl ScoreBounds {
    /// Reported for empty or malformed candidate lists.
    pub const ZERO: Self = Self {
        lowest_score: 0.0,
        highest_score: 0.0,
    };
}

/// Min/max of `score` over `candidates`.
///
/// An empty list, or any candidate without a finite score, yields
/// [`ScoreBounds::ZERO`]. Never fails.
pub fn score_bounds(candidates: &[Candidate]) -> ScoreBounds {
    let mut bounds: Option<ScoreBounds> = None;
    for candidate in candidates {
        let Some(score) = candidate.score.filter(|s| s.is_finite()) else {
            return ScoreBounds::ZERO;
        };
        bounds = Some(match bounds {
            None => ScoreBounds {
                lowest_score: score,
                highest_score: score,
            },
            Some(b) => ScoreBounds {
                lowest_score: b.lowest_score.min(score),
                highest_score: b.highest_score.max(score),
            },
        });
    }
    bounds.unwrap_or(ScoreBounds::ZERO)
}

/// True iff any candidate is flagged as a match.
pub fn has_match(candidates: &[Candidate]) -> bool {
    candidates.iter().any(|c| c.matched)
}

/// Cell-level annotation summary for `candidates`.
pub fn summarize(candidates: &[Candidate]) -> AnnotationMeta {
    let bounds = score_bounds(candidates);
    let status = if has_match(candidates) {
        MatchStatus::Matched
    } else {
        MatchStatus::NoMatch
    };
    AnnotationMeta::Annotated {
        status,
        lowest_score: Some(bounds.lowest_score),
        highest_score: Some(bounds.highest_score),
    }
}
