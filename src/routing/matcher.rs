//! Route matching logic.
//!
//! # Responsibilities
//! - Compare a request path against candidate patterns segment by segment
//! - Keep only patterns that match every segment
//! - Pick the most specific survivor deterministically
//!
//! # Design Decisions
//! - Positional: segment N of the pattern is compared with segment N of the path
//! - A differing segment count or a differing literal disqualifies the pattern
//! - Literal comparison is case-insensitive, the wildcard matches any one segment
//! - Fewest wildcards wins; remaining ties go to the lexicographically smallest pattern
//! - No regex, O(R·S) over R candidates of S segments

use std::cmp::Ordering;

use crate::routing::route::PatternSyntax;

/// Selects the best pattern for a request path.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns the winning pattern, or `None` when nothing matches fully.
    fn resolve<'a>(&self, path: &str, candidates: &[&'a str]) -> Option<&'a str>;
}

/// A pattern that matched every segment of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate<'a> {
    pub pattern: &'a str,
    /// Number of matched segments (always the path's segment count).
    pub score: usize,
    /// How many of the matched segments were wildcards.
    pub wildcards: usize,
}

impl MatchCandidate<'_> {
    /// Most specific first, then lexicographic.
    fn precedence(&self, other: &Self) -> Ordering {
        self.wildcards
            .cmp(&other.wildcards)
            .then_with(|| self.pattern.cmp(other.pattern))
    }
}

/// Positional, total-match, most-specific-wins matcher.
#[derive(Debug, Clone, Default)]
pub struct SegmentMatcher {
    syntax: PatternSyntax,
}

impl SegmentMatcher {
    pub fn new(syntax: PatternSyntax) -> Self {
        Self { syntax }
    }

    pub fn syntax(&self) -> &PatternSyntax {
        &self.syntax
    }

    /// Every candidate that fully matches `path`, in input order.
    pub fn candidates<'a>(&self, path: &str, patterns: &[&'a str]) -> Vec<MatchCandidate<'a>> {
        let path_segments: Vec<String> = self
            .syntax
            .split(path)
            .into_iter()
            .map(str::to_lowercase)
            .collect();

        patterns
            .iter()
            .copied()
            .filter_map(|pattern| self.score(pattern, &path_segments))
            .collect()
    }

    fn score<'a>(&self, pattern: &'a str, path_segments: &[String]) -> Option<MatchCandidate<'a>> {
        let segments = self.syntax.split(pattern);
        if segments.len() != path_segments.len() {
            return None;
        }

        let mut wildcards = 0;
        for (segment, actual) in segments.iter().zip(path_segments) {
            if self.syntax.is_wildcard(segment) {
                wildcards += 1;
            } else if segment.to_lowercase() != *actual {
                return None;
            }
        }

        Some(MatchCandidate {
            pattern,
            score: segments.len(),
            wildcards,
        })
    }
}

impl Matcher for SegmentMatcher {
    fn resolve<'a>(&self, path: &str, candidates: &[&'a str]) -> Option<&'a str> {
        self.candidates(path, candidates)
            .into_iter()
            .min_by(|a, b| a.precedence(b))
            .map(|winner| winner.pattern)
    }
}
