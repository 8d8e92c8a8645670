//! Find/join matching policy.
//!
//! Results are scanned in the order the backend returned them and the first
//! one advertising the local match type is joined.

use super::match_type::MatchType;
use super::settings::SessionSearchResult;

/// What the caller should do with a find completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    /// Join this result
    Join(SessionSearchResult),
    /// Nothing joinable; let the player try again
    Retry,
    /// Results came back but none matched; the join trigger stays disabled
    NoMatch,
}

/// First result advertising `match_type`.
pub fn first_match(results: &[SessionSearchResult], match_type: MatchType) -> Option<&SessionSearchResult> {
    results.iter().find(|result| {
        result
            .match_type_tag()
            .is_some_and(|tag| match_type.matches_tag(tag))
    })
}

/// Decide how to react to a find completion.
pub fn decide(results: &[SessionSearchResult], success: bool, match_type: MatchType) -> MatchDecision {
    if let Some(result) = first_match(results, match_type) {
        return MatchDecision::Join(result.clone());
    }
    if !success || results.is_empty() {
        MatchDecision::Retry
    } else {
        MatchDecision::NoMatch
    }
}
