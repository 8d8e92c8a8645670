//! Match-type tags.
//!
//! A match type is advertised on every hosted session under the
//! [`MATCH_TYPE_KEY`] attribute and compared by exact string equality when
//! filtering discovery results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Attribute key the match type is advertised under.
pub const MATCH_TYPE_KEY: &str = "MatchType";

/// Kind of match a session is hosting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    FreeForAll,
    CaptureTheFlag,
}

impl MatchType {
    /// All known match types.
    pub const ALL: [MatchType; 2] = [MatchType::FreeForAll, MatchType::CaptureTheFlag];

    /// Display name, which is also the advertised tag.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FreeForAll => "Free For All",
            Self::CaptureTheFlag => "Capture the Flag",
        }
    }

    /// Check whether an advertised tag names this match type.
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.display_name() == tag
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error when a tag does not name any match type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown match type tag: {0:?}")]
pub struct UnknownMatchType(pub String);

impl FromStr for MatchType {
    type Err = UnknownMatchType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mt| mt.matches_tag(s))
            .ok_or_else(|| UnknownMatchType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(MatchType::FreeForAll.to_string(), "Free For All");
        assert_eq!(MatchType::CaptureTheFlag.to_string(), "Capture the Flag");
    }

    #[test]
    fn test_tag_parsing() {
        assert_eq!("Free For All".parse::<MatchType>(), Ok(MatchType::FreeForAll));
        assert_eq!(
            "Capture the Flag".parse::<MatchType>(),
            Ok(MatchType::CaptureTheFlag)
        );
        // Exact comparison, no case folding
        assert!("free for all".parse::<MatchType>().is_err());
    }

    #[test]
    fn test_matches_tag() {
        assert!(MatchType::CaptureTheFlag.matches_tag("Capture the Flag"));
        assert!(!MatchType::FreeForAll.matches_tag("Capture the Flag"));
    }
}
