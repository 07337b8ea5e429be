//! Identifier matching
//!
//! Decides whether an identifier matches a rename rule and computes its
//! replacement. Four search modes are supported:
//!
//! | Mode | Rewrites |
//! |------|----------|
//! | `exact_match` | the whole identifier when it equals `old` |
//! | `partial_match` | every non-overlapping occurrence of `old` |
//! | `prefix_match` | a leading `old` |
//! | `suffix_match` | a trailing `old` |
//!
//! # Example
//!
//! ```ignore
//! use sor4onnx::pattern::{match_and_replace, SearchMode};
//! use sor4onnx::transform::RenameRule;
//!
//! let rule = RenameRule::new("onnx::", "").with_search_mode(SearchMode::Partial);
//! assert_eq!(match_and_replace("onnx::Conv_0", &rule), "Conv_0");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::RenameError;

pub mod matcher;

// Re-export main types
pub use matcher::{match_and_replace, IdentifierMatcher};

/// How `old` is located inside an identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Whole-identifier equality
    #[default]
    Exact,
    /// Any occurrence
    Partial,
    /// Leading occurrence
    Prefix,
    /// Trailing occurrence
    Suffix,
}

impl SearchMode {
    /// Name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Exact => "exact_match",
            SearchMode::Partial => "partial_match",
            SearchMode::Prefix => "prefix_match",
            SearchMode::Suffix => "suffix_match",
        }
    }
}

impl FromStr for SearchMode {
    type Err = RenameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact_match" => Ok(SearchMode::Exact),
            "partial_match" => Ok(SearchMode::Partial),
            "prefix_match" => Ok(SearchMode::Prefix),
            "suffix_match" => Ok(SearchMode::Suffix),
            other => Err(RenameError::InvalidSearchMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
