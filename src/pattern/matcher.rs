//! Identifier matching and replacement
//!
//! Pure string functions: deciding whether an identifier matches the rule's
//! `old` text under a [`SearchMode`] and producing the replacement.

use std::borrow::Cow;

use crate::transform::RenameRule;

use super::SearchMode;

/// Matcher bound to one `(old, new)` pair and search mode
#[derive(Debug, Clone, Copy)]
pub struct IdentifierMatcher<'a> {
    old: &'a str,
    new: &'a str,
    search_mode: SearchMode,
}

impl<'a> IdentifierMatcher<'a> {
    /// Create a matcher
    pub fn new(old: &'a str, new: &'a str, search_mode: SearchMode) -> Self {
        Self {
            old,
            new,
            search_mode,
        }
    }

    /// Create a matcher for a rename rule
    pub fn from_rule(rule: &'a RenameRule) -> Self {
        Self::new(&rule.old, &rule.new, rule.search_mode)
    }

    /// Check whether `identifier` would be rewritten
    ///
    /// Under `partial_match` an empty `old` never matches; the other modes
    /// take it literally (`exact_match` hits empty identifiers, prefix and
    /// suffix hit everything).
    pub fn is_match(&self, identifier: &str) -> bool {
        match self.search_mode {
            SearchMode::Exact => identifier == self.old,
            SearchMode::Partial => !self.old.is_empty() && identifier.contains(self.old),
            SearchMode::Prefix => identifier.starts_with(self.old),
            SearchMode::Suffix => identifier.ends_with(self.old),
        }
    }

    /// Compute the replacement; unchanged identifiers are borrowed
    pub fn apply<'s>(&self, identifier: &'s str) -> Cow<'s, str> {
        if !self.is_match(identifier) {
            return Cow::Borrowed(identifier);
        }
        match self.search_mode {
            SearchMode::Exact => Cow::Owned(self.new.to_string()),
            // str::replace scans left to right without overlaps
            SearchMode::Partial => Cow::Owned(identifier.replace(self.old, self.new)),
            SearchMode::Prefix => match identifier.strip_prefix(self.old) {
                Some(rest) => Cow::Owned(format!("{}{}", self.new, rest)),
                None => Cow::Borrowed(identifier),
            },
            SearchMode::Suffix => match identifier.strip_suffix(self.old) {
                Some(rest) => Cow::Owned(format!("{}{}", rest, self.new)),
                None => Cow::Borrowed(identifier),
            },
        }
    }
}

/// Replace `identifier` according to `rule`
pub fn match_and_replace(identifier: &str, rule: &RenameRule) -> String {
    IdentifierMatcher::from_rule(rule)
        .apply(identifier)
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(old: &str, new: &str, mode: SearchMode) -> RenameRule {
        RenameRule::new(old, new).with_search_mode(mode)
    }

    #[test]
    fn test_exact() {
        let r = rule("onnx::Conv_0", "conv_in", SearchMode::Exact);
        assert_eq!(match_and_replace("onnx::Conv_0", &r), "conv_in");
        assert_eq!(match_and_replace("onnx::Conv_01", &r), "onnx::Conv_01");
    }

    #[test]
    fn test_partial_replaces_all_occurrences() {
        let r = rule("onnx::", "", SearchMode::Partial);
        assert_eq!(match_and_replace("onnx::Conv_onnx::1", &r), "Conv_1");

        let r = rule("aa", "b", SearchMode::Partial);
        assert_eq!(match_and_replace("aaa", &r), "ba");
    }

    #[test]
    fn test_prefix_only_leading() {
        let r = rule("x_", "y_", SearchMode::Prefix);
        assert_eq!(match_and_replace("x_x_1", &r), "y_x_1");
        assert_eq!(match_and_replace("a_x_1", &r), "a_x_1");
    }

    #[test]
    fn test_suffix_only_trailing() {
        let r = rule("_out", "_y", SearchMode::Suffix);
        assert_eq!(match_and_replace("relu_out_out", &r), "relu_out_y");
        assert_eq!(match_and_replace("relu_out_0", &r), "relu_out_0");
    }

    #[test]
    fn test_empty_old_partial_matches_nothing() {
        let r = rule("", "zzz", SearchMode::Partial);
        assert_eq!(match_and_replace("", &r), "");
        assert_eq!(match_and_replace("abc", &r), "abc");
        assert!(!IdentifierMatcher::from_rule(&r).is_match("abc"));
    }

    #[test]
    fn test_empty_old_literal_modes() {
        let r = rule("", "zzz", SearchMode::Exact);
        assert_eq!(match_and_replace("", &r), "zzz");
        assert_eq!(match_and_replace("abc", &r), "abc");

        let r = rule("", "pre_", SearchMode::Prefix);
        assert_eq!(match_and_replace("abc", &r), "pre_abc");

        let r = rule("", "_post", SearchMode::Suffix);
        assert_eq!(match_and_replace("abc", &r), "abc_post");
    }

    #[test]
    fn test_unchanged_identifier_is_borrowed() {
        let matcher = IdentifierMatcher::new("q", "r", SearchMode::Partial);
        assert!(matches!(matcher.apply("abc"), Cow::Borrowed("abc")));
        assert!(matches!(matcher.apply("aqc"), Cow::Owned(_)));
    }

    #[test]
    fn test_replacement_may_equal_input() {
        let r = rule("a", "a", SearchMode::Partial);
        assert_eq!(match_and_replace("banana", &r), "banana");
    }
}
