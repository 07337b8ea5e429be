//! Graph rewriting
//!
//! This module applies a [`RenameRule`] to a [`crate::graph::Graph`]:
//!
//! - [`GraphRewriter`]: scoped traversal of graph inputs, graph outputs and nodes
//! - [`supplement`]: `sor_<op>_<n>` names for nodes that have none
//!
//! # Scope
//!
//! | Mode | Graph inputs | Graph outputs | Node names and node tensors |
//! |------|--------------|---------------|-----------------------------|
//! | `full` | yes | yes | yes |
//! | `inputs` | yes | no | no |
//! | `outputs` | no | yes | no |
//!
//! A tensor is renamed once, at the first site visited, and the new name is
//! seen at all of its reference sites.
//!
//! # Example
//!
//! ```ignore
//! use sor4onnx::transform::{GraphRewriter, RenameMode, RenameRule};
//!
//! let rule = RenameRule::new("output1", "logits").with_mode(RenameMode::Outputs);
//! let stats = GraphRewriter::new(&rule).rewrite(&mut graph);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{RenameError, RenameResult};
use crate::pattern::SearchMode;

pub mod core;
pub mod supplement;

// Re-export main types and functions
pub use core::{GraphRewriter, RewriteStats};
pub use supplement::NameSupplier;

/// Which identifiers a rule may touch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RenameMode {
    /// Graph inputs, graph outputs, node names and node tensors
    #[default]
    Full,
    /// Graph inputs only
    Inputs,
    /// Graph outputs only
    Outputs,
}

impl RenameMode {
    /// Name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameMode::Full => "full",
            RenameMode::Inputs => "inputs",
            RenameMode::Outputs => "outputs",
        }
    }

    /// Whether graph inputs are in scope
    pub fn renames_inputs(&self) -> bool {
        matches!(self, RenameMode::Full | RenameMode::Inputs)
    }

    /// Whether graph outputs are in scope
    pub fn renames_outputs(&self) -> bool {
        matches!(self, RenameMode::Full | RenameMode::Outputs)
    }

    /// Whether node names and node tensors are in scope
    pub fn renames_nodes(&self) -> bool {
        matches!(self, RenameMode::Full)
    }
}

impl FromStr for RenameMode {
    type Err = RenameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(RenameMode::Full),
            "inputs" => Ok(RenameMode::Inputs),
            "outputs" => Ok(RenameMode::Outputs),
            other => Err(RenameError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rename rule: replace `old` by `new` within a scope and search mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    /// Text to look for
    pub old: String,
    /// Replacement text
    pub new: String,
    /// Scope
    pub mode: RenameMode,
    /// How `old` is located
    pub search_mode: SearchMode,
}

impl RenameRule {
    /// Create a rule with `full` scope and exact matching
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            mode: RenameMode::default(),
            search_mode: SearchMode::default(),
        }
    }

    /// Build a rule from an `[old, new]` list
    pub fn from_old_new<S: AsRef<str>>(old_new: &[S]) -> RenameResult<Self> {
        match old_new {
            [old, new] => Ok(Self::new(old.as_ref(), new.as_ref())),
            _ => Err(RenameError::InvalidOldNew {
                count: old_new.len(),
            }),
        }
    }

    /// Set the scope
    pub fn with_mode(mut self, mode: RenameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the search mode
    pub fn with_search_mode(mut self, search_mode: SearchMode) -> Self {
        self.search_mode = search_mode;
        self
    }

    /// An empty `old` under `partial_match` matches nothing
    pub fn is_noop(&self) -> bool {
        self.old.is_empty() && self.search_mode == SearchMode::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!("full".parse::<RenameMode>().unwrap(), RenameMode::Full);
        assert_eq!("outputs".parse::<RenameMode>().unwrap(), RenameMode::Outputs);
        assert!(matches!(
            "nodes".parse::<RenameMode>(),
            Err(RenameError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_mode_scope() {
        assert!(RenameMode::Full.renames_nodes());
        assert!(RenameMode::Inputs.renames_inputs());
        assert!(!RenameMode::Inputs.renames_outputs());
        assert!(!RenameMode::Outputs.renames_nodes());
    }

    #[test]
    fn test_from_old_new() {
        let rule = RenameRule::from_old_new(&["onnx::", ""]).unwrap();
        assert_eq!(rule.old, "onnx::");
        assert_eq!(rule.new, "");
        assert_eq!(rule.mode, RenameMode::Full);
        assert_eq!(rule.search_mode, SearchMode::Exact);

        assert!(matches!(
            RenameRule::from_old_new(&["a"]),
            Err(RenameError::InvalidOldNew { count: 1 })
        ));
        assert!(matches!(
            RenameRule::from_old_new(&["a", "b", "c"]),
            Err(RenameError::InvalidOldNew { count: 3 })
        ));
    }

    #[test]
    fn test_is_noop() {
        assert!(RenameRule::new("", "x")
            .with_search_mode(SearchMode::Partial)
            .is_noop());
        assert!(!RenameRule::new("", "x").is_noop());
        assert!(!RenameRule::new("x", "")
            .with_search_mode(SearchMode::Partial)
            .is_noop());
    }
}
