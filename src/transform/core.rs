//! Scoped identifier rewriting
//!
//! Visits graph inputs, then graph outputs, then every node in stored order
//! (name, inputs, outputs) and applies the rule's matcher at each site.

use std::borrow::Cow;

use rustc_hash::FxHashSet;

use crate::graph::{Graph, TensorId, TensorRegistry};
use crate::pattern::IdentifierMatcher;

use super::supplement::NameSupplier;
use super::RenameRule;

/// Statistics from a rewrite pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteStats {
    /// Node names changed by the rule
    pub node_names_renamed: usize,
    /// Tensors whose name changed
    pub tensors_renamed: usize,
    /// Unnamed nodes that received a generated name
    pub nodes_supplemented: usize,
    /// The generated names, in visitation order
    pub supplemented_names: Vec<String>,
}

impl RewriteStats {
    /// Whether any identifier changed
    pub fn changed(&self) -> bool {
        self.node_names_renamed + self.tensors_renamed + self.nodes_supplemented > 0
    }
}

/// Applies one rename rule to a graph
pub struct GraphRewriter<'r> {
    rule: &'r RenameRule,
    matcher: IdentifierMatcher<'r>,
}

impl<'r> GraphRewriter<'r> {
    /// Create a rewriter for `rule`
    pub fn new(rule: &'r RenameRule) -> Self {
        Self {
            rule,
            matcher: IdentifierMatcher::from_rule(rule),
        }
    }

    /// Rewrite `graph` in place
    ///
    /// Each tensor is considered once, at its first visited site. In `full`
    /// mode unnamed nodes are named afterwards whether or not anything matched.
    pub fn rewrite(&self, graph: &mut Graph) -> RewriteStats {
        let mut stats = RewriteStats::default();
        let mut visited: FxHashSet<TensorId> = FxHashSet::default();
        let mode = self.rule.mode;

        let Graph {
            nodes,
            inputs,
            outputs,
            registry,
            ..
        } = graph;

        if mode.renames_inputs() {
            for gv in inputs.iter() {
                self.visit_tensor(registry, gv.id, &mut visited, &mut stats);
            }
        }

        if mode.renames_outputs() {
            for gv in outputs.iter() {
                self.visit_tensor(registry, gv.id, &mut visited, &mut stats);
            }
        }

        if mode.renames_nodes() {
            for node in nodes.iter_mut() {
                let renamed = match self.matcher.apply(&node.name) {
                    Cow::Owned(new_name) if new_name != node.name => Some(new_name),
                    _ => None,
                };
                if let Some(new_name) = renamed {
                    tracing::debug!(from = %node.name, to = %new_name, "renamed node");
                    node.name = new_name;
                    stats.node_names_renamed += 1;
                }
                for id in node.inputs.iter().chain(node.outputs.iter()).flatten() {
                    self.visit_tensor(registry, *id, &mut visited, &mut stats);
                }
            }
        }

        if mode.renames_nodes() {
            let names = NameSupplier::new(graph).supplement(graph);
            stats.nodes_supplemented = names.len();
            stats.supplemented_names = names;
        }

        tracing::debug!(
            mode = %mode,
            search_mode = %self.rule.search_mode,
            nodes = stats.node_names_renamed,
            tensors = stats.tensors_renamed,
            supplemented = stats.nodes_supplemented,
            "rewrite finished"
        );

        stats
    }

    fn visit_tensor(
        &self,
        registry: &mut TensorRegistry,
        id: TensorId,
        visited: &mut FxHashSet<TensorId>,
        stats: &mut RewriteStats,
    ) {
        if !visited.insert(id) {
            return;
        }

        let current = registry.name(id);
        let renamed = match self.matcher.apply(current) {
            Cow::Owned(new_name) if new_name != current => Some(new_name),
            _ => None,
        };

        if let Some(new_name) = renamed {
            tracing::debug!(from = %registry.name(id), to = %new_name, "renamed tensor");
            registry.rename(id, new_name);
            stats.tensors_renamed += 1;
        }
    }
}
