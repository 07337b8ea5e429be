//! Names for unnamed nodes
//!
//! Nodes without a name get `sor_<op_type>_<counter>`. One counter serves the
//! whole graph and skips names already in use.

use rustc_hash::FxHashSet;

use crate::graph::Graph;

/// Prefix of generated node names
pub const SUPPLEMENT_PREFIX: &str = "sor";

/// Generates unique node names
#[derive(Debug, Clone)]
pub struct NameSupplier {
    counter: usize,
    taken: FxHashSet<String>,
}

impl NameSupplier {
    /// Create a supplier that avoids every node name already in `graph`
    pub fn new(graph: &Graph) -> Self {
        Self {
            counter: 0,
            taken: graph.node_names().into_iter().map(str::to_string).collect(),
        }
    }

    /// Next free name for an operator type
    pub fn next_name(&mut self, op_type: &str) -> String {
        loop {
            let candidate = format!("{}_{}_{}", SUPPLEMENT_PREFIX, op_type, self.counter);
            self.counter += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Name every unnamed node in stored order, returning the generated names
    pub fn supplement(&mut self, graph: &mut Graph) -> Vec<String> {
        let mut generated = Vec::new();
        for node in graph.nodes.iter_mut().filter(|n| n.name.is_empty()) {
            let name = self.next_name(&node.op_type);
            tracing::debug!(op_type = %node.op_type, name = %name, "supplemented node name");
            node.name = name.clone();
            generated.push(name);
        }
        generated
    }
}
