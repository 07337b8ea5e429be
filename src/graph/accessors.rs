//! Graph queries
//!
//! Producer/consumer lookups, ordering and liveness over a [`Graph`].

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{RenameError, RenameResult};

use super::context::Graph;
use super::maps::TensorId;

/// Tensor → index of the node producing it
pub type ProducerMap = FxHashMap<TensorId, usize>;

/// Tensor → indices of the nodes reading it (operands and captures)
pub type ConsumerMap = FxHashMap<TensorId, SmallVec<[usize; 4]>>;

impl Graph {
    // ========================================================================
    // Lookups
    // ========================================================================

    /// Build the producer map; the first producer wins if a tensor has several
    pub fn producers(&self) -> ProducerMap {
        let mut map = FxHashMap::default();
        for (idx, node) in self.nodes.iter().enumerate() {
            for id in node.defs() {
                map.entry(id).or_insert(idx);
            }
        }
        map
    }

    /// Build the consumer map
    pub fn consumers(&self) -> ConsumerMap {
        let mut map: ConsumerMap = FxHashMap::default();
        for (idx, node) in self.nodes.iter().enumerate() {
            for id in node.uses() {
                map.entry(id).or_default().push(idx);
            }
        }
        map
    }

    /// Non-empty node names currently in the graph
    pub fn node_names(&self) -> FxHashSet<&str> {
        self.nodes
            .iter()
            .filter(|n| !n.name.is_empty())
            .map(|n| n.name.as_str())
            .collect()
    }

    // ========================================================================
    // Ordering and liveness
    // ========================================================================

    /// Topological order of node indices (stable Kahn's algorithm)
    ///
    /// Among ready nodes the one stored first is emitted first, so an already
    /// sorted graph keeps its order.
    pub fn topological_order(&self) -> RenameResult<Vec<usize>> {
        let producers = self.producers();
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); n];

        for (idx, node) in self.nodes.iter().enumerate() {
            for id in node.uses() {
                if let Some(&producer) = producers.get(&id) {
                    if producer == idx {
                        return Err(RenameError::InvalidModel(format!(
                            "node '{}' ({}) consumes its own output '{}'",
                            node.name,
                            node.op_type,
                            self.registry.name(id)
                        )));
                    }
                    in_degree[idx] += 1;
                    successors[producer].push(idx);
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &succ in &successors[idx] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if order.len() != n {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(idx, _)| self.nodes[idx].op_type.as_str())
                .take(5)
                .collect();
            return Err(RenameError::InvalidModel(format!(
                "graph contains a cycle through {} node(s), e.g. {:?}",
                n - order.len(),
                stuck
            )));
        }

        Ok(order)
    }

    /// Mark nodes reachable backwards from the graph outputs
    pub fn live_nodes(&self) -> Vec<bool> {
        let producers = self.producers();
        let mut live = vec![false; self.nodes.len()];
        let mut stack: Vec<TensorId> = self.outputs.iter().map(|gv| gv.id).collect();

        while let Some(id) = stack.pop() {
            if let Some(&idx) = producers.get(&id) {
                if !live[idx] {
                    live[idx] = true;
                    stack.extend(self.nodes[idx].uses());
                }
            }
        }

        live
    }

    /// Tensors referenced by graph inputs, graph outputs or any node
    pub fn referenced_tensors(&self) -> FxHashSet<TensorId> {
        let mut set: FxHashSet<TensorId> = FxHashSet::default();
        set.extend(self.inputs.iter().map(|gv| gv.id));
        set.extend(self.outputs.iter().map(|gv| gv.id));
        for node in &self.nodes {
            set.extend(node.uses());
            set.extend(node.defs());
        }
        set
    }

    // ========================================================================
    // Name checks
    // ========================================================================

    /// Names carried by more than one referenced tensor, with their counts
    pub fn duplicate_tensor_names(&self) -> Vec<(String, usize)> {
        let referenced = self.referenced_tensors();
        let mut ids: Vec<TensorId> = referenced.into_iter().collect();
        ids.sort();

        let mut counts: indexmap::IndexMap<&str, usize> = indexmap::IndexMap::new();
        for id in ids {
            *counts.entry(self.registry.name(id)).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, count)| (name.to_string(), count))
            .collect()
    }

    /// Non-empty node names used by more than one node
    pub fn duplicate_node_names(&self) -> Vec<String> {
        let mut counts: indexmap::IndexMap<&str, usize> = indexmap::IndexMap::new();
        for node in self.nodes.iter().filter(|n| !n.name.is_empty()) {
            *counts.entry(node.name.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}
