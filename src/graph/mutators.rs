//! Graph mutation operations
//!
//! Dead-code elimination, reordering and tensor renaming.

use crate::error::RenameResult;

use super::context::Graph;
use super::maps::TensorId;

/// What a cleanup pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Nodes not contributing to any graph output
    pub nodes_removed: usize,
    /// Unreferenced initializers
    pub initializers_removed: usize,
    /// Unreferenced sparse initializers
    pub sparse_initializers_removed: usize,
    /// Unreferenced value_info entries
    pub value_info_removed: usize,
    /// Annotations of removed tensors
    pub annotations_removed: usize,
}

impl CleanupStats {
    /// Total number of removed items
    pub fn total(&self) -> usize {
        self.nodes_removed
            + self.initializers_removed
            + self.sparse_initializers_removed
            + self.value_info_removed
            + self.annotations_removed
    }

    /// Accumulate another pass
    pub fn merge(&mut self, other: CleanupStats) {
        self.nodes_removed += other.nodes_removed;
        self.initializers_removed += other.initializers_removed;
        self.sparse_initializers_removed += other.sparse_initializers_removed;
        self.value_info_removed += other.value_info_removed;
        self.annotations_removed += other.annotations_removed;
    }
}

impl Graph {
    /// Remove nodes that do not reach a graph output, then prune side tables
    ///
    /// Graph inputs are never removed.
    pub fn cleanup(&mut self) -> CleanupStats {
        let mut stats = CleanupStats::default();

        let live = self.live_nodes();
        let before = self.nodes.len();
        let mut flags = live.into_iter();
        self.nodes.retain(|_| flags.next().unwrap_or(true));
        stats.nodes_removed = before - self.nodes.len();

        let mut referenced = self.referenced_tensors();

        let before = self.annotations.len();
        self.annotations.retain(|a| referenced.contains(&a.tensor));
        stats.annotations_removed = before - self.annotations.len();
        // Quantization parameters of surviving annotations stay alive.
        let params: Vec<TensorId> = self
            .annotations
            .iter()
            .flat_map(|a| a.params.iter().map(|(_, id)| *id))
            .collect();
        referenced.extend(params);

        let before = self.initializers.len();
        self.initializers.retain(|id, _| referenced.contains(id));
        stats.initializers_removed = before - self.initializers.len();

        let before = self.sparse_initializers.len();
        self.sparse_initializers
            .retain(|id, _| referenced.contains(id));
        stats.sparse_initializers_removed = before - self.sparse_initializers.len();

        let before = self.value_info.len();
        self.value_info.retain(|id, _| referenced.contains(id));
        stats.value_info_removed = before - self.value_info.len();

        if stats.total() > 0 {
            tracing::debug!(
                nodes = stats.nodes_removed,
                initializers = stats.initializers_removed,
                value_info = stats.value_info_removed,
                "cleanup removed unused elements"
            );
        }

        stats
    }

    /// Reorder nodes topologically
    pub fn toposort(&mut self) -> RenameResult<()> {
        let order = self.topological_order()?;
        if order.iter().enumerate().all(|(pos, &idx)| pos == idx) {
            return Ok(());
        }

        let mut slots: Vec<Option<_>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.nodes = order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect();

        tracing::debug!(nodes = self.nodes.len(), "reordered nodes topologically");
        Ok(())
    }

    /// Rename a tensor at every reference site
    pub fn rename_tensor(&mut self, id: TensorId, new_name: impl Into<String>) {
        self.registry.rename(id, new_name.into());
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::proto::extensions::{make_node, make_value_info};
    use crate::proto::onnx::TensorAnnotation;
    use crate::proto::onnx::StringStringEntryProto;
    use crate::proto::{GraphProto, TensorProto};

    fn make_dead_branch_graph() -> GraphProto {
        GraphProto {
            node: vec![
                make_node("Add", &["X", "bias"], &["sum"], "add_0"),
                make_node("Mul", &["X", "scale"], &["unused"], "dead_0"),
                make_node("Relu", &["sum"], &["Y"], "relu_0"),
            ],
            input: vec![make_value_info("X"), make_value_info("spare")],
            output: vec![make_value_info("Y")],
            initializer: vec![
                TensorProto {
                    name: "bias".to_string(),
                    ..Default::default()
                },
                TensorProto {
                    name: "scale".to_string(),
                    ..Default::default()
                },
            ],
            value_info: vec![make_value_info("sum"), make_value_info("unused")],
            quantization_annotation: vec![TensorAnnotation {
                tensor_name: "unused".to_string(),
                quant_parameter_tensor_names: vec![StringStringEntryProto {
                    key: "SCALE_TENSOR".to_string(),
                    value: "scale".to_string(),
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_cleanup_removes_dead_branch() {
        let mut graph = Graph::from_proto(&make_dead_branch_graph());
        let stats = graph.cleanup();

        assert_eq!(stats.nodes_removed, 1);
        assert_eq!(stats.initializers_removed, 1);
        assert_eq!(stats.value_info_removed, 1);
        assert_eq!(stats.annotations_removed, 1);

        let proto = graph.to_proto();
        let names: Vec<&str> = proto.node.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["add_0", "relu_0"]);
        assert_eq!(proto.initializer.len(), 1);
        assert_eq!(proto.initializer[0].name, "bias");
        // Unused graph inputs survive.
        assert_eq!(proto.input.len(), 2);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut graph = Graph::from_proto(&make_dead_branch_graph());
        graph.cleanup();
        assert_eq!(graph.cleanup().total(), 0);
    }

    #[test]
    fn test_toposort_reorders() {
        let mut proto = make_dead_branch_graph();
        proto.node.swap(0, 2);
        let mut graph = Graph::from_proto(&proto);
        graph.toposort().unwrap();

        assert_eq!(graph.nodes[0].name, "dead_0");
        assert_eq!(graph.nodes[1].name, "add_0");
        assert_eq!(graph.nodes[2].name, "relu_0");
    }

    #[test]
    fn test_rename_tensor() {
        let mut graph = Graph::from_proto(&make_dead_branch_graph());
        let sum = graph.registry.get("sum").unwrap();
        graph.rename_tensor(sum, "total");

        let proto = graph.to_proto();
        assert_eq!(proto.node[0].output, vec!["total"]);
        assert_eq!(proto.node[2].input, vec!["total"]);
        assert_eq!(proto.value_info[0].name, "total");
    }
}
