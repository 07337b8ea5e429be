//! In-memory graph
//!
//! `Graph` is the mutable form of a `GraphProto`. Nodes and graph-level
//! inputs/outputs refer to tensors by [`TensorId`], so a rename in the
//! registry reaches every reference site on export.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{RenameError, RenameResult};
use crate::proto::onnx::{SparseTensorProto, StringStringEntryProto, TensorAnnotation};
use crate::proto::{AttributeProto, GraphProto, ModelProto, NodeProto, TensorProto, ValueInfoProto};

use super::maps::{TensorId, TensorRegistry};

/// Input or output slots of a node; `None` is an omitted optional operand
pub type Operands = SmallVec<[Option<TensorId>; 4]>;

/// An outer-graph tensor referenced from inside a subgraph attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// The captured tensor
    pub id: TensorId,
    /// The name the subgraph bodies use for it
    pub name: String,
}

/// One operator instance
#[derive(Debug, Clone)]
pub struct Node {
    /// Node name, may be empty
    pub name: String,
    /// Operator type
    pub op_type: String,
    /// Operator domain
    pub domain: String,
    /// Input slots
    pub inputs: Operands,
    /// Output slots
    pub outputs: Operands,
    /// Outer tensors used by subgraph attributes
    pub captures: SmallVec<[Capture; 2]>,
    /// Attributes, kept as-is apart from captured names inside subgraphs
    pub attribute: Vec<AttributeProto>,
    /// Doc string
    pub doc_string: String,
    /// Function overload
    pub overload: String,
    /// Metadata properties
    pub metadata_props: Vec<StringStringEntryProto>,
}

impl Node {
    /// Every tensor this node reads, operands first, then captures
    pub fn uses(&self) -> impl Iterator<Item = TensorId> + '_ {
        self.inputs
            .iter()
            .flatten()
            .copied()
            .chain(self.captures.iter().map(|c| c.id))
    }

    /// Every tensor this node produces
    pub fn defs(&self) -> impl Iterator<Item = TensorId> + '_ {
        self.outputs.iter().flatten().copied()
    }
}

/// A graph-level input or output declaration
#[derive(Debug, Clone)]
pub struct GraphValue {
    /// The declared tensor
    pub id: TensorId,
    /// Declared type info; its name is replaced by the registry name on export
    pub info: ValueInfoProto,
}

/// A quantization annotation with its parameter tensors
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Annotated tensor
    pub tensor: TensorId,
    /// Parameter key → parameter tensor
    pub params: Vec<(String, TensorId)>,
}

/// Mutable graph with explicit tensor identity
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in stored order
    pub nodes: Vec<Node>,
    /// Graph inputs
    pub inputs: Vec<GraphValue>,
    /// Graph outputs
    pub outputs: Vec<GraphValue>,
    /// Tensor names
    pub registry: TensorRegistry,
    /// Intermediate value_info
    pub value_info: IndexMap<TensorId, ValueInfoProto>,
    /// Initializers
    pub initializers: IndexMap<TensorId, TensorProto>,
    /// Sparse initializers, keyed by the tensor their `values` name
    pub sparse_initializers: IndexMap<TensorId, SparseTensorProto>,
    /// Quantization annotations
    pub annotations: Vec<Annotation>,
    /// Doc string
    pub doc_string: String,
    /// Metadata properties
    pub metadata_props: Vec<StringStringEntryProto>,
}

impl Graph {
    /// Import the main graph of a model
    pub fn from_model(model: &ModelProto) -> RenameResult<Self> {
        let graph = model
            .graph
            .as_ref()
            .ok_or_else(|| RenameError::MissingField("model.graph".to_string()))?;
        Ok(Self::from_proto(graph))
    }

    /// Import a GraphProto
    pub fn from_proto(proto: &GraphProto) -> Self {
        let mut registry = TensorRegistry::new();

        let inputs: Vec<GraphValue> = proto
            .input
            .iter()
            .map(|vi| GraphValue {
                id: registry.intern(&vi.name),
                info: vi.clone(),
            })
            .collect();

        let initializers: IndexMap<TensorId, TensorProto> = proto
            .initializer
            .iter()
            .map(|t| (registry.intern(&t.name), t.clone()))
            .collect();

        let sparse_initializers: IndexMap<TensorId, SparseTensorProto> = proto
            .sparse_initializer
            .iter()
            .map(|s| {
                let name = s.values.as_ref().map(|v| v.name.as_str()).unwrap_or("");
                (registry.intern(name), s.clone())
            })
            .collect();

        let mut nodes: Vec<Node> = proto
            .node
            .iter()
            .map(|n| Node {
                name: n.name.clone(),
                op_type: n.op_type.clone(),
                domain: n.domain.clone(),
                inputs: intern_operands(&mut registry, &n.input),
                outputs: intern_operands(&mut registry, &n.output),
                captures: SmallVec::new(),
                attribute: n.attribute.clone(),
                doc_string: n.doc_string.clone(),
                overload: n.overload.clone(),
                metadata_props: n.metadata_props.clone(),
            })
            .collect();

        let outputs: Vec<GraphValue> = proto
            .output
            .iter()
            .map(|vi| GraphValue {
                id: registry.intern(&vi.name),
                info: vi.clone(),
            })
            .collect();

        let value_info: IndexMap<TensorId, ValueInfoProto> = proto
            .value_info
            .iter()
            .map(|vi| (registry.intern(&vi.name), vi.clone()))
            .collect();

        let annotations = proto
            .quantization_annotation
            .iter()
            .map(|a| Annotation {
                tensor: registry.intern(&a.tensor_name),
                params: a
                    .quant_parameter_tensor_names
                    .iter()
                    .map(|kv| (kv.key.clone(), registry.intern(&kv.value)))
                    .collect(),
            })
            .collect();

        // Subgraph bodies may read any tensor of this graph.
        for node in &mut nodes {
            let mut free = Vec::new();
            for attr in &node.attribute {
                for sub in attr.subgraphs() {
                    collect_free_names(sub, &mut free);
                }
            }
            let mut seen = FxHashSet::default();
            for name in free {
                if let Some(id) = registry.get(&name) {
                    if seen.insert(id) {
                        node.captures.push(Capture { id, name });
                    }
                }
            }
        }

        tracing::trace!(
            nodes = nodes.len(),
            tensors = registry.len(),
            "imported graph '{}'",
            proto.name
        );

        Self {
            name: proto.name.clone(),
            nodes,
            inputs,
            outputs,
            registry,
            value_info,
            initializers,
            sparse_initializers,
            annotations,
            doc_string: proto.doc_string.clone(),
            metadata_props: proto.metadata_props.clone(),
        }
    }

    /// Export back to a GraphProto using the current tensor names
    pub fn to_proto(&self) -> GraphProto {
        let name_of = |id: TensorId| self.registry.name(id).to_string();
        let named = |gv: &GraphValue| ValueInfoProto {
            name: name_of(gv.id),
            ..gv.info.clone()
        };

        GraphProto {
            node: self.nodes.iter().map(|n| self.export_node(n)).collect(),
            name: self.name.clone(),
            initializer: self
                .initializers
                .iter()
                .map(|(&id, t)| TensorProto {
                    name: name_of(id),
                    ..t.clone()
                })
                .collect(),
            sparse_initializer: self
                .sparse_initializers
                .iter()
                .map(|(&id, s)| {
                    let mut s = s.clone();
                    if let Some(values) = s.values.as_mut() {
                        values.name = name_of(id);
                    }
                    s
                })
                .collect(),
            doc_string: self.doc_string.clone(),
            input: self.inputs.iter().map(named).collect(),
            output: self.outputs.iter().map(named).collect(),
            value_info: self
                .value_info
                .iter()
                .map(|(&id, vi)| ValueInfoProto {
                    name: name_of(id),
                    ..vi.clone()
                })
                .collect(),
            quantization_annotation: self
                .annotations
                .iter()
                .map(|a| TensorAnnotation {
                    tensor_name: name_of(a.tensor),
                    quant_parameter_tensor_names: a
                        .params
                        .iter()
                        .map(|(key, id)| StringStringEntryProto {
                            key: key.clone(),
                            value: name_of(*id),
                        })
                        .collect(),
                })
                .collect(),
            metadata_props: self.metadata_props.clone(),
        }
    }

    /// Captured tensors whose current name is defined inside a subgraph that
    /// reads them, so the reference would resolve to the local tensor on export
    ///
    /// Returns `(node name, tensor name)` pairs.
    pub fn shadowed_captures(&self) -> Vec<(String, String)> {
        let mut shadowed = Vec::new();
        for node in &self.nodes {
            let renames: FxHashMap<String, String> = node
                .captures
                .iter()
                .filter(|c| self.registry.name(c.id) != c.name)
                .map(|c| (c.name.clone(), self.registry.name(c.id).to_string()))
                .collect();
            if renames.is_empty() {
                continue;
            }
            for attr in &node.attribute {
                for sub in attr.subgraphs() {
                    if let Some(name) = rebound_name(sub, &renames) {
                        shadowed.push((node.name.clone(), name));
                    }
                }
            }
        }
        shadowed
    }

    fn export_node(&self, node: &Node) -> NodeProto {
        let operand_names = |ops: &Operands| -> Vec<String> {
            ops.iter()
                .map(|op| op.map(|id| self.registry.name(id).to_string()).unwrap_or_default())
                .collect()
        };

        let renames: FxHashMap<String, String> = node
            .captures
            .iter()
            .filter(|c| self.registry.name(c.id) != c.name)
            .map(|c| (c.name.clone(), self.registry.name(c.id).to_string()))
            .collect();

        let mut attribute = node.attribute.clone();
        if !renames.is_empty() {
            for attr in &mut attribute {
                for sub in attr.subgraphs_mut() {
                    rename_free_names(sub, &renames);
                }
            }
        }

        NodeProto {
            input: operand_names(&node.inputs),
            output: operand_names(&node.outputs),
            name: node.name.clone(),
            op_type: node.op_type.clone(),
            domain: node.domain.clone(),
            overload: node.overload.clone(),
            attribute,
            doc_string: node.doc_string.clone(),
            metadata_props: node.metadata_props.clone(),
        }
    }
}

fn intern_operands(registry: &mut TensorRegistry, names: &[String]) -> Operands {
    names
        .iter()
        .map(|name| {
            if name.is_empty() {
                None
            } else {
                Some(registry.intern(name))
            }
        })
        .collect()
}

/// Names defined inside a graph body: inputs, initializers and node outputs
fn local_names(graph: &GraphProto) -> FxHashSet<&str> {
    let mut local: FxHashSet<&str> = FxHashSet::default();
    local.extend(graph.input.iter().map(|vi| vi.name.as_str()));
    local.extend(graph.initializer.iter().map(|t| t.name.as_str()));
    local.extend(
        graph
            .sparse_initializer
            .iter()
            .filter_map(|s| s.values.as_ref().map(|v| v.name.as_str())),
    );
    for node in &graph.node {
        local.extend(node.output.iter().map(String::as_str));
    }
    local
}

/// Collect names a subgraph reads without defining them, in first-use order
fn collect_free_names(graph: &GraphProto, out: &mut Vec<String>) {
    let local = local_names(graph);

    for node in &graph.node {
        for input in &node.input {
            if !input.is_empty() && !local.contains(input.as_str()) {
                out.push(input.clone());
            }
        }
        for attr in &node.attribute {
            for sub in attr.subgraphs() {
                let mut nested = Vec::new();
                collect_free_names(sub, &mut nested);
                out.extend(
                    nested
                        .into_iter()
                        .filter(|name| !local.contains(name.as_str())),
                );
            }
        }
    }

    for output in &graph.output {
        if !local.contains(output.name.as_str()) {
            out.push(output.name.clone());
        }
    }
}

/// First renamed capture that `graph` (or a nested body) would resolve locally
fn rebound_name(graph: &GraphProto, renames: &FxHashMap<String, String>) -> Option<String> {
    let local = local_names(graph);
    let mut free = Vec::new();
    collect_free_names(graph, &mut free);

    for (old, new) in renames {
        if local.contains(new.as_str()) && free.iter().any(|name| name == old) {
            return Some(new.clone());
        }
    }

    let effective: FxHashMap<String, String> = renames
        .iter()
        .filter(|(old, _)| !local.contains(old.as_str()))
        .map(|(old, new)| (old.clone(), new.clone()))
        .collect();
    if effective.is_empty() {
        return None;
    }
    graph
        .node
        .iter()
        .flat_map(|node| node.attribute.iter())
        .flat_map(|attr| attr.subgraphs())
        .find_map(|sub| rebound_name(sub, &effective))
}

/// Rename captured outer names inside a subgraph, respecting local shadowing
fn rename_free_names(graph: &mut GraphProto, renames: &FxHashMap<String, String>) {
    let effective: FxHashMap<String, String> = {
        let local = local_names(graph);
        renames
            .iter()
            .filter(|(old, _)| !local.contains(old.as_str()))
            .map(|(old, new)| (old.clone(), new.clone()))
            .collect()
    };
    if effective.is_empty() {
        return;
    }

    for node in &mut graph.node {
        for input in &mut node.input {
            if let Some(new) = effective.get(input.as_str()) {
                *input = new.clone();
            }
        }
        for attr in &mut node.attribute {
            for sub in attr.subgraphs_mut() {
                rename_free_names(sub, &effective);
            }
        }
    }
    for vi in graph.output.iter_mut().chain(graph.value_info.iter_mut()) {
        if let Some(new) = effective.get(vi.name.as_str()) {
            vi.name = new.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info, make_value_info};

    fn make_test_graph() -> GraphProto {
        GraphProto {
            name: "g".to_string(),
            node: vec![
                make_node("Conv", &["X", "W", ""], &["conv_out"], "conv_0"),
                make_node("Relu", &["conv_out"], &["Y"], ""),
            ],
            input: vec![make_tensor_value_info("X", 1, &[1, 3, 8, 8])],
            output: vec![make_value_info("Y")],
            initializer: vec![TensorProto {
                name: "W".to_string(),
                dims: vec![4, 3, 3, 3],
                data_type: 1,
                ..Default::default()
            }],
            value_info: vec![make_value_info("conv_out")],
            ..Default::default()
        }
    }

    #[test]
    fn test_import_shares_ids() {
        let graph = Graph::from_proto(&make_test_graph());
        let conv_out = graph.registry.get("conv_out").unwrap();

        assert_eq!(graph.nodes[0].outputs[0], Some(conv_out));
        assert_eq!(graph.nodes[1].inputs[0], Some(conv_out));
        assert_eq!(graph.nodes[0].inputs[2], None);
        assert!(graph.value_info.contains_key(&conv_out));
    }

    #[test]
    fn test_roundtrip_is_lossless() {
        let proto = make_test_graph();
        let graph = Graph::from_proto(&proto);
        assert_eq!(graph.to_proto(), proto);
    }

    #[test]
    fn test_rename_reaches_every_site() {
        let mut graph = Graph::from_proto(&make_test_graph());
        let w = graph.registry.get("W").unwrap();
        let conv_out = graph.registry.get("conv_out").unwrap();
        graph.registry.rename(w, "weight".to_string());
        graph.registry.rename(conv_out, "features".to_string());

        let proto = graph.to_proto();
        assert_eq!(proto.node[0].input, vec!["X", "weight", ""]);
        assert_eq!(proto.node[0].output, vec!["features"]);
        assert_eq!(proto.node[1].input, vec!["features"]);
        assert_eq!(proto.initializer[0].name, "weight");
        assert_eq!(proto.value_info[0].name, "features");
    }

    #[test]
    fn test_missing_graph() {
        let model = ModelProto::default();
        assert!(matches!(
            Graph::from_model(&model),
            Err(RenameError::MissingField(_))
        ));
    }

    fn make_if_graph() -> GraphProto {
        // then_branch reads outer "X"; else_branch shadows "X" with its own node output.
        let then_branch = GraphProto {
            name: "then".to_string(),
            node: vec![make_node("Relu", &["X"], &["t_out"], "t_relu")],
            output: vec![make_value_info("t_out")],
            ..Default::default()
        };
        let else_branch = GraphProto {
            name: "else".to_string(),
            node: vec![
                make_node("Constant", &[], &["X"], "e_const"),
                make_node("Neg", &["X"], &["e_out"], "e_neg"),
            ],
            output: vec![make_value_info("e_out")],
            ..Default::default()
        };
        let mut if_node = make_node("If", &["cond"], &["Y"], "if_0");
        if_node.attribute = vec![
            AttributeProto::new_graph("then_branch", then_branch),
            AttributeProto::new_graph("else_branch", else_branch),
        ];

        GraphProto {
            node: vec![if_node],
            input: vec![make_value_info("cond"), make_value_info("X")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        }
    }

    #[test]
    fn test_captures_recorded() {
        let graph = Graph::from_proto(&make_if_graph());
        let x = graph.registry.get("X").unwrap();
        assert_eq!(
            graph.nodes[0].captures.as_slice(),
            &[Capture {
                id: x,
                name: "X".to_string()
            }]
        );
        assert_eq!(graph.nodes[0].uses().count(), 2);
    }

    #[test]
    fn test_capture_renamed_onto_local_name() {
        let then_branch = GraphProto {
            name: "then".to_string(),
            node: vec![
                make_node("Constant", &[], &["X"], "t_const"),
                make_node("Add", &["onnx::X", "X"], &["t_out"], "t_add"),
            ],
            output: vec![make_value_info("t_out")],
            ..Default::default()
        };
        let mut if_node = make_node("If", &["cond"], &["Y"], "if_0");
        if_node.attribute = vec![AttributeProto::new_graph("then_branch", then_branch)];
        let mut graph = Graph::from_proto(&GraphProto {
            node: vec![if_node],
            input: vec![make_value_info("cond"), make_value_info("onnx::X")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        });
        assert!(graph.shadowed_captures().is_empty());

        let x = graph.registry.get("onnx::X").unwrap();
        graph.registry.rename(x, "X".to_string());
        assert_eq!(
            graph.shadowed_captures(),
            vec![("if_0".to_string(), "X".to_string())]
        );

        graph.registry.rename(x, "image".to_string());
        assert!(graph.shadowed_captures().is_empty());
    }

    #[test]
    fn test_captured_rename_respects_shadowing() {
        let mut graph = Graph::from_proto(&make_if_graph());
        let x = graph.registry.get("X").unwrap();
        graph.registry.rename(x, "image".to_string());

        let proto = graph.to_proto();
        let attrs = &proto.node[0].attribute;
        let then_branch = attrs[0].g.as_ref().unwrap();
        let else_branch = attrs[1].g.as_ref().unwrap();

        assert_eq!(then_branch.node[0].input, vec!["image"]);
        assert_eq!(else_branch.node[1].input, vec!["X"]);
        assert_eq!(proto.input[1].name, "image");
    }
}
