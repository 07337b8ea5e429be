//! Static shape inference
//!
//! Propagates element types and shapes from graph inputs, initializers and
//! constants through the nodes of a topologically sorted graph, checks them
//! against the types the model already declares, and records the result in
//! `value_info` and on untyped graph outputs.
//!
//! Operators without a rule leave their outputs untyped; that is never an
//! error. Errors come in two kinds, see [`ShapeInferenceError::is_hard_failure`].
//!
//! ```ignore
//! use sor4onnx::infer::infer_shapes;
//!
//! match infer_shapes(&model) {
//!     Ok(annotated) => save_model(&annotated, "out.onnx")?,
//!     Err(e) => eprintln!("shape check failed: {}", e),
//! }
//! ```

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::proto::{GraphProto, ModelProto, ValueInfoProto};
use crate::tensor::{dtype_name, Dim, TensorType};

pub mod ops;

pub use ops::{constant_value, infer_node, ConstantTable};

/// Why shape inference rejected a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeInferenceError {
    /// The model carries no graph
    #[error("model has no graph")]
    MissingGraph,

    /// Structural problem: undefined or multiply defined tensors
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// A constant tensor needed for inference could not be decoded
    #[error("invalid constant '{name}': {reason}")]
    InvalidConstant {
        /// Tensor name
        name: String,
        /// Decoder message
        reason: String,
    },

    /// Declared and inferred shapes disagree
    #[error("shape mismatch for '{tensor}': declared {declared}, inferred {inferred}")]
    ShapeMismatch {
        /// Tensor name
        tensor: String,
        /// Declared shape
        declared: String,
        /// Inferred shape
        inferred: String,
    },

    /// Declared and inferred element types disagree
    #[error("element type mismatch for '{tensor}': declared {declared}, inferred {inferred}")]
    ElemTypeMismatch {
        /// Tensor name
        tensor: String,
        /// Declared type
        declared: String,
        /// Inferred type
        inferred: String,
    },

    /// Operand shapes cannot be combined by the operator
    #[error("node '{node}' ({op_type}): {reason}")]
    IncompatibleInputs {
        /// Node name, or op type when unnamed
        node: String,
        /// Operator type
        op_type: String,
        /// What went wrong
        reason: String,
    },
}

impl ShapeInferenceError {
    /// A hard failure means the graph itself is broken, as opposed to a
    /// shape conflict between declared and inferred metadata
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            ShapeInferenceError::MissingGraph
                | ShapeInferenceError::MalformedGraph(_)
                | ShapeInferenceError::InvalidConstant { .. }
        )
    }
}

/// Render a shape for messages, e.g. `[batch, 3, ?]`
pub fn format_shape(shape: Option<&[Dim]>) -> String {
    match shape {
        None => "<unranked>".to_string(),
        Some(dims) => {
            let parts: Vec<String> = dims
                .iter()
                .map(|d| match d {
                    Dim::Value(v) => v.to_string(),
                    Dim::Param(p) => p.clone(),
                    Dim::Unknown => "?".to_string(),
                })
                .collect();
            format!("[{}]", parts.join(", "))
        }
    }
}

/// Merge a declared type with an inferred one
///
/// Fails only on hard contradictions: two known extents that differ, two
/// known ranks that differ, or two set element types that differ.
pub fn merge_types(
    tensor: &str,
    declared: &TensorType,
    inferred: &TensorType,
) -> Result<TensorType, ShapeInferenceError> {
    let elem_type = match (declared.elem_type, inferred.elem_type) {
        (0, e) | (e, 0) => e,
        (d, i) if d == i => d,
        (d, i) => {
            return Err(ShapeInferenceError::ElemTypeMismatch {
                tensor: tensor.to_string(),
                declared: dtype_name(d),
                inferred: dtype_name(i),
            })
        }
    };

    let mismatch = || ShapeInferenceError::ShapeMismatch {
        tensor: tensor.to_string(),
        declared: format_shape(declared.shape.as_deref()),
        inferred: format_shape(inferred.shape.as_deref()),
    };

    let shape = match (&declared.shape, &inferred.shape) {
        (None, s) | (s, None) => s.clone(),
        (Some(d), Some(i)) => {
            if d.len() != i.len() {
                return Err(mismatch());
            }
            let mut merged = Vec::with_capacity(d.len());
            for (dd, id) in d.iter().zip(i) {
                let dim = match (dd, id) {
                    (Dim::Value(a), Dim::Value(b)) if a != b => return Err(mismatch()),
                    (Dim::Value(a), _) | (_, Dim::Value(a)) => Dim::Value(*a),
                    (Dim::Param(p), _) | (_, Dim::Param(p)) => Dim::Param(p.clone()),
                    _ => Dim::Unknown,
                };
                merged.push(dim);
            }
            Some(merged)
        }
    };

    Ok(TensorType { elem_type, shape })
}

/// Run shape inference over the main graph of `model`
///
/// The graph must already be in topological order. On success the returned
/// model carries inferred `value_info` for intermediate tensors and types on
/// graph outputs; the input model is left untouched either way.
pub fn infer_shapes(model: &ModelProto) -> Result<ModelProto, ShapeInferenceError> {
    let graph = model
        .graph
        .as_ref()
        .ok_or(ShapeInferenceError::MissingGraph)?;

    let inferred = infer_graph(graph)?;

    let mut out = model.clone();
    if let Some(g) = out.graph.as_mut() {
        apply_inferred(g, inferred);
    }
    Ok(out)
}

/// Inferred types of every node output, in definition order
type InferredTypes = IndexMap<String, TensorType>;

fn infer_graph(graph: &GraphProto) -> Result<InferredTypes, ShapeInferenceError> {
    let mut env: FxHashMap<String, TensorType> = FxHashMap::default();
    let mut constants: ConstantTable = FxHashMap::default();
    let mut defined: FxHashSet<&str> = FxHashSet::default();

    for vi in &graph.input {
        defined.insert(vi.name.as_str());
        if let Some(ty) = TensorType::from_value_info(vi) {
            env.insert(vi.name.clone(), ty);
        }
    }

    for init in &graph.initializer {
        defined.insert(init.name.as_str());
        let ty = TensorType::from_dims(init.data_type, &init.dims);
        let ty = match env.get(&init.name) {
            Some(declared) => merge_types(&init.name, declared, &ty)?,
            None => ty,
        };
        env.insert(init.name.clone(), ty);
        constants.insert(init.name.clone(), init.clone());
    }

    for sparse in &graph.sparse_initializer {
        if let Some(values) = &sparse.values {
            defined.insert(values.name.as_str());
            env.entry(values.name.clone())
                .or_insert_with(|| TensorType::from_dims(values.data_type, &sparse.dims));
        }
    }

    // Types the model already declares for non-input tensors.
    let declared: FxHashMap<&str, TensorType> = graph
        .value_info
        .iter()
        .chain(graph.output.iter())
        .filter_map(|vi| TensorType::from_value_info(vi).map(|t| (vi.name.as_str(), t)))
        .collect();

    let mut inferred = InferredTypes::new();

    for node in &graph.node {
        let mut inputs = Vec::with_capacity(node.input.len());
        for name in &node.input {
            if name.is_empty() {
                inputs.push(None);
                continue;
            }
            if !defined.contains(name.as_str()) {
                return Err(ShapeInferenceError::MalformedGraph(format!(
                    "node '{}' ({}) reads '{}' before it is defined",
                    node.name, node.op_type, name
                )));
            }
            inputs.push(env.get(name));
        }

        let outputs = infer_node(node, &inputs, &constants)?;

        if let Some(value) = constant_value(node) {
            if let Some(out) = node.output.first().filter(|o| !o.is_empty()) {
                constants.insert(out.clone(), value);
            }
        }

        for (name, ty) in node.output.iter().zip(outputs) {
            if name.is_empty() {
                continue;
            }
            if !defined.insert(name.as_str()) {
                return Err(ShapeInferenceError::MalformedGraph(format!(
                    "tensor '{}' is defined more than once",
                    name
                )));
            }

            let resolved = match (declared.get(name.as_str()), ty) {
                (Some(decl), Some(ty)) => Some(merge_types(name, decl, &ty)?),
                (Some(decl), None) => Some(decl.clone()),
                (None, ty) => ty,
            };

            if let Some(ty) = resolved {
                tracing::trace!(
                    tensor = %name,
                    shape = %format_shape(ty.shape.as_deref()),
                    "inferred"
                );
                env.insert(name.clone(), ty.clone());
                inferred.insert(name.clone(), ty);
            }
        }
    }

    for vi in &graph.output {
        if !defined.contains(vi.name.as_str()) {
            return Err(ShapeInferenceError::MalformedGraph(format!(
                "graph output '{}' is never produced",
                vi.name
            )));
        }
    }

    Ok(inferred)
}

fn apply_inferred(graph: &mut GraphProto, mut inferred: InferredTypes) {
    for vi in &mut graph.output {
        if let Some(ty) = inferred.shift_remove(&vi.name) {
            vi.r#type = Some(ty.to_type_proto());
        }
    }

    for vi in &mut graph.value_info {
        if let Some(ty) = inferred.shift_remove(&vi.name) {
            vi.r#type = Some(ty.to_type_proto());
        }
    }

    let inputs: FxHashSet<&str> = graph.input.iter().map(|vi| vi.name.as_str()).collect();
    let added: Vec<ValueInfoProto> = inferred
        .into_iter()
        .filter(|(name, _)| !inputs.contains(name.as_str()))
        .map(|(name, ty)| ValueInfoProto {
            name,
            r#type: Some(ty.to_type_proto()),
            ..Default::default()
        })
        .collect();

    tracing::debug!(added = added.len(), "recorded inferred value_info");
    graph.value_info.extend(added);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_tensor_value_info, make_value_info};
    use crate::proto::TensorProto;

    fn make_model(graph: GraphProto) -> ModelProto {
        ModelProto {
            ir_version: 8,
            graph: Some(graph),
            ..Default::default()
        }
    }

    fn conv_relu_graph() -> GraphProto {
        GraphProto {
            node: vec![
                make_node("Conv", &["X", "W"], &["conv_out"], "conv_0"),
                make_node("Relu", &["conv_out"], &["Y"], "relu_0"),
            ],
            input: vec![make_tensor_value_info("X", 1, &[1, 3, 8, 8])],
            output: vec![make_value_info("Y")],
            initializer: vec![TensorProto {
                name: "W".to_string(),
                dims: vec![4, 3, 3, 3],
                data_type: 1,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_infer_conv_relu() {
        let model = make_model(conv_relu_graph());
        let out = infer_shapes(&model).unwrap();
        let graph = out.graph.unwrap();

        assert_eq!(graph.value_info.len(), 1);
        assert_eq!(graph.value_info[0].name, "conv_out");
        assert_eq!(
            TensorType::from_value_info(&graph.value_info[0]),
            Some(TensorType::from_dims(1, &[1, 4, 6, 6]))
        );
        assert_eq!(
            TensorType::from_value_info(&graph.output[0]),
            Some(TensorType::from_dims(1, &[1, 4, 6, 6]))
        );
    }

    #[test]
    fn test_declared_mismatch_is_conflict() {
        let mut graph = conv_relu_graph();
        graph.output[0] = make_tensor_value_info("Y", 1, &[1, 4, 7, 7]);
        let err = infer_shapes(&make_model(graph)).unwrap_err();

        assert!(matches!(err, ShapeInferenceError::ShapeMismatch { ref tensor, .. } if tensor == "Y"));
        assert!(!err.is_hard_failure());
    }

    #[test]
    fn test_symbolic_declared_is_refined() {
        let mut graph = conv_relu_graph();
        let mut y = make_tensor_value_info("Y", 0, &[]);
        y.r#type = Some(
            TensorType::new(
                0,
                vec![
                    Dim::Param("N".to_string()),
                    Dim::Unknown,
                    Dim::Unknown,
                    Dim::Value(6),
                ],
            )
            .to_type_proto(),
        );
        graph.output[0] = y;

        let out = infer_shapes(&make_model(graph)).unwrap();
        let ty = TensorType::from_value_info(&out.graph.unwrap().output[0]).unwrap();
        assert_eq!(ty.elem_type, 1);
        assert_eq!(
            ty.shape.unwrap(),
            vec![
                Dim::Value(1),
                Dim::Value(4),
                Dim::Value(6),
                Dim::Value(6)
            ]
        );
    }

    #[test]
    fn test_elem_type_mismatch() {
        let declared = TensorType::from_dims(1, &[2]);
        let inferred = TensorType::from_dims(7, &[2]);
        let err = merge_types("t", &declared, &inferred).unwrap_err();
        assert!(matches!(err, ShapeInferenceError::ElemTypeMismatch { .. }));
        assert!(err.to_string().contains("float"));
    }

    #[test]
    fn test_merge_rank_mismatch() {
        let declared = TensorType::from_dims(1, &[2, 3]);
        let inferred = TensorType::from_dims(1, &[6]);
        assert!(merge_types("t", &declared, &inferred).is_err());
        assert!(merge_types("t", &TensorType::unranked(1), &inferred).is_ok());
    }

    #[test]
    fn test_undefined_input_is_hard_failure() {
        let graph = GraphProto {
            node: vec![make_node("Relu", &["missing"], &["Y"], "relu_0")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        };
        let err = infer_shapes(&make_model(graph)).unwrap_err();
        assert!(err.is_hard_failure());
    }

    #[test]
    fn test_missing_graph() {
        let err = infer_shapes(&ModelProto::default()).unwrap_err();
        assert_eq!(err, ShapeInferenceError::MissingGraph);
    }

    #[test]
    fn test_unknown_op_leaves_outputs_untyped() {
        let graph = GraphProto {
            node: vec![
                make_node("MyCustomOp", &["X"], &["mid"], "custom_0"),
                make_node("Relu", &["mid"], &["Y"], "relu_0"),
            ],
            input: vec![make_tensor_value_info("X", 1, &[2, 2])],
            output: vec![make_value_info("Y")],
            ..Default::default()
        };
        let out = infer_shapes(&make_model(graph)).unwrap();
        let graph = out.graph.unwrap();
        assert!(graph.value_info.is_empty());
        assert!(!graph.output[0].has_type());
    }

    #[test]
    fn test_format_shape() {
        let dims = vec![Dim::Param("N".to_string()), Dim::Value(3), Dim::Unknown];
        assert_eq!(format_shape(Some(&dims)), "[N, 3, ?]");
        assert_eq!(format_shape(None), "<unranked>");
    }
}
