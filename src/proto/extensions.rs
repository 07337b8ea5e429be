//! Extension methods for ONNX protobuf types
//!
//! Provides convenient helper methods for working with ONNX protobuf types.

use super::onnx::*;

// ============================================================================
// ModelProto extensions
// ============================================================================

impl ModelProto {
    /// Get the opset version for the default domain
    pub fn get_opset_version(&self) -> Option<i64> {
        self.opset_import
            .iter()
            .find(|op| op.domain.is_empty() || op.domain == "ai.onnx")
            .map(|op| op.version)
    }
}

// ============================================================================
// NodeProto extensions
// ============================================================================

impl NodeProto {
    /// Get attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeProto> {
        self.attribute.iter().find(|attr| attr.name == name)
    }

    /// Get integer attribute value with default
    pub fn get_attribute_int(&self, name: &str, default: i64) -> i64 {
        self.get_attribute(name).map(|a| a.i).unwrap_or(default)
    }

    /// Get repeated int attribute
    pub fn get_attribute_ints(&self, name: &str) -> Option<&[i64]> {
        self.get_attribute(name).map(|a| a.ints.as_slice())
    }

    /// Get string attribute value
    pub fn get_attribute_string(&self, name: &str) -> Option<&[u8]> {
        self.get_attribute(name).map(|a| a.s.as_slice())
    }

    /// Get tensor attribute value
    pub fn get_attribute_tensor(&self, name: &str) -> Option<&TensorProto> {
        self.get_attribute(name).and_then(|a| a.t.as_ref())
    }

    /// Check if this node has a specific op type
    pub fn is_op_type(&self, op_type: &str) -> bool {
        self.op_type == op_type
    }

    /// Check if this node belongs to the default operator domain
    pub fn is_default_domain(&self) -> bool {
        self.domain.is_empty() || self.domain == "ai.onnx"
    }
}

// ============================================================================
// ValueInfoProto extensions
// ============================================================================

impl ValueInfoProto {
    /// Get the element type if this is a tensor type
    pub fn get_elem_type(&self) -> Option<i32> {
        self.r#type.as_ref().and_then(|t| {
            t.value.as_ref().and_then(|v| match v {
                type_proto::Value::TensorType(tensor) => Some(tensor.elem_type),
                _ => None,
            })
        })
    }

    /// Check whether any type information is attached
    pub fn has_type(&self) -> bool {
        self.r#type
            .as_ref()
            .map(|t| t.value.is_some())
            .unwrap_or(false)
    }
}

// ============================================================================
// AttributeProto extensions
// ============================================================================

impl AttributeProto {
    /// Create a new integer attribute
    pub fn new_int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            i: value,
            r#type: attribute_proto::AttributeType::Int as i32,
            ..Default::default()
        }
    }

    /// Create a new ints attribute
    pub fn new_ints(name: &str, values: Vec<i64>) -> Self {
        Self {
            name: name.to_string(),
            ints: values,
            r#type: attribute_proto::AttributeType::Ints as i32,
            ..Default::default()
        }
    }

    /// Create a new tensor attribute
    pub fn new_tensor(name: &str, tensor: TensorProto) -> Self {
        Self {
            name: name.to_string(),
            t: Some(tensor),
            r#type: attribute_proto::AttributeType::Tensor as i32,
            ..Default::default()
        }
    }

    /// Create a new subgraph attribute
    pub fn new_graph(name: &str, graph: GraphProto) -> Self {
        Self {
            name: name.to_string(),
            g: Some(graph),
            r#type: attribute_proto::AttributeType::Graph as i32,
            ..Default::default()
        }
    }

    /// Iterate over every subgraph held by this attribute
    pub fn subgraphs(&self) -> impl Iterator<Item = &GraphProto> {
        self.g.iter().chain(self.graphs.iter())
    }

    /// Iterate mutably over every subgraph held by this attribute
    pub fn subgraphs_mut(&mut self) -> impl Iterator<Item = &mut GraphProto> {
        self.g.iter_mut().chain(self.graphs.iter_mut())
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Create a new ValueInfoProto for a tensor
pub fn make_tensor_value_info(name: &str, elem_type: i32, shape: &[i64]) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type,
                shape: Some(TensorShapeProto {
                    dim: shape
                        .iter()
                        .map(|&d| tensor_shape_proto::Dimension {
                            value: Some(tensor_shape_proto::dimension::Value::DimValue(d)),
                            denotation: String::new(),
                        })
                        .collect(),
                }),
            })),
            denotation: String::new(),
        }),
        ..Default::default()
    }
}

/// Create a ValueInfoProto carrying only a name
pub fn make_value_info(name: &str) -> ValueInfoProto {
    ValueInfoProto {
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create a new NodeProto
pub fn make_node(op_type: &str, inputs: &[&str], outputs: &[&str], name: &str) -> NodeProto {
    NodeProto {
        op_type: op_type.to_string(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        name: name.to_string(),
        ..Default::default()
    }
}

/// Create an int64 TensorProto
pub fn make_tensor_i64(name: &str, dims: &[i64], values: &[i64]) -> TensorProto {
    TensorProto {
        name: name.to_string(),
        dims: dims.to_vec(),
        data_type: tensor_proto::DataType::Int64 as i32,
        int64_data: values.to_vec(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_get_attribute() {
        let mut node = NodeProto::default();
        node.attribute.push(AttributeProto::new_int("axis", 1));

        assert_eq!(node.get_attribute_int("axis", 0), 1);
        assert_eq!(node.get_attribute_int("missing", 99), 99);
    }

    #[test]
    fn test_opset_version_accepts_both_default_domains() {
        let mut model = ModelProto::default();
        model.opset_import.push(OperatorSetIdProto {
            domain: "ai.onnx".to_string(),
            version: 13,
        });
        assert_eq!(model.get_opset_version(), Some(13));
    }

    #[test]
    fn test_make_tensor_value_info() {
        let vi = make_tensor_value_info("test", 1, &[1, 3, 224, 224]);
        assert_eq!(vi.name, "test");
        assert_eq!(vi.get_elem_type(), Some(1));
        assert!(vi.has_type());
        assert!(!make_value_info("bare").has_type());
    }

    #[test]
    fn test_attribute_subgraphs() {
        let mut attr = AttributeProto::new_graph("then_branch", GraphProto::default());
        attr.graphs.push(GraphProto::default());
        assert_eq!(attr.subgraphs().count(), 2);
        assert_eq!(AttributeProto::new_int("axis", 0).subgraphs().count(), 0);
    }

    #[test]
    fn test_make_node() {
        let node = make_node("Conv", &["X", "W"], &["Y"], "conv_0");
        assert_eq!(node.op_type, "Conv");
        assert_eq!(node.input, vec!["X", "W"]);
        assert_eq!(node.output, vec!["Y"]);
        assert!(node.is_default_domain());
    }
}
