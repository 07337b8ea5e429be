//! ONNX model validation
//!
//! Structural checks on a serialized model: every node input is defined before
//! use, every tensor is defined once, every graph output is produced. Unnamed
//! and duplicate node names are reported as warnings.

use rustc_hash::FxHashSet;

use crate::error::{RenameError, RenameResult};
use crate::proto::{GraphProto, ModelProto};

/// Validation result with detailed issues
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the model is valid
    pub is_valid: bool,
    /// List of errors (critical issues)
    pub errors: Vec<String>,
    /// List of warnings (non-critical issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    /// Add a warning
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merge with another result
    pub fn merge(&mut self, other: ValidationResult) {
        if !other.is_valid {
            self.is_valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate an ONNX model
pub fn validate_model(model: &ModelProto) -> ValidationResult {
    let mut result = ValidationResult::valid();

    if model.opset_import.is_empty() {
        result.add_warning("No opset imports specified");
    }

    match &model.graph {
        Some(graph) => result.merge(validate_graph(graph)),
        None => result.add_error("Model does not contain a graph"),
    }

    result
}

/// Validate a graph whose nodes are expected in topological order
pub fn validate_graph(graph: &GraphProto) -> ValidationResult {
    let mut result = ValidationResult::valid();
    let mut defined: FxHashSet<&str> = FxHashSet::default();

    for input in &graph.input {
        if input.name.is_empty() {
            result.add_error("Graph input has empty name");
        } else {
            defined.insert(input.name.as_str());
        }
    }
    for init in &graph.initializer {
        defined.insert(init.name.as_str());
    }

    let mut node_names: FxHashSet<&str> = FxHashSet::default();

    for (idx, node) in graph.node.iter().enumerate() {
        if node.name.is_empty() {
            result.add_warning(format!("Node {} ({}) has no name", idx, node.op_type));
        } else if !node_names.insert(node.name.as_str()) {
            result.add_warning(format!("Duplicate node name '{}'", node.name));
        }

        for input in node.input.iter().filter(|i| !i.is_empty()) {
            if !defined.contains(input.as_str()) {
                result.add_error(format!(
                    "Node '{}' ({}): input '{}' not found",
                    node.name, node.op_type, input
                ));
            }
        }

        for output in node.output.iter().filter(|o| !o.is_empty()) {
            if !defined.insert(output.as_str()) {
                result.add_error(format!(
                    "Duplicate output '{}' in node '{}'",
                    output, node.name
                ));
            }
        }
    }

    for output in &graph.output {
        if output.name.is_empty() {
            result.add_error("Graph output has empty name");
        } else if !defined.contains(output.name.as_str()) {
            result.add_error(format!(
                "Graph output '{}' not produced by any node",
                output.name
            ));
        }
    }

    result
}

/// Quick validation that returns an error if invalid
pub fn check_model(model: &ModelProto) -> RenameResult<()> {
    let result = validate_model(model);
    if result.is_valid {
        Ok(())
    } else {
        Err(RenameError::InvalidModel(result.errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_value_info};

    fn make_valid_graph() -> GraphProto {
        GraphProto {
            name: "test".to_string(),
            node: vec![make_node("Relu", &["X"], &["Y"], "relu_0")],
            input: vec![make_value_info("X")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_valid_model() {
        let model = ModelProto {
            ir_version: 8,
            graph: Some(make_valid_graph()),
            ..Default::default()
        };

        let result = validate_model(&model);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(check_model(&model).is_ok());
    }

    #[test]
    fn test_validate_missing_graph() {
        let result = validate_model(&ModelProto::default());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("graph")));
    }

    #[test]
    fn test_validate_missing_input() {
        let graph = GraphProto {
            node: vec![make_node("Relu", &["missing"], &["Y"], "relu_0")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        };

        let result = validate_graph(&graph);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("missing")));
    }

    #[test]
    fn test_validate_duplicate_output() {
        let graph = GraphProto {
            node: vec![
                make_node("Relu", &["X"], &["dup"], "relu_0"),
                make_node("Relu", &["X"], &["dup"], "relu_1"),
            ],
            input: vec![make_value_info("X")],
            output: vec![make_value_info("dup")],
            ..Default::default()
        };

        let result = validate_graph(&graph);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_node_name_warnings() {
        let graph = GraphProto {
            node: vec![
                make_node("Relu", &["X"], &["a"], "same"),
                make_node("Relu", &["a"], &["b"], "same"),
                make_node("Relu", &["b"], &["Y"], ""),
            ],
            input: vec![make_value_info("X")],
            output: vec![make_value_info("Y")],
            ..Default::default()
        };

        let result = validate_graph(&graph);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 2);
    }
}
