//! ONNX I/O module
//!
//! This module provides functions for loading, saving, and validating ONNX models.
//!
//! # Example
//!
//! ```ignore
//! use sor4onnx::io::{load_model, rename_file, save_model};
//! use sor4onnx::transform::RenameRule;
//!
//! // Load and save
//! let model = load_model("input.onnx")?;
//! save_model(&model, "output.onnx")?;
//!
//! // One-shot rename
//! let outcome = rename_file("input.onnx", "renamed.onnx", RenameRule::new("output1", "logits"))?;
//! ```

pub mod reader;
pub mod validation;
pub mod writer;

// Re-exports
pub use reader::{load_model, load_model_from_bytes};
pub use validation::{check_model, validate_graph, validate_model, ValidationResult};
pub use writer::{model_to_bytes, save_model};

use std::path::Path;

use crate::error::RenameResult;
use crate::rename::{RenameOutcome, Renamer};
use crate::transform::RenameRule;

/// Apply `rule` to the model at `input` and save it to `output`
///
/// Console output is suppressed; inspect the returned outcome instead.
pub fn rename_file<P1: AsRef<Path>, P2: AsRef<Path>>(
    input: P1,
    output: P2,
    rule: RenameRule,
) -> RenameResult<RenameOutcome> {
    Renamer::new(rule)
        .input_path(input)
        .output_path(output)
        .non_verbose(true)
        .run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::SearchMode;
    use crate::proto::extensions::{make_node, make_value_info};
    use crate::proto::{GraphProto, ModelProto};

    fn make_test_model() -> ModelProto {
        ModelProto {
            ir_version: 8,
            graph: Some(GraphProto {
                name: "test_graph".to_string(),
                node: vec![
                    make_node("Identity", &["onnx::X"], &["onnx::mid"], "onnx::Identity_0"),
                    make_node("Relu", &["onnx::mid"], &["Y"], ""),
                ],
                input: vec![make_value_info("onnx::X")],
                output: vec![make_value_info("Y")],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_rename_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.onnx");
        let output = dir.path().join("out.onnx");
        save_model(&make_test_model(), &input).unwrap();

        let rule = RenameRule::new("onnx::", "").with_search_mode(SearchMode::Prefix);
        let outcome = rename_file(&input, &output, rule).unwrap();
        assert_eq!(outcome.rewrite.tensors_renamed, 2);

        let loaded = load_model(&output).unwrap();
        assert!(check_model(&loaded).is_ok());
        let graph = loaded.graph.unwrap();
        assert_eq!(graph.node[0].name, "Identity_0");
        assert_eq!(graph.node[0].input, vec!["X"]);
        assert_eq!(graph.node[1].name, "sor_Relu_0");
    }
}
