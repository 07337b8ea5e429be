//! # sor4onnx
//!
//! Simple op/tensor renamer for ONNX models.
//!
//! Renames node names, node input/output tensor names and graph input/output
//! names with one rule `(old, new)`, scoped by a mode (`full`, `inputs`,
//! `outputs`) and located by a search mode (`exact_match`, `partial_match`,
//! `prefix_match`, `suffix_match`). Unnamed nodes receive `sor_<op>_<n>` names.
//! After renaming, the graph is cleaned up, topologically sorted and shape
//! inference is re-run; an inference failure only produces a warning.
//!
//! ## Example
//!
//! ```ignore
//! use sor4onnx::prelude::*;
//!
//! let rule = RenameRule::new("onnx::", "").with_search_mode(SearchMode::Partial);
//! let outcome = Renamer::new(rule)
//!     .input_path("model.onnx")
//!     .output_path("renamed.onnx")
//!     .run()?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod builder;
pub mod console;
pub mod error;
pub mod graph;
pub mod infer;
pub mod io;
pub mod pattern;
pub mod proto;
pub mod reconcile;
pub mod rename;
pub mod tensor;
pub mod traits;
pub mod transform;

// Python bindings (only with python feature)
#[cfg(feature = "python")]
pub mod python;

/// Prelude module - import commonly used types with `use sor4onnx::prelude::*`
pub mod prelude {
    pub use crate::builder::{build_model, ModelBuilder};
    pub use crate::error::{RenameError, RenameResult};
    pub use crate::graph::Graph;
    pub use crate::infer::{infer_shapes, ShapeInferenceError};
    pub use crate::io::{load_model, rename_file, save_model};
    pub use crate::pattern::{match_and_replace, SearchMode};
    pub use crate::proto::ModelProto;
    pub use crate::reconcile::{reconcile, Reconciled};
    pub use crate::rename::{RenameOutcome, Renamer, ShapeStatus};
    pub use crate::traits::{Transformer, TransformerChain};
    pub use crate::transform::{GraphRewriter, RenameMode, RenameRule, RewriteStats};
}

pub use error::{RenameError, RenameResult};
pub use rename::Renamer;
pub use traits::Transformer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
