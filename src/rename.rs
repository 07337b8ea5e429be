//! One rename invocation, end to end
//!
//! [`Renamer`] loads a model (from a path or from memory), normalizes it,
//! applies one [`RenameRule`], validates the resulting names, reconciles the
//! graph and optionally saves it.
//!
//! ```ignore
//! use sor4onnx::rename::Renamer;
//! use sor4onnx::transform::RenameRule;
//! use sor4onnx::pattern::SearchMode;
//!
//! let rule = RenameRule::new("onnx::", "").with_search_mode(SearchMode::Partial);
//! let outcome = Renamer::new(rule)
//!     .input_path("model.onnx")
//!     .output_path("renamed.onnx")
//!     .run()?;
//! println!("{} tensors renamed", outcome.rewrite.tensors_renamed);
//! ```

use std::path::{Path, PathBuf};

use crate::console::Console;
use crate::error::{RenameError, RenameResult};
use crate::graph::{CleanupStats, Graph};
use crate::infer::ShapeInferenceError;
use crate::io::{load_model, save_model};
use crate::proto::ModelProto;
use crate::reconcile::{normalize, reconcile, Reconciled};
use crate::traits::Transformer;
use crate::transform::{GraphRewriter, RenameRule, RewriteStats};

/// Printed when the renamed model fails shape inference
pub const SHAPE_WARNING: &str = "The input shape of the next OP does not match the output shape. \
     Be sure to open the .onnx file to verify the certainty of the geometry.";

/// Outcome of the shape check
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeStatus {
    /// Inferred shapes agree with the declared ones
    Verified,
    /// Inference failed; the model was kept without annotations
    Unverified(ShapeInferenceError),
}

/// Everything a rename invocation produced
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    /// The renamed model
    pub model: ModelProto,
    /// What the rewriter changed
    pub rewrite: RewriteStats,
    /// What cleanup removed, before and after rewriting
    pub cleanup: CleanupStats,
    /// Shape check result
    pub shape_status: ShapeStatus,
}

impl RenameOutcome {
    /// Whether shapes were verified
    pub fn shapes_verified(&self) -> bool {
        self.shape_status == ShapeStatus::Verified
    }
}

/// Builder for one rename invocation
#[derive(Debug, Clone)]
pub struct Renamer {
    rule: RenameRule,
    input_path: Option<PathBuf>,
    model: Option<ModelProto>,
    output_path: Option<PathBuf>,
    non_verbose: bool,
}

impl Renamer {
    /// Start an invocation of `rule`
    pub fn new(rule: RenameRule) -> Self {
        Self {
            rule,
            input_path: None,
            model: None,
            output_path: None,
            non_verbose: false,
        }
    }

    /// Read the model from a file
    pub fn input_path(mut self, path: impl AsRef<Path>) -> Self {
        self.input_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Use an in-memory model; takes precedence over `input_path`
    pub fn model(mut self, model: ModelProto) -> Self {
        self.model = Some(model);
        self
    }

    /// Save the result to a file
    pub fn output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Suppress info and warning lines
    pub fn non_verbose(mut self, non_verbose: bool) -> Self {
        self.non_verbose = non_verbose;
        self
    }

    /// The rule this invocation applies
    pub fn rule(&self) -> &RenameRule {
        &self.rule
    }

    /// Run the invocation
    pub fn run(&self) -> RenameResult<RenameOutcome> {
        let loaded;
        let source = match (&self.model, &self.input_path) {
            (Some(model), _) => model,
            (None, Some(path)) => {
                loaded = load_model(path)?;
                &loaded
            }
            (None, None) => return Err(RenameError::MissingInput),
        };
        self.apply(source)
    }

    fn apply(&self, source: &ModelProto) -> RenameResult<RenameOutcome> {
        let console = Console::from_non_verbose(self.non_verbose);

        if self.rule.is_noop() {
            console.warn("old_new[0] is empty with partial_match, no identifier will be renamed.");
        }

        let mut graph = Graph::from_model(source)?;
        let mut cleanup = normalize(&mut graph)?;

        let rewrite = GraphRewriter::new(&self.rule).rewrite(&mut graph);
        check_names(&graph, &console)?;

        let (reconciled, post) = reconcile(&mut graph, source)?;
        cleanup.merge(post);

        let (model, shape_status) = match reconciled {
            Reconciled::Verified(model) => (model, ShapeStatus::Verified),
            Reconciled::Unverified { model, reason } => {
                console.warn(SHAPE_WARNING);
                console.warn(format!("Shape inference: {}", reason));
                (model, ShapeStatus::Unverified(reason))
            }
        };

        if let Some(path) = &self.output_path {
            save_model(&model, path)?;
            tracing::debug!(path = %path.display(), "saved renamed model");
        }

        console.info("Finish!");

        Ok(RenameOutcome {
            model,
            rewrite,
            cleanup,
            shape_status,
        })
    }
}

impl Transformer for Renamer {
    fn transform(&self, model: ModelProto) -> RenameResult<ModelProto> {
        Ok(self.apply(&model)?.model)
    }
}

/// Reject tensor-name collisions, including captures a subgraph would
/// resolve to its own tensor; warn about duplicate node names
fn check_names(graph: &Graph, console: &Console) -> RenameResult<()> {
    if let Some((name, count)) = graph.duplicate_tensor_names().into_iter().next() {
        return Err(RenameError::NameCollision { name, count });
    }
    if let Some((node, name)) = graph.shadowed_captures().into_iter().next() {
        tracing::debug!(node = %node, name = %name, "renamed capture shadowed by subgraph");
        return Err(RenameError::NameCollision { name, count: 2 });
    }
    for name in graph.duplicate_node_names() {
        console.warn(format!("Node name '{}' is used by more than one node.", name));
    }
    Ok(())
}
