//! Post-rewrite consistency
//!
//! Cleanup drops nodes and side-table entries that no longer reach a graph
//! output, toposort restores producer-before-consumer order, and shape
//! inference re-checks tensor metadata. Inference is best effort: when it
//! fails the model is still returned, tagged [`Reconciled::Unverified`].

use crate::builder::build_model;
use crate::error::RenameResult;
use crate::graph::{CleanupStats, Graph};
use crate::infer::{infer_shapes, ShapeInferenceError};
use crate::proto::ModelProto;

/// Result of reconciling a rewritten graph
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Shape inference succeeded; the model carries inferred value_info
    Verified(ModelProto),
    /// Shape inference failed; the model is exported without annotations
    Unverified {
        /// The exported model
        model: ModelProto,
        /// Why inference gave up
        reason: ShapeInferenceError,
    },
}

impl Reconciled {
    /// Whether shapes were verified
    pub fn is_verified(&self) -> bool {
        matches!(self, Reconciled::Verified(_))
    }

    /// The reconciled model
    pub fn model(&self) -> &ModelProto {
        match self {
            Reconciled::Verified(model) | Reconciled::Unverified { model, .. } => model,
        }
    }

    /// Inference failure, if any
    pub fn reason(&self) -> Option<&ShapeInferenceError> {
        match self {
            Reconciled::Verified(_) => None,
            Reconciled::Unverified { reason, .. } => Some(reason),
        }
    }

    /// Take the model
    pub fn into_model(self) -> ModelProto {
        match self {
            Reconciled::Verified(model) | Reconciled::Unverified { model, .. } => model,
        }
    }
}

/// Cleanup followed by toposort
pub fn normalize(graph: &mut Graph) -> RenameResult<CleanupStats> {
    let stats = graph.cleanup();
    graph.toposort()?;
    Ok(stats)
}

/// Normalize `graph`, export it into `template` and re-infer shapes
pub fn reconcile(
    graph: &mut Graph,
    template: &ModelProto,
) -> RenameResult<(Reconciled, CleanupStats)> {
    let stats = normalize(graph)?;
    let model = build_model(graph, template)?;

    let reconciled = match infer_shapes(&model) {
        Ok(annotated) => {
            tracing::debug!("shape inference succeeded");
            Reconciled::Verified(annotated)
        }
        Err(reason) => {
            tracing::info!(
                hard = reason.is_hard_failure(),
                %reason,
                "shape inference failed, keeping unannotated model"
            );
            Reconciled::Unverified { model, reason }
        }
    };

    Ok((reconciled, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenameError;
    use crate::proto::extensions::{make_node, make_tensor_value_info, make_value_info};
    use crate::proto::GraphProto;

    fn make_model(graph: GraphProto) -> ModelProto {
        ModelProto {
            ir_version: 8,
            graph: Some(graph),
            ..Default::default()
        }
    }

    #[test]
    fn test_reconcile_sorts_and_prunes() {
        let model = make_model(GraphProto {
            node: vec![
                make_node("Relu", &["mid"], &["Y"], "second"),
                make_node("Abs", &["X"], &["mid"], "first"),
                make_node("Neg", &["X"], &["unused"], "dead"),
            ],
            input: vec![make_tensor_value_info("X", 1, &[2, 2])],
            output: vec![make_value_info("Y")],
            ..Default::default()
        });
        let mut graph = Graph::from_model(&model).unwrap();

        let (reconciled, stats) = reconcile(&mut graph, &model).unwrap();
        assert!(reconciled.is_verified());
        assert_eq!(stats.nodes_removed, 1);

        let g = reconciled.into_model().graph.unwrap();
        let names: Vec<&str> = g.node.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(g.output[0].has_type());
    }

    #[test]
    fn test_reconcile_falls_back_on_conflict() {
        let model = make_model(GraphProto {
            node: vec![make_node("Relu", &["X"], &["Y"], "relu")],
            input: vec![make_tensor_value_info("X", 1, &[2, 2])],
            output: vec![make_tensor_value_info("Y", 1, &[3, 3])],
            ..Default::default()
        });
        let mut graph = Graph::from_model(&model).unwrap();

        let (reconciled, _) = reconcile(&mut graph, &model).unwrap();
        assert!(!reconciled.is_verified());
        assert!(!reconciled.reason().unwrap().is_hard_failure());
        assert!(reconciled.model().graph.as_ref().unwrap().value_info.is_empty());
    }

    #[test]
    fn test_cycle_is_fatal() {
        let model = make_model(GraphProto {
            node: vec![
                make_node("Add", &["X", "b"], &["a"], "n0"),
                make_node("Relu", &["a"], &["b"], "n1"),
            ],
            input: vec![make_value_info("X")],
            output: vec![make_value_info("b")],
            ..Default::default()
        });
        let mut graph = Graph::from_model(&model).unwrap();
        assert!(matches!(
            normalize(&mut graph),
            Err(RenameError::InvalidModel(_))
        ));
    }
}
