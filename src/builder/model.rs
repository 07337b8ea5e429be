//! Model assembly
//!
//! Wraps an exported graph in the metadata of the model it came from.

use crate::error::{RenameError, RenameResult};
use crate::graph::Graph;
use crate::proto::{GraphProto, ModelProto};

/// Builds a model from a template model and a replacement graph
#[derive(Debug)]
pub struct ModelBuilder<'a> {
    /// Model supplying IR version, opsets, producer and metadata
    template: &'a ModelProto,
    /// Graph to install
    graph: Option<GraphProto>,
}

impl<'a> ModelBuilder<'a> {
    /// Create a builder around `template`
    pub fn new(template: &'a ModelProto) -> Self {
        Self {
            template,
            graph: None,
        }
    }

    /// Export `graph` as the model's main graph
    pub fn with_graph(mut self, graph: &Graph) -> Self {
        self.graph = Some(graph.to_proto());
        self
    }

    /// Use an already exported graph
    pub fn with_graph_proto(mut self, graph: GraphProto) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Assemble the model
    ///
    /// The template's own graph is never cloned.
    pub fn build(self) -> RenameResult<ModelProto> {
        let graph = self
            .graph
            .ok_or_else(|| RenameError::MissingField("graph".to_string()))?;
        let t = self.template;

        Ok(ModelProto {
            ir_version: t.ir_version,
            opset_import: t.opset_import.clone(),
            producer_name: t.producer_name.clone(),
            producer_version: t.producer_version.clone(),
            domain: t.domain.clone(),
            model_version: t.model_version,
            doc_string: t.doc_string.clone(),
            graph: Some(graph),
            metadata_props: t.metadata_props.clone(),
            training_info: t.training_info.clone(),
            functions: t.functions.clone(),
        })
    }
}

/// Export `graph` into a copy of `template`
pub fn build_model(graph: &Graph, template: &ModelProto) -> RenameResult<ModelProto> {
    ModelBuilder::new(template).with_graph(graph).build()
}
