//! In-memory graph model
//!
//! This module converts between `GraphProto` and a mutable [`Graph`]:
//!
//! - [`maps`]: the tensor registry (`TensorId` → name)
//! - [`context`]: `Graph`, `Node` and import/export
//! - [`accessors`]: producer/consumer maps, topological order, liveness
//! - [`mutators`]: cleanup, toposort and renaming
//!
//! # Identity
//!
//! Nodes are identified by position and tensors by [`TensorId`]. Names are
//! metadata: renaming a tensor changes one registry entry and every reference
//! site picks it up on export.
//!
//! ```ignore
//! use sor4onnx::graph::Graph;
//!
//! let mut graph = Graph::from_model(&model)?;
//! graph.cleanup();
//! graph.toposort()?;
//! if let Some(id) = graph.registry.get("onnx::Conv_0") {
//!     graph.rename_tensor(id, "conv_in");
//! }
//! let proto = graph.to_proto();
//! ```

pub mod accessors;
pub mod context;
pub mod maps;
pub mod mutators;

// Re-export main types
pub use accessors::{ConsumerMap, ProducerMap};
pub use context::{Annotation, Capture, Graph, GraphValue, Node, Operands};
pub use maps::{Tensor, TensorId, TensorRegistry};
pub use mutators::CleanupStats;
