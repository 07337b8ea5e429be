//! Model assembly
//!
//! After a [`crate::graph::Graph`] has been rewritten and normalized, the
//! builder wraps its export in the IR version, opset imports, producer fields,
//! functions and metadata of the model it was loaded from.
//!
//! # Example
//!
//! ```ignore
//! use sor4onnx::builder::{build_model, ModelBuilder};
//!
//! let model = ModelBuilder::new(&original).with_graph(&graph).build()?;
//!
//! // Or using the simple function
//! let model = build_model(&graph, &original)?;
//! ```

pub mod model;

// Re-export main types and functions
pub use model::{build_model, ModelBuilder};
