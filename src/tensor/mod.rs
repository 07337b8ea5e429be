//! Tensor utilities for ONNX models
//!
//! This module provides utilities for working with ONNX tensors:
//! - Data type mappings (`dtype`)
//! - Static shape/type metadata (`shape`)
//! - Decoding constant integer tensors into ndarray (`convert`)

pub mod convert;
pub mod dtype;
pub mod shape;

// Re-export commonly used items
pub use convert::{tensor_to_array_i64, tensor_to_vec_i64};
pub use dtype::{dtype_name, dtype_size, i32_to_dtype};
pub use shape::{broadcast_dims, normalize_axis, numel, Dim, TensorType};
