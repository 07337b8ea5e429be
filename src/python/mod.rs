//! Python bindings for sor4onnx using PyO3
//!
//! # Usage from Python
//!
//! ```python
//! import onnx
//! import sor4onnx
//!
//! # From a file, saving the result
//! sor4onnx.rename(
//!     ["onnx::", ""],
//!     input_onnx_file_path="model.onnx",
//!     output_onnx_file_path="renamed.onnx",
//!     search_mode="partial_match",
//! )
//!
//! # From an in-memory model
//! data = sor4onnx.rename(
//!     ["output1", "logits"],
//!     onnx_graph=onnx.load("model.onnx").SerializeToString(),
//!     mode="outputs",
//! )
//! renamed = onnx.load_from_string(data)
//! ```

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::error::RenameError;
use crate::io::{load_model_from_bytes, model_to_bytes};
use crate::pattern::SearchMode;
use crate::rename::Renamer;
use crate::transform::{RenameMode, RenameRule};

fn to_py_err(err: RenameError) -> PyErr {
    match err {
        e if e.is_config_error() => PyValueError::new_err(e.to_string()),
        e @ RenameError::NameCollision { .. } => PyValueError::new_err(e.to_string()),
        e @ (RenameError::Io { .. }
        | RenameError::InvalidModel(_)
        | RenameError::ProtoDecode(_)
        | RenameError::MissingField(_)) => PyIOError::new_err(e.to_string()),
        e => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Rename node names and tensor names of an ONNX model.
///
/// Args:
///     old_new: [old, new], the text to look for and its replacement
///     input_onnx_file_path: Path to the input model
///     onnx_graph: Serialized ModelProto; takes precedence over the path
///     output_onnx_file_path: Where to save the result (optional)
///     mode: "full", "inputs" or "outputs"
///     search_mode: "exact_match", "partial_match", "prefix_match" or "suffix_match"
///     non_verbose: Only show errors
///
/// Returns:
///     The renamed model, serialized
///
/// Raises:
///     ValueError: On invalid arguments or a tensor-name collision
///     IOError: If the model cannot be read or written
#[pyfunction]
#[pyo3(signature = (
    old_new,
    input_onnx_file_path = None,
    onnx_graph = None,
    output_onnx_file_path = None,
    mode = "full",
    search_mode = "exact_match",
    non_verbose = false,
))]
#[allow(clippy::too_many_arguments)]
fn rename<'py>(
    py: Python<'py>,
    old_new: Vec<String>,
    input_onnx_file_path: Option<String>,
    onnx_graph: Option<Bound<'py, PyBytes>>,
    output_onnx_file_path: Option<String>,
    mode: &str,
    search_mode: &str,
    non_verbose: bool,
) -> PyResult<Bound<'py, PyBytes>> {
    let mode: RenameMode = mode.parse().map_err(to_py_err)?;
    let search_mode: SearchMode = search_mode.parse().map_err(to_py_err)?;
    let rule = RenameRule::from_old_new(old_new.as_slice())
        .map_err(to_py_err)?
        .with_mode(mode)
        .with_search_mode(search_mode);

    let mut renamer = Renamer::new(rule).non_verbose(non_verbose);
    if let Some(bytes) = &onnx_graph {
        renamer = renamer.model(load_model_from_bytes(bytes.as_bytes()).map_err(to_py_err)?);
    }
    if let Some(path) = &input_onnx_file_path {
        renamer = renamer.input_path(path);
    }
    if let Some(path) = &output_onnx_file_path {
        renamer = renamer.output_path(path);
    }

    let outcome = renamer.run().map_err(to_py_err)?;
    Ok(PyBytes::new_bound(py, &model_to_bytes(&outcome.model)))
}

/// Get the version of this library.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Python module for renaming ONNX identifiers.
#[pymodule]
#[pyo3(name = "sor4onnx")]
fn sor4onnx_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(rename, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
