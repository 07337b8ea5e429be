//! ONNX model writer
//!
//! Save ONNX models to files or bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use prost::Message;

use crate::error::{RenameError, RenameResult};
use crate::proto::ModelProto;

/// Save an ONNX model to a file
///
/// Filesystem failures surface as [`RenameError::Io`] carrying the path.
pub fn save_model<P: AsRef<Path>>(model: &ModelProto, path: P) -> RenameResult<()> {
    let path = path.as_ref();
    let io_err = |source| RenameError::Io {
        path: path.to_path_buf(),
        source,
    };

    let bytes = model_to_bytes(model);
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    writer.write_all(&bytes).map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote model file");
    Ok(())
}

/// Encode an ONNX model to bytes
pub fn model_to_bytes(model: &ModelProto) -> Vec<u8> {
    model.encode_to_vec()
}
