//! ONNX model reader
//!
//! Load ONNX models from files or bytes.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use prost::Message;

use crate::error::{RenameError, RenameResult};
use crate::proto::ModelProto;

/// Load an ONNX model from a file path
///
/// The file handle is released before decoding.
pub fn load_model<P: AsRef<Path>>(path: P) -> RenameResult<ModelProto> {
    let path = path.as_ref();
    let io_err = |source| RenameError::Io {
        path: path.to_path_buf(),
        source,
    };

    let buffer = {
        let mut reader = BufReader::new(File::open(path).map_err(io_err)?);
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).map_err(io_err)?;
        buffer
    };

    tracing::debug!(path = %path.display(), bytes = buffer.len(), "loaded model file");
    load_model_from_bytes(&buffer)
}

/// Load an ONNX model from bytes
pub fn load_model_from_bytes(bytes: &[u8]) -> RenameResult<ModelProto> {
    Ok(ModelProto::decode(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::extensions::{make_node, make_value_info};
    use crate::proto::GraphProto;

    fn create_test_model() -> ModelProto {
        ModelProto {
            ir_version: 8,
            producer_name: "test".to_string(),
            graph: Some(GraphProto {
                name: "test_graph".to_string(),
                node: vec![make_node("Relu", &["X"], &["Y"], "relu_0")],
                input: vec![make_value_info("X")],
                output: vec![make_value_info("Y")],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_from_bytes() {
        let model = create_test_model();
        let bytes = model.encode_to_vec();

        let loaded = load_model_from_bytes(&bytes).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_invalid_bytes() {
        let result = load_model_from_bytes(&[0, 1, 2, 3]);
        assert!(matches!(result, Err(RenameError::ProtoDecode(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path().join("absent.onnx")).unwrap_err();
        assert!(matches!(
            err,
            RenameError::Io { ref source, .. } if source.kind() == std::io::ErrorKind::NotFound
        ));
        assert!(err.to_string().contains("absent.onnx"));
    }
}
