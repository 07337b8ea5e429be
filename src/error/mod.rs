//! Error types for sor4onnx
//!
//! This module defines the error type shared by the loader, the rewriter and the
//! reconciler. Shape-inference problems have their own type in [`crate::infer`]
//! because they are recoverable.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for rename operations
#[derive(Error, Debug)]
pub enum RenameError {
    /// Neither an input path nor an in-memory model was given
    #[error("One of input_onnx_file_path or onnx_graph must be specified.")]
    MissingInput,

    /// `old_new` did not contain exactly two strings
    #[error("old_new must be two strings [old, new], got {count}.")]
    InvalidOldNew {
        /// Number of strings supplied
        count: usize,
    },

    /// Unknown rename scope
    #[error("mode must be one of full, inputs or outputs, got '{0}'.")]
    InvalidMode(String),

    /// Unknown search mode
    #[error(
        "search_mode must be one of exact_match, partial_match, prefix_match or suffix_match, got '{0}'."
    )]
    InvalidSearchMode(String),

    /// Invalid or unreadable model
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Two distinct tensors ended up with the same name
    #[error("Renaming produced a duplicate tensor name '{name}' shared by {count} tensors")]
    NameCollision {
        /// The colliding name
        name: String,
        /// How many live tensors carry it
        count: usize,
    },

    /// Invalid tensor data type
    #[error("Invalid data type: {0}")]
    InvalidDataType(i32),

    /// Constant tensor could not be decoded
    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    /// Reading or writing a model file failed
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        /// The file being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a ModelProto
    #[error("Failed to decode ONNX model: {0}")]
    ProtoDecode(#[from] prost::DecodeError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RenameError {
    /// Whether the error stems from bad arguments rather than a bad model
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RenameError::MissingInput
                | RenameError::InvalidOldNew { .. }
                | RenameError::InvalidMode(_)
                | RenameError::InvalidSearchMode(_)
        )
    }
}

/// Result type alias for rename operations
pub type RenameResult<T> = Result<T, RenameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenameError::InvalidMode("nodes".to_string());
        assert!(err.to_string().contains("nodes"));

        let err = RenameError::InvalidOldNew { count: 3 };
        assert!(err.to_string().contains("two strings"));
    }

    #[test]
    fn test_name_collision_display() {
        let err = RenameError::NameCollision {
            name: "y".to_string(),
            count: 2,
        };
        assert!(err.to_string().contains("'y'"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = RenameError::Io {
            path: PathBuf::from("model.onnx"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("model.onnx"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_config_errors() {
        assert!(RenameError::MissingInput.is_config_error());
        assert!(RenameError::InvalidSearchMode("x".to_string()).is_config_error());
        assert!(!RenameError::InvalidModel("x".to_string()).is_config_error());
    }
}
