//! Core traits for sor4onnx
//!
//! Defines the model-level transformation interface.

use crate::error::RenameResult;
use crate::proto::ModelProto;

/// Transformer trait for model transformations
///
/// A [`crate::rename::Renamer`] is a transformer, so several rename rules can
/// be applied in sequence through a [`TransformerChain`].
///
/// # Example
///
/// ```ignore
/// struct MyTransformer;
///
/// impl Transformer for MyTransformer {
///     fn transform(&self, model: ModelProto) -> RenameResult<ModelProto> {
///         Ok(model)
///     }
/// }
/// ```
pub trait Transformer {
    /// Transform the given model
    fn transform(&self, model: ModelProto) -> RenameResult<ModelProto>;
}

/// Chainable transformer that applies multiple transformers in sequence
pub struct TransformerChain {
    transformers: Vec<Box<dyn Transformer>>,
}

impl TransformerChain {
    /// Create a new empty transformer chain
    pub fn new() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Add a transformer to the chain
    #[allow(clippy::should_implement_trait)]
    pub fn add<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    /// Number of transformers in the chain
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl Default for TransformerChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for TransformerChain {
    fn transform(&self, mut model: ModelProto) -> RenameResult<ModelProto> {
        for transformer in &self.transformers {
            model = transformer.transform(model)?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenameError;

    struct BumpVersion;

    impl Transformer for BumpVersion {
        fn transform(&self, mut model: ModelProto) -> RenameResult<ModelProto> {
            model.model_version += 1;
            Ok(model)
        }
    }

    struct Fail;

    impl Transformer for Fail {
        fn transform(&self, _model: ModelProto) -> RenameResult<ModelProto> {
            Err(RenameError::Internal("boom".to_string()))
        }
    }

    #[test]
    fn test_transformer_chain() {
        let chain = TransformerChain::new().add(BumpVersion).add(BumpVersion);
        assert_eq!(chain.len(), 2);

        let model = chain.transform(ModelProto::default()).unwrap();
        assert_eq!(model.model_version, 2);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let chain = TransformerChain::new().add(Fail).add(BumpVersion);
        assert!(chain.transform(ModelProto::default()).is_err());
        assert!(TransformerChain::default().is_empty());
    }
}
