//! Tensor registry
//!
//! Every tensor of the graph gets a [`TensorId`] when it is imported. Nodes and
//! side tables hold ids, and the registry owns the single copy of each name.

use rustc_hash::FxHashMap;

/// Stable identity of a tensor within one [`super::Graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(u32);

impl TensorId {
    /// Position of the tensor in the registry
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A registered tensor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    /// Current name
    pub name: String,
}

/// Maps tensor ids to names and names back to the first id that carried them
#[derive(Debug, Clone, Default)]
pub struct TensorRegistry {
    tensors: Vec<Tensor>,
    index: FxHashMap<String, TensorId>,
}

impl TensorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered tensors
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Return the id for `name`, registering a new tensor on first sight
    pub fn intern(&mut self, name: &str) -> TensorId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = TensorId(self.tensors.len() as u32);
        self.tensors.push(Tensor {
            name: name.to_string(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Look up a tensor by its current name
    pub fn get(&self, name: &str) -> Option<TensorId> {
        self.index.get(name).copied()
    }

    /// Whether some tensor currently carries `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Current name of a tensor
    pub fn name(&self, id: TensorId) -> &str {
        &self.tensors[id.index()].name
    }

    /// Give a tensor a new name
    ///
    /// If another tensor already carries `new_name` the index keeps pointing at
    /// that one; collisions are reported by [`super::Graph::duplicate_tensor_names`].
    pub fn rename(&mut self, id: TensorId, new_name: String) {
        let tensor = &mut self.tensors[id.index()];
        if tensor.name == new_name {
            return;
        }
        if self.index.get(&tensor.name) == Some(&id) {
            self.index.remove(&tensor.name);
        }
        self.index.entry(new_name.clone()).or_insert(id);
        tensor.name = new_name;
    }

    /// Iterate over all tensors in registration order
    pub fn iter(&self) -> impl Iterator<Item = (TensorId, &Tensor)> {
        self.tensors
            .iter()
            .enumerate()
            .map(|(i, t)| (TensorId(i as u32), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut registry = TensorRegistry::new();
        let a = registry.intern("x");
        let b = registry.intern("y");
        assert_ne!(a, b);
        assert_eq!(registry.intern("x"), a);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_rename_updates_index() {
        let mut registry = TensorRegistry::new();
        let a = registry.intern("x");
        registry.rename(a, "renamed".to_string());

        assert_eq!(registry.name(a), "renamed");
        assert_eq!(registry.get("renamed"), Some(a));
        assert!(!registry.contains_name("x"));
    }

    #[test]
    fn test_rename_onto_existing_name_keeps_first_owner() {
        let mut registry = TensorRegistry::new();
        let a = registry.intern("a");
        let b = registry.intern("b");
        registry.rename(b, "a".to_string());

        assert_eq!(registry.name(b), "a");
        assert_eq!(registry.get("a"), Some(a));
        assert!(!registry.contains_name("b"));
    }
}
