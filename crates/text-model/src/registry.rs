//! Model registry.
//!
//! A [`ModelRegistry`] owns a set of [`TextModel`]s and hands out their ids. Ids come from a
//! per-registry counter, so two registries never share state and ids are never reused within
//! one registry.

use crate::model::TextModel;
use crate::options::TextModelOptions;
use std::collections::BTreeMap;

/// Opaque identifier for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(u64);

impl ModelId {
    /// Wrap a raw id. Models built outside a registry pick their own.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Owns models and allocates their ids.
#[derive(Debug)]
pub struct ModelRegistry {
    models: BTreeMap<ModelId, TextModel>,
    next_id: u64,
    options: TextModelOptions,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(TextModelOptions::default())
    }
}

impl ModelRegistry {
    /// Create an empty registry; new models start with `options`.
    pub fn new(options: TextModelOptions) -> Self {
        Self {
            models: BTreeMap::new(),
            next_id: 1,
            options,
        }
    }

    /// Create a model holding `text`.
    pub fn create_model(&mut self, text: &str) -> ModelId {
        self.create_model_with_options(text, self.options)
    }

    /// Create a model holding `text` with explicit options.
    pub fn create_model_with_options(&mut self, text: &str, options: TextModelOptions) -> ModelId {
        let id = ModelId(self.next_id);
        self.next_id += 1;
        self.models.insert(id, TextModel::new(id, text, options));
        tracing::debug!(model = id.get(), "created text model");
        id
    }

    /// Look up a model.
    pub fn get(&self, id: ModelId) -> Option<&TextModel> {
        self.models.get(&id)
    }

    /// Look up a model mutably.
    pub fn get_mut(&mut self, id: ModelId) -> Option<&mut TextModel> {
        self.models.get_mut(&id)
    }

    /// Dispose and drop a model. Returns `false` for unknown ids.
    pub fn destroy_model(&mut self, id: ModelId) -> bool {
        match self.models.remove(&id) {
            Some(mut model) => {
                model.dispose();
                tracing::debug!(model = id.get(), "destroyed text model");
                true
            }
            None => false,
        }
    }

    /// Ids of all live models, ascending.
    pub fn model_ids(&self) -> Vec<ModelId> {
        self.models.keys().copied().collect()
    }

    /// Number of live models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// `true` if the registry holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_not_reused() {
        let mut registry = ModelRegistry::default();
        let a = registry.create_model("a");
        let b = registry.create_model("b");
        assert_ne!(a, b);
        assert!(registry.destroy_model(a));
        assert!(!registry.destroy_model(a));
        let c = registry.create_model("c");
        assert_ne!(a, c);
        assert_eq!(registry.model_ids(), vec![b, c]);
    }

    #[test]
    fn test_registries_are_independent() {
        let mut first = ModelRegistry::default();
        let mut second = ModelRegistry::default();
        assert_eq!(first.create_model(""), second.create_model(""));
    }

    #[test]
    fn test_get_mut_edits_model() {
        let mut registry = ModelRegistry::default();
        let id = registry.create_model("hello");
        let model = registry.get_mut(id).unwrap();
        assert_eq!(model.id(), id);
        model.set_value("bye").unwrap();
        assert_eq!(registry.get(id).unwrap().value().unwrap(), "bye");
    }
}
