#![forbid(unsafe_code)]

//! Model definitions and live instances.
//!
//! A [`ModelStore`] is an explicit registry: definitions keyed by name and
//! live instances keyed by [`ModelId`]. There is no process-wide store; an
//! application owns one and tears it down explicitly.
//!
//! Instances are created on first lookup and forgotten when destroyed, so the
//! next lookup of a destroyed identity creates a fresh, empty instance.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::definition::ModelDefinition;
use crate::error::{ModelError, Result};
use crate::logging::debug;
use crate::model::Model;
use crate::params::{ModelId, Params};
use crate::version::VersionClock;

#[derive(Default)]
pub(crate) struct StoreShared {
    definitions: RefCell<AHashMap<String, Rc<ModelDefinition>>>,
    instances: RefCell<AHashMap<ModelId, Model>>,
    clock: VersionClock,
}

impl StoreShared {
    /// Drop `model` from the instance index if it is the indexed instance.
    ///
    /// Takes the id separately so it can run while `model` is mid-mutation.
    pub(crate) fn forget(&self, id: &ModelId, model: &Model) {
        let mut instances = self.instances.borrow_mut();
        if instances.get(id).is_some_and(|live| live.ptr_eq(model)) {
            instances.remove(id);
        }
    }
}

/// Registry of model definitions and their live instances.
///
/// Cloning a `ModelStore` creates another handle to the same registry.
#[derive(Clone, Default)]
pub struct ModelStore {
    shared: Rc<StoreShared>,
}

impl ModelStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_shared(shared: Rc<StoreShared>) -> Self {
        Self { shared }
    }

    /// Register a model definition. Names are unique per store.
    pub fn define(&self, definition: ModelDefinition) -> Result<()> {
        let mut definitions = self.shared.definitions.borrow_mut();
        if definitions.contains_key(definition.name()) {
            return Err(ModelError::DuplicateModel {
                name: definition.name().to_owned(),
            });
        }
        definitions.insert(definition.name().to_owned(), Rc::new(definition));
        Ok(())
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.shared.definitions.borrow().contains_key(name)
    }

    pub fn definition(&self, name: &str) -> Result<Rc<ModelDefinition>> {
        self.shared
            .definitions
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownModel {
                name: name.to_owned(),
            })
    }

    /// The live instance for `name` + `params`, created on first lookup.
    ///
    /// Params not declared by the definition are ignored.
    pub fn get(&self, name: &str, params: &Params) -> Result<Model> {
        let definition = self.definition(name)?;
        let id = definition.id_for(params)?;

        let existing = self.shared.instances.borrow().get(&id).cloned();
        if let Some(model) = existing {
            return Ok(model);
        }

        let model = Model::new(
            id.clone(),
            definition,
            self.shared.clock.clone(),
            Rc::downgrade(&self.shared),
        );
        debug!(message = "model.create", model = %id);
        self.shared.instances.borrow_mut().insert(id, model.clone());
        Ok(model)
    }

    /// The live instance for `name` + `params`, without creating one.
    #[must_use]
    pub fn find(&self, name: &str, params: &Params) -> Option<Model> {
        let id = self.definition(name).ok()?.id_for(params).ok()?;
        self.shared.instances.borrow().get(&id).cloned()
    }

    /// Destroy a model instance. See [`Model::destroy`].
    pub fn destroy(&self, model: &Model) -> Result<u64> {
        model.destroy()
    }

    /// Live instances, ordered by key.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        let mut models: Vec<Model> = self.shared.instances.borrow().values().cloned().collect();
        models.sort_by_key(Model::key);
        models
    }

    /// Number of live instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.instances.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The clock stamping every mutation in this store.
    #[must_use]
    pub fn clock(&self) -> &VersionClock {
        &self.shared.clock
    }

    /// Destroy every live instance and drop all definitions.
    ///
    /// Returns the number of instances destroyed.
    pub fn teardown(&self) -> usize {
        let live = self.models();
        let mut destroyed = 0;
        for model in &live {
            if model.destroy().is_ok() {
                destroyed += 1;
            }
        }
        self.shared.instances.borrow_mut().clear();
        self.shared.definitions.borrow_mut().clear();
        debug!(message = "store.teardown", destroyed);
        destroyed
    }
}

impl fmt::Debug for ModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelStore")
            .field("definitions", &self.shared.definitions.borrow().len())
            .field("instances", &self.shared.instances.borrow().len())
            .field("version", &self.shared.clock.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamSpec, params};
    use serde_json::json;

    #[test]
    fn get_creates_once_per_identity() {
        let store = ModelStore::new();
        store
            .define(ModelDefinition::new("person").param("id", ParamSpec::Required))
            .unwrap();

        let a = store.get("person", &params([("id", "1")])).unwrap();
        let b = store.get("person", &params([("id", "1"), ("x", "y")])).unwrap();
        let c = store.get("person", &params([("id", "2")])).unwrap();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unknown_and_duplicate_definitions() {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("season")).unwrap();
        assert_eq!(
            store.define(ModelDefinition::new("season")),
            Err(ModelError::DuplicateModel {
                name: "season".into()
            })
        );
        assert!(matches!(
            store.get("superModel", &Params::new()),
            Err(ModelError::UnknownModel { .. })
        ));
        assert!(store.find("season", &Params::new()).is_none());
    }

    #[test]
    fn versions_are_unique_across_models() {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("a")).unwrap();
        store.define(ModelDefinition::new("b")).unwrap();
        let a = store.get("a", &Params::new()).unwrap();
        let b = store.get("b", &Params::new()).unwrap();
        let v1 = a.set_data(json!(1)).unwrap();
        let v2 = b.set_data(json!(2)).unwrap();
        let v3 = a.touch().unwrap();
        assert!(v1 < v2 && v2 < v3);
        assert_eq!(store.clock().current(), v3);
    }

    #[test]
    fn destroy_forgets_instance() {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("season")).unwrap();
        let season = store.get("season", &Params::new()).unwrap();
        store.destroy(&season).unwrap();
        assert!(store.is_empty());
        let again = store.get("season", &Params::new()).unwrap();
        assert!(!again.ptr_eq(&season));
    }

    #[test]
    fn teardown_destroys_everything() {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("season")).unwrap();
        let season = store.get("season", &Params::new()).unwrap();
        season.set_data(json!({})).unwrap();
        assert_eq!(store.teardown(), 1);
        assert!(season.is_destroyed());
        assert!(!store.is_defined("season"));
    }
}
