#![forbid(unsafe_code)]

//! Versioned model instances.
//!
//! A [`Model`] is a cheaply cloneable handle (`Rc` inside) to one live model
//! instance: its data, status, version, and listeners. Every mutation stamps a
//! fresh version from the store's [`VersionClock`] and then notifies matching
//! listeners before returning.
//!
//! # Invariants
//!
//! 1. Each successful mutation bumps the version exactly once, even when it
//!    emits several events.
//! 2. All listeners for a mutation have run when the mutating call returns.
//! 3. No borrow of model state is held while listeners run.
//! 4. `Destroyed` is terminal: every later mutation fails and the instance is
//!    never valid again. The store forgets it, so the next lookup of the same
//!    identity yields a fresh instance.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Mutating a destroyed model | `set_data` etc. after `destroy` | `ModelError::Destroyed`, no event |
//! | Path write on a collection | `set(".x", ..)` on a split model | `ModelError::Collection` |
//! | Item op on a plain model | `insert`/`remove` | `ModelError::NotCollection` |
//! | Bad child | wrong kind, duplicate, or non-member | `ChildMismatch` / `DuplicateItem` / `NotAnItem` |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::definition::{ModelDefinition, SplitSpec};
use crate::error::{ModelError, Result};
use crate::event::{EventName, ModelEvent};
use crate::jpath::JPath;
use crate::listener::{self, SharedListeners, Subscription};
use crate::logging::{debug, trace};
use crate::params::{ModelId, Params, param_value};
use crate::store::{ModelStore, StoreShared};
use crate::version::{Version, VersionClock};

/// Data lifecycle of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    /// No data has been set yet.
    Empty,
    /// Holds current data.
    Ok,
    /// Data was marked stale and should be refetched.
    Invalid,
    /// Terminal.
    Destroyed,
}

enum Payload {
    Plain(Value),
    Collection { base: Value, items: Vec<Model> },
}

struct ModelInner {
    id: ModelId,
    definition: Rc<ModelDefinition>,
    version: Version,
    status: ModelStatus,
    payload: Payload,
}

/// Handle to a live model instance. Clones share the instance.
#[derive(Clone)]
pub struct Model {
    inner: Rc<RefCell<ModelInner>>,
    listeners: SharedListeners,
    clock: VersionClock,
    store: Weak<StoreShared>,
}

impl Model {
    pub(crate) fn new(
        id: ModelId,
        definition: Rc<ModelDefinition>,
        clock: VersionClock,
        store: Weak<StoreShared>,
    ) -> Self {
        let payload = if definition.is_collection() {
            Payload::Collection {
                base: Value::Null,
                items: Vec::new(),
            }
        } else {
            Payload::Plain(Value::Null)
        };
        Self {
            inner: Rc::new(RefCell::new(ModelInner {
                id,
                definition,
                version: 0,
                status: ModelStatus::Empty,
                payload,
            })),
            listeners: SharedListeners::default(),
            clock,
            store,
        }
    }

    #[must_use]
    pub fn id(&self) -> ModelId {
        self.inner.borrow().id.clone()
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().id.name().to_owned()
    }

    /// Canonical instance key, e.g. `person&id=4`.
    #[must_use]
    pub fn key(&self) -> String {
        self.inner.borrow().id.key()
    }

    #[must_use]
    pub fn definition(&self) -> Rc<ModelDefinition> {
        Rc::clone(&self.inner.borrow().definition)
    }

    /// Version of the latest mutation (0 if never mutated).
    #[must_use]
    pub fn version(&self) -> Version {
        self.inner.borrow().version
    }

    #[must_use]
    pub fn status(&self) -> ModelStatus {
        self.inner.borrow().status
    }

    /// Whether the model holds current data.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status() == ModelStatus::Ok
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.status() == ModelStatus::Destroyed
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.inner.borrow().definition.is_collection()
    }

    /// Whether both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current payload. Collections reassemble theirs from live children.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        let inner = self.inner.borrow();
        if matches!(inner.status, ModelStatus::Empty | ModelStatus::Destroyed) {
            return None;
        }
        match &inner.payload {
            Payload::Plain(data) => Some(data.clone()),
            Payload::Collection { base, items } => {
                let split = inner.definition.split_spec()?;
                let mut out = base.clone();
                let children = items
                    .iter()
                    .map(|child| child.data().unwrap_or(Value::Null))
                    .collect();
                split.items.set(&mut out, Value::Array(children)).ok()?;
                Some(out)
            }
        }
    }

    /// Read one field of the payload.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = JPath::parse(path).ok()?;
        self.data().and_then(|data| path.get(&data).cloned())
    }

    /// Child handles of a collection, in order. Empty for plain models.
    #[must_use]
    pub fn items(&self) -> Vec<Model> {
        match &self.inner.borrow().payload {
            Payload::Collection { items, .. } => items.clone(),
            Payload::Plain(_) => Vec::new(),
        }
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Listen for one event name. Dropping the returned guard detaches.
    pub fn subscribe(
        &self,
        event: EventName,
        callback: impl Fn(&ModelEvent) + 'static,
    ) -> Subscription {
        listener::subscribe(&self.listeners, event, callback)
    }

    /// Replace the payload wholesale and emit `model-changed`.
    ///
    /// For a collection, the item array is split into child models, each of
    /// which receives its element via its own `set_data`.
    pub fn set_data(&self, data: Value) -> Result<Version> {
        if let Some(split) = self.definition().split_spec().cloned() {
            return self.set_collection_data(&split, data);
        }
        self.commit(&[EventName::changed()], Vec::new(), |inner| {
            inner.payload = Payload::Plain(data);
            inner.status = ModelStatus::Ok;
            Ok(())
        })
    }

    /// Write one field and emit both `model-changed` and
    /// `model-changed.<path>` under a single version.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<Version> {
        let path = JPath::parse(path)?;
        let value = value.into();
        let names = if path.is_root() {
            vec![EventName::changed()]
        } else {
            vec![EventName::changed(), EventName::changed_at(path.clone())]
        };
        self.commit(&names, Vec::new(), |inner| {
            let Payload::Plain(data) = &mut inner.payload else {
                return Err(ModelError::Collection {
                    model: inner.id.key(),
                });
            };
            path.set(data, value)?;
            if inner.status == ModelStatus::Empty {
                inner.status = ModelStatus::Ok;
            }
            Ok(())
        })
    }

    /// Bump the version without touching data; emits `model-changed`.
    pub fn touch(&self) -> Result<Version> {
        self.commit(&[EventName::changed()], Vec::new(), |_| Ok(()))
    }

    /// Mark current data stale. No event, no version bump; dependants see the
    /// model as unavailable until it is refetched.
    pub fn invalidate(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.status == ModelStatus::Ok {
            inner.status = ModelStatus::Invalid;
        }
    }

    /// Append a child to a collection and emit `model-insert`.
    pub fn insert(&self, child: &Model) -> Result<Version> {
        self.insert_item(child, None)
    }

    /// Insert a child at `index` (clamped to the end) and emit `model-insert`.
    pub fn insert_at(&self, child: &Model, index: usize) -> Result<Version> {
        self.insert_item(child, Some(index))
    }

    /// Remove a child from a collection and emit `model-remove`.
    pub fn remove(&self, child: &Model) -> Result<Version> {
        let child_id = self.check_child(child)?;
        self.commit(&[EventName::remove()], vec![child_id.clone()], |inner| {
            let model = inner.id.key();
            let Payload::Collection { items, .. } = &mut inner.payload else {
                return Err(ModelError::NotCollection { model });
            };
            let position = items
                .iter()
                .position(|item| item.id() == child_id)
                .ok_or_else(|| ModelError::NotAnItem {
                    model,
                    child: child_id.key(),
                })?;
            items.remove(position);
            Ok(())
        })
    }

    /// Destroy the instance: drop it from its store, emit `model-destroyed`,
    /// and detach every listener.
    ///
    /// The store forgets the instance before listeners run, so a
    /// `model-destroyed` listener that looks the identity up again gets a
    /// fresh instance.
    pub fn destroy(&self) -> Result<Version> {
        let store = self.store.upgrade();
        let version = self.commit(&[EventName::destroyed()], Vec::new(), |inner| {
            inner.status = ModelStatus::Destroyed;
            if let Some(store) = &store {
                store.forget(&inner.id, self);
            }
            Ok(())
        })?;
        self.listeners.borrow_mut().clear();
        debug!(message = "model.destroy", model = %self.key(), version);
        Ok(version)
    }

    fn insert_item(&self, child: &Model, index: Option<usize>) -> Result<Version> {
        let child_id = self.check_child(child)?;
        if child.is_destroyed() {
            return Err(ModelError::Destroyed {
                model: child_id.key(),
            });
        }
        let handle = child.clone();
        self.commit(&[EventName::insert()], vec![child_id.clone()], |inner| {
            let model = inner.id.key();
            let Payload::Collection { items, .. } = &mut inner.payload else {
                return Err(ModelError::NotCollection { model });
            };
            if items.iter().any(|item| item.id() == child_id) {
                return Err(ModelError::DuplicateItem {
                    model,
                    child: child_id.key(),
                });
            }
            let at = index.unwrap_or(items.len()).min(items.len());
            items.insert(at, handle);
            if inner.status == ModelStatus::Empty {
                inner.status = ModelStatus::Ok;
            }
            Ok(())
        })
    }

    /// Validate that `child` may be an item of this collection.
    fn check_child(&self, child: &Model) -> Result<ModelId> {
        let definition = self.definition();
        let split = definition
            .split_spec()
            .ok_or_else(|| ModelError::NotCollection { model: self.key() })?;
        let child_id = child.id();
        if self.ptr_eq(child) || child_id.name() != split.model_id {
            return Err(ModelError::ChildMismatch {
                model: self.key(),
                child: child_id.key(),
            });
        }
        Ok(child_id)
    }

    fn set_collection_data(&self, split: &SplitSpec, data: Value) -> Result<Version> {
        if self.is_destroyed() {
            return Err(ModelError::Destroyed { model: self.key() });
        }
        let store = self
            .store
            .upgrade()
            .map(ModelStore::from_shared)
            .ok_or_else(|| ModelError::Detached { model: self.key() })?;

        let elements = match split.items.get(&data) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(elements)) => elements.clone(),
            Some(_) => {
                return Err(ModelError::payload(
                    self.key(),
                    format!("{} is not an array", split.items),
                ));
            }
        };

        // Resolve every child before writing any, so a rejected payload
        // leaves all children untouched.
        let mut resolved: Vec<(Model, Value)> = Vec::with_capacity(elements.len());
        for element in elements {
            let child_params: Params = split
                .params
                .iter()
                .filter_map(|(name, path)| {
                    path.get(&element)
                        .and_then(param_value)
                        .map(|value| (name.clone(), value))
                })
                .collect();
            let child = store.get(&split.model_id, &child_params)?;
            if resolved.iter().any(|(c, _)| c.ptr_eq(&child)) {
                return Err(ModelError::DuplicateItem {
                    model: self.key(),
                    child: child.key(),
                });
            }
            resolved.push((child, element));
        }

        let mut children: Vec<Model> = Vec::with_capacity(resolved.len());
        for (child, element) in resolved {
            child.set_data(element)?;
            children.push(child);
        }

        self.commit(&[EventName::changed()], Vec::new(), |inner| {
            inner.payload = Payload::Collection {
                base: data,
                items: children,
            };
            inner.status = ModelStatus::Ok;
            Ok(())
        })
    }

    /// Apply `mutate`, stamp a version, then emit `names` in order.
    fn commit(
        &self,
        names: &[EventName],
        items: Vec<ModelId>,
        mutate: impl FnOnce(&mut ModelInner) -> Result<()>,
    ) -> Result<Version> {
        let (model, previous_version, version) = {
            let mut inner = self.inner.borrow_mut();
            if inner.status == ModelStatus::Destroyed {
                return Err(ModelError::Destroyed {
                    model: inner.id.key(),
                });
            }
            mutate(&mut inner)?;
            let previous = inner.version;
            let version = self.clock.next();
            inner.version = version;
            (inner.id.clone(), previous, version)
        };

        trace!(
            message = "model.mutate",
            model = %model,
            version,
            previous_version,
            events = names.len()
        );
        for name in names {
            let event = ModelEvent {
                model: model.clone(),
                name: name.clone(),
                version,
                previous_version,
                items: items.clone(),
            };
            listener::dispatch(&self.listeners, &event);
        }
        Ok(version)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Model")
            .field("id", &inner.id.key())
            .field("version", &inner.version)
            .field("status", &inner.status)
            .finish()
    }
}
