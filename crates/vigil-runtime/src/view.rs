#![forbid(unsafe_code)]

//! View instances.
//!
//! A [`View`] is a cheaply cloneable handle to one node of a view tree. It is
//! bound to concrete model instances resolved from its params, holds one
//! subscription per declared (model, event) pair, and answers "am I valid?"
//! through its [`ValidityTracker`].
//!
//! # Invariants
//!
//! 1. Listener closures hold only a weak reference to the view, so a view
//!    that is dropped or detached never reacts again.
//! 2. No borrow of view state is held while a handler method runs; handlers
//!    may call back into the view (`invalidate`, `validity`, `child`).
//! 3. Rebinding replaces every subscription at once; stale instances are
//!    never observed after a rebind.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use vigil_model::{EventKind, Model, ModelEvent, ModelStore, Params, Version};

use crate::app::App;
use crate::completion::Completion;
use crate::definition::{ViewSchema, view_key};
use crate::error::{Result, RuntimeError};
use crate::policy::Policy;
use crate::subscription::SubscriptionScope;
use crate::update::{Update, UpdateReport};
use crate::validity::{Validity, ValidityTracker};

struct ViewInner {
    schema: Rc<ViewSchema>,
    params: Params,
    key: String,
    tracker: ValidityTracker,
    scope: SubscriptionScope,
    children: Vec<View>,
    detached: bool,
}

/// Handle to a view instance. Clones share the instance.
#[derive(Clone)]
pub struct View {
    inner: Rc<RefCell<ViewInner>>,
}

impl View {
    /// Instantiate `schema` under `input` params and bind it to its models.
    ///
    /// Fails with [`RuntimeError::UnresolvedModel`] when a declared model
    /// cannot be resolved. The new view is not built, hence not valid.
    pub fn create(store: &ModelStore, schema: Rc<ViewSchema>, input: &Params) -> Result<Self> {
        let params = schema.view_params(store, input);
        let key = view_key(schema.name(), &params);
        let view = Self {
            inner: Rc::new(RefCell::new(ViewInner {
                schema,
                params,
                key,
                tracker: ValidityTracker::default(),
                scope: SubscriptionScope::new(),
                children: Vec::new(),
                detached: false,
            })),
        };
        view.bind(store)?;
        tracing::trace!(message = "view.create", view = %view.key());
        Ok(view)
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.inner.borrow().schema.name().to_owned()
    }

    /// Instance key, e.g. `profile&id=4`.
    #[must_use]
    pub fn key(&self) -> String {
        self.inner.borrow().key.clone()
    }

    #[must_use]
    pub fn params(&self) -> Params {
        self.inner.borrow().params.clone()
    }

    #[must_use]
    pub fn schema(&self) -> Rc<ViewSchema> {
        Rc::clone(&self.inner.borrow().schema)
    }

    #[must_use]
    pub fn validity(&self) -> Validity {
        let inner = self.inner.borrow();
        if inner.detached {
            return Validity::Detached;
        }
        inner.tracker.check()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity().is_valid()
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.inner.borrow().tracker.is_built()
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.inner.borrow().detached
    }

    /// Mark the view invalid until its next rebuild.
    pub fn invalidate(&self) {
        let newly = self.inner.borrow_mut().tracker.invalidate();
        if newly {
            tracing::debug!(message = "view.invalidate", view = %self.key(), reason = "explicit");
        }
    }

    /// Bound model instances, in dependency order.
    #[must_use]
    pub fn models(&self) -> Vec<Model> {
        self.inner.borrow().tracker.models().cloned().collect()
    }

    /// The bound instance of `model`, by model name.
    #[must_use]
    pub fn model(&self, model: &str) -> Option<Model> {
        let inner = self.inner.borrow();
        let index = inner
            .schema
            .dependencies()
            .iter()
            .position(|dep| dep.model == model)?;
        inner.tracker.model(index).cloned()
    }

    /// The version this view last synchronized `model` to.
    #[must_use]
    pub fn seen_version(&self, model: &str) -> Option<Version> {
        let inner = self.inner.borrow();
        let index = inner
            .schema
            .dependencies()
            .iter()
            .position(|dep| dep.model == model)?;
        inner.tracker.seen_version(index)
    }

    /// Subscriptions currently attached to live models.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().scope.attached()
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<View> {
        self.inner
            .borrow()
            .children
            .iter()
            .find(|child| child.name() == name)
            .cloned()
    }

    #[must_use]
    pub fn children(&self) -> Vec<View> {
        self.inner.borrow().children.clone()
    }

    /// This view and all descendants, pre-order, with their tree paths.
    #[must_use]
    pub fn walk(&self) -> Vec<(String, View)> {
        let mut out = Vec::new();
        self.walk_into(&self.name(), &mut out);
        out
    }

    fn walk_into(&self, path: &str, out: &mut Vec<(String, View)>) {
        out.push((path.to_owned(), self.clone()));
        for child in self.children() {
            let child_path = format!("{path}/{}", child.name());
            child.walk_into(&child_path, out);
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Rebuild this view's subtree in place: fetch what its invalid views
    /// need and rebuild them. The tree shape does not change.
    pub fn update(&self, app: &App) -> Completion<UpdateReport> {
        Update::refresh(app, self).start()
    }

    /// Remove from the tree: drop every subscription, recursively.
    pub fn detach(&self) {
        let children = {
            let mut inner = self.inner.borrow_mut();
            inner.detached = true;
            inner.scope.clear();
            std::mem::take(&mut inner.children)
        };
        for child in children {
            child.detach();
        }
        tracing::trace!(message = "view.detach", view = %self.key());
    }

    pub(crate) fn set_children(&self, children: Vec<View>) {
        self.inner.borrow_mut().children = children;
    }

    #[must_use]
    pub(crate) fn has_destroyed_dependency(&self) -> bool {
        self.inner.borrow().tracker.has_destroyed_dependency()
    }

    /// Bound instances that have no usable data yet.
    pub(crate) fn unavailable_models(&self) -> Vec<Model> {
        self.inner
            .borrow()
            .tracker
            .models()
            .filter(|model| !model.is_valid())
            .cloned()
            .collect()
    }

    /// Resolve models from the store and (re)subscribe to them.
    pub(crate) fn bind(&self, store: &ModelStore) -> Result<()> {
        let (schema, params) = {
            let inner = self.inner.borrow();
            (Rc::clone(&inner.schema), inner.params.clone())
        };

        let models = schema
            .dependencies()
            .iter()
            .map(|dep| {
                store
                    .get(&dep.model, &params)
                    .map_err(|source| RuntimeError::UnresolvedModel {
                        view: schema.name().to_owned(),
                        model: dep.model.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut scope = SubscriptionScope::new();
        for (index, (dep, model)) in schema.dependencies().iter().zip(&models).enumerate() {
            for entry in &dep.events {
                let weak = Rc::downgrade(&self.inner);
                let policy = entry.policy.clone();
                scope.subscribe(model, entry.event.clone(), move |event| {
                    if let Some(inner) = weak.upgrade() {
                        View { inner }.react(index, &policy, event);
                    }
                });
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.scope = scope;
        inner.tracker.rebind(models);
        Ok(())
    }

    /// Rebind when a dependency was destroyed. Returns whether it rebound.
    pub(crate) fn rebind_if_destroyed(&self, store: &ModelStore) -> Result<bool> {
        if !self.has_destroyed_dependency() {
            return Ok(false);
        }
        self.bind(store)?;
        tracing::debug!(message = "view.rebind", view = %self.key());
        Ok(true)
    }

    /// Mark the view built and in sync with every dependency.
    ///
    /// Fails if a dependency still has no usable data.
    pub(crate) fn revalidate(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if let Some(model) = inner.tracker.models().find(|model| !model.is_valid()) {
            return Err(RuntimeError::ModelUnavailable {
                view: inner.key.clone(),
                model: model.key(),
            });
        }
        inner.tracker.revalidate();
        tracing::debug!(message = "view.revalidate", view = %inner.key);
        Ok(())
    }

    fn react(&self, index: usize, policy: &Policy, event: &ModelEvent) {
        if event.name.kind() == EventKind::Destroyed {
            tracing::debug!(
                message = "view.dependency_destroyed",
                view = %self.key(),
                model = %event.model
            );
        }
        match policy {
            Policy::Ignore => {
                self.inner.borrow_mut().tracker.carry_forward(index, event);
            }
            Policy::KeepValid => {
                self.inner.borrow_mut().tracker.keep_valid(index);
                tracing::trace!(
                    message = "view.keep_valid",
                    view = %self.key(),
                    model = %event.model,
                    event = %event.name
                );
            }
            Policy::Invalidate => {
                let newly = self.inner.borrow_mut().tracker.invalidate();
                if newly {
                    tracing::debug!(
                        message = "view.invalidate",
                        view = %self.key(),
                        model = %event.model,
                        event = %event.name
                    );
                }
            }
            Policy::Handler { name, method } => {
                self.inner.borrow_mut().tracker.keep_valid(index);
                tracing::trace!(
                    message = "view.handler",
                    view = %self.key(),
                    handler = %name,
                    event = %event.name
                );
                method(self, event);
            }
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("View")
            .field("key", &inner.key)
            .field("built", &inner.tracker.is_built())
            .field("detached", &inner.detached)
            .field("subscriptions", &inner.scope.len())
            .field("children", &inner.children.len())
            .finish()
    }
}
