#![forbid(unsafe_code)]

//! Update orchestration.
//!
//! An [`Update`] brings a view tree up to date in three phases:
//!
//! 1. **Reconcile** (page updates only): walk the layout, reuse child views
//!    whose key matches, create missing ones, detach the rest.
//! 2. **Fetch**: collect every invalid view, rebind views whose models were
//!    destroyed, and fetch each model they need that has no usable data.
//! 3. **Rebuild**: revalidate every view still invalid, pre-order.
//!
//! A view that fails (unknown view, unresolved model, failed fetch) takes its
//! subtree with it; siblings are still built. The completion rejects with the
//! root's own error when the root fails, and with
//! [`RuntimeError::Subtrees`] otherwise.
//!
//! Updates run synchronously inside [`Update::start`]; the returned
//! [`Completion`] is already settled when `start` returns.

use ahash::AHashMap;
use serde::Serialize;
use vigil_model::{Model, ModelId, Params};

use crate::app::App;
use crate::completion::{Completion, deferred};
use crate::error::{Result, RuntimeError, SubtreeFailure};
use crate::layout::LayoutNode;
use crate::view::View;

/// What an update did, by view tree path (`app/weather`) and model key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub created: Vec<String>,
    pub reused: Vec<String>,
    pub removed: Vec<String>,
    pub fetched: Vec<String>,
    pub rebuilt: Vec<String>,
}

impl UpdateReport {
    /// Whether the update changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
            && self.removed.is_empty()
            && self.fetched.is_empty()
            && self.rebuilt.is_empty()
    }
}

pub struct Update<'a> {
    app: &'a App,
    root: View,
    layout: Option<LayoutNode>,
    params: Params,
}

impl<'a> Update<'a> {
    /// Reconcile `root` against `layout` under `params`, then rebuild.
    #[must_use]
    pub fn new(app: &'a App, root: &View, layout: LayoutNode, params: Params) -> Self {
        Self {
            app,
            root: root.clone(),
            layout: Some(layout),
            params,
        }
    }

    /// Rebuild `root`'s existing subtree without changing its shape.
    #[must_use]
    pub fn refresh(app: &'a App, root: &View) -> Self {
        Self {
            app,
            root: root.clone(),
            layout: None,
            params: root.params(),
        }
    }

    pub fn start(self) -> Completion<UpdateReport> {
        let span = tracing::debug_span!("update", root = %self.root.key());
        let _guard = span.enter();
        tracing::debug!(message = "update.start", reconcile = self.layout.is_some());

        let (deferred, completion) = deferred();
        match self.run() {
            Ok(report) => {
                tracing::debug!(
                    message = "update.done",
                    created = report.created.len(),
                    removed = report.removed.len(),
                    fetched = report.fetched.len(),
                    rebuilt = report.rebuilt.len()
                );
                deferred.resolve(report);
            }
            Err(error) => {
                tracing::warn!(message = "update.failed", error = %error);
                deferred.reject(error);
            }
        }
        completion
    }

    fn run(&self) -> Result<UpdateReport> {
        let root_path = self.root.name();
        let mut report = UpdateReport::default();
        let mut failures = Vec::new();

        if let Some(layout) = &self.layout {
            if layout.view != root_path {
                return Err(RuntimeError::LayoutMismatch {
                    layout: layout.view.clone(),
                    view: root_path,
                });
            }
            self.reconcile(&self.root, layout, &root_path, &mut report, &mut failures);
        }

        // Rebind before fetching so fresh instances are the ones fetched.
        let mut pending = Vec::new();
        for (path, view) in self.root.walk() {
            if view.is_valid() || in_failed_subtree(&failures, &path) {
                continue;
            }
            match view.rebind_if_destroyed(self.app.models()) {
                Ok(_) => pending.push(view),
                Err(error) => fail(&mut failures, path, error),
            }
        }

        let fetch_errors = self.fetch(&pending, &mut report);

        for (path, view) in self.root.walk() {
            if view.is_valid() || in_failed_subtree(&failures, &path) {
                continue;
            }
            let fetch_error = view
                .unavailable_models()
                .iter()
                .find_map(|model| fetch_errors.get(&model.key()).cloned());
            if let Some(error) = fetch_error {
                fail(&mut failures, path, error);
                continue;
            }
            match view.revalidate() {
                Ok(()) => report.rebuilt.push(path),
                Err(error) => fail(&mut failures, path, error),
            }
        }

        if failures.is_empty() {
            return Ok(report);
        }
        if let Some(index) = failures.iter().position(|f| f.path == root_path) {
            return Err(failures.swap_remove(index).error);
        }
        Err(RuntimeError::Subtrees { failures })
    }

    fn reconcile(
        &self,
        view: &View,
        node: &LayoutNode,
        path: &str,
        report: &mut UpdateReport,
        failures: &mut Vec<SubtreeFailure>,
    ) {
        let store = self.app.models();
        let existing = view.children();
        let mut next = Vec::with_capacity(node.children.len());

        for slot in &node.children {
            let child_path = format!("{path}/{}", slot.view);
            let schema = match self.app.views().schema(&slot.view) {
                Ok(schema) => schema,
                Err(error) => {
                    fail(failures, child_path, error);
                    continue;
                }
            };
            let key = schema.key_for(store, &self.params);
            let reusable = existing
                .iter()
                .find(|child| child.key() == key && !child.is_detached())
                .cloned();
            let child = match reusable {
                Some(child) => {
                    report.reused.push(child_path.clone());
                    child
                }
                None => match View::create(store, schema, &self.params) {
                    Ok(child) => {
                        report.created.push(child_path.clone());
                        child
                    }
                    Err(error) => {
                        fail(failures, child_path, error);
                        continue;
                    }
                },
            };
            self.reconcile(&child, slot, &child_path, report, failures);
            next.push(child);
        }

        for old in existing {
            if !next.iter().any(|child| child.ptr_eq(&old)) {
                report.removed.push(format!("{path}/{}", old.name()));
                old.detach();
            }
        }
        view.set_children(next);
    }

    /// Fetch every model the pending views lack, once each. Returns the
    /// failures keyed by model key.
    fn fetch(&self, pending: &[View], report: &mut UpdateReport) -> AHashMap<String, RuntimeError> {
        let mut wanted: Vec<Model> = Vec::new();
        for view in pending {
            for model in view.unavailable_models() {
                if !wanted.iter().any(|seen| seen.ptr_eq(&model)) {
                    wanted.push(model);
                }
            }
        }
        if wanted.is_empty() {
            return AHashMap::new();
        }

        let ids: Vec<ModelId> = wanted.iter().map(Model::id).collect();
        let results = self.app.source().fetch_all(&ids);
        let mut errors = AHashMap::new();
        for (index, model) in wanted.iter().enumerate() {
            let outcome = match results.get(index) {
                Some(Ok(data)) => model.set_data(data.clone()).map_err(RuntimeError::from),
                Some(Err(error)) => Err(error.clone()),
                None => Err(RuntimeError::fetch(model.key(), "data source returned no result")),
            };
            match outcome {
                Ok(version) => {
                    tracing::trace!(message = "update.fetched", model = %model.key(), version);
                    report.fetched.push(model.key());
                }
                Err(error) => {
                    tracing::warn!(message = "update.fetch_failed", model = %model.key(), error = %error);
                    errors.insert(model.key(), error);
                }
            }
        }
        errors
    }
}

fn in_failed_subtree(failures: &[SubtreeFailure], path: &str) -> bool {
    failures.iter().any(|failure| {
        path == failure.path
            || path
                .strip_prefix(failure.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn fail(failures: &mut Vec<SubtreeFailure>, path: String, error: RuntimeError) {
    if error.is_assertion() {
        tracing::error!(message = "update.assert", path = %path, error = %error);
    } else {
        tracing::error!(message = "update.subtree_failed", path = %path, error = %error);
    }
    failures.push(SubtreeFailure { path, error });
}
