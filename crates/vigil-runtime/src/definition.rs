#![forbid(unsafe_code)]

//! View declarations and the registry that resolves them.
//!
//! A [`ViewDefinition`] is what callers write: a name, the models the view
//! depends on with a [`DependencyDecl`] each, optional declared params, and a
//! table of named methods that handler policies can refer to.
//! [`ViewRegistry::define`] resolves it into an immutable [`ViewSchema`]; a
//! handler name with no matching method fails right there.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use vigil_model::{EventName, ModelEvent, ModelStore, Params};

use crate::error::{Result, RuntimeError};
use crate::policy::{DependencyDecl, DependencyPolicy, Policy};
use crate::view::View;

/// A named view method, callable from a handler policy.
pub type ViewMethod = Rc<dyn Fn(&View, &ModelEvent)>;

/// Builder-style view declaration.
#[derive(Clone, Default)]
pub struct ViewDefinition {
    name: String,
    models: BTreeMap<String, DependencyDecl>,
    methods: BTreeMap<String, ViewMethod>,
    params: Option<Vec<String>>,
}

impl ViewDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Depend on `model` with the given declaration.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>, decl: impl Into<DependencyDecl>) -> Self {
        self.models.insert(model.into(), decl.into());
        self
    }

    /// Register a method that handler policies may name.
    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&View, &ModelEvent) + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Declare a view param explicitly. Without any declared params a view
    /// keys itself by the union of its models' params.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.get_or_insert_with(Vec::new).push(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolve policies against the method table.
    pub fn resolve(&self) -> Result<ViewSchema> {
        let dependencies = self
            .models
            .iter()
            .map(|(model, decl)| DependencyPolicy::resolve(&self.name, model, decl, &self.methods))
            .collect::<Result<Vec<_>>>()?;
        Ok(ViewSchema {
            name: self.name.clone(),
            dependencies,
            params: self.params.clone(),
        })
    }
}

impl fmt::Debug for ViewDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDefinition")
            .field("name", &self.name)
            .field("models", &self.models)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("params", &self.params)
            .finish()
    }
}

/// A resolved view kind: typed policy table plus param rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSchema {
    name: String,
    dependencies: Vec<DependencyPolicy>,
    params: Option<Vec<String>>,
}

impl ViewSchema {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dependencies in declaration-table order (sorted by model name).
    #[must_use]
    pub fn dependencies(&self) -> &[DependencyPolicy] {
        &self.dependencies
    }

    #[must_use]
    pub fn dependency(&self, model: &str) -> Option<&DependencyPolicy> {
        self.dependencies.iter().find(|dep| dep.model == model)
    }

    #[must_use]
    pub fn policy_for(&self, model: &str, event: &EventName) -> Option<&Policy> {
        self.dependency(model)?.policy_for(event)
    }

    /// The params this view keeps from `input`.
    ///
    /// Explicitly declared params win; otherwise the view takes every param
    /// its models declare. Models the store does not know contribute nothing
    /// here and fail later, at binding.
    #[must_use]
    pub fn view_params(&self, store: &ModelStore, input: &Params) -> Params {
        let keep = |name: &str| input.get(name).map(|value| (name.to_owned(), value.clone()));
        match &self.params {
            Some(declared) => declared.iter().filter_map(|name| keep(name.as_str())).collect(),
            None => self
                .dependencies
                .iter()
                .filter_map(|dep| store.definition(&dep.model).ok())
                .flat_map(|definition| definition.params().keys().cloned().collect::<Vec<_>>())
                .filter_map(|name| keep(name.as_str()))
                .collect(),
        }
    }

    /// Instance key for this view under `input`, e.g. `profile&id=4`.
    #[must_use]
    pub fn key_for(&self, store: &ModelStore, input: &Params) -> String {
        view_key(&self.name, &self.view_params(store, input))
    }
}

pub(crate) fn view_key(name: &str, params: &Params) -> String {
    let mut key = name.to_owned();
    for (param, value) in params {
        key.push('&');
        key.push_str(param);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// Explicit registry of view kinds.
#[derive(Debug, Default)]
pub struct ViewRegistry {
    schemas: RefCell<AHashMap<String, Rc<ViewSchema>>>,
}

impl ViewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve and register a view kind.
    pub fn define(&self, definition: ViewDefinition) -> Result<Rc<ViewSchema>> {
        if self.is_defined(definition.name()) {
            return Err(RuntimeError::DuplicateView {
                name: definition.name().to_owned(),
            });
        }
        let schema = Rc::new(definition.resolve()?);
        tracing::debug!(
            message = "view.define",
            view = schema.name(),
            dependencies = schema.dependencies().len()
        );
        self.schemas
            .borrow_mut()
            .insert(schema.name().to_owned(), Rc::clone(&schema));
        Ok(schema)
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.schemas.borrow().contains_key(name)
    }

    pub fn schema(&self, name: &str) -> Result<Rc<ViewSchema>> {
        self.schemas
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownView {
                name: name.to_owned(),
            })
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.borrow().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn clear(&self) {
        self.schemas.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PolicyDecl;
    use vigil_model::{ModelDefinition, ParamSpec, params};

    #[test]
    fn define_resolves_policies() {
        let registry = ViewRegistry::new();
        let schema = registry
            .define(
                ViewDefinition::new("weather")
                    .model("season", DependencyDecl::events([("model-changed", "onSeason")]))
                    .model("elements", false)
                    .method("onSeason", |_, _| {}),
            )
            .unwrap();
        assert_eq!(
            schema
                .policy_for("season", &EventName::changed())
                .and_then(Policy::handler_name),
            Some("onSeason")
        );
        assert_eq!(
            schema.policy_for("elements", &EventName::destroyed()),
            Some(&Policy::Ignore)
        );
        assert_eq!(registry.names(), ["weather"]);
    }

    #[test]
    fn dependencies_are_sorted_by_model_then_event() {
        let schema = ViewDefinition::new("gravity")
            .model(
                "season",
                DependencyDecl::events([("model-remove", false), ("model-changed.name", true)]),
            )
            .model("community", DependencyDecl::events([("model-insert", false)]))
            .resolve()
            .unwrap();
        let order: Vec<(String, String)> = schema
            .dependencies()
            .iter()
            .flat_map(|dep| {
                dep.events
                    .iter()
                    .map(|entry| (dep.model.clone(), entry.event.to_string()))
            })
            .collect();
        assert_eq!(
            order,
            [
                ("community".to_owned(), "model-insert".to_owned()),
                ("season".to_owned(), "model-changed.name".to_owned()),
                ("season".to_owned(), "model-remove".to_owned()),
            ]
        );
    }

    #[test]
    fn duplicate_and_unknown_views() {
        let registry = ViewRegistry::new();
        registry.define(ViewDefinition::new("app")).unwrap();
        assert!(matches!(
            registry.define(ViewDefinition::new("app")),
            Err(RuntimeError::DuplicateView { .. })
        ));
        assert!(matches!(
            registry.schema("nope"),
            Err(RuntimeError::UnknownView { .. })
        ));
    }

    #[test]
    fn unknown_handler_is_not_registered() {
        let registry = ViewRegistry::new();
        let err = registry
            .define(ViewDefinition::new("climate").model("season", PolicyDecl::from("onGone")))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownHandler { .. }));
        assert!(!registry.is_defined("climate"));
    }

    #[test]
    fn view_params_follow_models_unless_declared() {
        let store = ModelStore::new();
        store
            .define(ModelDefinition::new("person").param("id", ParamSpec::Required))
            .unwrap();
        let input = params([("id", "4"), ("tab", "bio")]);

        let implicit = ViewDefinition::new("profile").model("person", true).resolve().unwrap();
        assert_eq!(implicit.view_params(&store, &input), params([("id", "4")]));
        assert_eq!(implicit.key_for(&store, &input), "profile&id=4");

        let explicit = ViewDefinition::new("profile")
            .model("person", true)
            .param("tab")
            .resolve()
            .unwrap();
        assert_eq!(explicit.key_for(&store, &input), "profile&tab=bio");
    }
}
