#![forbid(unsafe_code)]

//! Policy-as-data: load model, view, and layout declarations from TOML or
//! JSON.
//!
//! Handler policies name view methods; code supplies those through a
//! [`MethodTable`] when the manifest is installed. A handler name with no
//! matching method fails installation, exactly like a code-defined view.
//!
//! ```toml
//! [models.season]
//!
//! [models.person.params]
//! id = true
//!
//! [views.weather.models]
//! season = { "model-changed" = "onSeason", "model-destroyed" = true }
//! elements = false
//!
//! [layouts.index.app]
//! weather = true
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_model::{ModelDefinition, ModelEvent};

use crate::app::App;
use crate::definition::{ViewDefinition, ViewMethod};
use crate::error::{Result, RuntimeError};
use crate::policy::DependencyDecl;
use crate::view::View;

/// Declarative description of an application's models, views, and layouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub models: BTreeMap<String, ModelDefinition>,
    #[serde(default)]
    pub views: BTreeMap<String, ViewManifest>,
    #[serde(default)]
    pub layouts: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewManifest {
    #[serde(default)]
    pub models: BTreeMap<String, DependencyDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

/// View methods supplied by code, keyed by view name then method name.
#[derive(Default, Clone)]
pub struct MethodTable {
    views: BTreeMap<String, BTreeMap<String, ViewMethod>>,
}

impl MethodTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(
        mut self,
        view: impl Into<String>,
        name: impl Into<String>,
        method: impl Fn(&View, &ModelEvent) + 'static,
    ) -> Self {
        let method: ViewMethod = std::rc::Rc::new(method);
        self.views
            .entry(view.into())
            .or_default()
            .insert(name.into(), method);
        self
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (view, methods) in &self.views {
            map.entry(view, &methods.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

impl Manifest {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| RuntimeError::config(err.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| RuntimeError::config(err.to_string()))
    }

    /// Load a manifest file; `.json` files are JSON, everything else TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            RuntimeError::config(format!("failed to read {}: {err}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Register everything in `app`: models, then views, then layouts.
    pub fn install(&self, app: &App, methods: &MethodTable) -> Result<()> {
        if let Some(view) = methods.views.keys().find(|view| !self.views.contains_key(*view)) {
            return Err(RuntimeError::config(format!(
                "methods supplied for undeclared view {view}"
            )));
        }

        for (name, definition) in &self.models {
            app.define_model(definition.clone().named(name.as_str()))?;
        }

        for (name, manifest) in &self.views {
            let mut definition = ViewDefinition::new(name.as_str());
            for (model, decl) in &manifest.models {
                definition = definition.model(model.as_str(), decl.clone());
            }
            for param in manifest.params.iter().flatten() {
                definition = definition.param(param.as_str());
            }
            if let Some(table) = methods.views.get(name) {
                for (method, body) in table {
                    let body = std::rc::Rc::clone(body);
                    definition = definition.method(method.as_str(), move |view, event| body(view, event));
                }
            }
            app.define_view(definition)?;
        }

        for (name, tree) in &self.layouts {
            app.define_layout(name, tree)?;
        }

        tracing::debug!(
            message = "manifest.install",
            models = self.models.len(),
            views = self.views.len(),
            layouts = self.layouts.len()
        );
        Ok(())
    }
}
