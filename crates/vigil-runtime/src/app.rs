#![forbid(unsafe_code)]

//! The application context.
//!
//! [`App`] owns everything that would otherwise be global: the model store,
//! the view and layout registries, and the data source updates fetch from.
//! Several independent apps can coexist; [`App::teardown`] returns one to an
//! empty state.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use vigil_model::{ModelDefinition, ModelStore, Params};

use crate::completion::Completion;
use crate::definition::{ViewDefinition, ViewRegistry, ViewSchema};
use crate::error::Result;
use crate::layout::LayoutRegistry;
use crate::source::{DataSource, NoDataSource};
use crate::update::{Update, UpdateReport};
use crate::view::View;

pub struct App {
    models: ModelStore,
    views: ViewRegistry,
    layouts: LayoutRegistry,
    source: Box<dyn DataSource>,
}

impl App {
    /// An app with no data source; updates that need data fail to fetch.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(NoDataSource)
    }

    #[must_use]
    pub fn with_source(source: impl DataSource + 'static) -> Self {
        Self {
            models: ModelStore::new(),
            views: ViewRegistry::new(),
            layouts: LayoutRegistry::new(),
            source: Box::new(source),
        }
    }

    pub fn set_source(&mut self, source: impl DataSource + 'static) {
        self.source = Box::new(source);
    }

    #[must_use]
    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    #[must_use]
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    #[must_use]
    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    #[must_use]
    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    pub fn define_model(&self, definition: ModelDefinition) -> Result<()> {
        Ok(self.models.define(definition)?)
    }

    pub fn define_view(&self, definition: ViewDefinition) -> Result<Rc<ViewSchema>> {
        self.views.define(definition)
    }

    pub fn define_layout(&self, name: &str, tree: &Value) -> Result<()> {
        self.layouts.define(name, tree)
    }

    /// Instantiate a view outside any tree, typically a page root.
    pub fn create_view(&self, name: &str, params: &Params) -> Result<View> {
        let schema = self.views.schema(name)?;
        View::create(&self.models, schema, params)
    }

    /// Reconcile `root` against page layout `page`, fetch missing data, and
    /// rebuild invalid views.
    pub fn update(&self, root: &View, page: &str, params: &Params) -> Completion<UpdateReport> {
        match self.layouts.page(page) {
            Ok(layout) => Update::new(self, root, layout, params.clone()).start(),
            Err(error) => {
                tracing::warn!(message = "update.failed", page, error = %error);
                Completion::rejected(error)
            }
        }
    }

    /// Destroy every model and forget every view and layout definition.
    ///
    /// Returns the number of model instances destroyed.
    pub fn teardown(&self) -> usize {
        self.views.clear();
        self.layouts.clear();
        let destroyed = self.models.teardown();
        tracing::debug!(message = "app.teardown", destroyed);
        destroyed
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("models", &self.models)
            .field("views", &self.views.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use serde_json::json;

    #[test]
    fn apps_are_independent() {
        let a = App::new();
        let b = App::new();
        a.define_model(ModelDefinition::new("season")).unwrap();
        assert!(a.models().is_defined("season"));
        assert!(!b.models().is_defined("season"));
    }

    #[test]
    fn unknown_page_rejects() {
        let app = App::new();
        app.define_view(ViewDefinition::new("app")).unwrap();
        let root = app.create_view("app", &Params::new()).unwrap();
        let done = app.update(&root, "missing", &Params::new());
        assert!(matches!(done.error(), Some(RuntimeError::UnknownLayout { .. })));
    }

    #[test]
    fn teardown_clears_everything() {
        let app = App::new();
        app.define_model(ModelDefinition::new("season")).unwrap();
        app.define_view(ViewDefinition::new("app")).unwrap();
        app.define_layout("index", &json!({"app": true})).unwrap();
        let season = app.models().get("season", &Params::new()).unwrap();
        season.set_data(json!({"name": "summer"})).unwrap();

        assert_eq!(app.teardown(), 1);
        assert!(season.is_destroyed());
        assert!(app.views().names().is_empty());
        assert!(!app.layouts().is_defined("index"));
    }
}
