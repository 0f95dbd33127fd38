#![forbid(unsafe_code)]

//! The reference world.
//!
//! Four models:
//!
//! | Model | Shape | Seed |
//! |-------|-------|------|
//! | `elements` | plain | `{water, fire, ground, air: true}` |
//! | `season` | plain | `{name: "summer", year: 2023}` |
//! | `person` | plain, param `id` | created through `community` |
//! | `community` | collection of `person` by `.person[].id` | three people |
//!
//! and one view group per policy family. Each group comes with its page
//! layout; [`Reference::build`] creates the `app` root and runs the first
//! update so every view starts out valid.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};
use vigil_model::{JPath, Model, ModelDefinition, ParamSpec, Params, SplitSpec, Version, params};
use vigil_runtime::{
    App, DataSource, DependencyDecl, NoDataSource, Result, RuntimeError, View, ViewDefinition,
};

/// Page with the `false` / `keepValid` views.
pub const IGNORING_PAGE: &str = "ignoring";
/// Page with the single `variable` view (`elements: false, season: true`).
pub const ISOLATION_PAGE: &str = "isolation";
/// Page with the `true` / `invalidate` views.
pub const INVALIDATING_PAGE: &str = "invalidating";
/// Page with the handler views `weather` and `climate`.
pub const HANDLER_PAGE: &str = "handlers";

pub const IGNORING_VIEWS: [&str; 4] = ["universe", "infinity", "gravity", "timeflow"];
pub const INVALIDATING_VIEWS: [&str; 4] = ["evolution", "policy", "sales", "weather"];

#[must_use]
pub fn elements_seed() -> Value {
    json!({"water": true, "fire": true, "ground": true, "air": true})
}

#[must_use]
pub fn season_seed() -> Value {
    json!({"name": "summer", "year": 2023})
}

#[must_use]
pub fn community_seed() -> Value {
    json!({"person": [
        {"id": 1, "name": "Kirk Hammett"},
        {"id": 2, "name": "Michael Peter Balzary"},
        {"id": 3, "name": "Marty Friedman"}
    ]})
}

/// Shared call counter for view methods.
#[derive(Clone, Default)]
pub struct CallCounter(Rc<Cell<usize>>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for CallCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallCounter({})", self.count())
    }
}

/// Counters for every method of the handler views.
///
/// `weather` methods only count; `climate` methods count and invalidate
/// their view. Both views share `on_destroyed`.
#[derive(Debug, Clone, Default)]
pub struct HandlerCalls {
    pub on_changed: CallCounter,
    pub on_changed_jpath: CallCounter,
    pub on_insert: CallCounter,
    pub on_remove: CallCounter,
    pub invalidate_on_changed: CallCounter,
    pub invalidate_on_changed_jpath: CallCounter,
    pub invalidate_on_insert: CallCounter,
    pub invalidate_on_remove: CallCounter,
    pub on_destroyed: CallCounter,
}

impl HandlerCalls {
    /// Sum over every counter.
    #[must_use]
    pub fn total(&self) -> usize {
        [
            &self.on_changed,
            &self.on_changed_jpath,
            &self.on_insert,
            &self.on_remove,
            &self.invalidate_on_changed,
            &self.invalidate_on_changed_jpath,
            &self.invalidate_on_insert,
            &self.invalidate_on_remove,
            &self.on_destroyed,
        ]
        .iter()
        .map(|counter| counter.count())
        .sum()
    }
}

/// An [`App`] holding the reference models and their seed data.
#[derive(Debug)]
pub struct Reference {
    app: App,
}

impl Reference {
    /// Define and seed the reference models, plus the empty `app` root view.
    pub fn new() -> Result<Self> {
        Self::with_source(NoDataSource)
    }

    /// Like [`Reference::new`], with updates fetching from `source`.
    pub fn with_source(source: impl DataSource + 'static) -> Result<Self> {
        let app = App::with_source(source);
        app.define_model(ModelDefinition::new("elements"))?;
        app.define_model(ModelDefinition::new("season"))?;
        app.define_model(ModelDefinition::new("person").param("id", ParamSpec::Required))?;
        app.define_model(ModelDefinition::new("community").split(
            SplitSpec::new("person", JPath::parse(".person")?).param("id", JPath::parse(".id")?),
        ))?;
        app.define_view(ViewDefinition::new("app"))?;

        let reference = Self { app };
        reference.model("elements")?.set_data(elements_seed())?;
        reference.model("season")?.set_data(season_seed())?;
        reference.model("community")?.set_data(community_seed())?;
        Ok(reference)
    }

    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// The live unparameterized instance of `name`.
    pub fn model(&self, name: &str) -> Result<Model> {
        Ok(self.app.models().get(name, &Params::new())?)
    }

    pub fn person(&self, id: u32) -> Result<Model> {
        Ok(self
            .app
            .models()
            .get("person", &params([("id", id.to_string())]))?)
    }

    /// Create person `id` and append it to `community`.
    pub fn insert_person(&self, id: u32, name: &str) -> Result<Version> {
        let person = self.person(id)?;
        person.set_data(json!({"id": id, "name": name}))?;
        Ok(self.model("community")?.insert(&person)?)
    }

    pub fn remove_person(&self, id: u32) -> Result<Version> {
        let person = self.person(id)?;
        Ok(self.model("community")?.remove(&person)?)
    }

    pub fn destroy(&self, name: &str) -> Result<Version> {
        let model = self.model(name)?;
        Ok(self.app.models().destroy(&model)?)
    }

    /// Create the `app` root and run the first update against `page`.
    pub fn build(&self, page: &str) -> Result<View> {
        let root = self.app.create_view("app", &Params::new())?;
        self.app
            .update(&root, page, &Params::new())
            .outcome()
            .unwrap_or(Err(RuntimeError::Abandoned))?;
        Ok(root)
    }

    /// `universe` and `infinity` ignore or resync every event of every
    /// model; `gravity` and `timeflow` do the same per event.
    pub fn define_ignoring_views(&self) -> Result<()> {
        self.app.define_view(
            ViewDefinition::new("universe")
                .model("elements", false)
                .model("season", false)
                .model("community", false),
        )?;
        self.app.define_view(
            ViewDefinition::new("infinity")
                .model("elements", "keepValid")
                .model("season", "keepValid")
                .model("community", "keepValid"),
        )?;
        self.app.define_view(
            ViewDefinition::new("gravity")
                .model(
                    "season",
                    DependencyDecl::events([("ns-model-changed", false), ("ns-model-destroyed", false)]),
                )
                .model(
                    "community",
                    DependencyDecl::events([("ns-model-insert", false), ("ns-model-remove", false)]),
                ),
        )?;
        self.app.define_view(
            ViewDefinition::new("timeflow")
                .model(
                    "season",
                    DependencyDecl::events([
                        ("ns-model-changed", "keepValid"),
                        ("ns-model-destroyed", "keepValid"),
                    ]),
                )
                .model(
                    "community",
                    DependencyDecl::events([
                        ("ns-model-insert", "keepValid"),
                        ("ns-model-remove", "keepValid"),
                    ]),
                ),
        )?;
        self.app.define_layout(
            IGNORING_PAGE,
            &json!({"app": {"universe": true, "infinity": true, "gravity": true, "timeflow": true}}),
        )
    }

    pub fn define_isolation_view(&self) -> Result<()> {
        self.app.define_view(
            ViewDefinition::new("variable")
                .model("elements", false)
                .model("season", true),
        )?;
        self.app
            .define_layout(ISOLATION_PAGE, &json!({"app": {"variable": {}}}))
    }

    pub fn define_invalidating_views(&self) -> Result<()> {
        self.app.define_view(
            ViewDefinition::new("evolution")
                .model("elements", true)
                .model("season", true)
                .model("community", true),
        )?;
        self.app.define_view(
            ViewDefinition::new("policy")
                .model("elements", "invalidate")
                .model("season", "invalidate")
                .model("community", "invalidate"),
        )?;
        self.app.define_view(
            ViewDefinition::new("sales")
                .model(
                    "season",
                    DependencyDecl::events([("ns-model-changed", true), ("ns-model-destroyed", true)]),
                )
                .model(
                    "community",
                    DependencyDecl::events([("ns-model-insert", true), ("ns-model-remove", true)]),
                ),
        )?;
        self.app.define_view(
            ViewDefinition::new("weather")
                .model(
                    "season",
                    DependencyDecl::events([
                        ("ns-model-changed", "invalidate"),
                        ("ns-model-destroyed", "invalidate"),
                    ]),
                )
                .model(
                    "community",
                    DependencyDecl::events([
                        ("ns-model-insert", "invalidate"),
                        ("ns-model-remove", "invalidate"),
                    ]),
                ),
        )?;
        self.app.define_layout(
            INVALIDATING_PAGE,
            &json!({"app": {"evolution": true, "policy": true, "sales": true, "weather": true}}),
        )
    }

    /// `weather` and `climate` route every event to a method.
    pub fn define_handler_views(&self) -> Result<HandlerCalls> {
        let calls = HandlerCalls::default();

        let counting = |counter: &CallCounter| {
            let counter = counter.clone();
            move |_: &View, _: &vigil_model::ModelEvent| counter.hit()
        };
        let invalidating = |counter: &CallCounter| {
            let counter = counter.clone();
            move |view: &View, _: &vigil_model::ModelEvent| {
                counter.hit();
                view.invalidate();
            }
        };

        self.app.define_view(
            handler_declarations(ViewDefinition::new("weather"))
                .method("onChanged", counting(&calls.on_changed))
                .method("onChangedJpath", counting(&calls.on_changed_jpath))
                .method("onInsert", counting(&calls.on_insert))
                .method("onRemove", counting(&calls.on_remove))
                .method("onDestroyed", counting(&calls.on_destroyed)),
        )?;
        self.app.define_view(
            handler_declarations(ViewDefinition::new("climate"))
                .method("onChanged", invalidating(&calls.invalidate_on_changed))
                .method("onChangedJpath", invalidating(&calls.invalidate_on_changed_jpath))
                .method("onInsert", invalidating(&calls.invalidate_on_insert))
                .method("onRemove", invalidating(&calls.invalidate_on_remove))
                .method("onDestroyed", counting(&calls.on_destroyed)),
        )?;
        self.app.define_layout(
            HANDLER_PAGE,
            &json!({"app": {"weather": true, "climate": true}}),
        )?;
        Ok(calls)
    }
}

fn handler_declarations(definition: ViewDefinition) -> ViewDefinition {
    definition
        .model(
            "season",
            DependencyDecl::events([
                ("ns-model-changed", "onChanged"),
                ("ns-model-changed.name", "onChangedJpath"),
                ("ns-model-destroyed", "onDestroyed"),
            ]),
        )
        .model(
            "community",
            DependencyDecl::events([("ns-model-insert", "onInsert"), ("ns-model-remove", "onRemove")]),
        )
}

/// The child of `root` named `name`, or `UnknownView`.
pub fn child(root: &View, name: &str) -> Result<View> {
    root.child(name).ok_or_else(|| RuntimeError::UnknownView {
        name: name.to_owned(),
    })
}
