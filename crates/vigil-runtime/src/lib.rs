#![forbid(unsafe_code)]

//! View validity tracking and update orchestration for Vigil.
//!
//! Views declare which models they depend on and how they react to each
//! model event ([`Policy`]). Once built, a view stays valid until a
//! dependency moves past the version it synchronized to, a policy
//! invalidates it, or a dependency is destroyed. [`Update`] walks a view
//! tree, fetches what invalid views need through a [`DataSource`], and
//! rebuilds exactly the invalid views.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use vigil_model::{ModelDefinition, Params};
//! use vigil_runtime::{App, StaticDataSource, ViewDefinition};
//!
//! let app = App::with_source(
//!     StaticDataSource::new().with("season", json!({"name": "summer"})),
//! );
//! app.define_model(ModelDefinition::new("season")).unwrap();
//! app.define_view(ViewDefinition::new("app")).unwrap();
//! app.define_view(ViewDefinition::new("universe").model("season", true)).unwrap();
//! app.define_layout("index", &json!({"app": {"universe": true}})).unwrap();
//!
//! let root = app.create_view("app", &Params::new()).unwrap();
//! let report = app.update(&root, "index", &Params::new()).value().unwrap();
//! assert_eq!(report.fetched, ["season"]);
//!
//! let universe = root.child("universe").unwrap();
//! assert!(universe.is_valid());
//! universe.model("season").unwrap().set(".name", "winter").unwrap();
//! assert!(!universe.is_valid());
//! ```
//!
//! # Feature Flags
//!
//! - `policy-config`: load declarations from TOML/JSON ([`config::Manifest`]).

pub mod app;
pub mod completion;
#[cfg(feature = "policy-config")]
pub mod config;
pub mod definition;
pub mod error;
pub mod layout;
pub mod policy;
pub mod source;
pub mod subscription;
pub mod update;
pub mod validity;
pub mod view;

pub use app::App;
pub use completion::{Completion, Deferred, deferred};
#[cfg(feature = "policy-config")]
pub use config::{Manifest, MethodTable, ViewManifest};
pub use definition::{ViewDefinition, ViewMethod, ViewRegistry, ViewSchema};
pub use error::{Result, RuntimeError, SubtreeFailure};
pub use layout::{LayoutNode, LayoutRegistry};
pub use policy::{DependencyDecl, DependencyPolicy, EventPolicy, Policy, PolicyDecl};
pub use source::{DataSource, FnSource, NoDataSource, StaticDataSource, from_fn};
pub use subscription::SubscriptionScope;
pub use update::{Update, UpdateReport};
pub use validity::{Validity, ValidityTracker};
pub use view::View;
