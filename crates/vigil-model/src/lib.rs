#![forbid(unsafe_code)]

//! Versioned models for Vigil.
//!
//! A model is the unit of truth a view synchronizes against. Every mutation
//! stamps a store-wide unique version and emits typed events to listeners
//! before returning.
//!
//! - [`ModelStore`]: explicit registry of definitions and live instances.
//! - [`Model`]: handle to one instance (`set_data`, `set`, `touch`,
//!   `insert`, `remove`, `destroy`, `subscribe`).
//! - [`EventName`] / [`ModelEvent`]: the fixed event vocabulary.
//! - [`JPath`]: dotted paths for field writes and path-scoped events.
//! - [`object`]: small dictionary helpers over JSON objects.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use vigil_model::{EventName, ModelDefinition, ModelStore, Params};
//!
//! let store = ModelStore::new();
//! store.define(ModelDefinition::new("season")).unwrap();
//!
//! let season = store.get("season", &Params::new()).unwrap();
//! season.set_data(json!({"name": "summer", "year": 2023})).unwrap();
//!
//! let _sub = season.subscribe(EventName::parse("model-changed.name").unwrap(), |event| {
//!     assert_eq!(event.model.key(), "season");
//! });
//! let before = season.version();
//! season.set(".name", "winter").unwrap();
//! assert_eq!(season.version(), before + 1);
//! ```

mod logging;

pub mod definition;
pub mod error;
pub mod event;
pub mod jpath;
pub mod listener;
pub mod model;
pub mod object;
pub mod params;
pub mod store;
pub mod version;

pub use definition::{ModelDefinition, SplitSpec};
pub use error::{ModelError, Result};
pub use event::{EventKind, EventName, ModelEvent};
pub use jpath::JPath;
pub use listener::Subscription;
pub use model::{Model, ModelStatus};
pub use params::{ModelId, ParamSpec, Params, param_value, params};
pub use store::ModelStore;
pub use version::{Version, VersionClock};
