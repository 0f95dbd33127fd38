#![forbid(unsafe_code)]

//! Vigil public facade crate.
//!
//! Versioned models and views that know exactly when they are stale.

pub use vigil_model as model;
#[cfg(feature = "runtime")]
pub use vigil_runtime as runtime;

pub mod prelude {
    pub use vigil_model::{
        EventKind, EventName, JPath, Model, ModelDefinition, ModelEvent, ModelStatus, ModelStore,
        ParamSpec, Params, SplitSpec, params,
    };
    #[cfg(feature = "runtime")]
    pub use vigil_runtime::{
        App, Completion, DataSource, DependencyDecl, LayoutNode, Policy, PolicyDecl,
        StaticDataSource, UpdateReport, Validity, View, ViewDefinition,
    };
}
