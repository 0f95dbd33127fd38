use std::fmt;

use thiserror::Error;
use vigil_model::ModelError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("view is not defined: {name}")]
    UnknownView { name: String },

    #[error("view is already defined: {name}")]
    DuplicateView { name: String },

    #[error("view {view}: handler `{handler}` declared for model {model} is not a method of the view")]
    UnknownHandler {
        view: String,
        model: String,
        handler: String,
    },

    #[error("view {view}: invalid declaration for model {model}: {reason}")]
    InvalidDeclaration {
        view: String,
        model: String,
        reason: String,
    },

    #[error("view {view}: cannot resolve model dependency {model}: {source}")]
    UnresolvedModel {
        view: String,
        model: String,
        source: ModelError,
    },

    #[error("layout is not defined: {name}")]
    UnknownLayout { name: String },

    #[error("layout is already defined: {name}")]
    DuplicateLayout { name: String },

    #[error("layout {name} is malformed: {reason}")]
    MalformedLayout { name: String, reason: String },

    #[error("layout root `{layout}` does not match view `{view}`")]
    LayoutMismatch { layout: String, view: String },

    #[error("failed to fetch {model}: {reason}")]
    Fetch { model: String, reason: String },

    #[error("view {view}: model {model} is unavailable")]
    ModelUnavailable { view: String, model: String },

    #[error("{count} view subtree(s) failed: {summary}", count = .failures.len(), summary = summarize(.failures))]
    Subtrees { failures: Vec<SubtreeFailure> },

    #[error("completion was dropped before it settled")]
    Abandoned,

    #[error("completion outcome was already taken")]
    Consumed,

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl RuntimeError {
    #[must_use]
    pub fn fetch(model: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::Fetch {
            model: model.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether this is the unresolved-dependency assertion.
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::UnresolvedModel { .. } | Self::UnknownHandler { .. })
    }
}

/// A view subtree that could not be built, addressed by its tree path
/// (`app/weather`).
#[derive(Debug, Clone)]
pub struct SubtreeFailure {
    pub path: String,
    pub error: RuntimeError,
}

impl fmt::Display for SubtreeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

fn summarize(failures: &[SubtreeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
