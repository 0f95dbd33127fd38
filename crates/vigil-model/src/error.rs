use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model is not defined: {name}")]
    UnknownModel { name: String },

    #[error("model is already defined: {name}")]
    DuplicateModel { name: String },

    #[error("missing required param `{param}` for model {model}")]
    MissingParam { model: String, param: String },

    #[error("invalid param spec for `{param}`: {reason}")]
    InvalidParamSpec { param: String, reason: String },

    #[error("model {model} is destroyed")]
    Destroyed { model: String },

    #[error("model {model} is not a collection")]
    NotCollection { model: String },

    #[error("model {model} is a collection and only accepts whole-payload or item mutations")]
    Collection { model: String },

    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("unknown event name: {name}")]
    UnknownEvent { name: String },

    #[error("invalid payload for {model}: {reason}")]
    Payload { model: String, reason: String },

    #[error("{child} cannot be an item of {model}")]
    ChildMismatch { model: String, child: String },

    #[error("{child} is not an item of {model}")]
    NotAnItem { model: String, child: String },

    #[error("{child} is already an item of {model}")]
    DuplicateItem { model: String, child: String },

    #[error("model {model} outlived its store")]
    Detached { model: String },
}

impl ModelError {
    #[must_use]
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn payload(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Payload {
            model: model.into(),
            reason: reason.into(),
        }
    }
}
