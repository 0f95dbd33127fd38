#![forbid(unsafe_code)]

//! Model parameters and instance identity.
//!
//! A parameterized model (e.g. `person` with `{id}`) has one live instance per
//! distinct parameter set. The instance identity is a [`ModelId`]: the model
//! name plus the *declared* parameters, rendered as a stable key such as
//! `person&id=4`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Parameter map. Ordered so keys render deterministically.
pub type Params = BTreeMap<String, String>;

/// Declaration of one model parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawParamSpec", into = "RawParamSpec")]
pub enum ParamSpec {
    /// The caller must supply a value.
    Required,
    /// Used when the caller omits the parameter.
    Default(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawParamSpec {
    Flag(bool),
    Text(String),
    Number(serde_json::Number),
}

impl TryFrom<RawParamSpec> for ParamSpec {
    type Error = ModelError;

    fn try_from(raw: RawParamSpec) -> Result<Self, Self::Error> {
        match raw {
            RawParamSpec::Flag(true) => Ok(Self::Required),
            RawParamSpec::Flag(false) => Err(ModelError::InvalidParamSpec {
                param: String::new(),
                reason: "`false` is not a param spec; omit the param instead".into(),
            }),
            RawParamSpec::Text(text) => Ok(Self::Default(text)),
            RawParamSpec::Number(n) => Ok(Self::Default(n.to_string())),
        }
    }
}

impl From<ParamSpec> for RawParamSpec {
    fn from(spec: ParamSpec) -> Self {
        match spec {
            ParamSpec::Required => Self::Flag(true),
            ParamSpec::Default(text) => Self::Text(text),
        }
    }
}

/// Render a JSON scalar as a parameter value.
///
/// Strings are taken verbatim, numbers and booleans use their JSON text.
/// Objects, arrays and null have no parameter form.
#[must_use]
pub fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Identity of one model instance: name plus resolved params.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId {
    name: String,
    params: Params,
}

impl ModelId {
    #[must_use]
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Identity of an unparameterized model.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, Params::new())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Canonical key, e.g. `"person&id=4"`.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.params {
            write!(f, "&{k}={v}")?;
        }
        Ok(())
    }
}

/// Build a [`Params`] map from string pairs.
#[must_use]
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
