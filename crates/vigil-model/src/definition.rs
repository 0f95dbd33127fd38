#![forbid(unsafe_code)]

//! Model definitions: declared params and optional collection ("split") shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::jpath::JPath;
use crate::params::{ModelId, ParamSpec, Params};

/// How a collection model splits its payload into child models.
///
/// With `model_id = "person"`, `items = ".person"` and
/// `params = {id: ".id"}`, the payload `{person: [{id: 1, ..}, ..]}` becomes
/// one `person&id=1` child per array element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSpec {
    /// Name of the child model definition.
    pub model_id: String,
    /// Path of the item array inside the collection payload.
    pub items: JPath,
    /// Child params, each read from an item by path.
    #[serde(default)]
    pub params: BTreeMap<String, JPath>,
}

impl SplitSpec {
    #[must_use]
    pub fn new(model_id: impl Into<String>, items: JPath) -> Self {
        Self {
            model_id: model_id.into(),
            items,
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, path: JPath) -> Self {
        self.params.insert(name.into(), path);
        self
    }
}

/// Declaration of a model kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(skip)]
    name: String,
    #[serde(default)]
    params: BTreeMap<String, ParamSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    split: Option<SplitSpec>,
}

impl ModelDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the name of a definition that was deserialized without one.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }

    #[must_use]
    pub fn split(mut self, split: SplitSpec) -> Self {
        self.split = Some(split);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, ParamSpec> {
        &self.params
    }

    #[must_use]
    pub fn split_spec(&self) -> Option<&SplitSpec> {
        self.split.as_ref()
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.split.is_some()
    }

    /// Keep only declared params, filling defaults.
    ///
    /// Undeclared entries in `input` are dropped; a missing required param is
    /// an error.
    pub fn resolve_params(&self, input: &Params) -> Result<Params> {
        let mut resolved = Params::new();
        for (name, spec) in &self.params {
            let value = match (input.get(name), spec) {
                (Some(value), _) => value.clone(),
                (None, ParamSpec::Default(default)) => default.clone(),
                (None, ParamSpec::Required) => {
                    return Err(ModelError::MissingParam {
                        model: self.name.clone(),
                        param: name.clone(),
                    });
                }
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }

    /// Identity of the instance addressed by `input`.
    pub fn id_for(&self, input: &Params) -> Result<ModelId> {
        Ok(ModelId::new(self.name.clone(), self.resolve_params(input)?))
    }
}
