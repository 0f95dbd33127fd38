#![forbid(unsafe_code)]

//! Dotted paths into JSON payloads.
//!
//! Syntax: `.a.b.0`. The leading dot is optional (`a.b` parses the same),
//! `.` alone (or the empty string) is the root. Numeric segments index arrays
//! when the value at that point is an array and act as object keys otherwise.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty segment | `a..b`, trailing dot | `parse` fails |
//! | Descend into scalar | `.name.first` where `.name` is a string | `set` fails |
//! | Array index out of range | `.items.9` on a 3-element array | `get` is `None`, `set` fails (except append at `len`) |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ModelError, Result};

/// A parsed path into a JSON value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JPath {
    segments: Vec<String>,
}

impl JPath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let body = text.strip_prefix('.').unwrap_or(text);
        if body.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in body.split('.') {
            if segment.is_empty() {
                return Err(ModelError::invalid_path(text, "empty segment"));
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path without its leading dot, as used in event names (`a.b`).
    #[must_use]
    pub fn dotless(&self) -> String {
        self.segments.join(".")
    }

    /// Read the value at this path.
    #[must_use]
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write `new_value` at this path, creating intermediate objects.
    ///
    /// Writing at the root replaces `target` entirely. A `null` encountered
    /// on the way becomes an empty object.
    pub fn set(&self, target: &mut Value, new_value: Value) -> Result<()> {
        let Some((last, parents)) = self.segments.split_last() else {
            *target = new_value;
            return Ok(());
        };

        let mut current = target;
        for segment in parents {
            current = self.descend(current, segment)?;
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => {
                map.insert(last.clone(), new_value);
                Ok(())
            }
            Value::Array(items) => {
                let index = self.index(last)?;
                if index < items.len() {
                    items[index] = new_value;
                    Ok(())
                } else if index == items.len() {
                    items.push(new_value);
                    Ok(())
                } else {
                    Err(ModelError::invalid_path(self.to_string(), "array index out of range"))
                }
            }
            _ => Err(ModelError::invalid_path(self.to_string(), "cannot write into a scalar")),
        }
    }

    fn descend<'a>(&self, current: &'a mut Value, segment: &str) -> Result<&'a mut Value> {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match current {
            Value::Object(map) => Ok(map
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()))),
            Value::Array(items) => {
                let index = self.index(segment)?;
                items.get_mut(index).ok_or_else(|| {
                    ModelError::invalid_path(self.to_string(), "array index out of range")
                })
            }
            _ => Err(ModelError::invalid_path(self.to_string(), "cannot descend into a scalar")),
        }
    }

    fn index(&self, segment: &str) -> Result<usize> {
        segment
            .parse()
            .map_err(|_| ModelError::invalid_path(self.to_string(), "expected an array index"))
    }
}

impl fmt::Display for JPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(".");
        }
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for JPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JPath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<JPath> for String {
    fn from(path: JPath) -> Self {
        path.to_string()
    }
}
