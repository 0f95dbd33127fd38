#![forbid(unsafe_code)]

//! Model lifecycle events.
//!
//! The vocabulary is fixed:
//!
//! | Name | Emitted by |
//! |------|-----------|
//! | `model-changed` | `set_data`, `set`, `touch` |
//! | `model-changed.<path>` | `set(path, ..)`, in addition to `model-changed` |
//! | `model-destroyed` | `destroy` |
//! | `model-insert` | `insert` on a collection |
//! | `model-remove` | `remove` on a collection |
//!
//! Names written with the legacy `ns-` prefix (`ns-model-changed`) parse to
//! the same [`EventName`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::jpath::JPath;
use crate::params::ModelId;
use crate::version::Version;

const LEGACY_PREFIX: &str = "ns-";

/// Coarse event class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Changed,
    Destroyed,
    Insert,
    Remove,
}

impl EventKind {
    /// Every kind, in declaration order. This is also the event set a
    /// shorthand dependency declaration expands to.
    pub const ALL: [Self; 4] = [Self::Changed, Self::Destroyed, Self::Insert, Self::Remove];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "model-changed",
            Self::Destroyed => "model-destroyed",
            Self::Insert => "model-insert",
            Self::Remove => "model-remove",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subscribable event name: a kind plus, for `model-changed`, an optional
/// data path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventName {
    kind: EventKind,
    path: Option<JPath>,
}

impl EventName {
    #[must_use]
    pub const fn of(kind: EventKind) -> Self {
        Self { kind, path: None }
    }

    #[must_use]
    pub const fn changed() -> Self {
        Self::of(EventKind::Changed)
    }

    /// `model-changed.<path>`. A root path yields plain `model-changed`.
    #[must_use]
    pub fn changed_at(path: JPath) -> Self {
        if path.is_root() {
            return Self::changed();
        }
        Self {
            kind: EventKind::Changed,
            path: Some(path),
        }
    }

    #[must_use]
    pub const fn destroyed() -> Self {
        Self::of(EventKind::Destroyed)
    }

    #[must_use]
    pub const fn insert() -> Self {
        Self::of(EventKind::Insert)
    }

    #[must_use]
    pub const fn remove() -> Self {
        Self::of(EventKind::Remove)
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> Option<&JPath> {
        self.path.as_ref()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let unknown = || ModelError::UnknownEvent {
            name: text.to_owned(),
        };
        let body = text.strip_prefix(LEGACY_PREFIX).unwrap_or(text);

        if let Some(rest) = body.strip_prefix(EventKind::Changed.as_str()) {
            if rest.is_empty() {
                return Ok(Self::changed());
            }
            let path = rest.strip_prefix('.').ok_or_else(unknown)?;
            if path.is_empty() || path.starts_with('.') {
                return Err(unknown());
            }
            return Ok(Self::changed_at(JPath::parse(path)?));
        }

        [EventKind::Destroyed, EventKind::Insert, EventKind::Remove]
            .into_iter()
            .find(|kind| kind.as_str() == body)
            .map(Self::of)
            .ok_or_else(unknown)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if let Some(path) = &self.path {
            write!(f, "{path}")?;
        }
        Ok(())
    }
}

impl FromStr for EventName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EventName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<EventName> for String {
    fn from(name: EventName) -> Self {
        name.to_string()
    }
}

/// A delivered event.
///
/// One mutation stamps one version; when it emits several events (a path
/// `set` emits `model-changed` and `model-changed.<path>`) they all carry the
/// same `version` and `previous_version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEvent {
    /// The model that emitted the event.
    pub model: ModelId,
    pub name: EventName,
    /// Version after the mutation.
    pub version: Version,
    /// Version immediately before the mutation.
    pub previous_version: Version,
    /// Children affected by `model-insert` / `model-remove`.
    pub items: Vec<ModelId>,
}
