#![forbid(unsafe_code)]

//! Per-dependency reaction policies.
//!
//! A view declares, for each model it depends on, how it reacts to that
//! model's events. The declaration is loose data ([`DependencyDecl`]) and is
//! resolved once, when the view is defined, into a typed table of
//! [`EventPolicy`] entries.
//!
//! | Declared value | Resolved policy |
//! |----------------|-----------------|
//! | `false` | [`Policy::Ignore`] |
//! | `true` / `"invalidate"` | [`Policy::Invalidate`] |
//! | `"keepValid"` | [`Policy::KeepValid`] |
//! | any other string | [`Policy::Handler`] naming a view method |
//!
//! A handler resyncs its dependency before the method runs; the view only
//! becomes invalid if the method calls
//! [`View::invalidate`](crate::View::invalidate).
//!
//! The uniform shorthand expands to every whole-model event kind. A per-event
//! table subscribes only to the names it lists; path-scoped names such as
//! `model-changed.name` are accepted there.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use vigil_model::{EventKind, EventName};

use crate::definition::ViewMethod;
use crate::error::{Result, RuntimeError};

const KEEP_VALID: &str = "keepValid";
const INVALIDATE: &str = "invalidate";

/// A declared reaction value as written in a view declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolicyDecl {
    Flag(bool),
    Name(String),
}

impl From<bool> for PolicyDecl {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<&str> for PolicyDecl {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for PolicyDecl {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// How a view declares one model dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyDecl {
    /// One policy for every whole-model event kind.
    Uniform(PolicyDecl),
    /// Event name to policy.
    PerEvent(BTreeMap<String, PolicyDecl>),
}

impl DependencyDecl {
    /// Build a per-event table from `(event name, policy)` pairs.
    pub fn events<K, P>(pairs: impl IntoIterator<Item = (K, P)>) -> Self
    where
        K: Into<String>,
        P: Into<PolicyDecl>,
    {
        Self::PerEvent(
            pairs
                .into_iter()
                .map(|(event, policy)| (event.into(), policy.into()))
                .collect(),
        )
    }
}

impl From<bool> for DependencyDecl {
    fn from(flag: bool) -> Self {
        Self::Uniform(PolicyDecl::Flag(flag))
    }
}

impl From<PolicyDecl> for DependencyDecl {
    fn from(policy: PolicyDecl) -> Self {
        Self::Uniform(policy)
    }
}

impl From<&str> for DependencyDecl {
    fn from(name: &str) -> Self {
        Self::Uniform(PolicyDecl::from(name))
    }
}

/// A resolved reaction.
#[derive(Clone)]
pub enum Policy {
    /// No subscription effect, except that an in-sync dependency stays in
    /// sync across the event.
    Ignore,
    /// Resynchronize this dependency to the model's current version.
    KeepValid,
    /// Mark the view invalid.
    Invalidate,
    /// Resynchronize like `KeepValid`, then call a named view method. The
    /// method may invalidate the view explicitly.
    Handler { name: String, method: ViewMethod },
}

impl Policy {
    #[must_use]
    pub fn handler_name(&self) -> Option<&str> {
        match self {
            Self::Handler { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ignore, Self::Ignore)
            | (Self::KeepValid, Self::KeepValid)
            | (Self::Invalidate, Self::Invalidate) => true,
            (Self::Handler { name: a, .. }, Self::Handler { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => f.write_str("Ignore"),
            Self::KeepValid => f.write_str("KeepValid"),
            Self::Invalidate => f.write_str("Invalidate"),
            Self::Handler { name, .. } => f.debug_tuple("Handler").field(name).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventPolicy {
    pub event: EventName,
    pub policy: Policy,
}

/// Resolved policies for one model dependency of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPolicy {
    pub model: String,
    pub events: Vec<EventPolicy>,
}

impl DependencyPolicy {
    /// The policy for `event`, if one was declared.
    #[must_use]
    pub fn policy_for(&self, event: &EventName) -> Option<&Policy> {
        self.events
            .iter()
            .find(|entry| &entry.event == event)
            .map(|entry| &entry.policy)
    }

    /// Resolve a declaration against the view's method table.
    ///
    /// Fails on unknown event names, on two spellings of the same event, and
    /// on handler names the view does not define.
    pub fn resolve(
        view: &str,
        model: &str,
        decl: &DependencyDecl,
        methods: &BTreeMap<String, ViewMethod>,
    ) -> Result<Self> {
        let resolve_one = |value: &PolicyDecl| resolve_policy(view, model, value, methods);

        let events = match decl {
            DependencyDecl::Uniform(value) => {
                let policy = resolve_one(value)?;
                EventKind::ALL
                    .iter()
                    .map(|&kind| EventPolicy {
                        event: EventName::of(kind),
                        policy: policy.clone(),
                    })
                    .collect()
            }
            DependencyDecl::PerEvent(table) => {
                let mut events: Vec<EventPolicy> = Vec::with_capacity(table.len());
                for (name, value) in table {
                    let event = EventName::parse(name).map_err(|err| {
                        RuntimeError::InvalidDeclaration {
                            view: view.to_owned(),
                            model: model.to_owned(),
                            reason: err.to_string(),
                        }
                    })?;
                    if events.iter().any(|entry| entry.event == event) {
                        return Err(RuntimeError::InvalidDeclaration {
                            view: view.to_owned(),
                            model: model.to_owned(),
                            reason: format!("event {event} is declared twice"),
                        });
                    }
                    events.push(EventPolicy {
                        event,
                        policy: resolve_one(value)?,
                    });
                }
                events
            }
        };

        Ok(Self {
            model: model.to_owned(),
            events,
        })
    }
}

fn resolve_policy(
    view: &str,
    model: &str,
    value: &PolicyDecl,
    methods: &BTreeMap<String, ViewMethod>,
) -> Result<Policy> {
    match value {
        PolicyDecl::Flag(false) => Ok(Policy::Ignore),
        PolicyDecl::Flag(true) => Ok(Policy::Invalidate),
        PolicyDecl::Name(name) if name == KEEP_VALID => Ok(Policy::KeepValid),
        PolicyDecl::Name(name) if name == INVALIDATE => Ok(Policy::Invalidate),
        PolicyDecl::Name(name) => match methods.get(name) {
            Some(method) => Ok(Policy::Handler {
                name: name.clone(),
                method: method.clone(),
            }),
            None => Err(RuntimeError::UnknownHandler {
                view: view.to_owned(),
                model: model.to_owned(),
                handler: name.clone(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn methods(names: &[&str]) -> BTreeMap<String, ViewMethod> {
        names
            .iter()
            .map(|name| {
                let method: ViewMethod = Rc::new(|_, _| {});
                ((*name).to_owned(), method)
            })
            .collect()
    }

    #[test]
    fn shorthand_expands_to_every_kind() {
        let resolved =
            DependencyPolicy::resolve("v", "season", &true.into(), &methods(&[])).unwrap();
        let names: Vec<String> = resolved.events.iter().map(|e| e.event.to_string()).collect();
        assert_eq!(
            names,
            ["model-changed", "model-destroyed", "model-insert", "model-remove"]
        );
        assert!(resolved.events.iter().all(|e| e.policy == Policy::Invalidate));
    }

    #[test]
    fn false_is_ignore_for_every_kind() {
        let resolved =
            DependencyPolicy::resolve("v", "elements", &false.into(), &methods(&[])).unwrap();
        assert_eq!(resolved.events.len(), EventKind::ALL.len());
        assert!(resolved.events.iter().all(|e| e.policy == Policy::Ignore));
    }

    #[test]
    fn per_event_table_with_paths_and_legacy_prefix() {
        let decl = DependencyDecl::events([
            ("ns-model-changed", PolicyDecl::from("keepValid")),
            ("model-changed.name", PolicyDecl::from("onName")),
            ("model-destroyed", PolicyDecl::from(true)),
        ]);
        let resolved = DependencyPolicy::resolve("v", "season", &decl, &methods(&["onName"])).unwrap();
        assert_eq!(
            resolved.policy_for(&EventName::changed()),
            Some(&Policy::KeepValid)
        );
        assert_eq!(
            resolved
                .policy_for(&EventName::parse("model-changed.name").unwrap())
                .and_then(Policy::handler_name),
            Some("onName")
        );
        assert_eq!(resolved.policy_for(&EventName::insert()), None);
    }

    #[test]
    fn unknown_handler_fails_eagerly() {
        let err = DependencyPolicy::resolve("weather", "season", &"onMissing".into(), &methods(&[]))
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UnknownHandler { ref handler, .. } if handler == "onMissing"
        ));
    }

    #[test]
    fn duplicate_spellings_are_rejected() {
        let decl = DependencyDecl::events([("model-changed", true), ("ns-model-changed", false)]);
        let err = DependencyPolicy::resolve("v", "season", &decl, &methods(&[])).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidDeclaration { .. }));
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let decl = DependencyDecl::events([("model-exploded", true)]);
        let err = DependencyPolicy::resolve("v", "season", &decl, &methods(&[])).unwrap_err();
        assert!(err.to_string().contains("model-exploded"));
    }

    #[test]
    fn declarations_deserialize_from_json() {
        let uniform: DependencyDecl = serde_json::from_str("\"keepValid\"").unwrap();
        assert_eq!(uniform, DependencyDecl::Uniform(PolicyDecl::from("keepValid")));
        let table: DependencyDecl =
            serde_json::from_str(r#"{"model-changed": false, "model-destroyed": "onGone"}"#)
                .unwrap();
        assert_eq!(
            table,
            DependencyDecl::events([
                ("model-changed", PolicyDecl::from(false)),
                ("model-destroyed", PolicyDecl::from("onGone")),
            ])
        );
    }
}
