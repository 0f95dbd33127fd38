#![forbid(unsafe_code)]

//! Version-based validity tracking for one view.
//!
//! The tracker remembers, per dependency, the model version the view last
//! synchronized to. A view is valid exactly when it has been built, nothing
//! invalidated it since, and every dependency is live, holds data, and is at
//! the remembered version.
//!
//! # Invariants
//!
//! 1. [`ValidityTracker::check`] is pure: asking twice without an intervening
//!    mutation gives the same answer.
//! 2. [`ValidityTracker::keep_valid`] touches only the named dependency.
//! 3. [`ValidityTracker::carry_forward`] only advances a dependency that was
//!    in sync immediately before the event; it never repairs a stale one.
//! 4. A destroyed dependency makes the view invalid regardless of policy.

use vigil_model::{Model, ModelEvent, Version};

/// Why a view is or is not valid. Reported in check order: the first failing
/// condition wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    /// The view has not been built yet.
    NeverBuilt,
    /// The view was removed from its tree.
    Detached,
    /// An `Invalidate` policy or an explicit call marked the view invalid.
    Invalidated,
    /// A dependency was destroyed.
    Destroyed { model: String },
    /// A dependency has no usable data (empty or marked invalid).
    ModelUnavailable { model: String },
    /// A dependency moved past the version the view synchronized to.
    Stale {
        model: String,
        seen: Version,
        current: Version,
    },
}

impl Validity {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone)]
struct TrackedDependency {
    model: Model,
    seen: Version,
}

/// Remembered dependency versions plus the explicit invalidation flag.
#[derive(Debug, Clone, Default)]
pub struct ValidityTracker {
    deps: Vec<TrackedDependency>,
    invalidated: bool,
    built: bool,
}

impl ValidityTracker {
    /// Track `models`, in dependency order. The view starts unbuilt.
    #[must_use]
    pub fn new(models: Vec<Model>) -> Self {
        let mut tracker = Self::default();
        tracker.rebind(models);
        tracker
    }

    /// Replace the tracked instances. Remembered versions reset to zero.
    pub fn rebind(&mut self, models: Vec<Model>) {
        self.deps = models
            .into_iter()
            .map(|model| TrackedDependency { model, seen: 0 })
            .collect();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.deps.iter().map(|dep| &dep.model)
    }

    #[must_use]
    pub fn model(&self, index: usize) -> Option<&Model> {
        self.deps.get(index).map(|dep| &dep.model)
    }

    /// The version dependency `index` was last synchronized to.
    #[must_use]
    pub fn seen_version(&self, index: usize) -> Option<Version> {
        self.deps.get(index).map(|dep| dep.seen)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    #[must_use]
    pub fn has_destroyed_dependency(&self) -> bool {
        self.deps.iter().any(|dep| dep.model.is_destroyed())
    }

    /// Resynchronize dependency `index` to its model's current version.
    pub fn keep_valid(&mut self, index: usize) {
        if let Some(dep) = self.deps.get_mut(index) {
            dep.seen = dep.model.version();
        }
    }

    /// Advance dependency `index` across `event` if it was in sync just
    /// before it. Returns whether it advanced.
    pub fn carry_forward(&mut self, index: usize, event: &ModelEvent) -> bool {
        match self.deps.get_mut(index) {
            Some(dep) if dep.seen == event.previous_version && dep.seen != event.version => {
                dep.seen = event.version;
                true
            }
            _ => false,
        }
    }

    /// Set the invalidation flag. Returns whether it was newly set.
    pub fn invalidate(&mut self) -> bool {
        !std::mem::replace(&mut self.invalidated, true)
    }

    /// Mark built, clear the flag, and synchronize every dependency.
    pub fn revalidate(&mut self) {
        self.built = true;
        self.invalidated = false;
        for dep in &mut self.deps {
            dep.seen = dep.model.version();
        }
    }

    #[must_use]
    pub fn check(&self) -> Validity {
        if !self.built {
            return Validity::NeverBuilt;
        }
        if self.invalidated {
            return Validity::Invalidated;
        }
        for dep in &self.deps {
            if dep.model.is_destroyed() {
                return Validity::Destroyed {
                    model: dep.model.key(),
                };
            }
            if !dep.model.is_valid() {
                return Validity::ModelUnavailable {
                    model: dep.model.key(),
                };
            }
            let current = dep.model.version();
            if dep.seen != current {
                return Validity::Stale {
                    model: dep.model.key(),
                    seen: dep.seen,
                    current,
                };
            }
        }
        Validity::Valid
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_model::{EventName, ModelDefinition, ModelStore, Params};

    fn store() -> (ModelStore, Model, Model) {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("season")).unwrap();
        store.define(ModelDefinition::new("elements")).unwrap();
        let season = store.get("season", &Params::new()).unwrap();
        let elements = store.get("elements", &Params::new()).unwrap();
        season.set_data(json!({"name": "summer"})).unwrap();
        elements.set_data(json!({"water": true})).unwrap();
        (store, season, elements)
    }

    fn event(model: &Model, previous_version: Version) -> ModelEvent {
        ModelEvent {
            model: model.id(),
            name: EventName::changed(),
            version: model.version(),
            previous_version,
            items: Vec::new(),
        }
    }

    #[test]
    fn unbuilt_until_revalidated() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season, elements]);
        assert_eq!(tracker.check(), Validity::NeverBuilt);
        tracker.revalidate();
        assert_eq!(tracker.check(), Validity::Valid);
        assert_eq!(tracker.check(), Validity::Valid);
    }

    #[test]
    fn stale_dependency_is_reported() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season.clone(), elements]);
        tracker.revalidate();
        let before = season.version();
        season.touch().unwrap();
        assert_eq!(
            tracker.check(),
            Validity::Stale {
                model: "season".into(),
                seen: before,
                current: season.version(),
            }
        );
    }

    #[test]
    fn keep_valid_touches_one_dependency() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season.clone(), elements.clone()]);
        tracker.revalidate();
        elements.touch().unwrap();
        season.touch().unwrap();

        tracker.keep_valid(0);
        assert!(matches!(
            tracker.check(),
            Validity::Stale { ref model, .. } if model == "elements"
        ));
        tracker.keep_valid(1);
        assert!(tracker.is_valid());
    }

    #[test]
    fn carry_forward_requires_prior_sync() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season.clone(), elements]);
        tracker.revalidate();

        let before = season.version();
        season.touch().unwrap();
        assert!(tracker.carry_forward(0, &event(&season, before)));
        assert!(tracker.is_valid());

        // Out of sync: a missed mutation must not be papered over.
        season.touch().unwrap();
        let before = season.version();
        season.touch().unwrap();
        assert!(!tracker.carry_forward(0, &event(&season, before)));
        assert!(!tracker.is_valid());
    }

    #[test]
    fn invalidate_flag_and_destroyed_dependency() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season.clone(), elements]);
        tracker.revalidate();
        assert!(tracker.invalidate());
        assert!(!tracker.invalidate());
        assert_eq!(tracker.check(), Validity::Invalidated);

        tracker.revalidate();
        season.destroy().unwrap();
        assert!(tracker.has_destroyed_dependency());
        assert_eq!(
            tracker.check(),
            Validity::Destroyed {
                model: "season".into()
            }
        );
    }

    #[test]
    fn unavailable_model_is_reported() {
        let (_store, season, elements) = store();
        let mut tracker = ValidityTracker::new(vec![season, elements.clone()]);
        tracker.revalidate();
        elements.invalidate();
        assert_eq!(
            tracker.check(),
            Validity::ModelUnavailable {
                model: "elements".into()
            }
        );
    }
}
