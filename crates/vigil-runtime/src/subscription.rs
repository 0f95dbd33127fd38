#![forbid(unsafe_code)]

//! Lifetime grouping for model subscriptions.

use vigil_model::{EventName, Model, ModelEvent, Subscription};

/// Collects the model subscriptions owned by one view binding.
///
/// When the scope is dropped or cleared, every held subscription is
/// released and no callback registered through it fires again.
///
/// # Invariants
///
/// 1. Subscriptions are released in reverse registration order.
/// 2. `clear()` releases everything immediately; the scope stays usable.
/// 3. `len()` counts held subscriptions, attached or not.
#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold an existing subscription until the scope is released.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `event` on `model` within this scope.
    pub fn subscribe(
        &mut self,
        model: &Model,
        event: EventName,
        callback: impl Fn(&ModelEvent) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(model.subscribe(event, callback));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Held subscriptions whose model still has the listener attached.
    #[must_use]
    pub fn attached(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|sub| sub.is_attached())
            .count()
    }

    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for SubscriptionScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vigil_model::{ModelDefinition, ModelStore, Params};

    fn season() -> (ModelStore, Model) {
        let store = ModelStore::new();
        store.define(ModelDefinition::new("season")).unwrap();
        let season = store.get("season", &Params::new()).unwrap();
        (store, season)
    }

    #[test]
    fn scope_holds_until_dropped() {
        let (_store, season) = season();
        let seen = Rc::new(RefCell::new(0));
        {
            let mut scope = SubscriptionScope::new();
            let s = Rc::clone(&seen);
            scope.subscribe(&season, EventName::changed(), move |_| *s.borrow_mut() += 1);
            assert_eq!(scope.len(), 1);
            season.touch().unwrap();
            assert_eq!(*seen.borrow(), 1);
        }
        season.touch().unwrap();
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(season.listener_count(), 0);
    }

    #[test]
    fn releases_in_reverse_order() {
        let (_store, season) = season();
        let mut scope = SubscriptionScope::new();
        scope
            .subscribe(&season, EventName::changed(), |_| {})
            .subscribe(&season, EventName::destroyed(), |_| {});
        scope.clear();
        assert!(scope.is_empty());
        assert_eq!(season.listener_count(), 0);

        scope.hold(season.subscribe(EventName::changed(), |_| {}));
        assert_eq!(scope.attached(), 1);
    }

    #[test]
    fn destroyed_model_detaches_everything() {
        let (_store, season) = season();
        let mut scope = SubscriptionScope::new();
        scope.subscribe(&season, EventName::changed(), |_| {});
        season.destroy().unwrap();
        assert_eq!(scope.len(), 1);
        assert_eq!(scope.attached(), 0);
    }
}
