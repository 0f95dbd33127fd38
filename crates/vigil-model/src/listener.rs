#![forbid(unsafe_code)]

//! Per-model listener registry with RAII detachment.
//!
//! # Invariants
//!
//! 1. A listener fires at most once per emitted event, and only for events
//!    whose name equals its filter exactly.
//! 2. Listeners fire in registration order.
//! 3. Dropping a [`Subscription`] detaches its listener; a listener detached
//!    while an event is being dispatched does not fire for the rest of that
//!    dispatch.
//! 4. No `RefCell` borrow of the registry is held while a callback runs, so
//!    callbacks may subscribe, unsubscribe, or read the model freely.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::event::{EventName, ModelEvent};

type Callback = Rc<dyn Fn(&ModelEvent)>;

struct Registration {
    id: u64,
    filter: EventName,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<Registration>,
}

pub(crate) type SharedListeners = Rc<RefCell<Listeners>>;

impl Listeners {
    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|r| r.id == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

pub(crate) fn subscribe(
    listeners: &SharedListeners,
    filter: EventName,
    callback: impl Fn(&ModelEvent) + 'static,
) -> Subscription {
    let id = {
        let mut registry = listeners.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push(Registration {
            id,
            filter: filter.clone(),
            callback: Rc::new(callback),
        });
        id
    };
    Subscription {
        listeners: Rc::downgrade(listeners),
        id,
        event: filter,
    }
}

/// Deliver `event` to every matching listener. Returns how many fired.
pub(crate) fn dispatch(listeners: &SharedListeners, event: &ModelEvent) -> usize {
    let snapshot: Vec<(u64, Callback)> = listeners
        .borrow()
        .entries
        .iter()
        .filter(|r| r.filter == event.name)
        .map(|r| (r.id, Rc::clone(&r.callback)))
        .collect();

    let mut fired = 0;
    for (id, callback) in snapshot {
        if !listeners.borrow().contains(id) {
            continue;
        }
        callback(event);
        fired += 1;
    }
    fired
}

/// RAII guard for a model listener. Dropping it detaches the listener.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    listeners: Weak<RefCell<Listeners>>,
    id: u64,
    event: EventName,
}

impl Subscription {
    /// The event this subscription listens for.
    #[must_use]
    pub fn event(&self) -> &EventName {
        &self.event
    }

    /// Whether the listener is still registered on a live model.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|l| l.borrow().contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().entries.retain(|r| r.id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event.to_string())
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ModelId;
    use std::cell::Cell;

    fn event(name: EventName) -> ModelEvent {
        ModelEvent {
            model: ModelId::root("season"),
            name,
            version: 2,
            previous_version: 1,
            items: Vec::new(),
        }
    }

    #[test]
    fn fires_only_on_exact_match() {
        let listeners = SharedListeners::default();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = subscribe(&listeners, EventName::changed(), move |_| h.set(h.get() + 1));

        assert_eq!(dispatch(&listeners, &event(EventName::changed())), 1);
        assert_eq!(dispatch(&listeners, &event(EventName::insert())), 0);
        let scoped = EventName::parse("model-changed.name").unwrap();
        assert_eq!(dispatch(&listeners, &event(scoped)), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn drop_detaches() {
        let listeners = SharedListeners::default();
        let sub = subscribe(&listeners, EventName::changed(), |_| {});
        assert!(sub.is_attached());
        assert_eq!(listeners.borrow().len(), 1);
        drop(sub);
        assert_eq!(listeners.borrow().len(), 0);
    }

    #[test]
    fn registration_order_is_dispatch_order() {
        let listeners = SharedListeners::default();
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                subscribe(&listeners, EventName::changed(), move |_| {
                    order.borrow_mut().push(i);
                })
            })
            .collect();
        dispatch(&listeners, &event(EventName::changed()));
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn listener_detached_mid_dispatch_does_not_fire() {
        let listeners = SharedListeners::default();
        let victim_hits = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot_for_first = Rc::clone(&slot);
        let _first = subscribe(&listeners, EventName::changed(), move |_| {
            slot_for_first.borrow_mut().take();
        });
        let v = Rc::clone(&victim_hits);
        *slot.borrow_mut() = Some(subscribe(&listeners, EventName::changed(), move |_| {
            v.set(v.get() + 1);
        }));

        assert_eq!(dispatch(&listeners, &event(EventName::changed())), 1);
        assert_eq!(victim_hits.get(), 0);
    }

    #[test]
    fn subscription_outlives_registry() {
        let listeners = SharedListeners::default();
        let sub = subscribe(&listeners, EventName::destroyed(), |_| {});
        drop(listeners);
        assert!(!sub.is_attached());
        drop(sub);
    }
}
