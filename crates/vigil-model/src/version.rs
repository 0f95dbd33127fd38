#![forbid(unsafe_code)]

//! Store-wide version stamping.
//!
//! Every mutation of every model in a [`ModelStore`](crate::ModelStore) takes
//! its version from one shared [`VersionClock`], so versions are unique across
//! the store and strictly increasing in mutation order.
//!
//! # Invariants
//!
//! 1. `next()` never returns the same value twice for one clock.
//! 2. `next()` never returns 0; 0 is reserved for "never mutated".
//! 3. Clones share the same counter.

use std::cell::Cell;
use std::rc::Rc;

/// Version number stamped on a model mutation.
pub type Version = u64;

/// Shared monotonic counter handing out model versions.
#[derive(Clone, Debug, Default)]
pub struct VersionClock {
    last: Rc<Cell<Version>>,
}

impl VersionClock {
    /// Create a clock whose first stamp is 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new mutation.
    ///
    /// # Panics
    ///
    /// Panics if the counter would wrap, which would break uniqueness.
    pub fn next(&self) -> Version {
        let next = self
            .last
            .get()
            .checked_add(1)
            .expect("version clock exhausted");
        self.last.set(next);
        next
    }

    /// The most recently issued version (0 if none).
    #[must_use]
    pub fn current(&self) -> Version {
        self.last.get()
    }
}
