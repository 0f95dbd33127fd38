#![forbid(unsafe_code)]

//! Single-threaded settle-once completions.
//!
//! [`deferred`] returns a producer/consumer pair. The producer ([`Deferred`])
//! settles exactly once, by resolving or rejecting; dropping it unsettled
//! rejects with [`RuntimeError::Abandoned`]. The consumer ([`Completion`])
//! can register callbacks, inspect the outcome, or be awaited.
//!
//! # Invariants
//!
//! 1. A completion settles at most once; later settle attempts are
//!    impossible because settling consumes the producer.
//! 2. Callbacks run in registration order, each exactly once. A callback
//!    registered after settlement runs immediately.
//! 3. No borrow is held while a callback runs.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{Result, RuntimeError};

type Callback<T> = Box<dyn FnOnce(&Result<T>)>;

struct Shared<T> {
    outcome: Option<Result<T>>,
    taken: bool,
    callbacks: Vec<Callback<T>>,
    waker: Option<Waker>,
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self {
            outcome: None,
            taken: false,
            callbacks: Vec::new(),
            waker: None,
        }
    }
}

/// Create an unsettled completion and the handle that settles it.
#[must_use]
pub fn deferred<T: Clone + 'static>() -> (Deferred<T>, Completion<T>) {
    let shared = Rc::new(RefCell::new(Shared::default()));
    (
        Deferred {
            shared: Rc::clone(&shared),
            settled: false,
        },
        Completion { shared },
    )
}

/// The settling side of a [`Completion`].
pub struct Deferred<T: Clone + 'static> {
    shared: Rc<RefCell<Shared<T>>>,
    settled: bool,
}

impl<T: Clone + 'static> Deferred<T> {
    pub fn resolve(mut self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(mut self, error: RuntimeError) {
        self.settle(Err(error));
    }

    pub fn settle_with(mut self, outcome: Result<T>) {
        self.settle(outcome);
    }

    fn settle(&mut self, outcome: Result<T>) {
        self.settled = true;
        let (callbacks, waker) = {
            let mut shared = self.shared.borrow_mut();
            shared.outcome = Some(outcome.clone());
            (std::mem::take(&mut shared.callbacks), shared.waker.take())
        };
        for callback in callbacks {
            callback(&outcome);
        }
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T: Clone + 'static> Drop for Deferred<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.settle(Err(RuntimeError::Abandoned));
        }
    }
}

/// The observing side: a settle-once outcome that is also a [`Future`].
pub struct Completion<T: Clone + 'static> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T: Clone + 'static> Completion<T> {
    /// An already-resolved completion.
    #[must_use]
    pub fn resolved(value: T) -> Self {
        let (deferred, completion) = deferred();
        deferred.resolve(value);
        completion
    }

    /// An already-rejected completion.
    #[must_use]
    pub fn rejected(error: RuntimeError) -> Self {
        let (deferred, completion) = deferred();
        deferred.reject(error);
        completion
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        let shared = self.shared.borrow();
        shared.outcome.is_some() || shared.taken
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.shared.borrow().outcome, Some(Ok(_)))
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self.shared.borrow().outcome, Some(Err(_)))
    }

    /// A copy of the outcome, once settled.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T>> {
        self.shared.borrow().outcome.clone()
    }

    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.outcome().and_then(std::result::Result::ok)
    }

    #[must_use]
    pub fn error(&self) -> Option<RuntimeError> {
        self.outcome().and_then(std::result::Result::err)
    }

    /// Run `callback` once the completion settles (immediately if it has).
    pub fn on_settled(&self, callback: impl FnOnce(&Result<T>) + 'static) -> &Self {
        let settled = self.outcome();
        match settled {
            Some(outcome) => callback(&outcome),
            None => self.shared.borrow_mut().callbacks.push(Box::new(callback)),
        }
        self
    }

    /// Run `callback` with the value if the completion resolves.
    pub fn done(&self, callback: impl FnOnce(&T) + 'static) -> &Self {
        self.on_settled(move |outcome| {
            if let Ok(value) = outcome {
                callback(value);
            }
        })
    }

    /// Run `callback` with the error if the completion rejects.
    pub fn fail(&self, callback: impl FnOnce(&RuntimeError) + 'static) -> &Self {
        self.on_settled(move |outcome| {
            if let Err(error) = outcome {
                callback(error);
            }
        })
    }
}

impl<T: Clone + 'static> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.borrow_mut();
        if let Some(outcome) = shared.outcome.take() {
            shared.taken = true;
            return Poll::Ready(outcome);
        }
        if shared.taken {
            return Poll::Ready(Err(RuntimeError::Consumed));
        }
        shared.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T: Clone + 'static> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resolved() {
            "resolved"
        } else if self.is_rejected() {
            "rejected"
        } else if self.is_settled() {
            "taken"
        } else {
            "pending"
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}
