#![forbid(unsafe_code)]

//! Where model data comes from during an update.
//!
//! The update orchestrator fetches every model a rebuild needs that holds no
//! usable data. How that data is produced is the application's business: a
//! transport, a cache, or a fixture table all implement [`DataSource`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;
use vigil_model::ModelId;

use crate::error::{Result, RuntimeError};

pub trait DataSource {
    /// Produce the full payload for `model`.
    fn fetch(&self, model: &ModelId) -> Result<Value>;

    /// Fetch several models. The default fetches one at a time; batching
    /// sources override it. Results are positional.
    fn fetch_all(&self, models: &[ModelId]) -> Vec<Result<Value>> {
        models.iter().map(|model| self.fetch(model)).collect()
    }
}

/// A source backed by a closure. See [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnSource<F>(F);

/// Wrap `fetch` as a [`DataSource`].
pub fn from_fn<F>(fetch: F) -> FnSource<F>
where
    F: Fn(&ModelId) -> Result<Value>,
{
    FnSource(fetch)
}

impl<F> DataSource for FnSource<F>
where
    F: Fn(&ModelId) -> Result<Value>,
{
    fn fetch(&self, model: &ModelId) -> Result<Value> {
        (self.0)(model)
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSource")
    }
}

impl<S: DataSource + ?Sized> DataSource for Rc<S> {
    fn fetch(&self, model: &ModelId) -> Result<Value> {
        (**self).fetch(model)
    }

    fn fetch_all(&self, models: &[ModelId]) -> Vec<Result<Value>> {
        (**self).fetch_all(models)
    }
}

/// A source with nothing to offer. Every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDataSource;

impl DataSource for NoDataSource {
    fn fetch(&self, model: &ModelId) -> Result<Value> {
        Err(RuntimeError::fetch(model, "no data source configured"))
    }
}

/// Payloads keyed by model key (`person&id=4`), with a fetch log.
#[derive(Default)]
pub struct StaticDataSource {
    payloads: RefCell<AHashMap<String, Value>>,
    fetched: RefCell<Vec<String>>,
}

impl StaticDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `payload` for the model with `key`.
    #[must_use]
    pub fn with(self, key: impl Into<String>, payload: Value) -> Self {
        self.insert(key, payload);
        self
    }

    pub fn insert(&self, key: impl Into<String>, payload: Value) {
        self.payloads.borrow_mut().insert(key.into(), payload);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.payloads.borrow_mut().remove(key)
    }

    /// Keys fetched so far, in fetch order.
    #[must_use]
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl DataSource for StaticDataSource {
    fn fetch(&self, model: &ModelId) -> Result<Value> {
        let key = model.key();
        self.fetched.borrow_mut().push(key.clone());
        self.payloads
            .borrow()
            .get(&key)
            .cloned()
            .ok_or_else(|| RuntimeError::fetch(&key, "no payload"))
    }
}

impl fmt::Debug for StaticDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticDataSource")
            .field("payloads", &self.payloads.borrow().len())
            .field("fetched", &self.fetched.borrow().len())
            .finish()
    }
}
