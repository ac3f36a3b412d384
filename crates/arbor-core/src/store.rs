//! Key-value store contract for persisted tree state.
//!
//! The engine treats persistence as a black box holding one JSON value:
//! - `load` returns the raw stored value (or `None` for an empty store); the
//!   engine normalizes it, so stores never interpret legacy layouts
//! - `save` persists the whole state or fails; there are no partial writes
//!
//! Stores are synchronous. Two writers on the same backing key race with
//! last-write-wins; no cross-process coordination is attempted.
//!
//! `MemoryStore` lives here so the engine can be exercised without I/O. Disk
//! backed stores live in the `arbor-store` crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::errors::{ArborError, ArborResult};
use crate::model::TreeState;

/// Synchronous persistence for one tree.
pub trait StateStore {
    /// Load the raw stored value, if any.
    fn load(&self) -> ArborResult<Option<Value>>;

    /// Persist the full state atomically.
    fn save(&self, state: &TreeState) -> ArborResult<()>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn load(&self) -> ArborResult<Option<Value>> {
        (**self).load()
    }

    fn save(&self, state: &TreeState) -> ArborResult<()> {
        (**self).save(state)
    }
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn load(&self) -> ArborResult<Option<Value>> {
        (**self).load()
    }

    fn save(&self, state: &TreeState) -> ArborResult<()> {
        (**self).save(state)
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<Value>>,
    fail_next: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a raw value (e.g. a legacy blob).
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            ..Self::default()
        }
    }

    /// Current raw contents.
    pub fn snapshot(&self) -> Option<Value> {
        self.value.lock().clone()
    }

    /// Make the next `save` fail with a storage error.
    pub fn fail_next_save(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> ArborResult<Option<Value>> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, state: &TreeState) -> ArborResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ArborError::storage("simulated write failure"));
        }
        let v = serde_json::to_value(state)?;
        *self.value.lock() = Some(v);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_returns_value() {
        let s = MemoryStore::new();
        assert!(s.load().unwrap().is_none());
        s.save(&TreeState::default()).unwrap();
        let v = s.load().unwrap().unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(s.saves(), 1);
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let s = MemoryStore::new();
        s.fail_next_save();
        let e = s.save(&TreeState::default()).unwrap_err();
        assert!(e.is_retryable());
        assert!(s.snapshot().is_none());
        s.save(&TreeState::default()).unwrap();
    }
}
