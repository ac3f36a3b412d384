use arbor_core::model::TreeState;
use arbor_core::store::StateStore;
use arbor_core::ArborResult;
use bytesize::ByteSize;
use serde_json::Value;

use crate::error::StoreError;

/// Wraps a store and refuses saves whose serialized size exceeds `quota`.
///
/// The refused state is never handed to the inner store.
#[derive(Debug)]
pub struct QuotaStore<S> {
    inner: S,
    quota: ByteSize,
}

impl<S: StateStore> QuotaStore<S> {
    pub fn new(inner: S, quota: ByteSize) -> Self {
        Self { inner, quota }
    }

    pub fn quota(&self) -> ByteSize {
        self.quota
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StateStore> StateStore for QuotaStore<S> {
    fn load(&self) -> ArborResult<Option<Value>> {
        self.inner.load()
    }

    fn save(&self, state: &TreeState) -> ArborResult<()> {
        let size = serde_json::to_vec(state)?.len() as u64;
        if size > self.quota.as_u64() {
            tracing::warn!(size, quota = self.quota.as_u64(), "save rejected by quota");
            return Err(StoreError::QuotaExceeded {
                size: ByteSize::b(size).to_string(),
                quota: self.quota.to_string(),
            }
            .into());
        }
        self.inner.save(state)
    }
}
