//! Zone client trait definition

use crate::error::ClientResult;
use crate::zone::{ZoneDescriptor, ZonePatch, ZoneSpec};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote zone API abstraction
///
/// Backends implement this trait to let the [`Reconciler`](crate::Reconciler)
/// drive zones through their lifecycle. Each call is one round-trip; any
/// per-call timeout is the implementation's responsibility.
///
/// Implementations must be safe to share between reconciliations of
/// distinct zones.
#[async_trait]
pub trait ZoneClient: Send + Sync {
    /// Submit a new zone; the backend usually answers with a PENDING zone
    async fn create(&self, spec: &ZoneSpec) -> ClientResult<ZoneDescriptor>;

    /// Fetch the zone; a missing zone is a `NotFound` error
    async fn read(&self, id: &str) -> ClientResult<ZoneDescriptor>;

    /// Send in-place changes
    async fn update(&self, id: &str, patch: &ZonePatch) -> ClientResult<ZoneDescriptor>;

    /// Request deletion
    async fn delete(&self, id: &str) -> ClientResult<()>;
}

#[async_trait]
impl<T> ZoneClient for Arc<T>
where
    T: ZoneClient + ?Sized,
{
    async fn create(&self, spec: &ZoneSpec) -> ClientResult<ZoneDescriptor> {
        (**self).create(spec).await
    }

    async fn read(&self, id: &str) -> ClientResult<ZoneDescriptor> {
        (**self).read(id).await
    }

    async fn update(&self, id: &str, patch: &ZonePatch) -> ClientResult<ZoneDescriptor> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        (**self).delete(id).await
    }
}
