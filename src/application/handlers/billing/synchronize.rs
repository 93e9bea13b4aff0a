//! Remote upsert for any `Subscribable` record.

use crate::domain::billing::{BillingError, Subscribable};
use crate::ports::RemoteObjectClient;

/// What a synchronization did on the processor side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The record had no remote copy; one was created and its id stored on the record.
    Created { remote_id: String },
    /// The existing remote copy was overwritten with the update payload.
    Updated,
}

impl SyncOutcome {
    pub fn assigned_id(&self) -> Option<&str> {
        match self {
            SyncOutcome::Created { remote_id } => Some(remote_id),
            SyncOutcome::Updated => None,
        }
    }
}

/// Pushes `entity` to the processor.
///
/// Creates carry the entity's idempotency key, so a create repeated before
/// the returned id is persisted resolves to the same remote object. The
/// caller persists the entity afterwards; a remote failure leaves it untouched.
pub async fn synchronize<T>(
    remote: &dyn RemoteObjectClient,
    entity: &mut T,
) -> Result<SyncOutcome, BillingError>
where
    T: Subscribable + ?Sized,
{
    let kind = entity.remote_kind();

    if let Some(remote_id) = entity.remote_id().map(str::to_string) {
        remote
            .create_or_update(kind, &entity.update_payload(), Some(&remote_id), None)
            .await
            .map_err(|e| {
                tracing::warn!(kind = %kind, remote_id = %remote_id, error = %e, "remote update failed");
                e
            })?;
        tracing::debug!(kind = %kind, remote_id = %remote_id, "remote copy updated");
        return Ok(SyncOutcome::Updated);
    }

    let key = entity.idempotency_key();
    let object = remote
        .create_or_update(kind, &entity.create_payload(), None, Some(&key))
        .await
        .map_err(|e| {
            tracing::warn!(kind = %kind, idempotency_key = %key, error = %e, "remote create failed");
            e
        })?;

    tracing::info!(kind = %kind, remote_id = %object.id, "remote copy created");
    entity.set_remote_id(object.id.clone());
    Ok(SyncOutcome::Created {
        remote_id: object.id,
    })
}
