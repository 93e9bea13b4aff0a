//! SubscriptionRecord - one contact's subscription to one plan.
//!
//! The record mirrors a single remote subscription. Its status only ever
//! moves to what the processor reports, along the edges allowed by
//! [`SubscriptionStatus`]; cancellation is the one transition started
//! locally, and only after the processor confirmed it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CatalogId, ContactId, StateMachine, SubscriptionRecordId, Timestamp, ValidationError,
};

use super::{Plan, SubscriptionStatus};

/// What happened when a remote status was mirrored onto a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Status moved from `previous` to the remote one.
    Changed { previous: SubscriptionStatus },
    /// Remote status equals the local one. Expiry may still have moved.
    Unchanged,
    /// The state machine refused the move; nothing was touched.
    Rejected {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
    /// Record is canceled; nothing was touched.
    IgnoredTerminal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: SubscriptionRecordId,
    pub contact_id: ContactId,
    pub plan_id: CatalogId,
    pub status: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub remote_subscription_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Creates a record for a freshly paid subscription.
    ///
    /// The first period starts `now`, so expiry is one plan interval later.
    pub fn start(
        contact_id: ContactId,
        plan: &Plan,
        remote_subscription_id: impl Into<String>,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionRecordId::new(),
            contact_id,
            plan_id: plan.catalog_id.clone(),
            status,
            expires_at: plan.expiry_from(now),
            remote_subscription_id: remote_subscription_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, contact_id: &ContactId) -> bool {
        self.contact_id == *contact_id
    }

    pub fn is_canceled(&self) -> bool {
        self.status == SubscriptionStatus::Canceled
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        !self.expires_at.is_after(&now)
    }

    pub fn has_access(&self, now: Timestamp) -> bool {
        self.status.grants_access() && !self.is_expired(now)
    }

    /// Marks the record active after a successful checkout payment.
    ///
    /// Returns whether the status changed. Expiry restarts from `now`.
    pub fn activate(&mut self, plan: &Plan, now: Timestamp) -> Result<bool, ValidationError> {
        let changed = self.status != SubscriptionStatus::Active;
        if changed {
            self.status = self.status.transition_to(SubscriptionStatus::Active)?;
        }
        self.expires_at = plan.expiry_from(now);
        self.updated_at = now;
        Ok(changed)
    }

    /// Copies the processor's status and period end onto the record.
    pub fn mirror_remote(
        &mut self,
        remote_status: SubscriptionStatus,
        period_end: Option<Timestamp>,
        now: Timestamp,
    ) -> MirrorOutcome {
        if self.is_canceled() {
            return MirrorOutcome::IgnoredTerminal;
        }
        // Refused moves touch nothing, expiry included.
        if !self.status.accepts(&remote_status) {
            return MirrorOutcome::Rejected {
                from: self.status,
                to: remote_status,
            };
        }

        if let Some(period_end) = period_end {
            self.expires_at = period_end;
        }
        self.updated_at = now;

        if remote_status == self.status {
            return MirrorOutcome::Unchanged;
        }
        let previous = self.status;
        self.status = remote_status;
        MirrorOutcome::Changed { previous }
    }

    /// Moves the record to `canceled`. Call only after the remote cancel succeeded.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(SubscriptionStatus::Canceled)?;
        self.updated_at = now;
        Ok(())
    }
}
