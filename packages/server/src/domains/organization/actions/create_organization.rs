//! Create organization action - the account-provisioning saga.
//!
//! One linear sequence under one timeout budget:
//!
//! ```text
//! begin tx ─► processor.create_account_holder ─► tx.insert ─► publisher.publish ─► tx.commit
//!    │                   │                           │               │                  │
//!    ▼                   ▼                           ▼               ▼                  ▼
//! ResourceUnavailable  UpstreamFailure      PersistenceFailure  EventPublication    CommitFailure
//! ```
//!
//! Rollback is the only compensation. The remote account holder is never
//! undone, so an insert failure after a processor success leaves an orphaned
//! processor account.
//!
//! The event is queued before commit. If commit then fails, the event may
//! still reach the broker for an organization that does not exist.

use anyhow::anyhow;
use tracing::{error, info, warn};

use crate::common::nats::BrokerEvent;
use crate::domains::organization::errors::OrganizationError;
use crate::domains::organization::events::OrganizationCreated;
use crate::domains::organization::models::{NewOrganization, Organization};
use crate::kernel::{AccountHolder, BaseStoreTransaction, ServerDeps};

/// Create an organization, provision its processor account and announce it.
///
/// Returns:
/// - the committed `Organization` (status `created`) on success
/// - `Timeout` when the whole sequence outlives `deps.creation_timeout`; the
///   open transaction is released by drop, a message already queued stays queued
pub async fn create_organization(
    mut intent: NewOrganization,
    deps: &ServerDeps,
) -> Result<Organization, OrganizationError> {
    intent.name = intent.name.trim().to_string();
    if intent.name.is_empty() {
        return Err(OrganizationError::InvalidInput(
            "name is required".to_string(),
        ));
    }

    let budget = deps.creation_timeout;
    match tokio::time::timeout(budget, run_creation(intent, deps)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_ms = budget.as_millis() as u64, "organization creation timed out");
            Err(OrganizationError::Timeout(budget))
        }
    }
}

async fn run_creation(
    intent: NewOrganization,
    deps: &ServerDeps,
) -> Result<Organization, OrganizationError> {
    let mut tx = deps
        .store
        .begin()
        .await
        .map_err(OrganizationError::ResourceUnavailable)?;

    let holder = AccountHolder::from(&intent);
    let processor_id = match deps.processor.create_account_holder(&holder).await {
        Ok(id) if !id.trim().is_empty() => id,
        Ok(_) => {
            let err = anyhow!("{} returned an empty account id", deps.processor.name());
            return abort(tx, OrganizationError::UpstreamFailure(err)).await;
        }
        Err(e) => return abort(tx, OrganizationError::UpstreamFailure(e)).await,
    };

    let organization = match tx.insert_organization(&intent.name, &processor_id).await {
        Ok(org) => org,
        Err(e) => {
            warn!(
                processor = deps.processor.name(),
                processor_id = %processor_id,
                "insert failed after account holder was created; processor account is orphaned"
            );
            return abort(tx, OrganizationError::PersistenceFailure(e)).await;
        }
    };

    let event = OrganizationCreated {
        organization_id: organization.id,
        created_by: intent.created_by,
    };
    let payload = match event.to_payload() {
        Ok(payload) => payload,
        Err(e) => return abort(tx, OrganizationError::EventPublicationFailure(e.into())).await,
    };
    if let Err(e) = deps.publisher.publish(OrganizationCreated::subject(), payload).await {
        return abort(tx, OrganizationError::EventPublicationFailure(e.into())).await;
    }

    if let Err(e) = tx.commit().await {
        error!(
            organization_id = %organization.id,
            error = %e,
            "commit failed after organization event was queued"
        );
        return Err(OrganizationError::CommitFailure(e));
    }

    info!(
        organization_id = %organization.id,
        processor = deps.processor.name(),
        processor_id = %organization.processor_id,
        status = %organization.status,
        "organization created"
    );

    Ok(organization)
}

/// Roll back and return `err`. A failed rollback is logged, never returned.
async fn abort<T>(
    tx: Box<dyn BaseStoreTransaction>,
    err: OrganizationError,
) -> Result<T, OrganizationError> {
    warn!(error = %err, "organization creation aborted");
    if let Err(rollback_err) = tx.rollback().await {
        error!(error = %rollback_err, "failed to roll back organization transaction");
    }
    Err(err)
}
