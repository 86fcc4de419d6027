//! Read, rename and delete actions. Plain store calls, no events.

use tracing::info;
use uuid::Uuid;

use crate::domains::organization::errors::OrganizationError;
use crate::domains::organization::models::Organization;
use crate::kernel::ServerDeps;

pub async fn get_organization(
    id: Uuid,
    deps: &ServerDeps,
) -> Result<Organization, OrganizationError> {
    deps.store
        .find_organization(id)
        .await
        .map_err(OrganizationError::ResourceUnavailable)?
        .ok_or(OrganizationError::NotFound(id))
}

/// Rename an organization; its status becomes `updated`.
pub async fn update_organization(
    id: Uuid,
    name: String,
    deps: &ServerDeps,
) -> Result<Organization, OrganizationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(OrganizationError::InvalidInput(
            "name is required".to_string(),
        ));
    }

    let org = deps
        .store
        .update_organization(id, name)
        .await
        .map_err(OrganizationError::PersistenceFailure)?
        .ok_or(OrganizationError::NotFound(id))?;

    info!(organization_id = %org.id, status = %org.status, "organization updated");
    Ok(org)
}

pub async fn delete_organization(id: Uuid, deps: &ServerDeps) -> Result<(), OrganizationError> {
    let deleted = deps
        .store
        .delete_organization(id)
        .await
        .map_err(OrganizationError::PersistenceFailure)?;

    if !deleted {
        return Err(OrganizationError::NotFound(id));
    }

    info!(organization_id = %id, "organization deleted");
    Ok(())
}
