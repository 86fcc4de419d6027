use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Terminal errors of the organization actions.
///
/// Each creation failure is reported once; by the time a caller sees one, the
/// creation transaction has already been released.
#[derive(Error, Debug)]
pub enum OrganizationError {
    #[error("Invalid organization: {0}")]
    InvalidInput(String),

    #[error("Organization not found: {0}")]
    NotFound(Uuid),

    #[error("Store unavailable: {0}")]
    ResourceUnavailable(#[source] anyhow::Error),

    #[error("Failed to create account holder: {0}")]
    UpstreamFailure(#[source] anyhow::Error),

    #[error("Failed to persist organization: {0}")]
    PersistenceFailure(#[source] anyhow::Error),

    #[error("Failed to publish organization event: {0}")]
    EventPublicationFailure(#[source] anyhow::Error),

    #[error("Failed to commit organization: {0}")]
    CommitFailure(#[source] anyhow::Error),

    #[error("Organization creation exceeded {0:?}")]
    Timeout(Duration),
}
