//! Organization domain events published to the message broker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::nats::BrokerEvent;

/// Subject carrying the organization-created fact stream.
pub const ORGANIZATION_CREATED_SUBJECT: &str = "organization.created";

/// Fact emitted once per successful organization creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationCreated {
    pub organization_id: Uuid,
    pub created_by: String,
}

impl BrokerEvent for OrganizationCreated {
    fn subject() -> &'static str {
        ORGANIZATION_CREATED_SUBJECT
    }
}
