// Organization domain - registers organizations with a payment processor
//
// Responsibilities:
// - Provisioning a processor account holder per organization
// - Persisting the organization row
// - Announcing creation on the message broker

pub mod actions;
pub mod errors;
pub mod events;
pub mod models;

pub use errors::OrganizationError;
pub use models::*;
