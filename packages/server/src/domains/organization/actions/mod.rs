//! Organization domain actions - business logic functions
//!
//! Actions are async functions called directly from the HTTP routes.

mod create_organization;
mod manage;

pub use create_organization::create_organization;
pub use manage::{delete_organization, get_organization, update_organization};
