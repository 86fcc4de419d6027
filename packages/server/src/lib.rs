// Organizations Service - API Core
//
// Creates organizations as a saga: a payment processor account holder, a
// transactional row in Postgres, and an `organization.created` event handed
// to a background worker that publishes it to NATS.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
