// Common utilities shared across domains
pub mod nats;

pub use nats::BrokerEvent;
