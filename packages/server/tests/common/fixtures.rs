//! Shared builders for integration tests.

use std::sync::Arc;

use server_core::domains::organization::NewOrganization;
use server_core::kernel::{
    event_pipeline, BaseOrganizationStore, BasePaymentProcessor, PublishQueue, QueuePolicy,
    ServerDeps,
};

/// A creation intent for `name` located in Reno, US.
pub fn intent(name: &str) -> NewOrganization {
    NewOrganization {
        name: name.to_string(),
        city: "Reno".to_string(),
        country: "US".to_string(),
        house_number: "12".to_string(),
        postal_code: "89501".to_string(),
        state: "NV".to_string(),
        street: "Virginia St".to_string(),
        created_by: "user_1".to_string(),
    }
}

/// Wire deps over an unbounded queue, returning the queue for the caller to drain.
pub fn deps_with_queue(
    store: Arc<dyn BaseOrganizationStore>,
    processor: Arc<dyn BasePaymentProcessor>,
) -> (ServerDeps, PublishQueue) {
    let (publisher, queue) = event_pipeline(QueuePolicy::Unbounded);
    (ServerDeps::new(store, processor, publisher), queue)
}

/// `prefix` plus a random suffix, so tests sharing one database do not collide.
pub fn unique_name(prefix: &str) -> String {
    format!("{} {}", prefix, uuid::Uuid::new_v4().simple())
}
