//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by the
//! organization actions. External services sit behind trait objects so tests
//! can swap in the doubles from `test_dependencies`.

use std::sync::Arc;
use std::time::Duration;

use crate::kernel::{BaseOrganizationStore, BasePaymentProcessor, EventPublisher};

/// Wall-clock budget for one organization creation.
pub const DEFAULT_CREATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Server dependencies accessible to actions (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseOrganizationStore>,
    pub processor: Arc<dyn BasePaymentProcessor>,
    pub publisher: EventPublisher,
    /// Budget covering the whole creation sequence, commit included
    pub creation_timeout: Duration,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseOrganizationStore>,
        processor: Arc<dyn BasePaymentProcessor>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            processor,
            publisher,
            creation_timeout: DEFAULT_CREATION_TIMEOUT,
        }
    }

    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }
}
