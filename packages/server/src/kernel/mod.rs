//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod nats;
pub mod payment;
pub mod publish_worker;
pub mod publisher;
pub mod store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{ServerDeps, DEFAULT_CREATION_TIMEOUT};
pub use nats::{
    BrokerConnector, BrokerStream, NatsConnector, NatsStream, OutboundMessage, TestBroker,
};
pub use payment::{AdyenEnvironment, AdyenOptions, AdyenProcessor, StripeOptions, StripeProcessor};
pub use publish_worker::{
    start_publish_worker, PublishWorker, PublishWorkerHandle, WorkerError, WorkerExit,
};
pub use publisher::{event_pipeline, EventPublisher, OnFull, PublishError, PublishQueue, QueuePolicy};
pub use store::PgOrganizationStore;
pub use test_dependencies::{InMemoryOrganizationStore, TestProcessor};
pub use traits::*;
