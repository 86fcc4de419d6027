//! Common NATS publishing utilities.
//!
//! Domain events implement [`BrokerEvent`] to declare the subject they are
//! published on and how they are encoded. Encoding is JSON by default.
//!
//! # Publishing Mechanism
//!
//! Events are not written to the broker directly. Callers hand the encoded
//! payload to [`EventPublisher`](crate::kernel::EventPublisher), which queues it
//! for the single publish worker that owns the broker connection.

use bytes::Bytes;
use serde::Serialize;

/// Trait for domain events that can be published to NATS.
///
/// # Example
///
/// ```ignore
/// impl BrokerEvent for MemberJoined {
///     fn subject() -> &'static str {
///         "member.joined"
///     }
/// }
///
/// publisher.publish(MemberJoined::subject(), event.to_payload()?).await?;
/// ```
pub trait BrokerEvent: Serialize + Send + Sync {
    /// Get the NATS subject this event is published on.
    fn subject() -> &'static str;

    /// Encode the event as a NATS payload.
    fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
