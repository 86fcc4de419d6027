//! Event publisher - synchronous facade over the publish queue.
//!
//! [`EventPublisher::publish`] enqueues a message for the publish worker and
//! returns without touching the broker. A returned `Ok` means the message sits
//! in process memory waiting for the worker; it does not mean it was delivered.
//!
//! # Backpressure
//!
//! The queue behaviour is chosen with [`QueuePolicy`]:
//!
//! | Policy                         | Full queue                         |
//! |--------------------------------|------------------------------------|
//! | `Unbounded`                    | never full, `publish` never waits  |
//! | `Bounded { on_full: Block }`   | caller waits for space             |
//! | `Bounded { on_full: Reject }`  | `PublishError::QueueFull`          |
//!
//! A blocked producer is only released by free space or by its own caller's
//! deadline (the creation saga wraps `publish` in its timeout budget).

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::kernel::nats::OutboundMessage;

/// What a bounded queue does with a producer when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFull {
    Block,
    Reject,
}

/// Capacity and backpressure policy of the publish queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    Unbounded,
    Bounded { capacity: usize, on_full: OnFull },
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self::Unbounded
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publish queue is full")]
    QueueFull,

    #[error("publish queue is closed")]
    Closed,
}

#[derive(Clone)]
enum QueueSender {
    Unbounded(mpsc::UnboundedSender<OutboundMessage>),
    Bounded {
        tx: mpsc::Sender<OutboundMessage>,
        on_full: OnFull,
    },
}

enum QueueReceiver {
    Unbounded(mpsc::UnboundedReceiver<OutboundMessage>),
    Bounded(mpsc::Receiver<OutboundMessage>),
}

/// Producer handle; cheap to clone and share across requests.
#[derive(Clone)]
pub struct EventPublisher {
    sender: QueueSender,
}

/// Consumer end of the publish queue. Exactly one exists per pipeline.
pub struct PublishQueue {
    receiver: QueueReceiver,
}

/// Create a publisher and the queue its messages land in.
pub fn event_pipeline(policy: QueuePolicy) -> (EventPublisher, PublishQueue) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                EventPublisher {
                    sender: QueueSender::Unbounded(tx),
                },
                PublishQueue {
                    receiver: QueueReceiver::Unbounded(rx),
                },
            )
        }
        QueuePolicy::Bounded { capacity, on_full } => {
            // tokio rejects zero-capacity channels
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (
                EventPublisher {
                    sender: QueueSender::Bounded { tx, on_full },
                },
                PublishQueue {
                    receiver: QueueReceiver::Bounded(rx),
                },
            )
        }
    }
}

impl EventPublisher {
    /// Accept a message for delivery.
    pub async fn publish(
        &self,
        subject: impl Into<String>,
        payload: Bytes,
    ) -> Result<(), PublishError> {
        let message = OutboundMessage {
            subject: subject.into(),
            payload,
        };
        debug!(subject = %message.subject, bytes = message.payload.len(), "queueing message");

        match &self.sender {
            QueueSender::Unbounded(tx) => tx.send(message).map_err(|_| PublishError::Closed),
            QueueSender::Bounded {
                tx,
                on_full: OnFull::Block,
            } => tx.send(message).await.map_err(|_| PublishError::Closed),
            QueueSender::Bounded {
                tx,
                on_full: OnFull::Reject,
            } => tx.try_send(message).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => PublishError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
            }),
        }
    }

    /// Whether the consumer end has gone away.
    pub fn is_closed(&self) -> bool {
        match &self.sender {
            QueueSender::Unbounded(tx) => tx.is_closed(),
            QueueSender::Bounded { tx, .. } => tx.is_closed(),
        }
    }
}

impl PublishQueue {
    /// Wait for the next message; `None` once every publisher is dropped.
    pub async fn next(&mut self) -> Option<OutboundMessage> {
        match &mut self.receiver {
            QueueReceiver::Unbounded(rx) => rx.recv().await,
            QueueReceiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Take the next message if one is already queued.
    pub fn try_next(&mut self) -> Option<OutboundMessage> {
        match &mut self.receiver {
            QueueReceiver::Unbounded(rx) => rx.try_recv().ok(),
            QueueReceiver::Bounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Stop accepting messages. Already queued messages stay readable.
    pub fn close(&mut self) {
        match &mut self.receiver {
            QueueReceiver::Unbounded(rx) => rx.close(),
            QueueReceiver::Bounded(rx) => rx.close(),
        }
    }

    /// Close the queue and discard what is left, returning how many were dropped.
    pub fn discard_remaining(&mut self) -> usize {
        self.close();
        let mut dropped = 0;
        while self.try_next().is_some() {
            dropped += 1;
        }
        dropped
    }
}
