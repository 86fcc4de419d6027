//! NATS client abstraction for production and testing.
//!
//! The publish worker talks to the broker through two traits: a
//! [`BrokerConnector`] that establishes the long-lived outbound stream once,
//! and the [`BrokerStream`] it returns, which sends one message at a time.
//! [`TestBroker`] implements both for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// A message on its way to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Establishes the outbound stream to the broker.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn BrokerStream>>;
}

/// An established outbound stream. Owned by exactly one publish worker.
#[async_trait]
pub trait BrokerStream: Send {
    /// Send a message; returns once the broker connection accepted it.
    async fn send(&mut self, message: &OutboundMessage) -> Result<()>;
}

// =============================================================================
// Real NATS
// =============================================================================

/// Connects to a NATS server by URL.
pub struct NatsConnector {
    url: String,
}

impl NatsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl BrokerConnector for NatsConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerStream>> {
        let client = async_nats::connect(self.url.as_str()).await?;
        Ok(Box::new(NatsStream::new(client)))
    }
}

/// Real NATS client stream.
pub struct NatsStream {
    client: async_nats::Client,
}

impl NatsStream {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrokerStream for NatsStream {
    async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        self.client
            .publish(message.subject.clone(), message.payload.clone())
            .await?;
        // Flush so a dead connection surfaces on this send rather than a later one.
        self.client.flush().await?;
        Ok(())
    }
}

// =============================================================================
// Test broker
// =============================================================================

/// Mock broker that records every message sent on its streams.
///
/// Cloning shares the recorded state, so a test keeps one clone for
/// assertions and hands another to the publish worker.
#[derive(Clone, Default)]
pub struct TestBroker {
    sent: Arc<RwLock<Vec<OutboundMessage>>>,
    refuse_connections: Arc<AtomicBool>,
    /// Zero-based index of the send attempt that fails
    fail_at: Arc<RwLock<Option<usize>>>,
    attempts: Arc<RwLock<usize>>,
    send_delay: Arc<RwLock<Option<Duration>>>,
    notify: Arc<Notify>,
}

impl TestBroker {
    /// Create a new test broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `connect` call fail.
    pub fn refusing_connections(self) -> Self {
        self.refuse_connections.store(true, Ordering::SeqCst);
        self
    }

    /// Make the send attempt at `index` (zero-based) fail.
    pub fn failing_at(self, index: usize) -> Self {
        *self.fail_at.write().unwrap_or_else(|e| e.into_inner()) = Some(index);
        self
    }

    /// Make every send take `delay` on the tokio clock before it lands.
    pub fn with_send_delay(self, delay: Duration) -> Self {
        *self.send_delay.write().unwrap_or_else(|e| e.into_inner()) = Some(delay);
        self
    }

    /// Get all delivered messages, in delivery order.
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get delivered messages for a specific subject.
    pub fn messages_for_subject(&self, subject: &str) -> Vec<OutboundMessage> {
        self.sent
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|m| m.subject == subject)
            .cloned()
            .collect()
    }

    /// Get the count of delivered messages.
    pub fn sent_count(&self) -> usize {
        self.sent.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Get delivered messages grouped by subject.
    pub fn messages_by_subject(&self) -> HashMap<String, Vec<OutboundMessage>> {
        let messages = self.sent.read().unwrap_or_else(|e| e.into_inner());
        let mut by_subject: HashMap<String, Vec<OutboundMessage>> = HashMap::new();

        for msg in messages.iter() {
            by_subject
                .entry(msg.subject.clone())
                .or_default()
                .push(msg.clone());
        }

        by_subject
    }

    /// Wait until at least `count` messages were delivered.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_count(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.sent_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Deserialize a delivered message payload as JSON.
    pub fn deserialize_message<T: serde::de::DeserializeOwned>(
        &self,
        msg: &OutboundMessage,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&msg.payload)
    }

    fn record(&self, message: &OutboundMessage) -> Result<()> {
        let attempt = {
            let mut attempts = self.attempts.write().unwrap_or_else(|e| e.into_inner());
            let current = *attempts;
            *attempts += 1;
            current
        };

        let fail_at = *self.fail_at.read().unwrap_or_else(|e| e.into_inner());
        if fail_at == Some(attempt) {
            return Err(anyhow!("test broker: stream closed on send {}", attempt));
        }

        self.sent
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl BrokerConnector for TestBroker {
    async fn connect(&self) -> Result<Box<dyn BrokerStream>> {
        if self.refuse_connections.load(Ordering::SeqCst) {
            return Err(anyhow!("test broker: connection refused"));
        }
        Ok(Box::new(TestBrokerStream {
            broker: self.clone(),
        }))
    }
}

/// Stream handed out by [`TestBroker::connect`].
pub struct TestBrokerStream {
    broker: TestBroker,
}

#[async_trait]
impl BrokerStream for TestBrokerStream {
    async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let delay = *self.broker.send_delay.read().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.broker.record(message)
    }
}
