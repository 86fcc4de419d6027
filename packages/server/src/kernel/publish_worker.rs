//! Publish worker - the single consumer of the publish queue.
//!
//! The worker owns the broker stream and forwards queued messages one at a
//! time, in queue order.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──connect──► Draining ──cancel──► Shutdown (queued messages dropped)
//!      │                       │
//!      └─ connect error        └─ send error ──► Failed (queue closed)
//!         (startup fails)
//! ```
//!
//! There is no reconnect and no retry. After a send failure the queue is
//! closed, so later `publish` calls fail with `PublishError::Closed` instead of
//! piling up messages nobody will read. Nothing is persisted: messages still
//! queued when the worker stops are lost.
//!
//! # Example
//!
//! ```ignore
//! let (publisher, queue) = event_pipeline(QueuePolicy::Unbounded);
//! let worker = start_publish_worker(&NatsConnector::new(url), queue, shutdown.clone()).await?;
//!
//! // ... serve requests using `publisher` ...
//!
//! shutdown.cancel();
//! worker.join().await?;
//! ```

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::kernel::nats::{BrokerConnector, BrokerStream};
use crate::kernel::publisher::PublishQueue;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to establish broker stream: {0}")]
    Connect(#[source] anyhow::Error),

    #[error("failed to publish to {subject}: {source}")]
    Send {
        subject: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("publish worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// How a worker that did not fail came to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Shutdown was requested; `dropped` messages were still queued.
    /// A send already under way when shutdown arrived counts as `sent`.
    Cancelled { sent: u64, dropped: usize },
    /// Every publisher was dropped and the queue ran dry.
    QueueClosed { sent: u64 },
}

/// A connected worker that has not started draining yet.
pub struct PublishWorker {
    stream: Box<dyn BrokerStream>,
    queue: PublishQueue,
    shutdown: CancellationToken,
}

impl PublishWorker {
    /// Establish the broker stream. A failure here is a startup failure.
    pub async fn connect(
        connector: &dyn BrokerConnector,
        queue: PublishQueue,
        shutdown: CancellationToken,
    ) -> Result<Self, WorkerError> {
        let stream = connector.connect().await.map_err(WorkerError::Connect)?;
        info!("publish worker connected to broker");
        Ok(Self {
            stream,
            queue,
            shutdown,
        })
    }

    /// Drain the queue until shutdown, queue closure or a send failure.
    pub async fn run(mut self) -> Result<WorkerExit, WorkerError> {
        let mut sent: u64 = 0;

        loop {
            let message = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    return Ok(self.stop_cancelled(sent));
                }
                next = self.queue.next() => match next {
                    Some(message) => message,
                    None => {
                        info!(sent, "publish queue closed, publish worker stopping");
                        return Ok(WorkerExit::QueueClosed { sent });
                    }
                },
            };

            // An in-flight send always completes; shutdown is checked on the next turn.
            if let Err(e) = self.stream.send(&message).await {
                let dropped = self.queue.discard_remaining();
                error!(
                    subject = %message.subject,
                    error = %e,
                    dropped,
                    "failed to publish message, publish worker stopping"
                );
                return Err(WorkerError::Send {
                    subject: message.subject,
                    source: e,
                });
            }

            sent += 1;
            debug!(subject = %message.subject, sent, "published message");
        }
    }

    fn stop_cancelled(&mut self, sent: u64) -> WorkerExit {
        let dropped = self.queue.discard_remaining();
        if dropped > 0 {
            warn!(dropped, "publish worker shut down with undelivered messages");
        }
        info!(sent, "publish worker stopped");
        WorkerExit::Cancelled { sent, dropped }
    }

    /// Run the drain loop on a background task.
    pub fn spawn(self) -> PublishWorkerHandle {
        let shutdown = self.shutdown.clone();
        let join = tokio::spawn(self.run());
        PublishWorkerHandle { shutdown, join }
    }
}

/// Connect and spawn the worker in one step.
pub async fn start_publish_worker(
    connector: &dyn BrokerConnector,
    queue: PublishQueue,
    shutdown: CancellationToken,
) -> Result<PublishWorkerHandle, WorkerError> {
    let worker = PublishWorker::connect(connector, queue, shutdown).await?;
    Ok(worker.spawn())
}

/// Handle to a running publish worker.
pub struct PublishWorkerHandle {
    shutdown: CancellationToken,
    join: JoinHandle<Result<WorkerExit, WorkerError>>,
}

impl PublishWorkerHandle {
    /// Request shutdown and wait for the worker to stop.
    pub async fn stop(self) -> Result<WorkerExit, WorkerError> {
        self.shutdown.cancel();
        self.join().await
    }

    /// Wait for the worker to stop on its own.
    pub async fn join(self) -> Result<WorkerExit, WorkerError> {
        self.join.await?
    }
}
