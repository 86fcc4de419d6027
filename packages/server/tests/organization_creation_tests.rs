//! Integration tests for the organization creation saga and the publish worker.
//!
//! These run against the in-memory store, the test processor and the test
//! broker, so they need no external services.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::common::{deps_with_queue, intent};
use server_core::domains::organization::actions::create_organization;
use server_core::domains::organization::events::{
    OrganizationCreated, ORGANIZATION_CREATED_SUBJECT,
};
use server_core::domains::organization::{OrganizationError, OrganizationStatus};
use server_core::kernel::{
    event_pipeline, start_publish_worker, InMemoryOrganizationStore, OnFull, PublishError,
    QueuePolicy, TestBroker, TestProcessor, WorkerExit,
};

// =============================================================================
// End-to-end creation
// =============================================================================

/// A successful creation commits the row and the worker delivers one event.
#[tokio::test]
async fn creation_is_committed_and_announced() {
    let store = InMemoryOrganizationStore::new();
    let processor = TestProcessor::returning("acct_123");
    let (deps, queue) = deps_with_queue(Arc::new(store.clone()), Arc::new(processor.clone()));

    let broker = TestBroker::new();
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();

    let org = create_organization(intent("Acme"), &deps).await.unwrap();

    assert_eq!(org.name, "Acme");
    assert_eq!(org.processor_id, "acct_123");
    assert_eq!(org.status, OrganizationStatus::Created);
    assert_eq!(store.rows(), vec![org.clone()]);

    let calls = processor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].city, "Reno");

    assert!(broker.wait_for_count(1, Duration::from_secs(2)).await);
    let messages = broker.messages_for_subject(ORGANIZATION_CREATED_SUBJECT);
    assert_eq!(messages.len(), 1);
    let event: OrganizationCreated = broker.deserialize_message(&messages[0]).unwrap();
    assert_eq!(event.organization_id, org.id);
    assert_eq!(event.created_by, "user_1");

    let exit = worker.stop().await.unwrap();
    assert_eq!(exit, WorkerExit::Cancelled { sent: 1, dropped: 0 });
}

/// Processor failure leaves no row and no event.
#[tokio::test]
async fn processor_failure_leaves_nothing_behind() {
    let store = InMemoryOrganizationStore::new();
    let (deps, mut queue) = deps_with_queue(
        Arc::new(store.clone()),
        Arc::new(TestProcessor::failing("card network down")),
    );

    let err = create_organization(intent("Acme"), &deps).await.unwrap_err();

    assert!(matches!(err, OrganizationError::UpstreamFailure(_)));
    assert_eq!(store.row_count(), 0);
    assert_eq!(store.transactions_committed(), 0);
    assert!(queue.try_next().is_none());
}

/// Insert failure after a processor success leaves the remote account in place.
#[tokio::test]
async fn insert_failure_orphans_processor_account() {
    let store = InMemoryOrganizationStore::new().failing_insert();
    let processor = TestProcessor::returning("acct_123");
    let (deps, mut queue) = deps_with_queue(Arc::new(store.clone()), Arc::new(processor.clone()));

    let err = create_organization(intent("Acme"), &deps).await.unwrap_err();

    assert!(matches!(err, OrganizationError::PersistenceFailure(_)));
    assert_eq!(processor.call_count(), 1);
    assert_eq!(store.row_count(), 0);
    assert!(queue.try_next().is_none());
}

/// Once the worker has stopped, creation fails at publication and rolls back.
#[tokio::test]
async fn publish_after_worker_stopped_rolls_back() {
    let store = InMemoryOrganizationStore::new();
    let (deps, queue) = deps_with_queue(
        Arc::new(store.clone()),
        Arc::new(TestProcessor::returning("acct_123")),
    );

    let broker = TestBroker::new();
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();
    worker.stop().await.unwrap();

    let err = create_organization(intent("Acme"), &deps).await.unwrap_err();

    assert!(matches!(err, OrganizationError::EventPublicationFailure(_)));
    assert_eq!(store.row_count(), 0);
    assert_eq!(store.transactions_committed(), 0);
    assert_eq!(broker.sent_count(), 0);
}

/// A slow processor exhausts the budget; nothing is committed or queued.
#[tokio::test(start_paused = true)]
async fn slow_processor_times_out() {
    let store = InMemoryOrganizationStore::new();
    let processor = TestProcessor::returning("acct_123").with_delay(Duration::from_secs(10));
    let (deps, mut queue) = deps_with_queue(Arc::new(store.clone()), Arc::new(processor));
    let deps = deps.with_creation_timeout(Duration::from_millis(50));

    let err = create_organization(intent("Acme"), &deps).await.unwrap_err();

    assert!(matches!(err, OrganizationError::Timeout(_)));
    assert_eq!(store.row_count(), 0);
    assert_eq!(store.transactions_begun(), 1);
    assert_eq!(store.transactions_released(), 1);
    assert!(queue.try_next().is_none());
}

/// Concurrent creations each commit their own row and event.
#[tokio::test]
async fn concurrent_creations_are_independent() {
    let store = InMemoryOrganizationStore::new();
    let (deps, queue) = deps_with_queue(
        Arc::new(store.clone()),
        Arc::new(TestProcessor::sequential("acct")),
    );
    let deps = Arc::new(deps);

    let broker = TestBroker::new();
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let deps = deps.clone();
        handles.push(tokio::spawn(async move {
            create_organization(intent(&format!("Org {}", i)), &deps).await
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    assert_eq!(store.row_count(), 8);
    assert!(broker.wait_for_count(8, Duration::from_secs(2)).await);

    let mut announced: Vec<_> = broker
        .messages_for_subject(ORGANIZATION_CREATED_SUBJECT)
        .iter()
        .map(|m| {
            broker
                .deserialize_message::<OrganizationCreated>(m)
                .unwrap()
                .organization_id
        })
        .collect();
    announced.sort();
    ids.sort();
    assert_eq!(announced, ids);

    worker.stop().await.unwrap();
}

/// Each producer's organizations are announced in the order its creations returned.
#[tokio::test]
async fn saga_events_keep_per_producer_order() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 5;

    let store = InMemoryOrganizationStore::new();
    let (deps, queue) = deps_with_queue(
        Arc::new(store.clone()),
        Arc::new(TestProcessor::sequential("acct")),
    );
    let deps = Arc::new(deps);

    let broker = TestBroker::new();
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for p in 0..PRODUCERS {
        let deps = deps.clone();
        handles.push(tokio::spawn(async move {
            let producer = format!("producer_{}", p);
            let mut ids = Vec::new();
            for i in 0..PER_PRODUCER {
                let mut org = intent(&format!("Org {}-{}", p, i));
                org.created_by = producer.clone();
                ids.push(create_organization(org, &deps).await.unwrap().id);
            }
            (producer, ids)
        }));
    }
    let mut returned = Vec::new();
    for handle in handles {
        returned.push(handle.await.unwrap());
    }

    assert!(
        broker
            .wait_for_count(PRODUCERS * PER_PRODUCER, Duration::from_secs(2))
            .await
    );
    let announced: Vec<OrganizationCreated> = broker
        .messages_for_subject(ORGANIZATION_CREATED_SUBJECT)
        .iter()
        .map(|m| broker.deserialize_message::<OrganizationCreated>(m).unwrap())
        .collect();

    for (producer, ids) in returned {
        let delivered: Vec<_> = announced
            .iter()
            .filter(|event| event.created_by == producer)
            .map(|event| event.organization_id)
            .collect();
        assert_eq!(delivered, ids, "delivery order for {}", producer);
    }

    worker.stop().await.unwrap();
}

// =============================================================================
// Publish queue ordering and backpressure
// =============================================================================

/// Messages from many producers arrive in each producer's own order.
#[tokio::test]
async fn per_producer_order_is_preserved() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 25;

    let (publisher, queue) = event_pipeline(QueuePolicy::Bounded {
        capacity: 4,
        on_full: OnFull::Block,
    });
    let broker = TestBroker::new();
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for p in 0..PRODUCERS {
        let publisher = publisher.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_PRODUCER {
                publisher
                    .publish(format!("producer.{}", p), Bytes::from(i.to_string()))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    drop(publisher);

    let exit = worker.join().await.unwrap();
    assert_eq!(
        exit,
        WorkerExit::QueueClosed {
            sent: (PRODUCERS * PER_PRODUCER) as u64
        }
    );

    let by_subject = broker.messages_by_subject();
    assert_eq!(by_subject.len(), PRODUCERS);
    for messages in by_subject.values() {
        let sequence: Vec<usize> = messages
            .iter()
            .map(|m| std::str::from_utf8(&m.payload).unwrap().parse().unwrap())
            .collect();
        assert_eq!(sequence, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

/// A bounded queue set to reject reports full instead of waiting.
#[tokio::test]
async fn rejecting_queue_reports_full() {
    let (publisher, _queue) = event_pipeline(QueuePolicy::Bounded {
        capacity: 1,
        on_full: OnFull::Reject,
    });

    publisher
        .publish("organization.created", Bytes::from_static(b"{}"))
        .await
        .unwrap();
    let err = publisher
        .publish("organization.created", Bytes::from_static(b"{}"))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::QueueFull));
}

/// A broker send failure stops the worker and closes the queue to new events.
#[tokio::test]
async fn send_failure_closes_pipeline() {
    let store = InMemoryOrganizationStore::new();
    let (deps, queue) = deps_with_queue(
        Arc::new(store.clone()),
        Arc::new(TestProcessor::returning("acct_123")),
    );

    let broker = TestBroker::new().failing_at(0);
    let worker = start_publish_worker(&broker, queue, CancellationToken::new())
        .await
        .unwrap();

    // Accepted by the queue, lost at the broker
    create_organization(intent("Acme"), &deps).await.unwrap();
    assert!(worker.join().await.is_err());
    assert_eq!(broker.sent_count(), 0);
    assert!(deps.publisher.is_closed());

    let err = create_organization(intent("Globex"), &deps).await.unwrap_err();
    assert!(matches!(err, OrganizationError::EventPublicationFailure(_)));
    assert_eq!(store.row_count(), 1);
}
