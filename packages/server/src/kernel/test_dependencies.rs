// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::{AccountHolder, BaseOrganizationStore, BasePaymentProcessor, BaseStoreTransaction};
use crate::domains::organization::models::{Organization, OrganizationStatus};

// =============================================================================
// Mock Payment Processor
// =============================================================================

#[derive(Debug, Clone)]
enum ProcessorResponse {
    Fixed(String),
    Sequential(String),
    Fail(String),
}

/// Payment processor double that records every account holder request.
#[derive(Clone)]
pub struct TestProcessor {
    response: ProcessorResponse,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<AccountHolder>>>,
}

impl TestProcessor {
    /// Always return `account_id`.
    pub fn returning(account_id: &str) -> Self {
        Self::with_response(ProcessorResponse::Fixed(account_id.to_string()))
    }

    /// Return `{prefix}_1`, `{prefix}_2`, ... in call order.
    pub fn sequential(prefix: &str) -> Self {
        Self::with_response(ProcessorResponse::Sequential(prefix.to_string()))
    }

    /// Fail every call with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_response(ProcessorResponse::Fail(message.to_string()))
    }

    /// Sleep before answering (uses the tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with_response(response: ProcessorResponse) -> Self {
        Self {
            response,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all account holder requests, including failed ones
    pub fn calls(&self) -> Vec<AccountHolder> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl BasePaymentProcessor for TestProcessor {
    async fn create_account_holder(&self, holder: &AccountHolder) -> Result<String> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            calls.push(holder.clone());
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.response {
            ProcessorResponse::Fixed(id) => Ok(id.clone()),
            ProcessorResponse::Sequential(prefix) => Ok(format!("{}_{}", prefix, call_number)),
            ProcessorResponse::Fail(message) => Err(anyhow!("{}", message)),
        }
    }

    fn name(&self) -> &'static str {
        "test"
    }
}

// =============================================================================
// In-memory Organization Store
// =============================================================================

#[derive(Default)]
struct StoreFaults {
    begin: AtomicBool,
    insert: AtomicBool,
    commit: AtomicBool,
    rollback: AtomicBool,
}

/// Organization store double with transaction semantics.
///
/// Inserted rows stay private to their transaction until commit. A transaction
/// that is rolled back or dropped uncommitted leaves no trace besides the
/// `released_without_commit` counter.
#[derive(Clone, Default)]
pub struct InMemoryOrganizationStore {
    rows: Arc<Mutex<Vec<Organization>>>,
    faults: Arc<StoreFaults>,
    begun: Arc<AtomicUsize>,
    committed: Arc<AtomicUsize>,
    released_without_commit: Arc<AtomicUsize>,
    commit_delay: Option<Duration>,
}

impl InMemoryOrganizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_begin(self) -> Self {
        self.faults.begin.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_insert(self) -> Self {
        self.faults.insert.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_commit(self) -> Self {
        self.faults.commit.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_rollback(self) -> Self {
        self.faults.rollback.store(true, Ordering::SeqCst);
        self
    }

    /// Sleep in `commit` before applying (uses the tokio clock).
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = Some(delay);
        self
    }

    /// Committed rows
    pub fn rows(&self) -> Vec<Organization> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn transactions_begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn transactions_committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    /// Transactions rolled back explicitly or dropped without commit
    pub fn transactions_released(&self) -> usize {
        self.released_without_commit.load(Ordering::SeqCst)
    }

    /// Seed a committed row directly
    pub fn seed(&self, name: &str, processor_id: &str) -> Organization {
        let org = new_row(name, processor_id);
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(org.clone());
        org
    }
}

fn new_row(name: &str, processor_id: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        processor_id: processor_id.to_string(),
        name: name.to_string(),
        status: OrganizationStatus::Created,
        created_at: Utc::now(),
        updated_at: None,
    }
}

#[async_trait]
impl BaseOrganizationStore for InMemoryOrganizationStore {
    async fn begin(&self) -> Result<Box<dyn BaseStoreTransaction>> {
        if self.faults.begin.load(Ordering::SeqCst) {
            return Err(anyhow!("in-memory store: connection refused"));
        }
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            staged: Vec::new(),
            finished: false,
        }))
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.rows().into_iter().find(|org| org.id == id))
    }

    async fn update_organization(&self, id: Uuid, name: &str) -> Result<Option<Organization>> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.iter_mut().find(|org| org.id == id).map(|org| {
            org.name = name.to_string();
            org.status = OrganizationStatus::Updated;
            org.updated_at = Some(Utc::now());
            org.clone()
        }))
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let before = rows.len();
        rows.retain(|org| org.id != id);
        Ok(rows.len() < before)
    }

    async fn ping(&self) -> Result<()> {
        if self.faults.begin.load(Ordering::SeqCst) {
            return Err(anyhow!("in-memory store: connection refused"));
        }
        Ok(())
    }
}

struct InMemoryTransaction {
    store: InMemoryOrganizationStore,
    staged: Vec<Organization>,
    finished: bool,
}

#[async_trait]
impl BaseStoreTransaction for InMemoryTransaction {
    async fn insert_organization(&mut self, name: &str, processor_id: &str) -> Result<Organization> {
        if self.store.faults.insert.load(Ordering::SeqCst) {
            return Err(anyhow!("in-memory store: insert failed"));
        }
        if processor_id.is_empty() {
            return Err(anyhow!("in-memory store: processor_id must not be empty"));
        }
        let org = new_row(name, processor_id);
        self.staged.push(org.clone());
        Ok(org)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        if let Some(delay) = tx.store.commit_delay {
            tokio::time::sleep(delay).await;
        }
        if tx.store.faults.commit.load(Ordering::SeqCst) {
            // Leave `finished` unset so Drop counts the release.
            return Err(anyhow!("in-memory store: commit failed"));
        }
        let staged = std::mem::take(&mut tx.staged);
        tx.store
            .rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(staged);
        tx.store.committed.fetch_add(1, Ordering::SeqCst);
        tx.finished = true;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        if self.store.faults.rollback.load(Ordering::SeqCst) {
            return Err(anyhow!("in-memory store: rollback failed"));
        }
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            self.store
                .released_without_commit
                .fetch_add(1, Ordering::SeqCst);
        }
    }
}
