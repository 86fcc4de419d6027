// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The creation saga in domains/organization/actions sequences these traits.
//
// Naming convention: Base* for trait names (e.g., BasePaymentProcessor)

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domains::organization::models::{NewOrganization, Organization};

// =============================================================================
// Payment Processor Trait (Infrastructure - account holder provisioning)
// =============================================================================

/// Fields sent to a payment processor when opening an account holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHolder {
    pub name: String,
    pub city: String,
    pub country: String,
    pub house_number: String,
    pub postal_code: String,
    pub state: String,
    pub street: String,
}

impl From<&NewOrganization> for AccountHolder {
    fn from(intent: &NewOrganization) -> Self {
        Self {
            name: intent.name.clone(),
            city: intent.city.clone(),
            country: intent.country.clone(),
            house_number: intent.house_number.clone(),
            postal_code: intent.postal_code.clone(),
            state: intent.state.clone(),
            street: intent.street.clone(),
        }
    }
}

#[async_trait]
pub trait BasePaymentProcessor: Send + Sync {
    /// Create an account holder and return the processor's account id.
    ///
    /// Not idempotent: a repeated call may open a second remote account.
    async fn create_account_holder(&self, holder: &AccountHolder) -> Result<String>;

    /// Vendor name used in logs
    fn name(&self) -> &'static str;
}

// =============================================================================
// Organization Store Traits (Infrastructure - transactional persistence)
// =============================================================================

#[async_trait]
pub trait BaseOrganizationStore: Send + Sync {
    /// Open a transaction scoped to a single creation.
    async fn begin(&self) -> Result<Box<dyn BaseStoreTransaction>>;

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>>;

    /// Rename an organization; `None` when the id is unknown.
    async fn update_organization(&self, id: Uuid, name: &str) -> Result<Option<Organization>>;

    /// Delete an organization; `false` when the id is unknown.
    async fn delete_organization(&self, id: Uuid) -> Result<bool>;

    /// Round-trip to the store, used by the health check.
    async fn ping(&self) -> Result<()>;
}

/// An open store transaction.
///
/// Dropping the transaction without calling `commit` discards every write
/// made through it.
#[async_trait]
pub trait BaseStoreTransaction: Send {
    async fn insert_organization(&mut self, name: &str, processor_id: &str) -> Result<Organization>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
