//! Postgres-backed organization store.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domains::organization::models::Organization;
use crate::kernel::{BaseOrganizationStore, BaseStoreTransaction};

/// Organization store over a shared `PgPool`.
#[derive(Clone)]
pub struct PgOrganizationStore {
    pool: PgPool,
}

impl PgOrganizationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseOrganizationStore for PgOrganizationStore {
    async fn begin(&self) -> Result<Box<dyn BaseStoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Organization::find_by_id(id, &self.pool).await
    }

    async fn update_organization(&self, id: Uuid, name: &str) -> Result<Option<Organization>> {
        Organization::update_name(id, name, &self.pool).await
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool> {
        Organization::delete(id, &self.pool).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Wraps a sqlx transaction; sqlx rolls it back when dropped uncommitted.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BaseStoreTransaction for PgStoreTransaction {
    async fn insert_organization(&mut self, name: &str, processor_id: &str) -> Result<Organization> {
        Organization::insert(name, processor_id, &mut *self.tx).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
