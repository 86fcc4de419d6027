use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Organization - the row owned by the `organizations` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub processor_id: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of an organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    Created,
    Updated,
    NotVerified,
    Verified,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::NotVerified => "not_verified",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown organization status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<String> for OrganizationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "not_verified" => Ok(Self::NotVerified),
            "verified" => Ok(Self::Verified),
            _ => Err(UnknownStatus(value)),
        }
    }
}

/// Caller-supplied intent for creating an organization.
///
/// Consumed once by the creation saga; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
    pub city: String,
    pub country: String,
    pub house_number: String,
    pub postal_code: String,
    pub state: String,
    pub street: String,
    /// Identity of the authenticated caller
    pub created_by: String,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Organization {
    /// Insert a new organization; id, status and timestamps come from column defaults
    pub async fn insert<'e, E>(name: &str, processor_id: &str, executor: E) -> Result<Self>
    where
        E: PgExecutor<'e>,
    {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, processor_id)
            VALUES ($1, $2)
            RETURNING id, processor_id, name, status, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(processor_id)
        .fetch_one(executor)
        .await?;
        Ok(org)
    }

    /// Find organization by ID
    pub async fn find_by_id<'e, E>(id: Uuid, executor: E) -> Result<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, processor_id, name, status, created_at, updated_at FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(org)
    }

    /// Rename an organization and mark it updated
    pub async fn update_name<'e, E>(id: Uuid, name: &str, executor: E) -> Result<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = $2,
                status = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, processor_id, name, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(OrganizationStatus::Updated.as_str())
        .fetch_optional(executor)
        .await?;
        Ok(org)
    }

    /// Delete an organization, returning whether a row was removed
    pub async fn delete<'e, E>(id: Uuid, executor: E) -> Result<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
