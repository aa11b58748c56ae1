/// Organization model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL DEFAULT ''
/// );
/// ```
///
/// Name length is validated (max 100 characters) before anything reaches the
/// store; the column bound is the backstop.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Organization model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID (auto-assigned)
    pub id: Uuid,

    /// Organization name (max 100 chars)
    pub name: String,

    /// Free-text description; empty string when not provided
    pub description: String,
}

/// Input for creating a new organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    /// Organization name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,
}

/// Input for updating an existing organization
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganization {
    /// New name
    pub name: Option<String>,

    /// New description
    pub description: Option<String>,
}

impl Organization {
    /// Creates a new organization
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create(pool: &PgPool, data: CreateOrganization) -> Result<Self, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(organization)
    }

    /// Finds an organization by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(
            "SELECT id, name, description FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Updates an existing organization
    ///
    /// # Returns
    ///
    /// The updated organization if found, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING id, name, description
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Deletes an organization by ID
    ///
    /// Membership rows cascade away with the organization.
    ///
    /// # Returns
    ///
    /// True if the organization was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all organizations, ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let organizations = sqlx::query_as::<_, Organization>(
            "SELECT id, name, description FROM organizations ORDER BY name, id",
        )
        .fetch_all(pool)
        .await?;

        Ok(organizations)
    }

    /// Checks that every given id references an existing organization
    ///
    /// Returns the ids that do NOT exist (empty when all are valid).
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn missing_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let existing: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM organizations WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(ids
            .iter()
            .filter(|id| !existing.contains(id))
            .copied()
            .collect())
    }
}
