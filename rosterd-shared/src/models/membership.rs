/// Membership model and database operations
///
/// This module provides the many-to-many association between users and
/// organizations. The only mutation is a full replacement of a user's
/// membership set — there is no incremental add/remove, mirroring how the
/// membership list is always submitted whole through the user endpoints.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE memberships (
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (user_id, organization_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::organization::Organization;
use super::user::User;

/// Membership row linking a user to an organization
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// User ID
    pub user_id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// When the membership was created
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// Replaces a user's entire membership set inside an open transaction
    ///
    /// Removes memberships absent from `organization_ids` and inserts the new
    /// ones; duplicates in the input collapse to a single row. An empty slice
    /// clears every membership. Runs on the caller's transaction so the
    /// replacement commits (or rolls back) together with the owning profile
    /// write.
    ///
    /// # Errors
    ///
    /// Returns an error if an organization id violates the foreign key or the
    /// database connection fails.
    pub async fn replace_for_user(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        organization_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM memberships WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        if organization_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO memberships (user_id, organization_id)
            SELECT $1, unnest($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(organization_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Lists the organizations a user belongs to, ordered by name
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn organizations_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Organization>, sqlx::Error> {
        let organizations = sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.id, o.name, o.description
            FROM organizations o
            JOIN memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.name, o.id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(organizations)
    }

    /// Lists the member users of an organization, ordered by registration date
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn users_for_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<User>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, u.phone,
                   u.avatar, u.is_active, u.is_staff, u.is_superuser, u.date_joined
            FROM users u
            JOIN memberships m ON m.user_id = u.id
            WHERE m.organization_id = $1
            ORDER BY u.date_joined DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Counts a user's memberships
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn count_for_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
