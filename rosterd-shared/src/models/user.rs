/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user
/// accounts. Users can belong to multiple organizations via the Membership
/// model; writes that touch both the profile and the membership set commit
/// in a single transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(254) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(30) NOT NULL,
///     last_name VARCHAR(30) NOT NULL,
///     phone VARCHAR(20) NOT NULL DEFAULT '',
///     avatar VARCHAR(255),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::membership::Membership;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, avatar, \
                            is_active, is_staff, is_superuser, date_joined";

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes, never in plaintext, and the hash
/// must never reach a response body.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Given name (required, max 30 chars)
    pub first_name: String,

    /// Family name (required, max 30 chars)
    pub last_name: String,

    /// Phone number; empty string when not provided
    pub phone: String,

    /// Media-relative path of the stored avatar image, if any
    pub avatar: Option<String>,

    /// Inactive users cannot authenticate
    pub is_active: bool,

    /// Staff users may manage other users and organizations
    pub is_staff: bool,

    /// Superusers have every privilege staff has
    pub is_superuser: bool,

    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address (normalized before it gets here)
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Given name
    pub first_name: String,

    /// Family name
    pub last_name: String,

    /// Phone number; empty string when not provided
    #[serde(default)]
    pub phone: String,

    /// Media-relative path of a stored avatar image
    pub avatar: Option<String>,

    /// Staff flag; self-registration always passes false
    #[serde(default)]
    pub is_staff: bool,

    /// Superuser flag; self-registration always passes false
    #[serde(default)]
    pub is_superuser: bool,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New given name
    pub first_name: Option<String>,

    /// New family name
    pub last_name: Option<String>,

    /// New phone number
    pub phone: Option<String>,

    /// New avatar path (a fresh upload always replaces the old reference)
    pub avatar: Option<String>,
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint) or
    /// the database connection fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        Self::create_with_memberships(pool, data, &[]).await
    }

    /// Creates a new user and its organization membership set in one transaction
    ///
    /// The profile insert and the membership writes commit together or not at
    /// all; a failure partway through leaves no partial state.
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists, an organization id does
    /// not exist (foreign key violation), or the database connection fails.
    pub async fn create_with_memberships(
        pool: &PgPool,
        data: CreateUser,
        organization_ids: &[Uuid],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone, avatar,
                               is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.phone)
        .bind(data.avatar)
        .bind(data.is_staff)
        .bind(data.is_superuser)
        .fetch_one(&mut *tx)
        .await?;

        if !organization_ids.is_empty() {
            Membership::replace_for_user(&mut tx, user.id, organization_ids).await?;
        }

        tx.commit().await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact email match
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks whether an email is already taken, optionally excluding one record
    ///
    /// The exclusion supports update flows, where the record being updated may
    /// keep its own email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` are written.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update_with_memberships(pool, id, data, None).await
    }

    /// Updates a user and, if requested, replaces its membership set atomically
    ///
    /// `organization_ids` of `None` leaves memberships untouched; `Some(&[])`
    /// removes every membership. The profile update and the membership
    /// replacement commit as one unit.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if the user doesn't exist
    pub async fn update_with_memberships(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
        organization_ids: Option<&[Uuid]>,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut sets: Vec<String> = Vec::new();
        let mut bind_count = 1;

        if data.email.is_some() {
            bind_count += 1;
            sets.push(format!("email = ${bind_count}"));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            sets.push(format!("password_hash = ${bind_count}"));
        }
        if data.first_name.is_some() {
            bind_count += 1;
            sets.push(format!("first_name = ${bind_count}"));
        }
        if data.last_name.is_some() {
            bind_count += 1;
            sets.push(format!("last_name = ${bind_count}"));
        }
        if data.phone.is_some() {
            bind_count += 1;
            sets.push(format!("phone = ${bind_count}"));
        }
        if data.avatar.is_some() {
            bind_count += 1;
            sets.push(format!("avatar = ${bind_count}"));
        }

        let mut tx = pool.begin().await?;

        let user = if sets.is_empty() {
            // Membership-only update; the row itself is untouched
            Self::find_in_tx(&mut tx, id).await?
        } else {
            let query = format!(
                "UPDATE users SET {} WHERE id = $1 RETURNING {USER_COLUMNS}",
                sets.join(", "),
            );

            let mut q = sqlx::query_as::<_, User>(&query).bind(id);

            if let Some(email) = data.email {
                q = q.bind(email);
            }
            if let Some(password_hash) = data.password_hash {
                q = q.bind(password_hash);
            }
            if let Some(first_name) = data.first_name {
                q = q.bind(first_name);
            }
            if let Some(last_name) = data.last_name {
                q = q.bind(last_name);
            }
            if let Some(phone) = data.phone {
                q = q.bind(phone);
            }
            if let Some(avatar) = data.avatar {
                q = q.bind(avatar);
            }

            q.fetch_optional(&mut *tx).await?
        };

        let Some(user) = user else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(org_ids) = organization_ids {
            Membership::replace_for_user(&mut tx, user.id, org_ids).await?;
        }

        tx.commit().await?;

        Ok(Some(user))
    }

    async fn find_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Deletes a user by ID
    ///
    /// Membership rows cascade away with the user.
    ///
    /// # Returns
    ///
    /// True if the user was deleted, false if the user didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all users, ordered by registration date (newest first)
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC",
        ))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
