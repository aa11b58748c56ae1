/// Database models for rosterd
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: User accounts (email identity, profile, avatar, role flags)
/// - `organization`: Organizations users can belong to
/// - `membership`: User-organization many-to-many association
///
/// # Example
///
/// ```no_run
/// use rosterd_shared::models::user::{User, CreateUser};
/// use rosterd_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "John".to_string(),
///     last_name: "Doe".to_string(),
///     phone: String::new(),
///     avatar: None,
///     is_staff: false,
///     is_superuser: false,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod membership;
pub mod organization;
pub mod user;

pub use membership::Membership;
pub use organization::{CreateOrganization, Organization, UpdateOrganization};
pub use user::{CreateUser, UpdateUser, User};
