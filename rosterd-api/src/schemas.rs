/// Request and response representations
///
/// Handlers deserialize requests into the `*Request` structs here and build
/// `*Detail` / `*Summary` responses from the storage models. The password
/// hash never appears in any response struct, so it cannot leak through
/// serialization.
///
/// Declarative field checks (lengths, email format) live on the request
/// structs via `validator` derives; checks that need database access or
/// cross-field context live in [`crate::validation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use rosterd_shared::models::{Organization, User};

use crate::config::Config;

/// An avatar image carried inline in a JSON request
///
/// `data` is standard base64 of the raw image bytes. The declared
/// `content_type` is checked against the image allow-list before any bytes
/// are written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUpload {
    /// Client-side filename, used only for its extension
    pub filename: String,

    /// Declared MIME type (e.g. `image/png`)
    pub content_type: String,

    /// Base64-encoded image bytes
    pub data: String,
}

/// Request body for creating a user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreateRequest {
    /// Email address, unique across users
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be 254 characters or fewer")
    )]
    pub email: String,

    /// Plaintext password, hashed before storage
    pub password: String,

    /// Given name, required
    #[validate(length(min = 1, max = 30, message = "First name must be between 1 and 30 characters"))]
    #[serde(default)]
    pub first_name: String,

    /// Family name, required
    #[validate(length(min = 1, max = 30, message = "Last name must be between 1 and 30 characters"))]
    #[serde(default)]
    pub last_name: String,

    /// Phone number in international format, may be empty
    #[validate(length(max = 20, message = "Phone number must be 20 characters or fewer"))]
    #[serde(default)]
    pub phone: String,

    /// Optional inline avatar upload
    #[serde(default)]
    pub avatar: Option<AvatarUpload>,

    /// Organizations the user belongs to; always interpreted as the full set
    #[serde(default)]
    pub organization_ids: Vec<Uuid>,
}

/// Request body for updating a user
///
/// Every field is optional; both full and partial updates use this shape and
/// only the provided fields change. A present `organization_ids` replaces the
/// entire membership set, including `[]` which clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 254, message = "Email must be 254 characters or fewer")
    )]
    pub email: Option<String>,

    pub password: Option<String>,

    #[validate(length(min = 1, max = 30, message = "First name must be between 1 and 30 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 30, message = "Last name must be between 1 and 30 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 20, message = "Phone number must be 20 characters or fewer"))]
    pub phone: Option<String>,

    pub avatar: Option<AvatarUpload>,

    pub organization_ids: Option<Vec<Uuid>>,
}

/// Full user representation returned by the user endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetail {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,

    /// Public URL of the stored avatar, if one exists
    pub avatar: Option<String>,

    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,

    /// Organizations the user belongs to
    pub organizations: Vec<OrganizationSummary>,
}

impl UserDetail {
    /// Builds the response representation from a storage row
    ///
    /// The avatar path stored in the database is relative to the media root;
    /// this resolves it to the public URL clients can fetch.
    pub fn from_user(user: User, organizations: Vec<Organization>, config: &Config) -> Self {
        let avatar = user.avatar.as_deref().map(|path| config.media_file_url(path));

        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            avatar,
            is_active: user.is_active,
            is_staff: user.is_staff,
            date_joined: user.date_joined,
            organizations: organizations
                .into_iter()
                .map(OrganizationSummary::from)
                .collect(),
        }
    }
}

/// Compact user representation nested inside organization responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Request body for creating an organization
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrganizationCreateRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Request body for updating an organization
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrganizationUpdateRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
}

/// Compact organization representation nested inside user responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Organization> for OrganizationSummary {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            description: org.description,
        }
    }
}

/// Full organization representation with its member users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,

    /// Members of this organization
    pub users: Vec<UserSummary>,
}

impl OrganizationDetail {
    pub fn from_organization(org: Organization, users: Vec<User>) -> Self {
        Self {
            id: org.id,
            name: org.name,
            description: org.description,
            users: users.into_iter().map(UserSummary::from).collect(),
        }
    }
}

/// Access/refresh token pair returned by the token endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Request body for obtaining a token pair
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// Request body for refreshing an access token
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: String,
}

/// Response for a refreshed access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}
