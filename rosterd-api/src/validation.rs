/// Pre-persistence validation pipeline
///
/// Checks that cannot be expressed as `validator` derives live here: email
/// uniqueness, phone format, avatar content inspection, and referenced
/// organization existence. The pipeline collects every failure it finds
/// before returning, so a client sees all offending fields at once rather
/// than one per round trip.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidationErrors;

use rosterd_shared::auth::password::validate_password_strength;
use rosterd_shared::models::{Organization, User};

use crate::error::{ApiError, ApiResult, FieldError};
use crate::schemas::AvatarUpload;

/// International phone format: optional +, optional country code 1,
/// then 9 to 15 digits.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?1?\d{9,15}$").expect("phone pattern is a valid regex")
});

/// MIME types accepted for avatar uploads
const ALLOWED_AVATAR_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Normalizes an email address by lower-casing its domain part
///
/// The local part is case-sensitive per RFC 5321 and is preserved as given;
/// the domain is not. Uniqueness checks and lookups compare the normalized
/// form.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Converts derive-produced validation errors into field errors
pub fn collect_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, failures) in errors.field_errors() {
        for failure in failures {
            let message = failure
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
            out.push(FieldError::new(field.to_string(), message));
        }
    }
    // field_errors() iterates a HashMap; sort for stable output
    out.sort_by(|a, b| a.field.cmp(&b.field).then(a.message.cmp(&b.message)));
    out
}

/// Checks the phone number format if one was provided
///
/// An empty phone is valid; the field is optional and defaults to "".
pub fn validate_phone(phone: &str, errors: &mut Vec<FieldError>) {
    if !phone.is_empty() && !PHONE_PATTERN.is_match(phone) {
        errors.push(FieldError::new(
            "phone",
            "Phone number must be entered in the format: '+999999999'. Up to 15 digits allowed.",
        ));
    }
}

/// Checks password strength rules
pub fn validate_password(password: &str, errors: &mut Vec<FieldError>) {
    if let Err(message) = validate_password_strength(password) {
        errors.push(FieldError::new("password", message));
    }
}

/// Checks the declared content type of an avatar upload
pub fn validate_avatar_content(avatar: &AvatarUpload, errors: &mut Vec<FieldError>) {
    let declared = avatar.content_type.to_lowercase();
    if !ALLOWED_AVATAR_TYPES.contains(&declared.as_str()) {
        errors.push(FieldError::new(
            "avatar",
            format!(
                "Unsupported avatar content type '{}'. Allowed types: {}",
                avatar.content_type,
                ALLOWED_AVATAR_TYPES.join(", ")
            ),
        ));
    }
}

/// Checks that a normalized email is not already taken
///
/// `excluding` skips the given user's own row so updates that keep the same
/// email pass.
pub async fn validate_email_unique(
    pool: &PgPool,
    email: &str,
    excluding: Option<Uuid>,
    errors: &mut Vec<FieldError>,
) -> ApiResult<()> {
    if User::email_taken(pool, email, excluding).await? {
        errors.push(FieldError::new(
            "email",
            "A user with this email already exists",
        ));
    }
    Ok(())
}

/// Checks that every referenced organization exists
pub async fn validate_organization_ids(
    pool: &PgPool,
    organization_ids: &[Uuid],
    errors: &mut Vec<FieldError>,
) -> ApiResult<()> {
    if organization_ids.is_empty() {
        return Ok(());
    }

    let missing = Organization::missing_ids(pool, organization_ids).await?;
    for id in missing {
        errors.push(FieldError::new(
            "organization_ids",
            format!("Organization {} does not exist", id),
        ));
    }
    Ok(())
}

/// Fails the request if any validation error was collected
pub fn finish(errors: Vec<FieldError>) -> ApiResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(errors))
    }
}
