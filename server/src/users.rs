//! User identity store: account creation, password checks and profile updates.
//!
//! Emails are the login identifier. They are normalized on the way in by
//! lower-casing the domain part, so `Jane@EXAMPLE.COM` is stored as
//! `Jane@example.com`. Passwords only ever reach the store as argon2 hashes.

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, FieldErrors};
use crate::models::{NewUser, User, UserChanges};
use crate::scope::MAX_NAME_LENGTH;
use crate::store::Store;

/// Shortest password accepted at signup or profile update.
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Stored in place of a hash for accounts created without a password.
/// It never parses as a PHC string, so every password check fails.
const UNUSABLE_PASSWORD: &str = "!unusable";

/// Optional attributes passed through to the new account.
#[derive(Debug, Default, Clone)]
pub struct ExtraFields {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Fields a user may change on their own profile.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Lower-case the domain part of an email address and trim surrounding
/// whitespace. The local part is left as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn too_long(value: &str) -> bool {
    value.chars().count() > MAX_NAME_LENGTH
}

fn too_long_message() -> String {
    format!(
        "Ensure this field has no more than {} characters.",
        MAX_NAME_LENGTH
    )
}

/// Check an already normalized email: `local@domain`, with a dot in the
/// domain, no whitespace, and short enough for the `email` column.
pub fn validate_email(email: &str, errors: &mut FieldErrors) {
    if too_long(email) {
        errors.add("email", too_long_message());
        return;
    }
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .split('.')
                    .all(|label| !label.is_empty() && !label.starts_with('-'))
                && domain.contains('.')
        }
        None => false,
    };
    if !well_formed {
        errors.add("email", "Enter a valid email address.");
    }
}

pub fn validate_display_name(name: &str, errors: &mut FieldErrors) {
    if too_long(name) {
        errors.add("name", too_long_message());
    }
}

/// Check a candidate password against the policy used by the HTTP surface.
pub fn validate_password(password: &str, errors: &mut FieldErrors) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!(
                "Ensure this field has at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        );
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Create and persist a user. A missing, blank, malformed or overlong email
/// is a validation error; without a password the account can't log in until
/// one is set.
pub fn create_user(
    store: &dyn Store,
    email: Option<&str>,
    password: Option<&str>,
    extra: ExtraFields,
) -> Result<User, ApiError> {
    let email = match email.map(str::trim) {
        Some(e) if !e.is_empty() => normalize_email(e),
        _ => return Err(ApiError::field("email", "Users must have an email address.")),
    };
    let name = extra.name.as_deref().map(str::trim).unwrap_or("");

    let mut errors = FieldErrors::new();
    validate_email(&email, &mut errors);
    validate_display_name(name, &mut errors);
    errors.into_result()?;

    let password_hash = match password {
        Some(p) => hash(p)?,
        None => UNUSABLE_PASSWORD.to_string(),
    };

    let user = store.insert_user(NewUser {
        email: &email,
        name,
        password_hash: &password_hash,
        is_active: extra.is_active.unwrap_or(true),
        is_staff: extra.is_staff.unwrap_or(false),
        is_superuser: extra.is_superuser.unwrap_or(false),
    })?;

    tracing::info!("Created user {}", user.id);
    Ok(user)
}

/// Create a user, then grant staff and superuser rights.
pub fn create_superuser(store: &dyn Store, email: &str, password: &str) -> Result<User, ApiError> {
    let user = create_user(store, Some(email), Some(password), ExtraFields::default())?;
    let user = store.update_user(
        user.id,
        UserChanges {
            is_staff: Some(true),
            is_superuser: Some(true),
            ..Default::default()
        },
    )?;
    tracing::info!("Granted superuser rights to {}", user.id);
    Ok(user)
}

pub fn check_password(user: &User, candidate: &str) -> bool {
    verify_password(candidate, &user.password_hash)
}

/// Apply a profile update. A new password is validated and re-hashed; a new
/// email is normalized and must not belong to another account.
pub fn update_profile(
    store: &dyn Store,
    user: &User,
    update: ProfileUpdate,
) -> Result<User, ApiError> {
    let mut errors = FieldErrors::new();

    let email = update.email.as_deref().map(normalize_email);
    match email.as_deref() {
        Some("") => errors.add("email", "This field may not be blank."),
        Some(email) => validate_email(email, &mut errors),
        None => {}
    }
    let name = update.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_display_name(name, &mut errors);
    }
    if let Some(password) = update.password.as_deref() {
        validate_password(password, &mut errors);
    }
    errors.into_result()?;

    let password_hash = update.password.as_deref().map(hash).transpose()?;

    let user = store.update_user(
        user.id,
        UserChanges {
            email: email.as_deref(),
            name,
            password_hash: password_hash.as_deref(),
            ..Default::default()
        },
    )?;
    Ok(user)
}
