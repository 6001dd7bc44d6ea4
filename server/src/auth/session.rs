use crate::error::{ApiError, FieldErrors, NON_FIELD_ERRORS};
use crate::models::{NewSession, User};
use crate::store::{Store, StoreError};
use crate::users::{check_password, normalize_email};
use chrono::{DateTime, Duration, Utc};

use super::crypto::{generate_token, hash_token};

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

/// Store a new session for `user` and return its plaintext token. Sessions
/// that have already expired are pruned on the way.
pub fn create_session(
    store: &dyn Store,
    user: &User,
    ttl: Duration,
) -> Result<String, StoreError> {
    let now = Utc::now();

    let pruned = store.delete_expired_sessions(now)?;
    if pruned > 0 {
        tracing::debug!("Pruned {} expired session(s)", pruned);
    }

    let token = generate_token();
    let token_hash = hash_token(&token);

    store.insert_session(NewSession {
        user_id: user.id,
        token_hash: &token_hash,
        expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
    })?;

    Ok(token)
}

/// Exchange an email and password for a new bearer token.
///
/// Missing fields are reported per field. A wrong password, an unknown email
/// and an inactive account all produce the same non-field error.
pub fn issue_token(
    store: &dyn Store,
    email: Option<&str>,
    password: Option<&str>,
    ttl: Duration,
) -> Result<String, ApiError> {
    let mut errors = FieldErrors::new();
    let email = email.map(str::trim).filter(|e| !e.is_empty());
    let password = password.filter(|p| !p.is_empty());
    if email.is_none() {
        errors.add("email", "This field may not be blank.");
    }
    if password.is_none() {
        errors.add("password", "This field may not be blank.");
    }
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Validation(errors));
    };

    let user = store
        .find_user_by_email(&normalize_email(email))?
        .filter(|u| u.is_active && check_password(u, password))
        .ok_or_else(|| ApiError::field(NON_FIELD_ERRORS, BAD_CREDENTIALS))?;

    let token = create_session(store, &user, ttl)?;
    tracing::info!("Issued token for user {}", user.id);
    Ok(token)
}

/// Look up the active user behind a bearer token. `Ok(None)` for unknown,
/// expired or inactive; `Err` only when the store itself failed.
pub fn resolve_token(store: &dyn Store, token: &str) -> Result<Option<User>, StoreError> {
    store.find_user_by_session(&hash_token(token), Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::{create_user, ExtraFields};

    fn setup() -> MemoryStore {
        let store = MemoryStore::new();
        create_user(
            &store,
            Some("test@email.com"),
            Some("testpassword"),
            ExtraFields::default(),
        )
        .unwrap();
        store
    }

    #[test]
    fn test_issue_and_resolve_token() {
        let store = setup();
        let token = issue_token(
            &store,
            Some("test@email.com"),
            Some("testpassword"),
            Duration::days(1),
        )
        .unwrap();

        let user = resolve_token(&store, &token).unwrap().unwrap();
        assert_eq!(user.email, "test@email.com");
    }

    #[test]
    fn test_bad_credentials_issue_no_token() {
        let store = setup();
        let ttl = Duration::days(1);
        for (email, password) in [
            (Some("test@email.com"), Some("wrong")),
            (Some("nobody@email.com"), Some("testpassword")),
            (Some("test@email.com"), Some("")),
            (None, Some("testpassword")),
            (Some("test@email.com"), None),
        ] {
            let result = issue_token(&store, email, password, ttl);
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "{:?}/{:?} should fail",
                email,
                password
            );
        }
    }

    #[test]
    fn test_inactive_user_gets_no_token() {
        let store = MemoryStore::new();
        let user = create_user(
            &store,
            Some("inactive@email.com"),
            Some("testpassword"),
            ExtraFields {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let result = issue_token(
            &store,
            Some("inactive@email.com"),
            Some("testpassword"),
            Duration::days(1),
        );
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let token = create_session(&store, &user, Duration::days(1)).unwrap();
        assert!(resolve_token(&store, &token).unwrap().is_none());
    }

    #[test]
    fn test_unknown_token_resolves_to_nobody() {
        let store = setup();
        assert!(resolve_token(&store, "not-a-token").unwrap().is_none());
    }

    #[test]
    fn test_login_prunes_expired_sessions() {
        let store = setup();
        let user = store.find_user_by_email("test@email.com").unwrap().unwrap();
        store
            .insert_session(NewSession {
                user_id: user.id,
                token_hash: "stale",
                expires_at: Utc::now() - Duration::minutes(1),
            })
            .unwrap();
        assert_eq!(store.session_count(), 1);

        let token = issue_token(
            &store,
            Some("test@email.com"),
            Some("testpassword"),
            Duration::days(1),
        )
        .unwrap();

        assert_eq!(store.session_count(), 1);
        assert!(resolve_token(&store, &token).unwrap().is_some());
    }

    #[test]
    fn test_oversized_ttl_does_not_overflow() {
        let store = setup();
        let user = store.find_user_by_email("test@email.com").unwrap().unwrap();
        let token = create_session(&store, &user, Duration::MAX).unwrap();
        assert!(resolve_token(&store, &token).unwrap().is_some());
    }
}
