use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    keys,
    util::{now_ms, random_string},
    EngineContext, PlaybackProvider, StoreError, StoreExt, VenueStore,
};

/// PIN-based admin authentication: one immutable PIN per venue, exchanged
/// for opaque bearer tokens with a fixed expiry
pub struct AdminAuth<S, P> {
    context: EngineContext<S, P>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("PIN already set for this venue")]
    PinAlreadySet,
    #[error("No PIN set for this venue")]
    NoPinSet,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Missing admin token")]
    Unauthorized,
    #[error("Session expired")]
    SessionExpired,
    #[error("HashError: {0}")]
    HashError(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinRecord {
    hash: String,
    created_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRecord {
    expires_at: i64,
}

impl<S, P> AdminAuth<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    const TOKEN_LENGTH: usize = 32;

    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Sets the venue PIN. Exactly one call per venue ever succeeds.
    pub async fn set_pin(&self, venue_id: &str, pin: &str) -> Result<(), AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon
            .hash_password(pin.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let record = PinRecord {
            hash,
            created_at: now_ms(),
        };

        let created = self
            .context
            .store
            .put_json_if_absent(&keys::admin_pin(venue_id), &record)
            .await?;

        if !created {
            return Err(AuthError::PinAlreadySet);
        }

        Ok(())
    }

    /// Exchanges the venue PIN for a new admin session token
    pub async fn login(&self, venue_id: &str, pin: &str) -> Result<String, AuthError> {
        let store = &self.context.store;

        let record: PinRecord = store
            .get_json(&keys::admin_pin(venue_id))
            .await?
            .ok_or(AuthError::NoPinSet)?;

        let stored_hash = PasswordHash::parse(&record.hash, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(pin.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidPin)?;

        let token = random_string(Self::TOKEN_LENGTH);
        let expires_at = Utc::now() + self.context.config.session_ttl();

        store
            .put_json_expiring(
                &keys::admin_session(venue_id, &token),
                &SessionRecord {
                    expires_at: expires_at.timestamp_millis(),
                },
                expires_at,
            )
            .await?;

        Ok(token)
    }

    /// Guards an admin-only operation. The token is accepted only while its
    /// session exists and has not expired.
    pub async fn require_admin(
        &self,
        venue_id: &str,
        token: Option<&str>,
    ) -> Result<(), AuthError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::Unauthorized)?;

        let store = &self.context.store;
        let key = keys::admin_session(venue_id, token);

        let session: SessionRecord = store
            .get_json(&key)
            .await?
            .ok_or(AuthError::SessionExpired)?;

        if session.expires_at < now_ms() {
            store.delete(&key).await?;
            return Err(AuthError::SessionExpired);
        }

        Ok(())
    }

    /// Deletes the session, if it exists
    pub async fn logout(&self, venue_id: &str, token: &str) -> Result<(), AuthError> {
        self.context
            .store
            .delete(&keys::admin_session(venue_id, token))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::context;

    #[tokio::test]
    async fn test_set_pin_succeeds_exactly_once() {
        let context = context();
        let auth = AdminAuth::new(&context);

        auth.set_pin("venue", "1234").await.unwrap();

        assert!(matches!(
            auth.set_pin("venue", "1234").await,
            Err(AuthError::PinAlreadySet)
        ));
        // A different PIN value changes nothing
        assert!(matches!(
            auth.set_pin("venue", "9999").await,
            Err(AuthError::PinAlreadySet)
        ));
    }

    #[tokio::test]
    async fn test_login_without_pin() {
        let context = context();
        let auth = AdminAuth::new(&context);

        assert!(matches!(
            auth.login("venue", "1234").await,
            Err(AuthError::NoPinSet)
        ));
    }

    #[tokio::test]
    async fn test_login_with_wrong_pin() {
        let context = context();
        let auth = AdminAuth::new(&context);

        auth.set_pin("venue", "1234").await.unwrap();

        assert!(matches!(
            auth.login("venue", "4321").await,
            Err(AuthError::InvalidPin)
        ));
    }

    #[tokio::test]
    async fn test_login_issues_usable_token() {
        let context = context();
        let auth = AdminAuth::new(&context);

        auth.set_pin("venue", "1234").await.unwrap();
        let token = auth.login("venue", "1234").await.unwrap();

        auth.require_admin("venue", Some(&token)).await.unwrap();

        // Tokens do not cross venues
        assert!(matches!(
            auth.require_admin("other", Some(&token)).await,
            Err(AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_require_admin_without_token() {
        let context = context();
        let auth = AdminAuth::new(&context);

        assert!(matches!(
            auth.require_admin("venue", None).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            auth.require_admin("venue", Some("")).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let context = context();
        let auth = AdminAuth::new(&context);

        context
            .store
            .put_json(
                &keys::admin_session("venue", "stale"),
                &SessionRecord {
                    expires_at: now_ms() - 1000,
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            auth.require_admin("venue", Some("stale")).await,
            Err(AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_logout_invalidates_immediately() {
        let context = context();
        let auth = AdminAuth::new(&context);

        auth.set_pin("venue", "1234").await.unwrap();
        let token = auth.login("venue", "1234").await.unwrap();

        auth.logout("venue", &token).await.unwrap();

        assert!(matches!(
            auth.require_admin("venue", Some(&token)).await,
            Err(AuthError::SessionExpired)
        ));

        // Logging out twice is fine
        auth.logout("venue", &token).await.unwrap();
    }
}
