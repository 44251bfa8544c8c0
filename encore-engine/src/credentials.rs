use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    keys, util::now_ms, EngineContext, PlaybackProvider, ProviderError, StoreError, StoreExt,
    VenueStore,
};

/// Manages the two kinds of provider credentials: the app-level catalog
/// token and per-venue playback tokens minted from stored refresh tokens.
pub struct Credentials<S, P> {
    context: EngineContext<S, P>,
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The venue has never completed the OAuth linking flow, or its refresh
    /// token was revoked and the flow must be run again
    #[error("Venue is not linked to the playback provider")]
    NotLinked,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppTokenRecord {
    token: String,
    expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRecord {
    refresh_token: String,
    obtained_at: i64,
}

impl<S, P> Credentials<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    /// Refresh the app token this long before the provider would expire it
    const EXPIRY_MARGIN_SECS: i64 = 300;

    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Where the provider sends a venue admin to link their account
    pub fn authorize_url(&self, venue_id: &str) -> Result<String, CredentialsError> {
        Ok(self.context.provider.authorize_url(venue_id)?)
    }

    /// Returns the cached app-level token, minting a new one when stale.
    /// This token can only read the catalog, never control playback.
    pub async fn app_token(&self) -> Result<String, CredentialsError> {
        let store = &self.context.store;

        if let Some(cached) = store.get_json::<AppTokenRecord>(keys::APP_ACCESS_TOKEN).await? {
            if cached.expires_at > now_ms() {
                return Ok(cached.token);
            }
        }

        let grant = self.context.provider.client_grant().await?;

        let record = AppTokenRecord {
            token: grant.access_token.clone(),
            expires_at: now_ms() + (grant.expires_in - Self::EXPIRY_MARGIN_SECS) * 1000,
        };
        store.put_json(keys::APP_ACCESS_TOKEN, &record).await?;

        Ok(grant.access_token)
    }

    /// Mints a playback token for the venue from its stored refresh token,
    /// persisting a rotated refresh token when the provider issues one
    pub async fn venue_token(&self, venue_id: &str) -> Result<String, CredentialsError> {
        let store = &self.context.store;
        let key = keys::refresh_token(venue_id);

        let record: RefreshRecord = store
            .get_json(&key)
            .await?
            .ok_or(CredentialsError::NotLinked)?;

        let grant = self
            .context
            .provider
            .refresh_grant(&record.refresh_token)
            .await?;

        if let Some(rotated) = grant.refresh_token {
            if rotated != record.refresh_token {
                store
                    .put_json(
                        &key,
                        &RefreshRecord {
                            refresh_token: rotated,
                            obtained_at: now_ms(),
                        },
                    )
                    .await?;
            }
        }

        Ok(grant.access_token)
    }

    /// Completes the OAuth flow by exchanging the callback code and storing
    /// the venue's refresh token
    pub async fn link_venue(&self, venue_id: &str, code: &str) -> Result<(), CredentialsError> {
        let grant = self.context.provider.exchange_code(code).await?;

        if let Some(refresh_token) = grant.refresh_token {
            self.context
                .store
                .put_json(
                    &keys::refresh_token(venue_id),
                    &RefreshRecord {
                        refresh_token,
                        obtained_at: now_ms(),
                    },
                )
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{context, ProviderCall};

    #[tokio::test]
    async fn test_app_token_is_cached() {
        let context = context();
        let credentials = Credentials::new(&context);

        assert_eq!(credentials.app_token().await.unwrap(), "app-access");
        assert_eq!(credentials.app_token().await.unwrap(), "app-access");

        assert_eq!(context.provider.count(&ProviderCall::ClientGrant), 1);
    }

    #[tokio::test]
    async fn test_venue_token_requires_link() {
        let context = context();
        let credentials = Credentials::new(&context);

        assert!(matches!(
            credentials.venue_token("venue").await,
            Err(CredentialsError::NotLinked)
        ));
    }

    #[tokio::test]
    async fn test_link_then_mint() {
        let context = context();
        let credentials = Credentials::new(&context);

        credentials.link_venue("venue", "code").await.unwrap();

        assert_eq!(
            credentials.venue_token("venue").await.unwrap(),
            "venue-access"
        );
    }

    #[tokio::test]
    async fn test_refresh_token_rotation() {
        let context = context();
        let credentials = Credentials::new(&context);

        credentials.link_venue("venue", "code").await.unwrap();
        *context.provider.rotated_refresh.lock() = Some("rotated-refresh".to_string());

        credentials.venue_token("venue").await.unwrap();

        let stored: RefreshRecord = context
            .store
            .get_json(&keys::refresh_token("venue"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_token, "rotated-refresh");
    }
}
