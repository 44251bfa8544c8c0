use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    keys,
    util::now_ms,
    Credentials, CredentialsError, EngineContext, FoundTrack, PlaybackProvider, ProviderError,
    StoreError, StoreExt, VenueStore,
};

/// Catalog search against the provider, throttled through the store so the
/// limit holds across server instances
pub struct Catalog<S, P> {
    context: EngineContext<S, P>,
    credentials: Credentials<S, P>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Too many searches, retry in {retry_after_secs} second(s)")]
    RateLimited { retry_after_secs: i64 },
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("Provider search failed: {0}")]
    Provider(ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateWindow {
    count: i64,
    reset_at: i64,
}

impl<S, P> Catalog<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    const SEARCH_RESULT_LIMIT: usize = 10;

    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
            credentials: Credentials::new(context),
        }
    }

    /// Searches the provider catalog for tracks matching `query`
    pub async fn search(&self, query: &str) -> Result<Vec<FoundTrack>, CatalogError> {
        self.throttle().await?;

        let token = self.credentials.app_token().await?;

        self.context
            .provider
            .search(&token, query, Self::SEARCH_RESULT_LIMIT)
            .await
            .map_err(CatalogError::Provider)
    }

    /// Best-effort lookup of a track for a title/artist pair, used to
    /// backfill uris on submissions that arrive without one. Failures mean
    /// "not found", never an error.
    pub async fn resolve(&self, title: &str, artist: &str) -> Option<FoundTrack> {
        let token = self.credentials.app_token().await.ok()?;
        let query = format!("{} {}", title, artist);

        match self.context.provider.search(&token, &query, 1).await {
            Ok(mut results) if !results.is_empty() => Some(results.remove(0)),
            Ok(_) => None,
            Err(e) => {
                warn!("resolving \"{}\" failed: {}", query, e);
                None
            }
        }
    }

    /// Best-effort duration lookup for a provider track id
    pub async fn track_duration(&self, track_id: &str) -> Option<i64> {
        let token = self.credentials.app_token().await.ok()?;

        match self.context.provider.track_duration(&token, track_id).await {
            Ok(duration) => duration,
            Err(e) => {
                warn!("duration lookup for {} failed: {}", track_id, e);
                None
            }
        }
    }

    async fn throttle(&self) -> Result<(), CatalogError> {
        let store = &self.context.store;
        let limit = self.context.config.searches_per_minute;
        let now = now_ms();

        match store.get_json::<RateWindow>(keys::SEARCH_RATE_LIMIT).await? {
            Some(window) if window.reset_at > now => {
                if window.count >= limit {
                    return Err(CatalogError::RateLimited {
                        retry_after_secs: (window.reset_at - now + 999) / 1000,
                    });
                }

                store
                    .put_json(
                        keys::SEARCH_RATE_LIMIT,
                        &RateWindow {
                            count: window.count + 1,
                            reset_at: window.reset_at,
                        },
                    )
                    .await?;
            }
            _ => {
                store
                    .put_json(
                        keys::SEARCH_RATE_LIMIT,
                        &RateWindow {
                            count: 1,
                            reset_at: now + 60_000,
                        },
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{context, track, ProviderCall};

    #[tokio::test]
    async fn test_search_counts_against_the_window() {
        let context = context();
        let catalog = Catalog::new(&context);

        catalog.search("query").await.unwrap();
        catalog.search("query").await.unwrap();

        let window: RateWindow = context
            .store
            .get_json(keys::SEARCH_RATE_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(window.count, 2);
    }

    #[tokio::test]
    async fn test_search_is_rate_limited() {
        let context = context();
        let catalog = Catalog::new(&context);

        context
            .store
            .put_json(
                keys::SEARCH_RATE_LIMIT,
                &RateWindow {
                    count: 60,
                    reset_at: now_ms() + 30_000,
                },
            )
            .await
            .unwrap();

        match catalog.search("query").await {
            Err(CatalogError::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs > 0 && retry_after_secs <= 30);
            }
            other => panic!("expected rate limit, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_window_resets_after_a_minute() {
        let context = context();
        let catalog = Catalog::new(&context);

        context
            .store
            .put_json(
                keys::SEARCH_RATE_LIMIT,
                &RateWindow {
                    count: 60,
                    reset_at: now_ms() - 1,
                },
            )
            .await
            .unwrap();

        catalog.search("query").await.unwrap();

        let window: RateWindow = context
            .store
            .get_json(keys::SEARCH_RATE_LIMIT)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(window.count, 1);
    }

    #[tokio::test]
    async fn test_resolve_takes_the_first_match() {
        let context = context();
        let catalog = Catalog::new(&context);

        *context.provider.search_results.lock() = vec![track("first"), track("second")];

        let found = catalog.resolve("Song", "Artist").await.unwrap();
        assert_eq!(found.id, "first");

        assert_eq!(
            context.provider.count(&ProviderCall::Search {
                query: "Song Artist".to_string()
            }),
            1
        );
    }

    #[tokio::test]
    async fn test_resolve_with_no_results() {
        let context = context();
        let catalog = Catalog::new(&context);

        assert!(catalog.resolve("Song", "Artist").await.is_none());
    }
}
