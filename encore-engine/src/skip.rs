use log::error;
use serde_json::Value;
use thiserror::Error;

use crate::{
    keys, EngineContext, Playback, PlaybackError, PlaybackProvider, StoreError, StoreExt,
    VenueStore,
};

/// Tallies per-track skip votes from distinct sessions and forces a
/// provider-level skip once a venue's threshold is reached
pub struct SkipVotes<S, P> {
    context: EngineContext<S, P>,
    playback: Playback<S, P>,
}

#[derive(Debug, Error)]
pub enum SkipError {
    #[error("No track is playing")]
    NoTrackPlaying,
    #[error("Already voted to skip this track")]
    AlreadyVoted,
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The skip tally for whatever a venue is currently playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipStatus {
    pub track_id: Option<String>,
    pub votes: i64,
    pub threshold: i64,
}

impl<S, P> SkipVotes<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
            playback: Playback::new(context),
        }
    }

    /// The current track, its vote count, and the venue's threshold
    pub async fn status(&self, venue_id: &str) -> Result<SkipStatus, SkipError> {
        let threshold = self.threshold(venue_id).await?;

        let Some(now) = self.playback.current_track(venue_id).await? else {
            return Ok(SkipStatus {
                track_id: None,
                votes: 0,
                threshold,
            });
        };

        let votes = self
            .context
            .store
            .get_json::<i64>(&keys::skip_votes(venue_id, &now.id))
            .await?
            .unwrap_or(0);

        Ok(SkipStatus {
            track_id: Some(now.id),
            votes,
            threshold,
        })
    }

    /// Casts one session's skip vote against the current track. Reaching
    /// the threshold triggers a provider skip and clears the tally; the
    /// voter always gets the updated count back even when the provider
    /// call fails.
    pub async fn vote(&self, venue_id: &str, session_id: &str) -> Result<SkipStatus, SkipError> {
        let store = &self.context.store;

        let current = self
            .playback
            .current_track(venue_id)
            .await?
            .ok_or(SkipError::NoTrackPlaying)?;
        let track_id = current.id;

        let voted_key = keys::skip_voted(venue_id, session_id, &track_id);
        if !store.put_if_absent(&voted_key, Value::Bool(true)).await? {
            return Err(SkipError::AlreadyVoted);
        }

        let votes_key = keys::skip_votes(venue_id, &track_id);
        let votes = store.incr(&votes_key, 1).await?;
        let threshold = self.threshold(venue_id).await?;

        if votes >= threshold {
            if let Err(e) = self.playback.skip_current(venue_id).await {
                error!("skip to next track failed: {}", e);
            }

            // The tally must reset either way, or the venue gets stuck with
            // a full tally nobody can add to
            store.delete(&votes_key).await?;
        }

        Ok(SkipStatus {
            track_id: Some(track_id),
            votes,
            threshold,
        })
    }

    /// The venue's threshold override, or the configured default
    async fn threshold(&self, venue_id: &str) -> Result<i64, StoreError> {
        Ok(self
            .context
            .store
            .get_json(&keys::skip_threshold(venue_id))
            .await?
            .unwrap_or(self.context.config.skip_threshold))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{context, context_with, FakeProvider, ProviderCall};
    use crate::{util::now_ms, Credentials, EngineConfig, MemoryStore, NowPlaying};

    type TestContext = EngineContext<MemoryStore, FakeProvider>;

    async fn playing(context: &TestContext, track_id: &str) {
        context
            .store
            .put_json(
                &keys::now_playing("venue"),
                &NowPlaying {
                    id: track_id.to_string(),
                    title: "Track".to_string(),
                    artist: "Artist".to_string(),
                    album_art: String::new(),
                    uri: None,
                    spotify_id: Some(track_id.to_string()),
                    duration_ms: None,
                    started_at: Some(now_ms()),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vote_without_a_track() {
        let context = context();
        let skip = SkipVotes::new(&context);

        assert!(matches!(
            skip.vote("venue", "s1").await,
            Err(SkipError::NoTrackPlaying)
        ));
    }

    #[tokio::test]
    async fn test_vote_is_counted_once_per_session() {
        let context = context();
        let skip = SkipVotes::new(&context);

        playing(&context, "t1").await;

        assert_eq!(skip.vote("venue", "s1").await.unwrap().votes, 1);
        assert!(matches!(
            skip.vote("venue", "s1").await,
            Err(SkipError::AlreadyVoted)
        ));
        assert_eq!(skip.status("venue").await.unwrap().votes, 1);
    }

    #[tokio::test]
    async fn test_threshold_triggers_skip_and_resets_tally() {
        let context = context_with(EngineConfig {
            skip_threshold: 2,
            ..Default::default()
        });
        let skip = SkipVotes::new(&context);
        let credentials = Credentials::new(&context);

        credentials.link_venue("venue", "code").await.unwrap();
        playing(&context, "t1").await;

        assert_eq!(skip.vote("venue", "s1").await.unwrap().votes, 1);
        assert_eq!(context.provider.count(&ProviderCall::SkipToNext), 0);

        let status = skip.vote("venue", "s2").await.unwrap();
        assert_eq!(status.votes, 2);

        assert_eq!(context.provider.count(&ProviderCall::SkipToNext), 1);

        // The tally is cleared for whatever plays next
        assert_eq!(skip.status("venue").await.unwrap().votes, 0);
    }

    #[tokio::test]
    async fn test_tally_resets_even_when_the_provider_fails() {
        // The venue is not linked, so the skip call cannot succeed
        let context = context_with(EngineConfig {
            skip_threshold: 1,
            ..Default::default()
        });
        let skip = SkipVotes::new(&context);

        playing(&context, "t1").await;

        let status = skip.vote("venue", "s1").await.unwrap();
        assert_eq!(status.votes, 1);

        assert_eq!(skip.status("venue").await.unwrap().votes, 0);
    }

    #[tokio::test]
    async fn test_venue_threshold_override() {
        let context = context();
        let skip = SkipVotes::new(&context);

        playing(&context, "t1").await;
        context
            .store
            .put_json(&keys::skip_threshold("venue"), &3)
            .await
            .unwrap();

        assert_eq!(skip.status("venue").await.unwrap().threshold, 3);
    }

    #[tokio::test]
    async fn test_status_without_a_track() {
        let context = context();
        let skip = SkipVotes::new(&context);

        let status = skip.status("venue").await.unwrap();
        assert_eq!(status.track_id, None);
        assert_eq!(status.votes, 0);
        assert_eq!(status.threshold, 5);
    }
}
