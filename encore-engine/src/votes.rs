use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    keys,
    util::now_ms,
    EngineContext, NowPlaying, PlaybackProvider, StoreError, StoreExt, VenueStore,
};

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Already voted for this song")]
    AlreadyVoted,
    #[error("Song not found in queue")]
    SongNotFound,
    #[error("Cooldown active, {remaining_minutes} minute(s) remaining")]
    CooldownActive { remaining_minutes: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Enforces at-most-one vote per (venue, session, song) and raises hype
pub struct VoteLedger<S, P> {
    context: EngineContext<S, P>,
}

/// Throttles how often one session may add a song while its previous
/// submission is still queued or playing
pub struct CooldownGuard<S, P> {
    context: EngineContext<S, P>,
}

/// Tracks a session's last successful submission
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionRecord {
    last_added_at: i64,
    last_song_id: Option<String>,
}

impl<S, P> VoteLedger<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Casts a vote for a queued song, returning its new hype score
    pub async fn vote(
        &self,
        venue_id: &str,
        song_id: &str,
        session_id: &str,
    ) -> Result<i64, VoteError> {
        let store = &self.context.store;
        let vote_key = keys::vote(venue_id, session_id, song_id);

        if !store.put_if_absent(&vote_key, Value::Bool(true)).await? {
            return Err(VoteError::AlreadyVoted);
        }

        match store
            .incr_field(&keys::queue_item(venue_id, song_id), "hype", 1)
            .await?
        {
            Some(hype) => Ok(hype),
            None => {
                // The song was dequeued between the dedup write and the
                // increment; drop the tombstone again so a future vote for a
                // re-added song with this id is not falsely blocked
                store.delete(&vote_key).await?;
                Err(VoteError::SongNotFound)
            }
        }
    }
}

impl<S, P> CooldownGuard<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Fails when the session added a song inside the cooldown window and
    /// that song is still active (queued or currently playing)
    pub async fn check(&self, venue_id: &str, session_id: &str) -> Result<(), VoteError> {
        let window_ms = self.context.config.cooldown_ms();
        if window_ms == 0 {
            return Ok(());
        }

        let store = &self.context.store;

        let Some(record) = store
            .get_json::<SubmissionRecord>(&keys::submission_session(venue_id, session_id))
            .await?
        else {
            return Ok(());
        };

        let since = now_ms() - record.last_added_at;
        if since >= window_ms {
            return Ok(());
        }

        let Some(previous_id) = record.last_song_id else {
            return Ok(());
        };

        let still_queued = store
            .get(&keys::queue_item(venue_id, &previous_id))
            .await?
            .is_some();

        let now_playing = store
            .get_json::<NowPlaying>(&keys::now_playing(venue_id))
            .await?
            .map(|now| now.id == previous_id)
            .unwrap_or(false);

        if still_queued || now_playing {
            let remaining_minutes = (window_ms - since + 59_999) / 60_000;
            return Err(VoteError::CooldownActive { remaining_minutes });
        }

        Ok(())
    }

    /// Remembers a successful submission, starting the session's cooldown
    pub async fn record(
        &self,
        venue_id: &str,
        session_id: &str,
        song_id: &str,
    ) -> Result<(), VoteError> {
        self.context
            .store
            .put_json(
                &keys::submission_session(venue_id, session_id),
                &SubmissionRecord {
                    last_added_at: now_ms(),
                    last_song_id: Some(song_id.to_string()),
                },
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{context, context_with};
    use crate::{EngineConfig, NewSong, SongQueue};

    #[tokio::test]
    async fn test_vote_is_counted_once() {
        let context = context();
        let queue = SongQueue::new(&context);
        let votes = VoteLedger::new(&context);

        let song = queue
            .enqueue(
                "venue",
                NewSong {
                    title: "song1".to_string(),
                    artist: "Artist".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(votes.vote("venue", &song.id, "s1").await.unwrap(), 1);
        assert!(matches!(
            votes.vote("venue", &song.id, "s1").await,
            Err(VoteError::AlreadyVoted)
        ));

        let item = queue.list("venue").await.unwrap().remove(0);
        assert_eq!(item.hype, 1);

        // A different session still counts
        assert_eq!(votes.vote("venue", &song.id, "s2").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_vote_for_missing_song_rolls_back() {
        let context = context();
        let votes = VoteLedger::new(&context);

        assert!(matches!(
            votes.vote("venue", "gone", "s1").await,
            Err(VoteError::SongNotFound)
        ));

        // The failed vote left no tombstone behind
        let item = QueueItemFixture::put(&context, "gone", 0, 1000).await;
        assert_eq!(votes.vote("venue", &item, "s1").await.unwrap(), 1);
    }

    struct QueueItemFixture;

    impl QueueItemFixture {
        async fn put(
            context: &crate::EngineContext<crate::MemoryStore, crate::testing::FakeProvider>,
            id: &str,
            hype: i64,
            added_at: i64,
        ) -> String {
            let item = crate::QueueItem {
                id: id.to_string(),
                title: id.to_string(),
                artist: "Artist".to_string(),
                album_art: String::new(),
                uri: None,
                spotify_id: None,
                duration_ms: None,
                hype,
                added_at,
            };

            context
                .store
                .put_json(&keys::queue_item("venue", id), &item)
                .await
                .unwrap();

            id.to_string()
        }
    }

    async fn record_submission_at(
        context: &crate::EngineContext<crate::MemoryStore, crate::testing::FakeProvider>,
        session_id: &str,
        song_id: &str,
        added_at: i64,
    ) {
        context
            .store
            .put_json(
                &keys::submission_session("venue", session_id),
                &SubmissionRecord {
                    last_added_at: added_at,
                    last_song_id: Some(song_id.to_string()),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cooldown_reports_remaining_minutes() {
        let context = context_with(EngineConfig {
            cooldown_minutes: 5,
            ..Default::default()
        });
        let cooldown = CooldownGuard::new(&context);

        QueueItemFixture::put(&context, "x", 0, 1000).await;
        record_submission_at(&context, "s1", "x", now_ms() - 2 * 60_000).await;

        // Two minutes in, three whole minutes left
        match cooldown.check("venue", "s1").await {
            Err(VoteError::CooldownActive { remaining_minutes }) => {
                assert_eq!(remaining_minutes, 3)
            }
            other => panic!("expected cooldown, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_cooldown_lifts_when_previous_song_is_gone() {
        let context = context_with(EngineConfig {
            cooldown_minutes: 5,
            ..Default::default()
        });
        let cooldown = CooldownGuard::new(&context);

        record_submission_at(&context, "s1", "gone", now_ms() - 60_000).await;

        cooldown.check("venue", "s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_cooldown_applies_while_previous_song_plays() {
        let context = context_with(EngineConfig {
            cooldown_minutes: 5,
            ..Default::default()
        });
        let cooldown = CooldownGuard::new(&context);

        context
            .store
            .put_json(
                &keys::now_playing("venue"),
                &NowPlaying {
                    id: "x".to_string(),
                    title: "x".to_string(),
                    artist: "Artist".to_string(),
                    album_art: String::new(),
                    uri: None,
                    spotify_id: None,
                    duration_ms: None,
                    started_at: Some(now_ms()),
                },
            )
            .await
            .unwrap();

        record_submission_at(&context, "s1", "x", now_ms() - 60_000).await;

        assert!(matches!(
            cooldown.check("venue", "s1").await,
            Err(VoteError::CooldownActive { .. })
        ));
    }

    #[tokio::test]
    async fn test_cooldown_expires_with_time() {
        let context = context_with(EngineConfig {
            cooldown_minutes: 5,
            ..Default::default()
        });
        let cooldown = CooldownGuard::new(&context);

        QueueItemFixture::put(&context, "x", 0, 1000).await;
        record_submission_at(&context, "s1", "x", now_ms() - 6 * 60_000).await;

        cooldown.check("venue", "s1").await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_window_disables_cooldown() {
        let context = context_with(EngineConfig {
            cooldown_minutes: 0,
            ..Default::default()
        });
        let cooldown = CooldownGuard::new(&context);

        QueueItemFixture::put(&context, "x", 0, 1000).await;
        cooldown.record("venue", "s1", "x").await.unwrap();

        cooldown.check("venue", "s1").await.unwrap();
    }
}
