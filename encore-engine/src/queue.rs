use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    keys, util, EngineContext, NowPlaying, PlaybackProvider, StoreError, StoreExt, VenueStore,
};

/// The ranked set of pending songs per venue
pub struct SongQueue<S, P> {
    context: EngineContext<S, P>,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue is empty")]
    EmptyQueue,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A song awaiting playback, owned by a venue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_art: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub hype: i64,
    pub added_at: i64,
}

/// What a submitter provides when adding a song
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album_art: Option<String>,
    pub uri: Option<String>,
    pub spotify_id: Option<String>,
    pub duration_ms: Option<i64>,
}

impl QueueItem {
    /// The uri playback needs, synthesized from the track id when the item
    /// was added without one
    pub fn playable_uri(&self) -> Option<String> {
        self.uri.clone().or_else(|| {
            self.spotify_id
                .as_ref()
                .map(|id| format!("spotify:track:{}", id))
        })
    }
}

impl<S, P> SongQueue<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Adds a song to the venue's queue with a fresh id and zero hype
    pub async fn enqueue(&self, venue_id: &str, song: NewSong) -> Result<QueueItem, QueueError> {
        let uri = song.uri.or_else(|| {
            song.spotify_id
                .as_ref()
                .map(|id| format!("spotify:track:{}", id))
        });

        let item = QueueItem {
            id: util::song_id(),
            title: song.title,
            artist: song.artist,
            album_art: song.album_art.unwrap_or_default(),
            uri,
            spotify_id: song.spotify_id,
            duration_ms: song.duration_ms,
            hype: 0,
            added_at: util::now_ms(),
        };

        self.context
            .store
            .put_json(&keys::queue_item(venue_id, &item.id), &item)
            .await?;

        Ok(item)
    }

    /// Returns all pending songs, ranked by hype with first-come tie-break.
    /// This exact order is also used for selection.
    pub async fn list(&self, venue_id: &str) -> Result<Vec<QueueItem>, QueueError> {
        let entries = self
            .context
            .store
            .scan_prefix(&keys::queue_prefix(venue_id))
            .await?;

        let mut items = entries
            .into_iter()
            .map(|(_, value)| serde_json::from_value(value))
            .collect::<Result<Vec<QueueItem>, _>>()
            .map_err(StoreError::from)?;

        items.sort_by(|a, b| b.hype.cmp(&a.hype).then(a.added_at.cmp(&b.added_at)));

        Ok(items)
    }

    /// Returns the song that should play next
    pub async fn select_next(&self, venue_id: &str) -> Result<QueueItem, QueueError> {
        self.list(venue_id)
            .await?
            .into_iter()
            .next()
            .ok_or(QueueError::EmptyQueue)
    }

    /// Drops a song from the queue, called once playback of it has started
    pub async fn remove(&self, venue_id: &str, song_id: &str) -> Result<(), QueueError> {
        self.context
            .store
            .delete(&keys::queue_item(venue_id, song_id))
            .await?;

        Ok(())
    }

    /// Seeds a venue with demo content. Does nothing when the venue already
    /// has queued songs, so it is safe to call repeatedly.
    pub async fn seed_demo(&self, venue_id: &str) -> Result<bool, QueueError> {
        let store = &self.context.store;

        if !store.scan_prefix(&keys::queue_prefix(venue_id)).await?.is_empty() {
            return Ok(false);
        }

        let now = util::now_ms();
        let demo_songs = [
            ("demo-1", "adore u", "Fred again..", 127, 1_000_000),
            ("demo-2", "Heat Waves", "Glass Animals", 89, 800_000),
            ("demo-3", "Parem veelgi", "Tanel Padar", 56, 600_000),
            ("demo-4", "Blinding Lights", "The Weeknd", 43, 400_000),
        ];

        for (id, title, artist, hype, age_ms) in demo_songs {
            let item = QueueItem {
                id: id.to_string(),
                title: title.to_string(),
                artist: artist.to_string(),
                album_art: String::new(),
                uri: None,
                spotify_id: None,
                duration_ms: None,
                hype,
                added_at: now - age_ms,
            };

            store
                .put_json(&keys::queue_item(venue_id, id), &item)
                .await?;
        }

        store
            .put_json(
                &keys::now_playing(venue_id),
                &NowPlaying {
                    id: "demo-now-1".to_string(),
                    title: "Starboy".to_string(),
                    artist: "The Weeknd ft. Daft Punk".to_string(),
                    album_art: String::new(),
                    uri: None,
                    spotify_id: None,
                    duration_ms: None,
                    started_at: Some(now),
                },
            )
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::context;

    fn new_song(title: &str) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: "Artist".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_enqueue_and_list() {
        let context = context();
        let queue = SongQueue::new(&context);

        let first = queue.enqueue("venue", new_song("one")).await.unwrap();
        let second = queue.enqueue("venue", new_song("two")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.hype, 0);

        let items = queue.list("venue").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_list_ranks_by_hype_then_age() {
        let context = context();
        let queue = SongQueue::new(&context);

        let put = |id: &str, hype: i64, added_at: i64| {
            let item = QueueItem {
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
            let store = context.store.clone();
            let key = keys::queue_item("venue", id);
            async move { store.put_json(&key, &item).await.unwrap() }
        };

        // Same hype resolves first-come-first-served
        put("a", 3, 2000).await;
        put("b", 3, 1000).await;
        put("c", 7, 3000).await;

        let order: Vec<_> = queue
            .list("venue")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(order, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_select_next_on_empty_queue() {
        let context = context();
        let queue = SongQueue::new(&context);

        assert!(matches!(
            queue.select_next("venue").await,
            Err(QueueError::EmptyQueue)
        ));
    }

    #[tokio::test]
    async fn test_remove() {
        let context = context();
        let queue = SongQueue::new(&context);

        let item = queue.enqueue("venue", new_song("one")).await.unwrap();
        queue.remove("venue", &item.id).await.unwrap();

        assert!(queue.list("venue").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_playable_uri_synthesis() {
        let context = context();
        let queue = SongQueue::new(&context);

        let with_id = queue
            .enqueue(
                "venue",
                NewSong {
                    spotify_id: Some("abc123".to_string()),
                    ..new_song("one")
                },
            )
            .await
            .unwrap();
        assert_eq!(with_id.playable_uri().as_deref(), Some("spotify:track:abc123"));

        let without = queue.enqueue("venue", new_song("two")).await.unwrap();
        assert_eq!(without.playable_uri(), None);
    }

    #[tokio::test]
    async fn test_seed_demo_is_idempotent() {
        let context = context();
        let queue = SongQueue::new(&context);

        assert!(queue.seed_demo("venue").await.unwrap());
        assert!(!queue.seed_demo("venue").await.unwrap());

        assert_eq!(queue.list("venue").await.unwrap().len(), 4);
    }
}
