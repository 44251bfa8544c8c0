use log::{error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    keys,
    util::now_ms,
    Catalog, Credentials, CredentialsError, EngineContext, PlaybackProvider, PlayerItem,
    ProviderError, QueueError, SongQueue, StoreError, StoreExt, VenueStore,
};

/// Owns the play-next state machine, device selection, now-playing
/// synchronization, recommendation auto-fill, and the watchdog tick.
///
/// Playback state is never stored: each operation derives it from the
/// provider's player and the queue at call time.
pub struct Playback<S, P> {
    context: EngineContext<S, P>,
    queue: SongQueue<S, P>,
    credentials: Credentials<S, P>,
    catalog: Catalog<S, P>,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No device selected for this venue")]
    NoDeviceSelected,
    #[error("Queue is empty, auto-fill was attempted")]
    QueueEmpty,
    #[error("Song has no playable uri or track id")]
    NoPlayableUri,
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("Provider playback call failed: {0}")]
    Upstream(ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<QueueError> for PlaybackError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::EmptyQueue => Self::QueueEmpty,
            QueueError::Store(e) => Self::Store(e),
        }
    }
}

/// The cached snapshot of what a venue is playing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album_art: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_id: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub started_at: Option<i64>,
}

/// The provider's live player state, shaped for the polling clients
#[derive(Debug, Clone)]
pub struct LiveState {
    pub is_playing: bool,
    pub progress_ms: i64,
    pub duration_ms: i64,
    pub started_at: Option<i64>,
    pub item: Option<PlayerItem>,
}

/// What a watchdog tick found and did about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Nothing can be done until an admin selects a device
    NoDevice,
    /// Playback is alive, no action needed
    Playing { queued: usize },
    PlayedNext,
    PlayNextFailed { detail: String },
    AutoFilled,
    AutoFillFailed { detail: String },
}

impl<S, P> Playback<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(context: &EngineContext<S, P>) -> Self {
        Self {
            context: context.clone(),
            queue: SongQueue::new(context),
            credentials: Credentials::new(context),
            catalog: Catalog::new(context),
        }
    }

    /// Persists the device playback should target, replacing any previous choice
    pub async fn select_device(&self, venue_id: &str, device_id: &str) -> Result<(), PlaybackError> {
        self.context
            .store
            .put_json(&keys::device(venue_id), device_id)
            .await?;

        Ok(())
    }

    /// The venue's selected device, if any
    pub async fn device(&self, venue_id: &str) -> Result<Option<String>, PlaybackError> {
        Ok(self.context.store.get_json(&keys::device(venue_id)).await?)
    }

    /// Lists playback-capable devices on the venue's provider account
    pub async fn devices(&self, venue_id: &str) -> Result<Vec<crate::Device>, PlaybackError> {
        let token = self.credentials.venue_token(venue_id).await?;

        self.context
            .provider
            .devices(&token)
            .await
            .map_err(PlaybackError::Upstream)
    }

    /// Advances the queue into playback: selects the top-ranked song, starts
    /// it on the selected device, updates the now-playing snapshot, and
    /// removes the song from the queue.
    pub async fn play_next(&self, venue_id: &str) -> Result<NowPlaying, PlaybackError> {
        let store = &self.context.store;

        let device = self
            .device(venue_id)
            .await?
            .ok_or(PlaybackError::NoDeviceSelected)?;

        let next = match self.queue.select_next(venue_id).await {
            Ok(item) => item,
            Err(QueueError::EmptyQueue) => {
                // Backfill the provider queue so the venue does not fall
                // silent, then tell the caller to retry
                if let Err(e) = self.auto_fill(venue_id).await {
                    warn!("auto-fill after empty queue failed: {}", e);
                }
                return Err(PlaybackError::QueueEmpty);
            }
            Err(e) => return Err(e.into()),
        };

        let uri = next.playable_uri().ok_or(PlaybackError::NoPlayableUri)?;
        let token = self.credentials.venue_token(venue_id).await?;

        if let Err(e) = self
            .context
            .provider
            .transfer(&token, &device, false)
            .await
        {
            warn!("transfer before play failed: {}", e);
        }

        self.context
            .provider
            .play(&token, &device, std::slice::from_ref(&uri), 0)
            .await
            .map_err(PlaybackError::Upstream)?;

        // Duration is nice-to-have for progress bars; never fail over it
        let duration_ms = match next.duration_ms {
            Some(duration) => Some(duration),
            None => match &next.spotify_id {
                Some(id) => self.catalog.track_duration(id).await,
                None => None,
            },
        };

        let now = NowPlaying {
            id: next.id.clone(),
            title: next.title.clone(),
            artist: next.artist.clone(),
            album_art: next.album_art.clone(),
            uri: Some(uri),
            spotify_id: next.spotify_id.clone(),
            duration_ms,
            started_at: Some(now_ms()),
        };
        store.put_json(&keys::now_playing(venue_id), &now).await?;

        store.delete(&keys::skip_votes(venue_id, &next.id)).await?;
        self.queue.remove(venue_id, &next.id).await?;

        if let Some(spotify_id) = &next.spotify_id {
            self.remember_track(venue_id, spotify_id).await?;
        }

        Ok(now)
    }

    /// Requests recommendations seeded by recently played tracks and pushes
    /// them into the provider's own queue. Does nothing without seeds.
    pub async fn auto_fill(&self, venue_id: &str) -> Result<(), PlaybackError> {
        let config = &self.context.config;
        let provider = &self.context.provider;

        let Some(device) = self.device(venue_id).await? else {
            return Ok(());
        };

        let recent: Vec<String> = self
            .context
            .store
            .get_json(&keys::recent_tracks(venue_id))
            .await?
            .unwrap_or_default();

        let seeds: Vec<String> = recent
            .iter()
            .rev()
            .take(config.auto_fill_seeds)
            .rev()
            .cloned()
            .collect();

        if seeds.is_empty() {
            return Ok(());
        }

        let token = self.credentials.venue_token(venue_id).await?;

        let tracks = provider
            .recommendations(&token, &seeds, config.auto_fill_count)
            .await
            .map_err(PlaybackError::Upstream)?;

        for track in &tracks {
            if let Err(e) = provider.queue_track(&token, &track.uri).await {
                warn!("queueing recommendation failed: {}", e);
            }
        }

        let playing = match provider.playback_state(&token).await {
            Ok(state) => state.map(|s| s.is_playing).unwrap_or(false),
            Err(_) => false,
        };

        if !playing {
            if let Err(e) = provider.transfer(&token, &device, true).await {
                warn!("resume after auto-fill failed: {}", e);
            }
        }

        Ok(())
    }

    /// One watchdog tick: makes sure a venue with pending work is not
    /// sitting idle. Failures are reported in the outcome and retried on
    /// the next tick rather than escalated.
    pub async fn guard_ensure(&self, venue_id: &str) -> Result<GuardOutcome, PlaybackError> {
        if self.device(venue_id).await?.is_none() {
            return Ok(GuardOutcome::NoDevice);
        }

        let token = self.credentials.venue_token(venue_id).await?;

        let state = match self.context.provider.playback_state(&token).await {
            Ok(state) => state,
            Err(e) => {
                warn!("guard could not read player state: {}", e);
                None
            }
        };

        let queued = self.queue.list(venue_id).await?.len();

        if state.map(|s| s.is_playing).unwrap_or(false) {
            return Ok(GuardOutcome::Playing { queued });
        }

        if queued > 0 {
            match self.play_next(venue_id).await {
                Ok(_) => Ok(GuardOutcome::PlayedNext),
                Err(e) => {
                    error!("guard play-next failed: {}", e);
                    Ok(GuardOutcome::PlayNextFailed {
                        detail: e.to_string(),
                    })
                }
            }
        } else {
            match self.auto_fill(venue_id).await {
                Ok(()) => Ok(GuardOutcome::AutoFilled),
                Err(e) => {
                    error!("guard auto-fill failed: {}", e);
                    Ok(GuardOutcome::AutoFillFailed {
                        detail: e.to_string(),
                    })
                }
            }
        }
    }

    /// The cached now-playing snapshot
    pub async fn now_playing(&self, venue_id: &str) -> Result<Option<NowPlaying>, PlaybackError> {
        Ok(self
            .context
            .store
            .get_json(&keys::now_playing(venue_id))
            .await?)
    }

    /// The now-playing snapshot, falling back to mirroring the provider's
    /// live state when no snapshot exists. Provider trouble means "no track"
    /// here, never an error.
    pub async fn current_track(&self, venue_id: &str) -> Result<Option<NowPlaying>, PlaybackError> {
        if let Some(now) = self.now_playing(venue_id).await? {
            return Ok(Some(now));
        }

        let Ok(token) = self.credentials.venue_token(venue_id).await else {
            return Ok(None);
        };

        let state = self
            .context
            .provider
            .playback_state(&token)
            .await
            .ok()
            .flatten();

        let Some(state) = state else {
            return Ok(None);
        };
        let Some(item) = state.item else {
            return Ok(None);
        };

        let now = NowPlaying {
            title: item.title,
            artist: item.artist,
            album_art: item.album_art,
            uri: Some(item.uri),
            spotify_id: Some(item.id.clone()),
            duration_ms: item.duration_ms,
            started_at: state.is_playing.then(|| now_ms() - state.progress_ms),
            id: item.id,
        };

        self.context
            .store
            .put_json(&keys::now_playing(venue_id), &now)
            .await?;

        Ok(Some(now))
    }

    /// The provider's live player state, shaped for polling clients
    pub async fn live_state(&self, venue_id: &str) -> Result<LiveState, PlaybackError> {
        let token = self.credentials.venue_token(venue_id).await?;

        let state = self
            .context
            .provider
            .playback_state(&token)
            .await
            .map_err(PlaybackError::Upstream)?;

        let Some(state) = state else {
            return Ok(LiveState {
                is_playing: false,
                progress_ms: 0,
                duration_ms: 0,
                started_at: None,
                item: None,
            });
        };

        Ok(LiveState {
            is_playing: state.is_playing,
            progress_ms: state.progress_ms,
            duration_ms: state.item.as_ref().and_then(|i| i.duration_ms).unwrap_or(0),
            started_at: state.is_playing.then(|| now_ms() - state.progress_ms),
            item: state.item,
        })
    }

    /// Plays explicit uris on the selected device, bypassing the queue
    pub async fn play_uris(
        &self,
        venue_id: &str,
        uris: &[String],
        position_ms: i64,
    ) -> Result<(), PlaybackError> {
        let device = self
            .device(venue_id)
            .await?
            .ok_or(PlaybackError::NoDeviceSelected)?;

        let token = self.credentials.venue_token(venue_id).await?;

        if let Err(e) = self
            .context
            .provider
            .transfer(&token, &device, false)
            .await
        {
            warn!("transfer before play failed: {}", e);
        }

        self.context
            .provider
            .play(&token, &device, uris, position_ms)
            .await
            .map_err(PlaybackError::Upstream)
    }

    /// Tells the provider to move to its next track, used when a skip vote
    /// reaches the threshold
    pub async fn skip_current(&self, venue_id: &str) -> Result<(), PlaybackError> {
        let token = self.credentials.venue_token(venue_id).await?;
        let device = self.device(venue_id).await?;

        self.context
            .provider
            .skip_to_next(&token, device.as_deref())
            .await
            .map_err(PlaybackError::Upstream)
    }

    /// Appends a provider track id to the venue's bounded play history
    async fn remember_track(&self, venue_id: &str, spotify_id: &str) -> Result<(), PlaybackError> {
        let store = &self.context.store;
        let key = keys::recent_tracks(venue_id);

        let mut recent: Vec<String> = store.get_json(&key).await?.unwrap_or_default();
        recent.push(spotify_id.to_string());

        let keep = self.context.config.history_size;
        if recent.len() > keep {
            let overflow = recent.len() - keep;
            recent.drain(..overflow);
        }

        store.put_json(&key, &recent).await?;

        Ok(())
    }
}
