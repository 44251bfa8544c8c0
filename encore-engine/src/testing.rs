//! Shared test support: an in-memory context and a recording provider fake.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    Device, EngineConfig, EngineContext, FoundTrack, MemoryStore, PlaybackProvider, PlayerState,
    ProviderError, TokenGrant,
};

pub fn context() -> EngineContext<MemoryStore, FakeProvider> {
    context_with(EngineConfig::default())
}

pub fn context_with(config: EngineConfig) -> EngineContext<MemoryStore, FakeProvider> {
    EngineContext {
        store: Arc::new(MemoryStore::new()),
        provider: Arc::new(FakeProvider::default()),
        config: Arc::new(config),
    }
}

pub fn track(id: &str) -> FoundTrack {
    FoundTrack {
        id: id.to_string(),
        uri: format!("spotify:track:{}", id),
        title: format!("Track {}", id),
        artist: "Artist".to_string(),
        album_art: String::new(),
        duration_ms: Some(180_000),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ClientGrant,
    RefreshGrant,
    ExchangeCode,
    Search { query: String },
    Transfer { device_id: String, play: bool },
    Play { device_id: String, uris: Vec<String> },
    QueueTrack { uri: String },
    SkipToNext,
    Recommendations { seeds: Vec<String> },
}

/// A provider that records every call and answers from preset state
#[derive(Default)]
pub struct FakeProvider {
    pub calls: Mutex<Vec<ProviderCall>>,
    pub player_state: Mutex<Option<PlayerState>>,
    pub search_results: Mutex<Vec<FoundTrack>>,
    pub recommendation_results: Mutex<Vec<FoundTrack>>,
    pub devices: Mutex<Vec<Device>>,
    pub duration: Mutex<Option<i64>>,
    /// When set, refresh grants return this as a rotated refresh token
    pub rotated_refresh: Mutex<Option<String>>,
    pub fail_play: Mutex<bool>,
}

impl FakeProvider {
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &ProviderCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl PlaybackProvider for FakeProvider {
    fn authorize_url(&self, venue_id: &str) -> Result<String, ProviderError> {
        Ok(format!("https://provider.test/authorize?state={}", venue_id))
    }

    async fn exchange_code(&self, _code: &str) -> Result<TokenGrant, ProviderError> {
        self.record(ProviderCall::ExchangeCode);

        Ok(TokenGrant {
            access_token: "initial-access".to_string(),
            refresh_token: Some("initial-refresh".to_string()),
            expires_in: 3600,
        })
    }

    async fn refresh_grant(&self, _refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.record(ProviderCall::RefreshGrant);

        Ok(TokenGrant {
            access_token: "venue-access".to_string(),
            refresh_token: self.rotated_refresh.lock().clone(),
            expires_in: 3600,
        })
    }

    async fn client_grant(&self) -> Result<TokenGrant, ProviderError> {
        self.record(ProviderCall::ClientGrant);

        Ok(TokenGrant {
            access_token: "app-access".to_string(),
            refresh_token: None,
            expires_in: 3600,
        })
    }

    async fn search(
        &self,
        _token: &str,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError> {
        self.record(ProviderCall::Search {
            query: query.to_string(),
        });

        Ok(self.search_results.lock().clone())
    }

    async fn track_duration(
        &self,
        _token: &str,
        _track_id: &str,
    ) -> Result<Option<i64>, ProviderError> {
        Ok(*self.duration.lock())
    }

    async fn devices(&self, _token: &str) -> Result<Vec<Device>, ProviderError> {
        Ok(self.devices.lock().clone())
    }

    async fn transfer(
        &self,
        _token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::Transfer {
            device_id: device_id.to_string(),
            play,
        });

        Ok(())
    }

    async fn play(
        &self,
        _token: &str,
        device_id: &str,
        uris: &[String],
        _position_ms: i64,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::Play {
            device_id: device_id.to_string(),
            uris: uris.to_vec(),
        });

        if *self.fail_play.lock() {
            return Err(ProviderError::Status {
                status: 403,
                body: "restricted".to_string(),
            });
        }

        Ok(())
    }

    async fn queue_track(&self, _token: &str, uri: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::QueueTrack {
            uri: uri.to_string(),
        });

        Ok(())
    }

    async fn skip_to_next(
        &self,
        _token: &str,
        _device_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        self.record(ProviderCall::SkipToNext);

        Ok(())
    }

    async fn playback_state(&self, _token: &str) -> Result<Option<PlayerState>, ProviderError> {
        Ok(self.player_state.lock().clone())
    }

    async fn recommendations(
        &self,
        _token: &str,
        seed_track_ids: &[String],
        _limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError> {
        self.record(ProviderCall::Recommendations {
            seeds: seed_track_ids.to_vec(),
        });

        Ok(self.recommendation_results.lock().clone())
    }
}
