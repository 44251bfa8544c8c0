use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Client id or secret is missing from the environment
    #[error("Playback provider is not configured")]
    NotConfigured,

    #[error("Request to provider failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse provider response: {0}")]
    Parse(String),
}

/// A token issued by the provider's accounts service
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present when the provider rotates the refresh token
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    pub expires_in: i64,
}

/// A track found through catalog search or recommendations
#[derive(Debug, Clone)]
pub struct FoundTrack {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album_art: String,
    pub duration_ms: Option<i64>,
}

/// A playback-capable device on the venue account
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub is_active: bool,
}

/// A snapshot of the provider's player
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub is_playing: bool,
    pub progress_ms: i64,
    pub item: Option<PlayerItem>,
}

/// The track the provider's player currently holds
#[derive(Debug, Clone)]
pub struct PlayerItem {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_art: String,
    pub uri: String,
    pub duration_ms: Option<i64>,
}

/// Represents the external streaming service the engine drives. Everything
/// the orchestrator needs sits behind this seam so tests can use a fake.
///
/// Playback operations take an access token minted by the credentials
/// component; the trait itself holds no venue state.
#[async_trait]
pub trait PlaybackProvider: Send + Sync + 'static {
    /// The URL a venue admin is redirected to for account linking.
    /// `venue_id` is round-tripped through the OAuth state parameter.
    fn authorize_url(&self, venue_id: &str) -> Result<String, ProviderError>;

    /// Exchanges an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError>;

    /// Mints a short-lived access token from a stored refresh token
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;

    /// Mints the app-level catalog token (client credentials)
    async fn client_grant(&self) -> Result<TokenGrant, ProviderError>;

    async fn search(
        &self,
        token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError>;

    /// Looks up a single track, used to backfill durations
    async fn track_duration(
        &self,
        token: &str,
        track_id: &str,
    ) -> Result<Option<i64>, ProviderError>;

    async fn devices(&self, token: &str) -> Result<Vec<Device>, ProviderError>;

    /// Moves playback to `device_id`, starting or pausing it per `play`
    async fn transfer(&self, token: &str, device_id: &str, play: bool)
        -> Result<(), ProviderError>;

    /// Plays the given uris on `device_id` from `position_ms`
    async fn play(
        &self,
        token: &str,
        device_id: &str,
        uris: &[String],
        position_ms: i64,
    ) -> Result<(), ProviderError>;

    /// Appends a track to the provider's own playback queue
    async fn queue_track(&self, token: &str, uri: &str) -> Result<(), ProviderError>;

    async fn skip_to_next(
        &self,
        token: &str,
        device_id: Option<&str>,
    ) -> Result<(), ProviderError>;

    /// Returns the live player state, or None when nothing is active
    async fn playback_state(&self, token: &str) -> Result<Option<PlayerState>, ProviderError>;

    async fn recommendations(
        &self,
        token: &str,
        seed_track_ids: &[String],
        limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError>;
}
