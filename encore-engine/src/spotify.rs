use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::provider::{
    Device, FoundTrack, PlaybackProvider, PlayerItem, PlayerState, ProviderError, TokenGrant,
};

const ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Everything playback control needs on the venue account
const AUTH_SCOPES: [&str; 4] = [
    "streaming",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
];

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// The Spotify Web API client used as the engine's playback provider
pub struct SpotifyClient {
    http: Client,
    config: SpotifyConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: String,
    uri: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
    album: Option<AlbumObject>,
    duration_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumObject {
    #[serde(default)]
    images: Vec<ImageObject>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceObject>,
}

#[derive(Debug, Deserialize)]
struct DeviceObject {
    /// Restricted devices report no id and cannot be targeted
    id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(default)]
    is_playing: bool,
    progress_ms: Option<i64>,
    item: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct RecommendationsResponse {
    #[serde(default)]
    tracks: Vec<TrackObject>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        Ok((&self.config.client_id, &self.config.client_secret))
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, ProviderError> {
        let (client_id, client_secret) = self.credentials()?;

        let response = self
            .http
            .post(format!("{}/api/token", ACCOUNTS_BASE))
            .basic_auth(client_id, Some(client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }
}

#[async_trait]
impl PlaybackProvider for SpotifyClient {
    fn authorize_url(&self, venue_id: &str) -> Result<String, ProviderError> {
        let (client_id, _) = self.credentials()?;

        let mut url = Url::parse(ACCOUNTS_BASE).expect("accounts base url is valid");
        url.set_path("/authorize");

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &AUTH_SCOPES.join(" "))
            .append_pair("state", venue_id)
            .append_pair("show_dialog", "false");

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, ProviderError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
        ])
        .await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn client_grant(&self) -> Result<TokenGrant, ProviderError> {
        self.token_request(&[("grant_type", "client_credentials")])
            .await
    }

    async fn search(
        &self,
        token: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/search", API_BASE))
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("type", "track"),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(result.tracks.items.into_iter().map(Into::into).collect())
    }

    async fn track_duration(
        &self,
        token: &str,
        track_id: &str,
    ) -> Result<Option<i64>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/tracks/{}", API_BASE, track_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let track: TrackObject = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(track.duration_ms)
    }

    async fn devices(&self, token: &str) -> Result<Vec<Device>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/me/player/devices", API_BASE))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let result: DevicesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(result
            .devices
            .into_iter()
            .filter_map(|d| {
                d.id.map(|id| Device {
                    id,
                    name: d.name,
                    kind: d.kind,
                    is_active: d.is_active,
                })
            })
            .collect())
    }

    async fn transfer(
        &self,
        token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .put(format!("{}/me/player", API_BASE))
            .bearer_auth(token)
            .json(&serde_json::json!({ "device_ids": [device_id], "play": play }))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        ok_or_error(response).await
    }

    async fn play(
        &self,
        token: &str,
        device_id: &str,
        uris: &[String],
        position_ms: i64,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .put(format!("{}/me/player/play", API_BASE))
            .bearer_auth(token)
            .query(&[("device_id", device_id)])
            .json(&serde_json::json!({ "uris": uris, "position_ms": position_ms }))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        ok_or_error(response).await
    }

    async fn queue_track(&self, token: &str, uri: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!("{}/me/player/queue", API_BASE))
            .bearer_auth(token)
            .query(&[("uri", uri)])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        ok_or_error(response).await
    }

    async fn skip_to_next(
        &self,
        token: &str,
        device_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut request = self
            .http
            .post(format!("{}/me/player/next", API_BASE))
            .bearer_auth(token);

        if let Some(device_id) = device_id {
            request = request.query(&[("device_id", device_id)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        ok_or_error(response).await
    }

    async fn playback_state(&self, token: &str) -> Result<Option<PlayerState>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/me/player", API_BASE))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();

        // An inactive player reports no content at all
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let player: PlayerResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(Some(PlayerState {
            is_playing: player.is_playing,
            progress_ms: player.progress_ms.unwrap_or(0),
            item: player.item.map(Into::into),
        }))
    }

    async fn recommendations(
        &self,
        token: &str,
        seed_track_ids: &[String],
        limit: usize,
    ) -> Result<Vec<FoundTrack>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/recommendations", API_BASE))
            .bearer_auth(token)
            .query(&[
                ("seed_tracks", seed_track_ids.join(",").as_str()),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_unsuccessful_request(response, status).await);
        }

        let result: RecommendationsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(result.tracks.into_iter().map(Into::into).collect())
    }
}

impl From<TrackObject> for FoundTrack {
    fn from(track: TrackObject) -> Self {
        FoundTrack {
            album_art: first_image(&track.album),
            artist: join_artists(&track.artists),
            id: track.id,
            uri: track.uri,
            title: track.name,
            duration_ms: track.duration_ms,
        }
    }
}

impl From<TrackObject> for PlayerItem {
    fn from(track: TrackObject) -> Self {
        PlayerItem {
            album_art: first_image(&track.album),
            artist: join_artists(&track.artists),
            id: track.id,
            uri: track.uri,
            title: track.name,
            duration_ms: track.duration_ms,
        }
    }
}

fn join_artists(artists: &[ArtistObject]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_image(album: &Option<AlbumObject>) -> String {
    album
        .as_ref()
        .and_then(|a| a.images.first())
        .map(|i| i.url.clone())
        .unwrap_or_default()
}

async fn ok_or_error(response: Response) -> Result<(), ProviderError> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    Err(handle_unsuccessful_request(response, status).await)
}

async fn handle_unsuccessful_request(response: Response, status: StatusCode) -> ProviderError {
    let body = response.text().await.unwrap_or_default();

    ProviderError::Status {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn client() -> SpotifyClient {
        SpotifyClient::new(SpotifyConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://example.com/callback".to_string(),
        })
    }

    #[test]
    fn test_authorize_url() {
        let url = client().authorize_url("venue-1").unwrap();

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=id"));
        assert!(url.contains("state=venue-1"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("user-read-playback-state"));
    }

    #[test]
    fn test_authorize_url_requires_credentials() {
        let client = SpotifyClient::new(SpotifyConfig {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
        });

        assert!(matches!(
            client.authorize_url("venue-1"),
            Err(ProviderError::NotConfigured)
        ));
    }

    #[test]
    fn test_track_conversion() {
        let raw = r#"{
            "id": "abc",
            "uri": "spotify:track:abc",
            "name": "Song",
            "artists": [{"name": "A"}, {"name": "B"}],
            "album": {"images": [{"url": "https://img/1"}, {"url": "https://img/2"}]},
            "duration_ms": 120000
        }"#;

        let track: TrackObject = serde_json::from_str(raw).unwrap();
        let found = FoundTrack::from(track);

        assert_eq!(found.artist, "A, B");
        assert_eq!(found.album_art, "https://img/1");
        assert_eq!(found.duration_ms, Some(120000));
    }
}
