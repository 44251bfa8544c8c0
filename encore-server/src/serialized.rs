//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use encore_engine::{
    Device as EngineDevice, FoundTrack, GuardOutcome, LiveState, NowPlaying, PlayerItem,
    QueueItem, SkipStatus,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    id: String,
    title: String,
    artist: String,
    album_art: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spotify_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
    hype: i64,
    added_at: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingTrack {
    id: String,
    title: String,
    artist: String,
    album_art: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spotify_id: Option<String>,
    duration_ms: Option<i64>,
    started_at: Option<i64>,
}

/// A catalog search hit, shaped so clients can submit it back wholesale
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackResult {
    id: String,
    spotify_id: String,
    uri: String,
    title: String,
    artist: String,
    album_art: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LivePlayerItem {
    name: String,
    artists: String,
    album_art: String,
    uri: String,
    id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub queue: Vec<Song>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingResponse {
    pub now_playing: Option<NowPlayingTrack>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub success: bool,
    pub hype: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddSongResponse {
    pub success: bool,
    pub song: Song,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    pub success: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkipStatusResponse {
    pub track_id: Option<String>,
    pub votes: i64,
    pub threshold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkipVoteResponse {
    pub ok: bool,
    pub votes: i64,
    pub threshold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<TrackResult>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveStateResponse {
    pub is_playing: bool,
    pub progress_ms: i64,
    pub duration_ms: i64,
    pub started_at: Option<i64>,
    pub item: Option<LivePlayerItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitDemoResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuardResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Song> for QueueItem {
    fn to_serialized(&self) -> Song {
        Song {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_art: self.album_art.clone(),
            uri: self.uri.clone(),
            spotify_id: self.spotify_id.clone(),
            duration_ms: self.duration_ms,
            hype: self.hype,
            added_at: self.added_at,
        }
    }
}

impl ToSerialized<NowPlayingTrack> for NowPlaying {
    fn to_serialized(&self) -> NowPlayingTrack {
        NowPlayingTrack {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_art: self.album_art.clone(),
            uri: self.uri.clone(),
            spotify_id: self.spotify_id.clone(),
            duration_ms: self.duration_ms,
            started_at: self.started_at,
        }
    }
}

impl ToSerialized<TrackResult> for FoundTrack {
    fn to_serialized(&self) -> TrackResult {
        TrackResult {
            id: self.id.clone(),
            spotify_id: self.id.clone(),
            uri: self.uri.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_art: self.album_art.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

impl ToSerialized<Device> for EngineDevice {
    fn to_serialized(&self) -> Device {
        Device {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            is_active: self.is_active,
        }
    }
}

impl ToSerialized<LivePlayerItem> for PlayerItem {
    fn to_serialized(&self) -> LivePlayerItem {
        LivePlayerItem {
            name: self.title.clone(),
            artists: self.artist.clone(),
            album_art: self.album_art.clone(),
            uri: self.uri.clone(),
            id: self.id.clone(),
        }
    }
}

impl ToSerialized<LiveStateResponse> for LiveState {
    fn to_serialized(&self) -> LiveStateResponse {
        LiveStateResponse {
            is_playing: self.is_playing,
            progress_ms: self.progress_ms,
            duration_ms: self.duration_ms,
            started_at: self.started_at,
            item: self.item.as_ref().map(|i| i.to_serialized()),
        }
    }
}

impl ToSerialized<SkipStatusResponse> for SkipStatus {
    fn to_serialized(&self) -> SkipStatusResponse {
        SkipStatusResponse {
            track_id: self.track_id.clone(),
            votes: self.votes,
            threshold: self.threshold,
        }
    }
}

impl ToSerialized<GuardResponse> for GuardOutcome {
    fn to_serialized(&self) -> GuardResponse {
        let empty = GuardResponse {
            ok: true,
            reason: None,
            playing: None,
            queue: None,
            tried: None,
            detail: None,
        };

        match self {
            GuardOutcome::NoDevice => GuardResponse {
                ok: false,
                reason: Some("no-device"),
                ..empty
            },
            GuardOutcome::Playing { queued } => GuardResponse {
                playing: Some(true),
                queue: Some(*queued),
                ..empty
            },
            GuardOutcome::PlayedNext => GuardResponse {
                tried: Some("play-next"),
                ..empty
            },
            GuardOutcome::PlayNextFailed { detail } => GuardResponse {
                ok: false,
                tried: Some("play-next"),
                detail: Some(detail.clone()),
                ..empty
            },
            GuardOutcome::AutoFilled => GuardResponse {
                tried: Some("auto-fill"),
                ..empty
            },
            GuardOutcome::AutoFillFailed { detail } => GuardResponse {
                ok: false,
                tried: Some("auto-fill"),
                detail: Some(detail.clone()),
                ..empty
            },
        }
    }
}
