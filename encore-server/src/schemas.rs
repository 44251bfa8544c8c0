//! Request bodies accepted by the endpoints, validated before any handler
//! logic runs

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use encore_engine::NewSong;
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 128))]
    pub song_id: String,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInputSchema {
    /// Queue item ids sent back by clients are ignored; the server assigns its own
    pub id: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1, max = 256))]
    pub artist: String,
    pub album_art: Option<String>,
    pub uri: Option<String>,
    pub spotify_id: Option<String>,
}

impl SongInputSchema {
    pub fn into_new_song(self) -> NewSong {
        NewSong {
            title: self.title,
            artist: self.artist,
            album_art: self.album_art,
            uri: self.uri,
            spotify_id: self.spotify_id,
            duration_ms: None,
        }
    }
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSongSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(nested)]
    pub song: SongInputSchema,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAddSongSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(min = 1, max = 256))]
    pub artist: String,
    pub album_art: Option<String>,
    pub uri: Option<String>,
    pub spotify_id: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetPinSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 4, max = 64))]
    pub pin: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 64))]
    pub pin: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDeviceSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 256))]
    pub device_id: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1))]
    pub uris: Vec<String>,
    pub position_ms: Option<i64>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipVoteSchema {
    #[validate(length(min = 1, max = 128))]
    pub venue_id: String,
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let extracted_json: Json<T> = Json::from_request(req, state)
            .await
            .map_err(|_| ServerError::Validation("Missing required fields"))?;

        extracted_json
            .0
            .validate()
            .map_err(|_| ServerError::Validation("Request body is invalid"))?;

        Ok(Self(extracted_json.0))
    }
}
