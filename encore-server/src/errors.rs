use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use encore_engine::{
    AuthError, CatalogError, CredentialsError, PlaybackError, QueueError, SkipError, StoreError,
    VoteError,
};
use serde_json::json;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

/// Every engine failure maps into one of these, giving each a stable
/// status code and a JSON `{ "error": ... }` body
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Missing or invalid venue admin token")]
    Unauthorized,
    #[error("Session expired")]
    SessionExpired,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("No PIN set for this venue")]
    NoPinSet,
    #[error("PIN already set for this venue")]
    PinAlreadySet,
    #[error("Already voted")]
    AlreadyVoted,
    #[error("Song not found in queue")]
    SongNotFound,
    #[error("No track playing")]
    NoTrackPlaying,
    #[error("Cooldown active")]
    CooldownActive { minutes: i64 },
    #[error("Too many searches. Please wait {retry_after} second(s).")]
    TooManySearches { retry_after: i64 },
    #[error("No device selected for this venue")]
    NoDeviceSelected,
    #[error("Queue empty - tried auto-fill")]
    QueueEmpty,
    #[error("Song has no Spotify URI/ID")]
    NoPlayableUri,
    #[error("Venue is not linked to Spotify")]
    VenueNotLinked,
    #[error("Playback provider request failed")]
    Upstream(String),
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::SessionExpired | Self::InvalidPin => {
                StatusCode::UNAUTHORIZED
            }
            Self::SongNotFound => StatusCode::NOT_FOUND,
            Self::CooldownActive { minutes: _ } | Self::TooManySearches { retry_after: _ } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Upstream(_) | Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.to_string() });

        match &self {
            Self::CooldownActive { minutes } => {
                body["cooldownMinutes"] = json!(minutes);
            }
            Self::TooManySearches { retry_after } => {
                body["retryAfter"] = json!(retry_after);
            }
            _ => {}
        }

        (self.as_status_code(), Json(body)).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::PinAlreadySet => Self::PinAlreadySet,
            AuthError::NoPinSet => Self::NoPinSet,
            AuthError::InvalidPin => Self::InvalidPin,
            AuthError::Unauthorized => Self::Unauthorized,
            AuthError::SessionExpired => Self::SessionExpired,
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<VoteError> for ServerError {
    fn from(value: VoteError) -> Self {
        match value {
            VoteError::AlreadyVoted => Self::AlreadyVoted,
            VoteError::SongNotFound => Self::SongNotFound,
            VoteError::CooldownActive { remaining_minutes } => Self::CooldownActive {
                minutes: remaining_minutes,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<QueueError> for ServerError {
    fn from(value: QueueError) -> Self {
        match value {
            QueueError::EmptyQueue => Self::QueueEmpty,
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<SkipError> for ServerError {
    fn from(value: SkipError) -> Self {
        match value {
            SkipError::NoTrackPlaying => Self::NoTrackPlaying,
            SkipError::AlreadyVoted => Self::AlreadyVoted,
            SkipError::Playback(e) => e.into(),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<PlaybackError> for ServerError {
    fn from(value: PlaybackError) -> Self {
        match value {
            PlaybackError::NoDeviceSelected => Self::NoDeviceSelected,
            PlaybackError::QueueEmpty => Self::QueueEmpty,
            PlaybackError::NoPlayableUri => Self::NoPlayableUri,
            PlaybackError::Credentials(e) => e.into(),
            PlaybackError::Upstream(e) => Self::Upstream(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<CredentialsError> for ServerError {
    fn from(value: CredentialsError) -> Self {
        match value {
            CredentialsError::NotLinked => Self::VenueNotLinked,
            CredentialsError::Provider(e) => Self::Upstream(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::RateLimited { retry_after_secs } => Self::TooManySearches {
                retry_after: retry_after_secs,
            },
            CatalogError::Credentials(e) => e.into(),
            CatalogError::Provider(e) => Self::Upstream(e.to_string()),
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(value: StoreError) -> Self {
        Self::Unknown(value.to_string())
    }
}
