use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::request::Parts,
    routing::post,
    Json,
};
use std::convert::Infallible;

use encore_engine::NewSong;

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    queue::resolve_song,
    schemas::{AdminAddSongSchema, LoginSchema, LogoutSchema, SetPinSchema, ValidatedJson},
    serialized::{AddSongResponse, LoginResponse, OkResponse, ToSerialized},
    Router,
};

/// The header venue admins authenticate with
pub const ADMIN_TOKEN_HEADER: &str = "x-venue-admin";

/// Extracts the admin token header without judging it; handlers pass it to
/// the engine's guard together with the venue id
pub struct AdminToken(Option<String>);

impl AdminToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|x| x.to_str().ok())
            .map(str::to_string);

        Ok(Self(token))
    }
}

#[utoipa::path(
    post,
    path = "/admin/set-pin",
    tag = "admin",
    request_body = SetPinSchema,
    responses(
        (status = 200, body = OkResponse),
        (status = 400, description = "A PIN is already set for this venue")
    )
)]
async fn set_pin(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<SetPinSchema>,
) -> ServerResult<Json<OkResponse>> {
    context.engine.auth.set_pin(&body.venue_id, &body.pin).await?;

    Ok(Json(OkResponse::new()))
}

#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "admin",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResponse),
        (status = 400, description = "No PIN set for this venue"),
        (status = 401, description = "Invalid PIN")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResponse>> {
    let token = context.engine.auth.login(&body.venue_id, &body.pin).await?;

    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/admin/logout",
    tag = "admin",
    request_body = LogoutSchema,
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = OkResponse)
    )
)]
async fn logout(
    State(context): State<ServerContext>,
    token: AdminToken,
    ValidatedJson(body): ValidatedJson<LogoutSchema>,
) -> ServerResult<Json<OkResponse>> {
    let token = token.as_deref().ok_or(ServerError::Unauthorized)?;

    // Expired or unknown tokens land here too; deleting is idempotent
    context.engine.auth.logout(&body.venue_id, token).await?;

    Ok(Json(OkResponse::new()))
}

#[utoipa::path(
    post,
    path = "/admin/add-song",
    tag = "admin",
    request_body = AdminAddSongSchema,
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = AddSongResponse),
        (status = 401, description = "Missing or expired admin session")
    )
)]
async fn add_song(
    State(context): State<ServerContext>,
    token: AdminToken,
    ValidatedJson(body): ValidatedJson<AdminAddSongSchema>,
) -> ServerResult<Json<AddSongResponse>> {
    let engine = &context.engine;

    engine
        .auth
        .require_admin(&body.venue_id, token.as_deref())
        .await?;

    // Admin submissions bypass the cooldown and carry no session identity
    let song = resolve_song(
        engine,
        NewSong {
            title: body.title,
            artist: body.artist,
            album_art: body.album_art,
            uri: body.uri,
            spotify_id: body.spotify_id,
            duration_ms: None,
        },
    )
    .await;

    let item = engine.queue.enqueue(&body.venue_id, song).await?;

    Ok(Json(AddSongResponse {
        success: true,
        song: item.to_serialized(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/admin/set-pin", post(set_pin))
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/add-song", post(add_song))
}
