use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json,
};
use serde::Deserialize;
use url::Url;

use crate::{
    auth::AdminToken,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{PlaySchema, SelectDeviceSchema, ValidatedJson},
    serialized::{
        DevicesResponse, OkResponse, SearchResponse, ToSerialized, UserTokenResponse,
    },
    Router,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VenueQuery {
    venue_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    /// Carries the venue id through the OAuth round trip
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[utoipa::path(
    get,
    path = "/spotify/login",
    tag = "spotify",
    responses(
        (status = 303, description = "Redirect to the provider's consent page"),
        (status = 400, description = "Missing venueId")
    )
)]
async fn login(
    State(context): State<ServerContext>,
    Query(query): Query<VenueQuery>,
) -> ServerResult<Redirect> {
    let venue_id = query
        .venue_id
        .ok_or(ServerError::Validation("Missing venueId"))?;

    let url = context.engine.credentials.authorize_url(&venue_id)?;

    Ok(Redirect::to(&url))
}

#[utoipa::path(
    get,
    path = "/spotify/callback",
    tag = "spotify",
    responses(
        (status = 303, description = "Venue linked, redirect back to the admin page"),
        (status = 400, description = "Missing code or state")
    )
)]
async fn callback(
    State(context): State<ServerContext>,
    Query(query): Query<CallbackQuery>,
) -> ServerResult<Redirect> {
    let code = query.code.ok_or(ServerError::Validation("Missing code"))?;
    let venue_id = query
        .state
        .ok_or(ServerError::Validation("Missing state"))?;

    context.engine.credentials.link_venue(&venue_id, &code).await?;

    let mut url = Url::parse(&context.frontend_url)
        .map_err(|e| ServerError::Unknown(format!("FRONTEND_URL is invalid: {}", e)))?;

    url.set_path("/dj");
    url.query_pairs_mut()
        .append_pair("venue", &venue_id)
        .append_pair("admin", "true")
        .append_pair("linked", "1");

    Ok(Redirect::to(url.as_str()))
}

#[utoipa::path(
    get,
    path = "/spotify/devices/{venue_id}",
    tag = "spotify",
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = DevicesResponse),
        (status = 401, description = "Missing or expired admin session")
    )
)]
async fn devices(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
    token: AdminToken,
) -> ServerResult<Json<DevicesResponse>> {
    let engine = &context.engine;

    engine.auth.require_admin(&venue_id, token.as_deref()).await?;

    let devices = engine.playback.devices(&venue_id).await?;

    Ok(Json(DevicesResponse {
        devices: devices.to_serialized(),
    }))
}

#[utoipa::path(
    post,
    path = "/spotify/select-device",
    tag = "spotify",
    request_body = SelectDeviceSchema,
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = OkResponse),
        (status = 401, description = "Missing or expired admin session")
    )
)]
async fn select_device(
    State(context): State<ServerContext>,
    token: AdminToken,
    ValidatedJson(body): ValidatedJson<SelectDeviceSchema>,
) -> ServerResult<Json<OkResponse>> {
    let engine = &context.engine;

    engine
        .auth
        .require_admin(&body.venue_id, token.as_deref())
        .await?;

    engine
        .playback
        .select_device(&body.venue_id, &body.device_id)
        .await?;

    Ok(Json(OkResponse::new()))
}

#[utoipa::path(
    post,
    path = "/spotify/play",
    tag = "spotify",
    request_body = PlaySchema,
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = OkResponse),
        (status = 400, description = "No device selected"),
        (status = 401, description = "Missing or expired admin session")
    )
)]
async fn play(
    State(context): State<ServerContext>,
    token: AdminToken,
    ValidatedJson(body): ValidatedJson<PlaySchema>,
) -> ServerResult<Json<OkResponse>> {
    let engine = &context.engine;

    engine
        .auth
        .require_admin(&body.venue_id, token.as_deref())
        .await?;

    engine
        .playback
        .play_uris(&body.venue_id, &body.uris, body.position_ms.unwrap_or(0))
        .await?;

    Ok(Json(OkResponse::new()))
}

#[utoipa::path(
    get,
    path = "/spotify/now/{venue_id}",
    tag = "spotify",
    responses(
        (status = 200, body = crate::serialized::LiveStateResponse)
    )
)]
async fn now(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let state = context.engine.playback.live_state(&venue_id).await?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(state.to_serialized()),
    ))
}

#[utoipa::path(
    get,
    path = "/spotify/user-token",
    tag = "spotify",
    responses(
        (status = 200, body = UserTokenResponse),
        (status = 400, description = "Missing venueId or venue not linked")
    )
)]
async fn user_token(
    State(context): State<ServerContext>,
    Query(query): Query<VenueQuery>,
) -> ServerResult<Json<UserTokenResponse>> {
    let venue_id = query
        .venue_id
        .ok_or(ServerError::Validation("Missing venueId"))?;

    let access_token = context.engine.credentials.venue_token(&venue_id).await?;

    Ok(Json(UserTokenResponse { access_token }))
}

#[utoipa::path(
    get,
    path = "/search-spotify",
    tag = "spotify",
    responses(
        (status = 200, body = SearchResponse),
        (status = 429, description = "Search throttle hit, includes retryAfter")
    )
)]
async fn search(
    State(context): State<ServerContext>,
    Query(query): Query<SearchQuery>,
) -> ServerResult<Json<SearchResponse>> {
    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or(ServerError::Validation("Query parameter required"))?;

    let results = context.engine.catalog.search(&q).await?;

    Ok(Json(SearchResponse {
        results: results.to_serialized(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/spotify/login", get(login))
        .route("/spotify/callback", get(callback))
        .route("/spotify/devices/:venue_id", get(devices))
        .route("/spotify/select-device", post(select_device))
        .route("/spotify/play", post(play))
        .route("/spotify/now/:venue_id", get(now))
        .route("/spotify/user-token", get(user_token))
        .route("/search-spotify", get(search))
}
