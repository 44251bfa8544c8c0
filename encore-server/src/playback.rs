use axum::{
    extract::{Path, State},
    routing::post,
    Json,
};

use crate::{
    auth::AdminToken,
    context::ServerContext,
    errors::ServerResult,
    serialized::{GuardResponse, OkResponse, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/play-next/{venue_id}",
    tag = "playback",
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = OkResponse),
        (status = 400, description = "No device, empty queue, or unplayable song"),
        (status = 401, description = "Missing or expired admin session"),
        (status = 500, description = "Provider refused to start playback")
    )
)]
async fn play_next(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
    token: AdminToken,
) -> ServerResult<Json<OkResponse>> {
    let engine = &context.engine;

    engine.auth.require_admin(&venue_id, token.as_deref()).await?;

    engine.playback.play_next(&venue_id).await?;

    Ok(Json(OkResponse::new()))
}

#[utoipa::path(
    post,
    path = "/guard/ensure/{venue_id}",
    tag = "playback",
    security(("VenueAdmin" = [])),
    responses(
        (status = 200, body = GuardResponse),
        (status = 401, description = "Missing or expired admin session")
    )
)]
async fn guard_ensure(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
    token: AdminToken,
) -> ServerResult<Json<GuardResponse>> {
    let engine = &context.engine;

    engine.auth.require_admin(&venue_id, token.as_deref()).await?;

    let outcome = engine.playback.guard_ensure(&venue_id).await?;

    Ok(Json(outcome.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/play-next/:venue_id", post(play_next))
        .route("/guard/ensure/:venue_id", post(guard_ensure))
}
