use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json,
};

use crate::{
    context::ServerContext,
    errors::ServerResult,
    schemas::{SkipVoteSchema, ValidatedJson},
    serialized::{SkipVoteResponse, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/skip/status/{venue_id}",
    tag = "skip",
    responses(
        (status = 200, body = crate::serialized::SkipStatusResponse)
    )
)]
async fn status(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let status = context.engine.skip.status(&venue_id).await?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(status.to_serialized()),
    ))
}

#[utoipa::path(
    post,
    path = "/skip/vote",
    tag = "skip",
    request_body = SkipVoteSchema,
    responses(
        (status = 200, body = SkipVoteResponse),
        (status = 400, description = "No track playing, or this session already voted")
    )
)]
async fn vote(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<SkipVoteSchema>,
) -> ServerResult<Json<SkipVoteResponse>> {
    let status = context
        .engine
        .skip
        .vote(&body.venue_id, &body.session_id)
        .await?;

    Ok(Json(SkipVoteResponse {
        ok: true,
        votes: status.votes,
        threshold: status.threshold,
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/skip/status/:venue_id", get(status))
        .route("/skip/vote", post(vote))
}
