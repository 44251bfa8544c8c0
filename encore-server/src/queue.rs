use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json,
};

use encore_engine::NewSong;

use crate::{
    context::{Engine, ServerContext},
    errors::ServerResult,
    schemas::{AddSongSchema, ValidatedJson, VoteSchema},
    serialized::{
        AddSongResponse, InitDemoResponse, NowPlayingResponse, QueueResponse, ToSerialized,
        VoteResponse,
    },
    Router,
};

/// Fills in uri, track id, album art, and duration from a catalog lookup
/// when a submission arrives with none. Lookup failures leave the song as
/// submitted; it simply will not be playable until an admin intervenes.
pub(crate) async fn resolve_song(engine: &Engine, mut song: NewSong) -> NewSong {
    if song.uri.is_some() || song.spotify_id.is_some() {
        return song;
    }

    if let Some(found) = engine.catalog.resolve(&song.title, &song.artist).await {
        song.uri = Some(found.uri);
        song.spotify_id = Some(found.id);
        song.duration_ms = found.duration_ms;

        if song.album_art.as_deref().map(str::is_empty).unwrap_or(true) {
            song.album_art = Some(found.album_art);
        }
    }

    song
}

#[utoipa::path(
    get,
    path = "/queue/{venue_id}",
    tag = "queue",
    responses(
        (status = 200, body = QueueResponse)
    )
)]
async fn queue(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let items = context.engine.queue.list(&venue_id).await?;

    // Polled every few seconds; intermediaries must not cache it
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(QueueResponse {
            queue: items.to_serialized(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/now-playing/{venue_id}",
    tag = "queue",
    responses(
        (status = 200, body = NowPlayingResponse)
    )
)]
async fn now_playing(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<impl IntoResponse> {
    let now = context.engine.playback.now_playing(&venue_id).await?;

    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(NowPlayingResponse {
            now_playing: now.map(|n| n.to_serialized()),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/vote",
    tag = "queue",
    request_body = VoteSchema,
    responses(
        (status = 200, body = VoteResponse),
        (status = 400, description = "Already voted for this song"),
        (status = 404, description = "Song is no longer in the queue")
    )
)]
async fn vote(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<VoteSchema>,
) -> ServerResult<Json<VoteResponse>> {
    let hype = context
        .engine
        .votes
        .vote(&body.venue_id, &body.song_id, &body.session_id)
        .await?;

    Ok(Json(VoteResponse {
        success: true,
        hype,
    }))
}

#[utoipa::path(
    post,
    path = "/add-song",
    tag = "queue",
    request_body = AddSongSchema,
    responses(
        (status = 200, body = AddSongResponse),
        (status = 429, description = "Cooldown active, includes cooldownMinutes")
    )
)]
async fn add_song(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<AddSongSchema>,
) -> ServerResult<Json<AddSongResponse>> {
    let engine = &context.engine;

    engine
        .cooldown
        .check(&body.venue_id, &body.session_id)
        .await?;

    let song = resolve_song(engine, body.song.into_new_song()).await;
    let item = engine.queue.enqueue(&body.venue_id, song).await?;

    engine
        .cooldown
        .record(&body.venue_id, &body.session_id, &item.id)
        .await?;

    Ok(Json(AddSongResponse {
        success: true,
        song: item.to_serialized(),
    }))
}

#[utoipa::path(
    post,
    path = "/init-demo/{venue_id}",
    tag = "queue",
    responses(
        (status = 200, body = InitDemoResponse)
    )
)]
async fn init_demo(
    State(context): State<ServerContext>,
    Path(venue_id): Path<String>,
) -> ServerResult<Json<InitDemoResponse>> {
    let seeded = context.engine.queue.seed_demo(&venue_id).await?;

    let message = if seeded {
        "Demo data initialized"
    } else {
        "Venue already initialized"
    };

    Ok(Json(InitDemoResponse {
        success: seeded.then_some(true),
        message: message.to_string(),
    }))
}

pub fn router() -> Router {
    Router::new()
        .route("/queue/:venue_id", get(queue))
        .route("/now-playing/:venue_id", get(now_playing))
        .route("/vote", post(vote))
        .route("/add-song", post(add_song))
        .route("/init-demo/:venue_id", post(init_demo))
}
