mod auth;
mod context;
mod docs;
mod errors;
mod logging;
mod playback;
mod queue;
mod schemas;
mod serialized;
mod skip;
mod spotify;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
};

use axum::{routing::get, Json};
use log::info;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use context::{Engine, ServerContext};
pub use logging::init_logger;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 8090;

pub type Router = axum::Router<ServerContext>;

/// Starts the encore server
pub async fn run_server(context: ServerContext) {
    let port = env::var("ENCORE_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api.json", get(docs::docs))
        .merge(queue::router())
        .merge(auth::router())
        .merge(skip::router())
        .merge(spotify::router())
        .merge(playback::router())
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("server runs");
}

async fn root() -> &'static str {
    "ok"
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
