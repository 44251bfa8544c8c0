use std::{env, sync::Arc};

use colored::Colorize;
use encore_engine::{Encore, EngineConfig, PgStore, SpotifyClient, SpotifyConfig};
use encore_server::{init_logger, run_server, ServerContext};
use log::{error, info, warn};

#[tokio::main]
async fn main() {
    init_logger();

    match build_context().await {
        Ok(context) => {
            info!("Initialized successfully.");
            run_server(context).await;
        }
        Err(error) => {
            error!("{}", "encore failed to start!".bold());
            error!("{}", error);
        }
    }
}

async fn build_context() -> Result<ServerContext, String> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| "DATABASE_URL is not set. Point it at a running postgres instance.")?;

    info!("Connecting to database...");
    let store = PgStore::new(&database_url)
        .await
        .map_err(|e| format!("Could not initialize the store: {}", e))?;

    let spotify = SpotifyClient::new(SpotifyConfig {
        client_id: env::var("SPOTIFY_CLIENT_ID").unwrap_or_default(),
        client_secret: env::var("SPOTIFY_CLIENT_SECRET").unwrap_or_default(),
        redirect_uri: env::var("SPOTIFY_REDIRECT_URI").unwrap_or_default(),
    });

    if env::var("SPOTIFY_CLIENT_ID").is_err() || env::var("SPOTIFY_CLIENT_SECRET").is_err() {
        warn!("Spotify credentials are not configured, search and playback will be unavailable");
    }

    let mut config = EngineConfig::default();

    if let Ok(minutes) = env::var("ENCORE_COOLDOWN_MINUTES") {
        config.cooldown_minutes = minutes
            .parse()
            .map_err(|_| "ENCORE_COOLDOWN_MINUTES must be a number")?;
    }

    if let Ok(hours) = env::var("ENCORE_SESSION_TTL_HOURS") {
        config.session_ttl_hours = hours
            .parse()
            .map_err(|_| "ENCORE_SESSION_TTL_HOURS must be a number")?;
    }

    if let Ok(threshold) = env::var("ENCORE_SKIP_THRESHOLD") {
        config.skip_threshold = threshold
            .parse()
            .map_err(|_| "ENCORE_SKIP_THRESHOLD must be a number")?;
    }

    let engine = Encore::new(store, spotify, config);

    Ok(ServerContext {
        engine: Arc::new(engine),
        frontend_url: env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string()),
    })
}
