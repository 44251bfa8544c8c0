use std::sync::Arc;

use encore_engine::{Encore, PgStore, SpotifyClient};

/// The concrete engine this server drives
pub type Engine = Encore<PgStore, SpotifyClient>;

#[derive(Clone)]
pub struct ServerContext {
    pub engine: Arc<Engine>,
    /// Where the OAuth callback sends the admin back to
    pub frontend_url: String,
}
