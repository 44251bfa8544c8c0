//! Builders for every key the engine persists. All venue state lives in the
//! store under these prefixes, so the layout is kept in one place.

pub fn queue_item(venue_id: &str, song_id: &str) -> String {
    format!("queue:{}:{}", venue_id, song_id)
}

pub fn queue_prefix(venue_id: &str) -> String {
    format!("queue:{}:", venue_id)
}

pub fn vote(venue_id: &str, session_id: &str, song_id: &str) -> String {
    format!("vote:{}:{}:{}", venue_id, session_id, song_id)
}

pub fn submission_session(venue_id: &str, session_id: &str) -> String {
    format!("session:{}:{}", venue_id, session_id)
}

pub fn admin_pin(venue_id: &str) -> String {
    format!("admin:pin:{}", venue_id)
}

pub fn admin_session(venue_id: &str, token: &str) -> String {
    format!("admin:session:{}:{}", venue_id, token)
}

pub fn skip_votes(venue_id: &str, track_id: &str) -> String {
    format!("skip:votes:{}:{}", venue_id, track_id)
}

pub fn skip_voted(venue_id: &str, session_id: &str, track_id: &str) -> String {
    format!("skip:voted:{}:{}:{}", venue_id, session_id, track_id)
}

pub fn skip_threshold(venue_id: &str) -> String {
    format!("skip:threshold:{}", venue_id)
}

pub fn now_playing(venue_id: &str) -> String {
    format!("nowplaying:{}", venue_id)
}

pub fn device(venue_id: &str) -> String {
    format!("spotify:device:{}", venue_id)
}

pub fn refresh_token(venue_id: &str) -> String {
    format!("spotify:refresh:{}", venue_id)
}

pub fn recent_tracks(venue_id: &str) -> String {
    format!("recent:tracks:{}", venue_id)
}

/// The app-level catalog token is process-wide, not venue-scoped
pub const APP_ACCESS_TOKEN: &str = "spotify:access_token";

/// One shared bucket for catalog search throttling
pub const SEARCH_RATE_LIMIT: &str = "ratelimit:spotify:search";
