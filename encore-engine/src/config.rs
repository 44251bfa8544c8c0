use chrono::Duration;

/// The configuration of the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a session must wait before adding another song while its
    /// previous submission is still queued or playing. 0 disables the cooldown.
    pub cooldown_minutes: i64,
    /// How long an admin session token stays valid after login
    pub session_ttl_hours: i64,
    /// How many skip votes end the current track, unless a venue overrides it
    pub skip_threshold: i64,
    /// How many recently played provider track ids are kept as recommendation seeds
    pub history_size: usize,
    /// How many of the newest history entries seed a recommendation request
    pub auto_fill_seeds: usize,
    /// How many recommended tracks are pushed into the provider queue per auto-fill
    pub auto_fill_count: usize,
    /// How many catalog searches are allowed per minute
    pub searches_per_minute: i64,
}

impl EngineConfig {
    /// The cooldown window in milliseconds
    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_minutes * 60_000
    }

    /// How long an admin session lasts
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Long enough to stop queue flooding, short enough to keep a party going
            cooldown_minutes: 5,
            // A single night out
            session_ttl_hours: 12,
            skip_threshold: 5,
            history_size: 10,
            auto_fill_seeds: 5,
            auto_fill_count: 5,
            searches_per_minute: 60,
        }
    }
}
