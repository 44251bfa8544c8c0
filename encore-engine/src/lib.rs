mod auth;
mod catalog;
mod config;
mod credentials;
mod keys;
mod playback;
mod provider;
mod queue;
mod skip;
mod spotify;
mod store;
mod util;
mod votes;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use auth::*;
pub use catalog::*;
pub use config::*;
pub use credentials::*;
pub use playback::*;
pub use provider::*;
pub use queue::*;
pub use skip::*;
pub use spotify::*;
pub use store::*;
pub use votes::*;

/// The encore engine, facilitating queue ranking, voting, admin auth,
/// skip votes, and playback orchestration for any number of venues.
pub struct Encore<S, P> {
    pub queue: SongQueue<S, P>,
    pub votes: VoteLedger<S, P>,
    pub cooldown: CooldownGuard<S, P>,
    pub auth: AdminAuth<S, P>,
    pub skip: SkipVotes<S, P>,
    pub playback: Playback<S, P>,
    pub credentials: Credentials<S, P>,
    pub catalog: Catalog<S, P>,
}

/// A type passed to the engine's components, giving them access to the
/// venue store, the playback provider, and the engine configuration.
pub struct EngineContext<S, P> {
    pub store: Arc<S>,
    pub provider: Arc<P>,
    pub config: Arc<EngineConfig>,
}

impl<S, P> Encore<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    pub fn new(store: S, provider: P, config: EngineConfig) -> Self {
        let context = EngineContext {
            store: Arc::new(store),
            provider: Arc::new(provider),
            config: Arc::new(config),
        };

        Self {
            queue: SongQueue::new(&context),
            votes: VoteLedger::new(&context),
            cooldown: CooldownGuard::new(&context),
            auth: AdminAuth::new(&context),
            skip: SkipVotes::new(&context),
            playback: Playback::new(&context),
            credentials: Credentials::new(&context),
            catalog: Catalog::new(&context),
        }
    }
}

impl<S, P> Clone for EngineContext<S, P>
where
    S: VenueStore,
    P: PlaybackProvider,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            provider: self.provider.clone(),
            config: self.config.clone(),
        }
    }
}
