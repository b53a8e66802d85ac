//! Runaway-player mini-game engine.
//!
//! Every configured guild gets a scheduling loop that sleeps until a random
//! future instant and then spawns a timed multiple-choice challenge. Answer
//! attempts are arbitrated so exactly one participant wins; the winner gets a
//! card drawn from the reward pack. A challenge nobody wins expires at its
//! deadline. Either way the guild is rescheduled.
//!
//! All mutable state lives in [`MinigameService`]: the arena of active
//! challenges (one slot per guild) and the handles of the scheduling loops.
//! The service is created once at start-up and lives until
//! [`MinigameService::shutdown`].

pub mod arbiter;
pub mod error;
pub mod prompts;
pub mod reward;
pub mod scheduler;
pub mod spawner;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::MinigameError;

use crate::models::card::Card;
use crate::models::challenge::{ChallengeState, ClaimOutcome, Prompt};
use crate::models::schedule::CommunityScheduleState;
use crate::utils::clock::Clock;
use crate::utils::config::MinigameConfig;
use crate::utils::random::RandomSource;

use self::scheduler::LoopHandle;

// ============ Collaborators ============

/// Persistent per-guild schedule state. Must be read-after-write consistent.
#[async_trait]
pub trait PersistedScheduleStore: Send + Sync {
    async fn get(
        &self,
        community: serenity::GuildId,
    ) -> anyhow::Result<Option<CommunityScheduleState>>;

    async fn set(
        &self,
        community: serenity::GuildId,
        state: &CommunityScheduleState,
    ) -> anyhow::Result<()>;

    /// Every guild with stored schedule state
    async fn communities(&self) -> anyhow::Result<Vec<serenity::GuildId>>;
}

/// What gets posted to a guild's mini-game channel
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Challenge {
        community: serenity::GuildId,
        prompt: Prompt,
        deadline_at: DateTime<Utc>,
    },
    Winner {
        winner: serenity::UserId,
        prompt: Prompt,
        reward: Option<Card>,
    },
    Expired {
        prompt: Prompt,
    },
}

#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    async fn publish(&self, channel: serenity::ChannelId, notice: Notice) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RewardInventory: Send + Sync {
    async fn grant(
        &self,
        community: serenity::GuildId,
        participant: serenity::UserId,
        item: &Card,
    ) -> anyhow::Result<()>;
}

/// Source of the cards a guild's winner can receive
#[async_trait]
pub trait RewardCatalog: Send + Sync {
    async fn pool(&self, community: serenity::GuildId) -> anyhow::Result<Vec<Card>>;
}

pub struct Collaborators {
    pub store: Arc<dyn PersistedScheduleStore>,
    pub publisher: Arc<dyn ChannelPublisher>,
    pub inventory: Arc<dyn RewardInventory>,
    pub catalog: Arc<dyn RewardCatalog>,
    pub rng: Arc<dyn RandomSource>,
}

// ============ Active challenges ============

/// Arena entry for one running challenge
pub struct ActiveChallenge {
    pub state: Mutex<ChallengeState>,
    done: watch::Sender<bool>,
}

impl ActiveChallenge {
    fn new(state: ChallengeState) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            state: Mutex::new(state),
            done,
        }
    }

    /// Resolves once the challenge has been finalized (won, expired or abandoned)
    pub async fn finished(&self) {
        let mut rx = self.done.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }

    fn finish(&self) {
        self.done.send_replace(true);
    }
}

// ============ Service ============

pub struct MinigameService {
    config: MinigameConfig,
    store: Arc<dyn PersistedScheduleStore>,
    publisher: Arc<dyn ChannelPublisher>,
    inventory: Arc<dyn RewardInventory>,
    catalog: Arc<dyn RewardCatalog>,
    rng: Arc<dyn RandomSource>,
    clock: Clock,
    prompts: &'static [Prompt],
    /// At most one challenge per guild
    active: DashMap<serenity::GuildId, Arc<ActiveChallenge>>,
    loops: DashMap<serenity::GuildId, LoopHandle>,
    schedule_locks: DashMap<serenity::GuildId, Arc<tokio::sync::Mutex<()>>>,
    shutdown: CancellationToken,
}

impl MinigameService {
    pub fn new(config: MinigameConfig, collaborators: Collaborators) -> Arc<Self> {
        Self::with_prompts(config, collaborators, prompts::PROMPTS)
    }

    pub fn with_prompts(
        config: MinigameConfig,
        collaborators: Collaborators,
        prompts: &'static [Prompt],
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            store: collaborators.store,
            publisher: collaborators.publisher,
            inventory: collaborators.inventory,
            catalog: collaborators.catalog,
            rng: collaborators.rng,
            clock: Clock::new(),
            prompts,
            active: DashMap::new(),
            loops: DashMap::new(),
            schedule_locks: DashMap::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &MinigameConfig {
        &self.config
    }

    /// Submit an answer for the guild's running challenge. A winning attempt
    /// is fully resolved (reward granted, winner announced, guild
    /// rescheduled) before this returns.
    pub async fn on_answer_attempt(
        &self,
        community: serenity::GuildId,
        participant: serenity::UserId,
        chosen_index: usize,
    ) -> ClaimOutcome {
        let active = match self.active.get(&community) {
            Some(entry) => Arc::clone(entry.value()),
            None => return ClaimOutcome::Closed,
        };

        let outcome = arbiter::try_claim(&active.state, participant, chosen_index);
        if outcome == ClaimOutcome::Won {
            self.resolve(participant, &active).await;
        }
        outcome
    }

    pub fn has_active_challenge(&self, community: serenity::GuildId) -> bool {
        self.active.contains_key(&community)
    }

    /// Stop every scheduling loop and pending timeout. Running challenges are
    /// dropped.
    pub async fn shutdown(&self) {
        info!("Shutting down mini-game service...");
        self.shutdown.cancel();

        let communities: Vec<serenity::GuildId> = self.loops.iter().map(|e| *e.key()).collect();
        let tasks: Vec<_> = communities
            .into_iter()
            .filter_map(|community| self.loops.remove(&community))
            .map(|(_, handle)| handle.task)
            .collect();
        futures::future::join_all(tasks).await;

        self.active.clear();
        info!("Mini-game service stopped");
    }

    /// Remove `active` from the arena unless it was already replaced
    fn release(&self, community: serenity::GuildId, active: &Arc<ActiveChallenge>) {
        self.active
            .remove_if(&community, |_, current| Arc::ptr_eq(current, active));
    }

    fn schedule_lock(&self, community: serenity::GuildId) -> Arc<tokio::sync::Mutex<()>> {
        self.schedule_locks
            .entry(community)
            .or_default()
            .value()
            .clone()
    }

    /// Read-modify-write of a guild's schedule state under the guild's lock.
    /// Only writes back when `update` changed something.
    async fn update_schedule<F>(
        &self,
        community: serenity::GuildId,
        update: F,
    ) -> Result<CommunityScheduleState, MinigameError>
    where
        F: FnOnce(&mut CommunityScheduleState),
    {
        let lock = self.schedule_lock(community);
        let _guard = lock.lock().await;

        let current = self.store.get(community).await?;
        let mut state = current
            .clone()
            .unwrap_or_else(|| CommunityScheduleState::new(community));
        update(&mut state);

        if current.as_ref() != Some(&state) {
            self.store.set(community, &state).await?;
        }
        Ok(state)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::api::store::JsonStore;
    use crate::utils::random::SharedRng;
    use std::collections::BTreeMap;

    /// Records every notice; fails every publish while `failing` is set
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub notices: Mutex<Vec<(serenity::ChannelId, Notice)>>,
        pub failing: std::sync::atomic::AtomicBool,
    }

    impl RecordingPublisher {
        pub fn notices(&self) -> Vec<(serenity::ChannelId, Notice)> {
            self.notices.lock().unwrap().clone()
        }

        pub fn challenge_count(&self) -> usize {
            self.notices()
                .iter()
                .filter(|(_, n)| matches!(n, Notice::Challenge { .. }))
                .count()
        }
    }

    #[async_trait]
    impl ChannelPublisher for RecordingPublisher {
        async fn publish(&self, channel: serenity::ChannelId, notice: Notice) -> anyhow::Result<()> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                anyhow::bail!("Unknown Channel");
            }
            self.notices.lock().unwrap().push((channel, notice));
            Ok(())
        }
    }

    pub struct StaticCatalog(pub Vec<Card>);

    #[async_trait]
    impl RewardCatalog for StaticCatalog {
        async fn pool(&self, _community: serenity::GuildId) -> anyhow::Result<Vec<Card>> {
            Ok(self.0.clone())
        }
    }

    pub fn card(id: &str, rarity: &str) -> Card {
        Card {
            id: id.to_string(),
            name: id.to_string(),
            rarity: rarity.to_string(),
            kind: Some("joueur".to_string()),
            position: None,
            stats: BTreeMap::new(),
            image: None,
        }
    }

    pub struct Harness {
        pub service: Arc<MinigameService>,
        pub store: Arc<JsonStore>,
        pub publisher: Arc<RecordingPublisher>,
    }

    pub fn harness(pool: Vec<Card>) -> Harness {
        harness_with(MinigameConfig::default(), pool)
    }

    pub fn harness_with(config: MinigameConfig, pool: Vec<Card>) -> Harness {
        let store = Arc::new(JsonStore::in_memory());
        let publisher = Arc::new(RecordingPublisher::default());
        let service = MinigameService::new(
            config,
            Collaborators {
                store: store.clone(),
                publisher: publisher.clone(),
                inventory: store.clone(),
                catalog: Arc::new(StaticCatalog(pool)),
                rng: Arc::new(SharedRng::seeded(7)),
            },
        );
        Harness {
            service,
            store,
            publisher,
        }
    }

    impl MinigameService {
        pub fn active_prompt(&self, community: serenity::GuildId) -> Option<Prompt> {
            let active = self.active.get(&community)?;
            let state = active.state.lock().unwrap();
            Some(state.prompt)
        }
    }
}
