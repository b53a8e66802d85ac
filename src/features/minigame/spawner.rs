// Challenge spawning, expiry and resolution

use std::sync::{Arc, PoisonError};

use dashmap::mapref::entry::Entry;
use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};

use super::reward::{self, RewardDrawResult};
use super::{ActiveChallenge, MinigameError, MinigameService, Notice};
use crate::models::card::Card;
use crate::models::challenge::ChallengeState;

impl MinigameService {
    /// Post a new challenge in the guild's channel and arm its timeout.
    ///
    /// Returns the running challenge, or `None` if nothing was spawned (no
    /// channel configured, a challenge already running, publish failure). In
    /// the `None` case the guild has already been rescheduled.
    pub async fn spawn(
        self: &Arc<Self>,
        community: serenity::GuildId,
    ) -> Option<Arc<ActiveChallenge>> {
        let channel = match self.store.get(community).await {
            Ok(state) => state.and_then(|s| s.target_channel),
            Err(e) => {
                error!("Failed to load schedule for guild {}: {:?}", community, e);
                self.reschedule(community).await;
                return None;
            }
        };

        let Some(channel) = channel else {
            debug!("{}, skipping spawn", MinigameError::NoTargetChannel(community));
            self.reschedule(community).await;
            return None;
        };

        if self.prompts.is_empty() {
            warn!("Prompt bank is empty, skipping spawn for guild {}", community);
            self.reschedule(community).await;
            return None;
        }

        let prompt = self.prompts[self.rng.index(self.prompts.len())];
        let opened_at = self.clock.now();
        let deadline_at = opened_at + chrono::Duration::seconds(self.config.timeout_secs as i64);
        let timeout = self.shutdown.child_token();

        let active = Arc::new(ActiveChallenge::new(ChallengeState::new(
            community,
            channel,
            prompt,
            opened_at,
            deadline_at,
            timeout.clone(),
        )));

        let claimed_slot = match self.active.entry(community) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&active));
                true
            }
        };
        if !claimed_slot {
            warn!("Guild {} already has a running challenge, skipping spawn", community);
            self.reschedule(community).await;
            return None;
        }

        let notice = Notice::Challenge {
            community,
            prompt,
            deadline_at,
        };
        if let Err(e) = self.publisher.publish(channel, notice).await {
            let e = MinigameError::Publish { channel, source: e };
            error!("Spawn aborted for guild {}: {}", community, e);
            timeout.cancel();
            self.release(community, &active);
            self.reschedule(community).await;
            active.finish();
            return None;
        }

        info!(
            "Challenge spawned in guild {} (channel {}), deadline {}",
            community, channel, deadline_at
        );

        let this = Arc::clone(self);
        let timed = Arc::clone(&active);
        let deadline = self.clock.instant_at(deadline_at);
        tokio::spawn(async move {
            tokio::select! {
                _ = timeout.cancelled() => {
                    debug!("Timeout for guild {} cancelled", community);
                }
                _ = tokio::time::sleep_until(deadline) => {
                    this.expire(&timed).await;
                }
            }
        });

        Some(active)
    }

    /// Timeout path. Does nothing if the challenge was resolved in the
    /// meantime, even when the cancellation came too late to stop the timer.
    async fn expire(&self, active: &Arc<ActiveChallenge>) {
        let (community, channel, prompt, attempts) = {
            let mut state = active.state.lock().unwrap_or_else(PoisonError::into_inner);
            if !state.expire() {
                debug!("Timeout fired for guild {} after resolution, ignoring", state.community);
                return;
            }
            (state.community, state.channel, state.prompt, state.respondent_count())
        };

        info!(
            "Challenge in guild {} expired without a winner ({} attempt(s))",
            community, attempts
        );

        if let Err(e) = self.publisher.publish(channel, Notice::Expired { prompt }).await {
            error!("{}", MinigameError::Publish { channel, source: e });
        }

        self.release(community, active);
        self.reschedule(community).await;
        active.finish();
    }

    /// Winner path, called once by the attempt that returned `Won`
    pub(super) async fn resolve(&self, winner: serenity::UserId, active: &Arc<ActiveChallenge>) {
        let (community, channel, prompt, opened_at) = {
            let state = active.state.lock().unwrap_or_else(PoisonError::into_inner);
            (state.community, state.channel, state.prompt, state.opened_at)
        };

        info!(
            "User {} won the challenge in guild {} after {}s",
            winner,
            community,
            (self.clock.now() - opened_at).num_seconds()
        );

        let reward = match self.draw_reward(community).await {
            Ok(draw) => {
                debug!("Drew {} card {} for user {}", draw.category, draw.item.id, winner);
                if let Err(e) = self.inventory.grant(community, winner, &draw.item).await {
                    error!(
                        "Failed to grant card {} to user {} in guild {}: {:?}",
                        draw.item.id, winner, community, e
                    );
                }
                Some(draw.item)
            }
            Err(e) => {
                error!("No reward for user {} in guild {}: {}", winner, community, e);
                None
            }
        };

        let notice = Notice::Winner {
            winner,
            prompt,
            reward,
        };
        if let Err(e) = self.publisher.publish(channel, notice).await {
            error!("{}", MinigameError::Publish { channel, source: e });
        }

        self.release(community, active);
        self.reschedule(community).await;
        active.finish();
    }

    async fn draw_reward(
        &self,
        community: serenity::GuildId,
    ) -> Result<RewardDrawResult<Card>, MinigameError> {
        let pool = self.catalog.pool(community).await?;
        reward::draw(&self.config.drop_rates, &pool, self.rng.as_ref())
    }
}
