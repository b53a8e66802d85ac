// Per-guild spawn scheduling

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, FixedOffset, Offset, Utc};
use poise::serenity_prelude as serenity;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{MinigameError, MinigameService};
use crate::models::schedule::{CommunityScheduleState, IntervalOverride};
use crate::utils::config::{validate_interval, MinigameConfig};
use crate::utils::random::RandomSource;

/// Back-off when the store cannot produce a spawn instant
const RETRY_DELAY: Duration = Duration::from_secs(60);

pub(super) struct LoopHandle {
    recompute: Arc<Notify>,
    cancel: CancellationToken,
    pub(super) task: JoinHandle<()>,
}

/// Pick the next spawn instant: a whole number of days in
/// `[min_days, max_days]` after `now`, at a random hh:mm:00 inside the
/// configured hour window (evaluated at the configured UTC offset).
pub fn compute_next_spawn(
    now: DateTime<Utc>,
    min_days: u32,
    max_days: u32,
    config: &MinigameConfig,
    rng: &dyn RandomSource,
) -> DateTime<Utc> {
    let days = rng.range_inclusive(min_days, max_days);
    let hour = rng.range_inclusive(config.start_hour, config.end_hour.saturating_sub(1));
    let minute = rng.range_inclusive(0, 59);

    let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    let local_now = now.with_timezone(&offset);
    let date = local_now
        .date_naive()
        .checked_add_days(Days::new(days as u64))
        .unwrap_or_else(|| local_now.date_naive());

    let local = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN));
    let at = (local - chrono::Duration::seconds(offset.local_minus_utc() as i64)).and_utc();

    // Only reachable with a zero-day interval
    if at <= now {
        at + chrono::Duration::days(1)
    } else {
        at
    }
}

impl MinigameService {
    fn interval_for(&self, state: &CommunityScheduleState) -> (u32, u32) {
        match state.interval_days {
            Some(o) => (o.min_days, o.max_days),
            None => (self.config.min_interval_days, self.config.max_interval_days),
        }
    }

    fn fresh_spawn_time(&self, state: &CommunityScheduleState) -> DateTime<Utc> {
        let (min_days, max_days) = self.interval_for(state);
        compute_next_spawn(
            self.clock.now(),
            min_days,
            max_days,
            &self.config,
            self.rng.as_ref(),
        )
    }

    /// The stored spawn instant if it is still ahead, otherwise a freshly
    /// computed and persisted one
    pub async fn next_spawn_at(
        &self,
        community: serenity::GuildId,
    ) -> Result<DateTime<Utc>, MinigameError> {
        let now = self.clock.now();
        let mut next = None;
        self.update_schedule(community, |state| {
            let at = match state.pending_spawn(now) {
                Some(at) => at,
                None => self.fresh_spawn_time(state),
            };
            state.next_spawn_at = Some(at);
            next = Some(at);
        })
        .await?;
        Ok(next.unwrap_or(now))
    }

    pub async fn get_next_spawn_time(&self, community: serenity::GuildId) -> Option<DateTime<Utc>> {
        match self.store.get(community).await {
            Ok(state) => state.and_then(|s| s.next_spawn_at),
            Err(e) => {
                error!("Failed to load schedule for guild {}: {:?}", community, e);
                None
            }
        }
    }

    /// Called after every spawn attempt, successful or not. Never fails: a
    /// store error is logged and the loop retries later.
    pub(super) async fn reschedule(&self, community: serenity::GuildId) {
        let now = self.clock.now();
        let result = self
            .update_schedule(community, |state| {
                state.next_spawn_at = Some(self.fresh_spawn_time(state));
                state.last_spawn_at = Some(now);
            })
            .await;

        match result {
            Ok(state) => info!(
                "Next challenge for guild {} at {}",
                community,
                state.next_spawn_at.map(|at| at.to_rfc3339()).unwrap_or_default()
            ),
            Err(e) => error!("Failed to reschedule guild {}: {}", community, e),
        }
    }

    /// Throw away the pending spawn instant and pick a new one. Wakes the
    /// guild's loop so it waits for the new instant instead; a challenge
    /// that is already running is left alone.
    pub async fn force_recompute(
        &self,
        community: serenity::GuildId,
    ) -> Result<DateTime<Utc>, MinigameError> {
        let state = self
            .update_schedule(community, |state| {
                state.next_spawn_at = Some(self.fresh_spawn_time(state));
            })
            .await?;

        if let Some(handle) = self.loops.get(&community) {
            handle.recompute.notify_one();
        }

        let next = state.next_spawn_at.unwrap_or_else(|| self.clock.now());
        info!("Recomputed next challenge for guild {}: {}", community, next);
        Ok(next)
    }

    /// Set or clear the guild's challenge channel. Clearing stops the loop
    /// but keeps the rest of the stored state.
    pub async fn configure_schedule(
        self: &Arc<Self>,
        community: serenity::GuildId,
        channel: Option<serenity::ChannelId>,
    ) -> Result<(), MinigameError> {
        self.update_schedule(community, |state| state.target_channel = channel)
            .await?;

        match channel {
            Some(channel) => {
                let next = self.next_spawn_at(community).await?;
                info!(
                    "Mini-game enabled for guild {} in channel {}, next at {}",
                    community, channel, next
                );
                self.ensure_loop(community);
            }
            None => {
                info!("Mini-game disabled for guild {}", community);
                self.stop_loop(community);
            }
        }
        Ok(())
    }

    /// Override (or with `None`, reset) the guild's spawn interval and
    /// recompute the pending instant
    pub async fn set_interval(
        &self,
        community: serenity::GuildId,
        interval: Option<IntervalOverride>,
    ) -> Result<DateTime<Utc>, MinigameError> {
        if let Some(o) = interval {
            validate_interval(o.min_days, o.max_days)?;
        }
        self.update_schedule(community, |state| state.interval_days = interval)
            .await?;
        self.force_recompute(community).await
    }

    /// Resume a loop for every stored guild that has a channel
    pub async fn start(self: &Arc<Self>) -> Result<usize, MinigameError> {
        let mut started = 0;
        for community in self.store.communities().await? {
            match self.store.get(community).await {
                Ok(Some(state)) if state.target_channel.is_some() => {
                    self.ensure_loop(community);
                    started += 1;
                }
                Ok(_) => {}
                Err(e) => error!("Failed to load schedule for guild {}: {:?}", community, e),
            }
        }
        info!("Resumed {} mini-game schedule(s)", started);
        Ok(started)
    }

    fn ensure_loop(self: &Arc<Self>, community: serenity::GuildId) {
        if self.shutdown.is_cancelled() {
            return;
        }
        if let Some(handle) = self.loops.get(&community) {
            if !handle.task.is_finished() {
                return;
            }
        }

        let recompute = Arc::new(Notify::new());
        let cancel = self.shutdown.child_token();
        let task = tokio::spawn(Arc::clone(self).run_loop(
            community,
            Arc::clone(&recompute),
            cancel.clone(),
        ));

        if let Some(previous) = self.loops.insert(
            community,
            LoopHandle {
                recompute,
                cancel,
                task,
            },
        ) {
            previous.cancel.cancel();
        }
    }

    fn stop_loop(&self, community: serenity::GuildId) {
        if let Some((_, handle)) = self.loops.remove(&community) {
            handle.cancel.cancel();
        }
    }

    /// Wait for the spawn instant, spawn, wait for the challenge to finish,
    /// repeat. Ends when the channel is cleared or the service shuts down.
    async fn run_loop(
        self: Arc<Self>,
        community: serenity::GuildId,
        recompute: Arc<Notify>,
        cancel: CancellationToken,
    ) {
        debug!("Scheduling loop started for guild {}", community);

        loop {
            match self.store.get(community).await {
                Ok(Some(state)) if state.target_channel.is_some() => {}
                Ok(_) => break,
                Err(e) => {
                    error!("Failed to load schedule for guild {}: {:?}", community, e);
                    if sleep_or_cancel(&cancel, RETRY_DELAY).await {
                        break;
                    }
                    continue;
                }
            }

            let next = match self.next_spawn_at(community).await {
                Ok(at) => at,
                Err(e) => {
                    error!("Failed to compute next spawn for guild {}: {}", community, e);
                    if sleep_or_cancel(&cancel, RETRY_DELAY).await {
                        break;
                    }
                    continue;
                }
            };

            debug!("Guild {} waiting until {}", community, next);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = recompute.notified() => {
                    debug!("Wait for guild {} interrupted by recompute", community);
                    continue;
                }
                _ = tokio::time::sleep_until(self.clock.instant_at(next)) => {}
            }

            // The instant may have been moved while we slept
            if let Some(at) = self.get_next_spawn_time(community).await {
                if at > self.clock.now() {
                    continue;
                }
            }

            if let Some(active) = self.spawn(community).await {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = active.finished() => {}
                }
            }
        }

        debug!("Scheduling loop stopped for guild {}", community);
    }
}

/// True if cancelled before the delay elapsed
async fn sleep_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}
