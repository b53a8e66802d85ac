// Per-guild schedule data model
// Stored in the `minigame` collection, keyed by guild id

use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};

/// Guild-specific override of the spawn interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntervalOverride {
    pub min_days: u32,
    pub max_days: u32,
}

/// Scheduling state of one guild
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityScheduleState {
    pub community_id: serenity::GuildId,
    #[serde(default)]
    pub next_spawn_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_spawn_at: Option<DateTime<Utc>>,
    /// Channel the challenge is posted in; `None` disables spawning
    #[serde(default)]
    pub target_channel: Option<serenity::ChannelId>,
    #[serde(default)]
    pub interval_days: Option<IntervalOverride>,
}

impl CommunityScheduleState {
    pub fn new(community_id: serenity::GuildId) -> Self {
        Self {
            community_id,
            next_spawn_at: None,
            last_spawn_at: None,
            target_channel: None,
            interval_days: None,
        }
    }

    /// The stored spawn instant, if it has not been reached yet
    pub fn pending_spawn(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_spawn_at.filter(|at| *at > now)
    }
}
