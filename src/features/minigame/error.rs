use poise::serenity_prelude as serenity;

/// Failures inside the mini-game engine. None of them stops a guild's
/// schedule from advancing.
#[derive(Debug, thiserror::Error)]
pub enum MinigameError {
    #[error("no target channel configured for guild {0}")]
    NoTargetChannel(serenity::GuildId),

    #[error("failed to publish to channel {channel}: {source}")]
    Publish {
        channel: serenity::ChannelId,
        #[source]
        source: anyhow::Error,
    },

    #[error("reward pool is empty")]
    EmptyRewardPool,

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
