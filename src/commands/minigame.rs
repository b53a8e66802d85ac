use poise::serenity_prelude as serenity;
use tracing::error;

use crate::models::schedule::IntervalOverride;
use crate::utils::config::colors;
use crate::{Context, Error};

/// Manage the runaway-player mini-game
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("channel", "disable", "interval", "next")
)]
pub async fn minigame(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Enable the mini-game in a channel
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Channel where challenges appear"] channel: serenity::Channel,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    ctx.defer().await?;

    let service = &ctx.data().minigame;
    let channel_id = channel.id();
    if let Err(e) = service.configure_schedule(guild_id, Some(channel_id)).await {
        error!("Failed to enable mini-game for guild {}: {}", guild_id, e);
        ctx.say(format!("❌ Failed to enable the mini-game: {}", e)).await?;
        return Ok(());
    }

    let next = service
        .get_next_spawn_time(guild_id)
        .await
        .map(|at| format!("<t:{}:F>", at.timestamp()))
        .unwrap_or_else(|| "Unknown".to_string());

    let embed = serenity::CreateEmbed::new()
        .title("Mini-game Enabled")
        .description(format!("Runaway players will now appear in <#{}>", channel_id))
        .field("Next appearance", next, false)
        .color(colors::SUCCESS);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Stop the mini-game in this server
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    ctx.defer().await?;

    if let Err(e) = ctx.data().minigame.configure_schedule(guild_id, None).await {
        error!("Failed to disable mini-game for guild {}: {}", guild_id, e);
        ctx.say(format!("❌ Failed to disable the mini-game: {}", e)).await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("Mini-game Disabled")
        .description("No more runaway players will appear in this server.")
        .color(colors::PRIMARY);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Change how many days pass between challenges. Leave both empty to reset.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn interval(
    ctx: Context<'_>,
    #[description = "Minimum days between challenges"] min_days: Option<u32>,
    #[description = "Maximum days between challenges"] max_days: Option<u32>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let interval = match (min_days, max_days) {
        (None, None) => None,
        (Some(min_days), Some(max_days)) => Some(IntervalOverride { min_days, max_days }),
        _ => {
            ctx.say("❌ Give both `min_days` and `max_days`, or neither to reset.")
                .await?;
            return Ok(());
        }
    };

    ctx.defer().await?;
    let service = &ctx.data().minigame;
    let next = match service.set_interval(guild_id, interval).await {
        Ok(next) => next,
        Err(e) => {
            ctx.say(format!("❌ {}", e)).await?;
            return Ok(());
        }
    };

    let config = service.config();
    let (min, max) = interval
        .map(|o| (o.min_days, o.max_days))
        .unwrap_or((config.min_interval_days, config.max_interval_days));

    let embed = serenity::CreateEmbed::new()
        .title("Interval Updated")
        .description(format!("Challenges now appear every **{}-{}** days", min, max))
        .field("Next appearance", format!("<t:{}:F>", next.timestamp()), false)
        .color(colors::SUCCESS);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show when the next runaway player appears
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn next(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let service = &ctx.data().minigame;
    let next = match service.get_next_spawn_time(guild_id).await {
        Some(at) => format!("<t:{0}:F> (<t:{0}:R>)", at.timestamp()),
        None => "Not scheduled. Use `/minigame channel` first.".to_string(),
    };
    let live = if service.has_active_challenge(guild_id) {
        "Yes"
    } else {
        "No"
    };

    let embed = serenity::CreateEmbed::new()
        .title("Mini-game Schedule")
        .field("Next appearance", next, false)
        .field("Challenge running", live, true)
        .color(colors::PRIMARY);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
