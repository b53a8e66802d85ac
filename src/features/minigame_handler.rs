// Answer buttons of the runaway-player mini-game

use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::models::challenge::ClaimOutcome;
use crate::{Data, Error};

pub const ANSWER_PREFIX: &str = "minigame_answer_";

/// Button id for answer `index` of the guild's current challenge
pub fn answer_custom_id(community: serenity::GuildId, index: usize) -> String {
    format!("{}{}_{}", ANSWER_PREFIX, community, index)
}

/// Inverse of [`answer_custom_id`]
pub fn parse_answer_id(custom_id: &str) -> Option<(serenity::GuildId, usize)> {
    let rest = custom_id.strip_prefix(ANSWER_PREFIX)?;
    let (guild, index) = rest.split_once('_')?;
    let guild = guild.parse::<u64>().ok().filter(|id| *id != 0)?;
    let index = index.parse::<usize>().ok()?;
    Some((serenity::GuildId::new(guild), index))
}

fn outcome_message(outcome: ClaimOutcome) -> String {
    match outcome {
        ClaimOutcome::Won => "🎉 Correct! You caught the runaway player, check the channel for your card!".to_string(),
        ClaimOutcome::WrongAnswer => "❌ Wrong answer! You only get one try.".to_string(),
        ClaimOutcome::AlreadyAnswered => "⚠️ You already answered this challenge!".to_string(),
        ClaimOutcome::TooLateWinnerExists(winner) => {
            format!("⌛ Too late! <@{}> already caught the player.", winner)
        }
        ClaimOutcome::Closed => "⏰ This challenge is over.".to_string(),
    }
}

/// Handle a click on one of the answer buttons
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some((community, index)) = parse_answer_id(&interaction.data.custom_id) else {
        return Ok(());
    };

    if interaction.guild_id != Some(community) {
        warn!(
            "Answer button for guild {} clicked from {:?}",
            community, interaction.guild_id
        );
        return Ok(());
    }

    // A winning click resolves the whole challenge before returning
    interaction.defer_ephemeral(ctx).await?;

    let outcome = data
        .minigame
        .on_answer_attempt(community, interaction.user.id, index)
        .await;
    debug!(
        "Answer {} from {} in guild {}: {:?}",
        index, interaction.user.id, community, outcome
    );

    interaction
        .create_followup(
            ctx,
            serenity::CreateInteractionResponseFollowup::new()
                .content(outcome_message(outcome))
                .ephemeral(true),
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_id_roundtrip() {
        let guild = serenity::GuildId::new(123456789);
        let id = answer_custom_id(guild, 2);
        assert_eq!(id, "minigame_answer_123456789_2");
        assert_eq!(parse_answer_id(&id), Some((guild, 2)));
    }

    #[test]
    fn test_rejects_foreign_ids() {
        assert_eq!(parse_answer_id("quiz_select"), None);
        assert_eq!(parse_answer_id("minigame_answer_"), None);
        assert_eq!(parse_answer_id("minigame_answer_12"), None);
        assert_eq!(parse_answer_id("minigame_answer_x_1"), None);
        assert_eq!(parse_answer_id("minigame_answer_0_1"), None);
        assert_eq!(parse_answer_id("minigame_answer_12_-1"), None);
    }

    #[test]
    fn test_outcome_messages() {
        let winner = serenity::UserId::new(42);
        assert!(outcome_message(ClaimOutcome::TooLateWinnerExists(winner)).contains("<@42>"));
        assert!(outcome_message(ClaimOutcome::Won).contains("Correct"));
    }
}
