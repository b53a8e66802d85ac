// Discord rendering of mini-game notices

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use tracing::warn;

use crate::features::minigame::{ChannelPublisher, Notice};
use crate::features::minigame_handler::answer_custom_id;
use crate::models::card::Card;
use crate::models::challenge::Prompt;
use crate::utils::config::colors;

const ANSWER_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// Posts notices with the bot's HTTP client
pub struct DiscordPublisher {
    http: Arc<serenity::Http>,
    /// Open challenge message per channel, so its buttons can be disabled
    /// once the challenge ends
    open_messages: DashMap<serenity::ChannelId, (serenity::MessageId, serenity::GuildId, Prompt)>,
}

impl DiscordPublisher {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self {
            http,
            open_messages: DashMap::new(),
        }
    }

    /// Disable the answer buttons and highlight the correct one
    async fn close_challenge_message(&self, channel: serenity::ChannelId) {
        let Some((_, (message_id, community, prompt))) = self.open_messages.remove(&channel) else {
            return;
        };

        let edit = serenity::EditMessage::new()
            .components(vec![answer_buttons(community, &prompt, true)]);
        if let Err(e) = channel.edit_message(&self.http, message_id, edit).await {
            // The message may have been deleted by a moderator
            warn!("Failed to close challenge message {}: {:?}", message_id, e);
        }
    }
}

#[async_trait]
impl ChannelPublisher for DiscordPublisher {
    async fn publish(&self, channel: serenity::ChannelId, notice: Notice) -> Result<()> {
        match notice {
            Notice::Challenge {
                community,
                prompt,
                deadline_at,
            } => {
                let embed = serenity::CreateEmbed::new()
                    .title("⚡ A RUNAWAY PLAYER APPEARED!")
                    .description(format!(
                        "A legendary player just showed up! Answer correctly and fast to win an exclusive card!\n\n**❓ {}**",
                        prompt.question
                    ))
                    .color(colors::EVENT)
                    .field("⏱️ Ends", format!("<t:{}:R>", deadline_at.timestamp()), true)
                    .field("🏆 Reward", "Elite/Legend card", true)
                    .footer(serenity::CreateEmbedFooter::new("First correct answer wins!"));

                let message = channel
                    .send_message(
                        &self.http,
                        serenity::CreateMessage::new()
                            .embed(embed)
                            .components(vec![answer_buttons(community, &prompt, false)]),
                    )
                    .await?;
                self.open_messages
                    .insert(channel, (message.id, community, prompt));
            }
            Notice::Winner {
                winner,
                prompt,
                reward,
            } => {
                self.close_challenge_message(channel).await;
                let embed = winner_embed(winner, &prompt, reward.as_ref());
                channel
                    .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
                    .await?;
            }
            Notice::Expired { prompt } => {
                self.close_challenge_message(channel).await;
                let embed = serenity::CreateEmbed::new()
                    .title("⏰ Time's up!")
                    .description(format!(
                        "Nobody found the right answer in time!\n\n**✅ Correct answer:** {}",
                        prompt.correct_answer()
                    ))
                    .color(colors::ERROR);
                channel
                    .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
                    .await?;
            }
        }
        Ok(())
    }
}

fn answer_buttons(
    community: serenity::GuildId,
    prompt: &Prompt,
    closed: bool,
) -> serenity::CreateActionRow {
    let buttons = prompt
        .answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let label = format!("{}. {}", ANSWER_LABELS.get(i).unwrap_or(&"?"), answer);
            let style = match (closed, i == prompt.correct) {
                (false, _) => serenity::ButtonStyle::Primary,
                (true, true) => serenity::ButtonStyle::Success,
                (true, false) => serenity::ButtonStyle::Secondary,
            };
            serenity::CreateButton::new(answer_custom_id(community, i))
                .label(label)
                .style(style)
                .disabled(closed)
        })
        .collect();
    serenity::CreateActionRow::Buttons(buttons)
}

fn winner_embed(winner: serenity::UserId, prompt: &Prompt, reward: Option<&Card>) -> serenity::CreateEmbed {
    let embed = serenity::CreateEmbed::new()
        .title("🎉 WINNER!")
        .color(colors::EVENT)
        .timestamp(serenity::Timestamp::now());

    let Some(card) = reward else {
        return embed.description(format!(
            "**<@{}> caught the runaway player!**\n\nCorrect answer: {}\n\n❌ No card was available in the event pack.",
            winner,
            prompt.correct_answer()
        ));
    };

    let embed = embed
        .description(format!(
            "**<@{}> caught the runaway player!**\n\nCorrect answer: {}\n\n# 🎴 {}",
            winner,
            prompt.correct_answer(),
            card.name
        ))
        .field("🏆 Rarity", format!("{} {}", card.rarity_emoji(), card.rarity), true)
        .field("✨ Type", card.type_label(), true)
        .field("📊 Stats", card.stats_line(), false);

    match card.image_url() {
        Some(url) => embed.image(url),
        None => embed,
    }
}
