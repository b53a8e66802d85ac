// Fuyard Bot
// Runaway-player mini-game for football card collectors

mod api;
mod commands;
mod features;
mod models;
mod utils;

use std::env;
use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::discord::DiscordPublisher;
use crate::api::packs::PackCatalog;
use crate::api::store::JsonStore;
use crate::features::minigame::{Collaborators, MinigameService};
use crate::utils::config::{self, MinigameConfig};
use crate::utils::random::SharedRng;

/// User data shared across all commands
pub struct Data {
    pub minigame: Arc<MinigameService>,
}

// Manual Debug impl since MinigameService holds trait objects
impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("minigame", &"MinigameService")
            .finish()
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Register all slash commands
fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![commands::minigame::minigame()]
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate {
        interaction: serenity::Interaction::Component(component),
    } = event
    {
        if let Err(e) = features::minigame_handler::handle_interaction(ctx, component, data).await {
            error!("Mini-game interaction error: {:?}", e);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "fuyard=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
    let minigame_config = MinigameConfig::from_env()?;
    let data_dir = config::data_dir();

    info!("Starting Fuyard Bot (data in {})...", data_dir.display());

    // Collaborators of the mini-game engine
    let http = Arc::new(serenity::Http::new(&token));
    let store = Arc::new(JsonStore::open(&data_dir));
    let minigame = MinigameService::new(
        minigame_config.clone(),
        Collaborators {
            store: store.clone(),
            publisher: Arc::new(DiscordPublisher::new(http)),
            inventory: store,
            catalog: Arc::new(PackCatalog::new(&data_dir, &minigame_config.reward_pack)),
            rng: Arc::new(SharedRng::from_os_rng()),
        },
    );
    info!(
        "Mini-game configured: every {}-{} days between {}h and {}h, {}s to answer",
        minigame_config.min_interval_days,
        minigame_config.max_interval_days,
        minigame_config.start_hour,
        minigame_config.end_hour,
        minigame_config.timeout_secs
    );

    // Setup framework
    let setup_minigame = minigame.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: get_commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {:?}", error);
                            let _ = ctx.say(format!("❌ Error: {}", error)).await;
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready! Registering commands...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully!");

                if let Err(e) = setup_minigame.start().await {
                    error!("Failed to resume mini-game schedules: {}", e);
                }

                Ok(Data {
                    minigame: setup_minigame,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS;

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    // Run with graceful shutdown
    let shard_manager = client.shard_manager.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {:?}", e);
            return;
        }
        info!("Shutting down...");
        minigame.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    info!("Goodbye!");
    Ok(())
}
