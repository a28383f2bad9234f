use eyre::Result;
use rizbot_core::store::{JsonFileStore, ParticipantStore};
use serenity::{
    Client,
    prelude::GatewayIntents,
};
use std::sync::Arc;
use tracing::info;

pub mod commands;
pub mod config;
pub mod handlers;
pub mod permissions;
pub mod pinterest;
pub mod theme;

/// Start the Discord bot with the provided configuration and settings.
///
/// The participant list is kept in the JSON file named by the configuration.
/// This function runs until the bot disconnects or an error occurs.
///
/// # Arguments
///
/// * `config` - The bot configuration containing token, application ID, etc.
/// * `settings` - Staff lists, event roles and Mafia timings
///
/// # Returns
///
/// * `Ok(())` if the bot shut down gracefully
/// * `Err` if an error occurred during initialization or operation
pub async fn start_bot(config: config::BotConfig, settings: config::Settings) -> Result<()> {
    info!("Starting Discord bot");

    let store: Arc<dyn ParticipantStore> = Arc::new(JsonFileStore::new(config.participants_file.clone()));
    let handler = handlers::Handler::new(config.clone(), settings, store)?;

    // Prefixed commands need to read message content
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&config.token, intents)
        .event_handler(handler)
        .await?;

    info!("Connecting to Discord...");
    client.start().await?;

    Ok(())
}
