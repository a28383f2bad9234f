use eyre::{eyre, Result};
use rizbot_core::{errors::BotError, registry::GameRegistry, store::ParticipantStore};
use serenity::{
    async_trait,
    model::{
        application::interaction::{
            application_command::{CommandDataOption, CommandDataOptionValue},
            Interaction,
            InteractionResponseType,
        },
        channel::{Attachment, Message},
        gateway::Ready,
        id::ChannelId,
    },
    prelude::*,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

pub mod event;
pub mod mafia;
pub mod pinterest;

use crate::config::{BotConfig, Settings};
use crate::permissions::{Permissions, DENIED};
use crate::pinterest::PinterestClient;

/// Main Discord handler that processes all events.
///
/// This handler is responsible for responding to Discord events like
/// ready events, slash commands, component interactions and prefixed
/// messages. It owns the state those handlers share.
pub struct Handler {
    config: BotConfig,
    settings: Arc<Settings>,
    permissions: Arc<Permissions>,
    games: GameRegistry,
    store: Arc<dyn ParticipantStore>,
    pending_overwrites: Arc<RwLock<HashMap<Uuid, event::PendingOverwrite>>>,
    pinterest: PinterestClient,
}

impl Handler {
    /// Create a new handler
    pub fn new(
        config: BotConfig,
        settings: Settings,
        store: Arc<dyn ParticipantStore>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            permissions: Arc::new(Permissions::from_settings(&settings)),
            settings: Arc::new(settings),
            games: GameRegistry::new(),
            store,
            pending_overwrites: Arc::new(RwLock::new(HashMap::new())),
            pinterest: PinterestClient::new()?,
        })
    }

    fn context(&self, ctx: &Context) -> HandlerContext {
        HandlerContext {
            ctx: ctx.clone(),
            config: self.config.clone(),
            settings: self.settings.clone(),
            permissions: self.permissions.clone(),
            games: self.games.clone(),
            store: self.store.clone(),
            pending_overwrites: self.pending_overwrites.clone(),
            pinterest: self.pinterest.clone(),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    /// Handle ready events (when bot connects to Discord)
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        // Guild commands show up immediately, so register there too during development
        if let Some(test_guild_id) = self.config.test_guild_id {
            let guild_id = serenity::model::id::GuildId(test_guild_id);

            match guild_id
                .set_application_commands(&ctx.http, |commands| {
                    crate::commands::register_commands(commands)
                })
                .await
            {
                Ok(cmds) => {
                    info!("Guild commands registered successfully for {}! Total commands: {}", test_guild_id, cmds.len());
                }
                Err(why) => {
                    error!("Error registering guild commands: {:?}", why);
                }
            }
        }

        match serenity::model::application::command::Command::set_global_application_commands(&ctx.http, |commands| {
            crate::commands::register_commands(commands)
        })
        .await
        {
            Ok(cmds) => {
                info!("Global commands registered successfully! Total commands: {}", cmds.len());
                for cmd in cmds {
                    info!("Command registered: /{} - {}", cmd.name, cmd.description);
                }
            }
            Err(why) => {
                error!("Error registering global commands: {:?}", why);
            }
        }
    }

    /// Handle prefixed message commands
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = pinterest::handle_message(self.context(&ctx), &msg).await {
            error!("Error handling message command: {:?}", e);
        }
    }

    /// Handle interactions (slash commands, buttons, select menus)
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                info!("Received command: {}", command.data.name);

                let handler_ctx = self.context(&ctx);

                let result = match command.data.name.as_str() {
                    "group" => event::handle_group_command(handler_ctx, &command).await,
                    "register-event" => event::handle_register_event_command(handler_ctx, &command).await,
                    "export" => event::handle_export_command(handler_ctx, &command).await,
                    "import" => event::handle_import_command(handler_ctx, &command).await,
                    "clear" => event::handle_clear_command(handler_ctx, &command).await,
                    "mafia" => mafia::handle_mafia_command(handler_ctx, &command).await,
                    _ => {
                        error!("Unknown command: {}", command.data.name);
                        Err(eyre!("Unknown command"))
                    }
                };

                if let Err(e) = result {
                    log_failure(&command.data.name, &e);

                    if let Err(why) = command
                        .create_interaction_response(&ctx.http, |r| {
                            r.kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|m| m.content(error_text(&e)).ephemeral(true))
                        })
                        .await
                    {
                        error!("Failed to send error response: {:?}", why);
                    }
                }
            }
            Interaction::MessageComponent(component) => {
                let custom_id = component.data.custom_id.as_str();
                info!("Received component interaction: {}", custom_id);

                let handler_ctx = self.context(&ctx);

                let result = if mafia::handles(custom_id) {
                    mafia::handle_component_interaction(handler_ctx, &component).await
                } else if event::handles(custom_id) {
                    event::handle_component_interaction(handler_ctx, &component).await
                } else {
                    Ok(())
                };

                if let Err(e) = result {
                    log_failure(custom_id, &e);

                    if let Err(why) = component
                        .create_interaction_response(&ctx.http, |r| {
                            r.kind(InteractionResponseType::ChannelMessageWithSource)
                                .interaction_response_data(|m| m.content(error_text(&e)).ephemeral(true))
                        })
                        .await
                    {
                        error!("Failed to send error response: {:?}", why);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Shared context for command handlers.
///
/// This struct provides a convenient way to pass the Discord context,
/// configuration and shared bot state to command handlers.
pub struct HandlerContext {
    pub ctx: Context,
    pub config: BotConfig,
    pub settings: Arc<Settings>,
    pub permissions: Arc<Permissions>,
    pub games: GameRegistry,
    pub store: Arc<dyn ParticipantStore>,
    pub pending_overwrites: Arc<RwLock<HashMap<Uuid, event::PendingOverwrite>>>,
    pub pinterest: PinterestClient,
}

/// Text shown to the user when a handler fails.
pub fn error_text(e: &eyre::Report) -> String {
    match e.downcast_ref::<BotError>().and_then(BotError::user_message) {
        Some(message) => message.to_string(),
        None => format!("Error: {}", e),
    }
}

fn log_failure(source: &str, e: &eyre::Report) {
    match e.downcast_ref::<BotError>().and_then(BotError::user_message) {
        Some(message) => info!("{} refused: {}", source, message),
        None => error!("Error handling {}: {:?}", source, e),
    }
}

/// Fail with the standard permission message unless `allowed`.
pub(crate) fn ensure_permitted(allowed: bool) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(BotError::Permission(DENIED.to_string()).into())
    }
}

/// Extract a string option from a command
pub(crate) fn get_option_string(options: &[CommandDataOption], name: &str) -> Result<String> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| eyre!("Missing {} parameter", name))
}

/// Extract an optional integer option from a command
pub(crate) fn get_option_integer(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_ref())
        .and_then(|val| val.as_i64())
}

/// Extract an optional channel option from a command
pub(crate) fn get_option_channel(options: &[CommandDataOption], name: &str) -> Option<ChannelId> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| match &opt.resolved {
            Some(CommandDataOptionValue::Channel(channel)) => Some(channel.id),
            _ => None,
        })
}

/// Extract an attachment option from a command
pub(crate) fn get_option_attachment(options: &[CommandDataOption], name: &str) -> Result<Attachment> {
    options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| match &opt.resolved {
            Some(CommandDataOptionValue::Attachment(attachment)) => Some(attachment.clone()),
            _ => None,
        })
        .ok_or_else(|| eyre!("Missing {} parameter", name))
}
