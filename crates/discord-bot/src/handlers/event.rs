use chrono::Utc;
use eyre::{eyre, Result};
use rizbot_core::{
    errors::BotError,
    models::participants::{ParticipantList, DEFAULT_TEAMS},
    store::{load_non_empty, ListEdit},
};
use serenity::{
    model::{
        application::component::ButtonStyle,
        application::interaction::{
            application_command::ApplicationCommandInteraction,
            message_component::MessageComponentInteraction,
            InteractionResponseType,
        },
        channel::AttachmentType,
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
    },
};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::{
    ensure_permitted, get_option_attachment, get_option_channel, get_option_integer,
    get_option_string, HandlerContext,
};
use crate::theme;

pub const REGISTER_BUTTON: &str = "_register";
const CANCEL_REGISTRATION_PREFIX: &str = "cancel_registration:";
const CONFIRM_OVERWRITE_PREFIX: &str = "confirm_overwrite:";

const LIST_MISSING: &str = "The participant list does not exist.";

/// How long an import or clear confirmation stays valid.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// A list replacement waiting for the requester to confirm it.
#[derive(Debug, Clone)]
pub struct PendingOverwrite {
    list: ParticipantList,
    success_message: &'static str,
    expires_at: Instant,
}

/// Whether this module owns a component custom ID.
pub fn handles(custom_id: &str) -> bool {
    custom_id == REGISTER_BUTTON
        || custom_id.starts_with(CANCEL_REGISTRATION_PREFIX)
        || custom_id.starts_with(CONFIRM_OVERWRITE_PREFIX)
}

/// Handle the /group command
pub async fn handle_group_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    ensure_permitted(ctx.permissions.is_event_team(command.user.id.0))?;

    let teams = get_option_integer(&command.data.options, "teams")
        .map(|t| usize::try_from(t).unwrap_or(0))
        .unwrap_or(DEFAULT_TEAMS);

    let list = load_non_empty(
        ctx.store.as_ref(),
        "The participants list does not exist.",
        "The participants list is empty.",
    )
    .await?;
    let groups = list.divide(teams)?;

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content(format!(
                        "Participants divided into {} groups:\n\n{}",
                        teams,
                        format_groups(&groups)
                    ))
                    .ephemeral(true)
                })
        })
        .await?;

    Ok(())
}

/// Handle the /register-event command
pub async fn handle_register_event_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    ensure_permitted(ctx.permissions.is_event_team(command.user.id.0))?;

    let title = get_option_string(&command.data.options, "title")?;
    let description = get_option_string(&command.data.options, "description")?;
    let channel_id = get_option_channel(&command.data.options, "channel").unwrap_or(command.channel_id);

    channel_id
        .send_message(&ctx.ctx.http, |m| {
            m.embed(|e| {
                e.description(registration_description(&title, &description))
                    .color(theme::TRANSPARENT)
            })
            .components(|c| {
                c.create_action_row(|row| {
                    row.create_button(|b| {
                        b.custom_id(REGISTER_BUTTON)
                            .label("Register")
                            .style(ButtonStyle::Primary)
                    })
                })
            })
        })
        .await?;
    info!("Posted registration for {:?} in channel {}", title, channel_id);

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content("Successfully posted the Event Registration embed!")
                })
        })
        .await?;

    Ok(())
}

/// Handle the /export command
pub async fn handle_export_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    ensure_permitted(ctx.permissions.is_event_team(command.user.id.0))?;

    let list = load_non_empty(
        ctx.store.as_ref(),
        LIST_MISSING,
        "The participant list is empty.",
    )
    .await?;
    let data = list.to_pretty_json()?;

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.add_file(AttachmentType::Bytes {
                        data: Cow::Owned(data),
                        filename: "list.json".to_string(),
                    })
                })
        })
        .await?;

    Ok(())
}

/// Handle the /import command
pub async fn handle_import_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    ensure_permitted(ctx.permissions.is_event_team(command.user.id.0))?;

    let attachment = get_option_attachment(&command.data.options, "file")?;
    if !attachment.filename.ends_with(".json") {
        return Err(BotError::Validation("Please upload a valid JSON file.".to_string()).into());
    }

    let unparsable = || BotError::Validation("Unable to parse the JSON file.".to_string());
    let bytes = attachment.download().await.map_err(|_| unparsable())?;
    let list = ParticipantList::from_json_slice(&bytes).map_err(|_| unparsable())?;

    ask_overwrite(
        &ctx,
        command,
        list,
        "This will erase the current participants list. Do you wish to continue?",
        "Participants list has been imported successfully.",
    )
    .await
}

/// Handle the /clear command
pub async fn handle_clear_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    ensure_permitted(ctx.permissions.is_event_team(command.user.id.0))?;

    load_non_empty(
        ctx.store.as_ref(),
        LIST_MISSING,
        "The participant list is already empty.",
    )
    .await?;

    ask_overwrite(
        &ctx,
        command,
        ParticipantList::new(),
        "This will clear the current participants list. Do you wish to continue?",
        "Participants list has been cleared.",
    )
    .await
}

/// Park a replacement list and ask the requester to confirm it.
async fn ask_overwrite(
    ctx: &HandlerContext,
    command: &ApplicationCommandInteraction,
    list: ParticipantList,
    question: &str,
    success_message: &'static str,
) -> Result<()> {
    let id = Uuid::new_v4();
    {
        let mut pending = ctx.pending_overwrites.write().await;
        let now = Instant::now();
        pending.retain(|_, p| p.expires_at > now);
        pending.insert(
            id,
            PendingOverwrite {
                list,
                success_message,
                expires_at: now + CONFIRMATION_TIMEOUT,
            },
        );
    }

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content(question)
                        .ephemeral(true)
                        .components(|c| {
                            c.create_action_row(|row| {
                                row.create_button(|b| {
                                    b.custom_id(format!("{}{}", CONFIRM_OVERWRITE_PREFIX, id))
                                        .label("Yes, do it")
                                        .style(ButtonStyle::Danger)
                                })
                            })
                        })
                })
        })
        .await?;

    Ok(())
}

/// Handle the registration buttons and confirmations
pub async fn handle_component_interaction(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
) -> Result<()> {
    let custom_id = component.data.custom_id.as_str();

    if custom_id == REGISTER_BUTTON {
        handle_register(ctx, component).await
    } else if let Some(source) = custom_id.strip_prefix(CANCEL_REGISTRATION_PREFIX) {
        handle_cancel_registration(ctx, component, source).await
    } else if let Some(id) = custom_id.strip_prefix(CONFIRM_OVERWRITE_PREFIX) {
        handle_confirm_overwrite(ctx, component, id).await
    } else {
        Ok(())
    }
}

/// Handle the "Register" button
async fn handle_register(ctx: HandlerContext, component: &MessageComponentInteraction) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| eyre!("Registration only works in a server"))?;
    let user_id = component.user.id;

    let user = user_id.to_string();
    let update = ctx
        .store
        .update(Box::new(move |list: &mut ParticipantList| list.register(user)))
        .await?;

    if !update.changed {
        let cancel_id = format!(
            "{}{}:{}",
            CANCEL_REGISTRATION_PREFIX, component.channel_id, component.message.id
        );
        component
            .create_interaction_response(&ctx.ctx.http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|m| {
                        m.content("You've already registered for the event. Do you wish to cancel it?")
                            .ephemeral(true)
                            .components(|c| {
                                c.create_action_row(|row| {
                                    row.create_button(|b| {
                                        b.custom_id(&cancel_id)
                                            .label("Yes, cancel my registration")
                                            .style(ButtonStyle::Danger)
                                    })
                                })
                            })
                    })
            })
            .await?;

        return Ok(());
    }

    info!("User {} registered ({} participants)", user_id, update.list.len());

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content("You have been successfully registered for the event.")
                        .ephemeral(true)
                })
        })
        .await?;

    let title = component
        .message
        .embeds
        .first()
        .and_then(|e| e.description.as_deref())
        .and_then(event_title);

    if let Err(why) = set_participant_role(&ctx, guild_id, user_id, true).await {
        error!("Failed to grant participant role to {}: {:?}", user_id, why);
    }

    let notice = format!(
        "{} <@{}> has registered for the {} event.",
        theme::EVENT,
        user_id,
        title_or_default(title.as_deref())
    );
    if let Err(why) = log_registration(&ctx, notice, theme::TRANSPARENT).await {
        error!("Failed to log registration: {:?}", why);
    }

    Ok(())
}

/// Handle the "Yes, cancel my registration" button
async fn handle_cancel_registration(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    source: &str,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| eyre!("Registration only works in a server"))?;
    let user_id = component.user.id;

    let user = user_id.to_string();
    let update = ctx
        .store
        .update(Box::new(move |list: &mut ParticipantList| list.cancel(&user)))
        .await?;

    let removed = update.changed;
    if removed {
        info!("User {} cancelled registration ({} participants)", user_id, update.list.len());
    }

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|m| {
                    m.content("Your registration has been cancelled.")
                        .components(|c| c)
                })
        })
        .await?;

    if !removed {
        return Ok(());
    }

    if let Err(why) = set_participant_role(&ctx, guild_id, user_id, false).await {
        error!("Failed to remove participant role from {}: {:?}", user_id, why);
    }

    let title = registration_title(&ctx, source).await;
    let notice = format!(
        ":x: <@{}> has cancelled registration for the {} event.",
        user_id,
        title_or_default(title.as_deref())
    );
    if let Err(why) = log_registration(&ctx, notice, theme::CANCELLED).await {
        error!("Failed to log cancellation: {:?}", why);
    }

    Ok(())
}

/// Handle the "Yes, do it" button of /import and /clear
async fn handle_confirm_overwrite(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    id: &str,
) -> Result<()> {
    let pending = match Uuid::parse_str(id) {
        Ok(id) => ctx.pending_overwrites.write().await.remove(&id),
        Err(_) => None,
    }
    .filter(|p| p.expires_at > Instant::now());

    let content = match &pending {
        None => "This confirmation has expired.".to_string(),
        Some(pending) => match ctx.store.update(replace_with(pending.list.clone())).await {
            Ok(_) => pending.success_message.to_string(),
            Err(e) => {
                error!("Failed to overwrite participant list: {:?}", e);
                format!("Failed to update the list. {}", e)
            }
        },
    };

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|m| m.content(&content).components(|c| c))
        })
        .await?;

    if pending.is_some_and(|p| content == p.success_message) {
        info!("User {} overwrote the participant list", component.user.id);
        component
            .channel_id
            .say(
                &ctx.ctx.http,
                format!("<@{}> has overwritten the participant list.", component.user.id),
            )
            .await?;
    }

    Ok(())
}

fn replace_with(replacement: ParticipantList) -> ListEdit {
    Box::new(move |list: &mut ParticipantList| {
        *list = replacement;
        true
    })
}

async fn set_participant_role(
    ctx: &HandlerContext,
    guild_id: GuildId,
    user_id: UserId,
    grant: bool,
) -> Result<()> {
    let role_id = RoleId(ctx.settings.event_settings.participant_role);
    let mut member = guild_id.member(&ctx.ctx, user_id).await?;

    if grant {
        member.add_role(&ctx.ctx.http, role_id).await?;
    } else {
        member.remove_role(&ctx.ctx.http, role_id).await?;
    }

    Ok(())
}

async fn log_registration(ctx: &HandlerContext, notice: String, color: u32) -> Result<()> {
    ChannelId(ctx.settings.event_settings.registration_log)
        .send_message(&ctx.ctx.http, |m| {
            m.embed(|e| e.description(notice).color(color).timestamp(Utc::now()))
        })
        .await?;
    Ok(())
}

/// Read the event title back from the registration post named by `source`
/// (`<channel id>:<message id>`).
async fn registration_title(ctx: &HandlerContext, source: &str) -> Option<String> {
    let (channel, message) = source.split_once(':')?;
    let channel_id = ChannelId(channel.parse().ok()?);
    let message_id = MessageId(message.parse().ok()?);

    let post = channel_id.message(&ctx.ctx.http, message_id).await.ok()?;
    post.embeds
        .first()
        .and_then(|e| e.description.as_deref())
        .and_then(event_title)
}

fn title_or_default(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("**{}**", title),
        None => "upcoming".to_string(),
    }
}

/// Body of the registration embed.
pub fn registration_description(title: &str, description: &str) -> String {
    format!(
        "## {}  Event Registration\n** **\n### __{}__\n** **\n{}\n** **",
        theme::EVENT,
        title,
        description
    )
}

/// Recover the title from a registration embed body.
pub fn event_title(description: &str) -> Option<String> {
    description.lines().find_map(|line| {
        line.strip_prefix("### __")
            .and_then(|rest| rest.strip_suffix("__"))
            .filter(|title| !title.is_empty())
            .map(str::to_string)
    })
}

/// Render teams as `**Team n:**` blocks of mentions.
pub fn format_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let members = group
                .iter()
                .map(|id| format!("<@{}>", id))
                .collect::<Vec<_>>()
                .join("\n");
            format!("**Team {}:**\n{}", i + 1, members)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
