use async_trait::async_trait;
use eyre::{eyre, Result};
use rizbot_core::{
    errors::{BotError, BotResult},
    models::mafia::{GameSummary, MafiaGame, NightOutcome, Role, VoteOutcome},
    registry::GameRegistry,
    rounds::{run_rounds, MafiaTable},
};
use serenity::{
    builder::{CreateComponents, CreateEmbed},
    client::Context,
    model::{
        application::component::ButtonStyle,
        application::interaction::{
            application_command::ApplicationCommandInteraction,
            message_component::MessageComponentInteraction,
            InteractionResponseType,
        },
        channel::{Message, ReactionType},
        id::{ChannelId, GuildId, MessageId, RoleId, UserId},
    },
    utils::Colour,
};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::handlers::{get_option_integer, HandlerContext};
use crate::theme;

pub const GHOST_ROLE: &str = "Ghost";

const JOIN_BUTTON: &str = "joinbtn";
const START_BUTTON: &str = "startbtn";
const EXIT_BUTTON: &str = "exitbtn";
const VIEW_ROLE_BUTTON: &str = "viewrolebtn";
const VOTE_SELECT: &str = "mafia_vote";
const KILL_SELECT: &str = "mafia_kill";


/// Whether this module owns a component custom ID.
pub fn handles(custom_id: &str) -> bool {
    matches!(
        custom_id,
        JOIN_BUTTON | START_BUTTON | EXIT_BUTTON | VIEW_ROLE_BUTTON | VOTE_SELECT | KILL_SELECT
    )
}

/// Handle the /mafia command
pub async fn handle_mafia_command(
    ctx: HandlerContext,
    command: &ApplicationCommandInteraction,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| BotError::Validation("Mafia can only be played in a server.".to_string()))?;
    let murderers = get_option_integer(&command.data.options, "murderers")
        .ok_or_else(|| eyre!("Missing murderers parameter"))?;

    ensure_ghost_role(&ctx.ctx, guild_id).await?;

    let host = command.user.id;
    let game = MafiaGame::new(host.0, usize::try_from(murderers).unwrap_or(0), command.channel_id.0)?;
    ctx.games.create(guild_id.0, game).await?;

    let footer = format!("Hosted by {}", command.user.name);
    let setup = command
        .channel_id
        .send_message(&ctx.ctx.http, |m| {
            m.embed(|e| lobby_embed(e, &[host.0], &footer))
                .components(lobby_components)
        })
        .await;

    let setup = match setup {
        Ok(message) => message,
        Err(why) => {
            ctx.games.remove(guild_id.0).await;
            return Err(why.into());
        }
    };

    ctx.games
        .update(guild_id.0, |game| {
            game.setup_message_id = Some(setup.id.0);
            Ok(())
        })
        .await?;
    info!("Mafia lobby opened in guild {} by {}", guild_id, host);

    command
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content("Game created! Waiting for others to join.").ephemeral(true)
                })
        })
        .await?;

    Ok(())
}

/// Handle lobby buttons, role reveals and phase selections
pub async fn handle_component_interaction(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
) -> Result<()> {
    let guild_id = component
        .guild_id
        .ok_or_else(|| eyre!("Mafia components only work in a server"))?;

    match component.data.custom_id.as_str() {
        JOIN_BUTTON => handle_join(ctx, component, guild_id).await,
        START_BUTTON => handle_start(ctx, component, guild_id).await,
        EXIT_BUTTON => handle_exit(ctx, component, guild_id).await,
        VIEW_ROLE_BUTTON => handle_view_role(ctx, component, guild_id).await,
        VOTE_SELECT => handle_vote(ctx, component, guild_id).await,
        KILL_SELECT => handle_kill(ctx, component, guild_id).await,
        _ => Ok(()),
    }
}

/// Handle the "Join" button
async fn handle_join(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let user_id = component.user.id;
    let players = ctx
        .games
        .update(guild_id.0, |game| {
            game.join(user_id.0)?;
            Ok(game.players().to_vec())
        })
        .await?;

    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| {
                    m.content(format!("<@{}> joined the game!", user_id)).ephemeral(true)
                })
        })
        .await?;

    let footer = component
        .message
        .embeds
        .first()
        .and_then(|e| e.footer.as_ref())
        .map(|f| f.text.clone())
        .unwrap_or_default();

    component
        .channel_id
        .edit_message(&ctx.ctx.http, component.message.id, |m| {
            m.embed(|e| lobby_embed(e, &players, &footer))
        })
        .await?;

    Ok(())
}

/// Handle the "Start" button
async fn handle_start(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let user_id = component.user.id;
    let players = ctx
        .games
        .update(guild_id.0, |game| {
            game.start(user_id.0, &mut rand::thread_rng())?;
            Ok(game.players().to_vec())
        })
        .await?;
    info!("Mafia game started in guild {} with {} players", guild_id, players.len());

    let game_msg = match open_game(&ctx, component, &players).await {
        Ok(message) => message,
        Err(e) => {
            ctx.games.remove(guild_id.0).await;
            return Err(e);
        }
    };

    ctx.games
        .update(guild_id.0, |game| {
            game.game_message_id = Some(game_msg.id.0);
            Ok(())
        })
        .await?;

    Ok(())
}

/// Replace the lobby with the started game's message.
async fn open_game(
    ctx: &HandlerContext,
    component: &MessageComponentInteraction,
    players: &[u64],
) -> Result<Message> {
    component
        .create_interaction_response(&ctx.ctx.http, |r| r.kind(InteractionResponseType::DeferredUpdateMessage))
        .await?;

    component
        .channel_id
        .delete_message(&ctx.ctx.http, component.message.id)
        .await?;

    let roster: Vec<(u64, bool)> = players.iter().map(|id| (*id, false)).collect();
    let game_msg = component
        .channel_id
        .send_message(&ctx.ctx.http, |m| {
            m.embed(|e| game_embed(e, &roster)).components(|c| {
                c.create_action_row(|row| {
                    row.create_button(|b| {
                        b.custom_id(VIEW_ROLE_BUTTON)
                            .label("View Role")
                            .style(ButtonStyle::Success)
                    })
                })
            })
        })
        .await?;

    Ok(game_msg)
}

/// Handle the dismiss button of the lobby
async fn handle_exit(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let user_id = component.user.id;
    let is_staff = component
        .member
        .as_ref()
        .is_some_and(|member| ctx.permissions.is_staff(member.roles.iter().map(|role| role.0)));

    let game = ctx
        .games
        .remove_if(guild_id.0, |game| game.dismiss(user_id.0, is_staff))
        .await?;
    info!("Mafia lobby in guild {} dismissed by {}", guild_id, user_id);

    component
        .create_interaction_response(&ctx.ctx.http, |r| r.kind(InteractionResponseType::DeferredUpdateMessage))
        .await?;

    let setup_id = game.setup_message_id.unwrap_or(component.message.id.0);
    component
        .channel_id
        .delete_message(&ctx.ctx.http, MessageId(setup_id))
        .await?;

    Ok(())
}

/// Handle the "View Role" button
async fn handle_view_role(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let user_id = component.user.id;
    let (role, roster, reveal_done) = ctx
        .games
        .update(guild_id.0, |game| {
            let role = game.view_role(user_id.0)?;
            let roster: Vec<(u64, bool)> = game
                .players()
                .iter()
                .map(|id| (*id, game.has_viewed_role(*id)))
                .collect();
            Ok((role, roster, game.finish_reveal()))
        })
        .await?;

    let shown = show_role(&ctx, component, role, &roster, reveal_done).await;

    // Rounds start whether or not the reply went through.
    if reveal_done {
        spawn_rounds(&ctx, guild_id, component.channel_id);
    }

    shown
}

async fn show_role(
    ctx: &HandlerContext,
    component: &MessageComponentInteraction,
    role: Role,
    roster: &[(u64, bool)],
    reveal_done: bool,
) -> Result<()> {
    component
        .create_interaction_response(&ctx.ctx.http, |r| {
            r.kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|m| m.content(role.briefing()).ephemeral(true))
        })
        .await?;

    component
        .channel_id
        .edit_message(&ctx.ctx.http, component.message.id, |m| {
            m.embed(|e| game_embed(e, roster));
            if reveal_done {
                m.components(|c| c);
            }
            m
        })
        .await?;

    Ok(())
}

/// Handle a selection in the voting menu
async fn handle_vote(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let target = selected_user(component)?;
    ctx.games
        .update(guild_id.0, |game| game.cast_vote(component.user.id.0, target))
        .await?;

    component
        .create_interaction_response(&ctx.ctx.http, |r| r.kind(InteractionResponseType::DeferredUpdateMessage))
        .await?;

    Ok(())
}

/// Handle a selection in the night menu
async fn handle_kill(
    ctx: HandlerContext,
    component: &MessageComponentInteraction,
    guild_id: GuildId,
) -> Result<()> {
    let target = selected_user(component)?;
    ctx.games
        .update(guild_id.0, |game| game.choose_target(component.user.id.0, target))
        .await?;

    component
        .create_interaction_response(&ctx.ctx.http, |r| r.kind(InteractionResponseType::DeferredUpdateMessage))
        .await?;

    Ok(())
}

fn selected_user(component: &MessageComponentInteraction) -> Result<u64> {
    component
        .data
        .values
        .first()
        .and_then(|value| value.parse::<u64>().ok())
        .ok_or_else(|| eyre!("Missing selection"))
}

/// Run the rounds in the background once every player has seen their role.
fn spawn_rounds(ctx: &HandlerContext, guild_id: GuildId, channel_id: ChannelId) {
    let discord = ctx.ctx.clone();
    let games = ctx.games.clone();
    let timings = ctx.settings.mafia;

    tokio::spawn(async move {
        let ghost_role = match ensure_ghost_role(&discord, guild_id).await {
            Ok(role) => role,
            Err(e) => {
                error!("Mafia game in guild {} could not start: {:?}", guild_id, e);
                games.remove(guild_id.0).await;
                announce_interrupted(&discord, channel_id).await;
                return;
            }
        };
        let table = DiscordTable {
            ctx: discord,
            guild_id,
            channel_id,
            ghost_role,
        };

        match run_rounds(&table, &games, guild_id.0, timings).await {
            Ok(winner) => info!("Mafia game in guild {} finished: {} win", guild_id, winner),
            Err(e) => {
                error!("Mafia game in guild {} aborted: {:?}", guild_id, e);
                abandon_game(&table, &games).await;
            }
        }
    });
}

/// Drop a game whose round loop failed and undo its ghost roles.
async fn abandon_game(table: &DiscordTable, games: &GameRegistry) {
    if let Some(game) = games.remove(table.guild_id.0).await {
        table.restore_roles(game.players()).await;
    }
    announce_interrupted(&table.ctx, table.channel_id).await;
}

async fn announce_interrupted(ctx: &Context, channel_id: ChannelId) {
    if let Err(why) = channel_id
        .send_message(&ctx.http, |m| {
            m.embed(|e| {
                e.description(format!("{} The game was interrupted.", theme::ERROR))
                    .color(theme::VERDICT)
            })
        })
        .await
    {
        error!("Failed to announce interrupted game: {:?}", why);
    }
}

/// Find the guild's Ghost role, creating it if needed.
pub async fn ensure_ghost_role(ctx: &Context, guild_id: GuildId) -> Result<RoleId> {
    let roles = guild_id.roles(&ctx.http).await?;
    if let Some(role) = roles.values().find(|role| role.name == GHOST_ROLE) {
        return Ok(role.id);
    }

    let role = guild_id
        .create_role(&ctx.http, |r| r.name(GHOST_ROLE).colour(Colour::DARK_GREY.0 as u64))
        .await?;
    info!("Created {} role in guild {}", GHOST_ROLE, guild_id);
    Ok(role.id)
}

/// The channel a Mafia game is played in.
struct DiscordTable {
    ctx: Context,
    guild_id: GuildId,
    channel_id: ChannelId,
    ghost_role: RoleId,
}

impl DiscordTable {
    async fn display_names(&self, user_ids: &[u64]) -> Vec<(u64, String)> {
        let mut names = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            let name = match self.guild_id.member(&self.ctx, UserId(*id)).await {
                Ok(member) => member.display_name().to_string(),
                Err(why) => {
                    warn!("Could not look up member {}: {:?}", id, why);
                    format!("Player {}", id)
                }
            };
            names.push((*id, name));
        }
        names
    }

    async fn send_embed(&self, f: impl FnOnce(&mut CreateEmbed) -> &mut CreateEmbed) -> BotResult<()> {
        self.channel_id
            .send_message(&self.ctx.http, |m| m.embed(f))
            .await
            .map_err(discord_error)?;
        Ok(())
    }

    async fn send_select(
        &self,
        custom_id: &str,
        placeholder: &str,
        candidates: &[u64],
        f: impl FnOnce(&mut CreateEmbed) -> &mut CreateEmbed,
    ) -> BotResult<u64> {
        let choices = self.display_names(candidates).await;
        let message = self
            .channel_id
            .send_message(&self.ctx.http, |m| {
                m.embed(f).components(|c| {
                    c.create_action_row(|row| {
                        row.create_select_menu(|menu| {
                            menu.custom_id(custom_id)
                                .placeholder(placeholder)
                                .min_values(1)
                                .max_values(1)
                                .options(|options| {
                                    for (id, name) in &choices {
                                        options.create_option(|o| o.label(name).value(id));
                                    }
                                    options
                                })
                        })
                    })
                })
            })
            .await
            .map_err(discord_error)?;
        Ok(message.id.0)
    }

    async fn set_ghost(&self, user_id: u64, ghost: bool) -> Result<()> {
        let mut member = self.guild_id.member(&self.ctx, UserId(user_id)).await?;
        if ghost {
            member.add_role(&self.ctx.http, self.ghost_role).await?;
        } else {
            member.remove_role(&self.ctx.http, self.ghost_role).await?;
        }
        Ok(())
    }

    async fn restore_roles(&self, players: &[u64]) {
        for player in players {
            if let Err(why) = self.set_ghost(*player, false).await {
                error!("Failed to remove {} role from {}: {:?}", GHOST_ROLE, player, why);
            }
        }
    }
}

#[async_trait]
impl MafiaTable for DiscordTable {
    async fn announce_day(&self, duration: Duration) -> BotResult<()> {
        self.send_embed(|e| {
            e.title("☀️ Day Phase")
                .description("-# Discuss who the murderer might be!")
                .color(theme::DAY)
                .image(theme::DAY_IMAGE)
                .footer(|f| f.text(ends_in(duration)))
        })
        .await
    }

    async fn open_vote(&self, candidates: Vec<u64>, duration: Duration) -> BotResult<u64> {
        self.send_select(VOTE_SELECT, "Vote", &candidates, |e| {
            e.title("⚖️ Voting")
                .description("-# Who do you think the murderer is?")
                .color(theme::VOTING)
                .thumbnail(theme::VOTING_THUMBNAIL)
                .footer(|f| f.text(ends_in(duration)))
        })
        .await
    }

    async fn announce_vote(&self, outcome: VoteOutcome) -> BotResult<()> {
        let (description, color) = vote_announcement(outcome);
        self.send_embed(|e| e.description(description).color(color)).await
    }

    async fn open_night(&self, candidates: Vec<u64>, duration: Duration) -> BotResult<u64> {
        self.send_embed(|e| {
            e.title("🌖 Night Phase")
                .description("-# Murderers, select your target.")
                .color(theme::NIGHT)
                .image(theme::NIGHT_IMAGE)
                .footer(|f| f.text(ends_in(duration)))
        })
        .await?;

        self.send_select(KILL_SELECT, "Select a target", &candidates, |e| {
            e.title("🔪 Murder")
                .description("-# Kill someone!")
                .color(theme::MURDER)
                .thumbnail(theme::MURDER_THUMBNAIL)
        })
        .await
    }

    async fn announce_night(&self, outcome: NightOutcome) -> BotResult<()> {
        let (description, color) = night_announcement(outcome);
        self.send_embed(|e| e.description(description).color(color)).await
    }

    async fn close_prompt(&self, message_id: u64) -> BotResult<()> {
        self.channel_id
            .edit_message(&self.ctx.http, MessageId(message_id), |m| m.components(|c| c))
            .await
            .map_err(discord_error)?;
        Ok(())
    }

    async fn mark_ghost(&self, user_id: u64) -> BotResult<()> {
        self.set_ghost(user_id, true).await.map_err(BotError::Internal)
    }

    async fn end_game(&self, summary: GameSummary) -> BotResult<()> {
        self.restore_roles(&summary.players).await;

        self.send_embed(|e| {
            e.title("Game Over")
                .description(format!("### {} 🏆", summary.winner))
                .color(theme::GAME_OVER)
                .field("Murderers", mention_lines(&summary.murderers), false)
                .footer(|f| f.text("❤️ Thanks for playing!"))
        })
        .await
    }
}

fn discord_error(e: serenity::Error) -> BotError {
    BotError::Internal(e.into())
}

fn lobby_embed<'a>(e: &'a mut CreateEmbed, players: &[u64], footer: &str) -> &'a mut CreateEmbed {
    e.title("Mafia")
        .description("-# Mafia is a murder mystery game. Catch the murderer before he kills everyone.")
        .color(theme::LOBBY)
        .field("Players Joined", mention_lines(players), false)
        .footer(|f| f.text(footer))
}

fn lobby_components(c: &mut CreateComponents) -> &mut CreateComponents {
    c.create_action_row(|row| {
        row.create_button(|b| b.custom_id(JOIN_BUTTON).label("Join").style(ButtonStyle::Primary))
            .create_button(|b| b.custom_id(START_BUTTON).label("Start").style(ButtonStyle::Danger))
            .create_button(|b| {
                b.custom_id(EXIT_BUTTON)
                    .emoji(ReactionType::Unicode("🗑️".to_string()))
                    .style(ButtonStyle::Secondary)
            })
    })
}

fn game_embed<'a>(e: &'a mut CreateEmbed, roster: &[(u64, bool)]) -> &'a mut CreateEmbed {
    e.title("Mafia - Game Started!")
        .description("-# The game has begun! Roles have been assigned. Use the button below to view your role.")
        .color(theme::GAME_STARTED)
        .field("Players", roster_lines(roster), false)
}

/// One mention per line, or "None" for nobody.
pub fn mention_lines(user_ids: &[u64]) -> String {
    if user_ids.is_empty() {
        return "None".to_string();
    }
    user_ids
        .iter()
        .map(|id| format!("<@{}>", id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Player list of the started game, marking who has looked at their role.
pub fn roster_lines(roster: &[(u64, bool)]) -> String {
    roster
        .iter()
        .map(|(id, viewed)| {
            if *viewed {
                format!("<@{}> **`[VIEWED ROLE]`**", id)
            } else {
                format!("<@{}>", id)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn ends_in(duration: Duration) -> String {
    format!("⏱️ Ends in {} seconds", duration.as_secs())
}

pub fn vote_announcement(outcome: VoteOutcome) -> (String, u32) {
    match outcome {
        VoteOutcome::NoVotes => ("❌ No votes were cast.".to_string(), theme::VERDICT),
        VoteOutcome::Tie => ("⚖️ It's a tie! No one was voted out.".to_string(), theme::TIE),
        VoteOutcome::Eliminated { user_id, was_murderer: true } => (
            format!("🔪 <@{}> was a Murderer. A murderer has been eliminated!", user_id),
            theme::VERDICT,
        ),
        VoteOutcome::Eliminated { user_id, was_murderer: false } => {
            (format!("💔 <@{}> was not a Murderer.", user_id), theme::VERDICT)
        }
    }
}

pub fn night_announcement(outcome: NightOutcome) -> (String, u32) {
    match outcome {
        NightOutcome::NoTarget => (
            "❌ The murderers didn't target anyone.".to_string(),
            theme::VERDICT,
        ),
        NightOutcome::Killed(user_id) => (
            format!("🔪 <@{}> was killed during the night.", user_id),
            theme::KILL,
        ),
    }
}
