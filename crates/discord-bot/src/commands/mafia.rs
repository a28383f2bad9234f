use rizbot_core::models::mafia::{MAX_MURDERERS, MIN_MURDERERS};
use serenity::{
    builder::CreateApplicationCommand,
    model::application::command::CommandOptionType,
};

/// Create command for opening a Mafia lobby
pub fn mafia_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("mafia")
        .description("Starts Mafia game.")
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("murderers")
                .description("Number of murderers in the game")
                .kind(CommandOptionType::Integer)
                .min_int_value(MIN_MURDERERS as u64)
                .max_int_value(MAX_MURDERERS as u64)
                .required(true)
        });

    command
}
