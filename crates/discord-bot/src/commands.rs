use serenity::builder::CreateApplicationCommands;

pub mod event;
pub mod mafia;

/// Names of every slash command, in registration order.
pub const COMMAND_NAMES: [&str; 6] = ["group", "register-event", "export", "import", "clear", "mafia"];

/// Register all commands for the bot.
///
/// This function creates and registers all of the slash commands that the bot
/// will respond to, including their options and descriptions.
///
/// # Arguments
///
/// * `commands` - A mutable reference to a CreateApplicationCommands object
///                that will be modified to include our custom commands.
///
/// # Returns
///
/// The same CreateApplicationCommands object with our commands added.
pub fn register_commands(commands: &mut CreateApplicationCommands) -> &mut CreateApplicationCommands {
    commands.create_application_command(|command| {
        *command = event::group_command();
        command
    });

    commands.create_application_command(|command| {
        *command = event::register_event_command();
        command
    });

    commands.create_application_command(|command| {
        *command = event::export_command();
        command
    });

    commands.create_application_command(|command| {
        *command = event::import_command();
        command
    });

    commands.create_application_command(|command| {
        *command = event::clear_command();
        command
    });

    commands.create_application_command(|command| {
        *command = mafia::mafia_command();
        command
    });

    commands
}
