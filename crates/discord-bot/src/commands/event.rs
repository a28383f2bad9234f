use serenity::{
    builder::CreateApplicationCommand,
    model::{application::command::CommandOptionType, channel::ChannelType},
};

/// Create command for splitting participants into teams
pub fn group_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("group")
        .description("Divide participants into groups.")
        .create_option(|option| {
            option
                .name("teams")
                .description("Number of groups to divide the participants into. Default is 2.")
                .kind(CommandOptionType::Integer)
                .min_int_value(2)
                .required(false)
        });

    command
}

/// Create command for posting the registration embed
pub fn register_event_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("register-event")
        .description("Post the Event Registration embed")
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("title")
                .description("Name of the event")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("description")
                .description("What the event is about")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .create_option(|option| {
            option
                .name("channel")
                .description("Channel to post the Event Registration embed")
                .kind(CommandOptionType::Channel)
                .channel_types(&[ChannelType::Text])
                .required(false)
        });

    command
}

/// Create command for downloading the participant list
pub fn export_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("export")
        .description("Exports the participant list as a JSON file.");

    command
}

/// Create command for replacing the participant list with an upload
pub fn import_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("import")
        .description("Imports a participant list from a JSON file.")
        .create_option(|option| {
            option
                .name("file")
                .description("JSON array of user IDs")
                .kind(CommandOptionType::Attachment)
                .required(true)
        });

    command
}

/// Create command for emptying the participant list
pub fn clear_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("clear")
        .description("Clears the participant list.");

    command
}
