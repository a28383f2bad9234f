use config::{Config, File, FileFormat};
use eyre::{eyre, Result, WrapErr};
use rizbot_core::models::mafia::PhaseTimings;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::Level;

/// Configuration for the Discord bot.
///
/// Connection details and file locations come from the environment; who may
/// do what comes from the YAML [`Settings`] file it points at.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token (required)
    pub token: String,
    /// Application ID for Discord bot (required)
    pub application_id: u64,
    /// Prefix for message commands (defaults to "!")
    pub command_prefix: Option<String>,
    /// Test guild ID for faster command registration during development
    pub test_guild_id: Option<u64>,
    /// Path of the YAML settings file
    pub settings_path: PathBuf,
    /// Path of the JSON participant list
    pub participants_file: PathBuf,
    /// Log level for the bot
    pub log_level: Level,
}

impl BotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let token = env::var("DISCORD_TOKEN")
            .map_err(|_| eyre!("DISCORD_TOKEN environment variable not set"))?;

        let application_id = env::var("DISCORD_APPLICATION_ID")
            .map_err(|_| eyre!("DISCORD_APPLICATION_ID environment variable not set"))?
            .parse::<u64>()
            .map_err(|_| eyre!("DISCORD_APPLICATION_ID must be a valid u64"))?;

        let command_prefix = env::var("DISCORD_COMMAND_PREFIX").ok();

        // Optional test guild ID for development
        let test_guild_id = env::var("DISCORD_TEST_GUILD_ID")
            .ok()
            .and_then(|id| id.parse::<u64>().ok());

        let settings_path = env::var("SETTINGS_PATH")
            .unwrap_or_else(|_| "settings.yaml".to_string())
            .into();

        let participants_file = env::var("PARTICIPANTS_FILE")
            .unwrap_or_else(|_| "list.json".to_string())
            .into();

        let log_level = parse_log_level(&env::var("LOG_LEVEL").unwrap_or_default());

        Ok(Self {
            token,
            application_id,
            command_prefix,
            test_guild_id,
            settings_path,
            participants_file,
            log_level,
        })
    }

    /// Get the command prefix (defaults to "!" if not set)
    pub fn command_prefix(&self) -> &str {
        self.command_prefix.as_deref().unwrap_or("!")
    }
}

pub fn parse_log_level(value: &str) -> Level {
    match value {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Event channel and role wiring.
#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Role granted to registered participants
    pub participant_role: u64,
    /// Channel that receives registration and cancellation notices
    pub registration_log: u64,
}

/// Guild-specific settings read from `settings.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Users treated as bot developers
    #[serde(default)]
    pub developer: Vec<u64>,
    /// Staff role IDs mapped to their level
    #[serde(default)]
    pub role_levels: HashMap<String, u32>,
    /// Users allowed to run event commands
    #[serde(default)]
    pub event_team: Vec<u64>,
    pub event_settings: EventSettings,
    /// Phase durations for Mafia games
    #[serde(default)]
    pub mafia: PhaseTimings,
}

impl Settings {
    /// Read the YAML settings file at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let path_str = path
            .to_str()
            .ok_or_else(|| eyre!("Settings path is not valid UTF-8: {}", path.display()))?;

        Config::builder()
            .add_source(File::new(path_str, FileFormat::Yaml))
            .build()
            .wrap_err_with(|| format!("Failed to read settings from {}", path.display()))?
            .try_deserialize()
            .wrap_err("Invalid settings file")
    }

    /// Staff role IDs, skipping keys that are not numeric.
    pub fn staff_role_ids(&self) -> Vec<u64> {
        self.role_levels
            .keys()
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}
