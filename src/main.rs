use color_eyre::eyre::Result;
use dotenv::dotenv;
use rizbot_discord_bot::config::{BotConfig, Settings};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = BotConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting rizbot");

    let settings = Settings::load(&config.settings_path)?;
    info!("Loaded settings from {}", config.settings_path.display());

    // Start the Discord bot
    match rizbot_discord_bot::start_bot(config, settings).await {
        Ok(_) => info!("Discord bot shut down gracefully"),
        Err(e) => error!("Discord bot error: {}", e),
    }

    Ok(())
}
