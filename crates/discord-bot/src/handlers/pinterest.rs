use eyre::Result;
use serenity::model::channel::{AttachmentType, Message};
use std::borrow::Cow;
use std::str::FromStr;
use tracing::{info, warn};

use crate::handlers::HandlerContext;
use crate::pinterest::{ATTACHMENTS_PER_MESSAGE, IMAGES_PER_SEARCH};
use crate::theme;

/// Commands recognised after the message prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixCommand {
    Pinterest,
}

impl FromStr for PrefixCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinterest" | "pins" => Ok(PrefixCommand::Pinterest),
            _ => Err(()),
        }
    }
}

/// Split a prefixed message into its command and the remaining argument text.
pub fn parse_prefix_command<'a>(prefix: &str, content: &'a str) -> Option<(PrefixCommand, &'a str)> {
    let rest = content.trim_start().strip_prefix(prefix)?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.parse().ok()?;
    Some((command, parts.next().unwrap_or("").trim()))
}

/// Handle a plain message, answering the Pinterest command.
pub async fn handle_message(ctx: HandlerContext, msg: &Message) -> Result<()> {
    let prefix = ctx.config.command_prefix();
    let Some((PrefixCommand::Pinterest, keyword)) = parse_prefix_command(prefix, &msg.content) else {
        return Ok(());
    };

    if keyword.is_empty() {
        msg.reply(&ctx.ctx, format!("Usage: `{}pinterest <keyword>`", prefix))
            .await?;
        return Ok(());
    }

    info!("Pinterest search for {:?} by {}", keyword, msg.author.id);
    if let Err(why) = msg.channel_id.broadcast_typing(&ctx.ctx.http).await {
        warn!("Failed to send typing indicator: {:?}", why);
    }

    let images = match ctx.pinterest.search_images(keyword, IMAGES_PER_SEARCH).await {
        Ok(images) => images,
        Err(e) => {
            warn!("Pinterest search for {:?} failed: {:?}", keyword, e);
            msg.channel_id
                .say(&ctx.ctx.http, format!("{} {}", theme::ERROR, e))
                .await?;
            return Ok(());
        }
    };

    if images.is_empty() {
        msg.channel_id
            .say(&ctx.ctx.http, format!("No images found for **{}**.", keyword))
            .await?;
        return Ok(());
    }

    for chunk in images.chunks(ATTACHMENTS_PER_MESSAGE) {
        let files: Vec<AttachmentType> = chunk
            .iter()
            .map(|image| AttachmentType::Bytes {
                data: Cow::Owned(image.data.clone()),
                filename: image.filename.clone(),
            })
            .collect();

        msg.channel_id
            .send_files(&ctx.ctx.http, files, |m| m.content(format!("🔎 **{}**:", keyword)))
            .await?;
    }

    Ok(())
}
