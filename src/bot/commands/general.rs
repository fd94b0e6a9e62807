//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't touch guild state
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    ///
    /// Text commands use the server's prefix, shown at the top.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let prefix = match ctx.guild_id() {
            Some(guild_id) => {
                ctx.data()
                    .prefix
                    .cache()
                    .get_or_default(guild_id.get())
                    .await
                    .prefix
            }
            None => crate::core::settings::DEFAULT_PREFIX.to_string(),
        };

        let help_text = format!(
            "**GuildBuddy Help**\n\
        Every command works as a slash command. Text commands use the prefix `{prefix}`.\n\n\
        **Server Settings** (Manage Server)\n\
        • `/prefix [new]` - Shows or changes the text command prefix.\n\
        • `/filter <category> <on|off>` - Blocks or allows a content category.\n\
        • `/units <temp|speed> <value>` - Sets the preferred temperature or speed unit.\n\
        • `/settings` - Shows this server's settings.\n\n\
        **Reaction Roles** (Manage Roles)\n\
        • `/reactionrole create <title> <emojis> <roles>` - Posts a legend; reacting grants the role.\n\
        • `/reactionrole list` - Lists this server's legends.\n\
        • `/reactionrole delete <message_id>` - Stops a legend you created.\n\n\
        **Utilities**\n\
        • `/calc <expression>` - Evaluates math, e.g. `x = 2 ^ 10`, then `x / 4`.\n\
        • `/calc_vars` / `/calc_clear` - Shows or clears your variables.\n\
        • `/temperature <value> <unit>` / `/speed <value> <unit>` - Converts to the server's units.\n\
        • `/tictactoe <opponent>` - Challenges someone to a game.\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message."
        );

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
