//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Calculator commands
pub mod calculator;

/// General utility commands
pub mod general;

/// Tic-tac-toe game command
pub mod games;

/// Reaction-role legend commands
pub mod reaction_roles;

/// Guild settings commands
pub mod settings;

/// Unit conversion commands
pub mod units;

// Export commands
pub use calculator::*;
pub use games::*;
pub use general::*;
pub use reaction_roles::*;
pub use settings::*;
pub use units::*;

use crate::errors::{Error, Result};

/// Guild id of a command context. Commands using this are `guild_only`.
pub(crate) fn guild_id(ctx: poise::Context<'_, crate::bot::BotData, Error>) -> Result<u64> {
    ctx.guild_id()
        .map(poise::serenity_prelude::GuildId::get)
        .ok_or_else(|| Error::InvalidInput {
            message: "This command only works in a server".to_string(),
        })
}
