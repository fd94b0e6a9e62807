//! Gateway event handler.
//!
//! Reaction events feed the reaction-role registry; guild membership changes
//! hydrate or forget guild state; deleted legends stop being tracked.

use crate::{
    bot::{BotData, gateway::SerenityGateway},
    core::{emoji::EmojiKey, reaction_roles::ReactionEvent},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use tracing::{debug, info, warn};

/// Dispatches the events the bot reacts to; everything else is ignored.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    match event {
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            let Some(reaction) = reaction_event(add_reaction) else {
                return Ok(());
            };
            let gateway = SerenityGateway::new(ctx);
            match data
                .reaction_roles
                .on_reaction_added(&gateway, &reaction)
                .await
            {
                Ok(outcome) => debug!(?outcome, message = reaction.message_id, "Reaction added"),
                Err(e) => warn!(
                    "Could not apply reaction role on message {}: {e}",
                    reaction.message_id
                ),
            }
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            let Some(reaction) = reaction_event(removed_reaction) else {
                return Ok(());
            };
            let gateway = SerenityGateway::new(ctx);
            match data
                .reaction_roles
                .on_reaction_removed(&gateway, &reaction)
                .await
            {
                Ok(outcome) => debug!(?outcome, message = reaction.message_id, "Reaction removed"),
                Err(e) => warn!(
                    "Could not revoke reaction role on message {}: {e}",
                    reaction.message_id
                ),
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            // `is_new` is unset for guilds that were part of the ready payload
            if *is_new == Some(true) {
                data.join_guild(guild.id.get()).await;
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // An outage marks the guild unavailable; only a real removal is forgotten
            if incomplete.unavailable {
                info!(guild = incomplete.id.get(), "Guild became unavailable");
            } else {
                data.forget_guild(incomplete.id.get()).await;
            }
        }
        serenity::FullEvent::MessageDelete {
            deleted_message_id, ..
        } => {
            if data
                .reaction_roles
                .forget_message(deleted_message_id.get())
                .await
            {
                info!("Reaction-role legend {deleted_message_id} was deleted, no longer tracking it");
            }
        }
        _ => {}
    }
    Ok(())
}

/// Converts a guild reaction into a registry event; DMs yield `None`.
fn reaction_event(reaction: &serenity::Reaction) -> Option<ReactionEvent> {
    Some(ReactionEvent {
        guild_id: reaction.guild_id?.get(),
        channel_id: reaction.channel_id.get(),
        message_id: reaction.message_id.get(),
        user_id: reaction.user_id?.get(),
        emoji: emoji_key(&reaction.emoji),
        display: reaction.emoji.to_string(),
    })
}

/// Canonical identity of a reaction emoji.
#[must_use]
pub fn emoji_key(emoji: &serenity::ReactionType) -> Option<EmojiKey> {
    match emoji {
        serenity::ReactionType::Custom { id, .. } => Some(EmojiKey::Custom(id.get())),
        serenity::ReactionType::Unicode(text) => Some(EmojiKey::Unicode(text.clone())),
        _ => None,
    }
}
