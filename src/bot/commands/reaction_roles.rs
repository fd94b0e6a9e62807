//! Reaction-role commands - create, list and delete legend messages.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::guild_id, gateway::SerenityGateway},
        core::{
            emoji::{parse_emoji_list, parse_role_list},
            reaction_roles::{CreateRequest, RoleGateway},
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::{fmt::Write, time::Duration};
    use tracing::warn;

    /// How long the delete confirmation buttons stay active.
    const CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

    /// Parent command for reaction-role legends.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "reactionrole",
        subcommands("reactionrole_create", "reactionrole_list", "reactionrole_delete"),
        subcommand_required
    )]
    pub async fn reactionrole(_ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        Ok(())
    }

    /// Posts a legend in this channel; reacting with an emoji grants its role.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        rename = "create",
        required_permissions = "MANAGE_ROLES",
        required_bot_permissions = "MANAGE_ROLES | ADD_REACTIONS | MANAGE_MESSAGES"
    )]
    pub async fn reactionrole_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Legend title"] title: String,
        #[description = "Emojis separated by spaces"] emojis: String,
        #[description = "Roles separated by spaces, in the same order as the emojis"]
        roles: String,
    ) -> Result<()> {
        let request = CreateRequest {
            guild_id: guild_id(ctx)?,
            channel_id: ctx.channel_id().get(),
            creator_id: ctx.author().id.get(),
            title,
            emojis: parse_emoji_list(&emojis)?,
            roles: parse_role_list(&roles)?,
        };

        ctx.defer_ephemeral().await?;
        let gateway = SerenityGateway::new(ctx.serenity_context());
        let message = ctx.data().reaction_roles.create(&gateway, request).await?;

        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "✅ Reaction roles are live on message `{}` with {} role(s).",
                    message.message_id,
                    message.bindings.len()
                ))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Lists the reaction-role legends in this server.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "list")]
    pub async fn reactionrole_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let messages = ctx.data().reaction_roles.list_guild(guild_id).await;

        if messages.is_empty() {
            ctx.say("📭 No reaction-role messages in this server.").await?;
            return Ok(());
        }

        let mut description = String::new();
        for message in &messages {
            writeln!(
                description,
                "• [{}](https://discord.com/channels/{}/{}/{}) `{}` by <@{}>: {}",
                message.title,
                message.guild_id,
                message.channel_id,
                message.message_id,
                message.message_id,
                message.creator_id,
                message
                    .bindings
                    .iter()
                    .map(|b| format!("{} <@&{}>", b.display, b.role_id))
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }

        let embed = serenity::CreateEmbed::new()
            .title("🎭 Reaction Roles")
            .description(description)
            .color(0x0034_98DB);
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    fn confirm_row(id_prefix: &str, locked: bool) -> serenity::CreateActionRow {
        serenity::CreateActionRow::Buttons(vec![
            serenity::CreateButton::new(format!("{id_prefix}confirm"))
                .label("Delete")
                .style(serenity::ButtonStyle::Danger)
                .disabled(locked),
            serenity::CreateButton::new(format!("{id_prefix}cancel"))
                .label("Cancel")
                .style(serenity::ButtonStyle::Secondary)
                .disabled(locked),
        ])
    }

    /// Removes a legend you created and stops assigning its roles.
    #[poise::command(slash_command, prefix_command, guild_only, rename = "delete")]
    pub async fn reactionrole_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Message ID of the legend"] message_id: String,
    ) -> Result<()> {
        let message_id: u64 = message_id.trim().parse().map_err(|_| Error::InvalidInput {
            message: format!("`{message_id}` is not a message ID"),
        })?;
        let data = ctx.data();

        let Some(tracked) = data.reaction_roles.get(message_id).await else {
            return Err(Error::NotFound {
                what: format!("Reaction-role message {message_id}"),
            });
        };
        if tracked.creator_id != ctx.author().id.get() {
            return Err(Error::PermissionDenied {
                reason: "Only the creator of a reaction-role message can delete it".to_string(),
            });
        }

        let id_prefix = format!("{}-rr-", ctx.id());
        let handle = ctx
            .send(
                poise::CreateReply::default()
                    .content(format!(
                        "⚠️ Delete **{}** and stop assigning its {} role(s)?",
                        tracked.title,
                        tracked.bindings.len()
                    ))
                    .components(vec![confirm_row(&id_prefix, false)])
                    .ephemeral(true),
            )
            .await?;

        let filter_prefix = id_prefix.clone();
        let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
            .author_id(ctx.author().id)
            .channel_id(ctx.channel_id())
            .filter(move |press| press.data.custom_id.starts_with(&filter_prefix))
            .timeout(CONFIRM_TIMEOUT)
            .await
        else {
            handle
                .edit(
                    ctx,
                    poise::CreateReply::default()
                        .content("⌛ Timed out, nothing was deleted.")
                        .components(vec![confirm_row(&id_prefix, true)]),
                )
                .await?;
            return Ok(());
        };

        let content = if press.data.custom_id.ends_with("confirm") {
            let removed = data
                .reaction_roles
                .delete(message_id, ctx.author().id.get())
                .await?;
            let gateway = SerenityGateway::new(ctx.serenity_context());
            if let Err(e) = gateway
                .delete_message(removed.channel_id, removed.message_id)
                .await
            {
                warn!("Could not delete legend {}: {e}", removed.message_id);
            }
            format!("🗑️ Deleted **{}**.", removed.title)
        } else {
            "Cancelled, nothing was deleted.".to_string()
        };

        press
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .content(content)
                        .components(vec![]),
                ),
            )
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
