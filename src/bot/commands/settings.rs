//! Guild settings commands - prefix, content filter and unit preferences.
//!
//! Changes go to the in-memory cache only; the module's reconciliation loop
//! writes them to the database on its next tick.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::guild_id, handlers::autocomplete},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    fn on_off(blocked: bool) -> &'static str {
        if blocked { "🚫 blocked" } else { "✅ allowed" }
    }

    /// Shows or changes the prefix for text commands.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn prefix(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "New prefix (leave empty to show the current one)"] new_prefix: Option<
            String,
        >,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let cache = ctx.data().prefix.cache();

        match new_prefix {
            None => {
                let current = cache.get_or_default(guild_id).await;
                ctx.say(format!("Current prefix is `{}`", current.prefix))
                    .await?;
            }
            Some(new_prefix) => {
                let updated = cache.set(guild_id, "prefix", &new_prefix).await?;
                ctx.say(format!("✅ Prefix set to `{}`", updated.prefix))
                    .await?;
            }
        }
        Ok(())
    }

    /// Blocks or allows a content category.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn filter(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Content category"]
        #[autocomplete = "autocomplete::autocomplete_filter_field"]
        category: String,
        #[description = "on to block, off to allow"]
        #[autocomplete = "autocomplete::autocomplete_toggle"]
        value: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let category = category.trim().to_lowercase();
        let updated = ctx
            .data()
            .content_filter
            .cache()
            .set(guild_id, &category, &value)
            .await?;

        let blocked = if category == "nsfw" {
            updated.nsfw
        } else {
            updated.racist
        };
        ctx.say(format!("✅ `{category}` content is now {}", on_off(blocked)))
            .await?;
        Ok(())
    }

    /// Sets the preferred temperature or speed unit.
    #[poise::command(
        slash_command,
        prefix_command,
        guild_only,
        required_permissions = "MANAGE_GUILD"
    )]
    pub async fn units(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "temp or speed"]
        #[autocomplete = "autocomplete::autocomplete_units_field"]
        field: String,
        #[description = "C or F for temp, kph or mph for speed"]
        #[autocomplete = "autocomplete::autocomplete_units_value"]
        value: String,
    ) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let field = field.trim().to_lowercase();
        let updated = ctx
            .data()
            .units
            .cache()
            .set(guild_id, &field, &value)
            .await?;

        let shown = if field == "temp" {
            updated.temp.to_string()
        } else {
            updated.speed.to_string()
        };
        ctx.say(format!("✅ `{field}` readings will be shown in {shown}"))
            .await?;
        Ok(())
    }

    /// Shows this server's settings.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn settings(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let guild_id = guild_id(ctx)?;
        let data = ctx.data();
        let prefix = data.prefix.cache().get_or_default(guild_id).await;
        let filter = data.content_filter.cache().get_or_default(guild_id).await;
        let units = data.units.cache().get_or_default(guild_id).await;

        let embed = serenity::CreateEmbed::new()
            .title("⚙️ Server Settings")
            .color(0x0034_98DB)
            .field("Prefix", format!("`{}`", prefix.prefix), true)
            .field(
                "Content Filter",
                format!(
                    "NSFW: {}\nRacist: {}",
                    on_off(filter.nsfw),
                    on_off(filter.racist)
                ),
                true,
            )
            .field(
                "Units",
                format!("Temperature: {}\nSpeed: {}", units.temp, units.speed),
                true,
            );

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
