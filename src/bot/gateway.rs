//! [`RoleGateway`] over serenity's HTTP client.
//!
//! Every call goes straight to the REST API; nothing is read from the gateway
//! cache, so the bot does not need the privileged members intent.

use crate::{core::reaction_roles::RoleGateway, errors::GatewayError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::{sync::Arc, time::Duration};

type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Embed colour of reaction-role legends.
const LEGEND_COLOUR: u32 = 0x0058_65F2;

/// Wait suggested when Discord answers 429 after serenity's own ratelimiter gave up.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Serenity-backed gateway for one bot user.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<serenity::Http>,
    bot_id: serenity::UserId,
}

impl std::fmt::Debug for SerenityGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityGateway")
            .field("bot_id", &self.bot_id)
            .finish_non_exhaustive()
    }
}

impl SerenityGateway {
    /// Gateway using the context's HTTP client and current user.
    #[must_use]
    pub fn new(ctx: &serenity::Context) -> Self {
        Self {
            http: Arc::clone(&ctx.http),
            bot_id: ctx.cache.current_user().id,
        }
    }

    async fn guild_roles(
        &self,
        guild_id: u64,
    ) -> GatewayResult<std::collections::HashMap<serenity::RoleId, serenity::Role>> {
        serenity::GuildId::new(guild_id)
            .roles(&self.http)
            .await
            .map_err(map_error)
    }
}

/// Maps a serenity error onto the gateway error kinds by HTTP status.
fn map_error(err: serenity::Error) -> GatewayError {
    if let serenity::Error::Http(http_err) = &err {
        if let Some(status) = http_err.status_code() {
            match status.as_u16() {
                403 => return GatewayError::Forbidden,
                404 => return GatewayError::NotFound,
                429 => {
                    return GatewayError::RateLimited {
                        retry_after: DEFAULT_RETRY_AFTER,
                    };
                }
                _ => {}
            }
        }
    }
    GatewayError::Other(err.to_string())
}

fn reaction_type(emoji: &str) -> GatewayResult<serenity::ReactionType> {
    serenity::ReactionType::try_from(emoji).map_err(|e| GatewayError::Other(e.to_string()))
}

#[async_trait]
impl RoleGateway for SerenityGateway {
    fn bot_user_id(&self) -> u64 {
        self.bot_id.get()
    }

    async fn bot_top_role_position(&self, guild_id: u64) -> GatewayResult<u16> {
        let member = self
            .http
            .get_member(serenity::GuildId::new(guild_id), self.bot_id)
            .await
            .map_err(map_error)?;
        let roles = self.guild_roles(guild_id).await?;

        Ok(member
            .roles
            .iter()
            .filter_map(|id| roles.get(id))
            .map(|role| role.position)
            .max()
            .unwrap_or(0))
    }

    async fn role_position(&self, guild_id: u64, role_id: u64) -> GatewayResult<Option<u16>> {
        let roles = self.guild_roles(guild_id).await?;
        Ok(roles
            .get(&serenity::RoleId::new(role_id))
            .map(|role| role.position))
    }

    async fn post_legend(&self, channel_id: u64, title: &str, legend: &str) -> GatewayResult<u64> {
        let embed = serenity::CreateEmbed::new()
            .title(title)
            .description(legend)
            .color(LEGEND_COLOUR)
            .footer(serenity::CreateEmbedFooter::new(
                "React to get a role, remove your reaction to drop it",
            ));
        let message = serenity::ChannelId::new(channel_id)
            .send_message(&self.http, serenity::CreateMessage::new().embed(embed))
            .await
            .map_err(map_error)?;
        Ok(message.id.get())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> GatewayResult<()> {
        serenity::ChannelId::new(channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(map_error)
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> GatewayResult<()> {
        serenity::ChannelId::new(channel_id)
            .create_reaction(
                &self.http,
                serenity::MessageId::new(message_id),
                reaction_type(emoji)?,
            )
            .await
            .map_err(map_error)
    }

    async fn remove_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        user_id: u64,
        emoji: &str,
    ) -> GatewayResult<()> {
        serenity::ChannelId::new(channel_id)
            .delete_reaction(
                &self.http,
                serenity::MessageId::new(message_id),
                Some(serenity::UserId::new(user_id)),
                reaction_type(emoji)?,
            )
            .await
            .map_err(map_error)
    }

    async fn member_has_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<bool> {
        let member = self
            .http
            .get_member(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
            )
            .await
            .map_err(map_error)?;
        Ok(member.roles.contains(&serenity::RoleId::new(role_id)))
    }

    async fn grant_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        self.http
            .add_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some("Reaction role"),
            )
            .await
            .map_err(map_error)
    }

    async fn revoke_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        self.http
            .remove_member_role(
                serenity::GuildId::new(guild_id),
                serenity::UserId::new(user_id),
                serenity::RoleId::new(role_id),
                Some("Reaction role"),
            )
            .await
            .map_err(map_error)
    }
}
