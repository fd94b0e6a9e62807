//! Reaction roles - Grant and revoke roles from reactions on a legend message.
//!
//! The registry keeps `message_id -> {emoji -> role}` in memory and writes each
//! mapping through to the store. Outbound platform calls go through
//! [`RoleGateway`] so this module stays independent of the Discord client.

use crate::{
    core::{
        emoji::{EmojiKey, ParsedEmoji},
        store::SettingsStore,
    },
    errors::{Error, GatewayError, Result},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Write, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Store namespace for reaction-role mappings.
pub const NAMESPACE: &str = "reaction_roles";

/// Outbound platform calls needed by reaction roles.
#[async_trait]
pub trait RoleGateway: Send + Sync {
    /// Id of the bot user.
    fn bot_user_id(&self) -> u64;

    /// Position of the bot's highest role in the guild.
    async fn bot_top_role_position(&self, guild_id: u64) -> std::result::Result<u16, GatewayError>;

    /// Position of a role, `None` if the guild has no such role.
    async fn role_position(
        &self,
        guild_id: u64,
        role_id: u64,
    ) -> std::result::Result<Option<u16>, GatewayError>;

    /// Posts the legend message and returns its id.
    async fn post_legend(
        &self,
        channel_id: u64,
        title: &str,
        legend: &str,
    ) -> std::result::Result<u64, GatewayError>;

    /// Deletes a message.
    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> std::result::Result<(), GatewayError>;

    /// Adds the bot's own reaction.
    async fn add_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        emoji: &str,
    ) -> std::result::Result<(), GatewayError>;

    /// Removes one user's reaction.
    async fn remove_reaction(
        &self,
        channel_id: u64,
        message_id: u64,
        user_id: u64,
        emoji: &str,
    ) -> std::result::Result<(), GatewayError>;

    /// Whether the member currently holds the role.
    async fn member_has_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> std::result::Result<bool, GatewayError>;

    /// Grants a role.
    async fn grant_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> std::result::Result<(), GatewayError>;

    /// Revokes a role.
    async fn revoke_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> std::result::Result<(), GatewayError>;
}

/// One emoji-to-role entry of a legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    /// Emoji identity
    pub emoji: EmojiKey,
    /// Text used to render and react with the emoji
    pub display: String,
    /// Role granted by the emoji
    pub role_id: u64,
}

/// A tracked legend message and its bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRoleMessage {
    /// Posted legend message
    pub message_id: u64,
    /// Channel the legend lives in
    pub channel_id: u64,
    /// Guild the roles belong to
    pub guild_id: u64,
    /// User who created the legend; only they may delete it
    pub creator_id: u64,
    /// Legend title
    pub title: String,
    /// Emoji bindings in legend order
    pub bindings: Vec<RoleBinding>,
}

impl ReactionRoleMessage {
    /// Role bound to `emoji`, if any.
    #[must_use]
    pub fn role_for(&self, emoji: &EmojiKey) -> Option<u64> {
        self.bindings
            .iter()
            .find(|b| &b.emoji == emoji)
            .map(|b| b.role_id)
    }
}

/// Renders the legend body: one `emoji → role mention` line per binding.
pub fn format_legend(pairs: &[(ParsedEmoji, u64)]) -> Result<String> {
    let mut legend = String::new();
    for (emoji, role_id) in pairs {
        writeln!(&mut legend, "{} → <@&{role_id}>", emoji.display)?;
    }
    Ok(legend)
}

/// Input of [`ReactionRoleRegistry::create`].
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Guild the roles belong to
    pub guild_id: u64,
    /// Channel to post the legend in
    pub channel_id: u64,
    /// Invoking user
    pub creator_id: u64,
    /// Legend title
    pub title: String,
    /// Emojis in legend order
    pub emojis: Vec<ParsedEmoji>,
    /// Roles, positionally matching `emojis`
    pub roles: Vec<u64>,
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    /// Guild of the message
    pub guild_id: u64,
    /// Channel of the message
    pub channel_id: u64,
    /// Message reacted to
    pub message_id: u64,
    /// Reacting user
    pub user_id: u64,
    /// Resolved identity, `None` when the emoji could not be resolved
    pub emoji: Option<EmojiKey>,
    /// Text needed to remove the reaction again
    pub display: String,
}

/// What a reaction event resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The message is not a tracked legend
    Untracked,
    /// The reaction came from the bot itself
    OwnReaction,
    /// The emoji is not part of the legend and was removed
    StrayRemoved,
    /// The role was granted
    Granted(u64),
    /// The member already held the role
    AlreadyHeld(u64),
    /// The role was revoked
    Revoked(u64),
    /// The member did not hold the role
    NotHeld(u64),
    /// The emoji is not part of the legend (removal event, nothing to do)
    Unmapped,
}

/// Tracks legend messages and applies their bindings.
pub struct ReactionRoleRegistry {
    messages: RwLock<HashMap<u64, ReactionRoleMessage>>,
    store: Arc<dyn SettingsStore>,
    settle_delay: Duration,
    max_pairs: usize,
}

impl std::fmt::Debug for ReactionRoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionRoleRegistry")
            .field("settle_delay", &self.settle_delay)
            .field("max_pairs", &self.max_pairs)
            .finish_non_exhaustive()
    }
}

impl ReactionRoleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(store: Arc<dyn SettingsStore>, settle_delay: Duration, max_pairs: usize) -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
            store,
            settle_delay,
            max_pairs,
        }
    }

    /// Tracked mapping for a message.
    pub async fn get(&self, message_id: u64) -> Option<ReactionRoleMessage> {
        self.messages.read().await.get(&message_id).cloned()
    }

    /// Every tracked mapping in a guild.
    pub async fn list_guild(&self, guild_id: u64) -> Vec<ReactionRoleMessage> {
        let mut listed: Vec<_> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect();
        listed.sort_by_key(|m| m.message_id);
        listed
    }

    /// Loads every stored mapping. Undecodable records are skipped and logged.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> Result<usize> {
        let records = self.store.fetch_all(NAMESPACE).await?;
        let mut messages = self.messages.write().await;
        messages.clear();

        for (key, value) in records {
            match serde_json::from_value::<ReactionRoleMessage>(value) {
                Ok(message) => {
                    messages.insert(message.message_id, message);
                }
                Err(e) => warn!("Skipping unreadable reaction-role record {key}: {e}"),
            }
        }

        info!("Loaded {} reaction-role messages", messages.len());
        Ok(messages.len())
    }

    /// Re-persists every tracked mapping. Returns how many writes failed.
    pub async fn flush(&self) -> usize {
        let snapshot: Vec<ReactionRoleMessage> =
            self.messages.read().await.values().cloned().collect();
        let mut failed = 0;
        for message in &snapshot {
            if let Err(e) = self.persist(message).await {
                warn!(
                    "Could not persist reaction roles for message {}: {e}",
                    message.message_id
                );
                failed += 1;
            }
        }
        failed
    }

    async fn persist(&self, message: &ReactionRoleMessage) -> Result<()> {
        let value = serde_json::to_value(message)?;
        self.store
            .upsert_or_update(NAMESPACE, &message.message_id.to_string(), &value)
            .await?;
        Ok(())
    }

    fn validate(&self, request: &CreateRequest) -> Result<()> {
        if request.emojis.is_empty() {
            return Err(Error::InvalidInput {
                message: "Give at least one emoji and one role".to_string(),
            });
        }
        if request.emojis.len() != request.roles.len() {
            return Err(Error::InvalidInput {
                message: format!(
                    "Got {} emojis but {} roles, they must pair up",
                    request.emojis.len(),
                    request.roles.len()
                ),
            });
        }
        if request.emojis.len() > self.max_pairs {
            return Err(Error::InvalidInput {
                message: format!(
                    "At most {} emoji/role pairs fit on one message",
                    self.max_pairs
                ),
            });
        }
        for (i, emoji) in request.emojis.iter().enumerate() {
            if request.emojis[..i].iter().any(|e| e.key == emoji.key) {
                return Err(Error::InvalidInput {
                    message: format!("{} is listed more than once", emoji.display),
                });
            }
        }
        Ok(())
    }

    /// Rejects any role that is missing or not strictly below the bot's top role.
    async fn check_hierarchy(&self, gateway: &dyn RoleGateway, request: &CreateRequest) -> Result<()> {
        let bot_top = gateway.bot_top_role_position(request.guild_id).await?;
        for &role_id in &request.roles {
            let Some(position) = gateway.role_position(request.guild_id, role_id).await? else {
                return Err(Error::NotFound {
                    what: format!("Role <@&{role_id}>"),
                });
            };
            if position >= bot_top {
                return Err(Error::PermissionDenied {
                    reason: format!("<@&{role_id}> is not below my highest role, so I can't assign it"),
                });
            }
        }
        Ok(())
    }

    /// Validates, posts the legend, reacts with every emoji and starts tracking.
    ///
    /// Nothing is posted unless validation and the hierarchy check pass. If any
    /// reaction is rejected the legend is deleted again.
    #[instrument(skip(self, gateway, request), fields(guild = request.guild_id, pairs = request.emojis.len()))]
    pub async fn create(
        &self,
        gateway: &dyn RoleGateway,
        request: CreateRequest,
    ) -> Result<ReactionRoleMessage> {
        self.validate(&request)?;
        self.check_hierarchy(gateway, &request).await?;

        let pairs: Vec<(ParsedEmoji, u64)> = request
            .emojis
            .into_iter()
            .zip(request.roles)
            .collect();
        let legend = format_legend(&pairs)?;
        let message_id = gateway
            .post_legend(request.channel_id, &request.title, &legend)
            .await?;

        for (emoji, _) in &pairs {
            if let Err(e) = gateway
                .add_reaction(request.channel_id, message_id, &emoji.display)
                .await
            {
                warn!("Reaction {} rejected ({e}), removing legend", emoji.display);
                if let Err(e) = gateway.delete_message(request.channel_id, message_id).await {
                    warn!("Could not delete legend {message_id}: {e}");
                }
                return Err(Error::InvalidInput {
                    message: format!("{} is not an emoji I can use", emoji.display),
                });
            }
        }

        let message = ReactionRoleMessage {
            message_id,
            channel_id: request.channel_id,
            guild_id: request.guild_id,
            creator_id: request.creator_id,
            title: request.title,
            bindings: pairs
                .into_iter()
                .map(|(emoji, role_id)| RoleBinding {
                    emoji: emoji.key,
                    display: emoji.display,
                    role_id,
                })
                .collect(),
        };

        self.messages
            .write()
            .await
            .insert(message_id, message.clone());
        if let Err(e) = self.persist(&message).await {
            warn!("Could not persist reaction roles for {message_id}, will retry on shutdown: {e}");
        }

        info!("Tracking reaction roles on message {message_id}");
        Ok(message)
    }

    /// Grants the bound role, or removes a reaction that is not part of the legend.
    #[instrument(skip(self, gateway), fields(message = event.message_id, user = event.user_id))]
    pub async fn on_reaction_added(
        &self,
        gateway: &dyn RoleGateway,
        event: &ReactionEvent,
    ) -> Result<ReactionOutcome> {
        tokio::time::sleep(self.settle_delay).await;

        if event.user_id == gateway.bot_user_id() {
            return Ok(ReactionOutcome::OwnReaction);
        }
        let Some(message) = self.get(event.message_id).await else {
            return Ok(ReactionOutcome::Untracked);
        };

        let Some(role_id) = event.emoji.as_ref().and_then(|e| message.role_for(e)) else {
            debug!("Removing stray reaction {}", event.display);
            gateway
                .remove_reaction(event.channel_id, event.message_id, event.user_id, &event.display)
                .await?;
            return Ok(ReactionOutcome::StrayRemoved);
        };

        if gateway
            .member_has_role(message.guild_id, event.user_id, role_id)
            .await?
        {
            return Ok(ReactionOutcome::AlreadyHeld(role_id));
        }
        gateway
            .grant_role(message.guild_id, event.user_id, role_id)
            .await?;
        Ok(ReactionOutcome::Granted(role_id))
    }

    /// Revokes the bound role.
    #[instrument(skip(self, gateway), fields(message = event.message_id, user = event.user_id))]
    pub async fn on_reaction_removed(
        &self,
        gateway: &dyn RoleGateway,
        event: &ReactionEvent,
    ) -> Result<ReactionOutcome> {
        tokio::time::sleep(self.settle_delay).await;

        if event.user_id == gateway.bot_user_id() {
            return Ok(ReactionOutcome::OwnReaction);
        }
        let Some(message) = self.get(event.message_id).await else {
            return Ok(ReactionOutcome::Untracked);
        };
        let Some(role_id) = event.emoji.as_ref().and_then(|e| message.role_for(e)) else {
            return Ok(ReactionOutcome::Unmapped);
        };

        if !gateway
            .member_has_role(message.guild_id, event.user_id, role_id)
            .await?
        {
            return Ok(ReactionOutcome::NotHeld(role_id));
        }
        gateway
            .revoke_role(message.guild_id, event.user_id, role_id)
            .await?;
        Ok(ReactionOutcome::Revoked(role_id))
    }

    /// Stops tracking a legend. Only its creator may do this.
    #[instrument(skip(self))]
    pub async fn delete(&self, message_id: u64, requester_id: u64) -> Result<ReactionRoleMessage> {
        let mut messages = self.messages.write().await;
        let Some(message) = messages.get(&message_id) else {
            return Err(Error::NotFound {
                what: format!("Reaction-role message {message_id}"),
            });
        };
        if message.creator_id != requester_id {
            return Err(Error::PermissionDenied {
                reason: "Only the creator of a reaction-role message can delete it".to_string(),
            });
        }
        let removed = messages.remove(&message_id);
        drop(messages);

        if let Err(e) = self.store.delete(NAMESPACE, &message_id.to_string()).await {
            warn!("Could not remove stored reaction roles for {message_id}: {e}");
        }
        removed.ok_or_else(|| Error::NotFound {
            what: format!("Reaction-role message {message_id}"),
        })
    }

    /// Drops a mapping whose legend message was deleted.
    pub async fn forget_message(&self, message_id: u64) -> bool {
        if self.messages.write().await.remove(&message_id).is_none() {
            return false;
        }
        if let Err(e) = self.store.delete(NAMESPACE, &message_id.to_string()).await {
            warn!("Could not remove stored reaction roles for {message_id}: {e}");
        }
        true
    }

    /// Drops every mapping in a guild the bot left.
    pub async fn forget_guild(&self, guild_id: u64) -> usize {
        let removed: Vec<u64> = {
            let mut messages = self.messages.write().await;
            let ids: Vec<u64> = messages
                .values()
                .filter(|m| m.guild_id == guild_id)
                .map(|m| m.message_id)
                .collect();
            for id in &ids {
                messages.remove(id);
            }
            ids
        };

        for id in &removed {
            if let Err(e) = self.store.delete(NAMESPACE, &id.to_string()).await {
                warn!("Could not remove stored reaction roles for {id}: {e}");
            }
        }
        removed.len()
    }
}
