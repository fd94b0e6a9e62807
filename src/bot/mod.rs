//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the `GuildBuddy` application:
//! slash and prefix commands, gateway event handlers, the serenity-backed
//! [`gateway::SerenityGateway`] and the shared [`BotData`].

/// Client construction, framework options and shutdown
pub mod client;
/// Discord command implementations (settings, reaction roles, utilities)
pub mod commands;
/// `RoleGateway` implementation over serenity HTTP
pub mod gateway;
/// Discord interaction handlers (autocomplete, gateway events)
pub mod handlers;

pub use client::run_bot;

use crate::{
    config::AppConfig,
    core::{
        cache::GuildId,
        calculator::CalculatorState,
        reaction_roles::ReactionRoleRegistry,
        reconcile::Reconciler,
        settings::{ContentFilter, PrefixSettings, UnitPreferences},
        store::{SeaOrmStore, SettingsStore},
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared data available to all bot commands and event handlers.
///
/// Each settings module owns its cache and reconciliation loop. Everything is
/// behind `Arc` so event handlers can hold it across awaits.
#[derive(Clone, Debug)]
pub struct BotData {
    /// Per-guild command prefix
    pub prefix: Arc<Reconciler<PrefixSettings>>,
    /// Per-guild content filter toggles
    pub content_filter: Arc<Reconciler<ContentFilter>>,
    /// Per-guild measurement unit preferences
    pub units: Arc<Reconciler<UnitPreferences>>,
    /// Tracked reaction-role legends
    pub reaction_roles: Arc<ReactionRoleRegistry>,
    /// Per-user calculator variables
    pub calculator: Arc<CalculatorState>,
}

impl BotData {
    /// Wires every module to its own store handle over `db`.
    #[must_use]
    pub fn new(db: &DatabaseConnection, config: &AppConfig) -> Self {
        let store = |db: &DatabaseConnection| -> Arc<dyn SettingsStore> {
            Arc::new(SeaOrmStore::new(db.clone()))
        };

        Self {
            prefix: Arc::new(Reconciler::new(
                store(db),
                config.reconcile.prefix_interval(),
            )),
            content_filter: Arc::new(Reconciler::new(
                store(db),
                config.reconcile.filter_interval(),
            )),
            units: Arc::new(Reconciler::new(
                store(db),
                config.reconcile.units_interval(),
            )),
            reaction_roles: Arc::new(ReactionRoleRegistry::new(
                store(db),
                config.reaction_roles.settle_delay(),
                config.reaction_roles.max_pairs(),
            )),
            calculator: Arc::new(CalculatorState::new()),
        }
    }

    /// Hydrates every module for the guilds in the ready payload and starts the loops.
    pub async fn start(&self, guild_ids: &[GuildId]) -> Result<()> {
        let prefix = self.prefix.start(guild_ids).await?;
        let filter = self.content_filter.start(guild_ids).await?;
        let units = self.units.start(guild_ids).await?;
        info!(
            guilds = guild_ids.len(),
            ?prefix,
            ?filter,
            ?units,
            "Settings hydrated, reconciliation loops running"
        );

        match self.reaction_roles.hydrate().await {
            Ok(count) => info!("Tracking {count} reaction-role messages"),
            Err(e) => warn!("Could not load reaction-role messages: {e}"),
        }
        Ok(())
    }

    /// Loads settings for a guild the bot just joined.
    pub async fn join_guild(&self, guild_id: GuildId) {
        self.prefix.hydrate_guild(guild_id).await;
        self.content_filter.hydrate_guild(guild_id).await;
        self.units.hydrate_guild(guild_id).await;
        info!(guild = guild_id, "Joined guild");
    }

    /// Drops all state for a guild the bot was removed from.
    pub async fn forget_guild(&self, guild_id: GuildId) {
        self.prefix.forget_guild(guild_id).await;
        self.content_filter.forget_guild(guild_id).await;
        self.units.forget_guild(guild_id).await;
        let legends = self.reaction_roles.forget_guild(guild_id).await;
        info!(guild = guild_id, legends, "Left guild, state dropped");
    }

    /// Stops every loop with a final flush and re-persists reaction roles.
    pub async fn shutdown(&self) {
        let reports = [
            ("prefix", self.prefix.stop().await),
            ("content_filter", self.content_filter.stop().await),
            ("units", self.units.stop().await),
        ];
        for (module, report) in reports {
            match report {
                Some(report) if report.failed > 0 => {
                    warn!(module, ?report, "Final flush left records unsaved");
                }
                Some(report) => info!(module, ?report, "Final flush complete"),
                None => {}
            }
        }

        let failed = self.reaction_roles.flush().await;
        if failed > 0 {
            warn!("{failed} reaction-role messages could not be saved on shutdown");
        }
    }
}
