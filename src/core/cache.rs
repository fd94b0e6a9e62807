//! In-memory settings cache - The per-guild source of truth while the process runs.
//!
//! Command handlers read and mutate the cache directly. Only the reconciliation
//! loop writes to the store. The lock is held for the in-memory step only and
//! never across store I/O.
//!
//! A guild whose stored record could not be fetched is marked unloaded. Edits
//! made to it are journaled and it is left out of [`SettingsCache::snapshot`],
//! so a flush never writes defaults over a record it has not seen. Once a later
//! fetch succeeds the journal is replayed on top of the stored record.

use crate::{
    core::{
        settings::{GuildSettings, merge_with_defaults},
        store::SettingsStore,
    },
    errors::Result,
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Guild identifier as used by the core layer.
pub type GuildId = u64;

/// Summary of one hydration pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HydrateReport {
    /// Guilds loaded from a stored record
    pub loaded: usize,
    /// Guilds populated with defaults because nothing was stored
    pub defaulted: usize,
    /// Stored records that lacked fields and were completed from defaults
    pub migrated: usize,
    /// Guilds whose fetch failed and were marked unloaded
    pub failed: usize,
}

type Edit<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

struct Entries<T> {
    records: HashMap<GuildId, T>,
    /// Guilds whose stored record is unknown, with the edits made since
    unloaded: HashMap<GuildId, Vec<Edit<T>>>,
}

/// Map from guild id to a settings record of type `T`.
pub struct SettingsCache<T: GuildSettings> {
    entries: RwLock<Entries<T>>,
}

impl<T: GuildSettings> std::fmt::Debug for SettingsCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCache")
            .field("namespace", &T::NAMESPACE)
            .finish_non_exhaustive()
    }
}

impl<T: GuildSettings> Default for SettingsCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GuildSettings> SettingsCache<T> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                records: HashMap::new(),
                unloaded: HashMap::new(),
            }),
        }
    }

    /// Returns the cached record, or the defaults if the guild has none. Never mutates.
    pub async fn get_or_default(&self, guild_id: GuildId) -> T {
        self.entries
            .read()
            .await
            .records
            .get(&guild_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the guild currently has a cached record.
    pub async fn contains(&self, guild_id: GuildId) -> bool {
        self.entries.read().await.records.contains_key(&guild_id)
    }

    /// Whether the guild's stored record still has to be fetched.
    pub async fn is_unloaded(&self, guild_id: GuildId) -> bool {
        self.entries.read().await.unloaded.contains_key(&guild_id)
    }

    /// Guilds whose stored record still has to be fetched.
    pub async fn unloaded(&self) -> Vec<GuildId> {
        self.entries.read().await.unloaded.keys().copied().collect()
    }

    /// Assigns one named field, creating the record from defaults first if absent.
    ///
    /// The record is left untouched when the value is rejected.
    pub async fn set(&self, guild_id: GuildId, field: &str, value: &str) -> Result<T> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.records.get(&guild_id).cloned().unwrap_or_default();
        updated.set_field(field, value)?;
        entries.records.insert(guild_id, updated.clone());

        if let Some(edits) = entries.unloaded.get_mut(&guild_id) {
            let (field, value) = (field.to_string(), value.to_string());
            edits.push(Arc::new(move |record: &mut T| {
                // Validated above, so replaying cannot fail
                let _ = record.set_field(&field, &value);
            }));
        }
        debug!("{}[{guild_id}].{field} = {value}", T::NAMESPACE);
        Ok(updated)
    }

    /// Applies a typed mutation, creating the record from defaults first if absent.
    pub async fn modify<F>(&self, guild_id: GuildId, f: F) -> T
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let mut guard = self.entries.write().await;
        let entries = &mut *guard;
        let record = entries.records.entry(guild_id).or_default();
        f(record);
        let updated = record.clone();

        if let Some(edits) = entries.unloaded.get_mut(&guild_id) {
            edits.push(Arc::new(f));
        }
        updated
    }

    /// Replaces the record wholesale and clears any unloaded mark.
    pub async fn insert(&self, guild_id: GuildId, record: T) {
        let mut entries = self.entries.write().await;
        entries.unloaded.remove(&guild_id);
        entries.records.insert(guild_id, record);
    }

    /// Removes the guild's record and any pending edits. Returns the record if one was cached.
    pub async fn remove(&self, guild_id: GuildId) -> Option<T> {
        let mut entries = self.entries.write().await;
        entries.unloaded.remove(&guild_id);
        entries.records.remove(&guild_id)
    }

    /// Clones every record safe to persist, releasing the lock before returning.
    ///
    /// Unloaded guilds are left out.
    pub async fn snapshot(&self) -> Vec<(GuildId, T)> {
        let entries = self.entries.read().await;
        entries
            .records
            .iter()
            .filter(|(id, _)| !entries.unloaded.contains_key(id))
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// Number of cached guilds.
    pub async fn len(&self) -> usize {
        self.entries.read().await.records.len()
    }

    /// Whether nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.records.is_empty()
    }

    /// Loads every listed guild from the store.
    ///
    /// Stored records are merged over defaults; guilds with no record get defaults.
    /// A guild whose fetch fails and that has no trusted record is marked unloaded.
    /// It serves defaults but is not flushed until a later fetch succeeds.
    #[instrument(skip(self, store, guild_ids), fields(namespace = T::NAMESPACE, guilds = guild_ids.len()))]
    pub async fn hydrate_from_store(
        &self,
        store: &dyn SettingsStore,
        guild_ids: &[GuildId],
    ) -> HydrateReport {
        let mut report = HydrateReport::default();

        for &guild_id in guild_ids {
            match self.load_one(store, guild_id).await {
                Ok(Loaded::Stored { migrated }) => {
                    report.loaded += 1;
                    if migrated {
                        report.migrated += 1;
                    }
                }
                Ok(Loaded::Defaulted) => report.defaulted += 1,
                Err(e) => {
                    warn!(
                        "Could not hydrate {} settings for guild {guild_id}, will retry: {e}",
                        T::NAMESPACE
                    );
                    self.mark_unloaded(guild_id).await;
                    report.failed += 1;
                }
            }
        }

        info!(
            "Hydrated {} settings: {} loaded ({} migrated), {} defaulted, {} failed",
            T::NAMESPACE,
            report.loaded,
            report.migrated,
            report.defaulted,
            report.failed
        );
        report
    }

    /// Fetches every unloaded guild again. Guilds that still fail stay unloaded.
    pub async fn retry_unloaded(&self, store: &dyn SettingsStore) -> HydrateReport {
        let pending = self.unloaded().await;
        if pending.is_empty() {
            return HydrateReport::default();
        }
        self.hydrate_from_store(store, &pending).await
    }

    async fn mark_unloaded(&self, guild_id: GuildId) {
        let mut entries = self.entries.write().await;
        // A record loaded earlier is still trusted
        if !entries.records.contains_key(&guild_id) {
            entries.unloaded.entry(guild_id).or_default();
        }
    }

    async fn load_one(&self, store: &dyn SettingsStore, guild_id: GuildId) -> Result<Loaded> {
        let stored = store.fetch(T::NAMESPACE, &guild_id.to_string()).await?;

        let (mut record, loaded) = match stored {
            Some(value) => {
                let (record, migrated) = merge_with_defaults::<T>(value)?;
                (record, Loaded::Stored { migrated })
            }
            None => (T::default(), Loaded::Defaulted),
        };

        let mut entries = self.entries.write().await;
        if let Some(edits) = entries.unloaded.remove(&guild_id) {
            if !edits.is_empty() {
                debug!(
                    "Replaying {} edits onto stored {}[{guild_id}]",
                    edits.len(),
                    T::NAMESPACE
                );
            }
            for edit in &edits {
                edit(&mut record);
            }
        }
        entries.records.insert(guild_id, record);
        Ok(loaded)
    }
}

enum Loaded {
    Stored { migrated: bool },
    Defaulted,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::settings::{
        ContentFilter, DEFAULT_PREFIX, PrefixSettings, TempUnit, UnitPreferences,
    };
    use crate::test_utils::{MemoryStore, setup_test_store};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_or_default_without_record() {
        let cache = SettingsCache::<PrefixSettings>::new();
        assert_eq!(cache.get_or_default(1).await.prefix, DEFAULT_PREFIX);
        // Reading does not create a record
        assert!(!cache.contains(1).await);
    }

    #[tokio::test]
    async fn test_set_is_visible_immediately() -> Result<()> {
        let cache = SettingsCache::<PrefixSettings>::new();
        cache.set(1, "prefix", "?").await?;
        assert_eq!(cache.get_or_default(1).await.prefix, "?");
        assert_eq!(cache.get_or_default(2).await.prefix, DEFAULT_PREFIX);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_set_leaves_record_untouched() -> Result<()> {
        let cache = SettingsCache::<ContentFilter>::new();
        cache.set(1, "nsfw", "off").await?;
        assert!(cache.set(1, "nsfw", "sometimes").await.is_err());
        assert!(cache.set(2, "nsfw", "sometimes").await.is_err());

        assert!(!cache.get_or_default(1).await.nsfw);
        assert!(!cache.contains(2).await);
        Ok(())
    }

    #[tokio::test]
    async fn test_modify_creates_from_defaults() {
        let cache = SettingsCache::<UnitPreferences>::new();
        let updated = cache.modify(3, |u| u.temp = TempUnit::F).await;
        assert_eq!(updated.temp, TempUnit::F);
        assert_eq!(cache.get_or_default(3).await, updated);
    }

    #[tokio::test]
    async fn test_hydrate_loads_merges_and_defaults() {
        let store = MemoryStore::new();
        store.seed("content_filter", "1", json!({"nsfw": false}));
        store.seed("content_filter", "2", json!({"nsfw": false, "racist": false}));

        let cache = SettingsCache::<ContentFilter>::new();
        let report = cache.hydrate_from_store(&store, &[1, 2, 3]).await;

        assert_eq!(
            report,
            HydrateReport {
                loaded: 2,
                defaulted: 1,
                migrated: 1,
                failed: 0,
            }
        );
        assert_eq!(
            cache.get_or_default(1).await,
            ContentFilter {
                nsfw: false,
                racist: true
            }
        );
        assert!(cache.contains(3).await);
        assert_eq!(cache.get_or_default(3).await, ContentFilter::default());
    }

    #[tokio::test]
    async fn test_hydrate_is_idempotent() {
        let store = setup_test_store().await;
        store
            .upsert("prefix", "1", &json!({"prefix": "?"}))
            .await
            .unwrap();

        let cache = SettingsCache::<PrefixSettings>::new();
        cache.hydrate_from_store(&store, &[1, 2]).await;
        let mut first = cache.snapshot().await;
        cache.hydrate_from_store(&store, &[1, 2]).await;
        let mut second = cache.snapshot().await;

        first.sort_by_key(|(id, _)| *id);
        second.sort_by_key(|(id, _)| *id);
        assert_eq!(first, second);
        assert_eq!(first[0].1.prefix, "?");
    }

    #[tokio::test]
    async fn test_hydrate_failure_leaves_guild_uncached() {
        let store = MemoryStore::new();
        store.seed("prefix", "1", json!({"prefix": "?"}));
        store.set_unavailable(true);

        let cache = SettingsCache::<PrefixSettings>::new();
        let report = cache.hydrate_from_store(&store, &[1]).await;

        assert_eq!(report.failed, 1);
        assert!(!cache.contains(1).await);
        assert!(cache.is_unloaded(1).await);
        assert_eq!(cache.get_or_default(1).await.prefix, DEFAULT_PREFIX);
    }

    #[tokio::test]
    async fn test_unloaded_guild_is_not_snapshotted() -> Result<()> {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let cache = SettingsCache::<ContentFilter>::new();
        cache.hydrate_from_store(&store, &[1]).await;

        cache.set(1, "nsfw", "on").await?;
        cache.set(2, "nsfw", "off").await?;

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_replays_edits_over_stored_record() -> Result<()> {
        let store = MemoryStore::new();
        store.seed("content_filter", "1", json!({"nsfw": false, "racist": false}));
        store.set_unavailable(true);
        let cache = SettingsCache::<ContentFilter>::new();
        cache.hydrate_from_store(&store, &[1]).await;

        cache.set(1, "nsfw", "on").await?;
        // Still down: nothing changes
        assert_eq!(cache.retry_unloaded(&store).await.failed, 1);
        assert!(cache.is_unloaded(1).await);

        store.set_unavailable(false);
        let report = cache.retry_unloaded(&store).await;
        assert_eq!(report.loaded, 1);
        assert!(!cache.is_unloaded(1).await);
        assert_eq!(
            cache.get_or_default(1).await,
            ContentFilter {
                nsfw: true,
                racist: false
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_replays_typed_mutations() {
        let store = MemoryStore::new();
        store.seed("units", "4", json!({"temp": "C", "speed": "mph"}));
        store.set_unavailable(true);
        let cache = SettingsCache::<UnitPreferences>::new();
        cache.hydrate_from_store(&store, &[4]).await;

        cache.modify(4, |u| u.temp = TempUnit::F).await;
        store.set_unavailable(false);
        cache.retry_unloaded(&store).await;

        let units = cache.get_or_default(4).await;
        assert_eq!(units.temp, TempUnit::F);
        assert_eq!(units.speed, crate::core::settings::SpeedUnit::Mph);
    }

    #[tokio::test]
    async fn test_failed_rehydrate_keeps_trusted_record() -> Result<()> {
        let store = MemoryStore::new();
        let cache = SettingsCache::<PrefixSettings>::new();
        cache.hydrate_from_store(&store, &[1]).await;
        cache.set(1, "prefix", "?").await?;

        store.set_unavailable(true);
        cache.hydrate_from_store(&store, &[1]).await;

        assert!(!cache.is_unloaded(1).await);
        assert_eq!(cache.snapshot().await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_drops_record() -> Result<()> {
        let cache = SettingsCache::<PrefixSettings>::new();
        cache.set(1, "prefix", "$").await?;
        assert!(cache.remove(1).await.is_some());
        assert!(cache.remove(1).await.is_none());
        assert!(cache.is_empty().await);
        Ok(())
    }
}
