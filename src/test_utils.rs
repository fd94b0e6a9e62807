//! Shared test utilities for `GuildBuddy`.
//!
//! Provides an in-memory `SQLite` setup, an in-memory store with failure
//! injection, and a recording fake of the Discord gateway.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        reaction_roles::RoleGateway,
        store::{SeaOrmStore, SettingsStore, StoreResult},
    },
    errors::{GatewayError, Result, StoreError},
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A [`SeaOrmStore`] over a fresh in-memory database.
pub async fn setup_test_store() -> SeaOrmStore {
    SeaOrmStore::new(setup_test_db().await.unwrap())
}

/// In-memory [`SettingsStore`] that can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Value>>,
    unavailable: AtomicBool,
    failing_keys: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    write_delay: Mutex<Duration>,
}

impl MemoryStore {
    /// Empty, healthy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a record without recording a call.
    pub fn seed(&self, namespace: &str, key: &str, value: Value) {
        self.records
            .lock()
            .unwrap()
            .insert((namespace.to_string(), key.to_string()), value);
    }

    /// Reads a record without recording a call.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    /// Makes every operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes every operation on `key` fail with [`StoreError::Unavailable`].
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Makes every upsert and update wait this long before touching the records.
    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = delay;
    }

    async fn wait_for_write(&self) {
        let delay = *self.write_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Write calls seen so far, as `"<op> <namespace>/<key>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &str, namespace: &str, key: &str) -> StoreResult<()> {
        if op == "upsert" || op == "update" {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{op} {namespace}/{key}"));
        }
        if self.unavailable.load(Ordering::SeqCst) || self.failing_keys.lock().unwrap().contains(key)
        {
            return Err(StoreError::Unavailable {
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn upsert(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()> {
        self.wait_for_write().await;
        self.check("upsert", namespace, key)?;
        let mut records = self.records.lock().unwrap();
        let id = (namespace.to_string(), key.to_string());
        if records.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        records.insert(id, value.clone());
        Ok(())
    }

    async fn update(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()> {
        self.wait_for_write().await;
        self.check("update", namespace, key)?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&(namespace.to_string(), key.to_string())) {
            Some(existing) => {
                *existing = value.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            }),
        }
    }

    async fn fetch(&self, namespace: &str, key: &str) -> StoreResult<Option<Value>> {
        self.check("fetch", namespace, key)?;
        Ok(self.get(namespace, key))
    }

    async fn fetch_all(&self, namespace: &str) -> StoreResult<Vec<(String, Value)>> {
        self.check("fetch_all", namespace, "")?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        self.check("delete", namespace, key)?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some())
    }

    async fn delete_all(&self, key: &str) -> StoreResult<u64> {
        self.check("delete_all", "*", key)?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|(_, k), _| k != key);
        Ok((before - records.len()) as u64)
    }
}

/// Bot user id reported by [`FakeGateway`].
pub const FAKE_BOT_ID: u64 = 9_000;

/// Recording [`RoleGateway`] with a single guild.
#[derive(Debug)]
pub struct FakeGateway {
    bot_top: u16,
    role_positions: Mutex<HashMap<u64, u16>>,
    member_roles: Mutex<HashSet<(u64, u64)>>,
    next_message_id: AtomicU64,
    posted: Mutex<Vec<u64>>,
    deleted: Mutex<Vec<u64>>,
    reactions: Mutex<HashMap<u64, Vec<String>>>,
    rejected_emojis: Mutex<HashSet<String>>,
    removed_reactions: Mutex<Vec<(u64, String)>>,
    grants: AtomicUsize,
    revokes: AtomicUsize,
    role_queries: AtomicUsize,
}

impl FakeGateway {
    /// Gateway whose bot has its highest role at `bot_top`.
    pub fn new(bot_top: u16) -> Self {
        Self {
            bot_top,
            role_positions: Mutex::new(HashMap::new()),
            member_roles: Mutex::new(HashSet::new()),
            next_message_id: AtomicU64::new(5_000),
            posted: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            reactions: Mutex::new(HashMap::new()),
            rejected_emojis: Mutex::new(HashSet::new()),
            removed_reactions: Mutex::new(Vec::new()),
            grants: AtomicUsize::new(0),
            revokes: AtomicUsize::new(0),
            role_queries: AtomicUsize::new(0),
        }
    }

    /// Creates a role at `position`.
    pub fn add_role(&self, role_id: u64, position: u16) {
        self.role_positions.lock().unwrap().insert(role_id, position);
    }

    /// Makes `add_reaction` fail for this emoji.
    pub fn reject_emoji(&self, emoji: &str) {
        self.rejected_emojis.lock().unwrap().insert(emoji.to_string());
    }

    /// Whether the user holds the role.
    pub fn has_role(&self, user_id: u64, role_id: u64) -> bool {
        self.member_roles.lock().unwrap().contains(&(user_id, role_id))
    }

    /// Bot reactions on a message, in order.
    pub fn reactions(&self, message_id: u64) -> Vec<String> {
        self.reactions
            .lock()
            .unwrap()
            .get(&message_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of legends posted.
    pub fn posted_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }

    /// Messages deleted.
    pub fn deleted_messages(&self) -> Vec<u64> {
        self.deleted.lock().unwrap().clone()
    }

    /// User reactions removed, as `(user, emoji)`.
    pub fn removed_reactions(&self) -> Vec<(u64, String)> {
        self.removed_reactions.lock().unwrap().clone()
    }

    /// Number of `grant_role` calls.
    pub fn grant_calls(&self) -> usize {
        self.grants.load(Ordering::SeqCst)
    }

    /// Number of `revoke_role` calls.
    pub fn revoke_calls(&self) -> usize {
        self.revokes.load(Ordering::SeqCst)
    }

    /// Number of `member_has_role` lookups.
    pub fn role_query_calls(&self) -> usize {
        self.role_queries.load(Ordering::SeqCst)
    }
}

type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[async_trait]
impl RoleGateway for FakeGateway {
    fn bot_user_id(&self) -> u64 {
        FAKE_BOT_ID
    }

    async fn bot_top_role_position(&self, _guild_id: u64) -> GatewayResult<u16> {
        Ok(self.bot_top)
    }

    async fn role_position(&self, _guild_id: u64, role_id: u64) -> GatewayResult<Option<u16>> {
        Ok(self.role_positions.lock().unwrap().get(&role_id).copied())
    }

    async fn post_legend(&self, _channel_id: u64, _title: &str, _legend: &str) -> GatewayResult<u64> {
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.posted.lock().unwrap().push(id);
        Ok(id)
    }

    async fn delete_message(&self, _channel_id: u64, message_id: u64) -> GatewayResult<()> {
        self.deleted.lock().unwrap().push(message_id);
        Ok(())
    }

    async fn add_reaction(&self, _channel_id: u64, message_id: u64, emoji: &str) -> GatewayResult<()> {
        if self.rejected_emojis.lock().unwrap().contains(emoji) {
            return Err(GatewayError::NotFound);
        }
        self.reactions
            .lock()
            .unwrap()
            .entry(message_id)
            .or_default()
            .push(emoji.to_string());
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel_id: u64,
        _message_id: u64,
        user_id: u64,
        emoji: &str,
    ) -> GatewayResult<()> {
        self.removed_reactions
            .lock()
            .unwrap()
            .push((user_id, emoji.to_string()));
        Ok(())
    }

    async fn member_has_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<bool> {
        self.role_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.has_role(user_id, role_id))
    }

    async fn grant_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        self.grants.fetch_add(1, Ordering::SeqCst);
        self.member_roles.lock().unwrap().insert((user_id, role_id));
        Ok(())
    }

    async fn revoke_role(&self, _guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        self.revokes.fetch_add(1, Ordering::SeqCst);
        self.member_roles.lock().unwrap().remove(&(user_id, role_id));
        Ok(())
    }
}
