//! Settings store - Durable key-value persistence for feature modules.
//!
//! Records are JSON documents addressed by `(namespace, key)`. The store reports
//! duplicate inserts instead of overwriting, so callers decide when to update;
//! [`SettingsStore::upsert_or_update`] wraps that decision for stores without a
//! native upsert.

use crate::{
    entities::{GuildRecord, guild_record},
    errors::StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DbErr, Set, SqlErr, prelude::*, sea_query::Expr};
use serde_json::Value;
use tracing::{debug, instrument};

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// How a successful [`SettingsStore::upsert_or_update`] landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No record existed, a new one was inserted
    Inserted,
    /// An existing record was overwritten
    Updated,
}

/// Pluggable persistence backend for per-guild records.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Inserts a new record.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateKey`] if the key already exists.
    async fn upsert(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()>;

    /// Overwrites an existing record.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if the key is absent.
    async fn update(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()>;

    /// Fetches a record, `None` if absent.
    async fn fetch(&self, namespace: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Fetches every record of a namespace.
    async fn fetch_all(&self, namespace: &str) -> StoreResult<Vec<(String, Value)>>;

    /// Removes one record. Returns whether it existed.
    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool>;

    /// Removes `key` from every namespace. Returns the number of records removed.
    async fn delete_all(&self, key: &str) -> StoreResult<u64>;

    /// Inserts the record, falling back to an update when the key already exists.
    async fn upsert_or_update(
        &self,
        namespace: &str,
        key: &str,
        value: &Value,
    ) -> StoreResult<WriteOutcome> {
        match self.upsert(namespace, key, value).await {
            Ok(()) => Ok(WriteOutcome::Inserted),
            Err(StoreError::DuplicateKey { .. }) => {
                debug!("{namespace}/{key} exists, updating instead");
                self.update(namespace, key, value)
                    .await
                    .map(|()| WriteOutcome::Updated)
            }
            Err(e) => Err(e),
        }
    }
}

/// [`SettingsStore`] backed by the `guild_records` table.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Wraps an open connection. Tables must already exist.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn unavailable(err: &DbErr) -> StoreError {
    StoreError::Unavailable {
        message: err.to_string(),
    }
}

fn decode(namespace: &str, key: &str, raw: &str) -> StoreResult<Value> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        namespace: namespace.to_string(),
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl SettingsStore for SeaOrmStore {
    #[instrument(skip(self, value))]
    async fn upsert(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()> {
        let record = guild_record::ActiveModel {
            namespace: Set(namespace.to_string()),
            record_key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };

        match GuildRecord::insert(record)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(StoreError::DuplicateKey {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(unavailable(&e)),
            },
        }
    }

    #[instrument(skip(self, value))]
    async fn update(&self, namespace: &str, key: &str, value: &Value) -> StoreResult<()> {
        let result = GuildRecord::update_many()
            .col_expr(guild_record::Column::Value, Expr::value(value.to_string()))
            .col_expr(guild_record::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(guild_record::Column::Namespace.eq(namespace))
            .filter(guild_record::Column::RecordKey.eq(key))
            .exec(&self.db)
            .await
            .map_err(|e| unavailable(&e))?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch(&self, namespace: &str, key: &str) -> StoreResult<Option<Value>> {
        let record = GuildRecord::find_by_id((namespace.to_string(), key.to_string()))
            .one(&self.db)
            .await
            .map_err(|e| unavailable(&e))?;

        record
            .map(|r| decode(namespace, key, &r.value))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_all(&self, namespace: &str) -> StoreResult<Vec<(String, Value)>> {
        let records = GuildRecord::find()
            .filter(guild_record::Column::Namespace.eq(namespace))
            .all(&self.db)
            .await
            .map_err(|e| unavailable(&e))?;

        records
            .into_iter()
            .map(|r| decode(namespace, &r.record_key, &r.value).map(|v| (r.record_key, v)))
            .collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, namespace: &str, key: &str) -> StoreResult<bool> {
        let result = GuildRecord::delete_many()
            .filter(guild_record::Column::Namespace.eq(namespace))
            .filter(guild_record::Column::RecordKey.eq(key))
            .exec(&self.db)
            .await
            .map_err(|e| unavailable(&e))?;
        Ok(result.rows_affected > 0)
    }

    #[instrument(skip(self))]
    async fn delete_all(&self, key: &str) -> StoreResult<u64> {
        let result = GuildRecord::delete_many()
            .filter(guild_record::Column::RecordKey.eq(key))
            .exec(&self.db)
            .await
            .map_err(|e| unavailable(&e))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_then_fetch() -> StoreResult<()> {
        let store = setup_test_store().await;

        store.upsert("prefix", "1", &json!({"prefix": "?"})).await?;
        let fetched = store.fetch("prefix", "1").await?;
        assert_eq!(fetched, Some(json!({"prefix": "?"})));

        assert_eq!(store.fetch("prefix", "2").await?, None);
        assert_eq!(store.fetch("units", "1").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_duplicate_key_is_reported() -> StoreResult<()> {
        let store = setup_test_store().await;

        store.upsert("prefix", "1", &json!({"prefix": "?"})).await?;
        let second = store.upsert("prefix", "1", &json!({"prefix": "$"})).await;
        assert!(matches!(second, Err(StoreError::DuplicateKey { .. })));

        // The original value is left untouched
        assert_eq!(
            store.fetch("prefix", "1").await?,
            Some(json!({"prefix": "?"}))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_key_is_not_found() {
        let store = setup_test_store().await;
        let result = store.update("prefix", "1", &json!({"prefix": "?"})).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_upsert_or_update_converges() -> StoreResult<()> {
        let store = setup_test_store().await;
        let value = json!({"prefix": "?"});

        let first = store.upsert_or_update("prefix", "1", &value).await?;
        let second = store.upsert_or_update("prefix", "1", &value).await?;
        assert_eq!(first, WriteOutcome::Inserted);
        assert_eq!(second, WriteOutcome::Updated);
        assert_eq!(store.fetch("prefix", "1").await?, Some(value));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_all_is_scoped_to_namespace() -> StoreResult<()> {
        let store = setup_test_store().await;
        store.upsert("reaction_roles", "10", &json!({"a": 1})).await?;
        store.upsert("reaction_roles", "11", &json!({"a": 2})).await?;
        store.upsert("prefix", "10", &json!({"prefix": "!"})).await?;

        let mut all = store.fetch_all("reaction_roles").await?;
        all.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], ("10".to_string(), json!({"a": 1})));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_and_delete_all() -> StoreResult<()> {
        let store = setup_test_store().await;
        store.upsert("prefix", "5", &json!({})).await?;
        store.upsert("units", "5", &json!({})).await?;
        store.upsert("units", "6", &json!({})).await?;

        assert!(store.delete("prefix", "5").await?);
        assert!(!store.delete("prefix", "5").await?);

        assert_eq!(store.delete_all("5").await?, 1);
        assert_eq!(store.fetch("units", "5").await?, None);
        assert!(store.fetch("units", "6").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported() {
        let db = crate::test_utils::setup_test_db().await.unwrap();
        let record = guild_record::ActiveModel {
            namespace: Set("prefix".to_string()),
            record_key: Set("9".to_string()),
            value: Set("{not json".to_string()),
            updated_at: Set(Utc::now()),
        };
        GuildRecord::insert(record)
            .exec_without_returning(&db)
            .await
            .unwrap();

        let store = SeaOrmStore::new(db);
        let result = store.fetch("prefix", "9").await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
