//! Guild record entity - One persisted JSON document per feature namespace and key.
//!
//! Settings caches store one row per guild (`record_key` is the guild id) and the
//! reaction-role registry stores one row per tracked message.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guild_records")]
pub struct Model {
    /// Feature module that owns the record (e.g., `"prefix"`, `"reaction_roles"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,
    /// Key inside the namespace, usually a guild or message id
    #[sea_orm(primary_key, auto_increment = false)]
    pub record_key: String,
    /// JSON-encoded record body
    #[sea_orm(column_type = "Text")]
    pub value: String,
    /// When this record was last written
    pub updated_at: DateTimeUtc,
}

/// `GuildRecord` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
