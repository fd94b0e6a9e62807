//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod guild_record;

pub use guild_record::{
    Column as GuildRecordColumn, Entity as GuildRecord, Model as GuildRecordModel,
};
