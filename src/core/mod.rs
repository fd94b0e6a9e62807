//! Core logic - framework-agnostic settings persistence, reaction roles and games.

/// Per-guild settings cache with store hydration
pub mod cache;
/// Expression evaluator with per-user variables
pub mod calculator;
/// Emoji identity and user input parsing
pub mod emoji;
/// Reaction-role mapping and role application
pub mod reaction_roles;
/// Periodic flush of settings caches to the store
pub mod reconcile;
/// Typed per-guild settings records
pub mod settings;
/// Key-value persistence abstraction and its `SeaORM` backend
pub mod store;
/// Tic-tac-toe game logic
pub mod tictactoe;
/// Temperature and speed conversion
pub mod units;
