//! Discord interaction handlers
//!
//! This module provides handlers for Discord interactions such as autocomplete
//! and the gateway events the framework forwards to us.

/// Autocomplete handlers for setting names and values
pub mod autocomplete;
/// Gateway event handling (reactions, guild membership, message deletion)
pub mod events;
