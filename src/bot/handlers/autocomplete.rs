//! Autocomplete handlers for Discord slash command parameters.
//!
//! Setting names come from each record's `FIELDS`, so a new field shows up in
//! suggestions without touching this module.

use crate::{
    bot::BotData,
    core::settings::{ContentFilter, GuildSettings, UnitPreferences},
    errors::Error,
};

/// Case-insensitive substring match over a fixed list.
fn matching(options: &[&str], partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    options
        .iter()
        .filter(|option| option.to_lowercase().contains(&partial_lower))
        .map(|&option| option.to_string())
        .take(25) // Discord autocomplete limit
        .collect()
}

/// Suggests content filter categories.
pub async fn autocomplete_filter_field(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(ContentFilter::FIELDS, partial)
}

/// Suggests on/off for toggles.
pub async fn autocomplete_toggle(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(&["on", "off"], partial)
}

/// Suggests unit preference names.
pub async fn autocomplete_units_field(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(UnitPreferences::FIELDS, partial)
}

/// Suggests every accepted unit value. Parsing rejects values for the wrong field.
pub async fn autocomplete_units_value(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching(&["C", "F", "kph", "mph"], partial)
}
