//! Guild settings records - The typed configuration each feature module keeps per guild.
//!
//! Records are plain structs with named fields. Stored JSON is merged over the
//! record defaults on load, so fields added after a record was written pick up
//! their default instead of failing to decode.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt::{self, Debug};

/// A per-guild settings record owned by one feature module.
pub trait GuildSettings:
    Serialize + DeserializeOwned + Default + Clone + PartialEq + Debug + Send + Sync + 'static
{
    /// Store namespace for this record type.
    const NAMESPACE: &'static str;

    /// Names of the fields accepted by [`GuildSettings::set_field`].
    const FIELDS: &'static [&'static str];

    /// Parses `value` and assigns it to the named field.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for an unknown field or an unparseable value.
    fn set_field(&mut self, field: &str, value: &str) -> Result<()>;
}

/// Builds a record from stored JSON, filling fields the stored document lacks from defaults.
///
/// Returns the record and whether any default had to be filled in.
pub fn merge_with_defaults<T: GuildSettings>(stored: Value) -> Result<(T, bool)> {
    let mut merged = serde_json::to_value(T::default())?;
    let filled = match (&mut merged, stored) {
        (Value::Object(base), Value::Object(stored)) => {
            let filled = base.keys().any(|k| !stored.contains_key(k));
            base.extend(stored);
            filled
        }
        (_, stored) => {
            return Err(Error::InvalidInput {
                message: format!(
                    "stored {} record is not an object: {stored}",
                    T::NAMESPACE
                ),
            });
        }
    };

    Ok((serde_json::from_value(merged)?, filled))
}

fn unknown_field<T: GuildSettings>(field: &str) -> Error {
    Error::InvalidInput {
        message: format!(
            "Unknown setting `{field}`. Valid settings: {}",
            T::FIELDS.join(", ")
        ),
    }
}

/// Parses a user-facing toggle such as `on`, `off`, `true`, `no`.
pub fn parse_toggle(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "enable" | "enabled" | "1" => Ok(true),
        "off" | "false" | "no" | "disable" | "disabled" | "0" => Ok(false),
        other => Err(Error::InvalidInput {
            message: format!("`{other}` is not a toggle, use `on` or `off`"),
        }),
    }
}

/// Default command prefix.
pub const DEFAULT_PREFIX: &str = "!";

/// Longest prefix accepted.
pub const MAX_PREFIX_LEN: usize = 5;

/// Command prefix for text commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixSettings {
    /// Text that must precede a prefix command
    pub prefix: String,
}

impl Default for PrefixSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl GuildSettings for PrefixSettings {
    const NAMESPACE: &'static str = "prefix";
    const FIELDS: &'static [&'static str] = &["prefix"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        if field != "prefix" {
            return Err(unknown_field::<Self>(field));
        }
        let value = value.trim();
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput {
                message: "A prefix cannot be empty or contain spaces".to_string(),
            });
        }
        if value.chars().count() > MAX_PREFIX_LEN {
            return Err(Error::InvalidInput {
                message: format!("A prefix can be at most {MAX_PREFIX_LEN} characters long"),
            });
        }
        self.prefix = value.to_string();
        Ok(())
    }
}

/// Content blacklist flags. `true` means the category is blocked.
///
/// The flags are stored per guild for content-serving modules to consult.
/// Nothing in this crate filters messages on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilter {
    /// Block NSFW content
    pub nsfw: bool,
    /// Block racist content
    pub racist: bool,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            nsfw: true,
            racist: true,
        }
    }
}

impl GuildSettings for ContentFilter {
    const NAMESPACE: &'static str = "content_filter";
    const FIELDS: &'static [&'static str] = &["nsfw", "racist"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let flag = match field {
            "nsfw" => &mut self.nsfw,
            "racist" => &mut self.racist,
            _ => return Err(unknown_field::<Self>(field)),
        };
        *flag = parse_toggle(value)?;
        Ok(())
    }
}

/// Temperature display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempUnit {
    /// Degrees Celsius
    #[default]
    C,
    /// Degrees Fahrenheit
    F,
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::C => write!(f, "°C"),
            Self::F => write!(f, "°F"),
        }
    }
}

/// Speed display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Kilometres per hour
    #[default]
    Kph,
    /// Miles per hour
    Mph,
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kph => write!(f, "km/h"),
            Self::Mph => write!(f, "mph"),
        }
    }
}

/// Measurement unit preferences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitPreferences {
    /// Temperature unit
    pub temp: TempUnit,
    /// Speed unit
    pub speed: SpeedUnit,
}

impl GuildSettings for UnitPreferences {
    const NAMESPACE: &'static str = "units";
    const FIELDS: &'static [&'static str] = &["temp", "speed"];

    fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim().to_lowercase();
        match field {
            "temp" => {
                self.temp = match value.as_str() {
                    "c" | "celsius" => TempUnit::C,
                    "f" | "fahrenheit" => TempUnit::F,
                    _ => {
                        return Err(Error::InvalidInput {
                            message: format!("`{value}` is not a temperature unit, use C or F"),
                        });
                    }
                };
            }
            "speed" => {
                self.speed = match value.as_str() {
                    "kph" | "kmh" | "km/h" => SpeedUnit::Kph,
                    "mph" => SpeedUnit::Mph,
                    _ => {
                        return Err(Error::InvalidInput {
                            message: format!("`{value}` is not a speed unit, use kph or mph"),
                        });
                    }
                };
            }
            _ => return Err(unknown_field::<Self>(field)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_preferences_wire_format() {
        let value = serde_json::to_value(UnitPreferences::default()).unwrap();
        assert_eq!(value, json!({"temp": "C", "speed": "kph"}));
    }

    #[test]
    fn test_merge_fills_new_fields() {
        // Written before `racist` existed
        let (filter, filled): (ContentFilter, bool) =
            merge_with_defaults(json!({"nsfw": false})).unwrap();
        assert!(filled);
        assert!(!filter.nsfw);
        assert!(filter.racist);
    }

    #[test]
    fn test_merge_complete_record_fills_nothing() {
        let (units, filled): (UnitPreferences, bool) =
            merge_with_defaults(json!({"temp": "F", "speed": "mph"})).unwrap();
        assert!(!filled);
        assert_eq!(units.temp, TempUnit::F);
        assert_eq!(units.speed, SpeedUnit::Mph);
    }

    #[test]
    fn test_merge_ignores_retired_fields() {
        let (prefix, _): (PrefixSettings, bool) =
            merge_with_defaults(json!({"prefix": "?", "old_flag": true})).unwrap();
        assert_eq!(prefix.prefix, "?");
    }

    #[test]
    fn test_merge_rejects_non_object() {
        let result = merge_with_defaults::<PrefixSettings>(json!("?"));
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_prefix_validation() {
        let mut settings = PrefixSettings::default();
        assert!(settings.set_field("prefix", "").is_err());
        assert!(settings.set_field("prefix", "a b").is_err());
        assert!(settings.set_field("prefix", "toolong").is_err());
        assert!(settings.set_field("colour", "?").is_err());
        settings.set_field("prefix", " >> ").unwrap();
        assert_eq!(settings.prefix, ">>");
    }

    #[test]
    fn test_filter_toggles() {
        let mut filter = ContentFilter::default();
        filter.set_field("nsfw", "off").unwrap();
        assert!(!filter.nsfw);
        filter.set_field("nsfw", "YES").unwrap();
        assert!(filter.nsfw);
        assert!(filter.set_field("racist", "maybe").is_err());
        assert!(filter.set_field("gore", "on").is_err());
    }

    #[test]
    fn test_unit_parsing() {
        let mut units = UnitPreferences::default();
        units.set_field("temp", "Fahrenheit").unwrap();
        units.set_field("speed", "MPH").unwrap();
        assert_eq!(units.temp, TempUnit::F);
        assert_eq!(units.speed, SpeedUnit::Mph);
        assert!(units.set_field("temp", "K").is_err());
    }
}
