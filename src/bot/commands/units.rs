//! Unit conversion commands - readings shown in the server's preferred units.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        core::{
            settings::{SpeedUnit, TempUnit, UnitPreferences},
            units::{format_speed, format_temperature},
        },
        errors::{Error, Result},
    };

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum TemperatureInput {
        #[name = "Celsius"]
        Celsius,
        #[name = "Fahrenheit"]
        Fahrenheit,
    }

    impl From<TemperatureInput> for TempUnit {
        fn from(value: TemperatureInput) -> Self {
            match value {
                TemperatureInput::Celsius => Self::C,
                TemperatureInput::Fahrenheit => Self::F,
            }
        }
    }

    #[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
    pub enum SpeedInput {
        #[name = "km/h"]
        Kph,
        #[name = "mph"]
        Mph,
    }

    impl From<SpeedInput> for SpeedUnit {
        fn from(value: SpeedInput) -> Self {
            match value {
                SpeedInput::Kph => Self::Kph,
                SpeedInput::Mph => Self::Mph,
            }
        }
    }

    /// Converts a temperature into this server's preferred unit.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn temperature(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reading"] value: f64,
        #[description = "Unit of the reading"] unit: TemperatureInput,
    ) -> Result<()> {
        let prefs = match ctx.guild_id() {
            Some(guild_id) => ctx.data().units.cache().get_or_default(guild_id.get()).await,
            None => UnitPreferences::default(),
        };
        let from = TempUnit::from(unit);
        ctx.say(format!(
            "🌡️ {value}{from} is **{}**",
            format_temperature(value, from, prefs.temp)
        ))
        .await?;
        Ok(())
    }

    /// Converts a speed into this server's preferred unit.
    #[poise::command(slash_command, prefix_command, guild_only)]
    pub async fn speed(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Reading"] value: f64,
        #[description = "Unit of the reading"] unit: SpeedInput,
    ) -> Result<()> {
        let prefs = match ctx.guild_id() {
            Some(guild_id) => ctx.data().units.cache().get_or_default(guild_id.get()).await,
            None => UnitPreferences::default(),
        };
        let from = SpeedUnit::from(unit);
        ctx.say(format!(
            "🏎️ {value} {from} is **{}**",
            format_speed(value, from, prefs.speed)
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
