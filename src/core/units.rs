//! Unit conversion for temperature and speed readings.

use crate::core::settings::{SpeedUnit, TempUnit};

/// Converts a temperature between units.
#[must_use]
pub fn convert_temperature(value: f64, from: TempUnit, to: TempUnit) -> f64 {
    match (from, to) {
        (TempUnit::C, TempUnit::F) => value * 9.0 / 5.0 + 32.0,
        (TempUnit::F, TempUnit::C) => (value - 32.0) * 5.0 / 9.0,
        _ => value,
    }
}

/// Kilometres in one mile.
const KM_PER_MILE: f64 = 1.609_344;

/// Converts a speed between units.
#[must_use]
pub fn convert_speed(value: f64, from: SpeedUnit, to: SpeedUnit) -> f64 {
    match (from, to) {
        (SpeedUnit::Mph, SpeedUnit::Kph) => value * KM_PER_MILE,
        (SpeedUnit::Kph, SpeedUnit::Mph) => value / KM_PER_MILE,
        _ => value,
    }
}

/// Formats a temperature in the preferred unit, e.g. `"21.1°C"`.
#[must_use]
pub fn format_temperature(value: f64, from: TempUnit, preferred: TempUnit) -> String {
    format!("{:.1}{preferred}", convert_temperature(value, from, preferred))
}

/// Formats a speed in the preferred unit, e.g. `"96.6 km/h"`.
#[must_use]
pub fn format_speed(value: f64, from: SpeedUnit, preferred: SpeedUnit) -> String {
    format!("{:.1} {preferred}", convert_speed(value, from, preferred))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_temperature_conversion() {
        assert!(close(convert_temperature(100.0, TempUnit::C, TempUnit::F), 212.0));
        assert!(close(convert_temperature(-40.0, TempUnit::F, TempUnit::C), -40.0));
        assert!(close(convert_temperature(12.5, TempUnit::C, TempUnit::C), 12.5));
    }

    #[test]
    fn test_speed_conversion() {
        assert!(close(convert_speed(60.0, SpeedUnit::Mph, SpeedUnit::Kph), 96.560_64));
        assert!(close(convert_speed(1.609_344, SpeedUnit::Kph, SpeedUnit::Mph), 1.0));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_temperature(70.0, TempUnit::F, TempUnit::C), "21.1°C");
        assert_eq!(format_speed(60.0, SpeedUnit::Mph, SpeedUnit::Kph), "96.6 km/h");
    }
}
