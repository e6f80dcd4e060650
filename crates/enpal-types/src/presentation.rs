// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Enpal Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Presentation rules shared by every Enpal sensor: rounding, sign clamping,
//! unit-driven state class and the battery level icon tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Home Assistant device class of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Power,
    Energy,
    Voltage,
    Current,
    Battery,
}

impl DeviceClass {
    /// Value Home Assistant expects in the `device_class` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Energy => "energy",
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Battery => "battery",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a reading is a point-in-time value or a counter reset every day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
    TotalIncreasing,
}

impl StateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Measurement => "measurement",
            Self::TotalIncreasing => "total_increasing",
        }
    }
}

impl fmt::Display for StateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign clamp applied after rounding
///
/// Used to split one bidirectional flow (grid, battery, phase power) into
/// separate "in" and "out" gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignClamp {
    #[default]
    None,
    /// Negative readings become 0
    PositiveOnly,
    /// Result is `-min(value, 0)`: negative readings are shown as a positive
    /// magnitude, positive readings become 0
    NegativeOnly,
}

/// Round to 2 decimal places
///
/// Goes through the correctly rounded decimal formatter, so exact binary
/// ties round half to even and no error is picked up from scaling.
/// Non-finite values are returned unchanged.
pub fn round_to_hundredths(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse::<f64>().unwrap_or(value)
}

/// Produce the displayed value for a raw reading
pub fn normalize(raw: f64, clamp: SignClamp) -> f64 {
    let rounded = round_to_hundredths(raw);
    let value = match clamp {
        SignClamp::None => rounded,
        SignClamp::PositiveOnly => rounded.max(0.0),
        SignClamp::NegativeOnly => -rounded.min(0.0),
    };
    // -min(5.3, 0.0) is -0.0; publish it as a plain zero
    if value == 0.0 { 0.0 } else { value }
}

/// Energy counters (`kWh`, `Wh`) are daily totals, everything else is a measurement
pub fn state_class_for_unit(unit: &str) -> StateClass {
    match unit {
        "kWh" | "Wh" => StateClass::TotalIncreasing,
        _ => StateClass::Measurement,
    }
}

/// `last_reset` attribute for energy counters: the start of the current UTC day
pub fn last_reset_for(unit: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if state_class_for_unit(unit) != StateClass::TotalIncreasing {
        return None;
    }
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
}

const BATTERY_TIERS: [(f64, &str); 10] = [
    (0.0, "mdi:battery-outline"),
    (10.0, "mdi:battery-10"),
    (20.0, "mdi:battery-20"),
    (30.0, "mdi:battery-30"),
    (40.0, "mdi:battery-40"),
    (50.0, "mdi:battery-50"),
    (60.0, "mdi:battery-60"),
    (70.0, "mdi:battery-70"),
    (80.0, "mdi:battery-80"),
    (90.0, "mdi:battery-90"),
];

const BATTERY_FULL_ICON: &str = "mdi:battery";

/// Icon tier for a storage level in percent
///
/// Buckets are inclusive integer ranges (0-9, 10-19, ... 90-99) plus 100 for
/// a full battery. Anything outside 0..=100 has no tier.
pub fn battery_level_icon(level: f64) -> Option<&'static str> {
    let level = level.trunc();
    if !(0.0..=100.0).contains(&level) {
        return None;
    }
    if level >= 100.0 {
        return Some(BATTERY_FULL_ICON);
    }
    BATTERY_TIERS
        .iter()
        .rev()
        .find(|(floor, _)| level >= *floor)
        .map(|(_, icon)| *icon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_positive_only_clamp() {
        assert_eq!(normalize(-5.3, SignClamp::PositiveOnly), 0.0);
        assert_eq!(normalize(5.3, SignClamp::PositiveOnly), 5.3);
    }

    #[test]
    fn test_negative_only_clamp() {
        assert_eq!(normalize(-5.3, SignClamp::NegativeOnly), 5.3);
        assert_eq!(normalize(5.3, SignClamp::NegativeOnly), 0.0);
        // No "-0" leaks through
        assert!(normalize(5.3, SignClamp::NegativeOnly).is_sign_positive());
    }

    #[test]
    fn test_no_clamp_rounds_to_two_decimals() {
        for (raw, expected) in [
            (1.234, 1.23),
            (1.235_9, 1.24),
            (-150.704, -150.7),
            (0.0, 0.0),
            (4200.0, 4200.0),
            (-0.004, 0.0),
        ] {
            assert_eq!(normalize(raw, SignClamp::None), expected, "raw = {raw}");
        }
    }

    #[test]
    fn test_rounding_ties_and_near_ties() {
        for (raw, expected) in [
            (0.125, 0.12),
            (0.625, 0.62),
            (-0.125, -0.12),
            (1.125, 1.12),
            (2.675, 2.67),
            (-150.125, -150.12),
            (150.705, 150.71),
            (1e307, 1e307),
        ] {
            assert_eq!(round_to_hundredths(raw), expected, "raw = {raw}");
        }
        assert!(round_to_hundredths(f64::NAN).is_nan());
        assert_eq!(round_to_hundredths(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_state_class_for_unit() {
        assert_eq!(state_class_for_unit("kWh"), StateClass::TotalIncreasing);
        assert_eq!(state_class_for_unit("Wh"), StateClass::TotalIncreasing);
        assert_eq!(state_class_for_unit("W"), StateClass::Measurement);
        assert_eq!(state_class_for_unit("%"), StateClass::Measurement);
        assert_eq!(state_class_for_unit("V"), StateClass::Measurement);
    }

    #[test]
    fn test_last_reset_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 6, 14, 17, 42, 9).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 6, 14, 0, 0, 0).unwrap();

        assert_eq!(last_reset_for("kWh", now), Some(expected));
        assert_eq!(last_reset_for("Wh", now), Some(expected));
        assert_eq!(last_reset_for("W", now), None);
        assert_eq!(last_reset_for("A", now), None);
    }

    #[test]
    fn test_battery_icon_tiers() {
        assert_eq!(battery_level_icon(0.0), Some("mdi:battery-outline"));
        assert_eq!(battery_level_icon(9.0), Some("mdi:battery-outline"));
        assert_eq!(battery_level_icon(9.99), Some("mdi:battery-outline"));
        assert_eq!(battery_level_icon(10.0), Some("mdi:battery-10"));
        assert_eq!(battery_level_icon(19.0), Some("mdi:battery-10"));
        assert_eq!(battery_level_icon(55.0), Some("mdi:battery-50"));
        assert_eq!(battery_level_icon(90.0), Some("mdi:battery-90"));
        assert_eq!(battery_level_icon(99.0), Some("mdi:battery-90"));
        assert_eq!(battery_level_icon(100.0), Some("mdi:battery"));
    }

    #[test]
    fn test_battery_icon_every_integer_has_exactly_one_tier() {
        for level in 0..=100_u8 {
            let icon = battery_level_icon(f64::from(level));
            assert!(icon.is_some(), "no tier for {level}");
        }
        assert_eq!(battery_level_icon(-1.0), None);
        assert_eq!(battery_level_icon(101.0), None);
        assert_eq!(battery_level_icon(f64::NAN), None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(DeviceClass::Power.as_str(), "power");
        assert_eq!(StateClass::TotalIncreasing.to_string(), "total_increasing");
        assert_eq!(
            serde_json::to_string(&SignClamp::NegativeOnly).unwrap(),
            "\"negative-only\""
        );
        assert_eq!(
            serde_json::to_string(&DeviceClass::Battery).unwrap(),
            "\"battery\""
        );
    }
}
