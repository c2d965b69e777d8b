// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logical fields, cadence groups and decoded values.

use std::fmt;

use crate::protocol::RequestKind;

/// A logical value exposed by the unit.
///
/// Each field is backed by one entry of the static register map, which
/// names the frame and word carrying it and the rule used to decode it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Power button state.
    Power,
    /// A warning is active.
    WarningActive,
    /// A fatal error is active.
    FatalError,
    /// Overheat danger.
    OverheatDanger,
    /// The filter must be replaced.
    FilterChangeRequired,
    /// Requested operating mode code.
    ModeSet,
    /// Power transition state code.
    UnitState,
    /// Current operating mode code.
    OperatingMode,
    /// Temperature at the regulation point, whole degrees (INPUT register 13).
    RegulationTemperature,
    /// Target temperature, whole degrees.
    TargetTemperature,
    /// Relative humidity in percent.
    Humidity,
    /// Current fan speed step.
    FanSpeed,
    /// Requested fan speed step.
    FanSpeedTarget,
    /// Actual fan output in percent.
    FanSpeedActual,
    /// Severity of the control panel message.
    MessageSeverity,
    /// Power indicator state.
    IndicatorState,
    /// Filter pollution in percent.
    FilterDust,
    /// Free-form status message.
    StatusMessage,
    /// Supply air temperature after the unit, 0.1 degree resolution (INPUT register 50).
    SupplyTemperature,
    /// Room temperature.
    RoomTemperature,
    /// Outdoor air temperature, 0.1 degree resolution.
    OutdoorTemperature,
    /// Water heater return temperature.
    WaterTemperature,
    /// Electrical power consumption in watts.
    PowerConsumption,
}

impl Field {
    /// Returns the snake-case name of the field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::WarningActive => "warning_active",
            Self::FatalError => "fatal_error",
            Self::OverheatDanger => "overheat_danger",
            Self::FilterChangeRequired => "filter_change_required",
            Self::ModeSet => "mode_set",
            Self::UnitState => "unit_state",
            Self::OperatingMode => "operating_mode",
            Self::RegulationTemperature => "regulation_temperature",
            Self::TargetTemperature => "target_temperature",
            Self::Humidity => "humidity",
            Self::FanSpeed => "fan_speed",
            Self::FanSpeedTarget => "fan_speed_target",
            Self::FanSpeedActual => "fan_speed_actual",
            Self::MessageSeverity => "message_severity",
            Self::IndicatorState => "indicator_state",
            Self::FilterDust => "filter_dust",
            Self::StatusMessage => "status_message",
            Self::SupplyTemperature => "supply_temperature",
            Self::RoomTemperature => "room_temperature",
            Self::OutdoorTemperature => "outdoor_temperature",
            Self::WaterTemperature => "water_temperature",
            Self::PowerConsumption => "power_consumption",
        }
    }

    /// Returns the cadence group this field is polled with.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        super::register_map::lookup(*self).cadence
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling cadence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Fast-changing control state, read with `VSt07`.
    State,
    /// Slow-changing sensor readings, read with `VSens`.
    Sensor,
}

impl Cadence {
    /// Both cadence groups.
    pub const ALL: [Self; 2] = [Self::State, Self::Sensor];

    /// Returns the request that reads this group.
    #[must_use]
    pub const fn request_kind(&self) -> RequestKind {
        match self {
            Self::State => RequestKind::State,
            Self::Sensor => RequestKind::Sensors,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "state",
            Self::Sensor => "sensor",
        })
    }
}

/// How closely a confirmed value must match a requested one.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// Values must be equal.
    Exact,
    /// Numeric values may differ by at most this amount.
    Absolute(f32),
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    /// Boolean flag.
    Flag(bool),
    /// Integer code or count.
    Integer(i32),
    /// Measurement with a fractional part.
    Decimal(f32),
    /// Free text.
    Text(String),
}

impl RegisterValue {
    /// Returns the value as a boolean, if it is a flag.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is one.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Integer(i) => Some(*i as f32),
            _ => None,
        }
    }

    /// Returns the value as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if `other` counts as the same value under `tolerance`.
    #[must_use]
    pub fn matches(&self, other: &Self, tolerance: Tolerance) -> bool {
        match tolerance {
            Tolerance::Exact => self == other,
            Tolerance::Absolute(delta) => match (self.as_f32(), other.as_f32()) {
                (Some(a), Some(b)) => (a - b).abs() <= delta,
                _ => self == other,
            },
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d:.1}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_requires_equality() {
        let a = RegisterValue::Integer(3);
        assert!(a.matches(&RegisterValue::Integer(3), Tolerance::Exact));
        assert!(!a.matches(&RegisterValue::Integer(4), Tolerance::Exact));
    }

    #[test]
    fn absolute_tolerance_compares_numerically() {
        let requested = RegisterValue::Decimal(23.0);
        assert!(requested.matches(&RegisterValue::Decimal(23.4), Tolerance::Absolute(0.5)));
        assert!(requested.matches(&RegisterValue::Integer(23), Tolerance::Absolute(0.5)));
        assert!(!requested.matches(&RegisterValue::Decimal(22.0), Tolerance::Absolute(0.5)));
    }

    #[test]
    fn absolute_tolerance_falls_back_to_equality_for_flags() {
        let on = RegisterValue::Flag(true);
        assert!(on.matches(&RegisterValue::Flag(true), Tolerance::Absolute(1.0)));
        assert!(!on.matches(&RegisterValue::Flag(false), Tolerance::Absolute(1.0)));
    }

    #[test]
    fn display_formats_decimals_with_one_digit() {
        assert_eq!(RegisterValue::Decimal(21.26).to_string(), "21.3");
        assert_eq!(Field::SupplyTemperature.to_string(), "supply_temperature");
    }
}
