// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Writable controls and the commands that set them.

use std::fmt;

use crate::protocol::RequestKind;
use crate::types::{ModeSet, PowerState};

use super::field::{Field, Tolerance};

/// A logical control that can be written.
///
/// Each control is written with its own request type and confirmed by
/// reading back one field of the state frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Power button.
    Power,
    /// Target temperature.
    TargetTemperature,
    /// Fan speed step.
    FanSpeed,
    /// Requested operating mode.
    Mode,
}

impl Control {
    /// All controls.
    pub const ALL: [Self; 4] = [
        Self::Power,
        Self::TargetTemperature,
        Self::FanSpeed,
        Self::Mode,
    ];

    /// Returns the field the device reports this control's value in.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Power => Field::Power,
            Self::TargetTemperature => Field::TargetTemperature,
            Self::FanSpeed => Field::FanSpeedTarget,
            Self::Mode => Field::ModeSet,
        }
    }

    /// Returns the control that owns `field`, if the field is writable.
    #[must_use]
    pub fn for_field(field: Field) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.field() == field)
    }

    /// Returns the request type that writes this control.
    #[must_use]
    pub const fn request_kind(&self) -> RequestKind {
        match self {
            Self::Power => RequestKind::SetPower,
            Self::TargetTemperature => RequestKind::SetTemperature,
            Self::FanSpeed => RequestKind::SetFanSpeed,
            Self::Mode => RequestKind::SetMode,
        }
    }

    /// Returns the default tolerance used to confirm a write.
    ///
    /// The target temperature is reported in whole degrees, so a requested
    /// value confirms within half a degree. Discrete controls must match.
    #[must_use]
    pub const fn default_tolerance(&self) -> Tolerance {
        match self {
            Self::TargetTemperature => Tolerance::Absolute(0.5),
            Self::Power | Self::FanSpeed | Self::Mode => Tolerance::Exact,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Power => "power",
            Self::TargetTemperature => "target temperature",
            Self::FanSpeed => "fan speed",
            Self::Mode => "mode",
        })
    }
}

/// A requested change to one control, before validation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Switch the unit on or off.
    Power(PowerState),
    /// Set the target temperature in degrees Celsius.
    TargetTemperature(f32),
    /// Set the fan speed step.
    FanSpeed(u8),
    /// Set the operating mode.
    Mode(ModeSet),
}

impl Command {
    /// Returns the control this command writes.
    #[must_use]
    pub const fn control(&self) -> Control {
        match self {
            Self::Power(_) => Control::Power,
            Self::TargetTemperature(_) => Control::TargetTemperature,
            Self::FanSpeed(_) => Control::FanSpeed,
            Self::Mode(_) => Control::Mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_map_to_distinct_fields() {
        for control in Control::ALL {
            assert_eq!(Control::for_field(control.field()), Some(control));
        }
        assert_eq!(Control::for_field(Field::Humidity), None);
    }

    #[test]
    fn fan_speed_confirms_against_requested_step() {
        assert_eq!(Control::FanSpeed.field(), Field::FanSpeedTarget);
        assert_eq!(Control::FanSpeed.request_kind(), RequestKind::SetFanSpeed);
    }

    #[test]
    fn command_reports_its_control() {
        assert_eq!(Command::Mode(ModeSet::Cool).control(), Control::Mode);
        assert_eq!(
            Command::TargetTemperature(22.0).control(),
            Control::TargetTemperature
        );
    }
}
