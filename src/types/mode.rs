// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operating mode types.
//!
//! The unit distinguishes between the mode the user *requested*
//! ([`ModeSet`], written with the `VWFtr` command) and the mode the unit is
//! *currently running* ([`OperatingMode`], reported in the state frame). In
//! automatic mode, for example, the requested mode stays `Auto` while the
//! operating mode flips between auto-heating and auto-cooling.

use std::fmt;

use crate::error::ValueError;

/// Requested operating mode.
///
/// # Examples
///
/// ```
/// use breezart_lib::types::ModeSet;
///
/// let mode = ModeSet::try_from(3).unwrap();
/// assert_eq!(mode, ModeSet::Auto);
/// assert_eq!(mode.code(), 3);
/// assert!(ModeSet::try_from(0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum ModeSet {
    /// Heating.
    Heat,
    /// Cooling.
    Cool,
    /// Automatic heating/cooling.
    Auto,
    /// Ventilation only.
    Ventilation,
}

impl ModeSet {
    /// All requestable modes.
    pub const ALL: [Self; 4] = [Self::Heat, Self::Cool, Self::Auto, Self::Ventilation];

    /// Returns the protocol code of this mode.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Heat => 1,
            Self::Cool => 2,
            Self::Auto => 3,
            Self::Ventilation => 4,
        }
    }
}

impl TryFrom<u8> for ModeSet {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Heat),
            2 => Ok(Self::Cool),
            3 => Ok(Self::Auto),
            4 => Ok(Self::Ventilation),
            other => Err(ValueError::InvalidMode(other)),
        }
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Heat => "heat",
            Self::Cool => "cool",
            Self::Auto => "auto",
            Self::Ventilation => "ventilation",
        };
        f.write_str(name)
    }
}

/// Mode the unit is currently running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OperatingMode {
    /// Heating.
    Heating,
    /// Cooling.
    Cooling,
    /// Automatic mode, currently heating.
    AutoHeating,
    /// Automatic mode, currently cooling.
    AutoCooling,
    /// Ventilation only.
    Ventilation,
    /// Unit is off.
    Off,
}

impl OperatingMode {
    /// Highest valid protocol code.
    pub const MAX_CODE: u8 = 5;

    /// Returns `true` while the unit is heating.
    #[must_use]
    pub const fn is_heating(&self) -> bool {
        matches!(self, Self::Heating | Self::AutoHeating)
    }

    /// Returns `true` while the unit is cooling.
    #[must_use]
    pub const fn is_cooling(&self) -> bool {
        matches!(self, Self::Cooling | Self::AutoCooling)
    }
}

impl TryFrom<u8> for OperatingMode {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Heating),
            1 => Ok(Self::Cooling),
            2 => Ok(Self::AutoHeating),
            3 => Ok(Self::AutoCooling),
            4 => Ok(Self::Ventilation),
            5 => Ok(Self::Off),
            other => Err(ValueError::InvalidMode(other)),
        }
    }
}

/// Power transition state of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UnitState {
    /// Off.
    Off,
    /// Running.
    On,
    /// Shutting down.
    TurningOff,
    /// Starting up.
    TurningOn,
}

impl From<u8> for UnitState {
    /// Only the two low bits are significant.
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0 => Self::Off,
            1 => Self::On,
            2 => Self::TurningOff,
            _ => Self::TurningOn,
        }
    }
}

/// Climate-style mode as a home-automation consumer sees it.
///
/// Combines the power button state with the requested mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HvacMode {
    /// Unit powered off.
    Off,
    /// Ventilation only.
    FanOnly,
    /// Heating.
    Heat,
    /// Cooling.
    Cool,
    /// Automatic heating/cooling.
    Auto,
}

impl HvacMode {
    /// Derives the consumer mode from the power flag and the running mode.
    #[must_use]
    pub fn from_state(power: bool, mode: Option<OperatingMode>) -> Self {
        if !power {
            return Self::Off;
        }
        match mode {
            Some(OperatingMode::Heating) => Self::Heat,
            Some(OperatingMode::Cooling) => Self::Cool,
            Some(OperatingMode::AutoHeating | OperatingMode::AutoCooling) => Self::Auto,
            Some(OperatingMode::Ventilation | OperatingMode::Off) | None => Self::FanOnly,
        }
    }

    /// Returns the mode to request from the unit, or `None` for [`HvacMode::Off`].
    #[must_use]
    pub const fn mode_set(&self) -> Option<ModeSet> {
        match self {
            Self::Off => None,
            Self::FanOnly => Some(ModeSet::Ventilation),
            Self::Heat => Some(ModeSet::Heat),
            Self::Cool => Some(ModeSet::Cool),
            Self::Auto => Some(ModeSet::Auto),
        }
    }
}

/// What the unit is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HvacAction {
    /// Off.
    Off,
    /// Heating.
    Heating,
    /// Cooling.
    Cooling,
    /// Moving air only.
    Fan,
    /// In a power transition.
    Idle,
}

impl HvacAction {
    /// Derives the action from power, unit state and running mode.
    #[must_use]
    pub fn from_state(power: bool, unit: Option<UnitState>, mode: Option<OperatingMode>) -> Self {
        if !power {
            return Self::Off;
        }
        match unit {
            Some(UnitState::Off) | None => Self::Off,
            Some(UnitState::On) => match mode {
                Some(m) if m.is_heating() => Self::Heating,
                Some(m) if m.is_cooling() => Self::Cooling,
                _ => Self::Fan,
            },
            Some(UnitState::TurningOff | UnitState::TurningOn) => Self::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_set_codes_round_trip() {
        for mode in ModeSet::ALL {
            assert_eq!(ModeSet::try_from(mode.code()).unwrap(), mode);
        }
        assert_eq!(ModeSet::try_from(5), Err(ValueError::InvalidMode(5)));
    }

    #[test]
    fn operating_mode_rejects_unknown_codes() {
        assert_eq!(OperatingMode::try_from(4).unwrap(), OperatingMode::Ventilation);
        assert!(OperatingMode::try_from(6).is_err());
    }

    #[test]
    fn unit_state_masks_high_bits() {
        assert_eq!(UnitState::from(0b101), UnitState::On);
        assert_eq!(UnitState::from(3), UnitState::TurningOn);
    }

    #[test]
    fn hvac_mode_off_when_power_off() {
        assert_eq!(
            HvacMode::from_state(false, Some(OperatingMode::Heating)),
            HvacMode::Off
        );
        assert_eq!(
            HvacMode::from_state(true, Some(OperatingMode::AutoCooling)),
            HvacMode::Auto
        );
        assert_eq!(HvacMode::from_state(true, None), HvacMode::FanOnly);
    }

    #[test]
    fn hvac_mode_maps_to_requested_mode() {
        assert_eq!(HvacMode::Off.mode_set(), None);
        assert_eq!(HvacMode::FanOnly.mode_set(), Some(ModeSet::Ventilation));
        assert_eq!(HvacMode::Heat.mode_set(), Some(ModeSet::Heat));
    }

    #[test]
    fn hvac_action_follows_unit_state() {
        let heating = Some(OperatingMode::Heating);
        assert_eq!(
            HvacAction::from_state(true, Some(UnitState::On), heating),
            HvacAction::Heating
        );
        assert_eq!(
            HvacAction::from_state(true, Some(UnitState::TurningOn), heating),
            HvacAction::Idle
        );
        assert_eq!(
            HvacAction::from_state(true, Some(UnitState::On), Some(OperatingMode::Ventilation)),
            HvacAction::Fan
        );
        assert_eq!(HvacAction::from_state(false, None, heating), HvacAction::Off);
    }
}
