// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status indicator types reported by the unit's control panel.

use crate::error::ValueError;

/// Severity of the message currently shown on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MessageSeverity {
    /// Normal operation.
    Normal,
    /// A warning is active.
    Warning,
    /// An error is active.
    Error,
}

impl TryFrom<u8> for MessageSeverity {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, ValueError> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Error),
            other => Err(ValueError::OutOfRange {
                min: 0,
                max: 2,
                actual: i32::from(other),
            }),
        }
    }
}

/// State of the power indicator on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum IndicatorState {
    /// Off.
    Off,
    /// Power transition in progress.
    Transition,
    /// On.
    On,
}

impl TryFrom<u8> for IndicatorState {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Transition),
            2 => Ok(Self::On),
            other => Err(ValueError::OutOfRange {
                min: 0,
                max: 2,
                actual: i32::from(other),
            }),
        }
    }
}
