// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for Breezart unit control.
//!
//! # Types
//!
//! - [`PowerState`] - On/Off state of the power button
//! - [`ModeSet`] - Requested operating mode (heat, cool, auto, ventilation)
//! - [`OperatingMode`] - Mode the unit is currently running in
//! - [`UnitState`] - Power transition state
//! - [`HvacMode`] / [`HvacAction`] - Climate-style views for consumers
//! - [`MessageSeverity`] / [`IndicatorState`] - Control panel indicators

mod indicator;
mod mode;
mod power;

pub use indicator::{IndicatorState, MessageSeverity};
pub use mode::{HvacAction, HvacMode, ModeSet, OperatingMode, UnitState};
pub use power::PowerState;
