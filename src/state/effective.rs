// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The merged view consumers read.

use std::collections::{BTreeMap, BTreeSet};

use crate::codec::{CURRENT_TEMPERATURE_SOURCES, Control, Field, RegisterValue};
use crate::properties::DeviceProperties;
use crate::types::{
    HvacAction, HvacMode, IndicatorState, MessageSeverity, ModeSet, OperatingMode, UnitState,
};

use super::FieldChange;

/// Device state as consumers see it.
///
/// For every field this is the value of an active optimistic write for the
/// control owning the field, or else the latest confirmed value of the
/// field's cadence group. A field is absent until either source reports it.
///
/// Typed accessors return `None` for absent or unavailable fields, and for
/// codes that do not map to a known variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EffectiveState {
    values: BTreeMap<Field, Option<RegisterValue>>,
    overridden: BTreeSet<Control>,
    properties: DeviceProperties,
    available: bool,
    revision: u64,
}

impl EffectiveState {
    pub(crate) fn new(
        values: BTreeMap<Field, Option<RegisterValue>>,
        overridden: BTreeSet<Control>,
        properties: DeviceProperties,
        available: bool,
        revision: u64,
    ) -> Self {
        Self {
            values,
            overridden,
            properties,
            available,
            revision,
        }
    }

    /// Returns `true` if both views show the same values, overrides,
    /// properties and availability, whatever their revisions.
    pub(crate) fn same_view(&self, other: &Self) -> bool {
        self.values == other.values
            && self.overridden == other.overridden
            && self.properties == other.properties
            && self.available == other.available
    }

    /// Returns the effective value of `field`.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&RegisterValue> {
        self.values.get(&field).and_then(Option::as_ref)
    }

    /// Returns `true` if `field` has been reported, with or without data.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Iterates over all known fields.
    pub fn iter(&self) -> impl Iterator<Item = (Field, Option<&RegisterValue>)> {
        self.values.iter().map(|(f, v)| (*f, v.as_ref()))
    }

    /// Returns `true` if an unconfirmed write currently determines `control`.
    #[must_use]
    pub fn is_overridden(&self, control: Control) -> bool {
        self.overridden.contains(&control)
    }

    /// Returns the controls with an active optimistic write.
    pub fn overridden_controls(&self) -> impl Iterator<Item = Control> + '_ {
        self.overridden.iter().copied()
    }

    /// Returns the unit's properties.
    #[must_use]
    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Returns `true` while the unit answers polls.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Returns the store revision this view was computed at.
    ///
    /// Revisions increase with every store mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the power button state.
    #[must_use]
    pub fn power(&self) -> Option<bool> {
        self.get(Field::Power).and_then(RegisterValue::as_bool)
    }

    /// Returns the target temperature in degrees Celsius.
    #[must_use]
    pub fn target_temperature(&self) -> Option<f32> {
        self.float(Field::TargetTemperature)
    }

    /// Returns the current temperature in degrees Celsius.
    ///
    /// The supply air temperature after the unit is preferred; the
    /// regulation-point temperature is used while the supply sensor has no
    /// data.
    #[must_use]
    pub fn current_temperature(&self) -> Option<f32> {
        CURRENT_TEMPERATURE_SOURCES
            .iter()
            .find_map(|field| self.float(*field))
    }

    /// Returns the relative humidity in percent.
    #[must_use]
    pub fn humidity(&self) -> Option<i32> {
        self.int(Field::Humidity)
    }

    /// Returns the requested fan speed step.
    #[must_use]
    pub fn fan_speed(&self) -> Option<u8> {
        self.code(Field::FanSpeedTarget)
    }

    /// Returns the fan speed step the unit is running at.
    #[must_use]
    pub fn fan_speed_current(&self) -> Option<u8> {
        self.code(Field::FanSpeed)
    }

    /// Returns the requested operating mode.
    #[must_use]
    pub fn mode_set(&self) -> Option<ModeSet> {
        self.code(Field::ModeSet)
            .and_then(|c| ModeSet::try_from(c).ok())
    }

    /// Returns the operating mode the unit is running in.
    #[must_use]
    pub fn operating_mode(&self) -> Option<OperatingMode> {
        self.code(Field::OperatingMode)
            .and_then(|c| OperatingMode::try_from(c).ok())
    }

    /// Returns the power transition state.
    #[must_use]
    pub fn unit_state(&self) -> Option<UnitState> {
        self.code(Field::UnitState).map(UnitState::from)
    }

    /// Returns the control panel message severity.
    #[must_use]
    pub fn message_severity(&self) -> Option<MessageSeverity> {
        self.code(Field::MessageSeverity)
            .and_then(|c| MessageSeverity::try_from(c).ok())
    }

    /// Returns the power indicator state.
    #[must_use]
    pub fn indicator_state(&self) -> Option<IndicatorState> {
        self.code(Field::IndicatorState)
            .and_then(|c| IndicatorState::try_from(c).ok())
    }

    /// Returns the free-form status message.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.get(Field::StatusMessage).and_then(RegisterValue::as_text)
    }

    /// Returns the climate mode, derived from power and the running mode.
    ///
    /// While a mode write is pending, the requested mode is reported so the
    /// consumer sees its own command immediately.
    #[must_use]
    pub fn hvac_mode(&self) -> Option<HvacMode> {
        let power = self.power()?;
        if power && self.is_overridden(Control::Mode) {
            return Some(match self.mode_set() {
                Some(ModeSet::Heat) => HvacMode::Heat,
                Some(ModeSet::Cool) => HvacMode::Cool,
                Some(ModeSet::Auto) => HvacMode::Auto,
                Some(ModeSet::Ventilation) | None => HvacMode::FanOnly,
            });
        }
        Some(HvacMode::from_state(power, self.operating_mode()))
    }

    /// Returns what the unit is doing right now.
    #[must_use]
    pub fn hvac_action(&self) -> Option<HvacAction> {
        let power = self.power()?;
        Some(HvacAction::from_state(
            power,
            self.unit_state(),
            self.operating_mode(),
        ))
    }

    /// Returns the fields whose value differs from `previous`.
    #[must_use]
    pub fn diff(&self, previous: &Self) -> Vec<FieldChange> {
        let fields: BTreeSet<Field> = self
            .values
            .keys()
            .chain(previous.values.keys())
            .copied()
            .collect();

        fields
            .into_iter()
            .filter_map(|field| {
                let before = previous.get(field);
                let after = self.get(field);
                (before != after).then(|| FieldChange::new(field, before.cloned(), after.cloned()))
            })
            .collect()
    }

    fn float(&self, field: Field) -> Option<f32> {
        self.get(field).and_then(RegisterValue::as_f32)
    }

    fn int(&self, field: Field) -> Option<i32> {
        self.get(field).and_then(RegisterValue::as_i32)
    }

    fn code(&self, field: Field) -> Option<u8> {
        self.int(field).and_then(|v| u8::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(values: &[(Field, Option<RegisterValue>)], overridden: &[Control]) -> EffectiveState {
        EffectiveState::new(
            values.iter().cloned().collect(),
            overridden.iter().copied().collect(),
            DeviceProperties::default(),
            true,
            1,
        )
    }

    #[test]
    fn current_temperature_prefers_supply_sensor() {
        let s = state(
            &[
                (Field::SupplyTemperature, Some(RegisterValue::Decimal(19.5))),
                (Field::RegulationTemperature, Some(RegisterValue::Decimal(22.0))),
            ],
            &[],
        );
        assert_eq!(s.current_temperature(), Some(19.5));
    }

    #[test]
    fn current_temperature_falls_back_to_regulation_point() {
        let s = state(
            &[
                (Field::SupplyTemperature, None),
                (Field::RegulationTemperature, Some(RegisterValue::Decimal(22.0))),
            ],
            &[],
        );
        assert_eq!(s.current_temperature(), Some(22.0));

        let only_state = state(
            &[(Field::RegulationTemperature, Some(RegisterValue::Decimal(21.0)))],
            &[],
        );
        assert_eq!(only_state.current_temperature(), Some(21.0));
    }

    #[test]
    fn typed_accessors() {
        let s = state(
            &[
                (Field::Power, Some(RegisterValue::Flag(true))),
                (Field::ModeSet, Some(RegisterValue::Integer(2))),
                (Field::OperatingMode, Some(RegisterValue::Integer(1))),
                (Field::UnitState, Some(RegisterValue::Integer(1))),
                (Field::FanSpeedTarget, Some(RegisterValue::Integer(4))),
                (Field::FanSpeed, Some(RegisterValue::Integer(3))),
                (Field::Humidity, None),
            ],
            &[],
        );
        assert_eq!(s.power(), Some(true));
        assert_eq!(s.mode_set(), Some(ModeSet::Cool));
        assert_eq!(s.operating_mode(), Some(OperatingMode::Cooling));
        assert_eq!(s.fan_speed(), Some(4));
        assert_eq!(s.fan_speed_current(), Some(3));
        assert_eq!(s.humidity(), None);
        assert_eq!(s.hvac_mode(), Some(HvacMode::Cool));
        assert_eq!(s.hvac_action(), Some(HvacAction::Cooling));
    }

    #[test]
    fn pending_mode_write_drives_hvac_mode() {
        let s = state(
            &[
                (Field::Power, Some(RegisterValue::Flag(true))),
                (Field::ModeSet, Some(RegisterValue::Integer(1))),
                (Field::OperatingMode, Some(RegisterValue::Integer(4))),
            ],
            &[Control::Mode],
        );
        assert_eq!(s.hvac_mode(), Some(HvacMode::Heat));
    }

    #[test]
    fn powered_off_is_off() {
        let s = state(&[(Field::Power, Some(RegisterValue::Flag(false)))], &[]);
        assert_eq!(s.hvac_mode(), Some(HvacMode::Off));
        assert_eq!(s.hvac_action(), Some(HvacAction::Off));
        assert_eq!(EffectiveState::default().hvac_mode(), None);
    }

    #[test]
    fn diff_reports_changed_fields_only() {
        let before = state(
            &[
                (Field::TargetTemperature, Some(RegisterValue::Decimal(21.0))),
                (Field::FanSpeedTarget, Some(RegisterValue::Integer(3))),
            ],
            &[],
        );
        let after = state(
            &[
                (Field::TargetTemperature, Some(RegisterValue::Decimal(23.0))),
                (Field::FanSpeedTarget, Some(RegisterValue::Integer(3))),
                (Field::Humidity, Some(RegisterValue::Integer(40))),
            ],
            &[Control::TargetTemperature],
        );

        let changes = after.diff(&before);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, Field::TargetTemperature);
        assert_eq!(changes[0].current, Some(RegisterValue::Decimal(23.0)));
        assert_eq!(changes[1].field, Field::Humidity);
        assert!(after.is_overridden(Control::TargetTemperature));
    }
}
