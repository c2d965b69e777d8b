// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static register map of the unit.
//!
//! The native protocol returns each data class as one frame of hex words.
//! Every logical [`Field`] lives at a fixed word of the state (`VSt07`) or
//! sensor (`VSens`) frame and is extracted with a fixed [`Rule`].
//!
//! Two temperatures are easy to confuse. The state frame carries the
//! temperature at the *regulation point* (documented as INPUT register 13,
//! whole degrees). The sensor frame carries the *supply air temperature
//! after the unit* (INPUT register 50, tenths of a degree). The climate
//! view reports the supply value and only falls back to the regulation point
//! when the supply sensor has no data; see [`CURRENT_TEMPERATURE_SOURCES`].

use super::field::{Cadence, Field};

/// Sentinel the unit sends for a sensor word without data.
pub const NO_DATA_WORD: u16 = 0xFB07;

/// Sentinel the unit sends for a byte-wide state value without data.
pub const NO_DATA_BYTE: u16 = 0xFF;

/// Decoding rule of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Single bit, decoded as a flag.
    Flag {
        /// Bit index, 0 = least significant.
        bit: u8,
    },
    /// Unsigned bit range decoded as an integer code.
    Bits {
        /// Lowest bit (inclusive).
        from: u8,
        /// Highest bit (inclusive).
        to: u8,
        /// Highest valid raw value.
        max: u16,
        /// Raw value meaning "no data".
        none: Option<u16>,
    },
    /// Bit range holding whole degrees Celsius.
    Celsius {
        /// Lowest bit (inclusive).
        from: u8,
        /// Highest bit (inclusive).
        to: u8,
        /// Two's complement within the bit range.
        signed: bool,
    },
    /// Full 16-bit measurement word divided by `divisor`.
    Word {
        /// Two's complement word.
        signed: bool,
        /// Scale divisor (10 for one decimal place).
        divisor: u16,
    },
    /// Free text word.
    Text,
}

/// One entry of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDef {
    /// The logical field.
    pub field: Field,
    /// The frame (and polling cadence) carrying the field.
    pub cadence: Cadence,
    /// Word index inside the frame; word 0 is the reply code.
    pub word: usize,
    /// How the raw word is decoded.
    pub rule: Rule,
    /// Whether a frame lacking this word is malformed.
    pub required: bool,
    /// Documented INPUT register number, where one exists.
    pub input_register: Option<u16>,
}

impl RegisterDef {
    const fn state(field: Field, word: usize, rule: Rule) -> Self {
        Self {
            field,
            cadence: Cadence::State,
            word,
            rule,
            required: true,
            input_register: None,
        }
    }

    const fn sensor(field: Field, word: usize, signed: bool, divisor: u16) -> Self {
        Self {
            field,
            cadence: Cadence::Sensor,
            word,
            rule: Rule::Word { signed, divisor },
            required: false,
            input_register: None,
        }
    }

    const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    const fn input(mut self, register: u16) -> Self {
        self.input_register = Some(register);
        self
    }
}

const fn bits(from: u8, to: u8, max: u16) -> Rule {
    Rule::Bits {
        from,
        to,
        max,
        none: None,
    }
}

const fn byte_or_none(from: u8) -> Rule {
    Rule::Bits {
        from,
        to: from + 7,
        max: 0xFF,
        none: Some(NO_DATA_BYTE),
    }
}

/// The unit's register map.
pub static REGISTER_MAP: [RegisterDef; 23] = [
    // bitState
    RegisterDef::state(Field::Power, 1, Rule::Flag { bit: 0 }),
    RegisterDef::state(Field::WarningActive, 1, Rule::Flag { bit: 1 }),
    RegisterDef::state(Field::FatalError, 1, Rule::Flag { bit: 2 }),
    RegisterDef::state(Field::OverheatDanger, 1, Rule::Flag { bit: 3 }),
    RegisterDef::state(Field::FilterChangeRequired, 1, Rule::Flag { bit: 5 }),
    RegisterDef::state(
        Field::ModeSet,
        1,
        Rule::Bits {
            from: 6,
            to: 8,
            max: 4,
            none: Some(0),
        },
    ),
    // bitMode
    RegisterDef::state(Field::UnitState, 2, bits(0, 1, 3)),
    RegisterDef::state(Field::OperatingMode, 2, bits(3, 5, 5)),
    // bitTempr
    RegisterDef::state(
        Field::RegulationTemperature,
        3,
        Rule::Celsius {
            from: 0,
            to: 7,
            signed: true,
        },
    )
    .input(13),
    RegisterDef::state(
        Field::TargetTemperature,
        3,
        Rule::Celsius {
            from: 8,
            to: 15,
            signed: false,
        },
    ),
    // bitHumid
    RegisterDef::state(Field::Humidity, 4, byte_or_none(0)),
    // bitSpeed
    RegisterDef::state(Field::FanSpeed, 5, bits(0, 3, 15)),
    RegisterDef::state(Field::FanSpeedTarget, 5, bits(4, 7, 15)),
    RegisterDef::state(Field::FanSpeedActual, 5, byte_or_none(8)),
    // bitMisc
    RegisterDef::state(Field::MessageSeverity, 6, bits(4, 5, 2)),
    RegisterDef::state(Field::IndicatorState, 6, bits(6, 7, 2)),
    RegisterDef::state(Field::FilterDust, 6, byte_or_none(8)),
    RegisterDef::state(Field::StatusMessage, 10, Rule::Text).optional(),
    // VSens
    RegisterDef::sensor(Field::SupplyTemperature, 1, true, 10).input(50),
    RegisterDef::sensor(Field::RoomTemperature, 3, false, 1),
    RegisterDef::sensor(Field::OutdoorTemperature, 5, true, 10),
    RegisterDef::sensor(Field::WaterTemperature, 7, false, 1),
    RegisterDef::sensor(Field::PowerConsumption, 8, false, 1),
];

/// Fields reported as the current temperature, most preferred first.
///
/// The supply air temperature after the unit (INPUT 50) wins; the
/// regulation-point temperature (INPUT 13) is used only when the supply
/// sensor is unavailable.
pub const CURRENT_TEMPERATURE_SOURCES: [Field; 2] =
    [Field::SupplyTemperature, Field::RegulationTemperature];

/// Returns the register definition of `field`.
///
/// # Panics
///
/// Panics if `field` has no entry, which would be a bug in [`REGISTER_MAP`].
#[must_use]
pub fn lookup(field: Field) -> &'static RegisterDef {
    REGISTER_MAP
        .iter()
        .find(|def| def.field == field)
        .unwrap_or_else(|| panic!("register map has no entry for {field}"))
}

/// Returns the register definitions of one cadence group, in map order.
pub fn group(cadence: Cadence) -> impl Iterator<Item = &'static RegisterDef> {
    REGISTER_MAP.iter().filter(move |def| def.cadence == cadence)
}

/// Returns the field documented as INPUT register `register`, if any.
#[must_use]
pub fn by_input_register(register: u16) -> Option<Field> {
    REGISTER_MAP
        .iter()
        .find(|def| def.input_register == Some(register))
        .map(|def| def.field)
}
