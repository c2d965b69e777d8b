// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register codec.
//!
//! Translates between protocol frames and typed field values using the
//! static [`REGISTER_MAP`]:
//!
//! - [`decode`] extracts one field from a response
//! - [`decode_snapshot`] decodes a whole cadence group into a [`DeviceSnapshot`]
//! - [`encode`] validates a [`Command`] against the unit's properties and
//!   produces the data word to write
//!
//! # Examples
//!
//! ```
//! use breezart_lib::codec::{self, Field, RegisterValue};
//! use breezart_lib::protocol::{RequestKind, Response};
//!
//! let response = Response::parse(RequestKind::Sensors, "VSens_e6_0_16_0_ff9c_0_fb07_96").unwrap();
//! assert_eq!(
//!     codec::decode(&response, Field::SupplyTemperature).unwrap(),
//!     Some(RegisterValue::Decimal(23.0))
//! );
//! assert_eq!(codec::decode(&response, Field::WaterTemperature).unwrap(), None);
//! ```

pub(crate) mod bits;
mod control;
mod field;
pub mod register_map;

pub use control::{Command, Control};
pub use field::{Cadence, Field, RegisterValue, Tolerance};
pub use register_map::{CURRENT_TEMPERATURE_SOURCES, REGISTER_MAP, RegisterDef, Rule};

use crate::error::{ParseError, ValueError};
use crate::properties::DeviceProperties;
use crate::protocol::{Request, Response};
use crate::state::DeviceSnapshot;

use register_map::{NO_DATA_WORD, lookup};

/// Decodes one field from a response.
///
/// Returns `Ok(None)` when the unit reports its no-data sentinel for the
/// field, or when an optional word is absent.
///
/// # Errors
///
/// Returns [`ParseError`] if the response belongs to another frame, a
/// required word is missing or not hex, or the raw value is outside the
/// field's documented range.
pub fn decode(response: &Response, field: Field) -> Result<Option<RegisterValue>, ParseError> {
    let def = lookup(field);
    let expected = def.cadence.request_kind();
    if response.kind() != expected {
        return Err(ParseError::UnexpectedFormat(format!(
            "{field} is carried by {expected}, not {}",
            response.kind()
        )));
    }

    let Some(word) = response.word(def.word) else {
        if def.required {
            return Err(ParseError::MissingField(format!(
                "{field} (word {})",
                def.word
            )));
        }
        return Ok(None);
    };

    decode_word(field, def.rule, word)
}

fn decode_word(field: Field, rule: Rule, word: &str) -> Result<Option<RegisterValue>, ParseError> {
    let value = match rule {
        Rule::Text => RegisterValue::Text(word.to_string()),
        Rule::Flag { bit } => RegisterValue::Flag(bits::extract(hex(field, word)?, bit, bit) == 1),
        Rule::Bits {
            from,
            to,
            max,
            none,
        } => {
            let value = bits::extract(hex(field, word)?, from, to);
            if none == Some(value) {
                return Ok(None);
            }
            if value > max {
                return Err(ParseError::OutOfRange {
                    field: field.to_string(),
                    raw: u32::from(value),
                });
            }
            RegisterValue::Integer(i32::from(value))
        }
        Rule::Celsius { from, to, signed } => {
            let value = bits::extract(hex(field, word)?, from, to);
            let degrees = if signed {
                bits::sign_extend(value, to - from + 1)
            } else {
                i32::from(value)
            };
            RegisterValue::Decimal(whole_degrees(degrees))
        }
        Rule::Word { signed, divisor } => {
            let raw = hex(field, word)?;
            if raw == NO_DATA_WORD {
                return Ok(None);
            }
            let value = if signed {
                bits::sign_extend(raw, 16)
            } else {
                i32::from(raw)
            };
            RegisterValue::Decimal(whole_degrees(value) / f32::from(divisor))
        }
    };
    Ok(Some(value))
}

fn hex(field: Field, word: &str) -> Result<u16, ParseError> {
    u16::from_str_radix(word, 16).map_err(|e| ParseError::InvalidValue {
        field: field.as_str().to_string(),
        message: format!("{word:?}: {e}"),
    })
}

// Decoded values stay within 16 bits, which f32 represents exactly.
#[allow(clippy::cast_precision_loss)]
fn whole_degrees(value: i32) -> f32 {
    value as f32
}

/// Decodes every field of a cadence group.
///
/// Fields reported as "no data" are present in the snapshot with no value.
///
/// # Errors
///
/// Returns the first [`ParseError`] of any field; a partially decoded frame
/// never produces a snapshot.
pub fn decode_snapshot(cadence: Cadence, response: &Response) -> Result<DeviceSnapshot, ParseError> {
    let mut snapshot = DeviceSnapshot::new(cadence, tokio::time::Instant::now());
    for def in register_map::group(cadence) {
        snapshot.insert(def.field, decode(response, def.field)?);
    }
    Ok(snapshot)
}

/// Decodes a `VPr07` properties response.
///
/// # Errors
///
/// See [`DeviceProperties::from_response`].
pub fn decode_properties(response: &Response) -> Result<DeviceProperties, ParseError> {
    DeviceProperties::from_response(response)
}

/// A validated command, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCommand {
    /// The control being written.
    pub control: Control,
    /// The data word sent to the unit.
    pub data: u16,
    /// The value the control's field is expected to report once applied.
    pub value: RegisterValue,
}

impl EncodedCommand {
    /// Builds the write request for this command.
    #[must_use]
    pub const fn to_request(&self, password: u16) -> Request {
        Request::write(self.control.request_kind(), password, self.data)
    }
}

/// Validates `command` against `properties` and encodes it.
///
/// Target temperatures are rounded to the nearest whole degree, the only
/// resolution the unit accepts.
///
/// # Errors
///
/// Returns [`ValueError`] if the value is not finite or lies outside the
/// span the unit allows.
pub fn encode(command: &Command, properties: &DeviceProperties) -> Result<EncodedCommand, ValueError> {
    let control = command.control();
    let (data, value) = match *command {
        Command::Power(state) => (state.code(), RegisterValue::Flag(state.is_on())),
        Command::TargetTemperature(celsius) => {
            if !celsius.is_finite() {
                return Err(ValueError::NotFinite(celsius));
            }
            let rounded = celsius.round();
            let min = i32::from(properties.temp_min);
            let max = i32::from(properties.temp_max);
            if rounded < whole_degrees(min) || rounded > whole_degrees(max) {
                return Err(ValueError::OutOfRange {
                    min,
                    max,
                    actual: saturating_degrees(rounded),
                });
            }
            let degrees = saturating_degrees(rounded);
            let data = u16::try_from(degrees).map_err(|_| ValueError::WordOverflow(i64::from(degrees)))?;
            (data, RegisterValue::Decimal(rounded))
        }
        Command::FanSpeed(step) => {
            if !properties.allows_speed(step) {
                return Err(ValueError::OutOfRange {
                    min: i32::from(properties.speed_min),
                    max: i32::from(properties.speed_max),
                    actual: i32::from(step),
                });
            }
            (u16::from(step), RegisterValue::Integer(i32::from(step)))
        }
        Command::Mode(mode) => {
            let code = mode.code();
            (u16::from(code), RegisterValue::Integer(i32::from(code)))
        }
    };
    Ok(EncodedCommand {
        control,
        data,
        value,
    })
}

// `rounded` is finite and already rounded; `as` saturates at the i32 bounds.
#[allow(clippy::cast_possible_truncation)]
fn saturating_degrees(rounded: f32) -> i32 {
    rounded as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestKind;
    use crate::types::{ModeSet, PowerState};

    // Power on, filter change, mode set Auto (3 << 6); unit on, mode
    // Ventilation (4 << 3); 21 C at regulation point, target 23; no humidity
    // sensor; speed 3, target 4, actual 55 %; warning colour, indicator on,
    // dust 12 %.
    const STATE: &str = "VSt07_e1_21_1715_ff_3743_c90_0_0_0_Filter";

    fn state() -> Response {
        Response::parse(RequestKind::State, STATE).unwrap()
    }

    fn sensors(raw: &str) -> Response {
        Response::parse(RequestKind::Sensors, raw).unwrap()
    }

    #[test]
    fn decode_state_flags_and_codes() {
        let r = state();
        assert_eq!(decode(&r, Field::Power).unwrap(), Some(RegisterValue::Flag(true)));
        assert_eq!(decode(&r, Field::WarningActive).unwrap(), Some(RegisterValue::Flag(false)));
        assert_eq!(
            decode(&r, Field::FilterChangeRequired).unwrap(),
            Some(RegisterValue::Flag(true))
        );
        assert_eq!(decode(&r, Field::ModeSet).unwrap(), Some(RegisterValue::Integer(3)));
        assert_eq!(decode(&r, Field::UnitState).unwrap(), Some(RegisterValue::Integer(1)));
        assert_eq!(decode(&r, Field::OperatingMode).unwrap(), Some(RegisterValue::Integer(4)));
    }

    #[test]
    fn decode_state_temperatures() {
        let r = state();
        assert_eq!(
            decode(&r, Field::RegulationTemperature).unwrap(),
            Some(RegisterValue::Decimal(21.0))
        );
        assert_eq!(
            decode(&r, Field::TargetTemperature).unwrap(),
            Some(RegisterValue::Decimal(23.0))
        );
    }

    #[test]
    fn negative_regulation_temperature() {
        let r = Response::parse(RequestKind::State, "VSt07_1_0_17fb_0_0_0").unwrap();
        assert_eq!(
            decode(&r, Field::RegulationTemperature).unwrap(),
            Some(RegisterValue::Decimal(-5.0))
        );
    }

    #[test]
    fn decode_state_speed_and_misc() {
        let r = state();
        assert_eq!(decode(&r, Field::Humidity).unwrap(), None);
        assert_eq!(decode(&r, Field::FanSpeed).unwrap(), Some(RegisterValue::Integer(3)));
        assert_eq!(decode(&r, Field::FanSpeedTarget).unwrap(), Some(RegisterValue::Integer(4)));
        assert_eq!(decode(&r, Field::FanSpeedActual).unwrap(), Some(RegisterValue::Integer(55)));
        assert_eq!(decode(&r, Field::MessageSeverity).unwrap(), Some(RegisterValue::Integer(1)));
        assert_eq!(decode(&r, Field::IndicatorState).unwrap(), Some(RegisterValue::Integer(2)));
        assert_eq!(decode(&r, Field::FilterDust).unwrap(), Some(RegisterValue::Integer(12)));
        assert_eq!(
            decode(&r, Field::StatusMessage).unwrap(),
            Some(RegisterValue::Text("Filter".to_string()))
        );
    }

    #[test]
    fn status_message_is_optional() {
        let r = Response::parse(RequestKind::State, "VSt07_1_0_1715_0_0_0").unwrap();
        assert_eq!(decode(&r, Field::StatusMessage).unwrap(), None);
    }

    #[test]
    fn numeric_field_rejects_non_hex_word() {
        let r = Response::parse(RequestKind::State, "VSt07_1_0_zz_0_0_0_0_0_0_Filter").unwrap();
        match decode(&r, Field::TargetTemperature) {
            Err(ParseError::InvalidValue { field, .. }) => {
                assert_eq!(field, Field::TargetTemperature.as_str());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The text word decodes as-is next to it.
        assert_eq!(
            decode(&r, Field::StatusMessage).unwrap(),
            Some(RegisterValue::Text("Filter".to_string()))
        );
    }

    #[test]
    fn missing_required_word() {
        let r = Response::parse(RequestKind::State, "VSt07_1_0").unwrap();
        assert!(matches!(
            decode(&r, Field::TargetTemperature),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn unknown_operating_mode_is_out_of_range() {
        // bits 3-5 = 7
        let r = Response::parse(RequestKind::State, "VSt07_1_38_1715_0_0_0").unwrap();
        assert!(matches!(
            decode(&r, Field::OperatingMode),
            Err(ParseError::OutOfRange { raw: 7, .. })
        ));
    }

    #[test]
    fn unknown_mode_set_is_out_of_range() {
        // bits 6-8 = 5
        let r = Response::parse(RequestKind::State, "VSt07_141_0_1715_0_0_0").unwrap();
        assert!(matches!(
            decode(&r, Field::ModeSet),
            Err(ParseError::OutOfRange { raw: 5, .. })
        ));
    }

    #[test]
    fn decode_sensor_words() {
        let r = sensors("VSens_ff9c_0_16_0_ff9c_0_fb07_96");
        assert_eq!(
            decode(&r, Field::SupplyTemperature).unwrap(),
            Some(RegisterValue::Decimal(-10.0))
        );
        assert_eq!(
            decode(&r, Field::RoomTemperature).unwrap(),
            Some(RegisterValue::Decimal(22.0))
        );
        assert_eq!(
            decode(&r, Field::OutdoorTemperature).unwrap(),
            Some(RegisterValue::Decimal(-10.0))
        );
        assert_eq!(decode(&r, Field::WaterTemperature).unwrap(), None);
        assert_eq!(
            decode(&r, Field::PowerConsumption).unwrap(),
            Some(RegisterValue::Decimal(150.0))
        );
    }

    #[test]
    fn short_sensor_frame_reports_no_data() {
        let r = sensors("VSens_e6");
        assert_eq!(decode(&r, Field::OutdoorTemperature).unwrap(), None);
    }

    #[test]
    fn field_from_other_frame_is_rejected() {
        let r = sensors("VSens_e6");
        assert!(matches!(
            decode(&r, Field::Power),
            Err(ParseError::UnexpectedFormat(_))
        ));
    }

    #[test]
    fn snapshot_holds_whole_group() {
        let snap = decode_snapshot(Cadence::State, &state()).unwrap();
        assert_eq!(snap.cadence(), Cadence::State);
        assert_eq!(snap.len(), register_map::group(Cadence::State).count());
        assert!(snap.contains(Field::Humidity));
        assert_eq!(snap.get(Field::Humidity), None);
        assert_eq!(snap.get(Field::FanSpeed), Some(&RegisterValue::Integer(3)));
        assert!(!snap.contains(Field::SupplyTemperature));
    }

    #[test]
    fn snapshot_fails_on_any_bad_field() {
        let r = Response::parse(RequestKind::State, "VSt07_1_38_1715_0_0_0").unwrap();
        assert!(decode_snapshot(Cadence::State, &r).is_err());
    }

    #[test]
    fn encode_target_temperature_rounds() {
        let props = DeviceProperties::default();
        let cmd = encode(&Command::TargetTemperature(22.6), &props).unwrap();
        assert_eq!(cmd.data, 23);
        assert_eq!(cmd.value, RegisterValue::Decimal(23.0));
        assert_eq!(cmd.to_request(0x544b).encode(), "VWTmp_544b_17");
    }

    #[test]
    fn encode_rejects_out_of_span_temperature() {
        let props = DeviceProperties::default();
        assert_eq!(
            encode(&Command::TargetTemperature(35.0), &props),
            Err(ValueError::OutOfRange {
                min: 15,
                max: 30,
                actual: 35
            })
        );
        assert!(matches!(
            encode(&Command::TargetTemperature(f32::NAN), &props),
            Err(ValueError::NotFinite(_))
        ));
    }

    #[test]
    fn encode_uses_device_spans() {
        let props = DeviceProperties {
            temp_min: 10,
            temp_max: 35,
            speed_max: 5,
            ..DeviceProperties::default()
        };
        assert!(encode(&Command::TargetTemperature(35.0), &props).is_ok());
        assert!(encode(&Command::FanSpeed(6), &props).is_err());
        assert_eq!(encode(&Command::FanSpeed(5), &props).unwrap().data, 5);
    }

    #[test]
    fn encode_power_and_mode() {
        let props = DeviceProperties::default();
        let on = encode(&Command::Power(PowerState::On), &props).unwrap();
        assert_eq!(on.data, 1);
        assert_eq!(on.value, RegisterValue::Flag(true));

        let mode = encode(&Command::Mode(ModeSet::Ventilation), &props).unwrap();
        assert_eq!(mode.data, 4);
        assert_eq!(mode.to_request(1).encode(), "VWFtr_1_4");
    }
}
