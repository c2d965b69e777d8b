// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static properties of a Breezart unit.
//!
//! Properties describe the installation rather than its current state: the
//! allowed temperature and fan speed spans, optional equipment and firmware
//! versions. They are read once per connection with a `VPr07` request and
//! bound the values the command dispatcher accepts.

use std::fmt;

use crate::codec::bits::extract;
use crate::error::ParseError;
use crate::protocol::{RequestKind, Response};

/// Properties reported by the unit.
///
/// Until the unit has answered a properties request, the documented factory
/// spans are used.
///
/// # Examples
///
/// ```
/// use breezart_lib::DeviceProperties;
///
/// let props = DeviceProperties::default();
/// assert_eq!((props.temp_min, props.temp_max), (15, 30));
/// assert_eq!((props.speed_min, props.speed_max), (1, 10));
/// assert!(props.allows_temperature(22));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceProperties {
    /// Lowest settable target temperature in degrees Celsius.
    pub temp_min: u8,
    /// Highest settable target temperature in degrees Celsius.
    pub temp_max: u8,
    /// Lowest fan speed step.
    pub speed_min: u8,
    /// Highest fan speed step.
    pub speed_max: u8,
    /// A cooler is installed.
    pub has_cooler: bool,
    /// A humidifier is installed.
    pub has_humidifier: bool,
    /// Protocol version, `major.minor`.
    pub protocol_version: Option<ProtocolVersion>,
    /// Controller firmware version.
    pub firmware_version: Option<u16>,
}

impl Default for DeviceProperties {
    fn default() -> Self {
        Self {
            temp_min: Self::DEFAULT_TEMP_MIN,
            temp_max: Self::DEFAULT_TEMP_MAX,
            speed_min: Self::DEFAULT_SPEED_MIN,
            speed_max: Self::DEFAULT_SPEED_MAX,
            has_cooler: false,
            has_humidifier: false,
            protocol_version: None,
            firmware_version: None,
        }
    }
}

impl DeviceProperties {
    /// Factory lower temperature bound.
    pub const DEFAULT_TEMP_MIN: u8 = 15;
    /// Factory upper temperature bound.
    pub const DEFAULT_TEMP_MAX: u8 = 30;
    /// Factory lower speed bound.
    pub const DEFAULT_SPEED_MIN: u8 = 1;
    /// Factory upper speed bound.
    pub const DEFAULT_SPEED_MAX: u8 = 10;

    /// Decodes a `VPr07` response.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the response is not a properties response
    /// or a required word is missing or malformed.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_response(response: &Response) -> Result<Self, ParseError> {
        if response.kind() != RequestKind::Properties {
            return Err(ParseError::UnexpectedFormat(format!(
                "expected properties response, got {}",
                response.kind()
            )));
        }

        let tempr = response.hex_word(1, "bitTempr")?;
        let speed = response.hex_word(2, "bitSpeed")?;
        let misc = response.hex_word(4, "bitMisc")?;
        let proto = response.hex_word(5, "bitPrt")?;
        let firmware = response.hex_word(7, "bitVerContr").ok();

        // Byte-wide extracts always fit into u8.
        let props = Self {
            temp_min: extract(tempr, 0, 7) as u8,
            temp_max: extract(tempr, 8, 15) as u8,
            speed_min: extract(speed, 0, 7) as u8,
            speed_max: extract(speed, 8, 15) as u8,
            has_cooler: extract(misc, 14, 14) == 1,
            has_humidifier: extract(misc, 13, 13) == 1,
            protocol_version: Some(ProtocolVersion {
                major: extract(proto, 8, 15) as u8,
                minor: extract(proto, 0, 7) as u8,
            }),
            firmware_version: firmware,
        };

        if props.temp_min > props.temp_max || props.speed_min > props.speed_max {
            return Err(ParseError::InvalidValue {
                field: "properties".to_string(),
                message: format!(
                    "inverted span: temperature {}..{}, speed {}..{}",
                    props.temp_min, props.temp_max, props.speed_min, props.speed_max
                ),
            });
        }

        Ok(props)
    }

    /// Returns `true` if `degrees` is a settable target temperature.
    #[must_use]
    pub fn allows_temperature(&self, degrees: i32) -> bool {
        (i32::from(self.temp_min)..=i32::from(self.temp_max)).contains(&degrees)
    }

    /// Returns `true` if `step` is a settable fan speed.
    #[must_use]
    pub fn allows_speed(&self, step: u8) -> bool {
        (self.speed_min..=self.speed_max).contains(&step)
    }
}

/// Version of the native protocol spoken by the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProtocolVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(raw: &str) -> Result<DeviceProperties, ParseError> {
        let response = Response::parse(RequestKind::Properties, raw).unwrap();
        DeviceProperties::from_response(&response)
    }

    #[test]
    fn decode_properties_frame() {
        // temp 10..35, speed 2..8, cooler only, protocol 1.7, firmware 0x12c
        let props = properties("VPr07_230a_802_0_4000_107_0_12c").unwrap();
        assert_eq!(props.temp_min, 10);
        assert_eq!(props.temp_max, 35);
        assert_eq!(props.speed_min, 2);
        assert_eq!(props.speed_max, 8);
        assert!(props.has_cooler);
        assert!(!props.has_humidifier);
        assert_eq!(props.protocol_version.unwrap().to_string(), "1.7");
        assert_eq!(props.firmware_version, Some(300));
    }

    #[test]
    fn humidifier_bit() {
        let props = properties("VPr07_1e0f_a01_0_2000_107").unwrap();
        assert!(props.has_humidifier);
        assert!(!props.has_cooler);
        assert_eq!(props.firmware_version, None);
    }

    #[test]
    fn missing_word_is_error() {
        assert!(matches!(
            properties("VPr07_1e0f_a01"),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn inverted_span_is_error() {
        assert!(properties("VPr07_0f1e_a01_0_0_107").is_err());
    }

    #[test]
    fn wrong_response_kind() {
        let response = Response::parse(RequestKind::State, "VSt07_1").unwrap();
        assert!(DeviceProperties::from_response(&response).is_err());
    }

    #[test]
    fn bounds() {
        let props = DeviceProperties::default();
        assert!(props.allows_temperature(15));
        assert!(props.allows_temperature(30));
        assert!(!props.allows_temperature(31));
        assert!(!props.allows_speed(0));
        assert!(props.allows_speed(10));
    }
}
