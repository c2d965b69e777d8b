// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request and response frames of the native Breezart protocol.
//!
//! Requests are ASCII words joined by `_`:
//!
//! ```text
//! VSt07_544b         read state with password 0x544b
//! VWTmp_544b_17      set target temperature to 0x17 = 23 degrees
//! ```
//!
//! Numbers are lowercase hexadecimal without padding. Responses use the
//! same delimiter; their first word is the reply code (`VSt07`, `VSens`,
//! `VPr07`, or `OK` for writes) or a device error code such as `VEPas`.

use std::fmt;

use crate::error::{Error, ParseError, ProtocolError};

/// Word delimiter of requests and responses.
pub const DELIMITER: char = '_';

/// Error codes the device answers with, and their meaning.
const DEVICE_ERRORS: [(&str, &str); 5] = [
    ("VEPas", "wrong password"),
    ("VEFrm", "wrong format of request"),
    ("VECd1", "request of type 1 not found"),
    ("VECd2", "request of type 2 not found"),
    ("VEDat", "error in request data"),
];

/// Type of a protocol request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Read device properties (`VPr07`).
    Properties,
    /// Read the state frame (`VSt07`).
    State,
    /// Read the sensor frame (`VSens`).
    Sensors,
    /// Switch power (`VWPwr`).
    SetPower,
    /// Write the target temperature (`VWTmp`).
    SetTemperature,
    /// Write the fan speed (`VWSpd`).
    SetFanSpeed,
    /// Write the operating mode (`VWFtr`).
    SetMode,
}

impl RequestKind {
    /// Returns the request code sent on the wire.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Properties => "VPr07",
            Self::State => "VSt07",
            Self::Sensors => "VSens",
            Self::SetPower => "VWPwr",
            Self::SetTemperature => "VWTmp",
            Self::SetFanSpeed => "VWSpd",
            Self::SetMode => "VWFtr",
        }
    }

    /// Returns the reply code a successful response starts with.
    #[must_use]
    pub const fn reply_code(&self) -> &'static str {
        match self {
            Self::Properties => "VPr07",
            Self::State => "VSt07",
            Self::Sensors => "VSens",
            Self::SetPower | Self::SetTemperature | Self::SetFanSpeed | Self::SetMode => "OK",
        }
    }

    /// Returns `true` for requests that change device state.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::SetPower | Self::SetTemperature | Self::SetFanSpeed | Self::SetMode
        )
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A request frame.
///
/// # Examples
///
/// ```
/// use breezart_lib::protocol::{Request, RequestKind};
///
/// let read = Request::read(RequestKind::State, 21579);
/// assert_eq!(read.encode(), "VSt07_544b");
///
/// let write = Request::write(RequestKind::SetTemperature, 21579, 23);
/// assert_eq!(write.encode(), "VWTmp_544b_17");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Request {
    kind: RequestKind,
    password: u16,
    data: Option<u16>,
}

impl Request {
    /// Creates a read request.
    #[must_use]
    pub const fn read(kind: RequestKind, password: u16) -> Self {
        Self {
            kind,
            password,
            data: None,
        }
    }

    /// Creates a write request carrying one data word.
    #[must_use]
    pub const fn write(kind: RequestKind, password: u16, data: u16) -> Self {
        Self {
            kind,
            password,
            data: Some(data),
        }
    }

    /// Returns the request type.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Returns the data word, if any.
    #[must_use]
    pub const fn data(&self) -> Option<u16> {
        self.data
    }

    /// Encodes the request as sent on the wire (no terminator).
    #[must_use]
    pub fn encode(&self) -> String {
        match self.data {
            Some(data) => format!(
                "{}{DELIMITER}{:x}{DELIMITER}{data:x}",
                self.kind.code(),
                self.password
            ),
            None => format!("{}{DELIMITER}{:x}", self.kind.code(), self.password),
        }
    }
}

// The password is left out so frames can be logged.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// A response frame, correlated with the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    kind: RequestKind,
    words: Vec<String>,
}

impl Response {
    /// Parses the raw text received for a request of type `kind`.
    ///
    /// Empty words are dropped, as the device sometimes doubles delimiters.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::AuthenticationFailed`] if the password was refused
    /// - [`ProtocolError::Rejected`] for any other device error code
    /// - [`ParseError::UnexpectedFormat`] if the reply code does not belong
    ///   to `kind` (the response is not correlated with the request)
    pub fn parse(kind: RequestKind, raw: &str) -> Result<Self, Error> {
        let words: Vec<String> = raw
            .trim()
            .split(DELIMITER)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();

        let Some(code) = words.first() else {
            return Err(ParseError::UnexpectedFormat(format!("empty reply to {kind}")).into());
        };

        if let Some((err_code, reason)) = DEVICE_ERRORS.iter().find(|(c, _)| c == code) {
            if *err_code == "VEPas" {
                return Err(ProtocolError::AuthenticationFailed.into());
            }
            return Err(ProtocolError::Rejected {
                code: (*err_code).to_string(),
                reason,
            }
            .into());
        }

        if code != kind.reply_code() {
            return Err(ParseError::UnexpectedFormat(format!(
                "expected {} reply to {kind}, got {code}",
                kind.reply_code()
            ))
            .into());
        }

        Ok(Self { kind, words })
    }

    /// Returns the request type this response answers.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Returns all words; word 0 is the reply code.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Returns word `index`, if present.
    #[must_use]
    pub fn word(&self, index: usize) -> Option<&str> {
        self.words.get(index).map(String::as_str)
    }

    /// Parses word `index` as a 16-bit hexadecimal number.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingField`] if the word is absent and
    /// [`ParseError::InvalidValue`] if it is not hex or exceeds 16 bits.
    pub fn hex_word(&self, index: usize, name: &str) -> Result<u16, ParseError> {
        let word = self
            .word(index)
            .ok_or_else(|| ParseError::MissingField(format!("{name} (word {index})")))?;
        u16::from_str_radix(word, 16).map_err(|e| ParseError::InvalidValue {
            field: name.to_string(),
            message: format!("{word:?}: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_lowercase_unpadded_hex() {
        let req = Request::write(RequestKind::SetFanSpeed, 0x00AB, 10);
        assert_eq!(req.encode(), "VWSpd_ab_a");
    }

    #[test]
    fn debug_does_not_leak_password() {
        let req = Request::read(RequestKind::State, 21579);
        let debug = format!("{req:?}");
        assert!(!debug.contains("544b"));
        assert!(!debug.contains("21579"));
    }

    #[test]
    fn parse_drops_empty_words() {
        let resp = Response::parse(RequestKind::State, "VSt07__1_2\r\n").unwrap();
        assert_eq!(resp.words(), ["VSt07", "1", "2"]);
    }

    #[test]
    fn parse_write_ok() {
        let resp = Response::parse(RequestKind::SetMode, "OK").unwrap();
        assert_eq!(resp.kind(), RequestKind::SetMode);
    }

    #[test]
    fn parse_rejects_uncorrelated_reply() {
        let err = Response::parse(RequestKind::Sensors, "VSt07_1_2").unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::UnexpectedFormat(_))));
    }

    #[test]
    fn parse_maps_wrong_password() {
        let err = Response::parse(RequestKind::State, "VEPas_544b").unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::AuthenticationFailed)
        ));
    }

    #[test]
    fn parse_maps_device_errors() {
        let err = Response::parse(RequestKind::SetTemperature, "VEDat").unwrap_err();
        match err {
            Error::Protocol(ProtocolError::Rejected { code, reason }) => {
                assert_eq!(code, "VEDat");
                assert_eq!(reason, "error in request data");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_empty_is_error() {
        assert!(Response::parse(RequestKind::State, "  \n").is_err());
    }

    #[test]
    fn hex_word_errors() {
        let resp = Response::parse(RequestKind::State, "VSt07_zz").unwrap();
        assert!(matches!(
            resp.hex_word(1, "bitState"),
            Err(ParseError::InvalidValue { .. })
        ));
        assert!(matches!(
            resp.hex_word(2, "bitMode"),
            Err(ParseError::MissingField(_))
        ));
    }
}
