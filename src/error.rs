// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `Breezart` library.
//!
//! Errors are layered: value validation, transport communication, response
//! decoding, and the command-level umbrella that wraps a transport failure
//! with the command that could not be sent.

use thiserror::Error;

use crate::codec::Control;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested value failed validation. The device was not contacted.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred during transport communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A device response could not be decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A set-command could not be delivered to the device.
    ///
    /// The optimistic override registered for the command has already been
    /// rolled back when this error is returned.
    #[error("failed to send {control} command: {source}")]
    Communication {
        /// The control the command targeted.
        control: Control,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// The client has not been connected yet.
    #[error("device is not connected")]
    NotConnected,

    /// The client is shutting down and no longer accepts commands.
    #[error("client is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Wraps an error as a communication failure for `control`.
    #[must_use]
    pub fn communication(control: Control, source: impl Into<Error>) -> Self {
        Self::Communication {
            control,
            source: Box::new(source.into()),
        }
    }

    /// Returns `true` if the failure is transient and the operation may
    /// succeed on a later attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Protocol(e) => e.is_transient(),
            Self::Communication { source, .. } => source.is_transient(),
            Self::NotConnected => true,
            Self::Value(_) | Self::Parse(_) | Self::ShuttingDown => false,
        }
    }
}

/// Errors related to value validation and constraints.
///
/// These errors occur before anything is sent to the device.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i32,
        /// Maximum allowed value.
        max: i32,
        /// The actual value that was provided.
        actual: i32,
    },

    /// A floating point value is NaN or infinite.
    #[error("value {0} is not a finite number")]
    NotFinite(f32),

    /// An unknown mode code was provided.
    #[error("invalid mode code: {0}")]
    InvalidMode(u8),

    /// A value does not fit into a protocol data word.
    #[error("value {0} does not fit into a 16-bit data word")]
    WordOverflow(i64),
}

/// Errors related to transport communication with the device.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The TCP session could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No response arrived within the request timeout.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The socket failed mid-session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device rejected the configured password.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The device answered with an error code.
    #[error("device rejected request ({code}): {reason}")]
    Rejected {
        /// The error prefix sent by the device (e.g. `VEDat`).
        code: String,
        /// Human readable description of the code.
        reason: &'static str,
    },

    /// Invalid host or port.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transport has been closed by its owner.
    #[error("transport closed")]
    Closed,
}

impl ProtocolError {
    /// Returns `true` for failures the next poll tick or command may recover
    /// from by reconnecting.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::Io(_)
        )
    }
}

/// Errors related to decoding device responses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Expected word is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// The response does not have the expected shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// A word could not be parsed.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },

    /// A decoded raw value lies outside the field's documented range.
    #[error("raw value {raw} of {field} is out of range")]
    OutOfRange {
        /// The field being decoded.
        field: String,
        /// The raw value received.
        raw: u32,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_error_display() {
        let err = ValueError::OutOfRange {
            min: 15,
            max: 30,
            actual: 35,
        };
        assert_eq!(err.to_string(), "value 35 is out of range [15, 30]");
    }

    #[test]
    fn error_from_value_error() {
        let err: Error = ValueError::InvalidMode(9).into();
        assert!(matches!(err, Error::Value(ValueError::InvalidMode(9))));
        assert!(!err.is_transient());
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("bitTempr".to_string());
        assert_eq!(err.to_string(), "missing field in response: bitTempr");
    }

    #[test]
    fn communication_error_wraps_timeout() {
        let err = Error::communication(Control::TargetTemperature, ProtocolError::Timeout(5000));
        assert_eq!(
            err.to_string(),
            "failed to send target temperature command: protocol error: request timed out after 5000 ms"
        );
        assert!(err.is_transient());
    }

    #[test]
    fn rejected_is_not_transient() {
        let err = ProtocolError::Rejected {
            code: "VEDat".to_string(),
            reason: "error in request data",
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "device rejected request (VEDat): error in request data"
        );
    }
}
