// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Changes of the effective state.
//!
//! Every store mutation (a snapshot, an override, an expiry) is compared
//! against the previous [`EffectiveState`](super::EffectiveState); each field
//! whose visible value differs produces one [`FieldChange`].
//!
//! # Examples
//!
//! ```
//! use breezart_lib::codec::{Field, RegisterValue};
//! use breezart_lib::state::FieldChange;
//!
//! let change = FieldChange::new(
//!     Field::TargetTemperature,
//!     Some(RegisterValue::Decimal(21.0)),
//!     Some(RegisterValue::Decimal(23.0)),
//! );
//! assert_eq!(change.to_string(), "target_temperature: 21.0 -> 23.0");
//! ```

use std::fmt;

use crate::codec::{Field, RegisterValue};

/// One field whose effective value changed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FieldChange {
    /// The field.
    pub field: Field,
    /// Value before the change; `None` if unknown or unavailable.
    pub previous: Option<RegisterValue>,
    /// Value after the change; `None` if unknown or unavailable.
    pub current: Option<RegisterValue>,
}

impl FieldChange {
    /// Creates a field change.
    #[must_use]
    pub fn new(field: Field, previous: Option<RegisterValue>, current: Option<RegisterValue>) -> Self {
        Self {
            field,
            previous,
            current,
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(value: Option<&RegisterValue>) -> String {
            value.map_or_else(|| "-".to_string(), ToString::to_string)
        }
        write!(
            f,
            "{}: {} -> {}",
            self.field,
            show(self.previous.as_ref()),
            show(self.current.as_ref())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_values() {
        let change = FieldChange::new(Field::Humidity, None, Some(RegisterValue::Integer(40)));
        assert_eq!(change.to_string(), "humidity: - -> 40");
    }

    #[test]
    fn serializes_with_field_name() {
        let change = FieldChange::new(Field::Power, Some(RegisterValue::Flag(false)), Some(RegisterValue::Flag(true)));
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"field":"power","previous":false,"current":true}"#);
    }
}
