// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Confirmed device state decoded from one poll.

use std::collections::BTreeMap;

use tokio::time::Instant;

use crate::codec::{Cadence, Field, RegisterValue};

/// Immutable record of the fields decoded from one poll.
///
/// A field can be present without a value: the unit reported its no-data
/// sentinel. Fields of the other cadence group are absent.
///
/// # Examples
///
/// ```
/// use breezart_lib::codec::{Cadence, Field, RegisterValue};
/// use breezart_lib::state::DeviceSnapshot;
///
/// let snapshot = DeviceSnapshot::new(Cadence::State, tokio::time::Instant::now())
///     .with_value(Field::TargetTemperature, RegisterValue::Decimal(21.0))
///     .with_unavailable(Field::Humidity);
///
/// assert_eq!(snapshot.get(Field::TargetTemperature), Some(&RegisterValue::Decimal(21.0)));
/// assert!(snapshot.contains(Field::Humidity));
/// assert_eq!(snapshot.get(Field::Humidity), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    cadence: Cadence,
    taken_at: Instant,
    values: BTreeMap<Field, Option<RegisterValue>>,
}

impl DeviceSnapshot {
    /// Creates an empty snapshot of `cadence` taken at `taken_at`.
    #[must_use]
    pub fn new(cadence: Cadence, taken_at: Instant) -> Self {
        Self {
            cadence,
            taken_at,
            values: BTreeMap::new(),
        }
    }

    /// Adds a field value.
    #[must_use]
    pub fn with_value(mut self, field: Field, value: RegisterValue) -> Self {
        self.values.insert(field, Some(value));
        self
    }

    /// Adds a field the unit reported no data for.
    #[must_use]
    pub fn with_unavailable(mut self, field: Field) -> Self {
        self.values.insert(field, None);
        self
    }

    pub(crate) fn insert(&mut self, field: Field, value: Option<RegisterValue>) {
        self.values.insert(field, value);
    }

    /// Returns the cadence group.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Returns when the snapshot was decoded.
    #[must_use]
    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    /// Returns the value of `field`, or `None` if absent or unavailable.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&RegisterValue> {
        self.values.get(&field).and_then(Option::as_ref)
    }

    /// Returns `true` if the snapshot reports `field`, with or without data.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Iterates over the reported fields in map order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, Option<&RegisterValue>)> {
        self.values.iter().map(|(f, v)| (*f, v.as_ref()))
    }

    /// Returns the number of reported fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no field is reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
