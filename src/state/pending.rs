// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Writes awaiting confirmation by the unit.

use std::fmt;

use tokio::time::Instant;

use crate::codec::{Control, RegisterValue};

/// Identifies one optimistic write.
///
/// Handles are unique for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteHandle(u64);

impl WriteHandle {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Write({})", self.0)
    }
}

/// Lifecycle status of an optimistic write.
///
/// Only [`WriteStatus::Pending`] is active; every other status is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// Sent or being sent; the override is visible.
    Pending,
    /// A snapshot reported the requested value.
    Confirmed,
    /// The write could not be delivered.
    Failed,
    /// The hold elapsed without confirmation.
    Expired,
    /// A newer write to the same control replaced it.
    Superseded,
}

impl WriteStatus {
    /// Returns `true` for [`WriteStatus::Pending`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Superseded => "superseded",
        })
    }
}

/// A command whose effect is shown before the unit confirms it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    handle: WriteHandle,
    control: Control,
    value: RegisterValue,
    issued_at: Instant,
    status: WriteStatus,
}

impl PendingWrite {
    pub(crate) fn new(handle: WriteHandle, control: Control, value: RegisterValue, issued_at: Instant) -> Self {
        Self {
            handle,
            control,
            value,
            issued_at,
            status: WriteStatus::Pending,
        }
    }

    pub(crate) fn resolve(&mut self, status: WriteStatus) {
        self.status = status;
    }

    /// Returns the write's handle.
    #[must_use]
    pub fn handle(&self) -> WriteHandle {
        self.handle
    }

    /// Returns the control being written.
    #[must_use]
    pub fn control(&self) -> Control {
        self.control
    }

    /// Returns the requested value.
    #[must_use]
    pub fn value(&self) -> &RegisterValue {
        &self.value
    }

    /// Returns when the write was registered.
    #[must_use]
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> WriteStatus {
        self.status
    }
}
