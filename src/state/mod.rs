// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state: confirmed snapshots, optimistic writes and the merged view.
//!
//! - [`DeviceSnapshot`]: fields decoded from one poll
//! - [`PendingWrite`]: a command awaiting confirmation, tracked by a [`WriteHandle`]
//! - [`EffectiveState`]: what consumers see
//! - [`OptimisticStore`]: merges the above
//! - [`FieldChange`]: one visible change, passed to subscribers

mod effective;
mod pending;
mod snapshot;
mod state_change;
mod store;

pub use effective::EffectiveState;
pub use pending::{PendingWrite, WriteHandle, WriteStatus};
pub use snapshot::DeviceSnapshot;
pub use state_change::FieldChange;
pub use store::OptimisticStore;
