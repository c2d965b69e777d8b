// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish state events.

use crate::state::{EffectiveState, FieldChange, PendingWrite};
use crate::subscription::SubscriptionId;

/// Trait for types that support event subscriptions.
///
/// Callbacks run on the task that caused the change (a poll loop or a
/// command call), after the state store has released its lock. They should
/// return quickly.
///
/// # Examples
///
/// ```no_run
/// use breezart_lib::Breezart;
/// use breezart_lib::subscription::Subscribable;
///
/// # async fn example() -> breezart_lib::Result<()> {
/// let client = Breezart::builder("192.168.1.50").with_password(0x544b).connect().await?;
///
/// let sub_id = client.on_field_changed(|change| {
///     println!("{change}");
/// });
///
/// client.on_write_resolved(|write| {
///     println!("{} write {}", write.control(), write.status());
/// });
///
/// client.unsubscribe(sub_id);
/// # Ok(())
/// # }
/// ```
pub trait Subscribable {
    /// Subscribes to effective state changes.
    ///
    /// The callback receives the whole state once per store mutation that
    /// changed at least one field value, after the field-change callbacks.
    /// Changes to availability, device properties or override flags alone
    /// do not fire it; `watch_state` sees those too, and availability has
    /// its own [`on_connected`](Self::on_connected) and
    /// [`on_disconnected`](Self::on_disconnected) callbacks.
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static;

    /// Subscribes to individual field changes.
    fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FieldChange) + Send + Sync + 'static;

    /// Subscribes to writes reaching a terminal status (confirmed, failed,
    /// expired or superseded).
    fn on_write_resolved<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PendingWrite) + Send + Sync + 'static;

    /// Subscribes to the unit becoming available.
    ///
    /// The callback receives the state at the time of the transition.
    fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static;

    /// Subscribes to the unit becoming unavailable.
    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
