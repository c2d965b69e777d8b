// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for state subscriptions.
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry storing and dispatching callbacks

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::{EffectiveState, FieldChange, PendingWrite};

/// Unique identifier for a subscription.
///
/// Returned when subscribing and used to unsubscribe later. IDs are unique
/// within a registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

type StateCallback = Arc<dyn Fn(&EffectiveState) + Send + Sync>;
type FieldCallback = Arc<dyn Fn(&FieldChange) + Send + Sync>;
type WriteCallback = Arc<dyn Fn(&PendingWrite) + Send + Sync>;
type DisconnectedCallback = Arc<dyn Fn() + Send + Sync>;

/// Registry of subscription callbacks.
///
/// Thread-safe through `parking_lot::RwLock`. Callbacks are wrapped in `Arc`
/// and cloned out of the registry before they run, so a callback may itself
/// subscribe or unsubscribe.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    state_changed: RwLock<HashMap<SubscriptionId, StateCallback>>,
    field_changed: RwLock<HashMap<SubscriptionId, FieldCallback>>,
    write_resolved: RwLock<HashMap<SubscriptionId, WriteCallback>>,
    connected: RwLock<HashMap<SubscriptionId, StateCallback>>,
    disconnected: RwLock<HashMap<SubscriptionId, DisconnectedCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state_changed: RwLock::new(HashMap::new()),
            field_changed: RwLock::new(HashMap::new()),
            write_resolved: RwLock::new(HashMap::new()),
            connected: RwLock::new(HashMap::new()),
            disconnected: RwLock::new(HashMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a callback receiving the effective state after each change.
    pub fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.state_changed.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback receiving each changed field.
    pub fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FieldChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.field_changed.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback receiving writes as they reach a terminal status.
    pub fn on_write_resolved<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PendingWrite) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.write_resolved.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for when the unit becomes available.
    pub fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.connected.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for when the unit becomes unavailable.
    pub fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.disconnected.write().insert(id, Arc::new(callback));
        id
    }

    /// Unregisters a callback. Returns `true` if it was found.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state_changed.write().remove(&id).is_some()
            || self.field_changed.write().remove(&id).is_some()
            || self.write_resolved.write().remove(&id).is_some()
            || self.connected.write().remove(&id).is_some()
            || self.disconnected.write().remove(&id).is_some()
    }

    /// Removes all callbacks.
    pub fn clear(&self) {
        self.state_changed.write().clear();
        self.field_changed.write().clear();
        self.write_resolved.write().clear();
        self.connected.write().clear();
        self.disconnected.write().clear();
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches field changes, then the resulting state.
    ///
    /// Nothing is dispatched if `changes` is empty.
    pub fn dispatch_changes(&self, changes: &[FieldChange], state: &EffectiveState) {
        if changes.is_empty() {
            return;
        }
        let field_callbacks = snapshot(&self.field_changed);
        for change in changes {
            for callback in &field_callbacks {
                callback(change);
            }
        }
        for callback in snapshot(&self.state_changed) {
            callback(state);
        }
    }

    /// Dispatches resolved writes.
    pub fn dispatch_resolved(&self, writes: &[PendingWrite]) {
        if writes.is_empty() {
            return;
        }
        let callbacks = snapshot(&self.write_resolved);
        for write in writes {
            for callback in &callbacks {
                callback(write);
            }
        }
    }

    /// Dispatches the connected event.
    pub fn dispatch_connected(&self, state: &EffectiveState) {
        for callback in snapshot(&self.connected) {
            callback(state);
        }
    }

    /// Dispatches the disconnected event.
    pub fn dispatch_disconnected(&self) {
        for callback in snapshot(&self.disconnected) {
            callback();
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state_changed.read().len()
            + self.field_changed.read().len()
            + self.write_resolved.read().len()
            + self.connected.read().len()
            + self.disconnected.read().len()
    }

    /// Returns `true` if no callback is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callback_count() == 0
    }
}

fn snapshot<T: ?Sized>(map: &RwLock<HashMap<SubscriptionId, Arc<T>>>) -> Vec<Arc<T>> {
    map.read().values().cloned().collect()
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;
    use crate::codec::{Field, RegisterValue};

    fn change() -> FieldChange {
        FieldChange::new(Field::Power, None, Some(RegisterValue::Flag(true)))
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId::new(42).to_string(), "Sub(42)");
    }

    #[test]
    fn field_and_state_callbacks() {
        let registry = CallbackRegistry::new();
        let fields = Arc::new(AtomicU32::new(0));
        let states = Arc::new(AtomicU32::new(0));
        let f = fields.clone();
        let s = states.clone();

        registry.on_field_changed(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let id = registry.on_state_changed(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        let state = EffectiveState::default();
        registry.dispatch_changes(&[change(), change()], &state);
        assert_eq!(fields.load(Ordering::SeqCst), 2);
        assert_eq!(states.load(Ordering::SeqCst), 1);

        // No changes, no dispatch.
        registry.dispatch_changes(&[], &state);
        assert_eq!(states.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        registry.dispatch_changes(&[change()], &state);
        assert_eq!(states.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let slot = Arc::new(RwLock::new(None::<SubscriptionId>));
        let r = registry.clone();
        let s = slot.clone();

        let id = registry.on_disconnected(move || {
            if let Some(id) = *s.read() {
                r.unsubscribe(id);
            }
        });
        *slot.write() = Some(id);

        registry.dispatch_disconnected();
        assert!(registry.is_empty());
    }

    #[test]
    fn connected_and_disconnected() {
        let registry = CallbackRegistry::new();
        let counter = Arc::new(AtomicU32::new(0));
        let c1 = counter.clone();
        let c2 = counter.clone();

        registry.on_connected(move |state| {
            assert!(!state.is_available());
            c1.fetch_add(1, Ordering::SeqCst);
        });
        registry.on_disconnected(move || {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        registry.dispatch_connected(&EffectiveState::default());
        registry.dispatch_disconnected();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn unique_ids_and_clear() {
        let registry = CallbackRegistry::new();
        let a = registry.on_write_resolved(|_| {});
        let b = registry.on_connected(|_| {});
        assert_ne!(a, b);
        assert_eq!(registry.callback_count(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.unsubscribe(a));
    }

    #[test]
    fn registry_debug() {
        let registry = CallbackRegistry::new();
        registry.on_field_changed(|_| {});
        let debug = format!("{registry:?}");
        assert!(debug.contains("callback_count"));
    }
}
