// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Optimistic state store.
//!
//! The store reconciles three sources: the latest confirmed snapshot of
//! each cadence group, writes the client has issued but the unit has not
//! yet confirmed, and changes made on the unit itself (its remote or panel),
//! which simply show up in snapshots.
//!
//! A write is shown immediately as an override of its control's field. It
//! is confirmed by the first snapshot reporting the requested value, and
//! dropped (the field snaps back to the confirmed value) when it fails, when
//! a newer write to the same control replaces it, or when the hold elapses.
//!
//! All mutations run under one `parking_lot::Mutex`. Watchers and callbacks
//! are notified after the lock is released.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use super::{DeviceSnapshot, EffectiveState, FieldChange, PendingWrite, WriteHandle, WriteStatus};
use crate::codec::{Cadence, Control, Field, RegisterValue, Tolerance};
use crate::properties::DeviceProperties;
use crate::subscription::CallbackRegistry;

/// Reconciles confirmed snapshots with optimistic writes.
///
/// # Examples
///
/// ```
/// use breezart_lib::codec::{Cadence, Control, Field, RegisterValue};
/// use breezart_lib::state::{DeviceSnapshot, OptimisticStore, WriteStatus};
///
/// let store = OptimisticStore::new();
/// store.apply_snapshot(
///     DeviceSnapshot::new(Cadence::State, tokio::time::Instant::now())
///         .with_value(Field::TargetTemperature, RegisterValue::Decimal(21.0)),
/// );
///
/// let handle = store.register_optimistic(Control::TargetTemperature, RegisterValue::Decimal(23.0));
/// assert_eq!(store.effective_state().target_temperature(), Some(23.0));
///
/// store.mark_failed(handle);
/// assert_eq!(store.effective_state().target_temperature(), Some(21.0));
/// assert_eq!(store.write_status(handle), Some(WriteStatus::Failed));
/// ```
pub struct OptimisticStore {
    inner: Mutex<Inner>,
    hold: Duration,
    tolerances: BTreeMap<Control, Tolerance>,
    history_limit: usize,
    callbacks: CallbackRegistry,
    state_tx: watch::Sender<EffectiveState>,
}

struct Inner {
    baselines: HashMap<Cadence, DeviceSnapshot>,
    active: BTreeMap<Control, PendingWrite>,
    history: VecDeque<PendingWrite>,
    next_handle: u64,
    properties: DeviceProperties,
    available: bool,
    effective: EffectiveState,
}

/// Work left for after the lock is released.
#[derive(Default)]
struct Notifications {
    resolved: Vec<PendingWrite>,
    changes: Vec<FieldChange>,
    state: Option<EffectiveState>,
    availability: Option<bool>,
}

impl OptimisticStore {
    /// Default time an unconfirmed write stays visible.
    pub const DEFAULT_HOLD: Duration = Duration::from_secs(6);
    /// Default number of resolved writes kept for status queries.
    pub const DEFAULT_HISTORY_LIMIT: usize = 32;

    /// Creates an empty store with the default hold.
    #[must_use]
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(EffectiveState::default());
        Self {
            inner: Mutex::new(Inner {
                baselines: HashMap::new(),
                active: BTreeMap::new(),
                history: VecDeque::new(),
                next_handle: 1,
                properties: DeviceProperties::default(),
                available: false,
                effective: EffectiveState::default(),
            }),
            hold: Self::DEFAULT_HOLD,
            tolerances: BTreeMap::new(),
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            callbacks: CallbackRegistry::new(),
            state_tx,
        }
    }

    /// Sets how long an unconfirmed write stays visible.
    #[must_use]
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Overrides the match tolerance used to confirm writes to `control`.
    #[must_use]
    pub fn with_tolerance(mut self, control: Control, tolerance: Tolerance) -> Self {
        self.tolerances.insert(control, tolerance);
        self
    }

    /// Sets how many resolved writes are kept for [`write_status`](Self::write_status).
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Returns the hold.
    #[must_use]
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Returns the match tolerance for `control`.
    #[must_use]
    pub fn tolerance(&self, control: Control) -> Tolerance {
        self.tolerances
            .get(&control)
            .copied()
            .unwrap_or_else(|| control.default_tolerance())
    }

    /// Returns the subscription registry notified by this store.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Returns a receiver that observes every new effective state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<EffectiveState> {
        self.state_tx.subscribe()
    }

    /// Stores `snapshot` as the confirmed baseline of its cadence group and
    /// confirms the pending writes it matches.
    ///
    /// A snapshot older than the current baseline of its group is ignored.
    pub fn apply_snapshot(&self, snapshot: DeviceSnapshot) {
        let notes = {
            let mut inner = self.inner.lock();
            let mut notes = Notifications::default();
            let cadence = snapshot.cadence();

            if inner
                .baselines
                .get(&cadence)
                .is_some_and(|current| current.taken_at() > snapshot.taken_at())
            {
                tracing::debug!(%cadence, "Ignoring stale snapshot");
                return;
            }

            self.sweep_locked(&mut inner, snapshot.taken_at(), &mut notes);

            let confirmed: Vec<Control> = inner
                .active
                .values()
                .filter(|write| {
                    snapshot.get(write.control().field()).is_some_and(|reported| {
                        write
                            .value()
                            .matches(reported, self.tolerance(write.control()))
                    })
                })
                .map(PendingWrite::control)
                .collect();
            for control in confirmed {
                tracing::debug!(%control, "Write confirmed");
                self.resolve_locked(&mut inner, control, WriteStatus::Confirmed, &mut notes);
            }

            for write in inner.active.values() {
                if let Some(reported) = snapshot.get(write.control().field()) {
                    tracing::debug!(
                        control = %write.control(),
                        requested = %write.value(),
                        %reported,
                        "Write not yet confirmed"
                    );
                }
            }

            inner.baselines.insert(cadence, snapshot);
            self.commit_locked(&mut inner, &mut notes);
            notes
        };
        self.publish(notes);
    }

    /// Registers an optimistic write of `value` to `control`.
    ///
    /// Any pending write to the same control is superseded. The override is
    /// visible to readers before this returns.
    pub fn register_optimistic(&self, control: Control, value: RegisterValue) -> WriteHandle {
        let (handle, notes) = {
            let mut inner = self.inner.lock();
            let mut notes = Notifications::default();
            let now = Instant::now();

            self.sweep_locked(&mut inner, now, &mut notes);
            if inner.active.contains_key(&control) {
                tracing::debug!(%control, "Write superseded");
                self.resolve_locked(&mut inner, control, WriteStatus::Superseded, &mut notes);
            }

            let handle = WriteHandle::new(inner.next_handle);
            inner.next_handle += 1;
            tracing::debug!(%control, %value, %handle, "Optimistic write registered");
            inner
                .active
                .insert(control, PendingWrite::new(handle, control, value, now));

            self.commit_locked(&mut inner, &mut notes);
            (handle, notes)
        };
        self.publish(notes);
        handle
    }

    /// Marks a write as failed and reverts its override immediately.
    ///
    /// Returns `false` if the write is no longer pending.
    pub fn mark_failed(&self, handle: WriteHandle) -> bool {
        let (found, notes) = {
            let mut inner = self.inner.lock();
            let mut notes = Notifications::default();
            let control = inner
                .active
                .values()
                .find(|w| w.handle() == handle)
                .map(PendingWrite::control);

            if let Some(control) = control {
                tracing::debug!(%control, %handle, "Write failed, reverting");
                self.resolve_locked(&mut inner, control, WriteStatus::Failed, &mut notes);
                self.commit_locked(&mut inner, &mut notes);
            }
            (control.is_some(), notes)
        };
        self.publish(notes);
        found
    }

    /// Expires pending writes older than the hold.
    ///
    /// Returns the number of writes expired.
    pub fn sweep_expired(&self) -> usize {
        let notes = {
            let mut inner = self.inner.lock();
            let mut notes = Notifications::default();
            self.sweep_locked(&mut inner, Instant::now(), &mut notes);
            if !notes.resolved.is_empty() {
                self.commit_locked(&mut inner, &mut notes);
            }
            notes
        };
        let expired = notes.resolved.len();
        self.publish(notes);
        expired
    }

    /// Returns the merged state, after expiring stale writes.
    #[must_use]
    pub fn effective_state(&self) -> EffectiveState {
        self.sweep_expired();
        self.inner.lock().effective.clone()
    }

    /// Returns the status of a write, if it is pending or still in history.
    #[must_use]
    pub fn write_status(&self, handle: WriteHandle) -> Option<WriteStatus> {
        self.sweep_expired();
        let inner = self.inner.lock();
        inner
            .active
            .values()
            .chain(inner.history.iter())
            .find(|w| w.handle() == handle)
            .map(PendingWrite::status)
    }

    /// Returns the pending write for `control`, if any.
    #[must_use]
    pub fn pending(&self, control: Control) -> Option<PendingWrite> {
        self.sweep_expired();
        self.inner.lock().active.get(&control).cloned()
    }

    /// Records whether the unit answers polls.
    ///
    /// Returns `true` if availability changed; connected or disconnected
    /// callbacks then run.
    pub fn set_available(&self, available: bool) -> bool {
        let notes = {
            let mut inner = self.inner.lock();
            if inner.available == available {
                return false;
            }
            let mut notes = Notifications::default();
            inner.available = available;
            notes.availability = Some(available);
            self.commit_locked(&mut inner, &mut notes);
            notes
        };
        self.publish(notes);
        true
    }

    /// Replaces the unit's properties.
    pub fn set_properties(&self, properties: DeviceProperties) {
        let notes = {
            let mut inner = self.inner.lock();
            let mut notes = Notifications::default();
            inner.properties = properties;
            self.commit_locked(&mut inner, &mut notes);
            notes
        };
        self.publish(notes);
    }

    /// Returns the unit's properties.
    #[must_use]
    pub fn properties(&self) -> DeviceProperties {
        self.inner.lock().properties.clone()
    }

    /// Returns `true` if the unit answered its last poll.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.inner.lock().available
    }

    fn sweep_locked(&self, inner: &mut Inner, now: Instant, notes: &mut Notifications) {
        let expired: Vec<Control> = inner
            .active
            .values()
            .filter(|w| now.saturating_duration_since(w.issued_at()) >= self.hold)
            .map(PendingWrite::control)
            .collect();
        for control in expired {
            tracing::debug!(%control, hold = ?self.hold, "Write expired without confirmation");
            self.resolve_locked(inner, control, WriteStatus::Expired, notes);
        }
    }

    fn resolve_locked(&self, inner: &mut Inner, control: Control, status: WriteStatus, notes: &mut Notifications) {
        if let Some(mut write) = inner.active.remove(&control) {
            write.resolve(status);
            notes.resolved.push(write.clone());
            inner.history.push_back(write);
            while inner.history.len() > self.history_limit {
                inner.history.pop_front();
            }
        }
    }

    fn commit_locked(&self, inner: &mut Inner, notes: &mut Notifications) {
        let mut values: BTreeMap<Field, Option<RegisterValue>> = BTreeMap::new();
        for snapshot in inner.baselines.values() {
            for (field, value) in snapshot.iter() {
                values.insert(field, value.cloned());
            }
        }
        let mut overridden = BTreeSet::new();
        for write in inner.active.values() {
            values.insert(write.control().field(), Some(write.value().clone()));
            overridden.insert(write.control());
        }

        let previous = &inner.effective;
        let next = EffectiveState::new(
            values,
            overridden,
            inner.properties.clone(),
            inner.available,
            previous.revision() + 1,
        );
        if next.same_view(previous) {
            return;
        }

        notes.changes = next.diff(previous);
        notes.state = Some(next.clone());
        inner.effective = next;
    }

    fn publish(&self, notes: Notifications) {
        if let Some(state) = &notes.state {
            // Concurrent mutators may publish out of order; keep the newest.
            self.state_tx.send_if_modified(|current| {
                if state.revision() > current.revision() {
                    *current = state.clone();
                    true
                } else {
                    false
                }
            });
        }

        self.callbacks.dispatch_resolved(&notes.resolved);
        if let Some(state) = &notes.state {
            self.callbacks.dispatch_changes(&notes.changes, state);
        }
        match notes.availability {
            Some(true) => {
                let state = notes.state.unwrap_or_else(|| self.inner.lock().effective.clone());
                self.callbacks.dispatch_connected(&state);
            }
            Some(false) => self.callbacks.dispatch_disconnected(),
            None => {}
        }
    }
}

impl Default for OptimisticStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OptimisticStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("OptimisticStore")
            .field("hold", &self.hold)
            .field("pending", &inner.active.len())
            .field("available", &inner.available)
            .finish_non_exhaustive()
    }
}
