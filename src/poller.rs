// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background polling.
//!
//! Two loops read the unit at independent cadences and publish snapshots to
//! the store:
//!
//! - the state loop reads `VSt07` (default every 3 s) and can be woken early
//!   through a [`RefreshTrigger`]
//! - the sensor loop reads `VSens` (default every 30 s)
//!
//! Each loop handles its own failures and tries again on its next tick.
//! Transport failures and a refused password mark the unit unavailable; a
//! rejected or undecodable frame is only logged, so one loop's bad frame
//! never disturbs the other. Both loops expire stale
//! optimistic writes on every tick, so overrides snap back even while the
//! unit is unreachable. Device properties are read on the first successful
//! tick after each (re)connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::codec::{self, Cadence};
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::{Request, RequestKind, Transport};
use crate::state::{DeviceSnapshot, OptimisticStore};

/// Wakes the state loop for an immediate read.
///
/// Triggers coalesce: several triggers during one read cause one extra read.
#[derive(Debug, Clone, Default)]
pub struct RefreshTrigger(Arc<Notify>);

impl RefreshTrigger {
    /// Creates a trigger not yet attached to a poller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an immediate state read.
    pub fn trigger(&self) {
        self.0.notify_one();
    }

    pub(crate) async fn triggered(&self) {
        self.0.notified().await;
    }
}

/// Poll periods and credentials.
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    /// Password sent with every request.
    pub password: u16,
    /// Period of the state loop.
    pub state_interval: Duration,
    /// Period of the sensor loop.
    pub sensor_interval: Duration,
}

/// Handle to the two running poll loops.
///
/// Dropping the poller cancels the loops without waiting for them; use
/// [`Poller::shutdown`] to wait.
#[derive(Debug)]
pub struct Poller {
    cancel: CancellationToken,
    refresh: RefreshTrigger,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

struct PollContext<T> {
    transport: Arc<T>,
    store: Arc<OptimisticStore>,
    password: u16,
    needs_properties: AtomicBool,
}

impl Poller {
    /// Spawns both loops. The first reads start immediately.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn<T: Transport>(
        transport: Arc<T>,
        store: Arc<OptimisticStore>,
        settings: PollerSettings,
        refresh: RefreshTrigger,
    ) -> Self {
        let cancel = CancellationToken::new();
        let ctx = Arc::new(PollContext {
            transport,
            store,
            password: settings.password,
            needs_properties: AtomicBool::new(true),
        });

        let handles = vec![
            tokio::spawn(poll_loop(
                ctx.clone(),
                Cadence::State,
                settings.state_interval,
                Some(refresh.clone()),
                cancel.clone(),
            )),
            tokio::spawn(poll_loop(
                ctx,
                Cadence::Sensor,
                settings.sensor_interval,
                None,
                cancel.clone(),
            )),
        ];

        Self {
            cancel,
            refresh,
            handles: Mutex::new(handles),
        }
    }

    /// Requests an immediate state read.
    pub fn refresh_now(&self) {
        self.refresh.trigger();
    }

    /// Returns the trigger waking the state loop.
    #[must_use]
    pub fn refresh_trigger(&self) -> RefreshTrigger {
        self.refresh.clone()
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops both loops and waits for them to exit.
    ///
    /// An in-flight request is not aborted; the loops exit once it completes
    /// or times out.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Poll task ended abnormally");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop<T: Transport>(
    ctx: Arc<PollContext<T>>,
    cadence: Cadence,
    period: Duration,
    refresh: Option<RefreshTrigger>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
            () = wait_refresh(refresh.as_ref()) => {
                tracing::debug!(%cadence, "Early refresh requested");
                interval.reset();
            }
        }

        ctx.store.sweep_expired();
        ctx.poll(cadence).await;
    }

    tracing::debug!(%cadence, "Poll loop stopped");
}

/// Returns `true` for failures that mean the unit itself is unreachable.
fn loses_unit(error: &Error) -> bool {
    error.is_transient() || matches!(error, Error::Protocol(ProtocolError::AuthenticationFailed))
}

async fn wait_refresh(refresh: Option<&RefreshTrigger>) {
    match refresh {
        Some(trigger) => trigger.triggered().await,
        None => std::future::pending().await,
    }
}

impl<T: Transport> PollContext<T> {
    async fn poll(&self, cadence: Cadence) {
        tracing::debug!(%cadence, "Poll tick");
        match self.read(cadence).await {
            Ok(snapshot) => {
                self.store.apply_snapshot(snapshot);
                if self.store.set_available(true) {
                    tracing::info!(%cadence, "Breezart unit available");
                }
            }
            Err(e) if loses_unit(&e) => {
                tracing::warn!(%cadence, error = %e, "Poll failed");
                self.needs_properties.store(true, Ordering::Release);
                if self.store.set_available(false) {
                    tracing::info!(%cadence, "Breezart unit unavailable");
                }
            }
            Err(e) => {
                // A rejected or malformed frame stays local to this loop.
                tracing::warn!(%cadence, error = %e, "Poll reply unusable");
            }
        }
    }

    async fn read(&self, cadence: Cadence) -> Result<DeviceSnapshot> {
        if self.needs_properties.swap(false, Ordering::AcqRel) {
            self.load_properties().await;
        }
        let request = Request::read(cadence.request_kind(), self.password);
        let response = self.transport.send_request(&request).await?;
        Ok(codec::decode_snapshot(cadence, &response)?)
    }

    async fn load_properties(&self) {
        let request = Request::read(RequestKind::Properties, self.password);
        let result = match self.transport.send_request(&request).await {
            Ok(response) => codec::decode_properties(&response).map_err(Into::into),
            Err(e) => Err(e),
        };
        match result {
            Ok(props) => {
                tracing::info!(
                    temp_min = props.temp_min,
                    temp_max = props.temp_max,
                    speed_min = props.speed_min,
                    speed_max = props.speed_max,
                    firmware = ?props.firmware_version,
                    protocol = ?props.protocol_version,
                    "Device properties loaded"
                );
                self.store.set_properties(props);
            }
            Err(e) => {
                // Keep the current spans and retry on the next tick.
                tracing::warn!(error = %e, "Failed to read device properties");
                self.needs_properties.store(true, Ordering::Release);
            }
        }
    }
}
