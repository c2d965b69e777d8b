// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level client for one Breezart unit.
//!
//! A [`Breezart`] owns the whole connection scope of a unit: the transport,
//! the state store, the two poll loops and the command dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::codec::{Command, Control, Tolerance};
use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::poller::{Poller, PollerSettings, RefreshTrigger};
use crate::properties::DeviceProperties;
use crate::protocol::{TcpTransport, Transport};
use crate::state::{EffectiveState, FieldChange, OptimisticStore, PendingWrite, WriteHandle, WriteStatus};
use crate::subscription::{Subscribable, SubscriptionId};
use crate::types::{HvacMode, ModeSet};

/// A Breezart ventilation unit.
///
/// The client polls the unit in the background from the moment it is
/// created until [`shutdown`](Self::shutdown). Reads never touch the
/// network: [`effective_state`](Self::effective_state) returns the merged
/// view of the latest polls and pending commands.
///
/// # Creating a Client
///
/// ```no_run
/// use breezart_lib::Breezart;
///
/// # async fn example() -> breezart_lib::Result<()> {
/// let client = Breezart::builder("192.168.1.50")
///     .with_password(0x544b)
///     .connect()
///     .await?;
///
/// client.set_temperature(22.0).await?;
/// println!("{:?}", client.effective_state().target_temperature());
///
/// client.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Breezart<T: Transport = TcpTransport> {
    transport: Arc<T>,
    store: Arc<OptimisticStore>,
    poller: Poller,
    dispatcher: Dispatcher<T>,
    closing: AtomicBool,
}

impl Breezart<TcpTransport> {
    /// Creates a builder for the unit at `host`.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> BreezartBuilder {
        BreezartBuilder::new(ClientConfig::new(host))
    }

    /// Creates a builder from a complete configuration.
    #[must_use]
    pub fn from_config(config: ClientConfig) -> BreezartBuilder {
        BreezartBuilder::new(config)
    }
}

impl<T: Transport> Breezart<T> {
    /// Starts a client over an existing transport.
    ///
    /// Only the password, poll intervals, hold and tolerances of `config`
    /// are used; connection settings belong to the transport.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        let transport = Arc::new(transport);
        let store = Arc::new(config.store());
        let refresh = RefreshTrigger::new();

        let poller = Poller::spawn(
            transport.clone(),
            store.clone(),
            PollerSettings {
                password: config.password,
                state_interval: config.state_interval,
                sensor_interval: config.sensor_interval,
            },
            refresh.clone(),
        );
        let dispatcher =
            Dispatcher::new(transport.clone(), store.clone(), config.password).with_refresh(refresh);

        Self {
            transport,
            store,
            poller,
            dispatcher,
            closing: AtomicBool::new(false),
        }
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the state store.
    #[must_use]
    pub fn store(&self) -> &OptimisticStore {
        &self.store
    }

    // ========== State ==========

    /// Returns the current effective state.
    ///
    /// Expired writes are dropped before the view is returned.
    #[must_use]
    pub fn effective_state(&self) -> EffectiveState {
        self.store.effective_state()
    }

    /// Returns a receiver that sees every new effective state.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<EffectiveState> {
        self.store.watch()
    }

    /// Returns the unit's properties, or defaults until they are read.
    #[must_use]
    pub fn properties(&self) -> DeviceProperties {
        self.store.properties()
    }

    /// Returns `true` while the unit answers polls.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.store.is_available()
    }

    /// Returns the status of a write, if it is still tracked.
    #[must_use]
    pub fn write_status(&self, handle: WriteHandle) -> Option<WriteStatus> {
        self.store.write_status(handle)
    }

    /// Waits until the unit has answered a poll.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the unit is still unavailable after
    /// `timeout`, and [`Error::ShuttingDown`] if the client stops first.
    pub async fn wait_until_available(&self, timeout: Duration) -> Result<EffectiveState> {
        let mut rx = self.store.watch();
        let wait = async {
            loop {
                if self.closing.load(Ordering::Acquire) {
                    return Err(Error::ShuttingDown);
                }
                let state = rx.borrow_and_update().clone();
                if state.is_available() {
                    return Ok(state);
                }
                if rx.changed().await.is_err() {
                    return Err(Error::ShuttingDown);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::NotConnected)?
    }

    /// Requests an immediate state read.
    pub fn refresh_now(&self) {
        self.poller.refresh_now();
    }

    // ========== Commands ==========

    /// Sends a command and returns the handle of its optimistic write.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`Error::Value`] if the value is invalid for the unit
    /// - [`Error::Communication`] if the unit could not be reached or
    ///   rejected the command; the override has been rolled back
    pub async fn execute(&self, command: Command) -> Result<WriteHandle> {
        self.ensure_running()?;
        self.dispatcher.execute(command).await
    }

    /// Sets the target temperature in degrees Celsius.
    ///
    /// The value is rounded to a whole degree.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_temperature(&self, celsius: f32) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_temperature(celsius).await.map(drop)
    }

    /// Sets the fan speed step.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_fan_speed(&self, step: u8) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_fan_speed(step).await.map(drop)
    }

    /// Sets the requested operating mode.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_mode(&self, mode: ModeSet) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_mode(mode).await.map(drop)
    }

    /// Turns the unit on or off.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_power(on).await.map(drop)
    }

    /// Applies a climate-style mode, powering the unit on or off as needed.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_hvac_mode(mode).await.map(drop)
    }

    // ========== Lifecycle ==========

    /// Stops polling and closes the connection.
    ///
    /// Waits for both poll loops to exit. Later commands fail with
    /// [`Error::ShuttingDown`]. Calling it again has no effect.
    pub async fn shutdown(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Shutting down Breezart client");
        self.poller.shutdown().await;
        self.transport.close().await;
        self.store.set_available(false);
    }

    /// Returns `true` after [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.closing.load(Ordering::Acquire) {
            Err(Error::ShuttingDown)
        } else {
            Ok(())
        }
    }
}

impl<T: Transport> Subscribable for Breezart<T> {
    fn on_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static,
    {
        self.store.callbacks().on_state_changed(callback)
    }

    fn on_field_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&FieldChange) + Send + Sync + 'static,
    {
        self.store.callbacks().on_field_changed(callback)
    }

    fn on_write_resolved<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PendingWrite) + Send + Sync + 'static,
    {
        self.store.callbacks().on_write_resolved(callback)
    }

    fn on_connected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&EffectiveState) + Send + Sync + 'static,
    {
        self.store.callbacks().on_connected(callback)
    }

    fn on_disconnected<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.callbacks().on_disconnected(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.store.callbacks().unsubscribe(id)
    }
}

// ========== Builder ==========

/// Builder for a TCP [`Breezart`] client.
#[derive(Debug, Clone)]
pub struct BreezartBuilder {
    config: ClientConfig,
}

impl BreezartBuilder {
    fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Sets the TCP port (default 1560).
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.config = self.config.with_port(port);
        self
    }

    /// Sets the password configured on the unit.
    #[must_use]
    pub fn with_password(mut self, password: u16) -> Self {
        self.config = self.config.with_password(password);
        self
    }

    /// Sets the time allowed to establish the TCP session.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Sets the time allowed for one request/response exchange.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_request_timeout(timeout);
        self
    }

    /// Sets the silence after which an unterminated reply is complete.
    #[must_use]
    pub fn with_idle_gap(mut self, gap: Duration) -> Self {
        self.config = self.config.with_idle_gap(gap);
        self
    }

    /// Sets the state poll period.
    #[must_use]
    pub fn with_state_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_state_interval(interval);
        self
    }

    /// Sets the sensor poll period.
    #[must_use]
    pub fn with_sensor_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_sensor_interval(interval);
        self
    }

    /// Sets how long an unconfirmed write stays visible.
    #[must_use]
    pub fn with_optimistic_hold(mut self, hold: Duration) -> Self {
        self.config = self.config.with_optimistic_hold(hold);
        self
    }

    /// Overrides the match tolerance of one control.
    #[must_use]
    pub fn with_tolerance(mut self, control: Control, tolerance: Tolerance) -> Self {
        self.config = self.config.with_tolerance(control, tolerance);
        self
    }

    /// Returns the configuration built so far.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens the TCP session, then starts polling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the session cannot be established
    /// within the connect timeout.
    pub async fn connect(self) -> Result<Breezart<TcpTransport>> {
        let transport = self.config.transport();
        transport.connect().await?;
        Ok(Breezart::with_transport(transport, &self.config))
    }

    /// Starts polling without connecting first.
    ///
    /// The first poll opens the session; until it succeeds the unit is
    /// reported unavailable.
    #[must_use]
    pub fn build_without_connect(self) -> Breezart<TcpTransport> {
        Breezart::with_transport(self.config.transport(), &self.config)
    }
}
