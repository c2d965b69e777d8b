// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch.
//!
//! Every set-command follows the same path:
//!
//! 1. validate and encode it against the unit's current properties
//! 2. register it with the store, so it shows immediately
//! 3. send the write request
//! 4. on failure, roll the override back and report
//!    [`Error::Communication`]; on success, ask the poller for an early read
//!
//! A write the unit accepted stays visible until a snapshot confirms it or
//! the optimistic hold elapses.

use std::sync::Arc;

use crate::codec::{self, Command};
use crate::error::{Error, Result};
use crate::poller::RefreshTrigger;
use crate::protocol::Transport;
use crate::state::{OptimisticStore, WriteHandle};
use crate::types::{HvacMode, ModeSet, PowerState};

/// Sends set-commands and tracks them as optimistic writes.
#[derive(Debug)]
pub struct Dispatcher<T: Transport> {
    transport: Arc<T>,
    store: Arc<OptimisticStore>,
    password: u16,
    refresh: Option<RefreshTrigger>,
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher writing through `transport` into `store`.
    #[must_use]
    pub fn new(transport: Arc<T>, store: Arc<OptimisticStore>, password: u16) -> Self {
        Self {
            transport,
            store,
            password,
            refresh: None,
        }
    }

    /// Wakes `refresh` after every accepted write.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshTrigger) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Validates, registers and sends `command`.
    ///
    /// Returns the handle of the optimistic write, which stays pending until
    /// a snapshot confirms it.
    ///
    /// # Errors
    ///
    /// - [`Error::Value`] if the value is invalid for the unit; nothing is
    ///   registered or sent
    /// - [`Error::Communication`] if the request failed or the unit rejected
    ///   it; the override has been rolled back
    pub async fn execute(&self, command: Command) -> Result<WriteHandle> {
        let properties = self.store.properties();
        let encoded = codec::encode(&command, &properties)?;
        let control = encoded.control;

        let handle = self.store.register_optimistic(control, encoded.value.clone());
        tracing::debug!(%control, %handle, data = encoded.data, "Sending command");

        match self
            .transport
            .send_request(&encoded.to_request(self.password))
            .await
        {
            Ok(_) => {
                if let Some(refresh) = &self.refresh {
                    refresh.trigger();
                }
                Ok(handle)
            }
            Err(e) => {
                tracing::warn!(%control, %handle, error = %e, "Command failed");
                self.store.mark_failed(handle);
                Err(Error::communication(control, e))
            }
        }
    }

    // ========== Typed Commands ==========

    /// Sets the target temperature in degrees Celsius.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_temperature(&self, celsius: f32) -> Result<WriteHandle> {
        self.execute(Command::TargetTemperature(celsius)).await
    }

    /// Sets the fan speed step.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_fan_speed(&self, step: u8) -> Result<WriteHandle> {
        self.execute(Command::FanSpeed(step)).await
    }

    /// Sets the requested operating mode.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_mode(&self, mode: ModeSet) -> Result<WriteHandle> {
        self.execute(Command::Mode(mode)).await
    }

    /// Turns the unit on or off.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn set_power(&self, on: bool) -> Result<WriteHandle> {
        self.execute(Command::Power(PowerState::from(on))).await
    }

    /// Applies a climate-style mode.
    ///
    /// [`HvacMode::Off`] powers the unit off. Any other mode powers the unit
    /// on first when it is not known to be on, then requests the matching
    /// [`ModeSet`]. Returns the handle of the last write sent.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute). The mode is not sent when powering on
    /// fails.
    pub async fn set_hvac_mode(&self, mode: HvacMode) -> Result<WriteHandle> {
        let Some(mode_set) = mode.mode_set() else {
            return self.set_power(false).await;
        };
        if self.store.effective_state().power() != Some(true) {
            self.set_power(true).await?;
        }
        self.set_mode(mode_set).await
    }
}
