// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::codec::{Control, Tolerance};
use crate::protocol::TcpTransport;
use crate::state::OptimisticStore;

/// Configuration of a [`Breezart`](crate::Breezart) client.
///
/// Serializable so it can be stored next to the rest of an application's
/// settings. Missing keys take their defaults.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use breezart_lib::ClientConfig;
///
/// let config = ClientConfig::new("192.168.1.50")
///     .with_password(0x544b)
///     .with_state_interval(Duration::from_secs(5));
///
/// assert_eq!(config.port, 1560);
/// assert_eq!(config.sensor_interval, Duration::from_secs(30));
/// ```
#[derive(Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostname or IP address of the unit.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Numeric password configured on the unit.
    pub password: u16,
    /// Time allowed to establish the TCP session.
    pub connect_timeout: Duration,
    /// Time allowed for one request/response exchange.
    pub request_timeout: Duration,
    /// Silence after which an unterminated reply is complete.
    pub idle_gap: Duration,
    /// Period of the state (`VSt07`) poll.
    pub state_interval: Duration,
    /// Period of the sensor (`VSens`) poll.
    pub sensor_interval: Duration,
    /// How long an unconfirmed write stays visible.
    pub optimistic_hold: Duration,
    /// Per-control match tolerance overrides.
    pub tolerances: BTreeMap<Control, Tolerance>,
}

impl ClientConfig {
    /// Default TCP port.
    pub const DEFAULT_PORT: u16 = TcpTransport::DEFAULT_PORT;
    /// Default state poll period.
    pub const DEFAULT_STATE_INTERVAL: Duration = Duration::from_secs(3);
    /// Default sensor poll period.
    pub const DEFAULT_SENSOR_INTERVAL: Duration = Duration::from_secs(30);

    /// Creates a configuration for `host` with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Sets the TCP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn with_password(mut self, password: u16) -> Self {
        self.password = password;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the reply idle gap.
    #[must_use]
    pub fn with_idle_gap(mut self, gap: Duration) -> Self {
        self.idle_gap = gap;
        self
    }

    /// Sets the state poll period.
    #[must_use]
    pub fn with_state_interval(mut self, interval: Duration) -> Self {
        self.state_interval = interval;
        self
    }

    /// Sets the sensor poll period.
    #[must_use]
    pub fn with_sensor_interval(mut self, interval: Duration) -> Self {
        self.sensor_interval = interval;
        self
    }

    /// Sets the optimistic hold.
    #[must_use]
    pub fn with_optimistic_hold(mut self, hold: Duration) -> Self {
        self.optimistic_hold = hold;
        self
    }

    /// Overrides the match tolerance of one control.
    #[must_use]
    pub fn with_tolerance(mut self, control: Control, tolerance: Tolerance) -> Self {
        self.tolerances.insert(control, tolerance);
        self
    }

    /// Builds the TCP transport described by this configuration.
    #[must_use]
    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(self.host.clone(), self.port)
            .with_connect_timeout(self.connect_timeout)
            .with_request_timeout(self.request_timeout)
            .with_idle_gap(self.idle_gap)
    }

    /// Builds an empty state store described by this configuration.
    #[must_use]
    pub fn store(&self) -> OptimisticStore {
        self.tolerances.iter().fold(
            OptimisticStore::new().with_hold(self.optimistic_hold),
            |store, (control, tolerance)| store.with_tolerance(*control, *tolerance),
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Self::DEFAULT_PORT,
            password: 0,
            connect_timeout: TcpTransport::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: TcpTransport::DEFAULT_REQUEST_TIMEOUT,
            idle_gap: TcpTransport::DEFAULT_IDLE_GAP,
            state_interval: Self::DEFAULT_STATE_INTERVAL,
            sensor_interval: Self::DEFAULT_SENSOR_INTERVAL,
            optimistic_hold: OptimisticStore::DEFAULT_HOLD,
            tolerances: BTreeMap::new(),
        }
    }
}

// The password is redacted.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("idle_gap", &self.idle_gap)
            .field("state_interval", &self.state_interval)
            .field("sensor_interval", &self.sensor_interval)
            .field("optimistic_hold", &self.optimistic_hold)
            .field("tolerances", &self.tolerances)
            .finish()
    }
}
