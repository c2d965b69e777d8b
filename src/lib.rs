// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `Breezart` Lib - A Rust library to monitor and control Breezart
//! ventilation units.
//!
//! The library talks to the unit over its native TCP protocol, polls it in
//! the background and keeps an optimistic view of its state: a command shows
//! up immediately and snaps back if the unit never confirms it.
//!
//! # Supported Features
//!
//! - **Climate control**: power, target temperature, fan speed, mode
//! - **Monitoring**: temperatures, humidity, fan speed, filter and status
//!   indicators, at two poll cadences (state every 3 s, sensors every 30 s)
//! - **Optimistic state**: unconfirmed writes held for 6 s, rolled back on
//!   failure, superseded by newer writes
//! - **Events**: callbacks and a `watch` channel of the effective state
//!
//! # Quick Start
//!
//! ```no_run
//! use breezart_lib::{Breezart, HvacMode};
//!
//! #[tokio::main]
//! async fn main() -> breezart_lib::Result<()> {
//!     let client = Breezart::builder("192.168.1.50")
//!         .with_password(0x544b)
//!         .connect()
//!         .await?;
//!
//!     let state = client
//!         .wait_until_available(std::time::Duration::from_secs(10))
//!         .await?;
//!     println!("Target {:?} C", state.target_temperature());
//!
//!     client.set_hvac_mode(HvacMode::Heat).await?;
//!     client.set_temperature(22.0).await?;
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Watching State
//!
//! ```no_run
//! use breezart_lib::Breezart;
//! use breezart_lib::subscription::Subscribable;
//!
//! # async fn example() -> breezart_lib::Result<()> {
//! let client = Breezart::builder("192.168.1.50").connect().await?;
//!
//! client.on_field_changed(|change| println!("{change}"));
//!
//! let mut rx = client.watch_state();
//! while rx.changed().await.is_ok() {
//!     println!("{:?}", rx.borrow().hvac_action());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod codec;
mod config;
pub mod dispatcher;
pub mod error;
pub mod poller;
mod properties;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use client::{Breezart, BreezartBuilder};
pub use codec::{Command, Control, Field, RegisterValue, Tolerance};
pub use config::ClientConfig;
pub use error::{Error, ParseError, ProtocolError, Result, ValueError};
pub use properties::{DeviceProperties, ProtocolVersion};
pub use protocol::{TcpTransport, Transport};
pub use state::{EffectiveState, FieldChange, WriteHandle, WriteStatus};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use types::{
    HvacAction, HvacMode, IndicatorState, MessageSeverity, ModeSet, OperatingMode, PowerState,
    UnitState,
};
