// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation scenarios against a simulated unit, on paused time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use breezart_lib::protocol::{Request, RequestKind, Response, Transport};
use breezart_lib::subscription::Subscribable;
use breezart_lib::{
    Breezart, ClientConfig, Control, Error, HvacMode, ModeSet, ProtocolError, WriteStatus,
};
use parking_lot::Mutex;

const PROPERTIES: &str = "VPr07_230a_802_0_4000_107_0_12c";
const SENSORS: &str = "VSens_e6_0_16_0_ff9c_0_fb07_96";

/// Registers of the simulated unit.
#[derive(Debug, Clone, Copy)]
struct Registers {
    power: bool,
    target: u8,
    fan_target: u8,
    mode: u8,
}

/// An in-memory unit that optionally obeys writes.
#[derive(Debug)]
struct SimulatedUnit {
    registers: Mutex<Registers>,
    obey_writes: AtomicBool,
    fail_writes: AtomicBool,
    offline: AtomicBool,
    reject_sensors: AtomicBool,
    property_reads: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl SimulatedUnit {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            registers: Mutex::new(Registers {
                power: true,
                target: 21,
                fan_target: 4,
                mode: 3,
            }),
            obey_writes: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            reject_sensors: AtomicBool::new(false),
            property_reads: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
        })
    }

    fn state_frame(&self) -> String {
        let r = *self.registers.lock();
        // Power in bit 0, filter flag in bit 5, requested mode in bits 6-8.
        let bits = 0x20 | u16::from(r.power) | (u16::from(r.mode) << 6);
        format!(
            "VSt07_{bits:x}_21_{:x}15_ff_37{:x}3_c90_0_0_0_Filter",
            r.target, r.fan_target
        )
    }

    fn apply(&self, kind: RequestKind, data: u16) {
        let mut r = self.registers.lock();
        // Data words of accepted writes always fit a byte.
        let byte = u8::try_from(data).unwrap_or(u8::MAX);
        match kind {
            RequestKind::SetPower => r.power = data == 1,
            RequestKind::SetTemperature => r.target = byte,
            RequestKind::SetFanSpeed => r.fan_target = byte,
            RequestKind::SetMode => r.mode = byte,
            _ => {}
        }
    }
}

/// Shares one simulated unit between the client and the test.
#[derive(Debug, Clone)]
struct SharedUnit(Arc<SimulatedUnit>);

impl Transport for SharedUnit {
    async fn send_request(&self, request: &Request) -> breezart_lib::Result<Response> {
        let unit = &self.0;
        if unit.offline.load(Ordering::SeqCst) {
            return Err(ProtocolError::Timeout(5000).into());
        }
        let kind = request.kind();
        if kind.is_write() {
            if unit.fail_writes.load(Ordering::SeqCst) {
                return Err(ProtocolError::Timeout(5000).into());
            }
            unit.writes.lock().push(request.encode());
            if unit.obey_writes.load(Ordering::SeqCst) {
                unit.apply(kind, request.data().unwrap_or_default());
            }
            return Response::parse(kind, "OK");
        }
        let frame = match kind {
            RequestKind::Properties => {
                unit.property_reads.fetch_add(1, Ordering::SeqCst);
                PROPERTIES.to_string()
            }
            RequestKind::Sensors if unit.reject_sensors.load(Ordering::SeqCst) => {
                "VECd1".to_string()
            }
            RequestKind::Sensors => SENSORS.to_string(),
            _ => unit.state_frame(),
        };
        Response::parse(kind, &frame)
    }

    async fn close(&self) {}

    fn is_connected(&self) -> bool {
        !self.0.offline.load(Ordering::SeqCst)
    }
}

async fn start(unit: &Arc<SimulatedUnit>) -> Breezart<SharedUnit> {
    let config = ClientConfig::new("simulated").with_password(0x544b);
    let client = Breezart::with_transport(SharedUnit(unit.clone()), &config);
    client
        .wait_until_available(Duration::from_secs(1))
        .await
        .unwrap();
    // Let both loops finish their first tick.
    tokio::time::sleep(Duration::from_millis(10)).await;
    client
}

fn record_resolutions(client: &Breezart<SharedUnit>) -> Arc<Mutex<Vec<(Control, WriteStatus)>>> {
    let resolved = Arc::new(Mutex::new(Vec::new()));
    let sink = resolved.clone();
    client.on_write_resolved(move |write| sink.lock().push((write.control(), write.status())));
    resolved
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_write_snaps_back_after_hold() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;
    let resolved = record_resolutions(&client);
    assert_eq!(client.effective_state().target_temperature(), Some(21.0));

    let handle = client
        .execute(breezart_lib::Command::TargetTemperature(23.0))
        .await
        .unwrap();
    assert_eq!(client.effective_state().target_temperature(), Some(23.0));
    assert!(client.effective_state().is_overridden(Control::TargetTemperature));

    // Polls keep reporting 21 while the override holds.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(client.effective_state().target_temperature(), Some(23.0));
    assert_eq!(client.write_status(handle), Some(WriteStatus::Pending));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(client.effective_state().target_temperature(), Some(21.0));
    assert_eq!(client.write_status(handle), Some(WriteStatus::Expired));
    assert_eq!(
        resolved.lock().as_slice(),
        [(Control::TargetTemperature, WriteStatus::Expired)]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_write_reverts_immediately() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;
    let resolved = record_resolutions(&client);
    unit.fail_writes.store(true, Ordering::SeqCst);

    let err = client.set_temperature(23.0).await.unwrap_err();
    match &err {
        Error::Communication { control, source } => {
            assert_eq!(*control, Control::TargetTemperature);
            assert!(matches!(
                **source,
                Error::Protocol(ProtocolError::Timeout(5000))
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.effective_state().target_temperature(), Some(21.0));
    assert!(!client.effective_state().is_overridden(Control::TargetTemperature));
    assert_eq!(
        resolved.lock().as_slice(),
        [(Control::TargetTemperature, WriteStatus::Failed)]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn obeyed_write_is_confirmed_by_next_poll() {
    let unit = SimulatedUnit::new();
    unit.obey_writes.store(true, Ordering::SeqCst);
    let client = start(&unit).await;

    let handle = client
        .execute(breezart_lib::Command::FanSpeed(6))
        .await
        .unwrap();
    // The early refresh reads the new value.
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(client.write_status(handle), Some(WriteStatus::Confirmed));
    let state = client.effective_state();
    assert_eq!(state.fan_speed(), Some(6));
    assert!(!state.is_overridden(Control::FanSpeed));

    // Confirmed values stay after the hold.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(client.effective_state().fan_speed(), Some(6));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn newer_write_supersedes_older() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;

    let first = client
        .execute(breezart_lib::Command::TargetTemperature(23.0))
        .await
        .unwrap();
    let second = client
        .execute(breezart_lib::Command::TargetTemperature(25.0))
        .await
        .unwrap();

    assert_eq!(client.write_status(first), Some(WriteStatus::Superseded));
    assert_eq!(client.write_status(second), Some(WriteStatus::Pending));
    assert_eq!(client.effective_state().target_temperature(), Some(25.0));
    assert_eq!(
        unit.writes.lock().as_slice(),
        ["VWTmp_544b_17", "VWTmp_544b_19"]
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn change_made_on_the_unit_shows_on_next_poll() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;
    let mut rx = client.watch_state();
    rx.borrow_and_update();

    unit.registers.lock().target = 18;
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().target_temperature(), Some(18.0));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn outage_flips_availability_and_reloads_properties() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;
    let connected = Arc::new(AtomicUsize::new(0));
    let disconnected = Arc::new(AtomicUsize::new(0));
    let (c, d) = (connected.clone(), disconnected.clone());
    client.on_connected(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    client.on_disconnected(move || {
        d.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(unit.property_reads.load(Ordering::SeqCst), 1);

    unit.offline.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!client.is_available());
    assert_eq!(disconnected.load(Ordering::SeqCst), 1);

    unit.offline.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(client.is_available());
    assert_eq!(connected.load(Ordering::SeqCst), 1);
    assert_eq!(unit.property_reads.load(Ordering::SeqCst), 2);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_sensor_frame_keeps_unit_available() {
    let unit = SimulatedUnit::new();
    unit.reject_sensors.store(true, Ordering::SeqCst);
    let client = start(&unit).await;
    let connected = Arc::new(AtomicUsize::new(0));
    let disconnected = Arc::new(AtomicUsize::new(0));
    let (c, d) = (connected.clone(), disconnected.clone());
    client.on_connected(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    client.on_disconnected(move || {
        d.fetch_add(1, Ordering::SeqCst);
    });

    // Four sensor ticks fail while the state loop keeps succeeding.
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(client.is_available());
    assert_eq!(connected.load(Ordering::SeqCst), 0);
    assert_eq!(disconnected.load(Ordering::SeqCst), 0);
    assert_eq!(unit.property_reads.load(Ordering::SeqCst), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn override_expires_while_unit_is_offline() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;

    client.set_fan_speed(7).await.unwrap();
    unit.offline.store(true, Ordering::SeqCst);

    let mut rx = client.watch_state();
    tokio::time::sleep(Duration::from_secs(10)).await;

    // The sweep on poll ticks published the snap-back without a read.
    assert_eq!(rx.borrow_and_update().fan_speed(), Some(4));
    assert!(!client.is_available());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hvac_mode_from_off_powers_on_then_sets_mode() {
    let unit = SimulatedUnit::new();
    unit.registers.lock().power = false;
    let client = start(&unit).await;
    assert_eq!(client.effective_state().hvac_mode(), Some(HvacMode::Off));

    client.set_hvac_mode(HvacMode::Cool).await.unwrap();

    assert_eq!(
        unit.writes.lock().as_slice(),
        ["VWPwr_544b_1", "VWFtr_544b_2"]
    );
    let state = client.effective_state();
    assert_eq!(state.power(), Some(true));
    assert_eq!(state.mode_set(), Some(ModeSet::Cool));
    assert_eq!(state.hvac_mode(), Some(HvacMode::Cool));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn out_of_range_value_never_reaches_the_unit() {
    let unit = SimulatedUnit::new();
    let client = start(&unit).await;

    // The unit allows 10..=35 degrees.
    let err = client.set_temperature(40.0).await.unwrap_err();
    assert!(matches!(err, Error::Value(_)));
    assert!(!err.is_transient());
    assert!(unit.writes.lock().is_empty());
    assert_eq!(client.effective_state().target_temperature(), Some(21.0));

    client.shutdown().await;
}
