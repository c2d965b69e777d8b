// SPDX-License-Identifier: MPL-2.0

//! Monitor program: print every state change of a unit, optionally after
//! setting a target temperature.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example monitor -- <host> <password-hex> [target-celsius]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=breezart_lib=debug cargo run --example monitor -- 192.168.1.50 544b 22
//! ```

use std::env;
use std::time::Duration;

use breezart_lib::Breezart;
use breezart_lib::subscription::Subscribable;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    if !(3..=4).contains(&args.len()) {
        eprintln!("Usage: {} <host> <password-hex> [target-celsius]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --example monitor -- 192.168.1.50 544b 22");
        std::process::exit(1);
    }

    let host = &args[1];
    let password = u16::from_str_radix(&args[2], 16)?;
    let target: Option<f32> = args.get(3).map(|t| t.parse()).transpose()?;

    println!("Connecting to {host}...");

    let client = Breezart::builder(host)
        .with_password(password)
        .connect()
        .await?;

    let state = client.wait_until_available(Duration::from_secs(10)).await?;
    let props = state.properties();
    println!("Connected!");
    println!(
        "Temperature {}..{} C, speed {}..{}",
        props.temp_min, props.temp_max, props.speed_min, props.speed_max
    );
    println!(
        "Mode {:?}, action {:?}, target {:?} C, current {:?} C",
        state.hvac_mode(),
        state.hvac_action(),
        state.target_temperature(),
        state.current_temperature()
    );

    client.on_field_changed(|change| println!("  {change}"));
    client.on_write_resolved(|write| {
        println!("  {} write {}", write.control(), write.status());
    });
    client.on_disconnected(|| println!("  unit unavailable"));

    if let Some(target) = target {
        println!("Setting target temperature to {target} C...");
        client.set_temperature(target).await?;
    }

    println!("Watching, press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    client.shutdown().await;
    println!("Done!");

    Ok(())
}
