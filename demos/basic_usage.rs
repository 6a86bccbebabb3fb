//! Basic Usage Example
//!
//! This example demonstrates the core functionality of the gauge link library:
//! - Listing and selecting serial ports
//! - Detecting the gauge's baud rate
//! - Connecting and taking a single reading
//! - Zeroing the gauge
//!
//! Usage:
//!   cargo run --example basic_usage                  # Interactive mode
//!   cargo run --example basic_usage -- COM3          # Specify port
//!   cargo run --example basic_usage -- /dev/ttyUSB0
//!
//! Set RUST_LOG environment variable to control logging:
//!   RUST_LOG=trace cargo run --example basic_usage   # includes TX/RX dumps
//!   RUST_LOG=info cargo run --example basic_usage

use gauge_link::{GaugeLink, Result};
use inquire::{Confirm, Select};
use log::info;

/// Interactive serial port selection using inquire
fn select_port(link: &GaugeLink) -> Result<String> {
    let ports = link.list_ports()?;

    if ports.is_empty() {
        eprintln!("No serial ports found!");
        std::process::exit(1);
    }

    let port_names: Vec<String> = ports
        .iter()
        .map(|p| match &p.description {
            Some(description) => format!("{} - {}", p.name, description),
            None => p.name.clone(),
        })
        .collect();

    let selection = Select::new("Select a serial port:", port_names)
        .prompt()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Selection cancelled: {}", e),
            )
        })?;

    // Extract just the port name (before " - ")
    let port_name = selection.split(" - ").next().unwrap_or(&selection).to_string();
    Ok(port_name)
}

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG is not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let link = GaugeLink::new();

    // Get port name from command line argument or interactive selection
    let port_name = std::env::args()
        .nth(1)
        .map(Ok)
        .unwrap_or_else(|| select_port(&link))?;

    info!("Detecting baud rate on {}...", port_name);
    let Some(baud_rate) = link.detect_baud_rate(&port_name)? else {
        info!("✗ No gauge answered at any supported baud rate");
        return Ok(());
    };
    info!("✓ Gauge answers at {} baud", baud_rate);

    link.connect(&port_name, baud_rate.as_u32())?;

    let reading = link.read()?;
    info!(
        "Displacement: {:.3} mm (raw {}) at {}",
        reading.value,
        reading.raw,
        reading.display_timestamp()
    );

    let zero = Confirm::new("Zero the gauge at its current position?")
        .with_default(false)
        .prompt()
        .unwrap_or(false);
    if zero {
        link.zero()?;
        info!("✓ Gauge zeroed, now reading {:.3} mm", link.read_value()?);
    }

    link.disconnect()?;
    info!("=== Basic Usage Complete ===");

    Ok(())
}
