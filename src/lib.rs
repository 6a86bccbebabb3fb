//! # Gauge Link
//!
//! A Rust library for reading digital displacement gauges through an RS-485
//! adapter speaking a small Modbus-RTU dialect.
//!
//! ## Features
//!
//! - CRC16-checked framing of read, zero and change-baud commands
//! - Connection with a probe read, so a silent device is reported at connect
//! - Baud rate auto-detection over the five supported rates
//! - Minimum polling interval calculation and baud rate suggestions
//! - Continuous reading on a background thread with prompt cancellation
//!
//! ## Example
//!
//! ```no_run
//! use gauge_link::GaugeLink;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = GaugeLink::new();
//!     link.connect("/dev/ttyUSB0", 9600)?;
//!     println!("Displacement: {:.3} mm", link.read_value()?);
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod config;
pub mod constants;
pub mod detect;
pub mod error;
pub mod frame;
pub mod interval;
pub mod poll;
pub mod protocol;
pub mod transport;
pub mod types;

pub use config::LinkConfig;
pub use error::{FrameError, GaugeError, Result};
pub use poll::{PollEvent, PollScheduler, PollSession};
pub use protocol::GaugeLink;
pub use transport::{PortOpener, PortSettings, SerialOpener, Transport};
pub use types::*;
