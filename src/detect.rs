//! Baud rate auto-detection.
//!
//! Candidates are probed slowest first: the low rates are the ones every
//! unit supports, so an unfamiliar device is most likely found early.

use log::{debug, info};

use crate::config::LinkConfig;
use crate::constants::*;
use crate::error::{GaugeError, Result};
use crate::frame::{self, Command};
use crate::protocol::hex;
use crate::transport::{PortOpener, PortSettings, Transport};
use crate::types::BaudRate;

/// Probe every candidate on `port_name` and return the first that answers.
///
/// Failing candidates, including ones whose port cannot be opened, are
/// skipped; `None` means no candidate answered.
pub fn detect(opener: &dyn PortOpener, port_name: &str, config: &LinkConfig) -> Option<BaudRate> {
    for baud_rate in BaudRate::ALL {
        match probe(opener, port_name, baud_rate, config) {
            Ok(()) => {
                info!("Gauge on {} answers at {} baud", port_name, baud_rate);
                return Some(baud_rate);
            }
            Err(e) => debug!("No answer on {} at {} baud: {}", port_name, baud_rate, e),
        }
    }

    info!("No candidate baud rate answered on {}", port_name);
    None
}

/// Open `port_name` briefly at `baud_rate` and send one read request.
///
/// The port is closed before returning whatever the outcome.
pub fn probe(
    opener: &dyn PortOpener,
    port_name: &str,
    baud_rate: BaudRate,
    config: &LinkConfig,
) -> Result<()> {
    let settings = PortSettings {
        name: port_name.to_string(),
        baud_rate,
        timeout: config.detect_timeout,
    };
    let mut port = opener.open(&settings)?;
    let outcome = exchange(port.as_mut(), baud_rate, config);
    port.close();
    outcome
}

fn exchange(port: &mut dyn Transport, baud_rate: BaudRate, config: &LinkConfig) -> Result<()> {
    port.clear_input()?;
    port.write_all(&Command::Read.encode())?;
    let response = port.read_up_to(READ_RESPONSE_LEN)?;
    debug!("Probe at {} baud received: {}", baud_rate, hex(&response));

    if config.strict_detection {
        frame::decode_read(&response)?;
    } else if !frame::header_matches(&response, FN_READ_REGISTERS) {
        return Err(GaugeError::Communication(
            "unexpected response header".to_string(),
        ));
    }
    Ok(())
}
