use chrono::Utc;
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::config::LinkConfig;
use crate::constants::*;
use crate::detect;
use crate::error::{GaugeError, Result};
use crate::frame::{self, Command};
use crate::transport::{PortOpener, PortSettings, SerialOpener, Transport};
use crate::types::*;

/// Port and state guarded by the link mutex
struct Session {
    port: Option<Box<dyn Transport>>,
    port_name: Option<String>,
    baud_rate: Option<BaudRate>,
    state: LinkState,
}

struct Shared {
    session: Mutex<Session>,
    polling: AtomicBool,
    opener: Box<dyn PortOpener>,
    config: LinkConfig,
}

/// Main gauge protocol interface
///
/// Cloning yields another handle to the same link. Commands are serialized
/// by an internal lock; while a poll session is active every public command
/// fails with [`GaugeError::DeviceBusy`].
#[derive(Clone)]
pub struct GaugeLink {
    shared: Arc<Shared>,
}

impl GaugeLink {
    /// Create a disconnected link using the system serial ports
    pub fn new() -> Self {
        Self::with_opener(SerialOpener, LinkConfig::default())
    }

    /// Create a disconnected link over a custom transport
    pub fn with_opener(opener: impl PortOpener + 'static, config: LinkConfig) -> Self {
        GaugeLink {
            shared: Arc::new(Shared {
                session: Mutex::new(Session {
                    port: None,
                    port_name: None,
                    baud_rate: None,
                    state: LinkState::Disconnected,
                }),
                polling: AtomicBool::new(false),
                opener: Box::new(opener),
                config,
            }),
        }
    }

    /// List available serial ports, sorted by name
    pub fn list_ports(&self) -> Result<Vec<PortInfo>> {
        self.shared.opener.available_ports()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    pub fn state(&self) -> LinkState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.lock().port.is_some()
    }

    /// Port the link is (or was last successfully) connected to
    pub fn port_name(&self) -> Option<String> {
        self.lock().port_name.clone()
    }

    pub fn baud_rate(&self) -> Option<BaudRate> {
        self.lock().baud_rate
    }

    /// Whether a poll session currently owns the link
    pub fn is_polling(&self) -> bool {
        self.shared.polling.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.shared
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_polling() {
            return Err(GaugeError::DeviceBusy);
        }
        Ok(())
    }

    /// Open `port_name` at `baud_rate` and confirm the gauge answers.
    ///
    /// An already open port is closed first. If the probe read fails the
    /// new port is closed again before returning, and [`port_name`] and
    /// [`baud_rate`] keep reporting the last successful connection.
    ///
    /// [`port_name`]: GaugeLink::port_name
    /// [`baud_rate`]: GaugeLink::baud_rate
    pub fn connect(&self, port_name: &str, baud_rate: u32) -> Result<()> {
        self.ensure_idle()?;
        let baud_rate = BaudRate::try_from(baud_rate)?;
        let mut session = self.lock();

        Self::close_session(&mut session);
        session.state = LinkState::Connecting;

        debug!("Connecting to {} at {} baud", port_name, baud_rate);
        let settings = PortSettings {
            name: port_name.to_string(),
            baud_rate,
            timeout: self.shared.config.read_timeout,
        };
        let mut port = match self.shared.opener.open(&settings) {
            Ok(port) => port,
            Err(e) => {
                session.state = LinkState::Disconnected;
                return Err(match e {
                    e @ GaugeError::PortUnavailable { .. } => e,
                    other => GaugeError::PortUnavailable {
                        port: port_name.to_string(),
                        reason: other.to_string(),
                    },
                });
            }
        };

        match Self::transact_read(port.as_mut()) {
            Ok(_) => {
                session.port = Some(port);
                session.port_name = Some(port_name.to_string());
                session.baud_rate = Some(baud_rate);
                session.state = LinkState::Connected;
                debug!("Connected to {} at {} baud", port_name, baud_rate);
                Ok(())
            }
            Err(e) => {
                warn!("Probe on {} at {} baud failed: {}", port_name, baud_rate, e);
                port.close();
                session.state = LinkState::Disconnected;
                Err(GaugeError::Communication(format!(
                    "device did not answer on {} at {} baud: {}",
                    port_name, baud_rate, e
                )))
            }
        }
    }

    /// Close the port if open. Safe to call repeatedly.
    pub fn disconnect(&self) -> Result<()> {
        self.ensure_idle()?;
        let mut session = self.lock();
        Self::close_session(&mut session);
        Ok(())
    }

    fn close_session(session: &mut Session) {
        if let Some(mut port) = session.port.take() {
            debug!(
                "Closing {}",
                session.port_name.as_deref().unwrap_or("<unnamed>")
            );
            port.close();
        }
        session.state = LinkState::Disconnected;
    }

    /// Read one measurement in millimetres
    pub fn read_value(&self) -> Result<f64> {
        Ok(self.read()?.value)
    }

    /// Read one measurement with its raw value and timestamp
    pub fn read(&self) -> Result<Reading> {
        self.ensure_idle()?;
        self.read_unchecked()
    }

    /// Read path shared with the poll scheduler, which holds the busy flag.
    pub(crate) fn read_unchecked(&self) -> Result<Reading> {
        let mut session = self.lock();
        let mut port = session.port.take().ok_or_else(GaugeError::not_connected)?;
        session.state = LinkState::Reading;

        let result = Self::transact_read(port.as_mut());

        session.port = Some(port);
        session.state = LinkState::Connected;

        let response = result?;
        Ok(Reading {
            value: response.millimeters(self.shared.config.scale_divisor),
            raw: response.raw,
            timestamp: Utc::now(),
        })
    }

    fn transact_read(port: &mut dyn Transport) -> Result<frame::ReadResponse> {
        port.clear_input()?;
        Self::send(port, Command::Read)?;

        let response = port.read_up_to(READ_RESPONSE_LEN)?;
        trace!("Received: {}", hex(&response));
        if response.len() < READ_RESPONSE_LEN {
            return Err(GaugeError::Timeout {
                expected: READ_RESPONSE_LEN,
                received: response.len(),
            });
        }
        Ok(frame::decode_read(&response)?)
    }

    fn send(port: &mut dyn Transport, command: Command) -> Result<()> {
        let bytes = command.encode();
        trace!("Sending:  {}", hex(&bytes));
        port.write_all(&bytes)
    }

    /// Reset the gauge's reference point
    pub fn zero(&self) -> Result<()> {
        self.ensure_idle()?;
        self.write_command(Command::Zero, LinkState::Zeroing, self.shared.config.zero_settle)
    }

    /// Switch the gauge to `new_rate`.
    ///
    /// The link stays open at the old rate, which the device no longer
    /// answers on; reconnect at `new_rate` afterwards.
    pub fn change_baud_rate(&self, new_rate: u32) -> Result<()> {
        let new_rate = BaudRate::try_from(new_rate)?;
        self.ensure_idle()?;
        self.write_command(
            Command::ChangeBaud(new_rate),
            LinkState::ChangingBaud,
            self.shared.config.baud_settle,
        )?;
        debug!("Device switched to {} baud", new_rate);
        Ok(())
    }

    /// Connect at `current`, switch the device to `new_rate` and disconnect.
    pub fn switch_device_baud_rate(&self, port_name: &str, current: u32, new_rate: u32) -> Result<()> {
        BaudRate::try_from(new_rate)?;
        self.connect(port_name, current)?;
        let result = self.change_baud_rate(new_rate);
        self.disconnect()?;
        result
    }

    fn write_command(&self, command: Command, state: LinkState, settle: Duration) -> Result<()> {
        let mut session = self.lock();
        let mut port = session.port.take().ok_or_else(GaugeError::not_connected)?;
        session.state = state;

        let result = Self::transact_write(port.as_mut(), command, settle);

        session.port = Some(port);
        session.state = LinkState::Connected;
        result
    }

    fn transact_write(port: &mut dyn Transport, command: Command, settle: Duration) -> Result<()> {
        port.clear_input()?;
        Self::send(port, command)?;
        thread::sleep(settle);

        let response = port.read_up_to(WRITE_RESPONSE_MAX)?;
        trace!("Received: {}", hex(&response));
        // the echo is not decoded; length is the success criterion
        if response.len() < WRITE_ECHO_LEN {
            return Err(GaugeError::Communication(format!(
                "no acknowledgement for {:?}: {} bytes received",
                command,
                response.len()
            )));
        }
        Ok(())
    }

    /// Scan candidate baud rates on `port_name`.
    ///
    /// Uses the link's opener and configuration but not its port. Refused
    /// while the link holds an open port; disconnect first.
    pub fn detect_baud_rate(&self, port_name: &str) -> Result<Option<BaudRate>> {
        self.ensure_idle()?;
        if self.lock().port.is_some() {
            return Err(GaugeError::Communication("already connected".to_string()));
        }
        Ok(detect::detect(
            &*self.shared.opener,
            port_name,
            &self.shared.config,
        ))
    }

    /// Claim the link for a poll session. Fails if one is already active.
    pub(crate) fn begin_polling(&self) -> Result<()> {
        self.shared
            .polling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| GaugeError::DeviceBusy)
    }

    pub(crate) fn end_polling(&self) {
        self.shared.polling.store(false, Ordering::SeqCst);
    }
}

impl Default for GaugeLink {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
