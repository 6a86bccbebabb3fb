//! Half-duplex byte transport beneath the gauge link.
//!
//! [`Transport`] is one open port; [`PortOpener`] opens ports and lists the
//! ones available. [`SerialOpener`] is the production implementation on top
//! of the `serialport` crate; tests substitute in-memory doubles.

use serialport::{ClearBuffer, FlowControl, SerialPort, SerialPortType};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::error::{GaugeError, Result};
use crate::types::{BaudRate, PortInfo};

/// Parameters for opening a port. Framing is always 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub name: String,
    pub baud_rate: BaudRate,
    pub timeout: Duration,
}

/// An open, half-duplex byte stream.
pub trait Transport: Send {
    /// Discard anything already waiting in the receive buffer
    fn clear_input(&mut self) -> Result<()>;

    /// Write the whole buffer
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `max` bytes, blocking until `max` have arrived or the
    /// port timeout elapses. Returns what arrived, possibly nothing.
    fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>>;

    /// Release the port. Further calls may fail.
    fn close(&mut self) {}
}

/// Opens transports and enumerates port identifiers.
pub trait PortOpener: Send + Sync {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn Transport>>;

    fn available_ports(&self) -> Result<Vec<PortInfo>>;
}

/// [`PortOpener`] backed by the operating system's serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn Transport>> {
        let port = serialport::new(settings.name.as_str(), settings.baud_rate.as_u32())
            .data_bits(DATA_BITS)
            .parity(PARITY)
            .stop_bits(STOP_BITS)
            .flow_control(FlowControl::None)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| GaugeError::PortUnavailable {
                port: settings.name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(SerialTransport {
            port: Some(port),
            timeout: settings.timeout,
        }))
    }

    fn available_ports(&self) -> Result<Vec<PortInfo>> {
        let mut ports: Vec<PortInfo> = serialport::available_ports()?
            .into_iter()
            .map(|info| {
                let description = match info.port_type {
                    SerialPortType::UsbPort(usb) => usb.product,
                    SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                    SerialPortType::PciPort | SerialPortType::Unknown => None,
                };
                PortInfo {
                    name: info.port_name,
                    description,
                }
            })
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ports)
    }
}

/// A [`Transport`] over a `serialport` handle.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    timeout: Duration,
}

impl SerialTransport {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| GaugeError::Communication("port closed".to_string()))
    }
}

impl Transport for SerialTransport {
    fn clear_input(&mut self) -> Result<()> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;
        let port = self.port()?;
        let mut buf = vec![0u8; max];
        let mut filled = 0;

        // serialport's timeout applies per read call; shrink it to what is
        // left so the total never exceeds `timeout`
        let outcome: Result<()> = loop {
            if filled >= max {
                break Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Ok(());
            }
            if let Err(e) = port.set_timeout(remaining) {
                break Err(e.into());
            }
            match port.read(&mut buf[filled..]) {
                Ok(0) => break Ok(()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Err(e.into()),
            }
        };

        // writes share the port timeout
        port.set_timeout(timeout)?;
        outcome?;

        buf.truncate(filled);
        Ok(buf)
    }

    fn close(&mut self) {
        // dropping the handle closes the device
        self.port = None;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serialport::TTYPort;
    use std::thread;

    fn transport_pair(timeout: Duration) -> (SerialTransport, TTYPort) {
        let (master, slave) = TTYPort::pair().expect("pty pair");
        let transport = SerialTransport {
            port: Some(Box::new(slave)),
            timeout,
        };
        (transport, master)
    }

    #[test]
    fn test_late_byte_does_not_extend_timeout() {
        let timeout = Duration::from_millis(500);
        let (mut transport, mut master) = transport_pair(timeout);

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(400));
            master.write_all(&[0x01]).unwrap();
            master.flush().unwrap();
            // keep the master side open until the read is over
            master
        });

        let started = Instant::now();
        let received = transport.read_up_to(READ_RESPONSE_LEN).unwrap();
        let elapsed = started.elapsed();
        let _master = writer.join().unwrap();

        assert_eq!(received, vec![0x01]);
        assert!(elapsed < Duration::from_millis(700), "read took {:?}", elapsed);
    }

    #[test]
    fn test_full_frame_returns_early() {
        let (mut transport, mut master) = transport_pair(Duration::from_secs(1));
        let frame = crate::frame::encode_read_response(12345);
        master.write_all(&frame).unwrap();
        master.flush().unwrap();

        let started = Instant::now();
        let received = transport.read_up_to(READ_RESPONSE_LEN).unwrap();
        assert_eq!(received, frame.to_vec());
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_silence_returns_empty_after_timeout() {
        let (mut transport, _master) = transport_pair(Duration::from_millis(200));

        let started = Instant::now();
        let received = transport.read_up_to(READ_RESPONSE_LEN).unwrap();
        let elapsed = started.elapsed();

        assert!(received.is_empty());
        assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(450), "{:?}", elapsed);
    }
}
