//! In-memory gauge used by the integration tests.
#![allow(dead_code)]

use gauge_link::checksum;
use gauge_link::constants::*;
use gauge_link::frame;
use gauge_link::{BaudRate, GaugeError, LinkConfig, PortInfo, PortOpener, PortSettings, Result, Transport};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
pub struct DeviceState {
    /// Rate the device currently listens on
    pub baud_rate: BaudRate,
    pub raw_value: i32,
    pub silent: bool,
    pub corrupt_crc: bool,
    /// Answer with only this many bytes
    pub truncate_to: Option<usize>,
    pub fail_open: bool,
    pub opened: Vec<BaudRate>,
    pub timeouts: Vec<Duration>,
    pub open_ports: usize,
    pub read_requests: usize,
    pub zero_requests: usize,
}

/// A simulated gauge plus the opener that connects to it.
#[derive(Clone)]
pub struct MockGauge {
    state: Arc<Mutex<DeviceState>>,
}

impl MockGauge {
    pub fn new(baud_rate: BaudRate) -> Self {
        MockGauge {
            state: Arc::new(Mutex::new(DeviceState {
                baud_rate,
                raw_value: 12345,
                silent: false,
                corrupt_crc: false,
                truncate_to: None,
                fail_open: false,
                opened: Vec::new(),
                timeouts: Vec::new(),
                open_ports: 0,
                read_requests: 0,
                zero_requests: 0,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    /// Link with no settle delays, talking to this gauge
    pub fn link(&self) -> gauge_link::GaugeLink {
        let config = LinkConfig::default().with_settle_delays(Duration::ZERO, Duration::ZERO);
        gauge_link::GaugeLink::with_opener(self.clone(), config)
    }
}

impl PortOpener for MockGauge {
    fn open(&self, settings: &PortSettings) -> Result<Box<dyn Transport>> {
        let mut state = self.state();
        state.opened.push(settings.baud_rate);
        state.timeouts.push(settings.timeout);
        if state.fail_open {
            return Err(GaugeError::PortUnavailable {
                port: settings.name.clone(),
                reason: "no such device".to_string(),
            });
        }
        state.open_ports += 1;
        Ok(Box::new(MockPort {
            state: self.state.clone(),
            baud_rate: settings.baud_rate,
            pending: Vec::new(),
            closed: false,
        }))
    }

    fn available_ports(&self) -> Result<Vec<PortInfo>> {
        Ok(vec![PortInfo {
            name: "/dev/mock0".to_string(),
            description: Some("Mock gauge".to_string()),
        }])
    }
}

struct MockPort {
    state: Arc<Mutex<DeviceState>>,
    baud_rate: BaudRate,
    pending: Vec<u8>,
    closed: bool,
}

impl MockPort {
    fn respond(&mut self, request: &[u8]) {
        let mut state = self.state.lock().unwrap();
        if state.silent || state.baud_rate != self.baud_rate {
            return;
        }
        if request.len() != REQUEST_LEN || !checksum::verify(request) {
            return;
        }

        let register = u16::from_be_bytes([request[2], request[3]]);
        let value = u16::from_be_bytes([request[4], request[5]]);
        let mut response = match (request[1], register) {
            (FN_READ_REGISTERS, REG_MEASUREMENT) => {
                state.read_requests += 1;
                frame::encode_read_response(state.raw_value).to_vec()
            }
            (FN_WRITE_SINGLE_REGISTER, REG_ZERO) => {
                state.zero_requests += 1;
                state.raw_value = 0;
                frame::encode_write_echo(register, value).to_vec()
            }
            (FN_WRITE_SINGLE_REGISTER, REG_BAUD_RATE) => {
                // echo goes out at the old rate, then the device switches
                if let Some(rate) = BaudRate::from_device_code(value) {
                    state.baud_rate = rate;
                }
                frame::encode_write_echo(register, value).to_vec()
            }
            _ => return,
        };

        if state.corrupt_crc {
            let last = response.len() - 1;
            response[last] ^= 0xFF;
        }
        if let Some(len) = state.truncate_to {
            response.truncate(len);
        }
        self.pending = response;
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().unwrap().open_ports -= 1;
        }
    }
}

impl Transport for MockPort {
    fn clear_input(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(GaugeError::Communication("port closed".to_string()));
        }
        self.respond(bytes);
        Ok(())
    }

    fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>> {
        let n = max.min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn close(&mut self) {
        self.release();
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.release();
    }
}
