use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GaugeError;

/// Baud rates the gauge can be switched to or detected at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All candidates, slowest first
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// The fastest candidate
    pub const FASTEST: BaudRate = BaudRate::B115200;

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Value written to the baud rate register. The gauge expects the
    /// decimal digits of the rate read as hex, not the rate itself.
    pub fn device_code(self) -> u16 {
        match self {
            BaudRate::B9600 => 0x0096,
            BaudRate::B19200 => 0x0192,
            BaudRate::B38400 => 0x0384,
            BaudRate::B57600 => 0x0576,
            BaudRate::B115200 => 0x1152,
        }
    }

    /// Look up a candidate by its device code.
    pub fn from_device_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.device_code() == code)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = GaugeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|b| b.as_u32() == value)
            .ok_or(GaugeError::UnsupportedBaudRate(value))
    }
}

impl From<BaudRate> for u32 {
    fn from(value: BaudRate) -> Self {
        value.as_u32()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// One measurement taken from the gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Displacement in millimetres
    pub value: f64,
    /// Raw register value before scaling
    pub raw: i32,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Timestamp in local time with millisecond precision.
    pub fn display_timestamp(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S%.3f")
            .to_string()
    }
}

/// Link lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Reading,
    Zeroing,
    ChangingBaud,
}

impl LinkState {
    /// Whether a port is open in this state
    pub fn is_open(self) -> bool {
        !matches!(self, LinkState::Disconnected | LinkState::Connecting)
    }
}

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,
    /// Product or adapter description, if the OS reports one
    pub description: Option<String>,
}
