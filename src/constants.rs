//! Protocol constants for gauge communication.
//!
//! This module defines the fixed frame layout of the gauge's Modbus-RTU
//! dialect, the register map, timing parameters and serial port configuration.

/// Fixed slave address of the gauge
pub const SLAVE_ADDRESS: u8 = 0x01;

/// Function code: read registers
pub const FN_READ_REGISTERS: u8 = 0x04;

/// Function code: write single register
pub const FN_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Register holding the current measurement (two words)
pub const REG_MEASUREMENT: u16 = 0x0037;

/// Number of registers read for one measurement
pub const MEASUREMENT_REGISTER_COUNT: u16 = 2;

/// Register that resets the reference point when written with `ZERO_VALUE`
pub const REG_ZERO: u16 = 0x0036;

/// Value written to `REG_ZERO`
pub const ZERO_VALUE: u16 = 0x0001;

/// Register holding the device baud rate code
pub const REG_BAUD_RATE: u16 = 0x0031;

/// Length of every request frame
pub const REQUEST_LEN: usize = 8;

/// Length of a measurement response frame
pub const READ_RESPONSE_LEN: usize = 9;

/// Length of a write-single-register echo
pub const WRITE_ECHO_LEN: usize = 8;

/// Payload byte count declared in a measurement response
pub const READ_PAYLOAD_LEN: u8 = 4;

/// Maximum number of bytes read back after a write command
pub const WRITE_RESPONSE_MAX: usize = 10;

/// Default divisor converting raw counts to millimetres
pub const DEFAULT_SCALE_DIVISOR: f64 = 1000.0;

/// Per-read timeout in milliseconds
pub const TIMEOUT_MS: u64 = 1000;

/// Per-read timeout during baud rate detection in milliseconds
pub const DETECT_TIMEOUT_MS: u64 = 500;

/// Settle delay after a zero command
pub const ZERO_SETTLE_MS: u64 = 200;

/// Settle delay after a change-baud command
pub const BAUD_SETTLE_MS: u64 = 300;

/// Granularity of the cancellable wait between polls
pub const POLL_SLICE_MS: u64 = 1;

/// Bytes exchanged per measurement transaction (request + response)
pub const TRANSACTION_BYTES: u32 = (REQUEST_LEN + READ_RESPONSE_LEN) as u32;

/// Bit times per byte on the wire (start + 8 data + stop)
pub const BITS_PER_BYTE: u32 = 10;

/// Safety margin applied to the raw transaction time
pub const INTERVAL_SAFETY_FACTOR: f64 = 1.5;

/// Data bits configuration
pub const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;

/// Parity configuration
pub const PARITY: serialport::Parity = serialport::Parity::None;

/// Stop bits configuration
pub const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
