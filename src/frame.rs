//! Frame codec for the gauge's Modbus-RTU dialect.
//!
//! Requests are always 8 bytes: address, function, register (BE), value or
//! count (BE), CRC16 (LE). Measurement responses are 9 bytes, write-register
//! responses echo the 8-byte request.

use crate::checksum::{append_crc, crc16};
use crate::constants::*;
use crate::error::FrameError;
use crate::types::BaudRate;

/// Commands understood by the gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Read the current measurement
    Read,
    /// Reset the reference point
    Zero,
    /// Switch the device to another baud rate
    ChangeBaud(BaudRate),
}

impl Command {
    pub fn function_code(&self) -> u8 {
        match self {
            Command::Read => FN_READ_REGISTERS,
            Command::Zero | Command::ChangeBaud(_) => FN_WRITE_SINGLE_REGISTER,
        }
    }

    pub fn register(&self) -> u16 {
        match self {
            Command::Read => REG_MEASUREMENT,
            Command::Zero => REG_ZERO,
            Command::ChangeBaud(_) => REG_BAUD_RATE,
        }
    }

    /// Register count for reads, written value for writes
    pub fn value(&self) -> u16 {
        match self {
            Command::Read => MEASUREMENT_REGISTER_COUNT,
            Command::Zero => ZERO_VALUE,
            Command::ChangeBaud(rate) => rate.device_code(),
        }
    }

    /// Serialize the command, CRC included.
    pub fn encode(&self) -> [u8; REQUEST_LEN] {
        let register = self.register().to_be_bytes();
        let value = self.value().to_be_bytes();
        let mut frame = Vec::with_capacity(REQUEST_LEN);
        frame.extend_from_slice(&[
            SLAVE_ADDRESS,
            self.function_code(),
            register[0],
            register[1],
            value[0],
            value[1],
        ]);
        append_crc(&mut frame);

        let mut out = [0u8; REQUEST_LEN];
        out.copy_from_slice(&frame);
        out
    }
}

/// Decoded measurement payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResponse {
    /// Signed register value as sent by the gauge
    pub raw: i32,
}

impl ReadResponse {
    /// Scale the raw value to millimetres.
    pub fn millimeters(&self, divisor: f64) -> f64 {
        self.raw as f64 / divisor
    }
}

/// A validated response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Registers(ReadResponse),
    WriteEcho { register: u16, value: u16 },
}

fn expected_len(function: u8) -> Result<usize, FrameError> {
    match function {
        FN_READ_REGISTERS => Ok(READ_RESPONSE_LEN),
        FN_WRITE_SINGLE_REGISTER => Ok(WRITE_ECHO_LEN),
        other => Err(FrameError::Malformed(format!(
            "unsupported function code {:#04x}",
            other
        ))),
    }
}

/// Validate a response to a request with `expected_function`.
///
/// Checks run in a fixed order: length, then header fields, then CRC.
/// Bytes past the expected frame length are ignored.
pub fn decode(raw: &[u8], expected_function: u8) -> Result<Response, FrameError> {
    let len = expected_len(expected_function)?;
    if raw.len() < len {
        return Err(FrameError::Truncated {
            expected: len,
            actual: raw.len(),
        });
    }
    let frame = &raw[..len];

    if frame[0] != SLAVE_ADDRESS {
        return Err(FrameError::Malformed(format!(
            "address {:#04x}, expected {:#04x}",
            frame[0], SLAVE_ADDRESS
        )));
    }
    if frame[1] != expected_function {
        return Err(FrameError::Malformed(format!(
            "function {:#04x}, expected {:#04x}",
            frame[1], expected_function
        )));
    }
    if expected_function == FN_READ_REGISTERS && frame[2] != READ_PAYLOAD_LEN {
        return Err(FrameError::Malformed(format!(
            "byte count {}, expected {}",
            frame[2], READ_PAYLOAD_LEN
        )));
    }

    let (body, tail) = frame.split_at(len - 2);
    let computed = crc16(body);
    let received = u16::from_le_bytes([tail[0], tail[1]]);
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    let response = match expected_function {
        FN_READ_REGISTERS => Response::Registers(ReadResponse {
            raw: i32::from_be_bytes([body[3], body[4], body[5], body[6]]),
        }),
        _ => Response::WriteEcho {
            register: u16::from_be_bytes([body[2], body[3]]),
            value: u16::from_be_bytes([body[4], body[5]]),
        },
    };
    Ok(response)
}

/// Validate a measurement response.
pub fn decode_read(raw: &[u8]) -> Result<ReadResponse, FrameError> {
    match decode(raw, FN_READ_REGISTERS)? {
        Response::Registers(response) => Ok(response),
        Response::WriteEcho { .. } => Err(FrameError::Malformed(
            "write echo where measurement expected".to_string(),
        )),
    }
}

/// Loose check used by non-strict detection: address and function only.
pub fn header_matches(raw: &[u8], expected_function: u8) -> bool {
    raw.len() >= 2 && raw[0] == SLAVE_ADDRESS && raw[1] == expected_function
}

/// Build the frame a gauge sends for a measurement of `raw` counts.
pub fn encode_read_response(raw: i32) -> [u8; READ_RESPONSE_LEN] {
    let mut frame = Vec::with_capacity(READ_RESPONSE_LEN);
    frame.extend_from_slice(&[SLAVE_ADDRESS, FN_READ_REGISTERS, READ_PAYLOAD_LEN]);
    frame.extend_from_slice(&raw.to_be_bytes());
    append_crc(&mut frame);

    let mut out = [0u8; READ_RESPONSE_LEN];
    out.copy_from_slice(&frame);
    out
}

/// Build the echo a gauge sends after a register write.
pub fn encode_write_echo(register: u16, value: u16) -> [u8; WRITE_ECHO_LEN] {
    let register = register.to_be_bytes();
    let value = value.to_be_bytes();
    let mut frame = vec![
        SLAVE_ADDRESS,
        FN_WRITE_SINGLE_REGISTER,
        register[0],
        register[1],
        value[0],
        value[1],
    ];
    append_crc(&mut frame);

    let mut out = [0u8; WRITE_ECHO_LEN];
    out.copy_from_slice(&frame);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_request_bytes() {
        assert_eq!(
            Command::Read.encode(),
            [0x01, 0x04, 0x00, 0x37, 0x00, 0x02, 0xC0, 0x05]
        );
    }

    #[test]
    fn test_zero_request_bytes() {
        assert_eq!(
            Command::Zero.encode(),
            [0x01, 0x06, 0x00, 0x36, 0x00, 0x01, 0xA8, 0x04]
        );
    }

    #[test]
    fn test_change_baud_request_bytes() {
        assert_eq!(
            Command::ChangeBaud(BaudRate::B115200).encode(),
            [0x01, 0x06, 0x00, 0x31, 0x11, 0x52, 0x55, 0xA8]
        );
        let frame = Command::ChangeBaud(BaudRate::B19200).encode();
        assert_eq!(&frame[..6], &[0x01, 0x06, 0x00, 0x31, 0x01, 0x92]);
    }

    #[test]
    fn test_decode_known_response() {
        let raw = [0x01, 0x04, 0x04, 0x00, 0x00, 0x30, 0x39, 0x2F, 0x96];
        let response = decode_read(&raw).unwrap();
        assert_eq!(response.raw, 12345);
        assert_eq!(response.millimeters(DEFAULT_SCALE_DIVISOR), 12.345);
    }

    #[test]
    fn test_negative_scaling() {
        let response = decode_read(&encode_read_response(-12345)).unwrap();
        assert_eq!(response.millimeters(DEFAULT_SCALE_DIVISOR), -12.345);
    }

    #[test]
    fn test_alternate_divisor() {
        let response = decode_read(&encode_read_response(12345)).unwrap();
        assert_eq!(response.millimeters(10000.0), 1.2345);
    }

    #[test]
    fn test_truncated_before_anything_else() {
        let frame = encode_read_response(1);
        for len in 0..READ_RESPONSE_LEN {
            assert_eq!(
                decode_read(&frame[..len]),
                Err(FrameError::Truncated {
                    expected: 9,
                    actual: len
                })
            );
        }
        // garbage header, still truncation
        assert!(matches!(
            decode_read(&[0xFF, 0xFF, 0xFF]),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn test_wrong_address_is_malformed() {
        let mut frame = encode_read_response(7);
        frame[0] = 0x02;
        assert!(matches!(decode_read(&frame), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_wrong_function_is_malformed() {
        let frame = encode_write_echo(REG_ZERO, ZERO_VALUE);
        let mut padded = frame.to_vec();
        padded.push(0x00);
        assert!(matches!(decode_read(&padded), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_wrong_byte_count_is_malformed() {
        let mut frame = encode_read_response(7).to_vec();
        frame[2] = 0x02;
        assert!(matches!(decode_read(&frame), Err(FrameError::Malformed(_))));
    }

    #[test]
    fn test_payload_and_crc_bit_flips_fail_checksum() {
        let frame = encode_read_response(-424242);
        for byte in 3..READ_RESPONSE_LEN {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[byte] ^= 1 << bit;
                assert!(
                    matches!(
                        decode_read(&corrupted),
                        Err(FrameError::ChecksumMismatch { .. })
                    ),
                    "byte {} bit {}",
                    byte,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_header_bit_flips_never_decode() {
        let frame = encode_read_response(99);
        for byte in 0..3 {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[byte] ^= 1 << bit;
                assert!(decode_read(&corrupted).is_err(), "byte {} bit {}", byte, bit);
            }
        }
    }

    #[test]
    fn test_extremes_decode() {
        for raw in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(decode_read(&encode_read_response(raw)).unwrap().raw, raw);
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut raw = encode_read_response(500).to_vec();
        raw.extend_from_slice(&[0xDE, 0xAD]);
        assert_eq!(decode_read(&raw).unwrap().raw, 500);
    }

    #[test]
    fn test_write_echo_decodes() {
        let echo = encode_write_echo(REG_BAUD_RATE, BaudRate::B38400.device_code());
        assert_eq!(echo.to_vec(), Command::ChangeBaud(BaudRate::B38400).encode().to_vec());
        assert_eq!(
            decode(&echo, FN_WRITE_SINGLE_REGISTER),
            Ok(Response::WriteEcho {
                register: REG_BAUD_RATE,
                value: 0x0384
            })
        );
    }

    #[test]
    fn test_unknown_function_rejected() {
        assert!(matches!(
            decode(&[0u8; 16], 0x03),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn test_header_matches() {
        let frame = encode_read_response(1);
        assert!(header_matches(&frame, FN_READ_REGISTERS));
        assert!(!header_matches(&frame, FN_WRITE_SINGLE_REGISTER));
        assert!(!header_matches(&[0x01], FN_READ_REGISTERS));
    }
}
