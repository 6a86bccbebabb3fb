//! Modbus CRC16 checksum (reflected polynomial 0xA001, seed 0xFFFF).

use crc::{Crc, CRC_16_MODBUS};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Calculate the Modbus CRC16 of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC.checksum(data)
}

/// Append the CRC of `frame` to it, low byte first.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Check that the trailing two bytes of `frame` are the CRC of the rest.
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    crc16(body) == u16::from_le_bytes([tail[0], tail[1]])
}
