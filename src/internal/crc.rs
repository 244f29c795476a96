//! CRC16 over frame payloads.
//!
//! The link uses CRC-16/CCITT-FALSE (polynomial 0x1021, initial value 0xFFFF,
//! no reflection, no final XOR). It covers the payload bytes only, never the
//! length, source id or delimiters.

use crc::{CRC_16_IBM_3740, Crc};

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Calculate the CRC16 of a payload.
#[inline]
pub fn crc16(payload: &[u8]) -> u16 {
    CRC16.checksum(payload)
}
