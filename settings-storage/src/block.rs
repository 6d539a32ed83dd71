//! Versioned, CRC-checked block encoding
//!
//! A block is a fixed little-endian header followed by a postcard payload:
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 4    | magic       |
//! | 4      | 2    | version     |
//! | 6      | 2    | payload len |
//! | 8      | 4    | payload crc |
use crc::{Crc, CRC_32_ISO_HDLC};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

/// Header length in bytes
pub const HEADER_LEN: usize = 12;

/// Largest block, header included
pub const BLOCK_SIZE: usize = 256;

/// Largest payload that fits in a block
pub const MAX_PAYLOAD: usize = BLOCK_SIZE - HEADER_LEN;

/// Current payload layout
pub const VERSION: u16 = 1;

/// Magic of the policy block, "EVAP"
pub const POLICY_MAGIC: u32 = u32::from_le_bytes(*b"EVAP");

/// Magic of the power-loss block, "EVPL"
pub const POWER_LOSS_MAGIC: u32 = u32::from_le_bytes(*b"EVPL");

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    /// Identifies the record stored in the block
    pub magic: u32,
    /// Payload layout version
    pub version: u16,
    /// Payload length in bytes
    pub len: u16,
    /// CRC-32 of the payload
    pub crc: u32,
}

impl Header {
    /// Serialize to the on-device layout
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.len.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.crc.to_le_bytes());
        bytes
    }

    /// Parse the on-device layout
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            magic: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            version: u16::from_le_bytes([bytes[4], bytes[5]]),
            len: u16::from_le_bytes([bytes[6], bytes[7]]),
            crc: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    /// Check magic, version and length before the payload is read
    pub fn validate<E>(&self, magic: u32) -> Result<usize, Error<E>> {
        if self.magic != magic {
            return Err(Error::BadMagic);
        }

        if self.version != VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }

        let len = self.len as usize;
        if len > MAX_PAYLOAD {
            return Err(Error::Corrupt);
        }

        Ok(len)
    }
}

/// CRC-32 (ISO-HDLC) of a payload
pub fn checksum(payload: &[u8]) -> u32 {
    CRC.checksum(payload)
}

/// Erased flash and EEPROM read back as all ones
pub fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0xFF)
}

/// Encode `value` as a complete block into `buf`, returning the block length
pub fn encode<T: Serialize, E>(magic: u32, value: &T, buf: &mut [u8; BLOCK_SIZE]) -> Result<usize, Error<E>> {
    let (header, payload) = buf.split_at_mut(HEADER_LEN);
    let len = postcard::to_slice(value, payload)
        .map_err(|e| match e {
            postcard::Error::SerializeBufferFull => Error::TooLarge,
            _ => Error::Encoding,
        })?
        .len();

    let header_bytes = Header {
        magic,
        version: VERSION,
        // MAX_PAYLOAD fits in a u16
        len: len as u16,
        crc: checksum(&payload[..len]),
    }
    .to_bytes();
    header.copy_from_slice(&header_bytes);

    Ok(HEADER_LEN + len)
}

/// Verify and decode a payload read after a validated header
pub fn decode<T: DeserializeOwned, E>(header: &Header, payload: &[u8]) -> Result<T, Error<E>> {
    if checksum(payload) != header.crc {
        return Err(Error::Corrupt);
    }

    postcard::from_bytes(payload).map_err(|_| Error::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestError = Error<()>;

    #[test]
    fn header_layout() {
        let header = Header {
            magic: POLICY_MAGIC,
            version: 0x0201,
            len: 0x0403,
            crc: 0x0807_0605,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"EVAP");
        assert_eq!(&bytes[4..], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        assert_eq!(Header::from_bytes(&bytes), header);
    }

    #[test]
    fn crc_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn header_validation() {
        let mut header = Header {
            magic: POWER_LOSS_MAGIC,
            version: VERSION,
            len: 8,
            crc: 0,
        };
        assert_eq!(header.validate::<()>(POWER_LOSS_MAGIC), Ok(8));
        assert_eq!(header.validate::<()>(POLICY_MAGIC), Err(TestError::BadMagic));

        header.version = VERSION + 1;
        assert_eq!(
            header.validate::<()>(POWER_LOSS_MAGIC),
            Err(TestError::UnsupportedVersion(VERSION + 1))
        );

        header.version = VERSION;
        header.len = MAX_PAYLOAD as u16 + 1;
        assert_eq!(header.validate::<()>(POWER_LOSS_MAGIC), Err(TestError::Corrupt));
    }

    #[test]
    fn flipped_payload_bit_is_corrupt() {
        let mut buf = [0u8; BLOCK_SIZE];
        let len = encode::<_, ()>(POWER_LOSS_MAGIC, &(12.5f32, 300u32), &mut buf).unwrap();

        let mut header_bytes = [0u8; HEADER_LEN];
        header_bytes.copy_from_slice(&buf[..HEADER_LEN]);
        let header = Header::from_bytes(&header_bytes);
        assert_eq!(header.validate::<()>(POWER_LOSS_MAGIC), Ok(len - HEADER_LEN));
        assert_eq!(decode::<(f32, u32), ()>(&header, &buf[HEADER_LEN..len]), Ok((12.5, 300)));

        buf[HEADER_LEN] ^= 0x01;
        assert_eq!(
            decode::<(f32, u32), ()>(&header, &buf[HEADER_LEN..len]),
            Err(TestError::Corrupt)
        );
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut buf = [0u8; BLOCK_SIZE];
        let big = [[7u8; 32]; 8];
        assert_eq!(encode::<_, ()>(POLICY_MAGIC, &big, &mut buf), Err(TestError::TooLarge));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(&[0xFF; HEADER_LEN]));
        assert!(!is_blank(&[0xFF, 0xFF, 0x00]));
    }
}
