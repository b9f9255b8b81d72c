//! Raw frame layout and the recovered tape block record.

use crate::cartridge::CartridgeType;
use crate::error::Result;
use crate::position::PhysicalPosition;
use serde::Serialize;
use std::fmt;

/// User payload bytes per frame.
pub const DATA_SIZE: usize = 32768;
/// Auxiliary trailer bytes following the payload.
pub const AUX_SIZE: usize = 512;
/// Size of one frame as stored in a dump file.
pub const BLOCK_SIZE: usize = DATA_SIZE + AUX_SIZE;

const SIGNATURE_OFFSET: usize = DATA_SIZE + 4;
const HARDWARE_POSITION_OFFSET: usize = DATA_SIZE + 8;

/// Signature the drive stamps on internal filler frames written after a write stop.
pub const WRITE_STOP_SIGNATURE: Signature = Signature(*b"WSTP");

/// Four-byte application signature from the aux trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    pub fn is_sentinel(&self) -> bool {
        is_sentinel(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let bytes = hex::decode(text).ok()?;
        let array: [u8; 4] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            for b in self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{}", self.to_hex())
        }
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// All-zero and all-ones fields carry no information.
pub fn is_sentinel(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0x00) || bytes.iter().all(|b| *b == 0xFF)
}

/// The parts of the aux trailer the mapper looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxTrailer {
    pub signature: Signature,
    /// Raw drive position field, `None` when it is a sentinel.
    pub hardware_position: Option<u32>,
}

impl AuxTrailer {
    /// Parses the trailer of a full `BLOCK_SIZE` frame.
    pub fn parse(frame: &[u8]) -> Self {
        let mut signature = [0u8; 4];
        signature.copy_from_slice(&frame[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 4]);

        let field = &frame[HARDWARE_POSITION_OFFSET..HARDWARE_POSITION_OFFSET + 4];
        let hardware_position = if is_sentinel(field) {
            None
        } else {
            Some(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
        };

        Self {
            signature: Signature(signature),
            hardware_position,
        }
    }
}

/// One frame recovered from a dump file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapeBlock {
    /// Index of the source dump file within its tape definition
    pub file: usize,
    /// Byte offset of the frame within the source file
    pub file_offset: u64,
    pub physical_block: u32,
    pub signature: Signature,
    /// Number of positions missing directly after this block
    pub missing_run_length: u32,
    /// True when every missing position after this block is expected to be empty
    pub missing_run_is_safe: bool,
}

impl TapeBlock {
    pub fn new(file: usize, file_offset: u64, physical_block: u32, signature: Signature) -> Self {
        Self {
            file,
            file_offset,
            physical_block,
            signature,
            missing_run_length: 0,
            missing_run_is_safe: true,
        }
    }

    pub fn position(&self, cartridge: CartridgeType) -> Result<PhysicalPosition> {
        PhysicalPosition::from_physical_block(cartridge, self.physical_block)
    }

    pub fn logical_block(&self, cartridge: CartridgeType) -> Option<u32> {
        self.position(cartridge).ok()?.to_logical_block().ok()
    }

    pub fn has_gap(&self) -> bool {
        self.missing_run_length > 0
    }

    pub fn has_unsafe_gap(&self) -> bool {
        self.missing_run_length > 0 && !self.missing_run_is_safe
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::frame;
    use super::*;

    #[test]
    fn test_parse_trailer() {
        let trailer = AuxTrailer::parse(&frame(0x11, b"ARCS", 0x0300_0042));
        assert_eq!(trailer.signature, Signature(*b"ARCS"));
        assert_eq!(trailer.hardware_position, Some(0x0300_0042));
    }

    #[test]
    fn test_sentinel_position() {
        assert_eq!(AuxTrailer::parse(&frame(0, &[0; 4], 0)).hardware_position, None);
        assert_eq!(
            AuxTrailer::parse(&frame(0, &[0xFF; 4], 0xFFFF_FFFF)).hardware_position,
            None
        );
        assert!(Signature([0xFF; 4]).is_sentinel());
        assert!(!WRITE_STOP_SIGNATURE.is_sentinel());
    }

    #[test]
    fn test_signature_rendering() {
        assert_eq!(Signature(*b"LIN4").to_string(), "LIN4");
        assert_eq!(Signature([0, 1, 2, 3]).to_string(), "0x00010203");
        assert_eq!(Signature::from_hex("4c494e34"), Some(Signature(*b"LIN4")));
        assert_eq!(Signature::from_hex("4c49"), None);
    }

    #[test]
    fn test_block_logical_number() {
        let block = TapeBlock::new(0, 0, 19239 + 19238, Signature::default());
        assert_eq!(block.logical_block(CartridgeType::Adr30), Some(19239));
        assert!(!block.has_gap());
    }
}
