//! [BID (Block ID)](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/d3155aa1-ccdd-4dee-a0a9-5363ccca5352)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use super::{header::NdbVersion, *};

pub const MAX_BLOCK_INDEX: u64 = (1 << 62) - 1;

/// Block ids are 8 bytes in Unicode files and 4 bytes in ANSI files; both widen to `u64`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub fn new(is_internal: bool, index: u64) -> NdbResult<Self> {
        if index > MAX_BLOCK_INDEX {
            return Err(NdbError::InvalidBlockIndex(index));
        }

        let is_internal = if is_internal { 0x2 } else { 0x0 };
        Ok(Self((index << 2) | is_internal))
    }

    pub fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        let value = match version {
            NdbVersion::Ansi => u64::from(f.read_u32::<LittleEndian>()?),
            NdbVersion::Unicode => f.read_u64::<LittleEndian>()?,
        };
        Ok(Self(value))
    }

    /// Internal blocks hold XBLOCK, XXBLOCK, SLBLOCK or SIBLOCK structures and are never
    /// encoded.
    pub fn is_internal(&self) -> bool {
        self.0 & 0x2 == 0x2
    }

    pub fn index(&self) -> u64 {
        self.0 >> 2
    }

    /// Key used for BBT searches. The lowest bit is reserved and must be ignored.
    pub fn search_key(&self) -> u64 {
        self.0 & !0x1
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockId(0x{:X})", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<BlockId> for u64 {
    fn from(value: BlockId) -> Self {
        value.0
    }
}
