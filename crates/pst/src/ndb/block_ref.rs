//! [BREF](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/844a5ebf-488a-45fd-8fce-92a84d8e24a3)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use super::{block_id::BlockId, header::NdbVersion};

/// A block id paired with the absolute file offset (`ib`) of its data.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRef {
    block: BlockId,
    index: u64,
}

impl BlockRef {
    pub fn new(block: BlockId, index: u64) -> Self {
        Self { block, index }
    }

    pub fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        // bid
        let block = BlockId::read(version, f)?;

        // ib
        let index = match version {
            NdbVersion::Ansi => u64::from(f.read_u32::<LittleEndian>()?),
            NdbVersion::Unicode => f.read_u64::<LittleEndian>()?,
        };

        Ok(Self { block, index })
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}

impl std::fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockRef {{ {:?}, ib: 0x{:X} }}", self.block, self.index)
    }
}
