//! [ROOT](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/32ce8c94-4757-46c8-a169-3fd21abee584)

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use super::{block_ref::BlockRef, header::NdbVersion};

/// Root of the two B-trees plus the allocation summary kept in the HEADER.
#[derive(Clone, Copy, Debug, Default)]
pub struct Root {
    file_eof_index: u64,
    amap_last_index: u64,
    node_btree: BlockRef,
    block_btree: BlockRef,
    amap_is_valid: bool,
}

impl Root {
    pub fn new(file_eof_index: u64, node_btree: BlockRef, block_btree: BlockRef) -> Self {
        Self {
            file_eof_index,
            amap_last_index: 0,
            node_btree,
            block_btree,
            amap_is_valid: false,
        }
    }

    pub(crate) fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        let read_index = |f: &mut dyn Read| -> io::Result<u64> {
            match version {
                NdbVersion::Ansi => Ok(u64::from(f.read_u32::<LittleEndian>()?)),
                NdbVersion::Unicode => f.read_u64::<LittleEndian>(),
            }
        };

        // dwReserved
        f.read_u32::<LittleEndian>()?;

        // ibFileEof
        let file_eof_index = read_index(f)?;

        // ibAMapLast
        let amap_last_index = read_index(f)?;

        // cbAMapFree, cbPMapFree
        read_index(f)?;
        read_index(f)?;

        // BREFNBT
        let node_btree = BlockRef::read(version, f)?;

        // BREFBBT
        let block_btree = BlockRef::read(version, f)?;

        // fAMapValid
        let amap_is_valid = f.read_u8()? != 0;

        // bReserved, wReserved
        f.read_u8()?;
        f.read_u16::<LittleEndian>()?;

        Ok(Self {
            file_eof_index,
            amap_last_index,
            node_btree,
            block_btree,
            amap_is_valid,
        })
    }

    pub fn file_eof_index(&self) -> u64 {
        self.file_eof_index
    }

    pub fn amap_last_index(&self) -> u64 {
        self.amap_last_index
    }

    /// `BREFNBT`: root page of the Node BTree.
    pub fn node_btree(&self) -> BlockRef {
        self.node_btree
    }

    /// `BREFBBT`: root page of the Block BTree.
    pub fn block_btree(&self) -> BlockRef {
        self.block_btree
    }

    pub fn amap_is_valid(&self) -> bool {
        self.amap_is_valid
    }
}
