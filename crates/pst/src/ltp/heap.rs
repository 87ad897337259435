//! ## [HN (Heap-on-Node)](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/77ce49a3-3772-4d8d-bb2c-2f7520a238a6)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    io::{Cursor, Read},
    sync::Arc,
};

use super::*;
use crate::{ndb::node::Node, PstFile};

/// [HID](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/85b9e985-ea53-447f-b70c-eb82bfbdcbc9)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub struct HeapId(u32);

impl HeapId {
    /// `hidIndex` is 1-based on disk; this returns the 0-based slot in `rgibAlloc`.
    pub fn index(&self) -> LtpResult<u16> {
        let index = ((self.0 >> 5) & 0x7FF) as u16;
        if index < 1 {
            return Err(LtpError::InvalidHeapIndex(index));
        }
        Ok(index - 1)
    }

    pub fn block_index(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// A zero HID is how empty BTH roots and table row matrices are encoded.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn read(f: &mut dyn Read) -> LtpResult<Self> {
        let value = f.read_u32::<LittleEndian>()?;
        // hidType
        if value & 0x1F != 0 {
            return Err(LtpError::InvalidHeapId(value));
        }
        Ok(Self(value))
    }
}

impl TryFrom<u32> for HeapId {
    type Error = LtpError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value & 0x1F != 0 {
            return Err(LtpError::InvalidHeapId(value));
        }
        Ok(Self(value))
    }
}

impl From<HeapId> for u32 {
    fn from(value: HeapId) -> Self {
        value.0
    }
}

/// `bClientSig`
///
/// ### See also
/// [HeapNodeHeader]
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HeapNodeType {
    /// `bTypeTC`: Table Context (TC/HN)
    Table = 0x7C,
    /// `bTypeBTH`: BTree-on-Heap (BTH)
    Tree = 0xB5,
    /// `bTypePC`: Property Context (PC/BTH)
    Properties = 0xBC,
}

impl TryFrom<u8> for HeapNodeType {
    type Error = LtpError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x7C => Ok(Self::Table),
            0xB5 => Ok(Self::Tree),
            0xBC => Ok(Self::Properties),
            _ => Err(LtpError::InvalidHeapNodeTypeSignature(value)),
        }
    }
}

/// `bSig` of an HNHDR.
const HEAP_SIGNATURE: u8 = 0xEC;

/// [HNHDR](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/8e4ae05c-3c24-4103-b7e5-ffef6f244834)
#[derive(Clone, Copy, Debug)]
pub struct HeapNodeHeader {
    page_map_offset: u16,
    client_signature: HeapNodeType,
    user_root: HeapId,
}

impl HeapNodeHeader {
    fn read(f: &mut dyn Read) -> LtpResult<Self> {
        // ibHnpm
        let page_map_offset = f.read_u16::<LittleEndian>()?;

        // bSig
        let signature = f.read_u8()?;
        if signature != HEAP_SIGNATURE {
            return Err(LtpError::InvalidHeapNodeSignature(signature));
        }

        // bClientSig
        let client_signature = HeapNodeType::try_from(f.read_u8()?)?;

        // hidUserRoot
        let user_root = HeapId::read(f)?;

        // rgbFillLevel
        f.read_u32::<LittleEndian>()?;

        Ok(Self {
            page_map_offset,
            client_signature,
            user_root,
        })
    }

    pub fn page_map_offset(&self) -> u16 {
        self.page_map_offset
    }

    pub fn client_signature(&self) -> HeapNodeType {
        self.client_signature
    }

    pub fn user_root(&self) -> HeapId {
        self.user_root
    }
}

/// A heap spread over the blocks of one node's data tree.
///
/// Every block starts with its `ibHnpm`: the first block in an HNHDR, block 8 and every
/// 128th block after it in an HNBITMAPHDR, and the rest in an HNPAGEHDR. Allocations are
/// located through the HNPAGEMAP that `ibHnpm` points at.
#[derive(Clone, Debug)]
pub struct HeapNode {
    blocks: Vec<Arc<Vec<u8>>>,
    header: HeapNodeHeader,
}

impl HeapNode {
    pub fn read(pst: &PstFile, node: &Node) -> LtpResult<Self> {
        Self::from_blocks(node.read_data_tree(pst)?)
    }

    pub fn from_blocks(blocks: Vec<Arc<Vec<u8>>>) -> LtpResult<Self> {
        let first = blocks
            .first()
            .ok_or(LtpError::HeapBlockIndexNotFound(0))?;
        let header = HeapNodeHeader::read(&mut first.as_slice())?;
        Ok(Self { blocks, header })
    }

    pub fn header(&self) -> &HeapNodeHeader {
        &self.header
    }

    /// Bytes of the allocation `heap_id` refers to.
    pub fn find_entry(&self, heap_id: HeapId) -> LtpResult<&[u8]> {
        let block_index = heap_id.block_index();
        let block = self
            .blocks
            .get(usize::from(block_index))
            .ok_or(LtpError::HeapBlockIndexNotFound(block_index))?;

        let mut cursor = Cursor::new(block.as_slice());

        // ibHnpm
        let page_map_offset = cursor.read_u16::<LittleEndian>()?;
        if usize::from(page_map_offset) + 4 > block.len() {
            return Err(LtpError::InvalidHeapPageMapOffset(page_map_offset));
        }
        cursor.set_position(u64::from(page_map_offset));

        // cAlloc
        let alloc_count = cursor.read_u16::<LittleEndian>()?;

        // cFree
        cursor.read_u16::<LittleEndian>()?;

        let index = heap_id.index()?;
        if index >= alloc_count {
            return Err(LtpError::InvalidHeapIndex(index + 1));
        }

        // rgibAlloc[index], rgibAlloc[index + 1]
        cursor.set_position(cursor.position() + 2 * u64::from(index));
        let start = cursor.read_u16::<LittleEndian>()?;
        let end = cursor.read_u16::<LittleEndian>()?;
        if start > end {
            return Err(LtpError::InvalidHeapPageAllocOffset(start));
        }
        if end > page_map_offset {
            return Err(LtpError::InvalidHeapPageAllocOffset(end));
        }

        Ok(&block[usize::from(start)..usize::from(end)])
    }

    /// Bytes of the allocation behind `hidUserRoot`.
    pub fn user_root(&self) -> LtpResult<&[u8]> {
        self.find_entry(self.header.user_root)
    }
}

/// Build a single-block heap image. Shared by the LTP tests.
#[cfg(test)]
pub(crate) fn heap_block(client_signature: HeapNodeType, allocations: &[&[u8]]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0_u16.to_le_bytes());
    data.push(HEAP_SIGNATURE);
    data.push(client_signature as u8);
    // hidUserRoot is the first allocation
    data.extend_from_slice(&0x20_u32.to_le_bytes());
    data.extend_from_slice(&0_u32.to_le_bytes());

    let mut offsets = vec![data.len() as u16];
    for allocation in allocations {
        data.extend_from_slice(allocation);
        offsets.push(data.len() as u16);
    }
    if data.len() % 2 == 1 {
        data.push(0);
    }

    let page_map_offset = data.len() as u16;
    data[..2].copy_from_slice(&page_map_offset.to_le_bytes());
    data.extend_from_slice(&(allocations.len() as u16).to_le_bytes());
    data.extend_from_slice(&0_u16.to_le_bytes());
    for offset in offsets {
        data.extend_from_slice(&offset.to_le_bytes());
    }
    data
}
