//! ## [BTree-on-Heap (BTH)](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/2dd1a95a-c8b1-4ac5-87d1-10cb8de64053)

use byteorder::ReadBytesExt;
use std::collections::HashSet;

use super::{heap::*, *};

/// Deepest `bIdxLevels` accepted. Heaps are small enough that real trees stay far below it.
pub const MAX_TREE_LEVELS: u8 = 8;

/// [BTHHEADER](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/8e4ae05c-3c24-4103-b7e5-ffef6f244834)
#[derive(Clone, Copy, Debug)]
pub struct HeapTreeHeader {
    key_size: u8,
    entry_size: u8,
    levels: u8,
    root: HeapId,
}

impl HeapTreeHeader {
    pub fn read(mut data: &[u8]) -> LtpResult<Self> {
        // bType
        let heap_type = data.read_u8()?;
        if heap_type != HeapNodeType::Tree as u8 {
            return Err(LtpError::InvalidHeapTreeSignature(heap_type));
        }

        // cbKey
        let key_size = data.read_u8()?;
        if !matches!(key_size, 2 | 4 | 8 | 16) {
            return Err(LtpError::InvalidHeapTreeKeySize(key_size));
        }

        // cbEnt
        let entry_size = data.read_u8()?;
        if !(1..=32).contains(&entry_size) {
            return Err(LtpError::InvalidHeapTreeDataSize(entry_size));
        }

        // bIdxLevels
        let levels = data.read_u8()?;
        if levels > MAX_TREE_LEVELS {
            return Err(LtpError::HeapTreeDepthExceeded(levels));
        }

        // hidRoot
        let root = HeapId::read(&mut data)?;

        Ok(Self {
            key_size,
            entry_size,
            levels,
            root,
        })
    }

    pub fn key_size(&self) -> u8 {
        self.key_size
    }

    pub fn entry_size(&self) -> u8 {
        self.entry_size
    }

    pub fn levels(&self) -> u8 {
        self.levels
    }

    pub fn root(&self) -> HeapId {
        self.root
    }
}

/// [Leaf BTH (Data) Record](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/660db569-c8f7-4516-82ad-44709b1c667f)
#[derive(Clone, Copy, Debug)]
pub struct HeapTreeEntry<'a> {
    key: &'a [u8],
    data: &'a [u8],
}

impl<'a> HeapTreeEntry<'a> {
    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The key as a little-endian integer.
    pub fn key_value(&self) -> u64 {
        little_endian_value(self.key)
    }

    /// The data as a little-endian integer, e.g. a row index entry.
    pub fn data_value(&self) -> u64 {
        little_endian_value(self.data)
    }
}

fn little_endian_value(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .rev()
        .fold(0, |acc, &byte| (acc << 8) | u64::from(byte))
}

pub struct HeapTree<'a> {
    heap: &'a HeapNode,
    header: HeapTreeHeader,
}

impl<'a> HeapTree<'a> {
    pub fn new(heap: &'a HeapNode, header: HeapId) -> LtpResult<Self> {
        let header = HeapTreeHeader::read(heap.find_entry(header)?)?;
        Ok(Self { heap, header })
    }

    pub fn header(&self) -> &HeapTreeHeader {
        &self.header
    }

    /// Every leaf record, in key order.
    pub fn entries(&self) -> LtpResult<Vec<HeapTreeEntry<'a>>> {
        let mut entries = Vec::new();
        if !self.header.root.is_empty() {
            let mut visited = HashSet::new();
            self.collect(
                self.header.root,
                self.header.levels,
                &mut visited,
                &mut entries,
            )?;
        }
        Ok(entries)
    }

    fn collect(
        &self,
        records: HeapId,
        level: u8,
        visited: &mut HashSet<HeapId>,
        entries: &mut Vec<HeapTreeEntry<'a>>,
    ) -> LtpResult<()> {
        if !visited.insert(records) {
            return Err(LtpError::HeapTreeCycle(u32::from(records)));
        }

        let key_size = usize::from(self.header.key_size);
        let records = self.heap.find_entry(records)?;

        if level == 0 {
            let record_size = key_size + usize::from(self.header.entry_size);
            entries.extend(
                records
                    .chunks_exact(record_size)
                    .map(|record| HeapTreeEntry {
                        key: &record[..key_size],
                        data: &record[key_size..],
                    }),
            );
            return Ok(());
        }

        // intermediate records: key, hidNextLevel
        for record in records.chunks_exact(key_size + 4) {
            let next_level = HeapId::read(&mut &record[key_size..])?;
            self.collect(next_level, level - 1, visited, entries)?;
        }
        Ok(())
    }

    /// The leaf record whose key equals `key`, if any.
    pub fn find(&self, key: &[u8]) -> LtpResult<Option<HeapTreeEntry<'a>>> {
        Ok(self.entries()?.into_iter().find(|entry| entry.key == key))
    }
}

#[cfg(test)]
pub(crate) fn tree_header(key_size: u8, entry_size: u8, levels: u8, root: u32) -> Vec<u8> {
    let mut data = vec![HeapNodeType::Tree as u8, key_size, entry_size, levels];
    data.extend_from_slice(&root.to_le_bytes());
    data
}
