//! [Blocks](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/a9c1981d-d1ea-457c-b39e-dc7fb0eb95d4)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    collections::BTreeMap,
    io::{self, Cursor, Read},
    sync::Arc,
};
use tracing::trace;

use super::{block_id::BlockId, header::NdbVersion, node_id::NodeId, *};
use crate::{block_sig::compute_sig, crc::compute_crc, diagnostics::Warning, encode, PstFile};

pub const MAX_BLOCK_SIZE: u16 = 8192;

/// On-disk footprint of a block holding `size` bytes of data and trailer, rounded up to the
/// next multiple of 64.
pub const fn block_size(size: u16) -> u16 {
    if size >= MAX_BLOCK_SIZE {
        MAX_BLOCK_SIZE
    } else {
        let size = if size < 64 { 64 } else { size };
        let tail = size % 64;
        if tail == 0 {
            size
        } else {
            size - tail + 64
        }
    }
}

/// [BLOCKTRAILER](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/a14943ef-70c2-403f-898c-5bc3747117e1)
#[derive(Clone, Copy, Debug)]
pub struct BlockTrailer {
    size: u16,
    signature: u16,
    crc: u32,
    block_id: BlockId,
}

impl BlockTrailer {
    pub fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        // cb
        let size = f.read_u16::<LittleEndian>()?;

        // wSig
        let signature = f.read_u16::<LittleEndian>()?;

        let (crc, block_id) = match version {
            NdbVersion::Unicode => {
                // dwCRC, bid
                let crc = f.read_u32::<LittleEndian>()?;
                (crc, BlockId::read(version, f)?)
            }
            NdbVersion::Ansi => {
                // bid, dwCRC
                let block_id = BlockId::read(version, f)?;
                (f.read_u32::<LittleEndian>()?, block_id)
            }
        };

        Ok(Self {
            size,
            signature,
            crc,
            block_id,
        })
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn signature(&self) -> u16 {
        self.signature
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }
}

/// `btype` of an XBLOCK or XXBLOCK.
const DATA_TREE_BLOCK_TYPE: u8 = 0x01;

/// `btype` of an SLBLOCK or SIBLOCK.
const SUB_NODE_TREE_BLOCK_TYPE: u8 = 0x02;

/// [SLENTRY](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/85c4d943-0779-43c5-bd98-61dc9bb5dfd6)
#[derive(Clone, Copy, Debug)]
pub struct SubNodeEntry {
    node: NodeId,
    data: BlockId,
    sub_node: Option<BlockId>,
}

impl SubNodeEntry {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn data(&self) -> BlockId {
        self.data
    }

    pub fn sub_node(&self) -> Option<BlockId> {
        self.sub_node
    }
}

/// Flattened contents of an SLBLOCK/SIBLOCK tree, keyed by the sub-node id.
pub type SubNodeTree = BTreeMap<NodeId, SubNodeEntry>;

/// Resolves block ids to decoded bytes.
pub struct BlockDecoder<'a> {
    pst: &'a PstFile,
}

impl<'a> BlockDecoder<'a> {
    pub fn new(pst: &'a PstFile) -> Self {
        Self { pst }
    }

    /// Read one block through the BBT and return its decoded data.
    ///
    /// Trailer mismatches (`dwCRC`, `wSig`, `bid`) are recorded as warnings and the block is
    /// still returned. Data blocks are decoded with the file's `bCryptMethod`; internal blocks
    /// are stored as-is.
    pub fn read_block(&self, block: BlockId) -> NdbResult<Arc<Vec<u8>>> {
        let key = block.search_key();
        if let Some(data) = self.pst.cached_block(key) {
            return Ok(data);
        }

        let version = self.pst.header().version();
        let entry = self.pst.block_btree().lookup(key)?;
        let block_ref = entry.block();

        let trailer_size = version.block_trailer_size() as u16;
        let size = entry.size();
        if size == 0 || size > MAX_BLOCK_SIZE - trailer_size {
            return Err(NdbError::InvalidBlockSize(size));
        }

        let total = usize::from(block_size(size + trailer_size));
        let mut data = vec![0; total];
        self.pst.read_at(block_ref.index(), &mut data)?;

        let trailer =
            BlockTrailer::read(version, &mut &data[total - usize::from(trailer_size)..])?;
        if trailer.size != size {
            return Err(NdbError::MismatchBlockSize(size, trailer.size));
        }
        data.truncate(usize::from(size));

        let diagnostics = self.pst.diagnostics();
        if self.pst.options().crc_enabled() {
            let computed = compute_crc(0, &data);
            if computed != trailer.crc {
                diagnostics.record(Warning::BlockCrcMismatch {
                    block: block_ref.block(),
                    stored: trailer.crc,
                    computed,
                });
            }
        }

        let signature = compute_sig(block_ref.index(), u64::from(block_ref.block()));
        if signature != trailer.signature {
            diagnostics.record(Warning::BlockSignatureMismatch {
                block: block_ref.block(),
                stored: trailer.signature,
                computed: signature,
            });
        }

        if trailer.block_id.search_key() != key {
            diagnostics.record(Warning::BlockIdMismatch {
                expected: block_ref.block(),
                found: trailer.block_id,
            });
        }

        if !block.is_internal() {
            encode::decode_block(
                self.pst.header().crypt_method(),
                u64::from(block_ref.block()),
                &mut data,
            );
        }

        trace!(block = ?block_ref.block(), size, "decoded block");

        let data = Arc::new(data);
        self.pst.cache_block(key, data.clone());
        Ok(data)
    }

    /// Read a data tree: either a single data block, or an XBLOCK/XXBLOCK whose leaves are
    /// returned in order. The concatenation of the returned blocks is the node's data.
    pub fn read_data_tree(&self, block: BlockId) -> NdbResult<Vec<Arc<Vec<u8>>>> {
        if !block.is_internal() {
            return Ok(vec![self.read_block(block)?]);
        }

        let root = self.read_internal_block(block)?;
        let blocks = match root.level {
            1 => self.read_leaves(&root.children)?,
            2 => {
                let mut blocks = Vec::new();
                for &child in &root.children {
                    if !child.is_internal() {
                        return Err(NdbError::ExpectedInternalBlock(child));
                    }
                    let child = self.read_internal_block(child)?;
                    if child.level != 1 {
                        return Err(NdbError::InvalidInternalBlockLevel(child.level));
                    }
                    blocks.extend(self.read_leaves(&child.children)?);
                }
                blocks
            }
            level => return Err(NdbError::InvalidInternalBlockLevel(level)),
        };

        let actual: usize = blocks.iter().map(|block| block.len()).sum();
        if actual != root.total_size as usize {
            self.pst
                .diagnostics()
                .record(Warning::DataTreeSizeMismatch {
                    block,
                    expected: root.total_size,
                    actual,
                });
        }

        Ok(blocks)
    }

    /// Size of the data behind `block` without reading the leaves of a data tree: the BBT
    /// `cb` of a data block, or `lcbTotal` of an XBLOCK/XXBLOCK.
    pub fn data_size(&self, block: BlockId) -> NdbResult<u64> {
        if block.is_internal() {
            Ok(u64::from(self.read_internal_block(block)?.total_size))
        } else {
            Ok(u64::from(self.pst.block_btree().lookup(block.search_key())?.size()))
        }
    }

    /// [read_data_tree](Self::read_data_tree), concatenated.
    pub fn read_data(&self, block: BlockId) -> NdbResult<Vec<u8>> {
        Ok(self
            .read_data_tree(block)?
            .iter()
            .flat_map(|data| data.iter().copied())
            .collect())
    }

    fn read_leaves(&self, children: &[BlockId]) -> NdbResult<Vec<Arc<Vec<u8>>>> {
        children
            .iter()
            .map(|&child| {
                if child.is_internal() {
                    return Err(NdbError::ExpectedDataBlock(child));
                }
                self.read_block(child)
            })
            .collect()
    }

    /// [XBLOCK](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5b7a6935-e83d-4917-9f62-6ce3707f09e0)
    /// or [XXBLOCK](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/061b6ac4-d1da-468c-b75d-0303a0a8f468)
    fn read_internal_block(&self, block: BlockId) -> NdbResult<DataTreeBlock> {
        let version = self.pst.header().version();
        let data = self.read_block(block)?;
        let mut cursor = Cursor::new(data.as_slice());

        // btype
        let block_type = cursor.read_u8().or_truncated(block)?;
        if block_type != DATA_TREE_BLOCK_TYPE {
            return Err(NdbError::InvalidInternalBlockType(block_type));
        }

        // cLevel
        let level = cursor.read_u8().or_truncated(block)?;
        if !(1..=2).contains(&level) {
            return Err(NdbError::InvalidInternalBlockLevel(level));
        }

        // cEnt
        let count = cursor.read_u16::<LittleEndian>().or_truncated(block)?;
        if usize::from(count) * version.id_size() > data.len().saturating_sub(8) {
            return Err(NdbError::InvalidInternalBlockEntryCount(count));
        }

        // lcbTotal
        let total_size = cursor.read_u32::<LittleEndian>().or_truncated(block)?;

        // rgbid
        let children = (0..count)
            .map(|_| BlockId::read(version, &mut cursor))
            .collect::<io::Result<Vec<_>>>()
            .or_truncated(block)?;

        Ok(DataTreeBlock {
            level,
            total_size,
            children,
        })
    }

    /// Read an [SLBLOCK](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5182eb24-4b0b-4816-aa35-95ff0f9cd9d1)
    /// or [SIBLOCK](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/9e79c673-d2c4-47fb-a2fa-0e2d7d6bd0c2)
    /// tree into a map of sub-nodes.
    pub fn read_sub_node_tree(&self, block: BlockId) -> NdbResult<SubNodeTree> {
        let mut tree = SubNodeTree::new();
        self.read_sub_node_block(block, None, &mut tree)?;
        Ok(tree)
    }

    fn read_sub_node_block(
        &self,
        block: BlockId,
        expected_level: Option<u8>,
        tree: &mut SubNodeTree,
    ) -> NdbResult<()> {
        if !block.is_internal() {
            return Err(NdbError::ExpectedInternalBlock(block));
        }

        let version = self.pst.header().version();
        let data = self.read_block(block)?;
        let mut cursor = Cursor::new(data.as_slice());

        // btype
        let block_type = cursor.read_u8().or_truncated(block)?;
        if block_type != SUB_NODE_TREE_BLOCK_TYPE {
            return Err(NdbError::InvalidInternalBlockType(block_type));
        }

        // cLevel
        let level = cursor.read_u8().or_truncated(block)?;
        if level > 1 || expected_level.is_some_and(|expected| expected != level) {
            return Err(NdbError::InvalidInternalBlockLevel(level));
        }

        // cEnt
        let count = cursor.read_u16::<LittleEndian>().or_truncated(block)?;

        // dwPadding
        let header_size = match version {
            NdbVersion::Unicode => {
                cursor.read_u32::<LittleEndian>().or_truncated(block)?;
                8
            }
            NdbVersion::Ansi => 4,
        };

        let entry_size = match level {
            0 => version.id_size() * 3,
            _ => version.id_size() * 2,
        };
        if usize::from(count) * entry_size > data.len().saturating_sub(header_size) {
            return Err(NdbError::InvalidInternalBlockEntryCount(count));
        }

        for _ in 0..count {
            // nid
            let node = NodeId::read_entry(version, &mut cursor).or_truncated(block)?;

            if level == 0 {
                // bidData
                let data = BlockId::read(version, &mut cursor).or_truncated(block)?;

                // bidSub
                let sub_node = BlockId::read(version, &mut cursor).or_truncated(block)?;
                let sub_node = (!sub_node.is_empty()).then_some(sub_node);

                tree.insert(
                    node,
                    SubNodeEntry {
                        node,
                        data,
                        sub_node,
                    },
                );
            } else {
                // bid
                let child = BlockId::read(version, &mut cursor).or_truncated(block)?;
                self.read_sub_node_block(child, Some(0), tree)?;
            }
        }

        Ok(())
    }
}

/// Short reads over block bytes already in memory mean the block itself is damaged, not that
/// the file could not be read.
trait OrTruncated<T> {
    fn or_truncated(self, block: BlockId) -> NdbResult<T>;
}

impl<T> OrTruncated<T> for io::Result<T> {
    fn or_truncated(self, block: BlockId) -> NdbResult<T> {
        self.map_err(|_| NdbError::TruncatedBlock(block))
    }
}

struct DataTreeBlock {
    level: u8,
    total_size: u32,
    children: Vec<BlockId>,
}
