//! [Pages](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5774b4f2-cdc4-453e-996a-8c8230116930)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{
    fmt::Debug,
    io::{self, Cursor, Read},
};

use super::{block_id::BlockId, block_ref::BlockRef, header::NdbVersion, node_id::NodeId, *};
use crate::{crc::compute_crc, diagnostics::Warning, PstFile};

pub const PAGE_SIZE: usize = 512;

/// `ptype`
///
/// ### See also
/// [PageTrailer]
#[repr(u8)]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PageType {
    /// `ptypeBBT`: Block BTree page
    BlockBTree = 0x80,
    /// `ptypeNBT`: Node BTree page
    NodeBTree = 0x81,
    /// `ptypeFMap`: Free Map page
    FreeMap = 0x82,
    /// `ptypePMap`: Allocation Page Map page
    AllocationPageMap = 0x83,
    /// `ptypeAMap`: Allocation Map page
    AllocationMap = 0x84,
    /// `ptypeFPMap`: Free Page Map page
    FreePageMap = 0x85,
    /// `ptypeDL`: Density List page
    DensityList = 0x86,
}

impl TryFrom<u8> for PageType {
    type Error = NdbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x80 => Ok(PageType::BlockBTree),
            0x81 => Ok(PageType::NodeBTree),
            0x82 => Ok(PageType::FreeMap),
            0x83 => Ok(PageType::AllocationPageMap),
            0x84 => Ok(PageType::AllocationMap),
            0x85 => Ok(PageType::FreePageMap),
            0x86 => Ok(PageType::DensityList),
            _ => Err(NdbError::InvalidPageType(value)),
        }
    }
}

/// [PAGETRAILER](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/f4ccb38a-930a-4db4-98df-a69c195926ba)
#[derive(Clone, Copy, Debug)]
pub struct PageTrailer {
    page_type: PageType,
    signature: u16,
    crc: u32,
    block_id: BlockId,
}

impl PageTrailer {
    fn read(version: NdbVersion, f: &mut dyn Read) -> NdbResult<Self> {
        // ptype
        let page_type = f.read_u8()?;

        // ptypeRepeat
        let repeat = f.read_u8()?;
        if page_type != repeat {
            return Err(NdbError::MismatchPageTypeRepeat(page_type, repeat));
        }
        let page_type = PageType::try_from(page_type)?;

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
            page_type,
            signature,
            crc,
            block_id,
        })
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
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

/// One 512-byte page. A page whose `dwCRC` did not match is still returned, with
/// [Page::crc_matches] cleared and a warning recorded.
#[derive(Clone)]
pub struct Page {
    version: NdbVersion,
    data: Vec<u8>,
    trailer: PageTrailer,
    crc_matches: bool,
}

impl Page {
    /// Bytes in front of the trailer.
    pub fn data(&self) -> &[u8] {
        &self.data[..PAGE_SIZE - self.version.page_trailer_size()]
    }

    pub fn trailer(&self) -> &PageTrailer {
        &self.trailer
    }

    pub fn crc_matches(&self) -> bool {
        self.crc_matches
    }
}

/// Random-access reader for fixed-size pages.
pub struct PageReader<'a> {
    pst: &'a PstFile,
}

impl<'a> PageReader<'a> {
    pub fn new(pst: &'a PstFile) -> Self {
        Self { pst }
    }

    pub fn read_page(&self, page_ref: BlockRef) -> NdbResult<Page> {
        let version = self.pst.header().version();
        let mut data = vec![0; PAGE_SIZE];
        self.pst.read_at(page_ref.index(), &mut data)?;

        let trailer_size = version.page_trailer_size();
        let trailer = PageTrailer::read(version, &mut &data[PAGE_SIZE - trailer_size..])?;

        let mut crc_matches = true;
        if self.pst.options().crc_enabled() {
            let computed = compute_crc(0, &data[..PAGE_SIZE - trailer_size]);
            if computed != trailer.crc {
                crc_matches = false;
                self.pst.diagnostics().record(Warning::PageCrcMismatch {
                    offset: page_ref.index(),
                    stored: trailer.crc,
                    computed,
                });
            }
        }

        if trailer.block_id.search_key() != page_ref.block().search_key() {
            self.pst.diagnostics().record(Warning::PageBlockIdMismatch {
                offset: page_ref.index(),
                expected: page_ref.block(),
                found: trailer.block_id,
            });
        }

        Ok(Page {
            version,
            data,
            trailer,
            crc_matches,
        })
    }
}

/// Layout of the leaf records of one of the two on-disk B-trees.
pub trait BTreeLeafEntry: Sized + Copy + Debug {
    const PAGE_TYPE: PageType;

    fn entry_size(version: NdbVersion) -> usize;
    fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self>;
    fn key(&self) -> u64;
    fn not_found(key: u64) -> NdbError;
}

/// [BTENTRY](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/bc8052a3-f300-4022-be31-f0f408fffca0)
#[derive(Clone, Copy, Debug)]
pub struct BTreeEntry {
    key: u64,
    child: BlockRef,
}

impl BTreeEntry {
    fn entry_size(version: NdbVersion) -> usize {
        version.id_size() * 3
    }

    fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        // btkey
        let key = match version {
            NdbVersion::Ansi => u64::from(f.read_u32::<LittleEndian>()?),
            NdbVersion::Unicode => f.read_u64::<LittleEndian>()?,
        };

        // BREF
        let child = BlockRef::read(version, f)?;

        Ok(Self { key, child })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn child(&self) -> BlockRef {
        self.child
    }
}

/// [NBTENTRY](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/53a4b926-8ac4-45c9-9c6d-8358d951dbcd)
#[derive(Clone, Copy, Debug)]
pub struct NodeBTreeEntry {
    node: NodeId,
    data: BlockId,
    sub_node: Option<BlockId>,
    parent: Option<NodeId>,
}

impl NodeBTreeEntry {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn data(&self) -> BlockId {
        self.data
    }

    pub fn sub_node(&self) -> Option<BlockId> {
        self.sub_node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

impl BTreeLeafEntry for NodeBTreeEntry {
    const PAGE_TYPE: PageType = PageType::NodeBTree;

    fn entry_size(version: NdbVersion) -> usize {
        match version {
            NdbVersion::Ansi => 16,
            NdbVersion::Unicode => 32,
        }
    }

    fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        // nid
        let node = NodeId::read_entry(version, f)?;

        // bidData
        let data = BlockId::read(version, f)?;

        // bidSub
        let sub_node = BlockId::read(version, f)?;
        let sub_node = (!sub_node.is_empty()).then_some(sub_node);

        // nidParent
        let parent = NodeId::read(f)?;
        let parent = (u32::from(parent) != 0).then_some(parent);

        Ok(Self {
            node,
            data,
            sub_node,
            parent,
        })
    }

    fn key(&self) -> u64 {
        u64::from(u32::from(self.node))
    }

    fn not_found(key: u64) -> NdbError {
        NdbError::NodeNotFound(NodeId::from(key as u32))
    }
}

/// [BBTENTRY](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/53a4b926-8ac4-45c9-9c6d-8358d951dbcd)
#[derive(Clone, Copy, Debug)]
pub struct BlockBTreeEntry {
    block: BlockRef,
    size: u16,
    ref_count: u16,
}

impl BlockBTreeEntry {
    pub fn block(&self) -> BlockRef {
        self.block
    }

    /// `cb`: size of the raw block data, excluding padding and trailer.
    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn ref_count(&self) -> u16 {
        self.ref_count
    }
}

impl BTreeLeafEntry for BlockBTreeEntry {
    const PAGE_TYPE: PageType = PageType::BlockBTree;

    fn entry_size(version: NdbVersion) -> usize {
        match version {
            NdbVersion::Ansi => 12,
            NdbVersion::Unicode => 24,
        }
    }

    fn read(version: NdbVersion, f: &mut dyn Read) -> io::Result<Self> {
        // BREF
        let block = BlockRef::read(version, f)?;

        // cb
        let size = f.read_u16::<LittleEndian>()?;

        // cRef
        let ref_count = f.read_u16::<LittleEndian>()?;

        Ok(Self {
            block,
            size,
            ref_count,
        })
    }

    fn key(&self) -> u64 {
        self.block.block().search_key()
    }

    fn not_found(key: u64) -> NdbError {
        NdbError::BlockNotFound(BlockId::from(key))
    }
}

#[derive(Clone, Debug)]
pub enum BTreePageEntries<L> {
    Branch(Vec<BTreeEntry>),
    Leaf(Vec<L>),
}

/// [BTPAGE](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/4f0cd8e7-c2d0-4975-90a4-d417cfca77f8)
#[derive(Clone, Debug)]
pub struct BTreePage<L> {
    level: u8,
    entries: BTreePageEntries<L>,
}

impl<L: BTreeLeafEntry> BTreePage<L> {
    pub fn read(page: &Page) -> NdbResult<Self> {
        let page_type = page.trailer().page_type();
        if page_type != L::PAGE_TYPE {
            return Err(NdbError::UnexpectedPageType(page_type));
        }

        let version = page.version;
        let entries_size = match version {
            NdbVersion::Ansi => 496,
            NdbVersion::Unicode => 488,
        };
        let data = page.data();
        let mut cursor = Cursor::new(&data[entries_size..]);

        // cEnt
        let count = usize::from(cursor.read_u8()?);

        // cEntMax
        cursor.read_u8()?;

        // cbEnt
        let entry_size = cursor.read_u8()?;

        // cLevel
        let level = cursor.read_u8()?;

        let min_entry_size = if level == 0 {
            L::entry_size(version)
        } else {
            BTreeEntry::entry_size(version)
        };
        if usize::from(entry_size) < min_entry_size {
            return Err(NdbError::InvalidBTreeEntrySize(entry_size));
        }
        if count * usize::from(entry_size) > entries_size {
            return Err(NdbError::InvalidBTreeEntryCount(count));
        }

        let records = data[..count * usize::from(entry_size)].chunks_exact(usize::from(entry_size));
        let entries = if level == 0 {
            let entries = records
                .map(|mut record| L::read(version, &mut record))
                .collect::<io::Result<Vec<_>>>()?;
            Self::check_order(entries.iter().map(L::key))?;
            BTreePageEntries::Leaf(entries)
        } else {
            let entries = records
                .map(|mut record| BTreeEntry::read(version, &mut record))
                .collect::<io::Result<Vec<_>>>()?;
            Self::check_order(entries.iter().map(BTreeEntry::key))?;
            BTreePageEntries::Branch(entries)
        };

        Ok(Self { level, entries })
    }

    fn check_order(mut keys: impl Iterator<Item = u64>) -> NdbResult<()> {
        let Some(mut previous) = keys.next() else {
            return Ok(());
        };
        for key in keys {
            if key <= previous {
                return Err(NdbError::UnsortedBTreeKeys(key));
            }
            previous = key;
        }
        Ok(())
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn entries(&self) -> &BTreePageEntries<L> {
        &self.entries
    }
}
