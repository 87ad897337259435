//! ## [Node Database (NDB) Layer](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/e4efaad0-1876-446e-9d34-bb921588f924)

use std::{io, path::PathBuf};
use thiserror::Error;

use crate::ErrorCategory;

pub mod block;
pub mod block_id;
pub mod block_ref;
pub mod btree;
pub mod header;
pub mod node;
pub mod node_id;
pub mod page;
pub mod root;

use block_id::BlockId;
use node_id::NodeId;
use page::PageType;

#[derive(Error, Debug)]
pub enum NdbError {
    #[error("PST file not found: {0:?}")]
    FileNotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to lock PST file")]
    FailedToLockFile,
    #[error("Truncated HEADER: {0} bytes")]
    TruncatedHeader(usize),
    #[error("Invalid HEADER dwMagic: 0x{0:08X}")]
    InvalidNdbHeaderMagicValue(u32),
    #[error("Invalid HEADER wMagicClient: 0x{0:04X}")]
    InvalidNdbHeaderMagicClientValue(u16),
    #[error("Invalid HEADER wVer: 0x{0:04X}")]
    InvalidNdbVersion(u16),
    #[error("Invalid HEADER dwCRCPartial: 0x{0:08X}")]
    InvalidNdbHeaderPartialCrc(u32),
    #[error("Invalid HEADER dwCRCFull: 0x{0:08X}")]
    InvalidNdbHeaderFullCrc(u32),
    #[error("Invalid HEADER bSentinel: 0x{0:02X}")]
    InvalidNdbHeaderSentinelValue(u8),
    #[error("Invalid HEADER bCryptMethod: 0x{0:02X}")]
    InvalidNdbCryptMethod(u8),
    #[error("Mismatch between PAGETRAILER ptype and ptypeRepeat: (0x{0:02X}, 0x{1:02X})")]
    MismatchPageTypeRepeat(u8, u8),
    #[error("Invalid PAGETRAILER ptype: 0x{0:02X}")]
    InvalidPageType(u8),
    #[error("Unexpected PAGETRAILER ptype: {0:?}")]
    UnexpectedPageType(PageType),
    #[error("Unexpected BTPAGE cLevel: expected {expected}, found {found}")]
    UnexpectedBTreePageLevel { expected: u8, found: u8 },
    #[error("Invalid BTPAGE cEnt: {0}")]
    InvalidBTreeEntryCount(usize),
    #[error("Invalid BTPAGE cbEnt: {0}")]
    InvalidBTreeEntrySize(u8),
    #[error("BTPAGE keys out of order at 0x{0:016X}")]
    UnsortedBTreeKeys(u64),
    #[error("BTree descent exceeded declared height {0}")]
    BTreeDepthExceeded(u8),
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("Block not found: {0:?}")]
    BlockNotFound(BlockId),
    #[error("Sub-node not found: {0:?}")]
    SubNodeNotFound(NodeId),
    #[error("Invalid nidType: 0x{0:02X}")]
    InvalidNodeIdType(u8),
    #[error("Invalid nidIndex: 0x{0:08X}")]
    InvalidNodeIndex(u32),
    #[error("Invalid bidIndex: 0x{0:016X}")]
    InvalidBlockIndex(u64),
    #[error("Invalid BBTENTRY cb: 0x{0:04X}")]
    InvalidBlockSize(u16),
    #[error("Mismatch between BBTENTRY cb and BLOCKTRAILER cb: (0x{0:04X}, 0x{1:04X})")]
    MismatchBlockSize(u16, u16),
    #[error("Invalid internal block btype: 0x{0:02X}")]
    InvalidInternalBlockType(u8),
    #[error("Invalid internal block cLevel: 0x{0:02X}")]
    InvalidInternalBlockLevel(u8),
    #[error("Invalid internal block cEnt: {0}")]
    InvalidInternalBlockEntryCount(u16),
    #[error("Expected an internal block: {0:?}")]
    ExpectedInternalBlock(BlockId),
    #[error("Expected a data block: {0:?}")]
    ExpectedDataBlock(BlockId),
    #[error("Block data ends before its header or entries: {0:?}")]
    TruncatedBlock(BlockId),
}

impl NdbError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FileNotFound(_) | Self::Io(_) | Self::FailedToLockFile => ErrorCategory::Io,

            Self::TruncatedHeader(_)
            | Self::InvalidNdbHeaderMagicValue(_)
            | Self::InvalidNdbHeaderMagicClientValue(_)
            | Self::InvalidNdbVersion(_)
            | Self::InvalidNdbHeaderPartialCrc(_)
            | Self::InvalidNdbHeaderFullCrc(_)
            | Self::InvalidNdbHeaderSentinelValue(_)
            | Self::InvalidNdbCryptMethod(_) => ErrorCategory::Format,

            Self::MismatchPageTypeRepeat(..)
            | Self::InvalidPageType(_)
            | Self::UnexpectedPageType(_)
            | Self::UnexpectedBTreePageLevel { .. }
            | Self::InvalidBTreeEntryCount(_)
            | Self::InvalidBTreeEntrySize(_)
            | Self::UnsortedBTreeKeys(_)
            | Self::BTreeDepthExceeded(_) => ErrorCategory::Corruption,

            Self::NodeNotFound(_) | Self::BlockNotFound(_) | Self::SubNodeNotFound(_) => {
                ErrorCategory::NotFound
            }

            Self::InvalidNodeIdType(_)
            | Self::InvalidNodeIndex(_)
            | Self::InvalidBlockIndex(_)
            | Self::InvalidBlockSize(_)
            | Self::MismatchBlockSize(..)
            | Self::InvalidInternalBlockType(_)
            | Self::InvalidInternalBlockLevel(_)
            | Self::InvalidInternalBlockEntryCount(_)
            | Self::ExpectedInternalBlock(_)
            | Self::ExpectedDataBlock(_)
            | Self::TruncatedBlock(_) => ErrorCategory::Damaged,
        }
    }
}

pub type NdbResult<T> = Result<T, NdbError>;
