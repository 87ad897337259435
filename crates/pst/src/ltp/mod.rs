//! ## [Lists, Tables, and Properties (LTP) Layer](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/4c24c7d2-5c5a-4b99-88b2-f4b84cc293ae)

use std::io;
use thiserror::Error;

use crate::{ndb::NdbError, ErrorCategory};

pub mod heap;
pub mod prop_context;
pub mod prop_type;
pub mod table_context;
pub mod tree;

use prop_type::PropertyType;

#[derive(Error, Debug)]
pub enum LtpError {
    #[error("Node Database error: {0}")]
    NodeDatabaseError(#[from] NdbError),
    #[error("Truncated LTP structure: {0}")]
    Truncated(#[from] io::Error),
    #[error("Invalid HID: 0x{0:08X}")]
    InvalidHeapId(u32),
    #[error("Invalid HID hidIndex: 0x{0:04X}")]
    InvalidHeapIndex(u16),
    #[error("HID hidBlockIndex not found: 0x{0:04X}")]
    HeapBlockIndexNotFound(u16),
    #[error("Invalid HNHDR bSig: 0x{0:02X}")]
    InvalidHeapNodeSignature(u8),
    #[error("Invalid HNHDR bClientSig: 0x{0:02X}")]
    InvalidHeapNodeTypeSignature(u8),
    #[error("Invalid HNPAGEMAP ibHnpm: 0x{0:04X}")]
    InvalidHeapPageMapOffset(u16),
    #[error("Invalid HNPAGEMAP rgibAlloc entry: 0x{0:04X}")]
    InvalidHeapPageAllocOffset(u16),
    #[error("Invalid BTHHEADER bType: 0x{0:02X}")]
    InvalidHeapTreeSignature(u8),
    #[error("Invalid BTHHEADER cbKey: 0x{0:02X}")]
    InvalidHeapTreeKeySize(u8),
    #[error("Invalid BTHHEADER cbEnt: 0x{0:02X}")]
    InvalidHeapTreeDataSize(u8),
    #[error("BTH bIdxLevels exceeded: {0}")]
    HeapTreeDepthExceeded(u8),
    #[error("BTH index revisits HID 0x{0:08X}")]
    HeapTreeCycle(u32),
    #[error("Invalid property type: 0x{0:04X}")]
    InvalidPropertyType(u16),
    #[error("Invalid {prop_type:?} property size: {size}")]
    InvalidPropertySize { prop_type: PropertyType, size: usize },
    #[error("Invalid multi-valued property offset: 0x{0:08X}")]
    InvalidMultiValuePropertyOffset(u32),
    #[error("Property is not stored in a heap or sub-node: 0x{0:08X}")]
    InvalidPropertyReference(u32),
    #[error("Invalid TCINFO bType: 0x{0:02X}")]
    InvalidTableSignature(u8),
    #[error("Invalid TCINFO rgib: {0:?}")]
    InvalidTableGroupOffsets([u16; 4]),
    #[error("Invalid TCOLDESC for 0x{tag:08X}: ibData 0x{offset:04X}, cbData {size}")]
    InvalidTableColumn { tag: u32, offset: u16, size: u8 },
    #[error("Table row not found: 0x{0:08X}")]
    TableRowNotFound(u32),
    #[error("Table row index out of range: {0}")]
    InvalidTableRowIndex(usize),
    #[error("Unsupported code page: {0}")]
    UnsupportedCodePage(u16),
}

impl LtpError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NodeDatabaseError(err) => err.category(),
            Self::TableRowNotFound(_) => ErrorCategory::NotFound,
            _ => ErrorCategory::Damaged,
        }
    }
}

pub type LtpResult<T> = Result<T, LtpError>;
