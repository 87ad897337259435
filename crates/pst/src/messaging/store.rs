//! ## [Message Store](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/aa0539bd-e7bf-4cec-8bde-0b87c2a86baf)

use std::fmt::Debug;
use tracing::debug;

use super::{tags::*, *};
use crate::{
    ltp::prop_context::{read_properties, PropertySet, DEFAULT_CODE_PAGE},
    ndb::node_id::NID_MESSAGE_STORE,
    PstFile,
};

/// `PidTagRecordKey` of the store: the `uid` every EntryID in this file carries.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StoreRecordKey {
    record_key: [u8; 16],
}

impl StoreRecordKey {
    pub fn record_key(&self) -> &[u8; 16] {
        &self.record_key
    }
}

impl TryFrom<&[u8]> for StoreRecordKey {
    type Error = ();

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self {
            record_key: value.try_into().map_err(|_| ())?,
        })
    }
}

impl Debug for StoreRecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self
            .record_key
            .iter()
            .map(|ch| format!("{ch:02X}"))
            .collect::<Vec<_>>()
            .join("-");
        write!(f, "{value}")
    }
}

/// The message store PC (`NID_MESSAGE_STORE`).
#[derive(Clone, Debug)]
pub struct Store {
    properties: PropertySet,
    code_page: u16,
}

impl Store {
    pub fn read(pst: &PstFile) -> MessagingResult<Self> {
        let node = pst.node(NID_MESSAGE_STORE)?;
        let properties = read_properties(pst, node)?;
        let code_page = properties
            .i32(PID_TAG_MESSAGE_CODEPAGE)
            .and_then(|code_page| u16::try_from(code_page).ok())
            .filter(|&code_page| code_page != 0)
            .unwrap_or(DEFAULT_CODE_PAGE);

        debug!(code_page, count = properties.len(), "read message store");
        Ok(Self {
            properties,
            code_page,
        })
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Code page for `PtypString8` values that carry no better hint.
    pub fn code_page(&self) -> u16 {
        self.code_page
    }

    pub fn display_name(&self) -> Option<String> {
        self.properties.text(PID_TAG_DISPLAY_NAME, self.code_page)
    }

    pub fn record_key(&self) -> Option<StoreRecordKey> {
        StoreRecordKey::try_from(self.properties.binary(PID_TAG_RECORD_KEY)?).ok()
    }

    /// Folder behind `PidTagIpmSubTreeEntryId`: `rgbFlags`, `uid`, then the `nid`.
    pub fn ipm_sub_tree(&self) -> Option<NodeId> {
        let entry_id: [u8; 24] = self
            .properties
            .binary(PID_TAG_IPM_SUB_TREE_ENTRY_ID)?
            .try_into()
            .ok()?;
        let node = NodeId::from(u32::from_le_bytes([
            entry_id[20],
            entry_id[21],
            entry_id[22],
            entry_id[23],
        ]));
        Some(node)
    }
}
