//! ## [Folders](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/dee5b9d0-5513-4c5e-94aa-8bd28a9350b2)

use tracing::debug;

use super::{store::Store, tags::*, *};
use crate::{
    diagnostics::Warning,
    ltp::{
        prop_context::{read_properties, PropertySet},
        table_context::TableContext,
    },
    PstFile,
};

/// Open the table node `id`. A table that was never created reads as `None`.
pub(crate) fn open_table(pst: &PstFile, id: NodeId) -> MessagingResult<Option<TableContext<'_>>> {
    let node = match pst.node(id) {
        Ok(node) => node,
        Err(NdbError::NodeNotFound(_)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(TableContext::open(pst, node)?))
}

/// One row of a contents table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRow {
    id: NodeId,
    message_class: Option<String>,
}

impl MessageRow {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn message_class(&self) -> Option<&str> {
        self.message_class.as_deref()
    }
}

#[derive(Clone, Debug)]
pub struct Folder {
    id: NodeId,
    parent: Option<NodeId>,
    properties: PropertySet,
    code_page: u16,
    sub_folders: Vec<NodeId>,
}

impl Folder {
    /// Read the folder PC and the child list from its hierarchy table. A hierarchy table that
    /// cannot be decoded is reported and leaves the folder without children.
    pub fn read(pst: &PstFile, store: &Store, id: NodeId) -> MessagingResult<Self> {
        let id_type = id.id_type()?;
        if !matches!(id_type, NodeIdType::NormalFolder | NodeIdType::SearchFolder) {
            return Err(MessagingError::InvalidFolderNodeType(id_type));
        }

        let node = pst.node(id)?;
        let properties = read_properties(pst, node)?;

        let hierarchy = id.sibling(NodeIdType::HierarchyTable)?;
        let sub_folders = match Self::read_sub_folders(pst, hierarchy) {
            Ok(sub_folders) => sub_folders,
            Err(err) if !err.category().is_fatal() => {
                pst.diagnostics().record(Warning::UnreadableTable {
                    node: hierarchy,
                    reason: err.to_string(),
                });
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        debug!(folder = %id, sub_folders = sub_folders.len(), "read folder");
        Ok(Self {
            id,
            parent: node.parent(),
            properties,
            code_page: store.code_page(),
            sub_folders,
        })
    }

    /// Every `dwRowID` in a hierarchy table is the NID of a child folder.
    fn read_sub_folders(pst: &PstFile, hierarchy: NodeId) -> MessagingResult<Vec<NodeId>> {
        let Some(table) = open_table(pst, hierarchy)? else {
            return Ok(Vec::new());
        };
        (0..table.row_count())
            .map(|index| Ok(NodeId::from(table.row_id(index)?)))
            .collect()
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub fn display_name(&self) -> String {
        self.properties
            .text(PID_TAG_DISPLAY_NAME, self.code_page)
            .unwrap_or_default()
    }

    pub fn content_count(&self) -> Option<i32> {
        self.properties.i32(PID_TAG_CONTENT_COUNT)
    }

    pub fn unread_count(&self) -> Option<i32> {
        self.properties.i32(PID_TAG_CONTENT_UNREAD_COUNT)
    }

    pub fn has_sub_folders(&self) -> bool {
        self.properties
            .bool(PID_TAG_SUBFOLDERS)
            .unwrap_or(!self.sub_folders.is_empty())
    }

    pub fn container_class(&self) -> Option<String> {
        self.properties.text(PID_TAG_CONTAINER_CLASS, self.code_page)
    }

    pub fn is_search_folder(&self) -> bool {
        matches!(self.id.id_type(), Ok(NodeIdType::SearchFolder))
    }

    /// Child folders in hierarchy table order.
    pub fn sub_folders(&self) -> &[NodeId] {
        &self.sub_folders
    }

    /// Rows of the contents table, or of the search contents table for a search folder.
    pub fn contents(&self, pst: &PstFile) -> MessagingResult<Vec<MessageRow>> {
        let table_type = if self.is_search_folder() {
            NodeIdType::SearchContentsTable
        } else {
            NodeIdType::ContentsTable
        };
        let Some(table) = open_table(pst, self.id.sibling(table_type)?)? else {
            return Ok(Vec::new());
        };

        Ok(table
            .read_rows(Some(&[PID_TAG_MESSAGE_CLASS]))?
            .into_iter()
            .map(|row| MessageRow {
                id: NodeId::from(row.id()),
                message_class: row.values().text(PID_TAG_MESSAGE_CLASS, self.code_page),
            })
            .collect())
    }
}
