//! [Nodes](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/e4efaad0-1876-446e-9d34-bb921588f924):
//! an NBT entry or a sub-node entry, with the data and sub-node trees it points to.

use std::sync::Arc;

use super::{
    block::{SubNodeEntry, SubNodeTree},
    block_id::BlockId,
    node_id::NodeId,
    page::NodeBTreeEntry,
    *,
};
use crate::PstFile;

#[derive(Clone, Copy, Debug)]
pub struct Node {
    id: NodeId,
    data: BlockId,
    sub_node: Option<BlockId>,
    parent: Option<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn data(&self) -> BlockId {
        self.data
    }

    pub fn sub_node(&self) -> Option<BlockId> {
        self.sub_node
    }

    /// `nidParent` from the NBT. Sub-nodes never carry one.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn read_data_tree(&self, pst: &PstFile) -> NdbResult<Vec<Arc<Vec<u8>>>> {
        pst.block_decoder().read_data_tree(self.data)
    }

    pub fn read_data(&self, pst: &PstFile) -> NdbResult<Vec<u8>> {
        pst.block_decoder().read_data(self.data)
    }

    /// All sub-nodes of this node. A node without a sub-node tree has none.
    pub fn sub_nodes(&self, pst: &PstFile) -> NdbResult<SubNodeTree> {
        match self.sub_node {
            Some(block) => pst.block_decoder().read_sub_node_tree(block),
            None => Ok(SubNodeTree::new()),
        }
    }

    pub fn find_sub_node(&self, pst: &PstFile, id: NodeId) -> NdbResult<Node> {
        self.sub_nodes(pst)?
            .get(&id)
            .map(|entry| Node::from(*entry))
            .ok_or(NdbError::SubNodeNotFound(id))
    }
}

impl From<NodeBTreeEntry> for Node {
    fn from(entry: NodeBTreeEntry) -> Self {
        Self {
            id: entry.node(),
            data: entry.data(),
            sub_node: entry.sub_node(),
            parent: entry.parent(),
        }
    }
}

impl From<SubNodeEntry> for Node {
    fn from(entry: SubNodeEntry) -> Self {
        Self {
            id: entry.node(),
            data: entry.data(),
            sub_node: entry.sub_node(),
            parent: None,
        }
    }
}
