//! Lookups in the two on-disk [B-trees](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/4f0cd8e7-c2d0-4975-90a4-d417cfca77f8).

use std::marker::PhantomData;

use super::{block_ref::BlockRef, page::*, *};
use crate::PstFile;

/// The node B-tree (NBT), keyed by [NodeId].
pub type NodeBTree<'a> = BTreeIndex<'a, NodeBTreeEntry>;

/// The block B-tree (BBT), keyed by [BlockId::search_key].
pub type BlockBTree<'a> = BTreeIndex<'a, BlockBTreeEntry>;

/// Descends a B-tree from its root page. Both trees share this walk; they only differ in the
/// leaf record layout `L`.
pub struct BTreeIndex<'a, L> {
    pages: PageReader<'a>,
    root: BlockRef,
    _entry: PhantomData<L>,
}

impl<'a, L: BTreeLeafEntry> BTreeIndex<'a, L> {
    pub fn new(pst: &'a PstFile, root: BlockRef) -> Self {
        Self {
            pages: PageReader::new(pst),
            root,
            _entry: PhantomData,
        }
    }

    fn read_page(&self, page_ref: BlockRef) -> NdbResult<BTreePage<L>> {
        BTreePage::read(&self.pages.read_page(page_ref)?)
    }

    /// Find the leaf entry whose key is exactly `key`.
    ///
    /// At each branch page this follows the entry with the largest key that is not greater
    /// than `key`. Every child must sit exactly one level below its parent, so the walk takes
    /// at most `cLevel + 1` page reads before it either finds a leaf or reports corruption.
    pub fn lookup(&self, key: u64) -> NdbResult<L> {
        let mut page = self.read_page(self.root)?;
        let height = page.level();

        for _ in 0..=height {
            let child = match page.entries() {
                BTreePageEntries::Leaf(entries) => {
                    return entries
                        .binary_search_by_key(&key, L::key)
                        .map(|index| entries[index])
                        .map_err(|_| L::not_found(key));
                }
                BTreePageEntries::Branch(entries) => {
                    let position = entries.partition_point(|entry| entry.key() <= key);
                    if position == 0 {
                        return Err(L::not_found(key));
                    }
                    entries[position - 1].child()
                }
            };

            let expected = page.level().saturating_sub(1);
            let next = self.read_page(child)?;
            if next.level() != expected {
                return Err(NdbError::UnexpectedBTreePageLevel {
                    expected,
                    found: next.level(),
                });
            }
            page = next;
        }

        Err(NdbError::BTreeDepthExceeded(height))
    }

    /// Every leaf entry in key order.
    pub fn entries(&self) -> NdbResult<Vec<L>> {
        let root = self.read_page(self.root)?;
        let mut entries = Vec::new();
        let mut pending = vec![root];
        while let Some(page) = pending.pop() {
            match page.entries() {
                BTreePageEntries::Leaf(leaves) => entries.extend_from_slice(leaves),
                BTreePageEntries::Branch(branches) => {
                    let expected = page.level().saturating_sub(1);
                    // reversed so the smallest key is popped first
                    for branch in branches.iter().rev() {
                        let child = self.read_page(branch.child())?;
                        if child.level() != expected {
                            return Err(NdbError::UnexpectedBTreePageLevel {
                                expected,
                                found: child.level(),
                            });
                        }
                        pending.push(child);
                    }
                }
            }
        }

        Ok(entries)
    }
}
