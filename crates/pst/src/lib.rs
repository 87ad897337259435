#![doc = include_str!("../README.md")]

use lru::LruCache;
use std::{
    fmt::Debug,
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    num::NonZeroUsize,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::debug;

pub mod diagnostics;
pub mod ltp;
pub mod messaging;
pub mod ndb;
pub mod walker;

mod block_sig;
mod crc;
mod encode;

#[cfg(test)]
pub(crate) mod fixture;

use diagnostics::Diagnostics;
use messaging::{folder::Folder, store::Store, MessagingResult};
use ndb::{
    block::BlockDecoder,
    btree::{BlockBTree, NodeBTree},
    header::Header,
    node::Node,
    node_id::NodeId,
    page::PageReader,
    NdbError, NdbResult,
};
use walker::{TreeWalker, WalkOptions};

/// Coarse classification shared by every layer's error type.
///
/// `Io`, `Format` and `Corruption` end whatever operation hit them. `NotFound` and `Damaged`
/// are local to one object: a walk records them as warnings and moves on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Format,
    Corruption,
    NotFound,
    Damaged,
}

impl ErrorCategory {
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Io | Self::Format | Self::Corruption)
    }
}

/// Anything a PST can be read from.
pub trait PstSource: Read + Seek + Send {}

impl<T> PstSource for T where T: Read + Seek + Send {}

#[derive(Clone, Debug)]
pub struct PstOpenOptions {
    block_cache_capacity: usize,
    verify_crc: bool,
}

impl Default for PstOpenOptions {
    fn default() -> Self {
        Self {
            block_cache_capacity: 256,
            verify_crc: true,
        }
    }
}

impl PstOpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decoded blocks kept in the LRU cache. `0` disables caching.
    pub fn block_cache_capacity(mut self, capacity: usize) -> Self {
        self.block_cache_capacity = capacity;
        self
    }

    /// Check `dwCRC` on pages and blocks. Mismatches are only ever warnings.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    pub fn cache_capacity(&self) -> usize {
        self.block_cache_capacity
    }

    pub fn crc_enabled(&self) -> bool {
        self.verify_crc
    }
}

/// [PST File](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/6b57253b-0853-47bb-99bb-d4b8f78105f0)
///
/// The header is validated when the file is opened. Everything else is read on demand.
///
/// One `PstFile` serves one walk at a time. Using the same `PstFile` from several threads
/// at once is undefined: reads, the block cache and the diagnostics are not coordinated
/// between walks. Open the path again for each concurrent walk.
pub struct PstFile {
    source: Mutex<Box<dyn PstSource>>,
    header: Header,
    options: PstOpenOptions,
    cache: Mutex<Option<LruCache<u64, Arc<Vec<u8>>>>>,
    diagnostics: Diagnostics,
}

impl PstFile {
    pub fn open(path: impl AsRef<Path>) -> NdbResult<Self> {
        Self::open_with(path, PstOpenOptions::default())
    }

    pub fn open_with(path: impl AsRef<Path>, options: PstOpenOptions) -> NdbResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NdbError::FileNotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "opening PST file");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }

    pub fn from_reader(
        mut source: impl PstSource + 'static,
        options: PstOpenOptions,
    ) -> NdbResult<Self> {
        source.seek(SeekFrom::Start(0))?;
        let header = Header::read(&mut source)?;
        let cache = NonZeroUsize::new(options.block_cache_capacity).map(LruCache::new);

        Ok(Self {
            source: Mutex::new(Box::new(source)),
            header,
            options,
            cache: Mutex::new(cache),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn options(&self) -> &PstOpenOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Fill `buffer` from the absolute file offset `offset`.
    pub(crate) fn read_at(&self, offset: u64, buffer: &mut [u8]) -> NdbResult<()> {
        let mut source = self
            .source
            .lock()
            .map_err(|_| NdbError::FailedToLockFile)?;
        source.seek(SeekFrom::Start(offset))?;
        source.read_exact(buffer)?;
        Ok(())
    }

    pub(crate) fn cached_block(&self, key: u64) -> Option<Arc<Vec<u8>>> {
        let mut cache = self.cache.lock().ok()?;
        cache.as_mut()?.get(&key).cloned()
    }

    pub(crate) fn cache_block(&self, key: u64, data: Arc<Vec<u8>>) {
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cache) = cache.as_mut() {
                cache.put(key, data);
            }
        }
    }

    pub fn page_reader(&self) -> PageReader<'_> {
        PageReader::new(self)
    }

    pub fn node_btree(&self) -> NodeBTree<'_> {
        NodeBTree::new(self, self.header.root().node_btree())
    }

    pub fn block_btree(&self) -> BlockBTree<'_> {
        BlockBTree::new(self, self.header.root().block_btree())
    }

    pub fn block_decoder(&self) -> BlockDecoder<'_> {
        BlockDecoder::new(self)
    }

    /// Resolve a node through the NBT.
    pub fn node(&self, id: NodeId) -> NdbResult<Node> {
        Ok(Node::from(self.node_btree().lookup(u64::from(u32::from(id)))?))
    }

    pub fn store(&self) -> MessagingResult<Store> {
        Store::read(self)
    }

    pub fn root_folder(&self) -> MessagingResult<Folder> {
        Folder::read(self, &self.store()?, ndb::node_id::NID_ROOT_FOLDER)
    }

    /// Lazily walk every email below the root folder.
    ///
    /// Starting a walk clears the [diagnostics](Self::diagnostics), so the warnings recorded
    /// afterwards belong to this walk. [take](Diagnostics::take) them first to keep them.
    pub fn walk_emails(self: &Arc<Self>, options: WalkOptions) -> TreeWalker {
        self.diagnostics.take();
        TreeWalker::new(self.clone(), options)
    }
}

impl Debug for PstFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PstFile")
            .field("header", &self.header)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
