//! Recoverable damage found while reading. None of these stop a walk.

use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

use crate::ndb::{block_id::BlockId, node_id::NodeId};

#[derive(Error, Clone, Debug, PartialEq)]
pub enum Warning {
    #[error("PAGETRAILER dwCRC mismatch at 0x{offset:X}: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    PageCrcMismatch {
        offset: u64,
        stored: u32,
        computed: u32,
    },
    #[error("PAGETRAILER bid mismatch at 0x{offset:X}: expected {expected:?}, found {found:?}")]
    PageBlockIdMismatch {
        offset: u64,
        expected: BlockId,
        found: BlockId,
    },
    #[error("BLOCKTRAILER dwCRC mismatch in {block:?}: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    BlockCrcMismatch {
        block: BlockId,
        stored: u32,
        computed: u32,
    },
    #[error("BLOCKTRAILER wSig mismatch in {block:?}: stored 0x{stored:04X}, computed 0x{computed:04X}")]
    BlockSignatureMismatch {
        block: BlockId,
        stored: u16,
        computed: u16,
    },
    #[error("BLOCKTRAILER bid mismatch: expected {expected:?}, found {found:?}")]
    BlockIdMismatch { expected: BlockId, found: BlockId },
    #[error("XBLOCK lcbTotal mismatch in {block:?}: expected {expected}, read {actual}")]
    DataTreeSizeMismatch {
        block: BlockId,
        expected: u32,
        actual: usize,
    },
    #[error("Unresolvable property 0x{prop_id:04X} on node {node}: {reason}")]
    UnresolvableProperty {
        node: NodeId,
        prop_id: u16,
        reason: String,
    },
    #[error("Unreadable table {node}: {reason}")]
    UnreadableTable { node: NodeId, reason: String },
    #[error("Skipped folder {node}: {reason}")]
    FolderSkipped { node: NodeId, reason: String },
    #[error("Skipped message {node}: {reason}")]
    MessageSkipped { node: NodeId, reason: String },
    #[error("Skipped attachment {attachment} of message {message}: {reason}")]
    AttachmentSkipped {
        message: NodeId,
        attachment: NodeId,
        reason: String,
    },
    #[error("Folder {node} was reached twice; the hierarchy has a cycle")]
    FolderCycle { node: NodeId },
}

type Observer = Arc<dyn Fn(&Warning) + Send + Sync>;

/// Warning channel of one [PstFile](crate::PstFile).
#[derive(Default)]
pub struct Diagnostics {
    warnings: Mutex<Vec<Warning>>,
    observer: Mutex<Option<Observer>>,
}

impl Diagnostics {
    pub fn record(&self, warning: Warning) {
        warn!(%warning, "PST damage");

        // The observer runs unlocked so it may call back into this channel.
        let observer = self
            .observer
            .lock()
            .ok()
            .and_then(|observer| observer.clone());
        if let Some(observer) = observer {
            observer(&warning);
        }

        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(warning);
        }
    }

    /// Call `observer` with every warning recorded from now on.
    pub fn set_observer(&self, observer: impl Fn(&Warning) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.observer.lock() {
            *slot = Some(Arc::new(observer));
        }
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .map(|warnings| warnings.clone())
            .unwrap_or_default()
    }

    /// Drain the recorded warnings.
    pub fn take(&self) -> Vec<Warning> {
        self.warnings
            .lock()
            .map(|mut warnings| std::mem::take(&mut *warnings))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.warnings
            .lock()
            .map(|warnings| warnings.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("warnings", &self.len())
            .finish_non_exhaustive()
    }
}
