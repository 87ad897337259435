//! ## [Messaging Layer](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/3f1bc553-d15d-4dcf-9b80-fbf1dd6c7e79)

use thiserror::Error;

use crate::{
    ltp::{prop_type::PropertyType, LtpError},
    ndb::{
        node_id::{NodeId, NodeIdType},
        NdbError,
    },
    ErrorCategory,
};

pub mod attachment;
pub mod folder;
pub mod message;
pub mod recipient;
pub mod store;
pub mod tags;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Node Database error: {0}")]
    NodeDatabaseError(#[from] NdbError),
    #[error("Lists, Tables, and Properties error: {0}")]
    ListsTablesPropertiesError(#[from] LtpError),
    #[error("Invalid folder NID_TYPE: {0:?}")]
    InvalidFolderNodeType(NodeIdType),
    #[error("Invalid message NID_TYPE: {0:?}")]
    InvalidMessageNodeType(NodeIdType),
    #[error("Invalid attachment NID_TYPE: {0:?}")]
    InvalidAttachmentNodeType(NodeIdType),
    #[error("Attachment {0} is not listed in the attachment table")]
    AttachmentNotFound(NodeId),
    #[error("Missing PidTagAttachDataBinary on attachment {0}")]
    AttachmentDataNotFound(NodeId),
    #[error("Invalid PidTagAttachDataBinary on attachment: {0:?}")]
    InvalidAttachmentData(PropertyType),
    #[error("Invalid PidTagAttachMethod: 0x{0:08X}")]
    InvalidAttachmentMethod(i32),
}

impl MessagingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NodeDatabaseError(err) => err.category(),
            Self::ListsTablesPropertiesError(err) => err.category(),
            Self::AttachmentNotFound(_) | Self::AttachmentDataNotFound(_) => {
                ErrorCategory::NotFound
            }
            _ => ErrorCategory::Damaged,
        }
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
