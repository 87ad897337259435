//! ## [Attachment Objects](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/46eb4828-c6a5-420d-a137-9ee36df317c1)

use tracing::debug;

use super::{tags::*, *};
use crate::{
    ltp::prop_context::{PropertyContext, PropertySet, PropertyValue},
    ndb::node::Node,
    PstFile,
};

/// `PidTagAttachFlags`: `attRenderedInBody`
const ATT_RENDERED_IN_BODY: i32 = 0x0000_0004;

/// `PidTagAttachFlags`: MHTML reference
const ATT_MHTML_REF: i32 = 0x0000_2000;

/// `PidTagAttachMethod`
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentMethod {
    /// `afNone`
    None = 0,
    /// `afByValue`: payload in `PidTagAttachDataBinary`
    ByValue = 1,
    /// `afByReference`
    ByReference = 2,
    /// `afByReferenceOnly`
    ByReferenceOnly = 4,
    /// `afEmbeddedMessage`: payload is a message object in `PidTagAttachDataObject`
    EmbeddedMessage = 5,
    /// `afStorage`: payload is an OLE storage in `PidTagAttachDataObject`
    Storage = 6,
    /// `afByWebReference`
    ByWebReference = 7,
}

impl TryFrom<i32> for AttachmentMethod {
    type Error = MessagingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::ByValue),
            2 => Ok(Self::ByReference),
            4 => Ok(Self::ByReferenceOnly),
            5 => Ok(Self::EmbeddedMessage),
            6 => Ok(Self::Storage),
            7 => Ok(Self::ByWebReference),
            _ => Err(MessagingError::InvalidAttachmentMethod(value)),
        }
    }
}

/// Outlook's names for pictures it pulls out of an HTML body, e.g. `image001.png`.
pub fn is_auto_generated_image(filename: &str) -> bool {
    const EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "wmf", "emf"];

    let filename = filename.to_ascii_lowercase();
    let Some(rest) = filename.strip_prefix("image") else {
        return false;
    };
    let Some((digits, extension)) = rest.split_once('.') else {
        return false;
    };
    digits.len() == 3
        && digits.bytes().all(|b| b.is_ascii_digit())
        && EXTENSIONS.contains(&extension)
}

/// Attachment metadata. The payload stays on disk until [read_attachment_data] is called.
#[derive(Clone, Debug)]
pub struct Attachment {
    node: Node,
    message: NodeId,
    index: usize,
    properties: PropertySet,
    code_page: u16,
    size: Option<u64>,
}

impl Attachment {
    /// Read the attachment sub-node `id` of `message`. `index` is the attachment's position in
    /// the attachment table and only names attachments that carry no filename.
    pub fn read(
        pst: &PstFile,
        message: &Node,
        id: NodeId,
        index: usize,
        code_page: u16,
    ) -> MessagingResult<Self> {
        let id_type = id.id_type()?;
        if id_type != NodeIdType::Attachment {
            return Err(MessagingError::InvalidAttachmentNodeType(id_type));
        }

        let node = message.find_sub_node(pst, id)?;
        let context = PropertyContext::open(pst, node)?;
        let metadata: Vec<u16> = context
            .records()
            .iter()
            .map(|record| record.prop_id())
            .filter(|&prop_id| prop_id != PID_TAG_ATTACH_DATA)
            .collect();
        let properties = context.read(Some(&metadata))?;

        let size = match properties
            .i32(PID_TAG_ATTACH_SIZE)
            .and_then(|size| u64::try_from(size).ok())
        {
            Some(size) => Some(size),
            None => context.value_size(PID_TAG_ATTACH_DATA)?,
        };

        debug!(message = %message.id(), attachment = %id, ?size, "read attachment");
        Ok(Self {
            node,
            message: message.id(),
            index,
            properties,
            code_page,
            size,
        })
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The message this attachment belongs to.
    pub fn message(&self) -> NodeId {
        self.message
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    fn text(&self, prop_id: u16) -> Option<String> {
        self.properties
            .text(prop_id, self.code_page)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Long filename, short filename, display name, then `attach_{index}` with the
    /// attachment's extension when it has one.
    pub fn filename(&self) -> String {
        [
            PID_TAG_ATTACH_LONG_FILENAME,
            PID_TAG_ATTACH_FILENAME,
            PID_TAG_DISPLAY_NAME,
        ]
        .into_iter()
        .find_map(|prop_id| self.text(prop_id))
        .unwrap_or_else(|| match self.text(PID_TAG_ATTACH_EXTENSION) {
            Some(extension) if extension.starts_with('.') => {
                format!("attach_{}{extension}", self.index)
            }
            Some(extension) => format!("attach_{}.{extension}", self.index),
            None => format!("attach_{}", self.index),
        })
    }

    /// `PidTagAttachSize`, else the size of the stored payload.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn mime_type(&self) -> Option<String> {
        self.text(PID_TAG_ATTACH_MIME_TAG)
    }

    pub fn content_id(&self) -> Option<String> {
        self.text(PID_TAG_ATTACH_CONTENT_ID)
    }

    pub fn method(&self) -> MessagingResult<AttachmentMethod> {
        self.properties
            .i32(PID_TAG_ATTACH_METHOD)
            .map_or(Ok(AttachmentMethod::None), AttachmentMethod::try_from)
    }

    pub fn flags(&self) -> i32 {
        self.properties.i32(PID_TAG_ATTACH_FLAGS).unwrap_or_default()
    }

    pub fn is_hidden(&self) -> bool {
        self.properties
            .bool(PID_TAG_ATTACHMENT_HIDDEN)
            .unwrap_or_default()
    }

    pub fn rendering_position(&self) -> Option<i32> {
        self.properties.i32(PID_TAG_RENDERING_POSITION)
    }

    /// Rendered in the body rather than listed as a file.
    pub fn is_inline(&self) -> bool {
        self.flags() & (ATT_RENDERED_IN_BODY | ATT_MHTML_REF) != 0
            || self.is_hidden()
            || (self.content_id().is_some() && is_auto_generated_image(&self.filename()))
    }
}

/// Resolve `PidTagAttachDataBinary` or `PidTagAttachDataObject` of the attachment `node`.
pub fn read_attachment_data(pst: &PstFile, node: &Node) -> MessagingResult<Vec<u8>> {
    let context = PropertyContext::open(pst, *node)?;
    match context.get(PID_TAG_ATTACH_DATA)? {
        Some(PropertyValue::Binary(data)) => Ok(data),
        Some(PropertyValue::Object(object)) => {
            Ok(node.find_sub_node(pst, object.node())?.read_data(pst)?)
        }
        Some(value) => Err(MessagingError::InvalidAttachmentData(value.prop_type())),
        None => Err(MessagingError::AttachmentDataNotFound(node.id())),
    }
}
