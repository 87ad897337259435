//! ## [Message Objects](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/1042af37-aaa4-4edc-bffd-90a1ede24188)

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    attachment::Attachment, folder::MessageRow, recipient::Recipient, store::Store, tags::*, *,
};
use crate::{
    diagnostics::Warning,
    ltp::{
        prop_context::{decode_string8, read_properties, PropertySet, PropertyValue},
        table_context::TableContext,
    },
    ndb::{
        node::Node,
        node_id::{NID_ATTACHMENT_TABLE, NID_RECIPIENT_TABLE},
    },
    PstFile,
};

/// `PidTagMessageFlags` bit set on messages the mailbox owner sent.
pub const MSGFLAG_FROMME: i32 = 0x20;

/// Best available body of a message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageBody {
    Text(String),
    Html(String),
    /// `PidTagRtfCompressed`, still compressed.
    Rtf(Vec<u8>),
    Empty,
}

impl MessageBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Plain text or HTML source. Compressed RTF has no text form here.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) | Self::Html(text) => Some(text),
            _ => None,
        }
    }
}

/// True when `message_class` names an email: `IPM.Note` or any of its sub-classes.
pub fn is_email_class(message_class: Option<&str>) -> bool {
    message_class.is_some_and(|class| class.to_ascii_uppercase().starts_with("IPM.NOTE"))
}

#[derive(Clone, Debug)]
pub struct Message {
    node: Node,
    properties: PropertySet,
    code_page: u16,
    row_class: Option<String>,
    recipients: Vec<Recipient>,
    attachment_ids: Vec<NodeId>,
}

impl Message {
    pub fn read(pst: &PstFile, store: &Store, id: NodeId) -> MessagingResult<Self> {
        let id_type = id.id_type()?;
        if !matches!(
            id_type,
            NodeIdType::NormalMessage | NodeIdType::AssociatedMessage
        ) {
            return Err(MessagingError::InvalidMessageNodeType(id_type));
        }

        let node = pst.node(id)?;
        let properties = read_properties(pst, node)?;
        let code_page = properties
            .i32(PID_TAG_INTERNET_CODEPAGE)
            .or_else(|| properties.i32(PID_TAG_MESSAGE_CODEPAGE))
            .and_then(|code_page| u16::try_from(code_page).ok())
            .filter(|&code_page| code_page != 0)
            .unwrap_or(store.code_page());

        let recipients: Vec<Recipient> =
            read_sub_table(pst, &node, NID_RECIPIENT_TABLE, |table| {
                Ok(table
                    .read_rows(None)?
                    .iter()
                    .map(|row| Recipient::from_row(row, code_page))
                    .collect())
            })?
            .unwrap_or_default();

        let attachment_ids: Vec<NodeId> =
            read_sub_table(pst, &node, NID_ATTACHMENT_TABLE, |table| {
                (0..table.row_count())
                    .map(|index| Ok(NodeId::from(table.row_id(index)?)))
                    .collect()
            })?
            .unwrap_or_default();

        debug!(
            message = %id,
            recipients = recipients.len(),
            attachments = attachment_ids.len(),
            "read message"
        );

        Ok(Self {
            node,
            properties,
            code_page,
            row_class: None,
            recipients,
            attachment_ids,
        })
    }

    /// Read the message a contents table row points at, keeping the row's message class as a
    /// fallback for a PC that lacks one.
    pub fn from_row(pst: &PstFile, store: &Store, row: &MessageRow) -> MessagingResult<Self> {
        let mut message = Self::read(pst, store, row.id())?;
        message.row_class = row.message_class().map(String::from);
        Ok(message)
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.node.parent()
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub fn code_page(&self) -> u16 {
        self.code_page
    }

    fn text(&self, prop_id: u16) -> Option<String> {
        self.properties
            .text(prop_id, self.code_page)
            .filter(|value| !value.is_empty())
    }

    pub fn message_class(&self) -> Option<String> {
        self.text(PID_TAG_MESSAGE_CLASS)
            .or_else(|| self.row_class.clone())
    }

    pub fn is_email(&self) -> bool {
        is_email_class(self.message_class().as_deref())
    }

    /// `PidTagSubject` without the `0x01, cch` prefix some clients store in front of it.
    pub fn subject(&self) -> Option<String> {
        let subject = self.properties.text(PID_TAG_SUBJECT, self.code_page)?;
        let mut chars = subject.chars();
        if chars.next() == Some('\u{1}') {
            chars.next();
            return Some(chars.collect());
        }
        Some(subject)
    }

    pub fn sender_name(&self) -> Option<String> {
        self.text(PID_TAG_SENDER_NAME)
            .or_else(|| self.text(PID_TAG_SENT_REPRESENTING_NAME))
    }

    pub fn sender_email(&self) -> Option<String> {
        [
            PID_TAG_SENDER_SMTP_ADDRESS,
            PID_TAG_SENDER_EMAIL_ADDRESS,
            PID_TAG_SENT_REPRESENTING_SMTP_ADDRESS,
            PID_TAG_SENT_REPRESENTING_EMAIL_ADDRESS,
        ]
        .into_iter()
        .find_map(|prop_id| self.text(prop_id))
    }

    pub fn display_to(&self) -> Option<String> {
        self.text(PID_TAG_DISPLAY_TO)
    }

    pub fn display_cc(&self) -> Option<String> {
        self.text(PID_TAG_DISPLAY_CC)
    }

    /// Delivery time, else client submit time, else creation time.
    pub fn delivery_time(&self) -> Option<DateTime<Utc>> {
        self.properties
            .time(PID_TAG_MESSAGE_DELIVERY_TIME)
            .or_else(|| self.properties.time(PID_TAG_CLIENT_SUBMIT_TIME))
            .or_else(|| self.properties.time(PID_TAG_CREATION_TIME))
    }

    pub fn flags(&self) -> i32 {
        self.properties.i32(PID_TAG_MESSAGE_FLAGS).unwrap_or_default()
    }

    pub fn is_from_me(&self) -> bool {
        self.flags() & MSGFLAG_FROMME != 0
    }

    pub fn message_size(&self) -> Option<i32> {
        self.properties.i32(PID_TAG_MESSAGE_SIZE)
    }

    pub fn transport_headers(&self) -> Option<String> {
        self.text(PID_TAG_TRANSPORT_MESSAGE_HEADERS)
    }

    pub fn body(&self) -> MessageBody {
        if let Some(text) = self.text(PID_TAG_BODY) {
            return MessageBody::Text(text);
        }

        let html = match self.properties.get(PID_TAG_BODY_HTML) {
            Some(PropertyValue::Binary(bytes)) => Some(decode_string8(bytes, self.code_page)),
            Some(value) => value.to_text(self.code_page),
            None => None,
        };
        if let Some(html) = html.filter(|html| !html.is_empty()) {
            return MessageBody::Html(html);
        }

        match self.properties.binary(PID_TAG_RTF_COMPRESSED) {
            Some(rtf) if !rtf.is_empty() => MessageBody::Rtf(rtf.to_vec()),
            _ => MessageBody::Empty,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Attachment sub-node ids in attachment table order.
    pub fn attachment_ids(&self) -> &[NodeId] {
        &self.attachment_ids
    }

    pub fn attachment(&self, pst: &PstFile, id: NodeId) -> MessagingResult<Attachment> {
        let index = self
            .attachment_ids
            .iter()
            .position(|&attachment| attachment == id)
            .ok_or(MessagingError::AttachmentNotFound(id))?;
        Attachment::read(pst, &self.node, id, index, self.code_page)
    }
}

/// Open a table stored in a sub-node of `node`. A message without that sub-node has an empty
/// table; a table that cannot be decoded is reported and also reads as empty.
fn read_sub_table<T>(
    pst: &PstFile,
    node: &Node,
    table: NodeId,
    read: impl FnOnce(&TableContext<'_>) -> MessagingResult<T>,
) -> MessagingResult<Option<T>> {
    let result = node
        .find_sub_node(pst, table)
        .map_err(MessagingError::from)
        .and_then(|sub_node| Ok(TableContext::open(pst, sub_node)?))
        .and_then(|context| read(&context));

    match result {
        Ok(value) => Ok(Some(value)),
        Err(MessagingError::NodeDatabaseError(NdbError::SubNodeNotFound(_))) => Ok(None),
        Err(err) if !err.category().is_fatal() => {
            pst.diagnostics().record(Warning::UnreadableTable {
                node: table,
                reason: format!("message {}: {err}", node.id()),
            });
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
