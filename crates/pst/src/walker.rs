//! Lazy depth-first walk over every message below the root folder.

use chrono::{DateTime, Utc};
use std::{collections::HashSet, fmt::Debug, sync::Arc};
use tracing::{debug, error};

use crate::{
    diagnostics::Warning,
    messaging::{
        attachment::{read_attachment_data, Attachment},
        folder::{Folder, MessageRow},
        message::{is_email_class, Message, MessageBody},
        recipient::RecipientType,
        store::Store,
        MessagingError, MessagingResult,
    },
    ndb::{
        node::Node,
        node_id::{NodeId, NID_ROOT_FOLDER},
    },
    PstFile,
};

/// Folder names, compared case-insensitively, whose messages count as sent mail.
const SENT_FOLDER_NAMES: [&str; 4] = ["sent items", "sent", "보낸 편지함", "outbox"];

#[derive(Clone, Debug)]
pub struct WalkOptions {
    limit: Option<usize>,
    emails_only: bool,
    include_search_folders: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            limit: None,
            emails_only: true,
            include_search_folders: false,
        }
    }
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after this many messages have been yielded.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Only yield messages whose class is `IPM.Note` or a sub-class of it.
    pub fn emails_only(mut self, emails_only: bool) -> Self {
        self.emails_only = emails_only;
        self
    }

    /// Also yield the contents of search folders. Their rows point at messages that live in
    /// other folders, so those messages are yielded twice.
    pub fn include_search_folders(mut self, include: bool) -> Self {
        self.include_search_folders = include;
        self
    }

    pub fn max_messages(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_emails_only(&self) -> bool {
        self.emails_only
    }

    pub fn walks_search_folders(&self) -> bool {
        self.include_search_folders
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

/// Attachment metadata with a handle to load its payload later.
#[derive(Clone)]
pub struct AttachmentBlob {
    pst: Arc<PstFile>,
    node: Node,
    filename: String,
    size: Option<u64>,
    mime_type: Option<String>,
    content_id: Option<String>,
    is_inline: bool,
}

impl AttachmentBlob {
    fn new(pst: Arc<PstFile>, attachment: &Attachment) -> Self {
        Self {
            pst,
            node: *attachment.node(),
            filename: attachment.filename(),
            size: attachment.size(),
            mime_type: attachment.mime_type(),
            content_id: attachment.content_id(),
            is_inline: attachment.is_inline(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn content_id(&self) -> Option<&str> {
        self.content_id.as_deref()
    }

    pub fn is_inline(&self) -> bool {
        self.is_inline
    }

    /// Read the payload from the file.
    pub fn load(&self) -> MessagingResult<Vec<u8>> {
        read_attachment_data(&self.pst, &self.node)
    }
}

impl Debug for AttachmentBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentBlob")
            .field("node", &self.node.id())
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("is_inline", &self.is_inline)
            .finish_non_exhaustive()
    }
}

/// One email as handed to whoever stores it.
#[derive(Clone, Debug)]
pub struct EmailRecord {
    identifier: NodeId,
    subject: String,
    sender: String,
    sender_email: Option<String>,
    delivery_time: Option<DateTime<Utc>>,
    message_class: String,
    folder_path: String,
    to: String,
    cc: String,
    body: MessageBody,
    direction: Direction,
    message_size: Option<i32>,
    attachments: Vec<AttachmentBlob>,
}

impl EmailRecord {
    pub fn identifier(&self) -> NodeId {
        self.identifier
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn sender_email(&self) -> Option<&str> {
        self.sender_email.as_deref()
    }

    pub fn delivery_time(&self) -> Option<DateTime<Utc>> {
        self.delivery_time
    }

    pub fn message_class(&self) -> &str {
        &self.message_class
    }

    /// Display names of the folders below the root, joined with `/`.
    pub fn folder_path(&self) -> &str {
        &self.folder_path
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn cc(&self) -> &str {
        &self.cc
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn message_size(&self) -> Option<i32> {
        self.message_size
    }

    pub fn attachments(&self) -> &[AttachmentBlob] {
        &self.attachments
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkippedItem {
    pub node_id: NodeId,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalkSummary {
    pub yielded: usize,
    pub skipped_messages: usize,
    pub skipped_folders: usize,
    pub skipped: Vec<SkippedItem>,
}

struct PendingFolder {
    id: NodeId,
    path: Vec<String>,
}

struct FolderCursor {
    path: Vec<String>,
    is_sent_folder: bool,
    rows: std::vec::IntoIter<MessageRow>,
}

/// Yields one [EmailRecord] per call to `next`, reading only what that record needs.
///
/// Folders are visited depth-first: a folder's messages come before any of its sub-folders.
/// Damage local to one folder, message or attachment is recorded in the file's
/// [Diagnostics](crate::diagnostics::Diagnostics) and in [TreeWalker::summary], and the walk
/// moves on. A fatal error is yielded once and ends the walk.
pub struct TreeWalker {
    pst: Arc<PstFile>,
    options: WalkOptions,
    store: Option<Store>,
    pending: Vec<PendingFolder>,
    current: Option<FolderCursor>,
    visited: HashSet<NodeId>,
    summary: WalkSummary,
    finished: bool,
}

impl TreeWalker {
    pub fn new(pst: Arc<PstFile>, options: WalkOptions) -> Self {
        Self {
            pst,
            options,
            store: None,
            pending: Vec::new(),
            current: None,
            visited: HashSet::new(),
            summary: WalkSummary::default(),
            finished: false,
        }
    }

    pub fn summary(&self) -> &WalkSummary {
        &self.summary
    }

    fn limit_reached(&self) -> bool {
        self.options
            .limit
            .is_some_and(|limit| self.summary.yielded >= limit)
    }

    fn advance(&mut self) -> MessagingResult<Option<EmailRecord>> {
        if self.store.is_none() {
            self.store = Some(Store::read(&self.pst)?);
            self.pending.push(PendingFolder {
                id: NID_ROOT_FOLDER,
                path: Vec::new(),
            });
        }

        loop {
            match self.current.as_mut().map(|cursor| cursor.rows.next()) {
                Some(Some(row)) => {
                    if let Some(record) = self.read_message(&row)? {
                        return Ok(Some(record));
                    }
                }
                Some(None) => self.current = None,
                None => {
                    let Some(folder) = self.pending.pop() else {
                        return Ok(None);
                    };
                    self.enter_folder(folder)?;
                }
            }
        }
    }

    fn enter_folder(&mut self, pending: PendingFolder) -> MessagingResult<()> {
        let id = pending.id;
        if !self.visited.insert(id) {
            self.pst
                .diagnostics()
                .record(Warning::FolderCycle { node: id });
            self.skip_folder(id, String::from("folder hierarchy cycle"));
            return Ok(());
        }

        let Some(store) = self.store.as_ref() else {
            return Ok(());
        };
        let folder = match Folder::read(&self.pst, store, id) {
            Ok(folder) => folder,
            Err(err) => return self.folder_failed(id, err),
        };

        // the root folder has no name of its own
        let mut path = pending.path;
        if id != NID_ROOT_FOLDER {
            path.push(folder.display_name());
        }
        debug!(folder = %id, path = %path.join("/"), "entering folder");

        for &child in folder.sub_folders().iter().rev() {
            self.pending.push(PendingFolder {
                id: child,
                path: path.clone(),
            });
        }

        if folder.is_search_folder() && !self.options.include_search_folders {
            return Ok(());
        }

        let rows = match folder.contents(&self.pst) {
            Ok(rows) => rows,
            Err(err) => return self.folder_failed(id, err),
        };
        let is_sent_folder = path.last().is_some_and(|name| {
            let name = name.to_lowercase();
            SENT_FOLDER_NAMES.contains(&name.as_str())
        });
        self.current = Some(FolderCursor {
            path,
            is_sent_folder,
            rows: rows.into_iter(),
        });
        Ok(())
    }

    fn folder_failed(&mut self, id: NodeId, err: MessagingError) -> MessagingResult<()> {
        if err.category().is_fatal() {
            return Err(err);
        }
        let reason = err.to_string();
        self.pst.diagnostics().record(Warning::FolderSkipped {
            node: id,
            reason: reason.clone(),
        });
        self.skip_folder(id, reason);
        Ok(())
    }

    fn skip_folder(&mut self, node_id: NodeId, reason: String) {
        self.summary.skipped_folders += 1;
        self.summary.skipped.push(SkippedItem { node_id, reason });
    }

    fn read_message(&mut self, row: &MessageRow) -> MessagingResult<Option<EmailRecord>> {
        // the contents row already names the class, so other items are never opened
        if self.options.emails_only
            && row.message_class().is_some()
            && !is_email_class(row.message_class())
        {
            return Ok(None);
        }

        let Some(store) = self.store.as_ref() else {
            return Ok(None);
        };

        let message = match Message::from_row(&self.pst, store, row) {
            Ok(message) => message,
            Err(err) if !err.category().is_fatal() => {
                let reason = err.to_string();
                self.pst.diagnostics().record(Warning::MessageSkipped {
                    node: row.id(),
                    reason: reason.clone(),
                });
                self.summary.skipped_messages += 1;
                self.summary.skipped.push(SkippedItem {
                    node_id: row.id(),
                    reason,
                });
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if self.options.emails_only && !message.is_email() {
            return Ok(None);
        }

        let record = self.build_record(&message)?;
        Ok(Some(record))
    }

    fn build_record(&mut self, message: &Message) -> MessagingResult<EmailRecord> {
        let mut attachments = Vec::with_capacity(message.attachment_ids().len());
        for &id in message.attachment_ids() {
            match message.attachment(&self.pst, id) {
                Ok(attachment) => {
                    attachments.push(AttachmentBlob::new(self.pst.clone(), &attachment));
                }
                Err(err) if !err.category().is_fatal() => {
                    let reason = err.to_string();
                    self.pst.diagnostics().record(Warning::AttachmentSkipped {
                        message: message.id(),
                        attachment: id,
                        reason: reason.clone(),
                    });
                    self.summary.skipped.push(SkippedItem { node_id: id, reason });
                }
                Err(err) => return Err(err),
            }
        }

        let recipients = |recipient_type: RecipientType| {
            message
                .recipients()
                .iter()
                .filter(|recipient| recipient.recipient_type() == recipient_type)
                .map(|recipient| recipient.display_name())
                .collect::<Vec<_>>()
                .join("; ")
        };

        let (folder_path, is_sent_folder) = self
            .current
            .as_ref()
            .map(|cursor| (cursor.path.join("/"), cursor.is_sent_folder))
            .unwrap_or_default();
        let direction = if is_sent_folder || message.is_from_me() {
            Direction::Sent
        } else {
            Direction::Received
        };

        Ok(EmailRecord {
            identifier: message.id(),
            subject: message.subject().unwrap_or_default(),
            sender: message.sender_name().unwrap_or_default(),
            sender_email: message.sender_email(),
            delivery_time: message.delivery_time(),
            message_class: message.message_class().unwrap_or_default(),
            folder_path,
            to: message
                .display_to()
                .unwrap_or_else(|| recipients(RecipientType::To)),
            cc: message
                .display_cc()
                .unwrap_or_else(|| recipients(RecipientType::Cc)),
            body: message.body(),
            direction,
            message_size: message.message_size(),
            attachments,
        })
    }
}

impl Iterator for TreeWalker {
    type Item = MessagingResult<EmailRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.limit_reached() {
            self.finished = true;
            return None;
        }

        match self.advance() {
            Ok(Some(record)) => {
                self.summary.yielded += 1;
                Some(Ok(record))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                error!(error = %err, yielded = self.summary.yielded, "PST walk aborted");
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
