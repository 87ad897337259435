//! In-memory PST images for tests.
//!
//! [PstBuilder] lays out a small mailbox the way Outlook writes one: data blocks first, then the
//! BBT and NBT pages, then the HEADER with both CRCs. [FixtureOptions] switches on the damaged
//! and edge-case shapes the readers have to cope with.

use std::{io::Cursor, sync::Arc};

use crate::{
    block_sig::compute_sig,
    crc::compute_crc,
    encode,
    ltp::{
        heap::{heap_block, HeapNodeType},
        prop_type::PropertyType,
        tree::tree_header,
    },
    messaging::tags::*,
    ndb::{
        block::block_size,
        block_id::BlockId,
        header::*,
        node_id::*,
        page::{PageType, PAGE_SIZE},
    },
    PstFile, PstOpenOptions,
};

pub(crate) const STORE_NAME: &str = "Personal Folders";
const TOP_FOLDER_NAME: &str = "Top of Personal Folders";

/// First byte after the HEADER, the AMap and the other fixed-position pages.
const BLOCK_START: u64 = 0x4400;

/// Largest data payload of one block in either format.
const MAX_DATA_SIZE: usize = 8176;

/// Row matrices up to this size stay on the heap; larger ones move to a sub-node.
const HEAP_MATRIX_LIMIT: usize = 1024;

const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

const MSGFLAG_READ: i32 = 0x01;
const MSGFLAG_FROMME: i32 = 0x20;

#[derive(Clone, Debug)]
pub(crate) struct FixtureOptions {
    pub version: NdbVersion,
    pub crypt_method: NdbCryptMethod,
    /// Emails in the Inbox, besides the contact that always follows them.
    pub message_count: usize,
    /// Store the body of the first email in a multi-block sub-node.
    pub large_body: bool,
    /// With `large_body`, leave one leaf of the body's XBLOCK out of the BBT.
    pub truncated_body: bool,
    /// With `large_body`, cut the body's XBLOCK down to its first three bytes.
    pub short_body_block: bool,
    /// With `large_body`, cut the SLBLOCK of the message holding the body down to its first
    /// three bytes.
    pub short_sub_node_block: bool,
    /// Give the first email three attachments.
    pub attachments: bool,
    /// List a fourth attachment that has no sub-node.
    pub broken_attachment: bool,
    /// List the Inbox again under its own sub-folder.
    pub folder_cycle: bool,
    /// Add an Inbox contents row for a message missing from the NBT.
    pub missing_message: bool,
    /// Add an Inbox contents row for an `IPM.Contact` missing from the NBT.
    pub missing_contact: bool,
    /// `PidTagMessageCodepage` of the store.
    pub code_page: Option<u16>,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        Self {
            version: NdbVersion::Unicode,
            crypt_method: NdbCryptMethod::None,
            message_count: 3,
            large_body: false,
            truncated_body: false,
            short_body_block: false,
            short_sub_node_block: false,
            attachments: false,
            broken_attachment: false,
            folder_cycle: false,
            missing_message: false,
            missing_contact: false,
            code_page: None,
        }
    }
}

/// Expected values of the Inbox email at `index`.
#[derive(Clone, Debug)]
pub(crate) struct SampleMessage {
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub size: i32,
    pub rtf: Vec<u8>,
    pub body: String,
    /// Seconds since the Unix epoch.
    pub delivery_time: i64,
}

impl SampleMessage {
    /// Body long enough to need a data tree in either format.
    pub fn large_body(&self) -> String {
        (0..600)
            .map(|line| format!("{} line {line:03}: the quick brown fox\r\n", self.subject))
            .collect()
    }
}

pub(crate) fn sample_message(index: usize) -> SampleMessage {
    let subject = if index == 1 {
        String::from("RE: Message 1")
    } else {
        format!("Message {index}")
    };

    // LZFu header in front of a tiny RTF document
    let mut rtf = vec![0x2D, 0x00, 0x00, 0x00, 0x2B, 0x00, 0x00, 0x00];
    rtf.extend_from_slice(b"LZFu");
    rtf.extend_from_slice(format!("{{\\rtf1\\ansi message {index}}}").as_bytes());

    SampleMessage {
        subject,
        sender_name: format!("Sender {index}"),
        sender_email: format!("sender{index}@example.com"),
        size: 1000 + index as i32,
        rtf,
        body: format!("Body of message {index}"),
        delivery_time: 1_700_000_000 + index as i64 * 3600,
    }
}

pub(crate) fn report_payload() -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.extend(0..=255_u8);
    data
}

/// Too large for the attachment's heap, so it lives in a sub-node data tree.
pub(crate) fn large_attachment_payload() -> Vec<u8> {
    (0..10_000_u32).map(|value| (value * 7 % 251) as u8).collect()
}

fn image_payload() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0; 24]);
    data
}

fn nid(id_type: NodeIdType, index: u32) -> NodeId {
    NodeId::new(id_type, index).unwrap()
}

pub(crate) fn ipm_sub_tree_id() -> NodeId {
    nid(NodeIdType::NormalFolder, 0x20)
}

pub(crate) fn inbox_id() -> NodeId {
    nid(NodeIdType::NormalFolder, 0x21)
}

pub(crate) fn sent_items_id() -> NodeId {
    nid(NodeIdType::NormalFolder, 0x22)
}

pub(crate) fn archive_id() -> NodeId {
    nid(NodeIdType::NormalFolder, 0x23)
}

pub(crate) fn search_folder_id() -> NodeId {
    nid(NodeIdType::SearchFolder, 0x24)
}

pub(crate) fn first_message_id() -> NodeId {
    email_id(0)
}

fn email_id(index: usize) -> NodeId {
    nid(NodeIdType::NormalMessage, 0x100 + index as u32)
}

fn contact_id() -> NodeId {
    nid(NodeIdType::NormalMessage, 0x80)
}

fn archived_message_id() -> NodeId {
    nid(NodeIdType::NormalMessage, 0x81)
}

fn sent_message_id() -> NodeId {
    nid(NodeIdType::NormalMessage, 0x82)
}

fn missing_message_id() -> NodeId {
    nid(NodeIdType::NormalMessage, 0x83)
}

fn missing_contact_id() -> NodeId {
    nid(NodeIdType::NormalMessage, 0x84)
}

fn attachment_id(index: u32) -> NodeId {
    nid(NodeIdType::Attachment, index)
}

pub(crate) fn open_bytes(bytes: Vec<u8>) -> Arc<PstFile> {
    Arc::new(PstFile::from_reader(Cursor::new(bytes), PstOpenOptions::default()).unwrap())
}

fn record_key() -> Vec<u8> {
    (0..16).collect()
}

/// A property value as the fixture stores it.
#[derive(Clone, Debug)]
enum Value {
    Integer32(i32),
    Boolean(bool),
    /// Seconds since the Unix epoch, stored as a FILETIME.
    Time(i64),
    Text(String),
    Binary(Vec<u8>),
    /// Text kept in a sub-node instead of the heap.
    LargeText(String),
    /// Binary kept in a sub-node instead of the heap.
    LargeBinary(Vec<u8>),
}

impl Value {
    fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    fn prop_type(&self, version: NdbVersion) -> PropertyType {
        match self {
            Self::Integer32(_) => PropertyType::Integer32,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Time(_) => PropertyType::Time,
            Self::Text(_) | Self::LargeText(_) => match version {
                NdbVersion::Ansi => PropertyType::String8,
                NdbVersion::Unicode => PropertyType::Unicode,
            },
            Self::Binary(_) | Self::LargeBinary(_) => PropertyType::Binary,
        }
    }

    fn is_large(&self) -> bool {
        matches!(self, Self::LargeText(_) | Self::LargeBinary(_))
    }

    /// Value stored directly in `dwValueHnid`.
    fn inline(&self) -> Option<u32> {
        match self {
            Self::Integer32(value) => Some(*value as u32),
            Self::Boolean(value) => Some(u32::from(*value)),
            _ => None,
        }
    }

    fn data(&self, version: NdbVersion) -> Vec<u8> {
        match self {
            Self::Integer32(value) => value.to_le_bytes().to_vec(),
            Self::Boolean(value) => vec![u8::from(*value)],
            Self::Time(value) => (value * 10_000_000 + FILETIME_UNIX_EPOCH)
                .to_le_bytes()
                .to_vec(),
            Self::Text(value) | Self::LargeText(value) => match version {
                NdbVersion::Ansi => value.chars().map(|ch| ch as u8).collect(),
                NdbVersion::Unicode => value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            },
            Self::Binary(value) | Self::LargeBinary(value) => value.clone(),
        }
    }
}

/// `HID` of the allocation at `index` in the first heap block.
fn heap_id(index: usize) -> u32 {
    ((index + 1) << 5) as u32
}

/// The blocks and sub-nodes behind one node, before BIDs are assigned.
#[derive(Default)]
struct NodeImage {
    blocks: Vec<Vec<u8>>,
    sub_nodes: Vec<(NodeId, NodeImage)>,
    /// The message body tracked by [PstBuilder::large_body].
    large_body: bool,
}

impl NodeImage {
    fn from_data(data: &[u8]) -> Self {
        Self {
            blocks: data.chunks(MAX_DATA_SIZE).map(<[u8]>::to_vec).collect(),
            ..Default::default()
        }
    }
}

fn property_context(version: NdbVersion, mut properties: Vec<(u16, Value)>) -> NodeImage {
    properties.sort_by_key(|(prop_id, _)| *prop_id);

    let mut records = Vec::new();
    let mut values = Vec::new();
    let mut sub_nodes = Vec::new();
    for (prop_id, value) in properties {
        let hnid = match value.inline() {
            Some(hnid) => hnid,
            None if value.is_large() => {
                let node = nid(NodeIdType::ListsTablesProperties, sub_nodes.len() as u32 + 1);
                let mut image = NodeImage::from_data(&value.data(version));
                image.large_body = matches!(value, Value::LargeText(_));
                sub_nodes.push((node, image));
                u32::from(node)
            }
            None => {
                let data = value.data(version);
                if data.is_empty() {
                    0
                } else {
                    values.push(data);
                    // BTH header and records come first
                    heap_id(values.len() + 1)
                }
            }
        };

        records.extend_from_slice(&prop_id.to_le_bytes());
        records.extend_from_slice(&u16::from(value.prop_type(version)).to_le_bytes());
        records.extend_from_slice(&hnid.to_le_bytes());
    }

    let root = if records.is_empty() { 0 } else { heap_id(1) };
    let header = tree_header(2, 6, 0, root);
    let mut allocations = vec![header.as_slice(), records.as_slice()];
    allocations.extend(values.iter().map(Vec::as_slice));

    NodeImage {
        blocks: vec![heap_block(HeapNodeType::Properties, &allocations)],
        sub_nodes,
        large_body: false,
    }
}

struct ColumnLayout {
    prop_id: u16,
    prop_type: PropertyType,
    offset: usize,
    size: usize,
}

fn table_context(
    version: NdbVersion,
    columns: &[(u16, PropertyType)],
    rows: Vec<(u32, Vec<(u16, Value)>)>,
) -> NodeImage {
    let mut all_columns = vec![
        (PID_TAG_LTP_ROW_ID, PropertyType::Integer32),
        (PID_TAG_LTP_ROW_VERSION, PropertyType::Integer32),
    ];
    all_columns.extend_from_slice(columns);

    let cell_size = |prop_type: PropertyType| match prop_type.fixed_size() {
        Some(size) if size <= 8 => size,
        _ => 4,
    };

    // 4/8-byte cells, then 2-byte, then 1-byte, then the existence bitmap
    let mut layout = Vec::new();
    let mut group_ends = [0_u16; 4];
    let mut offset = 0;
    for (group, sizes) in [4..=8, 2..=2, 1..=1].into_iter().enumerate() {
        for &(prop_id, prop_type) in &all_columns {
            let size = cell_size(prop_type);
            if sizes.contains(&size) {
                layout.push(ColumnLayout {
                    prop_id,
                    prop_type,
                    offset,
                    size,
                });
                offset += size;
            }
        }
        group_ends[group] = offset as u16;
    }
    let bitmap_offset = offset;
    group_ends[3] = (offset + layout.len().div_ceil(8)) as u16;
    let row_size = usize::from(group_ends[3]);

    let matrix_size = rows.len() * row_size;
    let in_heap = matrix_size <= HEAP_MATRIX_LIMIT;
    let value_base = 2 + usize::from(!rows.is_empty()) * (1 + usize::from(in_heap));

    let mut values = Vec::new();
    let mut matrix = Vec::with_capacity(matrix_size);
    for (row_id, cells) in &rows {
        let mut row = vec![0; row_size];
        for (bit, column) in layout.iter().enumerate() {
            let value = match column.prop_id {
                PID_TAG_LTP_ROW_ID => Value::Integer32(*row_id as i32),
                PID_TAG_LTP_ROW_VERSION => Value::Integer32(0),
                prop_id => match cells.iter().find(|(id, _)| *id == prop_id) {
                    Some((_, value)) => value.clone(),
                    None => continue,
                },
            };

            let cell = if column.prop_type.fixed_size().is_some_and(|size| size <= 8) {
                value.data(version)
            } else {
                let data = value.data(version);
                let hnid = if data.is_empty() {
                    0
                } else {
                    values.push(data);
                    heap_id(value_base + values.len() - 1)
                };
                hnid.to_le_bytes().to_vec()
            };

            row[column.offset..column.offset + cell.len()].copy_from_slice(&cell);
            row[bitmap_offset + bit / 8] |= 1 << (7 - bit % 8);
        }
        matrix.extend_from_slice(&row);
    }

    let mut row_index: Vec<_> = rows
        .iter()
        .enumerate()
        .map(|(index, (row_id, _))| (*row_id, index))
        .collect();
    row_index.sort_by_key(|(row_id, _)| *row_id);
    let mut index_records = Vec::new();
    for (row_id, index) in row_index {
        index_records.extend_from_slice(&row_id.to_le_bytes());
        match version {
            NdbVersion::Ansi => index_records.extend_from_slice(&(index as u16).to_le_bytes()),
            NdbVersion::Unicode => index_records.extend_from_slice(&(index as u32).to_le_bytes()),
        }
    }

    let mut sub_nodes = Vec::new();
    let rows_hnid = if rows.is_empty() {
        0
    } else if in_heap {
        heap_id(3)
    } else {
        // rows never span blocks
        let rows_per_block = MAX_DATA_SIZE / row_size;
        let node = nid(NodeIdType::ListsTablesProperties, 1);
        sub_nodes.push((
            node,
            NodeImage {
                blocks: matrix
                    .chunks(rows_per_block * row_size)
                    .map(<[u8]>::to_vec)
                    .collect(),
                ..Default::default()
            },
        ));
        u32::from(node)
    };

    let mut info = vec![HeapNodeType::Table as u8, layout.len() as u8];
    for end in group_ends {
        info.extend_from_slice(&end.to_le_bytes());
    }
    info.extend_from_slice(&heap_id(1).to_le_bytes());
    info.extend_from_slice(&rows_hnid.to_le_bytes());
    info.extend_from_slice(&0_u32.to_le_bytes());
    for (bit, column) in layout.iter().enumerate() {
        let tag = (u32::from(column.prop_id) << 16) | u32::from(u16::from(column.prop_type));
        info.extend_from_slice(&tag.to_le_bytes());
        info.extend_from_slice(&(column.offset as u16).to_le_bytes());
        info.push(column.size as u8);
        info.push(bit as u8);
    }

    let data_size = match version {
        NdbVersion::Ansi => 2,
        NdbVersion::Unicode => 4,
    };
    let root = if rows.is_empty() { 0 } else { heap_id(2) };
    let header = tree_header(4, data_size, 0, root);

    let mut allocations = vec![info.as_slice(), header.as_slice()];
    if !rows.is_empty() {
        allocations.push(index_records.as_slice());
        if in_heap {
            allocations.push(matrix.as_slice());
        }
    }
    allocations.extend(values.iter().map(Vec::as_slice));

    NodeImage {
        blocks: vec![heap_block(HeapNodeType::Table, &allocations)],
        sub_nodes,
        large_body: false,
    }
}

/// A row of a folder's contents table.
#[derive(Clone)]
struct ContentsRow {
    id: NodeId,
    class: &'static str,
    subject: String,
    delivery_time: Option<i64>,
    flags: i32,
    has_attachments: bool,
}

struct FolderLayout {
    id: NodeId,
    parent: NodeId,
    name: &'static str,
    children: Vec<NodeId>,
    contents: Vec<ContentsRow>,
    content_count: usize,
}

impl FolderLayout {
    fn new(id: NodeId, parent: NodeId, name: &'static str, children: Vec<NodeId>) -> Self {
        Self {
            id,
            parent,
            name,
            children,
            contents: Vec::new(),
            content_count: 0,
        }
    }

    fn with_contents(mut self, contents: Vec<ContentsRow>) -> Self {
        self.content_count = contents.len();
        self.contents = contents;
        self
    }

    fn is_search_folder(&self) -> bool {
        matches!(self.id.id_type(), Ok(NodeIdType::SearchFolder))
    }
}

/// One NBT node of the mailbox.
struct MailboxNode {
    id: NodeId,
    parent: Option<NodeId>,
    image: NodeImage,
}

struct Mailbox<'a> {
    options: &'a FixtureOptions,
    nodes: Vec<MailboxNode>,
}

impl<'a> Mailbox<'a> {
    fn build(options: &'a FixtureOptions) -> Vec<MailboxNode> {
        let mut mailbox = Self {
            options,
            nodes: Vec::new(),
        };
        mailbox.add_store();

        let mut inbox_rows = Vec::new();
        for index in 0..options.message_count {
            inbox_rows.push(mailbox.add_email(index));
        }
        inbox_rows.push(mailbox.add_contact());
        let inbox_count = inbox_rows.len();
        if options.missing_message {
            inbox_rows.push(ContentsRow {
                id: missing_message_id(),
                class: "IPM.Note",
                subject: String::from("Missing"),
                delivery_time: None,
                flags: MSGFLAG_READ,
                has_attachments: false,
            });
        }
        if options.missing_contact {
            inbox_rows.push(ContentsRow {
                id: missing_contact_id(),
                class: "IPM.Contact",
                subject: String::from("Missing contact"),
                delivery_time: None,
                flags: MSGFLAG_READ,
                has_attachments: false,
            });
        }
        let search_rows = vec![inbox_rows[0].clone()];
        let archive_rows = vec![mailbox.add_archived_message()];
        let sent_rows = vec![mailbox.add_sent_message()];

        let archive_children = if options.folder_cycle {
            vec![inbox_id()]
        } else {
            Vec::new()
        };

        let mut inbox = FolderLayout::new(inbox_id(), ipm_sub_tree_id(), "Inbox", vec![archive_id()])
            .with_contents(inbox_rows);
        inbox.content_count = inbox_count;

        let folders = vec![
            FolderLayout::new(NID_ROOT_FOLDER, NID_ROOT_FOLDER, "", vec![ipm_sub_tree_id()]),
            FolderLayout::new(
                ipm_sub_tree_id(),
                NID_ROOT_FOLDER,
                TOP_FOLDER_NAME,
                vec![inbox_id(), sent_items_id(), search_folder_id()],
            ),
            inbox,
            FolderLayout::new(sent_items_id(), ipm_sub_tree_id(), "Sent Items", Vec::new())
                .with_contents(sent_rows),
            FolderLayout::new(archive_id(), inbox_id(), "Archive", archive_children)
                .with_contents(archive_rows),
            FolderLayout::new(
                search_folder_id(),
                ipm_sub_tree_id(),
                "Search Results",
                Vec::new(),
            )
            .with_contents(search_rows),
        ];
        for folder in &folders {
            mailbox.add_folder(folder, &folders);
        }

        mailbox.nodes.sort_by_key(|node| node.id);
        mailbox.nodes
    }

    fn version(&self) -> NdbVersion {
        self.options.version
    }

    fn push(&mut self, id: NodeId, parent: Option<NodeId>, image: NodeImage) {
        self.nodes.push(MailboxNode { id, parent, image });
    }

    fn add_store(&mut self) {
        // rgbFlags, uid, nid
        let mut entry_id = vec![0; 4];
        entry_id.extend(record_key());
        entry_id.extend_from_slice(&u32::from(ipm_sub_tree_id()).to_le_bytes());

        let mut properties = vec![
            (PID_TAG_DISPLAY_NAME, Value::text(STORE_NAME)),
            (PID_TAG_RECORD_KEY, Value::Binary(record_key())),
            (PID_TAG_IPM_SUB_TREE_ENTRY_ID, Value::Binary(entry_id)),
        ];
        if let Some(code_page) = self.options.code_page {
            properties.push((PID_TAG_MESSAGE_CODEPAGE, Value::Integer32(i32::from(code_page))));
        }

        let image = property_context(self.version(), properties);
        self.push(NID_MESSAGE_STORE, None, image);
    }

    fn add_folder(&mut self, folder: &FolderLayout, folders: &[FolderLayout]) {
        let version = self.version();

        let mut properties = vec![
            (PID_TAG_DISPLAY_NAME, Value::text(folder.name)),
            (PID_TAG_CONTENT_COUNT, Value::Integer32(folder.content_count as i32)),
            (PID_TAG_CONTENT_UNREAD_COUNT, Value::Integer32(0)),
            (PID_TAG_SUBFOLDERS, Value::Boolean(!folder.children.is_empty())),
        ];
        if folder.id != NID_ROOT_FOLDER {
            properties.push((PID_TAG_CONTAINER_CLASS, Value::text("IPF.Note")));
        }
        self.push(
            folder.id,
            Some(folder.parent),
            property_context(version, properties),
        );

        let hierarchy_rows: Vec<_> = folder
            .children
            .iter()
            .filter_map(|&child| folders.iter().find(|folder| folder.id == child))
            .map(|child| {
                (
                    u32::from(child.id),
                    vec![
                        (PID_TAG_DISPLAY_NAME, Value::text(child.name)),
                        (PID_TAG_CONTENT_COUNT, Value::Integer32(child.content_count as i32)),
                        (PID_TAG_CONTENT_UNREAD_COUNT, Value::Integer32(0)),
                        (PID_TAG_SUBFOLDERS, Value::Boolean(!child.children.is_empty())),
                    ],
                )
            })
            .collect();
        let text = text_type(version);
        let hierarchy = table_context(
            version,
            &[
                (PID_TAG_DISPLAY_NAME, text),
                (PID_TAG_CONTENT_COUNT, PropertyType::Integer32),
                (PID_TAG_CONTENT_UNREAD_COUNT, PropertyType::Integer32),
                (PID_TAG_SUBFOLDERS, PropertyType::Boolean),
            ],
            hierarchy_rows,
        );
        self.push(
            folder.id.sibling(NodeIdType::HierarchyTable).unwrap(),
            None,
            hierarchy,
        );

        let contents_rows: Vec<_> = folder
            .contents
            .iter()
            .map(|row| {
                let mut cells = vec![
                    (PID_TAG_MESSAGE_CLASS, Value::text(row.class)),
                    (PID_TAG_SUBJECT, Value::Text(row.subject.clone())),
                    (PID_TAG_MESSAGE_FLAGS, Value::Integer32(row.flags)),
                    (PID_TAG_HAS_ATTACHMENTS, Value::Boolean(row.has_attachments)),
                ];
                if let Some(time) = row.delivery_time {
                    cells.push((PID_TAG_MESSAGE_DELIVERY_TIME, Value::Time(time)));
                }
                (u32::from(row.id), cells)
            })
            .collect();
        let contents = table_context(
            version,
            &[
                (PID_TAG_MESSAGE_CLASS, text),
                (PID_TAG_SUBJECT, text),
                (PID_TAG_MESSAGE_DELIVERY_TIME, PropertyType::Time),
                (PID_TAG_MESSAGE_FLAGS, PropertyType::Integer32),
                (PID_TAG_HAS_ATTACHMENTS, PropertyType::Boolean),
            ],
            contents_rows,
        );
        let contents_type = if folder.is_search_folder() {
            NodeIdType::SearchContentsTable
        } else {
            NodeIdType::ContentsTable
        };
        self.push(folder.id.sibling(contents_type).unwrap(), None, contents);
    }

    fn add_email(&mut self, index: usize) -> ContentsRow {
        let version = self.version();
        let sample = sample_message(index);
        let has_attachments = index == 0 && self.options.attachments;
        let stored_subject = if index == 1 {
            // a prefix length marker in front of the normalized subject
            format!("\u{1}\u{5}{}", sample.subject)
        } else {
            sample.subject.clone()
        };

        let body = if index == 0 && self.options.large_body {
            Value::LargeText(sample.large_body())
        } else {
            Value::Text(sample.body.clone())
        };
        let mut properties = vec![
            (PID_TAG_MESSAGE_CLASS, Value::text("IPM.Note")),
            (PID_TAG_SUBJECT, Value::Text(stored_subject.clone())),
            (PID_TAG_SENDER_NAME, Value::Text(sample.sender_name.clone())),
            (PID_TAG_SENDER_EMAIL_ADDRESS, Value::Text(sample.sender_email.clone())),
            (PID_TAG_DISPLAY_TO, Value::text("Alice Example")),
            (PID_TAG_DISPLAY_CC, Value::text("Bob Example")),
            (PID_TAG_MESSAGE_DELIVERY_TIME, Value::Time(sample.delivery_time)),
            (PID_TAG_CLIENT_SUBMIT_TIME, Value::Time(sample.delivery_time - 60)),
            (PID_TAG_MESSAGE_FLAGS, Value::Integer32(MSGFLAG_READ)),
            (PID_TAG_MESSAGE_SIZE, Value::Integer32(sample.size)),
            (PID_TAG_HAS_ATTACHMENTS, Value::Boolean(has_attachments)),
            (PID_TAG_BODY, body),
            (PID_TAG_RTF_COMPRESSED, Value::Binary(sample.rtf.clone())),
        ];
        if index == 0 {
            properties.push((
                PID_TAG_TRANSPORT_MESSAGE_HEADERS,
                Value::Text(format!(
                    "Received: from mail.example.com\r\nFrom: {} <{}>\r\nSubject: {}\r\n",
                    sample.sender_name, sample.sender_email, sample.subject
                )),
            ));
        }

        let mut image = property_context(version, properties);
        image
            .sub_nodes
            .push((NID_RECIPIENT_TABLE, recipient_table(version)));
        if has_attachments {
            self.add_attachments(&mut image);
        }
        image.sub_nodes.sort_by_key(|(id, _)| *id);

        let id = email_id(index);
        self.push(id, Some(inbox_id()), image);

        ContentsRow {
            id,
            class: "IPM.Note",
            subject: stored_subject,
            delivery_time: Some(sample.delivery_time),
            flags: MSGFLAG_READ,
            has_attachments,
        }
    }

    fn add_attachments(&self, message: &mut NodeImage) {
        let version = self.version();

        let report = report_payload();
        let image = image_payload();
        let attachments = [
            vec![
                (PID_TAG_ATTACH_LONG_FILENAME, Value::text("report.pdf")),
                (PID_TAG_ATTACH_FILENAME, Value::text("REPORT.PDF")),
                (PID_TAG_ATTACH_EXTENSION, Value::text(".pdf")),
                (PID_TAG_ATTACH_MIME_TAG, Value::text("application/pdf")),
                (PID_TAG_ATTACH_METHOD, Value::Integer32(1)),
                (PID_TAG_ATTACH_SIZE, Value::Integer32(report.len() as i32)),
                (PID_TAG_RENDERING_POSITION, Value::Integer32(-1)),
                (PID_TAG_ATTACH_DATA, Value::Binary(report)),
            ],
            vec![
                (PID_TAG_ATTACH_LONG_FILENAME, Value::text("image001.png")),
                (PID_TAG_ATTACH_MIME_TAG, Value::text("image/png")),
                (
                    PID_TAG_ATTACH_CONTENT_ID,
                    Value::text("image001.png@01DA0000.00000000"),
                ),
                (PID_TAG_ATTACH_METHOD, Value::Integer32(1)),
                (PID_TAG_ATTACH_SIZE, Value::Integer32(image.len() as i32)),
                (PID_TAG_RENDERING_POSITION, Value::Integer32(-1)),
                (PID_TAG_ATTACH_DATA, Value::Binary(image)),
            ],
            vec![
                (PID_TAG_ATTACH_EXTENSION, Value::text(".txt")),
                (PID_TAG_ATTACH_METHOD, Value::Integer32(1)),
                (
                    PID_TAG_ATTACH_DATA,
                    Value::LargeBinary(large_attachment_payload()),
                ),
            ],
        ];

        let table_cells = [
            PID_TAG_ATTACH_SIZE,
            PID_TAG_ATTACH_LONG_FILENAME,
            PID_TAG_ATTACH_METHOD,
            PID_TAG_RENDERING_POSITION,
        ];
        let mut rows = Vec::new();
        for (index, properties) in attachments.into_iter().enumerate() {
            let id = attachment_id(index as u32 + 1);
            let cells: Vec<_> = properties
                .iter()
                .filter(|(prop_id, _)| table_cells.contains(prop_id))
                .cloned()
                .collect();
            rows.push((u32::from(id), cells));
            message
                .sub_nodes
                .push((id, property_context(version, properties)));
        }
        if self.options.broken_attachment {
            rows.push((
                u32::from(attachment_id(4)),
                vec![(PID_TAG_ATTACH_METHOD, Value::Integer32(1))],
            ));
        }

        let table = table_context(
            version,
            &[
                (PID_TAG_ATTACH_SIZE, PropertyType::Integer32),
                (PID_TAG_ATTACH_LONG_FILENAME, text_type(version)),
                (PID_TAG_ATTACH_METHOD, PropertyType::Integer32),
                (PID_TAG_RENDERING_POSITION, PropertyType::Integer32),
            ],
            rows,
        );
        message.sub_nodes.push((NID_ATTACHMENT_TABLE, table));
    }

    fn add_contact(&mut self) -> ContentsRow {
        let properties = vec![
            (PID_TAG_MESSAGE_CLASS, Value::text("IPM.Contact")),
            (PID_TAG_SUBJECT, Value::text("Carol Contact")),
            (PID_TAG_DISPLAY_NAME, Value::text("Carol Contact")),
            (PID_TAG_MESSAGE_FLAGS, Value::Integer32(MSGFLAG_READ)),
        ];
        let image = property_context(self.version(), properties);
        self.push(contact_id(), Some(inbox_id()), image);

        ContentsRow {
            id: contact_id(),
            class: "IPM.Contact",
            subject: String::from("Carol Contact"),
            delivery_time: None,
            flags: MSGFLAG_READ,
            has_attachments: false,
        }
    }

    /// No `PidTagMessageClass` in the PC and only a creation time.
    fn add_archived_message(&mut self) -> ContentsRow {
        let flags = MSGFLAG_READ | MSGFLAG_FROMME;
        let properties = vec![
            (PID_TAG_SUBJECT, Value::text("Archived message")),
            (PID_TAG_SENDER_NAME, Value::text("Fixture Owner")),
            (PID_TAG_SENDER_EMAIL_ADDRESS, Value::text("owner@example.com")),
            (PID_TAG_CREATION_TIME, Value::Time(1_690_000_000)),
            (PID_TAG_MESSAGE_FLAGS, Value::Integer32(flags)),
            (PID_TAG_BODY, Value::text("Archived body")),
        ];
        let image = property_context(self.version(), properties);
        self.push(archived_message_id(), Some(archive_id()), image);

        ContentsRow {
            id: archived_message_id(),
            class: "IPM.Note",
            subject: String::from("Archived message"),
            delivery_time: None,
            flags,
            has_attachments: false,
        }
    }

    /// An HTML-only message with just a client submit time.
    fn add_sent_message(&mut self) -> ContentsRow {
        let properties = vec![
            (PID_TAG_MESSAGE_CLASS, Value::text("IPM.Note.SMIME")),
            (PID_TAG_SUBJECT, Value::text("Sent message")),
            (PID_TAG_SENDER_NAME, Value::text("Fixture Owner")),
            (PID_TAG_SENDER_EMAIL_ADDRESS, Value::text("owner@example.com")),
            (PID_TAG_DISPLAY_TO, Value::text("Alice Example")),
            (PID_TAG_CLIENT_SUBMIT_TIME, Value::Time(1_695_000_000)),
            (PID_TAG_MESSAGE_FLAGS, Value::Integer32(MSGFLAG_READ)),
            (
                PID_TAG_BODY_HTML,
                Value::Binary(b"<html><body><p>Sent from the fixture</p></body></html>".to_vec()),
            ),
        ];
        let image = property_context(self.version(), properties);
        self.push(sent_message_id(), Some(sent_items_id()), image);

        ContentsRow {
            id: sent_message_id(),
            class: "IPM.Note.SMIME",
            subject: String::from("Sent message"),
            delivery_time: None,
            flags: MSGFLAG_READ,
            has_attachments: false,
        }
    }
}

fn text_type(version: NdbVersion) -> PropertyType {
    Value::text("").prop_type(version)
}

fn recipient_table(version: NdbVersion) -> NodeImage {
    let text = text_type(version);
    table_context(
        version,
        &[
            (PID_TAG_RECIPIENT_TYPE, PropertyType::Integer32),
            (PID_TAG_DISPLAY_NAME, text),
            (PID_TAG_EMAIL_ADDRESS, text),
            (PID_TAG_SMTP_ADDRESS, text),
            (PID_TAG_ADDRESS_TYPE, text),
        ],
        vec![
            (
                0,
                vec![
                    (PID_TAG_RECIPIENT_TYPE, Value::Integer32(1)),
                    (PID_TAG_DISPLAY_NAME, Value::text("Alice Example")),
                    (
                        PID_TAG_EMAIL_ADDRESS,
                        Value::text("/o=Example/ou=Exchange/cn=Recipients/cn=alice"),
                    ),
                    (PID_TAG_SMTP_ADDRESS, Value::text("alice@example.com")),
                    (PID_TAG_ADDRESS_TYPE, Value::text("EX")),
                ],
            ),
            (
                1,
                vec![
                    (PID_TAG_RECIPIENT_TYPE, Value::Integer32(2)),
                    (PID_TAG_DISPLAY_NAME, Value::text("Bob Example")),
                    (PID_TAG_EMAIL_ADDRESS, Value::text("bob@example.com")),
                    (PID_TAG_ADDRESS_TYPE, Value::text("SMTP")),
                ],
            ),
        ],
    )
}

/// `nid`, `bidData`, `bidSub`, `nidParent`
type NodeRecord = (NodeId, BlockId, Option<BlockId>, Option<NodeId>);

/// Assigns BIDs and file offsets while laying out blocks and pages.
struct ImageWriter {
    version: NdbVersion,
    crypt_method: NdbCryptMethod,
    truncated_body: bool,
    short_body_block: bool,
    short_sub_node_block: bool,
    next_index: u64,
    blocks: Vec<u8>,
    block_entries: Vec<(BlockId, u64, u16)>,
    pages_start: u64,
    pages: Vec<u8>,
    large_body: Option<(BlockId, Vec<u8>)>,
}

impl ImageWriter {
    fn new(options: &FixtureOptions) -> Self {
        Self {
            version: options.version,
            crypt_method: options.crypt_method,
            truncated_body: options.truncated_body,
            short_body_block: options.short_body_block,
            short_sub_node_block: options.short_sub_node_block,
            next_index: 0,
            blocks: Vec::new(),
            block_entries: Vec::new(),
            pages_start: 0,
            pages: Vec::new(),
            large_body: None,
        }
    }

    fn next_block(&mut self, internal: bool) -> BlockId {
        self.next_index += 1;
        BlockId::new(internal, self.next_index).unwrap()
    }

    fn push_id(&self, buffer: &mut Vec<u8>, value: u64) {
        match self.version {
            NdbVersion::Ansi => buffer.extend_from_slice(&(value as u32).to_le_bytes()),
            NdbVersion::Unicode => buffer.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn write_block(&mut self, block: BlockId, mut data: Vec<u8>) {
        assert!(!data.is_empty() && data.len() <= MAX_DATA_SIZE);

        let index = BLOCK_START + self.blocks.len() as u64;
        if !block.is_internal() {
            encode::encode_block(self.crypt_method, u64::from(block), &mut data);
        }

        let size = data.len() as u16;
        let trailer_size = self.version.block_trailer_size();
        let total = usize::from(block_size(size + trailer_size as u16));
        let crc = compute_crc(0, &data);

        let mut trailer = Vec::with_capacity(trailer_size);
        trailer.extend_from_slice(&size.to_le_bytes());
        trailer.extend_from_slice(&compute_sig(index, u64::from(block)).to_le_bytes());
        match self.version {
            NdbVersion::Ansi => {
                self.push_id(&mut trailer, u64::from(block));
                trailer.extend_from_slice(&crc.to_le_bytes());
            }
            NdbVersion::Unicode => {
                trailer.extend_from_slice(&crc.to_le_bytes());
                self.push_id(&mut trailer, u64::from(block));
            }
        }

        data.resize(total - trailer_size, 0);
        data.extend_from_slice(&trailer);
        self.blocks.extend_from_slice(&data);
        self.block_entries.push((block, index, size));
    }

    fn write_data_tree(&mut self, image: &NodeImage) -> BlockId {
        if let [data] = image.blocks.as_slice() {
            let block = self.next_block(false);
            self.write_block(block, data.clone());
            return block;
        }

        let mut leaves = Vec::with_capacity(image.blocks.len());
        for (index, data) in image.blocks.iter().enumerate() {
            let block = self.next_block(false);
            if !(image.large_body && self.truncated_body && index == 1) {
                self.write_block(block, data.clone());
            }
            leaves.push(block);
        }

        // XBLOCK: btype, cLevel, cEnt, lcbTotal, rgbid
        let total: usize = image.blocks.iter().map(Vec::len).sum();
        let mut xblock = vec![0x01, 0x01];
        xblock.extend_from_slice(&(leaves.len() as u16).to_le_bytes());
        xblock.extend_from_slice(&(total as u32).to_le_bytes());
        for leaf in &leaves {
            self.push_id(&mut xblock, u64::from(*leaf));
        }

        if image.large_body && self.short_body_block {
            xblock.truncate(3);
        }

        let block = self.next_block(true);
        self.write_block(block, xblock);
        if image.large_body {
            self.large_body = Some((block, image.blocks.concat()));
        }
        block
    }

    /// Write the sub-node tree and then the data of `image`.
    fn write_node(&mut self, image: &NodeImage) -> (BlockId, Option<BlockId>) {
        let sub_node = if image.sub_nodes.is_empty() {
            None
        } else {
            let mut entries = Vec::with_capacity(image.sub_nodes.len());
            for (id, sub_image) in &image.sub_nodes {
                let (data, sub_node) = self.write_node(sub_image);
                entries.push((*id, data, sub_node));
            }
            entries.sort_by_key(|(id, ..)| *id);

            // SLBLOCK: btype, cLevel, cEnt, dwPadding, rgentries
            let mut block = vec![0x02, 0x00];
            block.extend_from_slice(&(entries.len() as u16).to_le_bytes());
            if self.version == NdbVersion::Unicode {
                block.extend_from_slice(&0_u32.to_le_bytes());
            }
            for (id, data, sub_node) in entries {
                self.push_id(&mut block, u64::from(u32::from(id)));
                self.push_id(&mut block, u64::from(data));
                self.push_id(&mut block, sub_node.map(u64::from).unwrap_or_default());
            }

            let holds_body = image.sub_nodes.iter().any(|(_, sub)| sub.large_body);
            if holds_body && self.short_sub_node_block {
                block.truncate(3);
            }

            let id = self.next_block(true);
            self.write_block(id, block);
            Some(id)
        };

        (self.write_data_tree(image), sub_node)
    }

    fn entries_size(&self) -> usize {
        match self.version {
            NdbVersion::Ansi => 496,
            NdbVersion::Unicode => 488,
        }
    }

    /// Returns the BID and file offset of the new page.
    fn write_page(
        &mut self,
        page_type: PageType,
        level: u8,
        entries: &[Vec<u8>],
        entry_size: usize,
    ) -> (BlockId, u64) {
        let block = self.next_block(false);
        let index = self.pages_start + self.pages.len() as u64;
        let entries_size = self.entries_size();

        let mut page = entries.concat();
        page.resize(entries_size, 0);
        // cEnt, cEntMax, cbEnt, cLevel
        page.extend_from_slice(&[
            entries.len() as u8,
            (entries_size / entry_size) as u8,
            entry_size as u8,
            level,
        ]);

        let trailer_size = self.version.page_trailer_size();
        page.resize(PAGE_SIZE - trailer_size, 0);
        let crc = compute_crc(0, &page);

        page.extend_from_slice(&[page_type as u8, page_type as u8]);
        page.extend_from_slice(&compute_sig(index, u64::from(block)).to_le_bytes());
        match self.version {
            NdbVersion::Ansi => {
                self.push_id(&mut page, u64::from(block));
                page.extend_from_slice(&crc.to_le_bytes());
            }
            NdbVersion::Unicode => {
                page.extend_from_slice(&crc.to_le_bytes());
                self.push_id(&mut page, u64::from(block));
            }
        }

        self.pages.extend_from_slice(&page);
        (block, index)
    }

    /// Write the leaf `records` (key, bytes) and as many branch levels as they need. Returns the
    /// root page.
    fn write_btree(
        &mut self,
        page_type: PageType,
        records: Vec<(u64, Vec<u8>)>,
        entry_size: usize,
    ) -> (BlockId, u64) {
        let max_leaf = self.entries_size() / entry_size;
        let mut level_pages = Vec::new();
        for chunk in records.chunks(max_leaf) {
            let entries: Vec<_> = chunk.iter().map(|(_, record)| record.clone()).collect();
            let page = self.write_page(page_type, 0, &entries, entry_size);
            level_pages.push((chunk[0].0, page));
        }

        let branch_size = self.version.id_size() * 3;
        let max_branch = self.entries_size() / branch_size;
        let mut level = 0;
        while level_pages.len() > 1 {
            level += 1;
            let mut parents = Vec::new();
            for chunk in level_pages.chunks(max_branch) {
                let entries: Vec<_> = chunk
                    .iter()
                    .map(|(key, (block, index))| {
                        let mut entry = Vec::with_capacity(branch_size);
                        self.push_id(&mut entry, *key);
                        self.push_id(&mut entry, u64::from(*block));
                        self.push_id(&mut entry, *index);
                        entry
                    })
                    .collect();
                let page = self.write_page(page_type, level, &entries, branch_size);
                parents.push((chunk[0].0, page));
            }
            level_pages = parents;
        }

        level_pages[0].1
    }

    fn finish(mut self, nodes: &[NodeRecord]) -> Built {
        let end_of_blocks = BLOCK_START + self.blocks.len() as u64;
        self.pages_start = end_of_blocks.div_ceil(PAGE_SIZE as u64) * PAGE_SIZE as u64;

        let mut block_entries = self.block_entries.clone();
        block_entries.sort_by_key(|(block, ..)| block.search_key());
        let block_records: Vec<_> = block_entries
            .iter()
            .map(|&(block, index, size)| {
                let mut record = Vec::new();
                self.push_id(&mut record, u64::from(block));
                self.push_id(&mut record, index);
                record.extend_from_slice(&size.to_le_bytes());
                // cRef
                record.extend_from_slice(&1_u16.to_le_bytes());
                if self.version == NdbVersion::Unicode {
                    record.extend_from_slice(&0_u32.to_le_bytes());
                }
                (block.search_key(), record)
            })
            .collect();
        let block_entry_size = match self.version {
            NdbVersion::Ansi => 12,
            NdbVersion::Unicode => 24,
        };
        let block_btree = self.write_btree(PageType::BlockBTree, block_records, block_entry_size);

        let node_records: Vec<_> = nodes
            .iter()
            .map(|&(node, data, sub_node, parent)| {
                let mut record = Vec::new();
                self.push_id(&mut record, u64::from(u32::from(node)));
                self.push_id(&mut record, u64::from(data));
                self.push_id(&mut record, sub_node.map(u64::from).unwrap_or_default());
                record.extend_from_slice(&parent.map(u32::from).unwrap_or_default().to_le_bytes());
                if self.version == NdbVersion::Unicode {
                    record.extend_from_slice(&0_u32.to_le_bytes());
                }
                (u64::from(u32::from(node)), record)
            })
            .collect();
        let node_entry_size = match self.version {
            NdbVersion::Ansi => 16,
            NdbVersion::Unicode => 32,
        };
        let node_btree = self.write_btree(PageType::NodeBTree, node_records, node_entry_size);

        let file_eof = self.pages_start + self.pages.len() as u64;
        let header = self.header(file_eof, node_btree, block_btree);

        let mut bytes = vec![0; BLOCK_START as usize];
        bytes[..header.len()].copy_from_slice(&header);
        bytes.extend_from_slice(&self.blocks);
        bytes.resize(self.pages_start as usize, 0);
        bytes.extend_from_slice(&self.pages);

        Built {
            bytes,
            node_btree_offset: node_btree.1,
            large_body: self.large_body,
        }
    }

    fn header(
        &self,
        file_eof: u64,
        node_btree: (BlockId, u64),
        block_btree: (BlockId, u64),
    ) -> Vec<u8> {
        let next_block = u64::from(BlockId::new(false, self.next_index + 1).unwrap());
        let mut header = match self.version {
            NdbVersion::Ansi => vec![0; 512],
            NdbVersion::Unicode => vec![0; 564],
        };

        header[..4].copy_from_slice(&HEADER_MAGIC.to_le_bytes());
        header[8..10].copy_from_slice(&HEADER_MAGIC_CLIENT.to_le_bytes());
        header[10..12].copy_from_slice(&(self.version as u16).to_le_bytes());
        // wVerClient, bPlatformCreate, bPlatformAccess
        header[12..14].copy_from_slice(&19_u16.to_le_bytes());
        header[14] = 0x01;
        header[15] = 0x01;

        let mut fields = Vec::new();
        let (fields_start, root_start, sentinel) = match self.version {
            NdbVersion::Ansi => {
                // bidNextB, bidNextP, dwUnique
                self.push_id(&mut fields, next_block);
                self.push_id(&mut fields, next_block);
                fields.extend_from_slice(&0x10_u32.to_le_bytes());
                (24, 164, 460)
            }
            NdbVersion::Unicode => {
                // bidUnused, bidNextP, dwUnique
                self.push_id(&mut fields, 0);
                self.push_id(&mut fields, next_block);
                fields.extend_from_slice(&0x10_u32.to_le_bytes());
                (24, 180, 512)
            }
        };
        header[fields_start..fields_start + fields.len()].copy_from_slice(&fields);

        // ROOT: dwReserved, ibFileEof, ibAMapLast, cbAMapFree, cbPMapFree, BREFNBT, BREFBBT,
        // fAMapValid
        let mut root = vec![0; 4];
        self.push_id(&mut root, file_eof);
        self.push_id(&mut root, BLOCK_START);
        self.push_id(&mut root, 0);
        self.push_id(&mut root, 0);
        for (block, index) in [node_btree, block_btree] {
            self.push_id(&mut root, u64::from(block));
            self.push_id(&mut root, index);
        }
        root.push(0x02);
        header[root_start..root_start + root.len()].copy_from_slice(&root);

        header[sentinel] = NDB_SENTINEL;
        header[sentinel + 1] = self.crypt_method as u8;

        if self.version == NdbVersion::Unicode {
            // bidNextB, dwCRCFull
            header[516..524].copy_from_slice(&next_block.to_le_bytes());
            let crc = compute_crc(0, &header[8..8 + FULL_CRC_SIZE]);
            header[524..528].copy_from_slice(&crc.to_le_bytes());
        }

        let crc = compute_crc(0, &header[8..8 + PARTIAL_CRC_SIZE]);
        header[4..8].copy_from_slice(&crc.to_le_bytes());
        header
    }
}

struct Built {
    bytes: Vec<u8>,
    node_btree_offset: u64,
    large_body: Option<(BlockId, Vec<u8>)>,
}

/// A complete PST image built from [FixtureOptions].
pub(crate) struct PstBuilder {
    bytes: Vec<u8>,
    node_btree_offset: u64,
    node_listing: Vec<(NodeId, BlockId)>,
    large_body: Option<(BlockId, Vec<u8>)>,
}

impl PstBuilder {
    pub fn new(options: FixtureOptions) -> Self {
        let nodes = Mailbox::build(&options);

        let mut writer = ImageWriter::new(&options);
        let mut entries = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let (data, sub_node) = writer.write_node(&node.image);
            entries.push((node.id, data, sub_node, node.parent));
        }

        let built = writer.finish(&entries);
        Self {
            bytes: built.bytes,
            node_btree_offset: built.node_btree_offset,
            node_listing: entries.iter().map(|&(node, data, ..)| (node, data)).collect(),
            large_body: built.large_body,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn open(&self) -> Arc<PstFile> {
        open_bytes(self.build())
    }

    /// File offset of the NBT root page.
    pub fn node_btree_offset(&self) -> u64 {
        self.node_btree_offset
    }

    /// Every NBT node and its data block, in NBT order.
    pub fn node_listing(&self) -> Vec<(NodeId, BlockId)> {
        self.node_listing.clone()
    }

    /// The XBLOCK of the first email's body and the bytes it holds.
    pub fn large_body(&self) -> (BlockId, Vec<u8>) {
        self.large_body
            .clone()
            .expect("built without FixtureOptions::large_body")
    }
}
