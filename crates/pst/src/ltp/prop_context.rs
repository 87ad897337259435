//! ## [Property Context (PC)](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/294c83c6-ff92-42f5-b6b6-876c29fa9737)

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    fmt::Debug,
    io::{self, Read},
};
use tracing::debug;

use super::{heap::*, prop_type::*, tree::*, *};
use crate::{
    diagnostics::Warning,
    ndb::{
        node::Node,
        node_id::{NodeId, NodeIdType},
    },
    PstFile,
};

/// Code page used for `PtypString8` values when nothing more specific is known.
pub const DEFAULT_CODE_PAGE: u16 = 1252;

/// Where a PC record's value lives, as decoded from `dwValueHnid`.
#[derive(Copy, Clone)]
pub enum PropertyValueRecord {
    Small(u32),
    Heap(HeapId),
    Node(NodeId),
}

impl Debug for PropertyValueRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValueRecord::Small(value) => write!(f, "Small(0x{value:08X})"),
            PropertyValueRecord::Heap(heap_id) => write!(f, "{heap_id:?}"),
            PropertyValueRecord::Node(node_id) => write!(f, "{node_id:?}"),
        }
    }
}

impl PropertyValueRecord {
    /// Classify a `dwValueHnid` (or TC cell HNID) for a value of type `prop_type`.
    pub fn new(prop_type: PropertyType, value: u32) -> Self {
        if prop_type.is_inline() || value == 0 {
            return Self::Small(value);
        }

        match NodeId::from(value).id_type() {
            Ok(NodeIdType::HeapNode) => HeapId::try_from(value)
                .map(Self::Heap)
                .unwrap_or(Self::Small(value)),
            _ => Self::Node(NodeId::from(value)),
        }
    }
}

/// [PC BTH Record](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/7daab6f5-ce65-437e-80d5-1b1be4088bd3)
#[derive(Clone, Copy, Debug)]
pub struct PropertyTreeRecord {
    prop_id: u16,
    prop_type: u16,
    value: u32,
}

impl PropertyTreeRecord {
    fn read(entry: &HeapTreeEntry) -> LtpResult<Self> {
        // wPropId
        let prop_id = entry.key_value() as u16;

        let mut data = entry.data();

        // wPropType
        let prop_type = data.read_u16::<LittleEndian>()?;

        // dwValueHnid
        let value = data.read_u32::<LittleEndian>()?;

        Ok(Self {
            prop_id,
            prop_type,
            value,
        })
    }

    pub fn prop_id(&self) -> u16 {
        self.prop_id
    }

    pub fn prop_type(&self) -> LtpResult<PropertyType> {
        PropertyType::try_from(self.prop_type)
    }

    pub fn value(&self) -> LtpResult<PropertyValueRecord> {
        Ok(PropertyValueRecord::new(self.prop_type()?, self.value))
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct GuidValue {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl GuidValue {
    fn read(f: &mut dyn Read) -> io::Result<Self> {
        let data1 = f.read_u32::<LittleEndian>()?;
        let data2 = f.read_u16::<LittleEndian>()?;
        let data3 = f.read_u16::<LittleEndian>()?;
        let mut data4 = [0; 8];
        f.read_exact(&mut data4)?;
        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }
}

impl Debug for GuidValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        for byte in &self.data4[2..] {
            write!(f, "{byte:02X}")?;
        }
        write!(f, "}}")
    }
}

/// `PtypObject` payload: the sub-node holding the object and the size of its data.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct ObjectValue {
    node: NodeId,
    size: u32,
}

impl ObjectValue {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

/// A decoded property value. Strings have their trailing NULs removed; `PtypString8` keeps its
/// raw bytes until a code page is applied with [PropertyValue::to_text].
#[derive(Clone, Default, PartialEq, Debug)]
pub enum PropertyValue {
    #[default]
    Null,
    Integer16(i16),
    Integer32(i32),
    Floating32(f32),
    Floating64(f64),
    Currency(i64),
    FloatingTime(f64),
    ErrorCode(i32),
    Boolean(bool),
    Integer64(i64),
    String8(Vec<u8>),
    Unicode(String),
    Time(i64),
    Guid(GuidValue),
    Binary(Vec<u8>),
    Object(ObjectValue),

    MultipleInteger16(Vec<i16>),
    MultipleInteger32(Vec<i32>),
    MultipleFloating32(Vec<f32>),
    MultipleFloating64(Vec<f64>),
    MultipleCurrency(Vec<i64>),
    MultipleFloatingTime(Vec<f64>),
    MultipleInteger64(Vec<i64>),
    MultipleString8(Vec<Vec<u8>>),
    MultipleUnicode(Vec<String>),
    MultipleTime(Vec<i64>),
    MultipleGuid(Vec<GuidValue>),
    MultipleBinary(Vec<Vec<u8>>),
}

impl PropertyValue {
    /// Decode a value stored directly in `dwValueHnid` or a TC cell.
    pub fn from_inline(prop_type: PropertyType, value: u32) -> LtpResult<Self> {
        Ok(match prop_type {
            PropertyType::Null => Self::Null,
            PropertyType::Integer16 => Self::Integer16(value as u16 as i16),
            PropertyType::Integer32 => Self::Integer32(value as i32),
            PropertyType::Floating32 => Self::Floating32(f32::from_bits(value)),
            PropertyType::ErrorCode => Self::ErrorCode(value as i32),
            PropertyType::Boolean => Self::Boolean(value & 0xFF != 0),
            _ => {
                return Err(LtpError::InvalidPropertySize {
                    prop_type,
                    size: 4,
                })
            }
        })
    }

    /// Decode a value from the bytes of its heap allocation or sub-node.
    pub fn read(prop_type: PropertyType, data: &[u8]) -> LtpResult<Self> {
        if let Some(size) = prop_type.fixed_size() {
            if data.len() < size {
                return Err(LtpError::InvalidPropertySize {
                    prop_type,
                    size: data.len(),
                });
            }
        }

        let mut f = data;
        Ok(match prop_type {
            PropertyType::Null => Self::Null,
            PropertyType::Integer16 => Self::Integer16(f.read_i16::<LittleEndian>()?),
            PropertyType::Integer32 => Self::Integer32(f.read_i32::<LittleEndian>()?),
            PropertyType::Floating32 => Self::Floating32(f.read_f32::<LittleEndian>()?),
            PropertyType::Floating64 => Self::Floating64(f.read_f64::<LittleEndian>()?),
            PropertyType::Currency => Self::Currency(f.read_i64::<LittleEndian>()?),
            PropertyType::FloatingTime => Self::FloatingTime(f.read_f64::<LittleEndian>()?),
            PropertyType::ErrorCode => Self::ErrorCode(f.read_i32::<LittleEndian>()?),
            PropertyType::Boolean => Self::Boolean(f.read_u8()? != 0),
            PropertyType::Integer64 => Self::Integer64(f.read_i64::<LittleEndian>()?),
            PropertyType::Time => Self::Time(f.read_i64::<LittleEndian>()?),
            PropertyType::Guid => Self::Guid(GuidValue::read(&mut f)?),
            PropertyType::Object => {
                let node = NodeId::read(&mut f)?;
                let size = f.read_u32::<LittleEndian>()?;
                Self::Object(ObjectValue { node, size })
            }
            PropertyType::String8 => Self::String8(trim_string8(data)),
            PropertyType::Unicode => Self::Unicode(decode_unicode(data)),
            PropertyType::Binary => Self::Binary(data.to_vec()),

            PropertyType::MultipleInteger16 => Self::MultipleInteger16(read_packed(
                prop_type,
                data,
                |f| f.read_i16::<LittleEndian>(),
            )?),
            PropertyType::MultipleInteger32 => Self::MultipleInteger32(read_packed(
                prop_type,
                data,
                |f| f.read_i32::<LittleEndian>(),
            )?),
            PropertyType::MultipleFloating32 => Self::MultipleFloating32(read_packed(
                prop_type,
                data,
                |f| f.read_f32::<LittleEndian>(),
            )?),
            PropertyType::MultipleFloating64 => Self::MultipleFloating64(read_packed(
                prop_type,
                data,
                |f| f.read_f64::<LittleEndian>(),
            )?),
            PropertyType::MultipleCurrency => Self::MultipleCurrency(read_packed(
                prop_type,
                data,
                |f| f.read_i64::<LittleEndian>(),
            )?),
            PropertyType::MultipleFloatingTime => Self::MultipleFloatingTime(read_packed(
                prop_type,
                data,
                |f| f.read_f64::<LittleEndian>(),
            )?),
            PropertyType::MultipleInteger64 => Self::MultipleInteger64(read_packed(
                prop_type,
                data,
                |f| f.read_i64::<LittleEndian>(),
            )?),
            PropertyType::MultipleTime => Self::MultipleTime(read_packed(
                prop_type,
                data,
                |f| f.read_i64::<LittleEndian>(),
            )?),
            PropertyType::MultipleGuid => {
                Self::MultipleGuid(read_packed(prop_type, data, |f| GuidValue::read(f))?)
            }

            PropertyType::MultipleString8 => Self::MultipleString8(
                split_multi_valued(data)?
                    .into_iter()
                    .map(trim_string8)
                    .collect(),
            ),
            PropertyType::MultipleUnicode => Self::MultipleUnicode(
                split_multi_valued(data)?
                    .into_iter()
                    .map(decode_unicode)
                    .collect(),
            ),
            PropertyType::MultipleBinary => Self::MultipleBinary(
                split_multi_valued(data)?
                    .into_iter()
                    .map(<[u8]>::to_vec)
                    .collect(),
            ),
        })
    }

    pub fn prop_type(&self) -> PropertyType {
        match self {
            Self::Null => PropertyType::Null,
            Self::Integer16(_) => PropertyType::Integer16,
            Self::Integer32(_) => PropertyType::Integer32,
            Self::Floating32(_) => PropertyType::Floating32,
            Self::Floating64(_) => PropertyType::Floating64,
            Self::Currency(_) => PropertyType::Currency,
            Self::FloatingTime(_) => PropertyType::FloatingTime,
            Self::ErrorCode(_) => PropertyType::ErrorCode,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::Integer64(_) => PropertyType::Integer64,
            Self::String8(_) => PropertyType::String8,
            Self::Unicode(_) => PropertyType::Unicode,
            Self::Time(_) => PropertyType::Time,
            Self::Guid(_) => PropertyType::Guid,
            Self::Binary(_) => PropertyType::Binary,
            Self::Object(_) => PropertyType::Object,
            Self::MultipleInteger16(_) => PropertyType::MultipleInteger16,
            Self::MultipleInteger32(_) => PropertyType::MultipleInteger32,
            Self::MultipleFloating32(_) => PropertyType::MultipleFloating32,
            Self::MultipleFloating64(_) => PropertyType::MultipleFloating64,
            Self::MultipleCurrency(_) => PropertyType::MultipleCurrency,
            Self::MultipleFloatingTime(_) => PropertyType::MultipleFloatingTime,
            Self::MultipleInteger64(_) => PropertyType::MultipleInteger64,
            Self::MultipleString8(_) => PropertyType::MultipleString8,
            Self::MultipleUnicode(_) => PropertyType::MultipleUnicode,
            Self::MultipleTime(_) => PropertyType::MultipleTime,
            Self::MultipleGuid(_) => PropertyType::MultipleGuid,
            Self::MultipleBinary(_) => PropertyType::MultipleBinary,
        }
    }

    /// Text of a string value. `PtypString8` is decoded with `code_page`.
    pub fn to_text(&self, code_page: u16) -> Option<String> {
        match self {
            Self::Unicode(value) => Some(value.clone()),
            Self::String8(value) => Some(decode_string8(value, code_page)),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Integer16(value) => Some(i32::from(*value)),
            Self::Integer32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer64(value) => Some(*value),
            _ => self.as_i32().map(i64::from),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(value) | Self::String8(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(value) => filetime_to_datetime(*value),
            _ => None,
        }
    }
}

/// Convert a FILETIME (100-nanosecond intervals since 1601-01-01 UTC) to a timestamp. Zero and
/// negative values mean "not set".
pub fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    const TICKS_PER_SECOND: i64 = 10_000_000;
    const SECONDS_TO_UNIX_EPOCH: i64 = 11_644_473_600;

    if filetime <= 0 {
        return None;
    }

    let seconds = filetime / TICKS_PER_SECOND - SECONDS_TO_UNIX_EPOCH;
    let nanos = (filetime % TICKS_PER_SECOND) * 100;
    DateTime::<Utc>::from_timestamp(seconds, nanos as u32)
}

/// Decode 8-bit text. Unsupported code pages fall back to Windows-1252, then to Latin-1.
pub fn decode_string8(buffer: &[u8], code_page: u16) -> String {
    let decode = |code_page: u16| -> Option<String> {
        let coding = codepage_strings::Coding::new(code_page).ok()?;
        Some(coding.decode(buffer).ok()?.to_string())
    };

    match code_page {
        20127 => buffer.iter().map(|&b| char::from(b & 0x7F)).collect(),
        _ => decode(code_page)
            .or_else(|| decode(DEFAULT_CODE_PAGE))
            .unwrap_or_else(|| buffer.iter().map(|&b| char::from(b)).collect()),
    }
}

fn trim_string8(data: &[u8]) -> Vec<u8> {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    data[..end].to_vec()
}

fn decode_unicode(data: &[u8]) -> String {
    let mut buffer: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    while buffer.last() == Some(&0) {
        buffer.pop();
    }
    String::from_utf16_lossy(&buffer)
}

fn read_packed<T>(
    prop_type: PropertyType,
    data: &[u8],
    read: impl Fn(&mut &[u8]) -> io::Result<T>,
) -> LtpResult<Vec<T>> {
    let size = prop_type.base_type().fixed_size().unwrap_or(1).max(1);
    if data.len() % size != 0 {
        return Err(LtpError::InvalidPropertySize {
            prop_type,
            size: data.len(),
        });
    }

    data.chunks_exact(size)
        .map(|mut chunk| Ok(read(&mut chunk)?))
        .collect()
}

/// `ulCount`, `rgulDataOffsets[ulCount]`, then the items back to back.
fn split_multi_valued(data: &[u8]) -> LtpResult<Vec<&[u8]>> {
    let mut f = data;

    // ulCount
    let count = f.read_u32::<LittleEndian>()? as usize;
    let header_size = count
        .checked_mul(4)
        .and_then(|size| size.checked_add(4))
        .filter(|&size| size <= data.len())
        .ok_or(LtpError::InvalidPropertySize {
            prop_type: PropertyType::MultipleBinary,
            size: data.len(),
        })?;

    // rgulDataOffsets
    let offsets = (0..count)
        .map(|_| f.read_u32::<LittleEndian>())
        .collect::<io::Result<Vec<_>>>()?;

    offsets
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = offsets
                .get(index + 1)
                .map_or(data.len(), |&next| next as usize);
            let start_index = start as usize;
            if start_index < header_size || start_index > end || end > data.len() {
                return Err(LtpError::InvalidMultiValuePropertyOffset(start));
            }
            Ok(&data[start_index..end])
        })
        .collect()
}

/// Decoded properties of one node, keyed by property id.
#[derive(Clone, Default, Debug)]
pub struct PropertySet {
    values: BTreeMap<u16, PropertyValue>,
}

impl PropertySet {
    pub fn insert(&mut self, prop_id: u16, value: PropertyValue) {
        self.values.insert(prop_id, value);
    }

    pub fn get(&self, prop_id: u16) -> Option<&PropertyValue> {
        self.values.get(&prop_id)
    }

    pub fn contains(&self, prop_id: u16) -> bool {
        self.values.contains_key(&prop_id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyTag, &PropertyValue)> {
        self.values
            .iter()
            .map(|(&prop_id, value)| (PropertyTag::new(prop_id, value.prop_type()), value))
    }

    pub fn text(&self, prop_id: u16, code_page: u16) -> Option<String> {
        self.get(prop_id)?.to_text(code_page)
    }

    pub fn i32(&self, prop_id: u16) -> Option<i32> {
        self.get(prop_id)?.as_i32()
    }

    pub fn bool(&self, prop_id: u16) -> Option<bool> {
        self.get(prop_id)?.as_bool()
    }

    pub fn time(&self, prop_id: u16) -> Option<DateTime<Utc>> {
        self.get(prop_id)?.as_time()
    }

    pub fn binary(&self, prop_id: u16) -> Option<&[u8]> {
        self.get(prop_id)?.as_bytes()
    }
}

/// The property context of one node.
pub struct PropertyContext<'a> {
    pst: &'a PstFile,
    node: Node,
    heap: HeapNode,
    records: Vec<PropertyTreeRecord>,
}

impl<'a> PropertyContext<'a> {
    pub fn open(pst: &'a PstFile, node: Node) -> LtpResult<Self> {
        let heap = HeapNode::read(pst, &node)?;
        let client_signature = heap.header().client_signature();
        if client_signature != HeapNodeType::Properties {
            return Err(LtpError::InvalidHeapNodeTypeSignature(client_signature as u8));
        }

        let tree = HeapTree::new(&heap, heap.header().user_root())?;
        let header = tree.header();
        if header.key_size() != 2 {
            return Err(LtpError::InvalidHeapTreeKeySize(header.key_size()));
        }
        if header.entry_size() != 6 {
            return Err(LtpError::InvalidHeapTreeDataSize(header.entry_size()));
        }

        let records = tree
            .entries()?
            .iter()
            .map(PropertyTreeRecord::read)
            .collect::<LtpResult<Vec<_>>>()?;

        Ok(Self {
            pst,
            node,
            heap,
            records,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn records(&self) -> &[PropertyTreeRecord] {
        &self.records
    }

    /// Resolve one record: inline values first, then the heap, then the node's sub-nodes.
    pub fn read_value(&self, record: &PropertyTreeRecord) -> LtpResult<PropertyValue> {
        let prop_type = record.prop_type()?;
        match record.value()? {
            PropertyValueRecord::Small(value) if prop_type.is_inline() => {
                PropertyValue::from_inline(prop_type, value)
            }
            PropertyValueRecord::Small(0) => PropertyValue::read(prop_type, &[]),
            PropertyValueRecord::Small(value) => Err(LtpError::InvalidPropertyReference(value)),
            PropertyValueRecord::Heap(heap_id) => {
                PropertyValue::read(prop_type, self.heap.find_entry(heap_id)?)
            }
            PropertyValueRecord::Node(sub_node) => {
                let data = self.node.find_sub_node(self.pst, sub_node)?.read_data(self.pst)?;
                PropertyValue::read(prop_type, &data)
            }
        }
    }

    /// Byte size of a property's value without materializing sub-node data. `PtypObject`
    /// reports the size recorded next to its sub-node id.
    pub fn value_size(&self, prop_id: u16) -> LtpResult<Option<u64>> {
        let Some(record) = self.records.iter().find(|record| record.prop_id == prop_id) else {
            return Ok(None);
        };
        let prop_type = record.prop_type()?;
        if prop_type == PropertyType::Object {
            return Ok(match self.read_value(record)? {
                PropertyValue::Object(object) => Some(u64::from(object.size())),
                _ => None,
            });
        }

        let size = match record.value()? {
            PropertyValueRecord::Small(_) => prop_type.fixed_size().unwrap_or_default() as u64,
            PropertyValueRecord::Heap(heap_id) => self.heap.find_entry(heap_id)?.len() as u64,
            PropertyValueRecord::Node(sub_node) => {
                let node = self.node.find_sub_node(self.pst, sub_node)?;
                self.pst.block_decoder().data_size(node.data())?
            }
        };
        Ok(Some(size))
    }

    /// Decode every record, or only the ids in `prop_ids`. A record that cannot be decoded
    /// is left out of the set and reported, unless the failure is fatal for the whole file.
    pub fn read(&self, prop_ids: Option<&[u16]>) -> LtpResult<PropertySet> {
        let mut properties = PropertySet::default();
        for record in &self.records {
            if prop_ids.is_some_and(|prop_ids| !prop_ids.contains(&record.prop_id)) {
                continue;
            }

            match self.read_value(record) {
                Ok(value) => properties.insert(record.prop_id, value),
                Err(err) if !err.category().is_fatal() => {
                    self.pst
                        .diagnostics()
                        .record(Warning::UnresolvableProperty {
                            node: self.node.id(),
                            prop_id: record.prop_id,
                            reason: err.to_string(),
                        });
                }
                Err(err) => return Err(err),
            }
        }

        debug!(node = %self.node.id(), count = properties.len(), "read property context");
        Ok(properties)
    }

    /// Decode a single property if present.
    pub fn get(&self, prop_id: u16) -> LtpResult<Option<PropertyValue>> {
        self.records
            .iter()
            .find(|record| record.prop_id == prop_id)
            .map(|record| self.read_value(record))
            .transpose()
    }
}

/// [PropertyContext::open] followed by [PropertyContext::read].
pub fn read_properties(pst: &PstFile, node: Node) -> LtpResult<PropertySet> {
    PropertyContext::open(pst, node)?.read(None)
}
