//! ## [Table Context (TC)](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/5e48be0d-a75a-4918-a277-50408ff96740)

use byteorder::{LittleEndian, ReadBytesExt};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

use super::{heap::*, prop_context::*, prop_type::*, tree::*, *};
use crate::{
    diagnostics::Warning,
    ndb::node::Node,
    PstFile,
};

/// `dwRowID` column, always at offset 0 of a row.
pub const LTP_ROW_ID_PROP_ID: u16 = 0x67F2;

/// [TCOLDESC](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/3a2f63cf-bb40-4559-910c-e55ec43d9cbb)
#[derive(Clone, Copy, Debug)]
pub struct TableColumnDescriptor {
    tag: u32,
    offset: u16,
    size: u8,
    existence_bit: u8,
}

impl TableColumnDescriptor {
    pub fn prop_id(&self) -> u16 {
        (self.tag >> 16) as u16
    }

    pub fn prop_type(&self) -> LtpResult<PropertyType> {
        PropertyType::try_from(self.tag as u16)
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn existence_bit(&self) -> u8 {
        self.existence_bit
    }
}

/// [TCINFO](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-pst/45b3a0c5-d6d6-4e02-aebf-13766ff693f0)
#[derive(Clone, Debug)]
pub struct TableContextInfo {
    group_ends: [u16; 4],
    row_index: HeapId,
    rows: u32,
    columns: Vec<TableColumnDescriptor>,
}

impl TableContextInfo {
    pub fn read(mut f: &[u8]) -> LtpResult<Self> {
        // bType
        let signature = f.read_u8()?;
        if signature != HeapNodeType::Table as u8 {
            return Err(LtpError::InvalidTableSignature(signature));
        }

        // cCols
        let column_count = f.read_u8()?;

        // rgib: ends of the 4/8-byte, 2-byte, 1-byte and existence bitmap groups
        let mut group_ends = [0_u16; 4];
        for end in group_ends.iter_mut() {
            *end = f.read_u16::<LittleEndian>()?;
        }
        if group_ends.windows(2).any(|pair| pair[0] > pair[1])
            || usize::from(group_ends[3] - group_ends[2]) < usize::from(column_count).div_ceil(8)
        {
            return Err(LtpError::InvalidTableGroupOffsets(group_ends));
        }

        // hidRowIndex
        let row_index = HeapId::read(&mut f)?;

        // hnidRows
        let rows = f.read_u32::<LittleEndian>()?;

        // hidIndex
        f.read_u32::<LittleEndian>()?;

        // rgTCOLDESC
        let columns = (0..column_count)
            .map(|_| {
                let tag = f.read_u32::<LittleEndian>()?;
                let offset = f.read_u16::<LittleEndian>()?;
                let size = f.read_u8()?;
                let existence_bit = f.read_u8()?;

                if usize::from(offset) + usize::from(size) > usize::from(group_ends[2])
                    || existence_bit >= column_count
                {
                    return Err(LtpError::InvalidTableColumn { tag, offset, size });
                }

                Ok(TableColumnDescriptor {
                    tag,
                    offset,
                    size,
                    existence_bit,
                })
            })
            .collect::<LtpResult<Vec<_>>>()?;

        Ok(Self {
            group_ends,
            row_index,
            rows,
            columns,
        })
    }

    /// `rgib[TCI_bm]`: the size of one row.
    pub fn row_size(&self) -> usize {
        usize::from(self.group_ends[3])
    }

    pub fn columns(&self) -> &[TableColumnDescriptor] {
        &self.columns
    }

    fn cell_exists(&self, row: &[u8], column: &TableColumnDescriptor) -> bool {
        let bit = usize::from(column.existence_bit);
        row.get(usize::from(self.group_ends[2]) + bit / 8)
            .is_some_and(|byte| byte & (1 << (7 - bit % 8)) != 0)
    }
}

/// One decoded row: its `dwRowID` and the cells that exist in it.
#[derive(Clone, Debug)]
pub struct TableRow {
    id: u32,
    values: PropertySet,
}

impl TableRow {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn values(&self) -> &PropertySet {
        &self.values
    }
}

pub struct TableContext<'a> {
    pst: &'a PstFile,
    node: Node,
    heap: HeapNode,
    info: TableContextInfo,
    row_index: BTreeMap<u32, usize>,
    rows: Vec<Vec<u8>>,
}

impl<'a> TableContext<'a> {
    pub fn open(pst: &'a PstFile, node: Node) -> LtpResult<Self> {
        let heap = HeapNode::read(pst, &node)?;
        let client_signature = heap.header().client_signature();
        if client_signature != HeapNodeType::Table {
            return Err(LtpError::InvalidHeapNodeTypeSignature(client_signature as u8));
        }

        let info = TableContextInfo::read(heap.user_root()?)?;

        let row_index = if info.row_index.is_empty() {
            BTreeMap::new()
        } else {
            HeapTree::new(&heap, info.row_index)?
                .entries()?
                .into_iter()
                .map(|entry| (entry.key_value() as u32, entry.data_value() as usize))
                .collect()
        };

        let rows = Self::read_rows_matrix(pst, &node, &heap, &info)?;
        debug!(node = %node.id(), rows = rows.len(), columns = info.columns.len(), "read table context");

        Ok(Self {
            pst,
            node,
            heap,
            info,
            row_index,
            rows,
        })
    }

    /// Rows never span blocks, so each block of the matrix holds `len / row_size` whole rows and
    /// any tail is padding.
    fn read_rows_matrix(
        pst: &PstFile,
        node: &Node,
        heap: &HeapNode,
        info: &TableContextInfo,
    ) -> LtpResult<Vec<Vec<u8>>> {
        let row_size = info.row_size();
        if info.rows == 0 || row_size == 0 {
            return Ok(Vec::new());
        }

        let blocks: Vec<Arc<Vec<u8>>> = match PropertyValueRecord::new(PropertyType::Binary, info.rows)
        {
            PropertyValueRecord::Heap(heap_id) => vec![Arc::new(heap.find_entry(heap_id)?.to_vec())],
            PropertyValueRecord::Node(sub_node) => {
                node.find_sub_node(pst, sub_node)?.read_data_tree(pst)?
            }
            PropertyValueRecord::Small(value) => {
                return Err(LtpError::InvalidPropertyReference(value))
            }
        };

        Ok(blocks
            .iter()
            .flat_map(|block| block.chunks_exact(row_size).map(<[u8]>::to_vec))
            .collect())
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn info(&self) -> &TableContextInfo {
        &self.info
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// `dwRowID` of the row at `index` in the row matrix.
    pub fn row_id(&self, index: usize) -> LtpResult<u32> {
        let mut row = self
            .rows
            .get(index)
            .ok_or(LtpError::InvalidTableRowIndex(index))?
            .as_slice();
        Ok(row.read_u32::<LittleEndian>()?)
    }

    /// Position of the row `row_id` in the row matrix, through the row index BTH.
    pub fn find_row(&self, row_id: u32) -> LtpResult<usize> {
        self.row_index
            .get(&row_id)
            .copied()
            .filter(|&index| index < self.rows.len())
            .ok_or(LtpError::TableRowNotFound(row_id))
    }

    /// Decode one cell. `None` means the column is absent from the table or the cell's
    /// existence bit is clear.
    pub fn read_cell(&self, index: usize, prop_id: u16) -> LtpResult<Option<PropertyValue>> {
        let row = self
            .rows
            .get(index)
            .ok_or(LtpError::InvalidTableRowIndex(index))?;
        let Some(column) = self
            .info
            .columns
            .iter()
            .find(|column| column.prop_id() == prop_id)
        else {
            return Ok(None);
        };
        if !self.info.cell_exists(row, column) {
            return Ok(None);
        }
        self.read_column(row, column).map(Some)
    }

    fn read_column(&self, row: &[u8], column: &TableColumnDescriptor) -> LtpResult<PropertyValue> {
        let prop_type = column.prop_type()?;
        let start = usize::from(column.offset);
        let cell = &row[start..start + usize::from(column.size)];

        let stored_inline = matches!(
            prop_type.fixed_size(),
            Some(size) if size <= 8 && size == cell.len()
        ) && !matches!(prop_type, PropertyType::Object);

        if stored_inline {
            return PropertyValue::read(prop_type, cell);
        }

        // everything else is a 4-byte HNID
        let hnid = (&cell[..cell.len().min(4)]).read_u32::<LittleEndian>()?;
        match PropertyValueRecord::new(prop_type, hnid) {
            PropertyValueRecord::Small(0) => PropertyValue::read(prop_type, &[]),
            PropertyValueRecord::Small(value) => Err(LtpError::InvalidPropertyReference(value)),
            PropertyValueRecord::Heap(heap_id) => {
                PropertyValue::read(prop_type, self.heap.find_entry(heap_id)?)
            }
            PropertyValueRecord::Node(sub_node) => {
                let data = self
                    .node
                    .find_sub_node(self.pst, sub_node)?
                    .read_data(self.pst)?;
                PropertyValue::read(prop_type, &data)
            }
        }
    }

    /// Decode the row at `index`. Cells that cannot be decoded are reported and left out.
    pub fn read_row(&self, index: usize, prop_ids: Option<&[u16]>) -> LtpResult<TableRow> {
        let id = self.row_id(index)?;
        let row = &self.rows[index];

        let mut values = PropertySet::default();
        for column in &self.info.columns {
            let prop_id = column.prop_id();
            if prop_ids.is_some_and(|prop_ids| !prop_ids.contains(&prop_id))
                || !self.info.cell_exists(row, column)
            {
                continue;
            }

            match self.read_column(row, column) {
                Ok(value) => values.insert(prop_id, value),
                Err(err) if !err.category().is_fatal() => {
                    self.pst
                        .diagnostics()
                        .record(Warning::UnresolvableProperty {
                            node: self.node.id(),
                            prop_id,
                            reason: err.to_string(),
                        });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(TableRow { id, values })
    }

    /// Every row in matrix order.
    pub fn read_rows(&self, prop_ids: Option<&[u16]>) -> LtpResult<Vec<TableRow>> {
        (0..self.rows.len())
            .map(|index| self.read_row(index, prop_ids))
            .collect()
    }
}
