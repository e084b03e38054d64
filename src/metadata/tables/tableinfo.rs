use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::parser::Parser,
    metadata::tables::{tableid::TABLE_SLOTS, CodedIndexType, TableId},
    Result,
};

/// Row count and index width of a single table.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits required to store any row number of this table
    pub bits: u8,
    /// Whether a simple index into this table needs 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Create the row info for a table with `rows` rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Row counts and heap size flags of a metadata image.
///
/// All physical column widths derive from this value: simple table indices, heap indices and
/// coded indices. It is computed once per image, never changes afterward and is shared as
/// [`TableInfoRef`].
#[derive(Clone, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared, immutable [`TableInfo`].
pub type TableInfoRef = Arc<TableInfo>;

impl Default for TableInfo {
    fn default() -> Self {
        TableInfo::new(&[], false, false, false)
    }
}

impl TableInfo {
    /// Build the layout information from explicit row counts and heap size flags.
    #[must_use]
    pub fn new(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_guid: bool,
        large_blob: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TABLE_SLOTS],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for (table, rows) in valid_tables {
            table_info.rows[*table as usize] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Parse the header of a `#~` stream: heap size flags, the valid table bit vector and the
    /// row count of every present table (ECMA-335 II.24.2.6).
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the header is cut short, or
    /// [`crate::Error::Malformed`] if it announces a table this crate doesn't know.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut parser = Parser::new(data);

        parser.advance_by(6)?; // reserved, major, minor
        let heap_size_flags = parser.read_le::<u8>()?;
        parser.advance_by(1)?;
        let valid = parser.read_le::<u64>()?;
        let _sorted = parser.read_le::<u64>()?;

        let mut valid_tables = Vec::new();
        for bit in 0..64u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let Some(table) = TableId::from_repr(bit) else {
                return Err(malformed_error!("Unknown table present - 0x{:02x}", bit));
            };

            let row_count = parser.read_le::<u32>()?;
            if row_count > 0 {
                valid_tables.push((table, row_count));
            }
        }

        Ok(TableInfo::new(
            &valid_tables,
            heap_size_flags & 1 == 1,
            heap_size_flags & 2 == 2,
            heap_size_flags & 4 == 4,
        ))
    }

    /// Row information of `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Iterator over all tables that contain rows.
    pub fn present_tables(&self) -> impl Iterator<Item = (TableId, u32)> + '_ {
        TableId::iter()
            .map(|table| (table, self.get(table).rows))
            .filter(|(_, rows)| *rows > 0)
    }

    /// Whether a simple index into `table` needs 4 bytes.
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// Whether `#Strings` indices need 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Whether `#GUID` indices need 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Whether `#Blob` indices need 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Bits required by a coded index of this kind: tag bits plus the widest candidate row.
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Width of a coded index column of this kind.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_coded_index_size(&self, coded_index_type: CodedIndexType) -> u8 {
        let max_bits = coded_index_type
            .candidates()
            .map(|table| self.rows[table as usize].bits)
            .max()
            .unwrap_or(1);

        max_bits + coded_index_type.tag_bits() as u8
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let size = self.calculate_coded_index_size(coded_index);
            self.coded_indexes[coded_index as usize] = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::writer::Writer;

    #[test]
    fn small_layout() {
        let info = TableInfo::new(
            &[(TableId::TypeDef, 10), (TableId::MethodDef, 100)],
            false,
            false,
            false,
        );

        assert_eq!(info.get(TableId::TypeDef).rows, 10);
        assert_eq!(info.table_index_bytes(TableId::MethodDef), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 2);
        assert_eq!(info.str_bytes(), 2);
        assert_eq!(info.blob_bytes(), 2);
    }

    #[test]
    fn coded_index_width_threshold() {
        // TypeDefOrRef has 2 tag bits, so 2^14 - 1 rows still fit into 16 bits
        let info = TableInfo::new(&[(TableId::TypeRef, (1 << 14) - 1)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

        let info = TableInfo::new(&[(TableId::TypeRef, 1 << 14)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasFieldMarshal), 2);
        assert_eq!(info.table_index_bytes(TableId::TypeRef), 2);
    }

    #[test]
    fn large_heaps() {
        let info = TableInfo::new(&[], true, true, true);
        assert_eq!(info.str_bytes(), 4);
        assert_eq!(info.guid_bytes(), 4);
        assert_eq!(info.blob_bytes(), 4);
    }

    #[test]
    fn read_header() {
        let mut writer = Writer::new();
        writer.write_le::<u32>(0); // reserved
        writer.write_le::<u8>(2); // major
        writer.write_le::<u8>(0); // minor
        writer.write_le::<u8>(0x04); // heap sizes
        writer.write_le::<u8>(1); // reserved
        writer.write_le::<u64>((1 << 0x01) | (1 << 0x02)); // TypeRef, TypeDef
        writer.write_le::<u64>(0);
        writer.write_le::<u32>(3);
        writer.write_le::<u32>(70_000);

        let info = TableInfo::read(writer.as_slice()).unwrap();
        assert_eq!(info.get(TableId::TypeRef).rows, 3);
        assert_eq!(info.get(TableId::TypeDef).rows, 70_000);
        assert!(info.is_large(TableId::TypeDef));
        assert!(info.is_large_blob());
        assert!(!info.is_large_str());
        assert_eq!(
            info.present_tables().collect::<Vec<_>>(),
            vec![(TableId::TypeRef, 3), (TableId::TypeDef, 70_000)]
        );
    }
}
