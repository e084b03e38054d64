//! Physical column layout of metadata table rows.
//!
//! A [`TableLayout`] is derived from a [`TableInfo`] for one table and fixes the width of every
//! column. Rows read and write themselves column by column through the layout, so the same row
//! type serves images with small and large heaps and tables.

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{CodedIndexType, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The logical kind of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Fixed width integer of the given byte size
    Fixed(u8),
    /// Index into `#Strings`
    StringIndex,
    /// Index into `#GUID`
    GuidIndex,
    /// Index into `#Blob`
    BlobIndex,
    /// Simple index into a single table
    Table(TableId),
    /// Coded index over several candidate tables
    Coded(CodedIndexType),
}

/// A column together with its physical size under a given [`TableInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    /// What the column stores
    pub kind: ColumnKind,
    /// Physical width in bytes
    pub size: u8,
}

impl ColumnLayout {
    /// Read the raw column value, widened to `u32`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] if the column runs past the end of the data.
    pub fn read(&self, parser: &mut Parser) -> Result<u32> {
        match self.size {
            1 => Ok(u32::from(parser.read_le::<u8>()?)),
            2 => Ok(u32::from(parser.read_le::<u16>()?)),
            _ => parser.read_le::<u32>(),
        }
    }

    /// Read a column that references a table row and return it as a token.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`], or [`crate::Error::InvalidCodedIndexTarget`]
    /// for coded indices with an unassigned tag. Non-reference columns are [`crate::Error::Malformed`].
    pub fn read_token(&self, parser: &mut Parser) -> Result<Token> {
        let value = self.read(parser)?;
        match self.kind {
            ColumnKind::Coded(coded) => coded.decode(value),
            ColumnKind::Table(table) => Ok(Token::from_parts(table, value)),
            _ => Err(malformed_error!("Column {:?} does not reference a table", self.kind)),
        }
    }

    /// Write a raw column value.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueOutOfRange`] if `value` does not fit the column.
    pub fn write(&self, writer: &mut Writer, value: u32) -> Result<()> {
        match self.size {
            1 => {
                let narrow = u8::try_from(value)
                    .map_err(|_| crate::Error::ValueOutOfRange(i64::from(value)))?;
                writer.write_le::<u8>(narrow);
                Ok(())
            }
            2 => writer.write_le_dyn(value, false),
            _ => writer.write_le_dyn(value, true),
        }
    }

    /// Write a token into a reference column.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCodedIndexTarget`] if the token's table doesn't fit the
    /// column, [`crate::Error::ValueOutOfRange`] if the packed value doesn't fit its width.
    pub fn write_token(&self, writer: &mut Writer, token: Token) -> Result<()> {
        let value = match self.kind {
            ColumnKind::Coded(coded) => coded.encode(token)?,
            ColumnKind::Table(table) => {
                if !token.is_null() && token.table_id() != Some(table) {
                    return Err(crate::Error::InvalidCodedIndexTarget {
                        coded: "Table",
                        table: token.table_id(),
                    });
                }
                token.row()
            }
            _ => return Err(malformed_error!("Column {:?} does not reference a table", self.kind)),
        };
        self.write(writer, value)
    }
}

/// Physical layout of one metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// The table this layout describes
    pub table: TableId,
    /// Columns in storage order
    pub columns: Vec<ColumnLayout>,
}

impl TableLayout {
    /// Size of one row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.columns.iter().map(|column| u32::from(column.size)).sum()
    }
}

impl TableInfo {
    /// Physical size of a column of `kind`.
    #[must_use]
    pub fn column_size(&self, kind: ColumnKind) -> u8 {
        match kind {
            ColumnKind::Fixed(size) => size,
            ColumnKind::StringIndex => self.str_bytes(),
            ColumnKind::GuidIndex => self.guid_bytes(),
            ColumnKind::BlobIndex => self.blob_bytes(),
            ColumnKind::Table(table) => self.table_index_bytes(table),
            ColumnKind::Coded(coded) => self.coded_index_bytes(coded),
        }
    }

    /// Derive the layout of `table` whose columns are `columns`.
    #[must_use]
    pub fn layout(&self, table: TableId, columns: &[ColumnKind]) -> TableLayout {
        TableLayout {
            table,
            columns: columns
                .iter()
                .map(|kind| ColumnLayout {
                    kind: *kind,
                    size: self.column_size(*kind),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const COLUMNS: &[ColumnKind] = &[
        ColumnKind::Fixed(4),
        ColumnKind::StringIndex,
        ColumnKind::Coded(CodedIndexType::TypeDefOrRef),
        ColumnKind::Table(TableId::Field),
    ];

    #[test]
    fn row_size_follows_info() {
        let small = TableInfo::new(&[], false, false, false).layout(TableId::TypeDef, COLUMNS);
        assert_eq!(small.row_size(), 10);

        let large = TableInfo::new(&[(TableId::Field, 0x10000)], true, false, false)
            .layout(TableId::TypeDef, COLUMNS);
        assert_eq!(large.row_size(), 16);
    }

    #[test]
    fn token_columns() {
        let layout = TableInfo::new(&[], false, false, false).layout(TableId::TypeDef, COLUMNS);
        let token = Token::from_parts(TableId::TypeRef, 5);

        let mut writer = Writer::new();
        layout.columns[2].write_token(&mut writer, token).unwrap();
        layout.columns[3]
            .write_token(&mut writer, Token::from_parts(TableId::Field, 7))
            .unwrap();
        assert_eq!(writer.as_slice(), &[0x15, 0x00, 0x07, 0x00]);

        let data = writer.into_inner();
        let mut parser = Parser::new(&data);
        assert_eq!(layout.columns[2].read_token(&mut parser).unwrap(), token);
        assert_eq!(
            layout.columns[3].read_token(&mut parser).unwrap(),
            Token::from_parts(TableId::Field, 7)
        );

        let mut writer = Writer::new();
        let result = layout.columns[3].write_token(&mut writer, token);
        assert!(matches!(result, Err(Error::InvalidCodedIndexTarget { .. })));
    }
}
