use std::fmt;

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{CodedIndexType, ColumnKind, RowDefinition, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// A row of the `CustomAttribute` table (ECMA-335 II.22.10).
///
/// Equality and hashing are structural over the three columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CustomAttributeRaw {
    /// Member the attribute is attached to, a `HasCustomAttribute` coded index
    pub parent: Token,
    /// Attribute constructor, a `CustomAttributeType` coded index
    pub constructor: Token,
    /// `#Blob` index of the attribute value
    pub value: u32,
}

impl RowDefinition for CustomAttributeRaw {
    const TABLE: TableId = TableId::CustomAttribute;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* parent */      ColumnKind::Coded(CodedIndexType::HasCustomAttribute),
        /* type */        ColumnKind::Coded(CodedIndexType::CustomAttributeType),
        /* value */       ColumnKind::BlobIndex,
    ];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(CustomAttributeRaw {
            parent: layout.columns[0].read_token(parser)?,
            constructor: layout.columns[1].read_token(parser)?,
            value: layout.columns[2].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write_token(writer, self.parent)?;
        layout.columns[1].write_token(writer, self.constructor)?;
        layout.columns[2].write(writer, self.value)
    }
}

impl fmt::Display for CustomAttributeRaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:08X}, {:08X}, {:08X})",
            self.parent.value(),
            self.constructor.value(),
            self.value
        )
    }
}
