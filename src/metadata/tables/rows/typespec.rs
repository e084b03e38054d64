use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::tables::{ColumnKind, RowDefinition, TableId, TableLayout},
    Result,
};

/// A row of the `TypeSpec` table (ECMA-335 II.22.39).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeSpecRaw {
    /// `#Blob` index of the type signature
    pub signature: u32,
}

impl RowDefinition for TypeSpecRaw {
    const TABLE: TableId = TableId::TypeSpec;
    const COLUMNS: &'static [ColumnKind] = &[ColumnKind::BlobIndex];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(TypeSpecRaw {
            signature: layout.columns[0].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write(writer, self.signature)
    }
}
