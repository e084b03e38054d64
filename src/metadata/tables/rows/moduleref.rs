use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::tables::{ColumnKind, RowDefinition, TableId, TableLayout},
    Result,
};

/// A row of the `ModuleRef` table (ECMA-335 II.22.31).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleRefRaw {
    /// `#Strings` index of the module name
    pub name: u32,
}

impl RowDefinition for ModuleRefRaw {
    const TABLE: TableId = TableId::ModuleRef;
    const COLUMNS: &'static [ColumnKind] = &[ColumnKind::StringIndex];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(ModuleRefRaw {
            name: layout.columns[0].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write(writer, self.name)
    }
}
