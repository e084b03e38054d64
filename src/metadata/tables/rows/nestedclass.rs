use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{ColumnKind, RowDefinition, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// A row of the `NestedClass` table (ECMA-335 II.22.32).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NestedClassRaw {
    /// The nested `TypeDef`
    pub nested_class: Token,
    /// The enclosing `TypeDef`
    pub enclosing_class: Token,
}

impl RowDefinition for NestedClassRaw {
    const TABLE: TableId = TableId::NestedClass;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* nested_class */      ColumnKind::Table(TableId::TypeDef),
        /* enclosing_class */   ColumnKind::Table(TableId::TypeDef),
    ];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(NestedClassRaw {
            nested_class: layout.columns[0].read_token(parser)?,
            enclosing_class: layout.columns[1].read_token(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write_token(writer, self.nested_class)?;
        layout.columns[1].write_token(writer, self.enclosing_class)
    }
}
