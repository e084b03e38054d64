use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{CodedIndexType, ColumnKind, RowDefinition, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// A row of the `MethodSpec` table (ECMA-335 II.22.29).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodSpecRaw {
    /// Generic method being instantiated, a `MethodDefOrRef` coded index
    pub method: Token,
    /// `#Blob` index of the instantiation signature
    pub instantiation: u32,
}

impl RowDefinition for MethodSpecRaw {
    const TABLE: TableId = TableId::MethodSpec;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* method */          ColumnKind::Coded(CodedIndexType::MethodDefOrRef),
        /* instantiation */   ColumnKind::BlobIndex,
    ];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(MethodSpecRaw {
            method: layout.columns[0].read_token(parser)?,
            instantiation: layout.columns[1].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write_token(writer, self.method)?;
        layout.columns[1].write(writer, self.instantiation)
    }
}
