use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{CodedIndexType, ColumnKind, RowDefinition, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// A row of the `MemberRef` table (ECMA-335 II.22.25).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemberRefRaw {
    /// Owner of the member, a `MemberRefParent` coded index
    pub class: Token,
    /// `#Strings` index of the member name
    pub name: u32,
    /// `#Blob` index of the method or field signature
    pub signature: u32,
}

impl RowDefinition for MemberRefRaw {
    const TABLE: TableId = TableId::MemberRef;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* class */       ColumnKind::Coded(CodedIndexType::MemberRefParent),
        /* name */        ColumnKind::StringIndex,
        /* signature */   ColumnKind::BlobIndex,
    ];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(MemberRefRaw {
            class: layout.columns[0].read_token(parser)?,
            name: layout.columns[1].read(parser)?,
            signature: layout.columns[2].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write_token(writer, self.class)?;
        layout.columns[1].write(writer, self.name)?;
        layout.columns[2].write(writer, self.signature)
    }
}
