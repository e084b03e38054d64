use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{CodedIndexType, ColumnKind, RowDefinition, TableId, TableLayout},
        token::Token,
    },
    Result,
};

/// A row of the `TypeRef` table (ECMA-335 II.22.38).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeRefRaw {
    /// Scope declaring the type, a `ResolutionScope` coded index
    pub resolution_scope: Token,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowDefinition for TypeRefRaw {
    const TABLE: TableId = TableId::TypeRef;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* resolution_scope */  ColumnKind::Coded(CodedIndexType::ResolutionScope),
        /* type_name */         ColumnKind::StringIndex,
        /* type_namespace */    ColumnKind::StringIndex,
    ];

    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(TypeRefRaw {
            resolution_scope: layout.columns[0].read_token(parser)?,
            type_name: layout.columns[1].read(parser)?,
            type_namespace: layout.columns[2].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write_token(writer, self.resolution_scope)?;
        layout.columns[1].write(writer, self.type_name)?;
        layout.columns[2].write(writer, self.type_namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{MetadataTable, TableInfo};

    #[test]
    fn crafted_short() {
        let data = vec![
            0x02, 0x02, // resolution_scope
            0x03, 0x03, // type_name
            0x04, 0x04, // type_namespace
        ];

        let info = TableInfo::new(&[(TableId::TypeRef, 1)], false, false, false);
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, &info).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.resolution_scope, Token::new(0x80 | 0x2300_0000));
        assert_eq!(row.type_name, 0x0303);
        assert_eq!(row.type_namespace, 0x0404);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x02, 0x02, 0x02, 0x02, // resolution_scope
            0x03, 0x03, 0x03, 0x03, // type_name
            0x04, 0x04, 0x04, 0x04, // type_namespace
        ];

        let info = TableInfo::new(
            &[(TableId::AssemblyRef, u16::MAX as u32 + 2)],
            true,
            false,
            false,
        );
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, &info).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.resolution_scope, Token::new(0x80_8080 | 0x2300_0000));
        assert_eq!(row.type_name, 0x0303_0303);
        assert_eq!(row.type_namespace, 0x0404_0404);
    }
}
