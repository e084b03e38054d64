use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::tables::{ColumnKind, RowDefinition, TableId, TableLayout},
    Result,
};

/// A row of the `AssemblyRef` table (ECMA-335 II.22.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssemblyRefRaw {
    /// Major version
    pub major_version: u16,
    /// Minor version
    pub minor_version: u16,
    /// Build number
    pub build_number: u16,
    /// Revision number
    pub revision_number: u16,
    /// `AssemblyFlags`
    pub flags: u32,
    /// `#Blob` index of the public key or its token
    pub public_key_or_token: u32,
    /// `#Strings` index of the assembly name
    pub name: u32,
    /// `#Strings` index of the culture
    pub culture: u32,
    /// `#Blob` index of the hash value
    pub hash_value: u32,
}

impl RowDefinition for AssemblyRefRaw {
    const TABLE: TableId = TableId::AssemblyRef;

    #[rustfmt::skip]
    const COLUMNS: &'static [ColumnKind] = &[
        /* major_version */         ColumnKind::Fixed(2),
        /* minor_version */         ColumnKind::Fixed(2),
        /* build_number */          ColumnKind::Fixed(2),
        /* revision_number */       ColumnKind::Fixed(2),
        /* flags */                 ColumnKind::Fixed(4),
        /* public_key_or_token */   ColumnKind::BlobIndex,
        /* name */                  ColumnKind::StringIndex,
        /* culture */               ColumnKind::StringIndex,
        /* hash_value */            ColumnKind::BlobIndex,
    ];

    #[allow(clippy::cast_possible_truncation)]
    fn read_row(parser: &mut Parser, layout: &TableLayout) -> Result<Self> {
        Ok(AssemblyRefRaw {
            major_version: layout.columns[0].read(parser)? as u16,
            minor_version: layout.columns[1].read(parser)? as u16,
            build_number: layout.columns[2].read(parser)? as u16,
            revision_number: layout.columns[3].read(parser)? as u16,
            flags: layout.columns[4].read(parser)?,
            public_key_or_token: layout.columns[5].read(parser)?,
            name: layout.columns[6].read(parser)?,
            culture: layout.columns[7].read(parser)?,
            hash_value: layout.columns[8].read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer, layout: &TableLayout) -> Result<()> {
        layout.columns[0].write(writer, u32::from(self.major_version))?;
        layout.columns[1].write(writer, u32::from(self.minor_version))?;
        layout.columns[2].write(writer, u32::from(self.build_number))?;
        layout.columns[3].write(writer, u32::from(self.revision_number))?;
        layout.columns[4].write(writer, self.flags)?;
        layout.columns[5].write(writer, self.public_key_or_token)?;
        layout.columns[6].write(writer, self.name)?;
        layout.columns[7].write(writer, self.culture)?;
        layout.columns[8].write(writer, self.hash_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{write_table, MetadataTable, TableInfo};

    #[test]
    fn crafted_short() {
        let data = vec![
            0x04, 0x00, // major_version
            0x02, 0x00, // minor_version
            0x00, 0x00, // build_number
            0x01, 0x00, // revision_number
            0x00, 0x00, 0x00, 0x00, // flags
            0x05, 0x00, // public_key_or_token
            0x06, 0x00, // name
            0x00, 0x00, // culture
            0x00, 0x00, // hash_value
        ];

        let info = TableInfo::new(&[(TableId::AssemblyRef, 1)], false, false, false);
        let table = MetadataTable::<AssemblyRefRaw>::new(&data, 1, &info).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(
            (row.major_version, row.minor_version, row.build_number, row.revision_number),
            (4, 2, 0, 1)
        );
        assert_eq!(row.public_key_or_token, 5);
        assert_eq!(row.name, 6);
        assert_eq!(write_table(&[row], &info).unwrap(), data);
    }
}
