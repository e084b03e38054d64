//! # Coded Index Types Module
//!
//! Coded indices pack a table discriminant and a row number into a single column value: the low
//! `tag_bits` bits select one of an ordered list of candidate tables, the remaining bits carry
//! the 1-based row. A row of `0` is the null reference for every coded index kind.
//!
//! The physical width of a coded index column is 2 bytes unless one of the candidate tables
//! holds too many rows to fit into `16 - tag_bits` bits, see
//! [`crate::metadata::tables::TableInfo::coded_index_bytes`].
//!
//! ## References
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - Section II.24.2.6

use strum::{EnumCount, EnumIter, IntoStaticStr};

use crate::{
    file::{parser::Parser, writer::Writer},
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Error, Result,
};

/// All coded index kinds defined in ECMA-335 II.24.2.6.
///
/// Each kind describes an ordered list of candidate tables; a table's position in that list is
/// its tag. Some kinds reserve tag values that no table uses, those positions are `None`.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount, IntoStaticStr)]
#[repr(usize)]
pub enum CodedIndexType {
    /// `TypeDef`, `TypeRef` or `TypeSpec`
    TypeDefOrRef,
    /// `Field`, `Param` or `Property`
    HasConstant,
    /// Any table that can carry a custom attribute
    HasCustomAttribute,
    /// `Field` or `Param`
    HasFieldMarshal,
    /// `TypeDef`, `MethodDef` or `Assembly`
    HasDeclSecurity,
    /// Owner of a `MemberRef`
    MemberRefParent,
    /// `Event` or `Property`
    HasSemantics,
    /// `MethodDef` or `MemberRef`
    MethodDefOrRef,
    /// `Field` or `MethodDef`
    MemberForwarded,
    /// `File`, `AssemblyRef` or `ExportedType`
    Implementation,
    /// Constructor of a custom attribute; only tags 2 and 3 are assigned
    CustomAttributeType,
    /// Scope of a `TypeRef`
    ResolutionScope,
    /// `TypeDef` or `MethodDef`
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// The ordered candidate tables of this coded index. The index of a table is its tag.
    #[must_use]
    pub fn tables(&self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexType::TypeDefOrRef => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasConstant => &[
                Some(TableId::Field),
                Some(TableId::Param),
                Some(TableId::Property),
            ],
            CodedIndexType::HasCustomAttribute => &[
                Some(TableId::MethodDef),
                Some(TableId::Field),
                Some(TableId::TypeRef),
                Some(TableId::TypeDef),
                Some(TableId::Param),
                Some(TableId::InterfaceImpl),
                Some(TableId::MemberRef),
                Some(TableId::Module),
                // 'Permission' in the standard, no such table exists
                Some(TableId::DeclSecurity),
                Some(TableId::Property),
                Some(TableId::Event),
                Some(TableId::StandAloneSig),
                Some(TableId::ModuleRef),
                Some(TableId::TypeSpec),
                Some(TableId::Assembly),
                Some(TableId::AssemblyRef),
                Some(TableId::File),
                Some(TableId::ExportedType),
                Some(TableId::ManifestResource),
                Some(TableId::GenericParam),
                Some(TableId::GenericParamConstraint),
                Some(TableId::MethodSpec),
            ],
            CodedIndexType::HasFieldMarshal => &[Some(TableId::Field), Some(TableId::Param)],
            CodedIndexType::HasDeclSecurity => &[
                Some(TableId::TypeDef),
                Some(TableId::MethodDef),
                Some(TableId::Assembly),
            ],
            CodedIndexType::MemberRefParent => &[
                Some(TableId::TypeDef),
                Some(TableId::TypeRef),
                Some(TableId::ModuleRef),
                Some(TableId::MethodDef),
                Some(TableId::TypeSpec),
            ],
            CodedIndexType::HasSemantics => &[Some(TableId::Event), Some(TableId::Property)],
            CodedIndexType::MethodDefOrRef => &[Some(TableId::MethodDef), Some(TableId::MemberRef)],
            CodedIndexType::MemberForwarded => &[Some(TableId::Field), Some(TableId::MethodDef)],
            CodedIndexType::Implementation => &[
                Some(TableId::File),
                Some(TableId::AssemblyRef),
                Some(TableId::ExportedType),
            ],
            CodedIndexType::CustomAttributeType => &[
                None,
                None,
                Some(TableId::MethodDef),
                Some(TableId::MemberRef),
                None,
            ],
            CodedIndexType::ResolutionScope => &[
                Some(TableId::Module),
                Some(TableId::ModuleRef),
                Some(TableId::AssemblyRef),
                Some(TableId::TypeRef),
            ],
            CodedIndexType::TypeOrMethodDef => &[Some(TableId::TypeDef), Some(TableId::MethodDef)],
        }
    }

    /// Iterator over the tables this coded index can reference.
    pub fn candidates(&self) -> impl Iterator<Item = TableId> {
        self.tables().iter().filter_map(|table| *table)
    }

    /// Number of low bits holding the tag, `ceil(log2(candidate slots))`.
    #[must_use]
    pub fn tag_bits(&self) -> u32 {
        let slots = self.tables().len() as u32;
        u32::BITS - (slots - 1).leading_zeros()
    }

    /// Human readable name of this coded index kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    fn invalid_target(&self, table: Option<TableId>) -> Error {
        Error::InvalidCodedIndexTarget {
            coded: self.name(),
            table,
        }
    }

    /// Split a raw coded index value into a token.
    ///
    /// A row of `0` yields [`Token::NULL`] regardless of the tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCodedIndexTarget`] if the tag selects no table, or
    /// [`crate::Error::ValueOutOfRange`] if the row does not fit the 24 row bits of a token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dotgraft::metadata::tables::{CodedIndexType, TableId};
    /// use dotgraft::metadata::token::Token;
    ///
    /// let token = CodedIndexType::CustomAttributeType.decode(0x0303)?;
    /// assert_eq!(token, Token::from_parts(TableId::MemberRef, 96));
    /// # Ok::<(), dotgraft::Error>(())
    /// ```
    pub fn decode(&self, value: u32) -> Result<Token> {
        let tag_bits = self.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;
        let row = value >> tag_bits;

        if row == 0 {
            return Ok(Token::NULL);
        }
        if row > Token::MAX_ROW {
            return Err(Error::ValueOutOfRange(i64::from(row)));
        }

        match self.tables().get(tag).copied().flatten() {
            Some(table) => Ok(Token::from_parts(table, row)),
            None => Err(self.invalid_target(None)),
        }
    }

    /// Pack a token into a raw coded index value. The null token encodes as `0`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCodedIndexTarget`] if the token's table is not a
    /// candidate of this coded index.
    pub fn encode(&self, token: Token) -> Result<u32> {
        if token.is_null() {
            return Ok(0);
        }

        let table = token.table_id();
        let tag = self
            .tables()
            .iter()
            .position(|candidate| candidate.is_some() && *candidate == table)
            .ok_or_else(|| self.invalid_target(table))?;

        let tag_bits = self.tag_bits();
        if u64::from(token.row()) << tag_bits > u64::from(u32::MAX) {
            return Err(Error::ValueOutOfRange(i64::from(token.row())));
        }

        Ok((token.row() << tag_bits) | tag as u32)
    }

    /// Read a coded index column sized according to `info`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedData`] or [`crate::Error::InvalidCodedIndexTarget`].
    pub fn read(&self, parser: &mut Parser, info: &TableInfo) -> Result<Token> {
        let value = parser.read_le_dyn(info.coded_index_bytes(*self) == 4)?;
        self.decode(value)
    }

    /// Write a coded index column sized according to `info`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidCodedIndexTarget`] if the token's table is not a
    /// candidate, [`crate::Error::ValueOutOfRange`] if the value does not fit the column.
    pub fn write(&self, writer: &mut Writer, token: Token, info: &TableInfo) -> Result<()> {
        let value = self.encode(token)?;
        writer.write_le_dyn(value, info.coded_index_bytes(*self) == 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn tag_bits() {
        assert_eq!(CodedIndexType::TypeDefOrRef.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasConstant.tag_bits(), 2);
        assert_eq!(CodedIndexType::HasCustomAttribute.tag_bits(), 5);
        assert_eq!(CodedIndexType::HasFieldMarshal.tag_bits(), 1);
        assert_eq!(CodedIndexType::MemberRefParent.tag_bits(), 3);
        assert_eq!(CodedIndexType::CustomAttributeType.tag_bits(), 3);
        assert_eq!(CodedIndexType::ResolutionScope.tag_bits(), 2);
        assert_eq!(CodedIndexType::TypeOrMethodDef.tag_bits(), 1);
    }

    #[test]
    fn round_trip_every_candidate() {
        for kind in CodedIndexType::iter() {
            let max_row = (1u32 << (32 - kind.tag_bits())) - 1;
            for table in kind.candidates() {
                for row in [1, 2, 0x3FFF, 0x10000, max_row.min(0x00FF_FFFF)] {
                    let token = Token::from_parts(table, row);
                    let encoded = kind.encode(token).unwrap();
                    assert_eq!(kind.decode(encoded).unwrap(), token, "{:?} {:?}", kind, token);
                }
            }
        }
    }

    #[test]
    fn null_for_every_kind() {
        for kind in CodedIndexType::iter() {
            assert_eq!(kind.decode(0).unwrap(), Token::NULL);
            assert_eq!(kind.encode(Token::NULL).unwrap(), 0);
            for tag in 0..(1u32 << kind.tag_bits()) {
                assert!(kind.decode(tag).unwrap().is_null());
            }
        }
    }

    #[test]
    fn invalid_target() {
        let result = CodedIndexType::TypeDefOrRef.encode(Token::from_parts(TableId::MethodDef, 1));
        assert!(matches!(
            result,
            Err(Error::InvalidCodedIndexTarget {
                table: Some(TableId::MethodDef),
                ..
            })
        ));

        // tags 0, 1 and 4 of CustomAttributeType are unassigned
        for tag in [0, 1, 4] {
            let result = CodedIndexType::CustomAttributeType.decode((1 << 3) | tag);
            assert!(matches!(
                result,
                Err(Error::InvalidCodedIndexTarget { table: None, .. })
            ));
        }
    }

    #[test]
    fn rows_beyond_token_range_rejected() {
        let cases = [
            (CodedIndexType::TypeDefOrRef, 0x0400_0004),
            (CodedIndexType::HasFieldMarshal, 0x0200_0000),
            (CodedIndexType::HasCustomAttribute, u32::MAX),
        ];
        for (kind, value) in cases {
            assert!(
                matches!(kind.decode(value), Err(Error::ValueOutOfRange(_))),
                "{kind:?} {value:#x}"
            );
        }

        let largest = (Token::MAX_ROW << 2) | 1;
        assert_eq!(
            CodedIndexType::TypeDefOrRef.decode(largest).unwrap(),
            Token::from_parts(TableId::TypeRef, Token::MAX_ROW)
        );
    }

    #[test]
    fn custom_attribute_type_tags() {
        let kind = CodedIndexType::CustomAttributeType;
        assert_eq!(
            kind.encode(Token::from_parts(TableId::MethodDef, 1)).unwrap(),
            0x0A
        );
        assert_eq!(
            kind.encode(Token::from_parts(TableId::MemberRef, 1)).unwrap(),
            0x0B
        );
    }
}
