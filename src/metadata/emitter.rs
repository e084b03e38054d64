//! Serialization of a module's reference tables.
//!
//! [`emit_reference_tables`] lays out the `TypeRef`, `MemberRef`, `CustomAttribute`,
//! `ModuleRef`, `TypeSpec`, `AssemblyRef`, `NestedClass` and `MethodSpec` tables of a
//! [`Module`], together with the `#Strings` and `#Blob` heaps they index. Column widths follow
//! from a [`TableInfo`] derived from the module's row counts, so coded indices are 2 or 4 bytes
//! exactly as a reader of the same image expects.

use std::sync::Arc;

use crate::{
    metadata::{
        members::MemberRefSignature,
        module::Module,
        signatures::BlobSignature,
        streams::{BlobHeapBuilder, StringHeapBuilder},
        tables::{
            write_table, AssemblyRefRaw, CodedIndexType, CustomAttributeRaw, MemberRefRaw,
            MethodSpecRaw, ModuleRefRaw, NestedClassRaw, TableId, TableInfo, TableInfoRef,
            TypeRefRaw, TypeSpecRaw,
        },
    },
    Result,
};

/// Tables counted for column widths, in table number order.
const COUNTED_TABLES: &[TableId] = &[
    TableId::Module,
    TableId::TypeRef,
    TableId::TypeDef,
    TableId::Field,
    TableId::MethodDef,
    TableId::Param,
    TableId::MemberRef,
    TableId::CustomAttribute,
    TableId::StandAloneSig,
    TableId::Event,
    TableId::Property,
    TableId::ModuleRef,
    TableId::TypeSpec,
    TableId::AssemblyRef,
    TableId::NestedClass,
    TableId::MethodSpec,
];

/// Raw reference tables and the heaps they index.
#[derive(Debug, Clone)]
pub struct EmittedTables {
    /// Layout information the tables were written with
    pub info: TableInfoRef,
    /// Serialized tables in table number order, only tables that hold rows
    pub tables: Vec<(TableId, Vec<u8>)>,
    /// `#Strings` heap
    pub strings: Vec<u8>,
    /// `#Blob` heap
    pub blobs: Vec<u8>,
}

impl EmittedTables {
    /// Bytes of one serialized table.
    #[must_use]
    pub fn table(&self, table: TableId) -> Option<&[u8]> {
        self.tables
            .iter()
            .find(|(id, _)| *id == table)
            .map(|(_, data)| data.as_slice())
    }
}

/// Serialize the reference tables of `module`.
///
/// `CustomAttribute` rows are sorted by their encoded parent and `NestedClass` rows by the
/// nested type, as ECMA-335 II.22 requires for these tables.
///
/// # Errors
/// Returns [`crate::Error::InvalidCodedIndexTarget`] if a row refers to a table its column
/// cannot address, or an error of the signature encoder.
pub fn emit_reference_tables(module: &Module) -> Result<EmittedTables> {
    let mut strings = StringHeapBuilder::new();
    let mut blobs = BlobHeapBuilder::new();

    let mut type_refs = Vec::new();
    for (_, row) in module.type_refs() {
        type_refs.push(TypeRefRaw {
            resolution_scope: row.resolution_scope,
            type_name: strings.add(&row.name)?,
            type_namespace: strings.add(&row.namespace)?,
        });
    }

    let mut member_refs = Vec::new();
    for (_, row) in module.member_refs() {
        let signature = match &row.signature {
            MemberRefSignature::Method(signature) => signature.encode()?,
            MemberRefSignature::Field(signature) => signature.encode()?,
        };
        member_refs.push(MemberRefRaw {
            class: row.class,
            name: strings.add(&row.name)?,
            signature: blobs.add(&signature)?,
        });
    }

    let mut custom_attributes = Vec::new();
    for (_, row) in module.custom_attributes() {
        let sort_key = CodedIndexType::HasCustomAttribute.encode(row.parent)?;
        custom_attributes.push((
            sort_key,
            CustomAttributeRaw {
                parent: row.parent,
                constructor: row.constructor,
                value: blobs.add(&row.value)?,
            },
        ));
    }
    custom_attributes.sort_by_key(|(sort_key, _)| *sort_key);
    let custom_attributes: Vec<CustomAttributeRaw> =
        custom_attributes.into_iter().map(|(_, row)| row).collect();

    let mut module_refs = Vec::new();
    for (_, row) in module.module_refs() {
        module_refs.push(ModuleRefRaw {
            name: strings.add(&row.name)?,
        });
    }

    let mut type_specs = Vec::new();
    for (_, row) in module.type_specs() {
        type_specs.push(TypeSpecRaw {
            signature: blobs.add(&row.signature.encode()?)?,
        });
    }

    let mut assembly_refs = Vec::new();
    for (_, row) in module.assembly_refs() {
        assembly_refs.push(AssemblyRefRaw {
            major_version: row.version.major,
            minor_version: row.version.minor,
            build_number: row.version.build,
            revision_number: row.version.revision,
            flags: row.flags.bits(),
            public_key_or_token: blobs.add(&row.public_key_or_token)?,
            name: strings.add(&row.name)?,
            culture: strings.add(&row.culture)?,
            hash_value: 0,
        });
    }

    let mut nested_classes: Vec<NestedClassRaw> = module
        .type_defs()
        .filter_map(|(token, row)| {
            row.declaring_type.map(|enclosing| NestedClassRaw {
                nested_class: token,
                enclosing_class: enclosing,
            })
        })
        .collect();
    nested_classes.sort_by_key(|row| row.nested_class.row());

    let mut method_specs = Vec::new();
    for (_, row) in module.method_specs() {
        method_specs.push(MethodSpecRaw {
            method: row.method,
            instantiation: blobs.add(&row.instantiation.encode()?)?,
        });
    }

    let counts: Vec<(TableId, u32)> = COUNTED_TABLES
        .iter()
        .map(|table| (*table, module.row_count(*table)))
        .filter(|(_, rows)| *rows > 0)
        .collect();
    let info = Arc::new(TableInfo::new(
        &counts,
        strings.as_bytes().len() > usize::from(u16::MAX),
        false,
        blobs.as_bytes().len() > usize::from(u16::MAX),
    ));

    let mut tables = Vec::new();
    let mut emit = |table: TableId, data: Vec<u8>| {
        if !data.is_empty() {
            tables.push((table, data));
        }
    };
    emit(TableId::TypeRef, write_table(&type_refs, &info)?);
    emit(TableId::MemberRef, write_table(&member_refs, &info)?);
    emit(TableId::CustomAttribute, write_table(&custom_attributes, &info)?);
    emit(TableId::ModuleRef, write_table(&module_refs, &info)?);
    emit(TableId::TypeSpec, write_table(&type_specs, &info)?);
    emit(TableId::AssemblyRef, write_table(&assembly_refs, &info)?);
    emit(TableId::NestedClass, write_table(&nested_classes, &info)?);
    emit(TableId::MethodSpec, write_table(&method_specs, &info)?);

    Ok(EmittedTables {
        info,
        tables,
        strings: strings.as_bytes().to_vec(),
        blobs: blobs.as_bytes().to_vec(),
    })
}
