//! Metadata tables: identifiers, coded indices, physical layout and raw rows.
//!
//! # Key Components
//!
//! - [`TableId`] - Identifiers of all ECMA-335 tables
//! - [`CodedIndexType`] - Coded index kinds, decoding and encoding
//! - [`TableInfo`] - Row counts and heap size flags that fix all column widths
//! - [`TableLayout`] - Per-table column widths derived from a [`TableInfo`]
//! - [`RowDefinition`] / [`MetadataTable`] - Reading and writing rows through a layout

mod codedindex;
mod layout;
mod rows;
mod table;
mod tableid;
mod tableinfo;

pub use codedindex::CodedIndexType;
pub use layout::{ColumnKind, ColumnLayout, TableLayout};
pub use rows::{
    AssemblyRefRaw, CustomAttributeRaw, MemberRefRaw, MethodSpecRaw, ModuleRefRaw,
    NestedClassRaw, TypeRefRaw, TypeSpecRaw,
};
pub use table::{write_table, MetadataTable, RowDefinition};
pub use tableid::TableId;
pub use tableinfo::{TableInfo, TableInfoRef, TableRowInfo};
