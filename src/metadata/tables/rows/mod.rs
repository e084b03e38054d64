//! Raw rows of the reference tables a cloned module persists.
//!
//! Each row stores already resolved references ([`crate::metadata::token::Token`]s) and raw heap
//! indices; the physical encoding of coded indices is handled by the
//! [`crate::metadata::tables::TableLayout`] it is read with or written through.

mod assemblyref;
mod customattribute;
mod memberref;
mod methodspec;
mod moduleref;
mod nestedclass;
mod typeref;
mod typespec;

pub use assemblyref::AssemblyRefRaw;
pub use customattribute::CustomAttributeRaw;
pub use memberref::MemberRefRaw;
pub use methodspec::MethodSpecRaw;
pub use moduleref::ModuleRefRaw;
pub use nestedclass::NestedClassRaw;
pub use typeref::TypeRefRaw;
pub use typespec::TypeSpecRaw;
