//! Metadata heaps (ECMA-335 II.24.2).
//!
//! Readers give range-checked access to existing heaps; builders allocate and deduplicate
//! entries for newly produced metadata.

mod blob;
mod builder;
mod strings;
mod userstrings;

pub use blob::Blob;
pub use builder::{BlobHeapBuilder, StringHeapBuilder, UserStringHeapBuilder};
pub use strings::Strings;
pub use userstrings::UserStrings;
